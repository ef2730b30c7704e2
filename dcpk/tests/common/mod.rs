// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! Shared test fixtures: a stub essence codec and a simple-package builder.
//!
//! The stub stands in for the external MXF/JPEG2000/PCM backend. Essence
//! files are ordinary files beginning with a four-byte marker (`PIC\n`,
//! `STR\n`, `SND\n`, `ATM\n`, `SUB\n`); descriptors come from the stub's
//! own fields, so tests can dial in conforming or non-conforming values.

// Each test binary compiles this module separately and uses a subset of it.
#![allow(dead_code)]

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dcpk::asset::asset_factory;
use dcpk::cpl::{CompositionMetadata, Cpl};
use dcpk::essence::{
    AtmosDescriptor, EssenceCodec, EssenceKind, PictureDescriptor, PictureFrameSizes,
    PictureReader, SoundDescriptor, TimedTextDescriptor,
};
use dcpk::error::{Error, Result};
use dcpk::package::Package;
use dcpk::reel::{Reel, ReelAssetRef, ReelMarkers, ReelPicture, ReelSound};
use dcpk::types::{ContentKind, Fraction, Id, Marker, Size, Time};
use dcpk::Config;

#[derive(Clone)]
pub struct StubCodec {
    pub picture_size: Size,
    pub picture_edit_rate: Fraction,
    pub picture_duration: i64,
    pub stereo: bool,
    pub frame_bytes: usize,
    pub sound_sampling_rate: u32,
    pub sound_duration: i64,
    pub encrypted: bool,
    pub key_id: Option<Id>,
}

impl Default for StubCodec {
    fn default() -> StubCodec {
        StubCodec {
            picture_size: Size::new(1998, 1080),
            picture_edit_rate: Fraction::new(24, 1),
            picture_duration: 24,
            stereo: false,
            frame_bytes: 100_000,
            sound_sampling_rate: 48000,
            sound_duration: 24,
            encrypted: false,
            key_id: None,
        }
    }
}

fn magic_of(path: &Path) -> Result<[u8; 4]> {
    let mut file = std::fs::File::open(path).map_err(|e| Error::file(path, e))?;
    let mut magic = [0_u8; 4];
    file.read_exact(&mut magic)
        .map_err(|e| Error::file(path, e))?;
    Ok(magic)
}

struct StubPictureReader {
    frame_bytes: usize,
    stereo: bool,
}

impl PictureReader for StubPictureReader {
    fn frame_sizes(&mut self, _index: i64) -> Result<PictureFrameSizes> {
        Ok(PictureFrameSizes {
            main: self.frame_bytes,
            right: if self.stereo {
                Some(self.frame_bytes)
            } else {
                None
            },
        })
    }
}

impl EssenceCodec for StubCodec {
    fn kind(&self, path: &Path) -> Result<EssenceKind> {
        match &magic_of(path)? {
            b"PIC\n" => Ok(EssenceKind::MonoPicture),
            b"STR\n" => Ok(EssenceKind::StereoPicture),
            b"SND\n" => Ok(EssenceKind::Sound),
            b"ATM\n" => Ok(EssenceKind::Atmos),
            b"SUB\n" => Ok(EssenceKind::TimedText),
            _ => Err(Error::mxf(path, "unrecognised stub essence")),
        }
    }

    fn picture(&self, _path: &Path) -> Result<PictureDescriptor> {
        Ok(PictureDescriptor {
            edit_rate: self.picture_edit_rate,
            intrinsic_duration: self.picture_duration,
            size: self.picture_size,
            stereo: self.stereo,
            encrypted: self.encrypted,
            key_id: self.key_id.clone(),
        })
    }

    fn sound(&self, _path: &Path) -> Result<SoundDescriptor> {
        Ok(SoundDescriptor {
            edit_rate: self.picture_edit_rate,
            intrinsic_duration: self.sound_duration,
            sampling_rate: self.sound_sampling_rate,
            channels: 1,
            language: Some("en-GB".to_string()),
            encrypted: false,
            key_id: None,
        })
    }

    fn atmos(&self, _path: &Path) -> Result<AtmosDescriptor> {
        Ok(AtmosDescriptor {
            edit_rate: self.picture_edit_rate,
            intrinsic_duration: self.picture_duration,
            first_frame: 0,
            max_channel_count: 10,
            max_object_count: 118,
            encrypted: false,
            key_id: None,
        })
    }

    fn timed_text(&self, path: &Path) -> Result<TimedTextDescriptor> {
        let bytes = std::fs::read(path).map_err(|e| Error::file(path, e))?;
        Ok(TimedTextDescriptor {
            xml: String::from_utf8_lossy(&bytes[4..]).to_string(),
            fonts: Vec::new(),
            edit_rate: self.picture_edit_rate,
            intrinsic_duration: self.picture_duration,
            encrypted: false,
            key_id: None,
        })
    }

    fn open_picture(&self, _path: &Path) -> Result<Box<dyn PictureReader>> {
        Ok(Box::new(StubPictureReader {
            frame_bytes: self.frame_bytes,
            stereo: self.stereo,
        }))
    }

    fn compare_sound(&self, a: &Path, b: &Path, tolerance: u32) -> Result<bool> {
        let a = std::fs::read(a)?;
        let b = std::fs::read(b)?;
        let (a, b) = (&a[4..], &b[4..]);
        if a.len() != b.len() {
            return Ok(false);
        }
        // 24-bit little-endian samples.
        for (sa, sb) in a.chunks(3).zip(b.chunks(3)) {
            let va = i32::from_le_bytes([sa[0], sa[1], sa[2], 0]) << 8 >> 8;
            let vb = i32::from_le_bytes([sb[0], sb[1], sb[2], 0]) << 8 >> 8;
            if (va - vb).unsigned_abs() > tolerance {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

pub fn config_with(codec: &StubCodec) -> Config {
    Config::with_codec(Arc::new(codec.clone()))
}

/// Write a stub picture container.
pub fn write_picture_essence(path: &Path, stereo: bool) {
    let mut bytes = if stereo { b"STR\n".to_vec() } else { b"PIC\n".to_vec() };
    bytes.extend(std::iter::repeat(0x4a).take(512));
    std::fs::write(path, bytes).unwrap();
}

/// Write a stub sound container holding one second of silence.
pub fn write_sound_essence(path: &Path) {
    let mut bytes = b"SND\n".to_vec();
    bytes.extend(std::iter::repeat(0).take(48000 * 3));
    std::fs::write(path, bytes).unwrap();
}

pub struct SimpleOptions {
    pub with_metadata: bool,
    pub with_markers: bool,
    pub content_kind: ContentKind,
}

impl Default for SimpleOptions {
    fn default() -> SimpleOptions {
        SimpleOptions {
            with_metadata: true,
            with_markers: true,
            content_kind: ContentKind::Feature,
        }
    }
}

/// Build a one-reel package (mono picture + sound) in `directory`, ready
/// for `write_xml`. Mirrors the classic "simple DCP" test fixture.
pub fn make_simple(directory: &Path, codec: &StubCodec, options: &SimpleOptions) -> Package {
    let mut package = Package::open(directory.to_path_buf()).unwrap();

    let video = directory.join("video.mxf");
    let audio = directory.join("audio.mxf");
    write_picture_essence(&video, codec.stereo);
    write_sound_essence(&audio);

    let picture = asset_factory(Id::generate(), &video, codec, false).unwrap();
    let sound = asset_factory(Id::generate(), &audio, codec, false).unwrap();

    let mut cpl = Cpl::new("A Test DCP", options.content_kind);
    cpl.issuer = "OpenDCP".to_string();
    cpl.creator = "OpenDCP".to_string();
    cpl.issue_date = "2012-07-17T04:45:18+00:00".to_string();

    let mut reel = Reel::new();
    reel.main_picture = Some(ReelPicture {
        reference: ReelAssetRef::for_asset(&picture),
        stereo: codec.stereo,
    });
    reel.main_sound = Some(ReelSound {
        reference: ReelAssetRef::for_asset(&sound),
        language: Some("en-GB".to_string()),
    });

    if options.with_markers {
        let duration = codec.picture_duration;
        let mut markers = ReelMarkers::new(codec.picture_edit_rate, duration);
        let tcr = codec.picture_edit_rate.numerator;
        markers.set(Marker::Ffoc, Time::new(0, 0, 0, 1, tcr));
        markers.set(
            Marker::Lfoc,
            offset_time(duration - 1, tcr),
        );
        markers.set(Marker::Ffec, offset_time(duration - 8, tcr));
        markers.set(Marker::Ffmc, offset_time(duration - 4, tcr));
        reel.main_markers = Some(markers);
    }

    if options.with_metadata {
        cpl.metadata = Some(CompositionMetadata {
            full_content_title_text: Some("A Test DCP".to_string()),
            version_number: Some(1),
            status: Some("final".to_string()),
            main_sound_configuration: Some("51/L,R,C,LFE,Ls,Rs".to_string()),
            main_sound_sample_rate: Some(48000),
            main_picture_stored_area: Some(codec.picture_size),
            main_picture_active_area: Some(codec.picture_size),
            ..CompositionMetadata::default()
        });
    }

    cpl.add(reel);
    package.add(cpl);
    package.add_asset(picture);
    package.add_asset(sound);
    package
}

fn offset_time(offset: i64, tcr: i64) -> Time {
    Time::new(
        offset / (3600 * tcr),
        (offset / (60 * tcr)) % 60,
        (offset / tcr) % 60,
        offset % tcr,
        tcr,
    )
}

/// The ids of the non-PKL entries of an ASSETMAP, in source order.
pub fn assetmap_entry_ids(path: &Path) -> Vec<String> {
    let map = dcpk::package::AssetMap::from_file(path).unwrap();
    map.entries
        .iter()
        .filter(|e| !e.pkl)
        .map(|e| e.id.to_string())
        .collect()
}

#[allow(dead_code)]
pub fn list_files(directory: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(directory)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    files.sort();
    files
}
