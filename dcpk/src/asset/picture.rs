// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! Picture essence, monoscopic or stereoscopic.

use std::path::Path;

use crate::equality::{NoteHandler, NoteType};
use crate::error::Result;
use crate::essence::{EssenceCodec, EssenceKind};
use crate::types::{Fraction, Id, Size, Standard};

use super::AssetData;

#[derive(Clone, Debug)]
pub struct PictureAsset {
    pub data: AssetData,
    pub edit_rate: Fraction,
    pub intrinsic_duration: i64,
    pub size: Size,
    pub stereo: bool,
    pub encrypted: bool,
    pub key_id: Option<Id>,
    pub key: Option<Vec<u8>>,
}

pub fn static_pkl_type(standard: Standard) -> &'static str {
    match standard {
        Standard::Interop => "application/mxf;asdcpKind=Picture",
        Standard::Smpte => "application/mxf",
    }
}

impl PictureAsset {
    /// Build from an existing container, filling the descriptor through the
    /// codec boundary. `id` is the identity the package's asset map gives
    /// this container.
    pub fn from_file(
        id: Id,
        path: &Path,
        codec: &dyn EssenceCodec,
        ignore_incorrect_picture_mxf_type: bool,
    ) -> Result<PictureAsset> {
        let descriptor = codec.picture(path)?;
        let probed = codec.kind(path)?;
        let stereo = match probed {
            EssenceKind::StereoPicture => true,
            _ => descriptor.stereo,
        };
        if descriptor.stereo != stereo && !ignore_incorrect_picture_mxf_type {
            return Err(crate::error::Error::mxf(
                path,
                "container essence type does not match its picture descriptor",
            ));
        }
        Ok(PictureAsset {
            data: AssetData::new(id, Some(path.to_path_buf())),
            edit_rate: descriptor.edit_rate,
            intrinsic_duration: descriptor.intrinsic_duration,
            size: descriptor.size,
            stereo,
            encrypted: descriptor.encrypted,
            key_id: descriptor.key_id,
            key: None,
        })
    }

    /// Create a fresh asset for essence that is about to be written.
    pub fn new(edit_rate: Fraction, intrinsic_duration: i64, size: Size, stereo: bool) -> PictureAsset {
        PictureAsset {
            data: AssetData::new(Id::generate(), None),
            edit_rate,
            intrinsic_duration,
            size,
            stereo,
            encrypted: false,
            key_id: None,
            key: None,
        }
    }

    pub fn id(&self) -> &Id {
        &self.data.id
    }

    pub(crate) fn descriptor_equals(&self, other: &PictureAsset, note: NoteHandler) -> bool {
        if self.edit_rate != other.edit_rate {
            note(NoteType::Error, "picture edit rates differ".to_string());
            return false;
        }
        if self.intrinsic_duration != other.intrinsic_duration {
            note(
                NoteType::Error,
                format!(
                    "picture intrinsic durations differ ({} vs {})",
                    self.intrinsic_duration, other.intrinsic_duration
                ),
            );
            return false;
        }
        if self.size != other.size {
            note(
                NoteType::Error,
                format!("picture sizes differ ({} vs {})", self.size, other.size),
            );
            return false;
        }
        if self.stereo != other.stereo {
            note(NoteType::Error, "one picture asset is 3D and the other is not".to_string());
            return false;
        }
        true
    }
}
