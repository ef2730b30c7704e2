// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! PCM sound essence.

use std::path::Path;

use crate::equality::{NoteHandler, NoteType};
use crate::error::Result;
use crate::essence::EssenceCodec;
use crate::types::{Fraction, Id, Standard};

use super::AssetData;

#[derive(Clone, Debug)]
pub struct SoundAsset {
    pub data: AssetData,
    pub edit_rate: Fraction,
    pub intrinsic_duration: i64,
    pub sampling_rate: u32,
    pub channels: u8,
    pub language: Option<String>,
    pub encrypted: bool,
    pub key_id: Option<Id>,
    pub key: Option<Vec<u8>>,
}

pub fn static_pkl_type(standard: Standard) -> &'static str {
    match standard {
        Standard::Interop => "application/mxf;asdcpKind=Sound",
        Standard::Smpte => "application/mxf",
    }
}

impl SoundAsset {
    pub fn from_file(id: Id, path: &Path, codec: &dyn EssenceCodec) -> Result<SoundAsset> {
        let descriptor = codec.sound(path)?;
        Ok(SoundAsset {
            data: AssetData::new(id, Some(path.to_path_buf())),
            edit_rate: descriptor.edit_rate,
            intrinsic_duration: descriptor.intrinsic_duration,
            sampling_rate: descriptor.sampling_rate,
            channels: descriptor.channels,
            language: descriptor.language,
            encrypted: descriptor.encrypted,
            key_id: descriptor.key_id,
            key: None,
        })
    }

    pub fn new(
        edit_rate: Fraction,
        intrinsic_duration: i64,
        sampling_rate: u32,
        channels: u8,
        language: Option<String>,
    ) -> SoundAsset {
        SoundAsset {
            data: AssetData::new(Id::generate(), None),
            edit_rate,
            intrinsic_duration,
            sampling_rate,
            channels,
            language,
            encrypted: false,
            key_id: None,
            key: None,
        }
    }

    pub fn id(&self) -> &Id {
        &self.data.id
    }

    pub(crate) fn descriptor_equals(&self, other: &SoundAsset, note: NoteHandler) -> bool {
        if self.edit_rate != other.edit_rate {
            note(NoteType::Error, "sound edit rates differ".to_string());
            return false;
        }
        if self.intrinsic_duration != other.intrinsic_duration {
            note(
                NoteType::Error,
                format!(
                    "sound intrinsic durations differ ({} vs {})",
                    self.intrinsic_duration, other.intrinsic_duration
                ),
            );
            return false;
        }
        if self.sampling_rate != other.sampling_rate {
            note(
                NoteType::Error,
                format!(
                    "sound sampling rates differ ({} vs {})",
                    self.sampling_rate, other.sampling_rate
                ),
            );
            return false;
        }
        if self.channels != other.channels {
            note(
                NoteType::Error,
                format!(
                    "sound channel counts differ ({} vs {})",
                    self.channels, other.channels
                ),
            );
            return false;
        }
        true
    }
}
