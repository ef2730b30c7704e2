// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! Object-based (Atmos) audio essence.

use std::path::Path;

use crate::equality::{NoteHandler, NoteType};
use crate::error::Result;
use crate::essence::EssenceCodec;
use crate::types::{Fraction, Id, Standard};

use super::AssetData;

#[derive(Clone, Debug)]
pub struct AtmosAsset {
    pub data: AssetData,
    pub edit_rate: Fraction,
    pub intrinsic_duration: i64,
    pub first_frame: i64,
    pub max_channel_count: u32,
    pub max_object_count: u32,
    pub encrypted: bool,
    pub key_id: Option<Id>,
    pub key: Option<Vec<u8>>,
}

/// Atmos exists only in SMPTE packages; the type string does not vary.
pub fn static_pkl_type(_standard: Standard) -> &'static str {
    "application/mxf"
}

impl AtmosAsset {
    pub fn from_file(id: Id, path: &Path, codec: &dyn EssenceCodec) -> Result<AtmosAsset> {
        let descriptor = codec.atmos(path)?;
        Ok(AtmosAsset {
            data: AssetData::new(id, Some(path.to_path_buf())),
            edit_rate: descriptor.edit_rate,
            intrinsic_duration: descriptor.intrinsic_duration,
            first_frame: descriptor.first_frame,
            max_channel_count: descriptor.max_channel_count,
            max_object_count: descriptor.max_object_count,
            encrypted: descriptor.encrypted,
            key_id: descriptor.key_id,
            key: None,
        })
    }

    pub fn id(&self) -> &Id {
        &self.data.id
    }

    pub(crate) fn descriptor_equals(&self, other: &AtmosAsset, note: NoteHandler) -> bool {
        if self.edit_rate != other.edit_rate
            || self.intrinsic_duration != other.intrinsic_duration
            || self.first_frame != other.first_frame
            || self.max_channel_count != other.max_channel_count
            || self.max_object_count != other.max_object_count
        {
            note(NoteType::Error, "atmos descriptors differ".to_string());
            return false;
        }
        true
    }
}
