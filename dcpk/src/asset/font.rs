// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! Font data referenced by Interop subtitle assets.

use std::path::Path;

use crate::equality::{NoteHandler, NoteType};
use crate::error::{Error, Result};
use crate::types::{Id, Standard};

use super::AssetData;

#[derive(Clone, Debug)]
pub struct FontAsset {
    pub data: AssetData,
    bytes: Vec<u8>,
}

/// Fonts are only packaged separately under Interop; the type string does
/// not vary.
pub fn static_pkl_type(_standard: Standard) -> &'static str {
    "application/ttf"
}

impl FontAsset {
    /// Build a font asset from a file on disk, keeping the payload in
    /// memory.
    pub fn from_file(id: Id, path: &Path) -> Result<FontAsset> {
        let bytes = std::fs::read(path).map_err(|e| Error::file(path, e))?;
        Ok(FontAsset {
            data: AssetData::new(id, Some(path.to_path_buf())),
            bytes,
        })
    }

    pub fn new(id: Id, bytes: Vec<u8>) -> FontAsset {
        FontAsset {
            data: AssetData::new(id, None),
            bytes,
        }
    }

    pub fn id(&self) -> &Id {
        &self.data.id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn equals(&self, other: &FontAsset, note: NoteHandler) -> bool {
        if self.bytes != other.bytes {
            note(NoteType::Error, "font payloads differ".to_string());
            return false;
        }
        true
    }
}
