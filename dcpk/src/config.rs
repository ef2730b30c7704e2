// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! Library configuration.
//!
//! One structure controls everything that varies between deployments; there
//! are no environment variables or global switches.

use std::path::PathBuf;
use std::sync::Arc;

use crate::essence::{EssenceCodec, NullCodec};

#[derive(Clone)]
pub struct Config {
    /// Directory holding the XSD/DTD files that the schema resolver maps
    /// well-known URIs onto.
    pub schema_directory: Option<PathBuf>,

    /// Tolerate stereoscopic picture containers that mis-declare their
    /// essence kind.
    pub ignore_incorrect_picture_mxf_type: bool,

    /// Read buffer used when digesting essence files, in bytes. Progress
    /// callbacks are polled once per buffer.
    pub digest_buffer_size: usize,

    /// The essence codec backend.
    pub codec: Arc<dyn EssenceCodec>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            schema_directory: None,
            ignore_incorrect_picture_mxf_type: false,
            digest_buffer_size: crate::util::DIGEST_BUFFER_SIZE,
            codec: Arc::new(NullCodec),
        }
    }
}

impl Config {
    pub fn with_codec(codec: Arc<dyn EssenceCodec>) -> Config {
        Config {
            codec,
            ..Config::default()
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("schema_directory", &self.schema_directory)
            .field(
                "ignore_incorrect_picture_mxf_type",
                &self.ignore_incorrect_picture_mxf_type,
            )
            .field("digest_buffer_size", &self.digest_buffer_size)
            .finish()
    }
}
