// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! The boundary to the MXF/JPEG2000/PCM codec layer.
//!
//! Bit-exact encoding and decoding of essence is delegated to an external
//! backend. This module defines the protocols as traits and the descriptor
//! structures that cross the boundary; the package loader, the asset
//! factories and the verifier consume them without knowing which backend is
//! behind. Test environments plug in simple stubs.

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{Fraction, Id, Size};

/// What kind of essence a container holds, as determined by probing it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EssenceKind {
    MonoPicture,
    StereoPicture,
    Sound,
    Atmos,
    TimedText,
}

/// Descriptor for a picture container.
#[derive(Clone, Debug)]
pub struct PictureDescriptor {
    pub edit_rate: Fraction,
    pub intrinsic_duration: i64,
    pub size: Size,
    pub stereo: bool,
    pub encrypted: bool,
    pub key_id: Option<Id>,
}

/// Descriptor for a PCM sound container.
#[derive(Clone, Debug)]
pub struct SoundDescriptor {
    pub edit_rate: Fraction,
    pub intrinsic_duration: i64,
    pub sampling_rate: u32,
    pub channels: u8,
    pub language: Option<String>,
    pub encrypted: bool,
    pub key_id: Option<Id>,
}

/// Descriptor for an Atmos container.
#[derive(Clone, Debug)]
pub struct AtmosDescriptor {
    pub edit_rate: Fraction,
    pub intrinsic_duration: i64,
    pub first_frame: i64,
    pub max_channel_count: u32,
    pub max_object_count: u32,
    pub encrypted: bool,
    pub key_id: Option<Id>,
}

/// Descriptor for an MXF-wrapped timed text (subtitle) container: the XML
/// payload plus any embedded font resources.
#[derive(Clone, Debug)]
pub struct TimedTextDescriptor {
    pub xml: String,
    pub fonts: Vec<(String, Vec<u8>)>,
    pub edit_rate: Fraction,
    pub intrinsic_duration: i64,
    pub encrypted: bool,
    pub key_id: Option<Id>,
}

/// Per-frame JPEG2000 payload sizes; stereo frames carry both eyes.
#[derive(Clone, Copy, Debug)]
pub struct PictureFrameSizes {
    pub main: usize,
    pub right: Option<usize>,
}

impl PictureFrameSizes {
    /// The larger of the eyes, which is what bit-rate limits apply to.
    pub fn biggest(&self) -> usize {
        self.main.max(self.right.unwrap_or(0))
    }
}

/// Sequential access to the frames of a picture container.
pub trait PictureReader {
    /// The compressed payload sizes of the given frame.
    fn frame_sizes(&mut self, index: i64) -> Result<PictureFrameSizes>;
}

/// The codec backend protocol.
///
/// Every method takes the container path; backends are free to keep handles
/// open between calls, but the library only requires that handles are
/// released when the returned readers are dropped.
pub trait EssenceCodec {
    /// Probe a container and classify its essence.
    fn kind(&self, path: &Path) -> Result<EssenceKind>;

    fn picture(&self, path: &Path) -> Result<PictureDescriptor>;

    fn sound(&self, path: &Path) -> Result<SoundDescriptor>;

    fn atmos(&self, path: &Path) -> Result<AtmosDescriptor>;

    fn timed_text(&self, path: &Path) -> Result<TimedTextDescriptor>;

    /// Open a picture container for frame-by-frame size reads.
    fn open_picture(&self, path: &Path) -> Result<Box<dyn PictureReader>>;

    /// Compare the PCM audio of two containers, allowing per-sample error up
    /// to `tolerance`. Used by package equality when reel hashes are allowed
    /// to differ.
    fn compare_sound(&self, a: &Path, b: &Path, tolerance: u32) -> Result<bool> {
        let _ = (a, b, tolerance);
        Err(Error::mxf(a, "sound comparison is not supported by this codec backend"))
    }
}

/// A backend that refuses everything. Used when no codec has been
/// configured; reading a package of bare manifests still works, but any
/// operation that needs to look inside an MXF container fails cleanly.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullCodec;

impl EssenceCodec for NullCodec {
    fn kind(&self, path: &Path) -> Result<EssenceKind> {
        Err(no_codec(path))
    }

    fn picture(&self, path: &Path) -> Result<PictureDescriptor> {
        Err(no_codec(path))
    }

    fn sound(&self, path: &Path) -> Result<SoundDescriptor> {
        Err(no_codec(path))
    }

    fn atmos(&self, path: &Path) -> Result<AtmosDescriptor> {
        Err(no_codec(path))
    }

    fn timed_text(&self, path: &Path) -> Result<TimedTextDescriptor> {
        Err(no_codec(path))
    }

    fn open_picture(&self, path: &Path) -> Result<Box<dyn PictureReader>> {
        Err(no_codec(path))
    }
}

fn no_codec(path: &Path) -> Error {
    Error::mxf(path, "no essence codec backend is configured")
}
