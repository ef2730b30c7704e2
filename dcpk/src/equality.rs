// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! Deep package comparison options.
//!
//! Two packages are compared CPL by CPL, reel by reel, asset by asset.
//! Some differences are routinely acceptable: regenerated annotation
//! texts, re-wrapped essence with differing container hashes, or audio
//! that was decoded and re-encoded bit-identically. The comparison is
//! therefore driven by an options structure, and every difference found is
//! reported through a note callback whether or not it causes inequality.

use std::sync::Arc;

use crate::essence::EssenceCodec;

/// The severity of an equality note.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteType {
    /// Progress information only.
    Progress,
    /// A difference that the options allow.
    Note,
    /// A difference that makes the packages unequal.
    Error,
}

/// Callback receiving a note about each difference found.
pub type NoteHandler<'a> = &'a mut dyn FnMut(NoteType, String);

/// Options controlling which differences matter.
#[derive(Clone)]
pub struct EqualityOptions {
    /// Allow CPL `<AnnotationText>` values to differ.
    pub cpl_annotation_texts_can_differ: bool,
    /// Allow reel-level `<AnnotationText>` values to differ.
    pub reel_annotation_texts_can_differ: bool,
    /// Allow per-reel `<Hash>` values (and hence container bytes) to
    /// differ; essence is then compared through the codec where possible.
    pub reel_hashes_can_differ: bool,
    /// Largest tolerated difference per audio sample when comparing PCM,
    /// in quantisation steps.
    pub max_audio_sample_error: u32,
    /// Allow issue dates to differ.
    pub issue_dates_can_differ: bool,
    /// Codec used for essence-level comparison when hashes may differ.
    pub codec: Option<Arc<dyn EssenceCodec>>,
}

impl Default for EqualityOptions {
    fn default() -> EqualityOptions {
        EqualityOptions {
            cpl_annotation_texts_can_differ: false,
            reel_annotation_texts_can_differ: false,
            reel_hashes_can_differ: false,
            max_audio_sample_error: 0,
            issue_dates_can_differ: false,
            codec: None,
        }
    }
}

impl std::fmt::Debug for EqualityOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("EqualityOptions")
            .field(
                "cpl_annotation_texts_can_differ",
                &self.cpl_annotation_texts_can_differ,
            )
            .field(
                "reel_annotation_texts_can_differ",
                &self.reel_annotation_texts_can_differ,
            )
            .field("reel_hashes_can_differ", &self.reel_hashes_can_differ)
            .field("max_audio_sample_error", &self.max_audio_sample_error)
            .field("issue_dates_can_differ", &self.issue_dates_can_differ)
            .finish()
    }
}
