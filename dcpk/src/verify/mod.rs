// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! Standards-compliance verification.
//!
//! [`verify`] loads one or more package directories and evaluates them
//! against the structural rules of the base standards and the constraints
//! of the SMPTE Bv2.1 application profile (SMPTE RDD 52:2020), producing an
//! ordered stream of [`VerificationNote`]s. A failure while loading one
//! package becomes a `FailedRead` note; the verifier records it and carries
//! on with the next package rather than aborting the batch.

mod text;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::asset::subtitle::SubtitleAsset;
use crate::asset::Asset;
use crate::config::Config;
use crate::error::Error;
use crate::package::Package;
use crate::reel::ReelAssetRef;
use crate::types::{language, Fraction, Marker, Size, Standard, Time};
use crate::xml::schema;
use crate::xml::Document;

use text::{LinesCharactersResult, TextTimingResult};

/// The severity of a verification note.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteType {
    /// A violation of the base standards.
    Error,
    /// A violation of a "shall" requirement of Bv2.1; not always an error
    /// outside that profile.
    Bv21Error,
    /// Something questionable but tolerated.
    Warning,
}

/// Codes for everything the verifier can report.
///
/// The names answer "what is wrong?" with a negative adjective and a noun:
/// INCORRECT for freely-valued things with the wrong value, INVALID for
/// constrained things outside their set, MISMATCHED for two things that
/// should agree, MISSING for absent things, EMPTY for present-but-blank
/// things, FAILED for serious verification failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerificationNoteCode {
    FailedRead,
    MismatchedCplHashes,
    InvalidPictureFrameRate,
    IncorrectPictureHash,
    MismatchedPictureHashes,
    IncorrectSoundHash,
    MismatchedSoundHashes,
    EmptyAssetPath,
    MissingAsset,
    MismatchedStandard,
    InvalidXml,
    MissingAssetmap,
    InvalidIntrinsicDuration,
    InvalidDuration,
    InvalidPictureFrameSizeInBytes,
    NearlyInvalidPictureFrameSizeInBytes,
    ExternalAsset,
    InvalidStandard,
    InvalidLanguage,
    InvalidPictureSizeInPixels,
    InvalidPictureFrameRateFor2k,
    InvalidPictureFrameRateFor4k,
    InvalidPictureAssetResolutionFor3d,
    InvalidClosedCaptionXmlSizeInBytes,
    InvalidTimedTextSizeInBytes,
    InvalidTimedTextFontSizeInBytes,
    MissingSubtitleLanguage,
    MismatchedSubtitleLanguages,
    MissingSubtitleStartTime,
    InvalidSubtitleStartTime,
    InvalidSubtitleFirstTextTime,
    InvalidSubtitleDuration,
    InvalidSubtitleSpacing,
    InvalidSubtitleLineCount,
    NearlyInvalidSubtitleLineLength,
    InvalidSubtitleLineLength,
    InvalidClosedCaptionLineCount,
    InvalidClosedCaptionLineLength,
    InvalidSoundFrameRate,
    MissingCplAnnotationText,
    MismatchedCplAnnotationText,
    MismatchedAssetDuration,
    MissingMainSubtitleFromSomeReels,
    MismatchedClosedCaptionAssetCounts,
    MissingSubtitleEntryPoint,
    IncorrectSubtitleEntryPoint,
    MissingClosedCaptionEntryPoint,
    IncorrectClosedCaptionEntryPoint,
    MissingHash,
    MissingFfecInFeature,
    MissingFfmcInFeature,
    MissingFfoc,
    MissingLfoc,
    IncorrectFfoc,
    IncorrectLfoc,
    MissingCplMetadata,
    MissingCplMetadataVersionNumber,
    MissingExtensionMetadata,
    InvalidExtensionMetadata,
    UnsignedCplWithEncryptedContent,
    UnsignedPklWithEncryptedContent,
    MismatchedPklAnnotationTextWithCpl,
    PartiallyEncrypted,
}

/// One finding: a severity, a code, and optional context.
#[derive(Clone, Debug, PartialEq)]
pub struct VerificationNote {
    type_: NoteType,
    code: VerificationNoteCode,
    note: Option<String>,
    file: Option<PathBuf>,
    line: Option<u64>,
}

impl VerificationNote {
    pub fn new(type_: NoteType, code: VerificationNoteCode) -> VerificationNote {
        VerificationNote {
            type_,
            code,
            note: None,
            file: None,
            line: None,
        }
    }

    pub fn with_note<S: Into<String>>(mut self, note: S) -> VerificationNote {
        self.note = Some(note.into());
        self
    }

    pub fn with_file<P: Into<PathBuf>>(mut self, file: P) -> VerificationNote {
        self.file = Some(file.into());
        self
    }

    pub fn with_line(mut self, line: u64) -> VerificationNote {
        self.line = Some(line);
        self
    }

    pub fn type_(&self) -> NoteType {
        self.type_
    }

    pub fn code(&self) -> VerificationNoteCode {
        self.code
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn line(&self) -> Option<u64> {
        self.line
    }
}

impl std::fmt::Display for VerificationNote {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", note_to_string(self))
    }
}

/// Stage callback: a human-readable stage name plus the file being worked
/// on, when there is one.
pub type StageCallback<'a> = &'a mut dyn FnMut(&str, Option<&Path>);

/// Progress callback: a fraction in [0, 1]; returning `false` cancels the
/// verification.
pub type ProgressCallback<'a> = &'a mut dyn FnMut(f32) -> bool;

const KB: u64 = 1024;
const MB: u64 = 1024 * 1024;

/// Verify one or more package directories, returning every note found.
///
/// The schema directory and codec backend come from `config`.
pub fn verify(
    directories: &[PathBuf],
    stage: StageCallback,
    progress: ProgressCallback,
    config: &Config,
) -> Vec<VerificationNote> {
    let mut notes = Vec::new();
    let schema_dir = config.schema_directory.as_deref();

    for directory in directories {
        stage("Checking DCP", Some(directory.as_path()));
        let mut package = match Package::open(directory.clone()) {
            Ok(p) => p,
            Err(e) => {
                notes.push(
                    VerificationNote::new(NoteType::Error, VerificationNoteCode::FailedRead)
                        .with_note(e.to_string()),
                );
                continue;
            }
        };

        let read_result = package.read(Some(&mut notes), config);
        if let Err(e) = read_result {
            notes.push(
                VerificationNote::new(NoteType::Error, VerificationNoteCode::FailedRead)
                    .with_note(e.to_string()),
            );
        }

        if package.standard() != Some(Standard::Smpte) {
            notes.push(VerificationNote::new(
                NoteType::Bv21Error,
                VerificationNoteCode::InvalidStandard,
            ));
        }

        match verify_package(&mut package, config, stage, progress, schema_dir, &mut notes) {
            Ok(()) => {}
            Err(Error::Cancelled) => {
                notes.push(
                    VerificationNote::new(NoteType::Error, VerificationNoteCode::FailedRead)
                        .with_note("verification was cancelled"),
                );
                return notes;
            }
            Err(e) => {
                notes.push(
                    VerificationNote::new(NoteType::Error, VerificationNoteCode::FailedRead)
                        .with_note(e.to_string()),
                );
            }
        }
    }

    notes
}

/// Shared verification state that crosses asset boundaries.
#[derive(Default)]
struct State {
    subtitle_language: Option<String>,
}

fn verify_language_tag(tag: &str, notes: &mut Vec<VerificationNote>) {
    if !language::tag_is_valid(tag) {
        notes.push(
            VerificationNote::new(NoteType::Bv21Error, VerificationNoteCode::InvalidLanguage)
                .with_note(tag),
        );
    }
}

fn verify_package(
    package: &mut Package,
    config: &Config,
    stage: StageCallback,
    progress: ProgressCallback,
    schema_dir: Option<&Path>,
    notes: &mut Vec<VerificationNote>,
) -> Result<(), Error> {
    let standard = package.standard();
    let smpte = standard == Some(Standard::Smpte);
    let mut state = State::default();

    for cpl_index in 0..package.cpls().len() {
        verify_cpl(
            package, config, cpl_index, smpte, stage, progress, schema_dir, notes, &mut state,
        )?;
    }

    for pkl_index in 0..package.pkls().len() {
        let (file, has_encrypted) = {
            let pkl = &package.pkls()[pkl_index];
            let encrypted_ids: Vec<_> = package
                .asset_vector()
                .iter()
                .filter(|a| a.encrypted())
                .map(|a| a.id().clone())
                .collect();
            (
                pkl.file().map(|f| f.to_path_buf()),
                pkl.asset_list()
                    .iter()
                    .any(|a| encrypted_ids.contains(&a.id)),
            )
        };
        if let Some(file) = file {
            stage("Checking PKL", Some(file.as_path()));
            schema::validate_xml_file(&file, schema_dir, notes);
            if has_encrypted && !document_is_signed(&file) {
                notes.push(
                    VerificationNote::new(
                        NoteType::Bv21Error,
                        VerificationNoteCode::UnsignedPklWithEncryptedContent,
                    )
                    .with_note(package.pkls()[pkl_index].id().to_string())
                    .with_file(&file),
                );
            }
        }
    }

    match package.asset_map_path() {
        Some(path) => {
            let path = path.to_path_buf();
            stage("Checking ASSETMAP", Some(path.as_path()));
            schema::validate_xml_file(&path, schema_dir, notes);
        }
        None => {
            notes.push(VerificationNote::new(
                NoteType::Error,
                VerificationNoteCode::MissingAssetmap,
            ));
        }
    }

    Ok(())
}

fn document_is_signed(path: &Path) -> bool {
    Document::read_file(path)
        .map(|d| d.root.child("Signature").is_some())
        .unwrap_or(false)
}

#[allow(clippy::too_many_arguments)]
fn verify_cpl(
    package: &mut Package,
    config: &Config,
    cpl_index: usize,
    smpte: bool,
    stage: StageCallback,
    progress: ProgressCallback,
    schema_dir: Option<&Path>,
    notes: &mut Vec<VerificationNote>,
    state: &mut State,
) -> Result<(), Error> {
    let (cpl_id, cpl_file, content_title, annotation_text, content_kind) = {
        let cpl = &package.cpls()[cpl_index];
        (
            cpl.id().clone(),
            cpl.file().map(|f| f.to_path_buf()),
            cpl.content_title_text.clone(),
            cpl.annotation_text.clone(),
            cpl.content_kind,
        )
    };

    if let Some(file) = &cpl_file {
        stage("Checking CPL", Some(file.as_path()));
        schema::validate_xml_file(file, schema_dir, notes);
    }

    // Encryption coherence.
    let (any_encrypted, all_encrypted) = {
        let cpl = &package.cpls()[cpl_index];
        (
            cpl.any_encrypted(package.asset_vector()),
            cpl.all_encrypted(package.asset_vector()),
        )
    };
    if any_encrypted && !all_encrypted {
        notes.push(VerificationNote::new(
            NoteType::Bv21Error,
            VerificationNoteCode::PartiallyEncrypted,
        ));
    }

    for tag in package.cpls()[cpl_index].additional_subtitle_languages() {
        verify_language_tag(&tag, notes);
    }

    if let Some(territory) = package.cpls()[cpl_index].release_territory() {
        let scoped = package.cpls()[cpl_index]
            .release_territory_scope()
            .map(|s| {
                s == "http://www.smpte-ra.org/schemas/429-16/2014/CPL-Metadata#scope/release-territory/UNM49"
            })
            .unwrap_or(false);
        if !scoped && !language::region_is_valid(territory) && territory != "001" {
            notes.push(
                VerificationNote::new(NoteType::Bv21Error, VerificationNoteCode::InvalidLanguage)
                    .with_note(territory),
            );
        }
    }

    if smpte {
        match &annotation_text {
            None => {
                let mut note = VerificationNote::new(
                    NoteType::Bv21Error,
                    VerificationNoteCode::MissingCplAnnotationText,
                )
                .with_note(cpl_id.to_string());
                if let Some(file) = &cpl_file {
                    note = note.with_file(file);
                }
                notes.push(note);
            }
            Some(annotation) if annotation != &content_title => {
                let mut note = VerificationNote::new(
                    NoteType::Warning,
                    VerificationNoteCode::MismatchedCplAnnotationText,
                )
                .with_note(cpl_id.to_string());
                if let Some(file) = &cpl_file {
                    note = note.with_file(file);
                }
                notes.push(note);
            }
            _ => {}
        }
    }

    // The CPL's own hash in each PKL must match the file on disk, and a
    // PKL that references exactly one CPL must take its AnnotationText
    // from that CPL's ContentTitleText.
    let cpl_ids: Vec<_> = package.cpls().iter().map(|c| c.id().clone()).collect();
    for pkl_index in 0..package.pkls().len() {
        let (pkl_id, pkl_file, pkl_annotation, recorded_hash, cpls_in_pkl) = {
            let pkl = &package.pkls()[pkl_index];
            (
                pkl.id().clone(),
                pkl.file().map(|f| f.to_path_buf()),
                pkl.annotation_text.clone(),
                pkl.hash(&cpl_id).map(|h| h.to_string()),
                pkl.asset_list()
                    .iter()
                    .filter(|a| cpl_ids.contains(&a.id))
                    .count(),
            )
        };

        if let (Some(recorded), Some(file)) = (recorded_hash, &cpl_file) {
            let actual = crate::util::make_digest(file, None)?;
            if actual != recorded {
                notes.push(
                    VerificationNote::new(
                        NoteType::Error,
                        VerificationNoteCode::MismatchedCplHashes,
                    )
                    .with_note(cpl_id.to_string())
                    .with_file(file),
                );
            }
        }

        if cpls_in_pkl == 1
            && package.pkls()[pkl_index].hash(&cpl_id).is_some()
            && pkl_annotation.as_deref() != Some(content_title.as_str())
        {
            let mut note = VerificationNote::new(
                NoteType::Bv21Error,
                VerificationNoteCode::MismatchedPklAnnotationTextWithCpl,
            )
            .with_note(pkl_id.to_string());
            if let Some(file) = &pkl_file {
                note = note.with_file(file);
            }
            notes.push(note);
        }
    }

    // Per-reel checks.
    let mut have_main_subtitle = false;
    let mut have_no_main_subtitle = false;
    let mut fewest_closed_captions = usize::MAX;
    let mut most_closed_captions = 0_usize;
    let mut markers_seen: BTreeMap<Marker, Time> = BTreeMap::new();

    let reel_count = package.cpls()[cpl_index].reels.len();
    for reel_index in 0..reel_count {
        stage("Checking reel", None);

        let reel = package.cpls()[cpl_index].reels[reel_index].clone();

        for reference in reel.references() {
            if let Some(duration) = reference.duration {
                if duration * reference.edit_rate.denominator / reference.edit_rate.numerator < 1 {
                    notes.push(
                        VerificationNote::new(
                            NoteType::Error,
                            VerificationNoteCode::InvalidDuration,
                        )
                        .with_note(reference.id.to_string()),
                    );
                }
            }
            if reference.intrinsic_duration * reference.edit_rate.denominator
                / reference.edit_rate.numerator
                < 1
            {
                notes.push(
                    VerificationNote::new(
                        NoteType::Error,
                        VerificationNoteCode::InvalidIntrinsicDuration,
                    )
                    .with_note(reference.id.to_string()),
                );
            }
            if reference.hash.is_none() && reference_is_mxf(&reel, reference, package.asset_vector())
            {
                notes.push(
                    VerificationNote::new(NoteType::Bv21Error, VerificationNoteCode::MissingHash)
                        .with_note(reference.id.to_string()),
                );
            }
        }

        if smpte {
            let mut duration: Option<i64> = None;
            for reference in reel.references() {
                match duration {
                    None => duration = Some(reference.actual_duration()),
                    Some(d) if d != reference.actual_duration() => {
                        notes.push(VerificationNote::new(
                            NoteType::Bv21Error,
                            VerificationNoteCode::MismatchedAssetDuration,
                        ));
                        break;
                    }
                    _ => {}
                }
            }
        }

        if let Some(picture) = &reel.main_picture {
            let frame_rate = picture.frame_rate();
            let allowed = [24, 25, 30, 48, 50, 60, 96];
            if frame_rate.denominator != 1 || !allowed.contains(&frame_rate.numerator) {
                notes.push(
                    VerificationNote::new(
                        NoteType::Error,
                        VerificationNoteCode::InvalidPictureFrameRate,
                    )
                    .with_note(format!(
                        "{}/{}",
                        frame_rate.numerator, frame_rate.denominator
                    )),
                );
            }
            if picture.reference.resolved() {
                verify_main_picture_asset(
                    package,
                    config,
                    &picture.reference,
                    stage,
                    progress,
                    notes,
                )?;
            }
        }

        if let Some(sound) = &reel.main_sound {
            if sound.reference.resolved() {
                verify_main_sound_asset(package, &sound.reference, stage, progress, notes)?;
            }
        }

        if let Some(subtitle) = &reel.main_subtitle {
            if let Some(language) = &subtitle.language {
                verify_language_tag(language, notes);
            }
            match subtitle.reference.entry_point {
                None => notes.push(
                    VerificationNote::new(
                        NoteType::Bv21Error,
                        VerificationNoteCode::MissingSubtitleEntryPoint,
                    )
                    .with_note(subtitle.reference.id.to_string()),
                ),
                Some(e) if e != 0 => notes.push(
                    VerificationNote::new(
                        NoteType::Bv21Error,
                        VerificationNoteCode::IncorrectSubtitleEntryPoint,
                    )
                    .with_note(subtitle.reference.id.to_string()),
                ),
                _ => {}
            }
            if let Some(asset) = resolved_subtitle(package, &subtitle.reference) {
                verify_subtitle_asset(&asset, false, smpte, stage, schema_dir, notes, state);
            }
            have_main_subtitle = true;
        } else {
            have_no_main_subtitle = true;
        }

        for caption in &reel.closed_captions {
            if let Some(language) = &caption.language {
                verify_language_tag(language, notes);
            }
            match caption.reference.entry_point {
                None => notes.push(
                    VerificationNote::new(
                        NoteType::Bv21Error,
                        VerificationNoteCode::MissingClosedCaptionEntryPoint,
                    )
                    .with_note(caption.reference.id.to_string()),
                ),
                Some(e) if e != 0 => notes.push(
                    VerificationNote::new(
                        NoteType::Bv21Error,
                        VerificationNoteCode::IncorrectClosedCaptionEntryPoint,
                    )
                    .with_note(caption.reference.id.to_string()),
                ),
                _ => {}
            }
            if let Some(asset) = resolved_subtitle(package, &caption.reference) {
                verify_subtitle_asset(&asset, true, smpte, stage, schema_dir, notes, state);
            }
        }

        if let Some(markers) = &reel.main_markers {
            for (marker, time) in markers.get() {
                markers_seen.entry(*marker).or_insert(*time);
            }
        }

        fewest_closed_captions = fewest_closed_captions.min(reel.closed_captions.len());
        most_closed_captions = most_closed_captions.max(reel.closed_captions.len());
    }

    if smpte {
        if have_main_subtitle && have_no_main_subtitle {
            notes.push(VerificationNote::new(
                NoteType::Bv21Error,
                VerificationNoteCode::MissingMainSubtitleFromSomeReels,
            ));
        }

        if fewest_closed_captions != most_closed_captions {
            notes.push(VerificationNote::new(
                NoteType::Bv21Error,
                VerificationNoteCode::MismatchedClosedCaptionAssetCounts,
            ));
        }

        if content_kind == crate::types::ContentKind::Feature {
            if !markers_seen.contains_key(&Marker::Ffec) {
                notes.push(VerificationNote::new(
                    NoteType::Bv21Error,
                    VerificationNoteCode::MissingFfecInFeature,
                ));
            }
            if !markers_seen.contains_key(&Marker::Ffmc) {
                notes.push(VerificationNote::new(
                    NoteType::Bv21Error,
                    VerificationNoteCode::MissingFfmcInFeature,
                ));
            }
        }

        match markers_seen.get(&Marker::Ffoc) {
            None => notes.push(VerificationNote::new(
                NoteType::Warning,
                VerificationNoteCode::MissingFfoc,
            )),
            Some(time) if time.e != 1 => notes.push(
                VerificationNote::new(NoteType::Warning, VerificationNoteCode::IncorrectFfoc)
                    .with_note(time.e.to_string()),
            ),
            _ => {}
        }

        let last_reel_duration = package.cpls()[cpl_index]
            .reels
            .last()
            .map(|r| r.duration())
            .unwrap_or(0);
        match markers_seen.get(&Marker::Lfoc) {
            None => notes.push(VerificationNote::new(
                NoteType::Warning,
                VerificationNoteCode::MissingLfoc,
            )),
            Some(time) => {
                let lfoc = time.as_editable_units(time.tcr);
                if lfoc != last_reel_duration - 1 {
                    notes.push(
                        VerificationNote::new(
                            NoteType::Warning,
                            VerificationNoteCode::IncorrectLfoc,
                        )
                        .with_note(lfoc.to_string()),
                    );
                }
            }
        }

        check_text_timing(package, cpl_index, notes);
        check_text_lines(package, cpl_index, notes);

        let (has_full_title, has_version_number) = {
            let cpl = &package.cpls()[cpl_index];
            (
                cpl.full_content_title_text().is_some(),
                cpl.version_number().is_some(),
            )
        };
        if !has_full_title {
            // FullContentTitleText is assumed always to exist when there is
            // a CompositionMetadataAsset, so it stands proxy for the
            // asset's presence.
            let mut note = VerificationNote::new(
                NoteType::Bv21Error,
                VerificationNoteCode::MissingCplMetadata,
            )
            .with_note(cpl_id.to_string());
            if let Some(file) = &cpl_file {
                note = note.with_file(file);
            }
            notes.push(note);
        } else if !has_version_number {
            let mut note = VerificationNote::new(
                NoteType::Bv21Error,
                VerificationNoteCode::MissingCplMetadataVersionNumber,
            )
            .with_note(cpl_id.to_string());
            if let Some(file) = &cpl_file {
                note = note.with_file(file);
            }
            notes.push(note);
        }

        if let Some(file) = &cpl_file {
            check_extension_metadata(&cpl_id, file, notes);
        }

        if any_encrypted {
            if let Some(file) = &cpl_file {
                if !document_is_signed(file) {
                    notes.push(
                        VerificationNote::new(
                            NoteType::Bv21Error,
                            VerificationNoteCode::UnsignedCplWithEncryptedContent,
                        )
                        .with_note(cpl_id.to_string())
                        .with_file(file),
                    );
                }
            }
        }
    }

    Ok(())
}

/// Is the referenced asset an MXF container (so a `<Hash>` is expected)?
fn reference_is_mxf(_reel: &crate::reel::Reel, reference: &ReelAssetRef, assets: &[Asset]) -> bool {
    match reference.resolved.and_then(|i| assets.get(i)) {
        Some(Asset::Picture(_)) | Some(Asset::Sound(_)) | Some(Asset::Atmos(_)) => true,
        Some(Asset::Subtitle(s)) => s.standard == Standard::Smpte,
        _ => false,
    }
}

fn resolved_subtitle(package: &Package, reference: &ReelAssetRef) -> Option<SubtitleAsset> {
    match reference.resolved.and_then(|i| package.asset_vector().get(i)) {
        Some(Asset::Subtitle(s)) => Some(s.clone()),
        _ => None,
    }
}

enum HashCheck {
    Good,
    CplPklDiffer,
    Bad,
}

/// Recompute an asset's digest and compare it with the PKL's record and the
/// CPL's copy.
fn verify_asset_hash(
    package: &mut Package,
    reference: &ReelAssetRef,
    progress: ProgressCallback,
) -> Result<HashCheck, Error> {
    let index = reference.resolved.expect("reference must be resolved");
    let actual_hash = {
        let mut adapter = |f: f32| progress(f);
        let asset = &mut package.asset_vector_mut()[index];
        asset.hash(Some(&mut adapter))?
    };

    let pkl_hash = package
        .pkls()
        .iter()
        .find_map(|p| p.hash(&reference.id))
        .map(|h| h.to_string());
    // The package was read, so its assets must be in some PKL.
    let pkl_hash = match pkl_hash {
        Some(h) => h,
        None => return Ok(HashCheck::Good),
    };

    if let Some(cpl_hash) = &reference.hash {
        if cpl_hash != &pkl_hash {
            return Ok(HashCheck::CplPklDiffer);
        }
    }

    if actual_hash != pkl_hash {
        return Ok(HashCheck::Bad);
    }

    Ok(HashCheck::Good)
}

fn verify_main_picture_asset(
    package: &mut Package,
    config: &Config,
    reference: &ReelAssetRef,
    stage: StageCallback,
    progress: ProgressCallback,
    notes: &mut Vec<VerificationNote>,
) -> Result<(), Error> {
    let index = reference.resolved.expect("reference must be resolved");
    let (file, size, edit_rate, stereo, intrinsic_duration) =
        match &package.asset_vector()[index] {
            Asset::Picture(p) => (
                p.data.file.clone(),
                p.size,
                p.edit_rate,
                p.stereo,
                p.intrinsic_duration,
            ),
            _ => return Ok(()),
        };
    let file = match file {
        Some(f) => f,
        None => return Ok(()),
    };

    stage("Checking picture asset hash", Some(file.as_path()));
    match verify_asset_hash(package, reference, progress)? {
        HashCheck::Bad => notes.push(
            VerificationNote::new(NoteType::Error, VerificationNoteCode::IncorrectPictureHash)
                .with_file(&file),
        ),
        HashCheck::CplPklDiffer => notes.push(
            VerificationNote::new(
                NoteType::Error,
                VerificationNoteCode::MismatchedPictureHashes,
            )
            .with_file(&file),
        ),
        HashCheck::Good => {}
    }

    stage("Checking picture frame sizes", Some(file.as_path()));
    verify_picture_frame_sizes(config, &file, edit_rate, intrinsic_duration, progress, notes)?;

    // Only flat and scope are allowed by Bv2.1.
    let allowed_sizes = [
        Size::new(2048, 858),
        Size::new(1998, 1080),
        Size::new(4096, 1716),
        Size::new(3996, 2160),
    ];
    if !allowed_sizes.contains(&size) {
        notes.push(
            VerificationNote::new(
                NoteType::Bv21Error,
                VerificationNoteCode::InvalidPictureSizeInPixels,
            )
            .with_note(size.to_string())
            .with_file(&file),
        );
    }

    let two_k = size == Size::new(2048, 858) || size == Size::new(1998, 1080);
    let four_k = size == Size::new(4096, 1716) || size == Size::new(3996, 2160);
    let rate_note = format!("{}/{}", edit_rate.numerator, edit_rate.denominator);

    // 2K material must run at 24, 25 or 48fps.
    if two_k
        && ![Fraction::new(24, 1), Fraction::new(25, 1), Fraction::new(48, 1)]
            .contains(&edit_rate)
    {
        notes.push(
            VerificationNote::new(
                NoteType::Bv21Error,
                VerificationNoteCode::InvalidPictureFrameRateFor2k,
            )
            .with_note(rate_note.clone())
            .with_file(&file),
        );
    }

    if four_k {
        // Only 24fps, and only 2D, at 4K.
        if edit_rate != Fraction::new(24, 1) {
            notes.push(
                VerificationNote::new(
                    NoteType::Bv21Error,
                    VerificationNoteCode::InvalidPictureFrameRateFor4k,
                )
                .with_note(rate_note.clone())
                .with_file(&file),
            );
        }
        if stereo {
            notes.push(
                VerificationNote::new(
                    NoteType::Bv21Error,
                    VerificationNoteCode::InvalidPictureAssetResolutionFor3d,
                )
                .with_note(rate_note)
                .with_file(&file),
            );
        }
    }

    Ok(())
}

fn verify_picture_frame_sizes(
    config: &Config,
    file: &Path,
    edit_rate: Fraction,
    intrinsic_duration: i64,
    progress: ProgressCallback,
    notes: &mut Vec<VerificationNote>,
) -> Result<(), Error> {
    let mut reader = config.codec.open_picture(file)?;

    let mut biggest = 0_usize;
    for frame in 0..intrinsic_duration {
        biggest = biggest.max(reader.frame_sizes(frame)?.biggest());
        if !progress(frame as f32 / intrinsic_duration.max(1) as f32) {
            return Err(Error::Cancelled);
        }
    }

    let fps = edit_rate.as_float();
    let max_frame = (250.0 * 1_000_000.0 / (8.0 * fps)).round() as usize;
    let risky_frame = (230.0 * 1_000_000.0 / (8.0 * fps)).round() as usize;
    if biggest > max_frame {
        notes.push(
            VerificationNote::new(
                NoteType::Error,
                VerificationNoteCode::InvalidPictureFrameSizeInBytes,
            )
            .with_file(file),
        );
    } else if biggest > risky_frame {
        notes.push(
            VerificationNote::new(
                NoteType::Warning,
                VerificationNoteCode::NearlyInvalidPictureFrameSizeInBytes,
            )
            .with_file(file),
        );
    }

    Ok(())
}

fn verify_main_sound_asset(
    package: &mut Package,
    reference: &ReelAssetRef,
    stage: StageCallback,
    progress: ProgressCallback,
    notes: &mut Vec<VerificationNote>,
) -> Result<(), Error> {
    let index = reference.resolved.expect("reference must be resolved");
    let (file, sampling_rate, language) = match &package.asset_vector()[index] {
        Asset::Sound(s) => (s.data.file.clone(), s.sampling_rate, s.language.clone()),
        _ => return Ok(()),
    };
    let file = match file {
        Some(f) => f,
        None => return Ok(()),
    };

    stage("Checking sound asset hash", Some(file.as_path()));
    match verify_asset_hash(package, reference, progress)? {
        HashCheck::Bad => notes.push(
            VerificationNote::new(NoteType::Error, VerificationNoteCode::IncorrectSoundHash)
                .with_file(&file),
        ),
        HashCheck::CplPklDiffer => notes.push(
            VerificationNote::new(NoteType::Error, VerificationNoteCode::MismatchedSoundHashes)
                .with_file(&file),
        ),
        HashCheck::Good => {}
    }

    stage("Checking sound asset metadata", Some(file.as_path()));
    if let Some(language) = &language {
        verify_language_tag(language, notes);
    }
    if sampling_rate != 48000 {
        notes.push(
            VerificationNote::new(
                NoteType::Bv21Error,
                VerificationNoteCode::InvalidSoundFrameRate,
            )
            .with_note(sampling_rate.to_string())
            .with_file(&file),
        );
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn verify_subtitle_asset(
    asset: &SubtitleAsset,
    closed_caption: bool,
    smpte: bool,
    stage: StageCallback,
    schema_dir: Option<&Path>,
    notes: &mut Vec<VerificationNote>,
    state: &mut State,
) {
    let file = asset.data.file.clone();
    stage("Checking subtitle XML", file.as_deref());

    // The data as it appears in the package is validated, not this
    // library's cleaned-up rendering of it.
    let raw = asset.xml_as_string();
    schema::validate_xml_string(&raw, file.as_deref(), schema_dir, notes);

    if smpte && asset.standard == Standard::Smpte {
        match &asset.language {
            Some(language) => {
                verify_language_tag(language, notes);
                match &state.subtitle_language {
                    None => state.subtitle_language = Some(language.clone()),
                    Some(seen) if seen != language => {
                        notes.push(VerificationNote::new(
                            NoteType::Bv21Error,
                            VerificationNoteCode::MismatchedSubtitleLanguages,
                        ));
                    }
                    _ => {}
                }
            }
            None => {
                let mut note = VerificationNote::new(
                    NoteType::Bv21Error,
                    VerificationNoteCode::MissingSubtitleLanguage,
                );
                if let Some(file) = &file {
                    note = note.with_file(file);
                }
                notes.push(note);
            }
        }

        if let Some(file_path) = &file {
            if let Ok(metadata) = std::fs::metadata(file_path) {
                if metadata.len() > 115 * MB {
                    notes.push(
                        VerificationNote::new(
                            NoteType::Bv21Error,
                            VerificationNoteCode::InvalidTimedTextSizeInBytes,
                        )
                        .with_note(metadata.len().to_string())
                        .with_file(file_path),
                    );
                }
            }
        }

        let total_font_size: usize = asset.font_data().iter().map(|(_, d)| d.len()).sum();
        if total_font_size as u64 > 10 * MB {
            let mut note = VerificationNote::new(
                NoteType::Bv21Error,
                VerificationNoteCode::InvalidTimedTextFontSizeInBytes,
            )
            .with_note(total_font_size.to_string());
            if let Some(file) = &file {
                note = note.with_file(file);
            }
            notes.push(note);
        }

        match &asset.start_time {
            None => {
                let mut note = VerificationNote::new(
                    NoteType::Bv21Error,
                    VerificationNoteCode::MissingSubtitleStartTime,
                );
                if let Some(file) = &file {
                    note = note.with_file(file);
                }
                notes.push(note);
            }
            Some(start) if !start.is_zero() => {
                let mut note = VerificationNote::new(
                    NoteType::Bv21Error,
                    VerificationNoteCode::InvalidSubtitleStartTime,
                );
                if let Some(file) = &file {
                    note = note.with_file(file);
                }
                notes.push(note);
            }
            _ => {}
        }
    }

    if closed_caption && raw.len() as u64 > 256 * KB {
        let mut note = VerificationNote::new(
            NoteType::Bv21Error,
            VerificationNoteCode::InvalidClosedCaptionXmlSizeInBytes,
        )
        .with_note(raw.len().to_string());
        if let Some(file) = &file {
            note = note.with_file(file);
        }
        notes.push(note);
    }
}

fn check_text_timing(package: &Package, cpl_index: usize, notes: &mut Vec<VerificationNote>) {
    let cpl = &package.cpls()[cpl_index];
    if cpl.reels.is_empty() {
        return;
    }

    let picture_frame_rate = cpl.reels[0]
        .main_picture
        .as_ref()
        .map(|p| p.frame_rate().numerator);

    let mut result = TextTimingResult::default();

    if cpl.reels[0].main_subtitle.is_some() {
        let tracks: Vec<(String, i64)> = cpl
            .reels
            .iter()
            .filter_map(|reel| {
                let subtitle = reel.main_subtitle.as_ref()?;
                let asset = resolved_subtitle(package, &subtitle.reference)?;
                Some((asset.xml_as_string(), subtitle.reference.actual_duration()))
            })
            .collect();
        text::check_text_timing(&tracks, picture_frame_rate, &mut result);
    }

    for caption_index in 0..cpl.reels[0].closed_captions.len() {
        let tracks: Vec<(String, i64)> = cpl
            .reels
            .iter()
            .filter_map(|reel| {
                let caption = reel.closed_captions.get(caption_index)?;
                let asset = resolved_subtitle(package, &caption.reference)?;
                Some((asset.xml_as_string(), caption.reference.actual_duration()))
            })
            .collect();
        text::check_text_timing(&tracks, picture_frame_rate, &mut result);
    }

    if result.too_early {
        notes.push(VerificationNote::new(
            NoteType::Warning,
            VerificationNoteCode::InvalidSubtitleFirstTextTime,
        ));
    }
    if result.too_short {
        notes.push(VerificationNote::new(
            NoteType::Warning,
            VerificationNoteCode::InvalidSubtitleDuration,
        ));
    }
    if result.too_close {
        notes.push(VerificationNote::new(
            NoteType::Warning,
            VerificationNoteCode::InvalidSubtitleSpacing,
        ));
    }
}

fn check_text_lines(package: &Package, cpl_index: usize, notes: &mut Vec<VerificationNote>) {
    let cpl = &package.cpls()[cpl_index];

    let mut result = LinesCharactersResult::default();
    for reel in &cpl.reels {
        if let Some(subtitle) = &reel.main_subtitle {
            if let Some(asset) = resolved_subtitle(package, &subtitle.reference) {
                text::check_text_lines_and_characters(&asset, 52, 79, &mut result);
            }
        }
    }
    if result.line_count_exceeded {
        notes.push(VerificationNote::new(
            NoteType::Warning,
            VerificationNoteCode::InvalidSubtitleLineCount,
        ));
    }
    if result.error_length_exceeded {
        notes.push(VerificationNote::new(
            NoteType::Warning,
            VerificationNoteCode::InvalidSubtitleLineLength,
        ));
    } else if result.warning_length_exceeded {
        notes.push(VerificationNote::new(
            NoteType::Warning,
            VerificationNoteCode::NearlyInvalidSubtitleLineLength,
        ));
    }

    let mut result = LinesCharactersResult::default();
    for reel in &cpl.reels {
        for caption in &reel.closed_captions {
            if let Some(asset) = resolved_subtitle(package, &caption.reference) {
                text::check_text_lines_and_characters(&asset, 32, 32, &mut result);
            }
        }
    }
    if result.line_count_exceeded {
        notes.push(VerificationNote::new(
            NoteType::Bv21Error,
            VerificationNoteCode::InvalidClosedCaptionLineCount,
        ));
    }
    if result.error_length_exceeded {
        notes.push(VerificationNote::new(
            NoteType::Bv21Error,
            VerificationNoteCode::InvalidClosedCaptionLineLength,
        ));
    }
}

/// Check the `<ExtensionMetadata>` that Bv2.1 requires, by re-reading the
/// CPL file rather than trusting the parsed model.
fn check_extension_metadata(
    cpl_id: &crate::types::Id,
    cpl_file: &Path,
    notes: &mut Vec<VerificationNote>,
) {
    let document = match Document::read_file(cpl_file) {
        Ok(d) => d,
        Err(_) => return,
    };

    let mut missing = false;
    let mut malformed = String::new();

    let metadata = document
        .root
        .child("ReelList")
        .and_then(|l| l.child("Reel"))
        .and_then(|r| r.child("AssetList"))
        .and_then(|a| a.child("CompositionMetadataAsset"));

    if let Some(metadata) = metadata {
        match metadata.child("ExtensionMetadataList") {
            None => missing = true,
            Some(list) => {
                missing = true;
                for extension in list.children_named("ExtensionMetadata") {
                    if extension.attribute("scope").unwrap_or("")
                        != crate::cpl::metadata::APP_SCOPE
                    {
                        continue;
                    }
                    missing = false;
                    if let Some(name) = extension.child("Name") {
                        if name.text() != crate::cpl::metadata::APP_NAME {
                            malformed = "<Name> should be 'Application'".to_string();
                        }
                    }
                    if let Some(property) = extension
                        .child("PropertyList")
                        .and_then(|l| l.child("Property"))
                    {
                        if let Some(name) = property.child("Name") {
                            if name.text() != crate::cpl::metadata::APP_PROPERTY_NAME {
                                malformed =
                                    "<Name> property should be 'DCP Constraints Profile'".to_string();
                            }
                        }
                        if let Some(value) = property.child("Value") {
                            if value.text() != crate::cpl::metadata::APP_PROPERTY_VALUE {
                                malformed =
                                    "<Value> property should be 'SMPTE-RDD-52:2020-Bv2.1'".to_string();
                            }
                        }
                    }
                }
            }
        }
    }

    if missing {
        notes.push(
            VerificationNote::new(
                NoteType::Bv21Error,
                VerificationNoteCode::MissingExtensionMetadata,
            )
            .with_note(cpl_id.to_string())
            .with_file(cpl_file),
        );
    } else if !malformed.is_empty() {
        notes.push(
            VerificationNote::new(
                NoteType::Bv21Error,
                VerificationNoteCode::InvalidExtensionMetadata,
            )
            .with_note(malformed)
            .with_file(cpl_file),
        );
    }
}

fn file_name(note: &VerificationNote) -> String {
    note.file()
        .and_then(|f| f.file_name())
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// A human-readable sentence for a note, with any contextual id or filename
/// interpolated.
pub fn note_to_string(note: &VerificationNote) -> String {
    let detail = note.note().unwrap_or("").to_string();
    match note.code() {
        VerificationNoteCode::FailedRead => detail,
        VerificationNoteCode::MismatchedCplHashes => format!(
            "The hash of the CPL {} in the PKL does not agree with the CPL file.",
            detail
        ),
        VerificationNoteCode::InvalidPictureFrameRate => format!(
            "The picture in a reel has an invalid frame rate {}.",
            detail
        ),
        VerificationNoteCode::IncorrectPictureHash => format!(
            "The hash of the picture asset {} does not agree with the PKL file.",
            file_name(note)
        ),
        VerificationNoteCode::MismatchedPictureHashes => format!(
            "The PKL and CPL hashes differ for the picture asset {}.",
            file_name(note)
        ),
        VerificationNoteCode::IncorrectSoundHash => format!(
            "The hash of the sound asset {} does not agree with the PKL file.",
            file_name(note)
        ),
        VerificationNoteCode::MismatchedSoundHashes => format!(
            "The PKL and CPL hashes differ for the sound asset {}.",
            file_name(note)
        ),
        VerificationNoteCode::EmptyAssetPath => {
            "The asset map contains an empty asset path.".to_string()
        }
        VerificationNoteCode::MissingAsset => format!(
            "The file {} for an asset in the asset map cannot be found.",
            file_name(note)
        ),
        VerificationNoteCode::MismatchedStandard => {
            "The DCP contains both SMPTE and Interop parts.".to_string()
        }
        VerificationNoteCode::InvalidXml => format!(
            "An XML file is badly formed: {} ({}:{})",
            detail,
            file_name(note),
            note.line().unwrap_or(0)
        ),
        VerificationNoteCode::MissingAssetmap => {
            "No ASSETMAP or ASSETMAP.xml was found.".to_string()
        }
        VerificationNoteCode::InvalidIntrinsicDuration => format!(
            "The intrinsic duration of the asset {} is less than 1 second long.",
            detail
        ),
        VerificationNoteCode::InvalidDuration => format!(
            "The duration of the asset {} is less than 1 second long.",
            detail
        ),
        VerificationNoteCode::InvalidPictureFrameSizeInBytes => format!(
            "The instantaneous bit rate of the picture asset {} is larger than the limit of 250Mbit/s in at least one place.",
            file_name(note)
        ),
        VerificationNoteCode::NearlyInvalidPictureFrameSizeInBytes => format!(
            "The instantaneous bit rate of the picture asset {} is close to the limit of 250Mbit/s in at least one place.",
            file_name(note)
        ),
        VerificationNoteCode::ExternalAsset => format!(
            "The asset {} that this DCP refers to is not included in the DCP.  It may be a VF.",
            detail
        ),
        VerificationNoteCode::InvalidStandard => {
            "This DCP does not use the SMPTE standard.".to_string()
        }
        VerificationNoteCode::InvalidLanguage => format!(
            "The DCP specifies a language '{}' which does not conform to the RFC 5646 standard.",
            detail
        ),
        VerificationNoteCode::InvalidPictureSizeInPixels => format!(
            "The size {} of picture asset {} is not allowed.",
            detail,
            file_name(note)
        ),
        VerificationNoteCode::InvalidPictureFrameRateFor2k => format!(
            "The frame rate {} of picture asset {} is not allowed for 2K DCPs.",
            detail,
            file_name(note)
        ),
        VerificationNoteCode::InvalidPictureFrameRateFor4k => format!(
            "The frame rate {} of picture asset {} is not allowed for 4K DCPs.",
            detail,
            file_name(note)
        ),
        VerificationNoteCode::InvalidPictureAssetResolutionFor3d => {
            "3D 4K DCPs are not allowed.".to_string()
        }
        VerificationNoteCode::InvalidClosedCaptionXmlSizeInBytes => format!(
            "The size {} of the closed caption asset {} is larger than the 256KB maximum.",
            detail,
            file_name(note)
        ),
        VerificationNoteCode::InvalidTimedTextSizeInBytes => format!(
            "The size {} of the timed text asset {} is larger than the 115MB maximum.",
            detail,
            file_name(note)
        ),
        VerificationNoteCode::InvalidTimedTextFontSizeInBytes => format!(
            "The size {} of the fonts in timed text asset {} is larger than the 10MB maximum.",
            detail,
            file_name(note)
        ),
        VerificationNoteCode::MissingSubtitleLanguage => format!(
            "The XML for the SMPTE subtitle asset {} has no <Language> tag.",
            file_name(note)
        ),
        VerificationNoteCode::MismatchedSubtitleLanguages => {
            "Some subtitle assets have different <Language> tags than others.".to_string()
        }
        VerificationNoteCode::MissingSubtitleStartTime => format!(
            "The XML for the SMPTE subtitle asset {} has no <StartTime> tag.",
            file_name(note)
        ),
        VerificationNoteCode::InvalidSubtitleStartTime => format!(
            "The XML for a SMPTE subtitle asset {} has a non-zero <StartTime> tag.",
            file_name(note)
        ),
        VerificationNoteCode::InvalidSubtitleFirstTextTime => {
            "The first subtitle or closed caption is less than 4 seconds from the start of the DCP."
                .to_string()
        }
        VerificationNoteCode::InvalidSubtitleDuration => {
            "At least one subtitle lasts less than 15 frames.".to_string()
        }
        VerificationNoteCode::InvalidSubtitleSpacing => {
            "At least one pair of subtitles is separated by less than 2 frames.".to_string()
        }
        VerificationNoteCode::InvalidSubtitleLineCount => {
            "There are more than 3 subtitle lines in at least one place in the DCP.".to_string()
        }
        VerificationNoteCode::NearlyInvalidSubtitleLineLength => {
            "There are more than 52 characters in at least one subtitle line.".to_string()
        }
        VerificationNoteCode::InvalidSubtitleLineLength => {
            "There are more than 79 characters in at least one subtitle line.".to_string()
        }
        VerificationNoteCode::InvalidClosedCaptionLineCount => {
            "There are more than 3 closed caption lines in at least one place.".to_string()
        }
        VerificationNoteCode::InvalidClosedCaptionLineLength => {
            "There are more than 32 characters in at least one closed caption line.".to_string()
        }
        VerificationNoteCode::InvalidSoundFrameRate => format!(
            "The sound asset {} has a sampling rate of {}.",
            file_name(note),
            detail
        ),
        VerificationNoteCode::MissingCplAnnotationText => {
            format!("The CPL {} has no <AnnotationText> tag.", detail)
        }
        VerificationNoteCode::MismatchedCplAnnotationText => format!(
            "The CPL {} has an <AnnotationText> which differs from its <ContentTitleText>.",
            detail
        ),
        VerificationNoteCode::MismatchedAssetDuration => {
            "All assets in a reel do not have the same duration.".to_string()
        }
        VerificationNoteCode::MissingMainSubtitleFromSomeReels => {
            "At least one reel contains a subtitle asset, but some reel(s) do not.".to_string()
        }
        VerificationNoteCode::MismatchedClosedCaptionAssetCounts => {
            "At least one reel has closed captions, but reels have different numbers of closed caption assets."
                .to_string()
        }
        VerificationNoteCode::MissingSubtitleEntryPoint => {
            format!("The subtitle asset {} has no <EntryPoint> tag.", detail)
        }
        VerificationNoteCode::IncorrectSubtitleEntryPoint => {
            format!("The subtitle asset {} has an <EntryPoint> other than 0.", detail)
        }
        VerificationNoteCode::MissingClosedCaptionEntryPoint => {
            format!("The closed caption asset {} has no <EntryPoint> tag.", detail)
        }
        VerificationNoteCode::IncorrectClosedCaptionEntryPoint => format!(
            "The closed caption asset {} has an <EntryPoint> other than 0.",
            detail
        ),
        VerificationNoteCode::MissingHash => {
            format!("The asset {} has no <Hash> tag in the CPL.", detail)
        }
        VerificationNoteCode::MissingFfecInFeature => {
            "The DCP is marked as a Feature but there is no FFEC (first frame of end credits) marker."
                .to_string()
        }
        VerificationNoteCode::MissingFfmcInFeature => {
            "The DCP is marked as a Feature but there is no FFMC (first frame of moving credits) marker."
                .to_string()
        }
        VerificationNoteCode::MissingFfoc => {
            "There should be a FFOC (first frame of content) marker.".to_string()
        }
        VerificationNoteCode::MissingLfoc => {
            "There should be a LFOC (last frame of content) marker.".to_string()
        }
        VerificationNoteCode::IncorrectFfoc => {
            format!("The FFOC marker is {} instead of 1.", detail)
        }
        VerificationNoteCode::IncorrectLfoc => format!(
            "The LFOC marker is {} instead of 1 less than the duration of the last reel.",
            detail
        ),
        VerificationNoteCode::MissingCplMetadata => {
            format!("The CPL {} has no <CompositionMetadataAsset> tag.", detail)
        }
        VerificationNoteCode::MissingCplMetadataVersionNumber => format!(
            "The CPL {} has no <VersionNumber> in its <CompositionMetadataAsset>.",
            detail
        ),
        VerificationNoteCode::MissingExtensionMetadata => format!(
            "The CPL {} has no <ExtensionMetadata> in its <CompositionMetadataAsset>.",
            detail
        ),
        VerificationNoteCode::InvalidExtensionMetadata => format!(
            "The CPL {} has a malformed <ExtensionMetadata> ({}).",
            file_name(note),
            detail
        ),
        VerificationNoteCode::UnsignedCplWithEncryptedContent => format!(
            "The CPL {}, which has encrypted content, is not signed.",
            detail
        ),
        VerificationNoteCode::UnsignedPklWithEncryptedContent => format!(
            "The PKL {}, which has encrypted content, is not signed.",
            detail
        ),
        VerificationNoteCode::MismatchedPklAnnotationTextWithCpl => format!(
            "The PKL {} has only one CPL but its <AnnotationText> does not match the CPL's <ContentTitleText>.",
            detail
        ),
        VerificationNoteCode::PartiallyEncrypted => {
            "Some assets are encrypted but some are not.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notes_render_as_sentences() {
        let note = VerificationNote::new(NoteType::Error, VerificationNoteCode::MissingAssetmap);
        assert_eq!(note_to_string(&note), "No ASSETMAP or ASSETMAP.xml was found.");

        let note = VerificationNote::new(
            NoteType::Bv21Error,
            VerificationNoteCode::InvalidPictureSizeInPixels,
        )
        .with_note("1920x1080")
        .with_file("/dcp/video.mxf");
        assert_eq!(
            note_to_string(&note),
            "The size 1920x1080 of picture asset video.mxf is not allowed."
        );
    }

    #[test]
    fn notes_compare_on_all_fields() {
        let a = VerificationNote::new(NoteType::Warning, VerificationNoteCode::MissingFfoc);
        let b = VerificationNote::new(NoteType::Warning, VerificationNoteCode::MissingFfoc);
        assert_eq!(a, b);
        let c = b.clone().with_note("x");
        assert_ne!(a, c);
    }

    #[test]
    fn verifying_a_missing_directory_reports_failed_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("not-a-dcp");
        std::fs::create_dir(&missing).unwrap();
        let mut stage = |_: &str, _: Option<&Path>| {};
        let mut progress = |_: f32| true;
        let notes = verify(
            &[missing],
            &mut stage,
            &mut progress,
            &Config::default(),
        );
        assert!(notes
            .iter()
            .any(|n| n.code() == VerificationNoteCode::FailedRead));
        // Not SMPTE either, since nothing was read.
        assert!(notes
            .iter()
            .any(|n| n.code() == VerificationNoteCode::InvalidStandard));
    }
}
