// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! Verifier behaviour over whole packages.

mod common;

use std::path::{Path, PathBuf};

use common::{config_with, make_simple, SimpleOptions, StubCodec};

use dcpk::package::NameFormat;
use dcpk::types::Size;
use dcpk::verify::{verify, NoteType, VerificationNote, VerificationNoteCode};
use dcpk::Standard;

const ISSUE_DATE: &str = "2012-07-17T04:45:18+00:00";

fn write_package(directory: &Path, codec: &StubCodec, options: &SimpleOptions) {
    let mut package = make_simple(directory, codec, options);
    package
        .write_xml(
            Standard::Smpte,
            "OpenDCP",
            "OpenDCP",
            ISSUE_DATE,
            "A Test DCP",
            None,
            &NameFormat::default(),
        )
        .unwrap();
}

fn run_verify(directory: &Path, codec: &StubCodec) -> Vec<VerificationNote> {
    let mut stage = |_: &str, _: Option<&Path>| {};
    let mut progress = |_: f32| true;
    verify(
        &[directory.to_path_buf()],
        &mut stage,
        &mut progress,
        &config_with(codec),
    )
}

fn codes(notes: &[VerificationNote]) -> Vec<VerificationNoteCode> {
    notes.iter().map(|n| n.code()).collect()
}

#[test]
fn conforming_package_produces_no_notes() {
    let dir = tempfile::tempdir().unwrap();
    let codec = StubCodec::default();
    write_package(dir.path(), &codec, &SimpleOptions::default());

    let notes = run_verify(dir.path(), &codec);
    assert!(notes.is_empty(), "unexpected notes: {:?}", notes);
}

#[test]
fn nonconforming_package_produces_the_expected_bv21_notes() {
    let dir = tempfile::tempdir().unwrap();
    // HD-sized picture, consumer audio rate, no metadata, no markers.
    let codec = StubCodec {
        picture_size: Size::new(1920, 1080),
        sound_sampling_rate: 44100,
        ..StubCodec::default()
    };
    write_package(
        dir.path(),
        &codec,
        &SimpleOptions {
            with_metadata: false,
            with_markers: false,
            ..SimpleOptions::default()
        },
    );

    let notes = run_verify(dir.path(), &codec);
    let codes = codes(&notes);

    for expected in [
        VerificationNoteCode::InvalidPictureSizeInPixels,
        VerificationNoteCode::InvalidSoundFrameRate,
        VerificationNoteCode::MissingCplMetadata,
        VerificationNoteCode::MissingFfoc,
        VerificationNoteCode::MissingLfoc,
        VerificationNoteCode::MissingFfecInFeature,
        VerificationNoteCode::MissingFfmcInFeature,
    ] {
        assert!(codes.contains(&expected), "missing {:?} in {:?}", expected, codes);
    }

    // Nothing structural went wrong while loading.
    for unexpected in [
        VerificationNoteCode::FailedRead,
        VerificationNoteCode::MissingAsset,
        VerificationNoteCode::MissingAssetmap,
        VerificationNoteCode::InvalidXml,
        VerificationNoteCode::MismatchedStandard,
    ] {
        assert!(!codes.contains(&unexpected), "unexpected {:?}", unexpected);
    }
}

#[test]
fn interop_package_is_flagged_as_invalid_standard() {
    let dir = tempfile::tempdir().unwrap();
    let codec = StubCodec::default();
    let mut package = make_simple(
        dir.path(),
        &codec,
        &SimpleOptions {
            with_metadata: false,
            with_markers: false,
            ..SimpleOptions::default()
        },
    );
    package
        .write_xml(
            Standard::Interop,
            "OpenDCP",
            "OpenDCP",
            ISSUE_DATE,
            "A Test DCP",
            None,
            &NameFormat::default(),
        )
        .unwrap();

    let notes = run_verify(dir.path(), &codec);
    assert!(notes
        .iter()
        .any(|n| n.code() == VerificationNoteCode::InvalidStandard
            && n.type_() == NoteType::Bv21Error));
}

#[test]
fn tampered_essence_is_reported_as_incorrect_hash() {
    let dir = tempfile::tempdir().unwrap();
    let codec = StubCodec::default();
    write_package(dir.path(), &codec, &SimpleOptions::default());

    // Corrupt the picture essence after the hashes were recorded.
    let video = dir.path().join("video.mxf");
    let mut bytes = std::fs::read(&video).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    std::fs::write(&video, bytes).unwrap();

    let notes = run_verify(dir.path(), &codec);
    assert!(notes
        .iter()
        .any(|n| n.code() == VerificationNoteCode::IncorrectPictureHash));
    // The sound asset is untouched.
    assert!(!notes
        .iter()
        .any(|n| n.code() == VerificationNoteCode::IncorrectSoundHash));
}

#[test]
fn oversized_picture_frames_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    // At 24fps the error threshold is rint(250e6 / 192) bytes per frame.
    let codec = StubCodec {
        frame_bytes: 1_400_000,
        ..StubCodec::default()
    };
    write_package(dir.path(), &codec, &SimpleOptions::default());
    let notes = run_verify(dir.path(), &codec);
    assert!(notes
        .iter()
        .any(|n| n.code() == VerificationNoteCode::InvalidPictureFrameSizeInBytes));

    // Just under the hard limit but over 230Mbit/s: a warning.
    let dir = tempfile::tempdir().unwrap();
    let codec = StubCodec {
        frame_bytes: 1_250_000,
        ..StubCodec::default()
    };
    write_package(dir.path(), &codec, &SimpleOptions::default());
    let notes = run_verify(dir.path(), &codec);
    assert!(notes
        .iter()
        .any(|n| n.code() == VerificationNoteCode::NearlyInvalidPictureFrameSizeInBytes));
    assert!(!notes
        .iter()
        .any(|n| n.code() == VerificationNoteCode::InvalidPictureFrameSizeInBytes));
}

#[test]
fn missing_essence_file_is_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let codec = StubCodec::default();
    write_package(dir.path(), &codec, &SimpleOptions::default());
    std::fs::remove_file(dir.path().join("audio.mxf")).unwrap();

    let notes = run_verify(dir.path(), &codec);
    assert!(notes
        .iter()
        .any(|n| n.code() == VerificationNoteCode::MissingAsset));
    // The read still succeeds; nothing fatal happened.
    assert!(!notes
        .iter()
        .any(|n| n.code() == VerificationNoteCode::FailedRead));
}

#[test]
fn empty_reel_list_verifies_without_panicking() {
    let dir = tempfile::tempdir().unwrap();
    let codec = StubCodec::default();

    let mut package = dcpk::Package::open(dir.path().to_path_buf()).unwrap();
    let cpl = dcpk::cpl::Cpl::new("Empty", dcpk::types::ContentKind::Feature);
    package.add(cpl);
    package
        .write_xml(
            Standard::Smpte,
            "OpenDCP",
            "OpenDCP",
            ISSUE_DATE,
            "Empty",
            None,
            &NameFormat::default(),
        )
        .unwrap();

    let notes = run_verify(dir.path(), &codec);
    // Structural notes about markers and metadata, but nothing fatal.
    assert!(notes
        .iter()
        .any(|n| n.code() == VerificationNoteCode::MissingFfoc));
    assert!(notes
        .iter()
        .any(|n| n.code() == VerificationNoteCode::MissingCplMetadata));
    assert!(!notes
        .iter()
        .any(|n| n.code() == VerificationNoteCode::FailedRead));
}

#[test]
fn cancellation_stops_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let codec = StubCodec::default();
    write_package(dir.path(), &codec, &SimpleOptions::default());

    let mut stage = |_: &str, _: Option<&Path>| {};
    let mut progress = |_: f32| false;
    let notes = verify(
        &[PathBuf::from(dir.path())],
        &mut stage,
        &mut progress,
        &config_with(&codec),
    );
    assert!(notes
        .iter()
        .any(|n| n.code() == VerificationNoteCode::FailedRead
            && n.note().map(|m| m.contains("cancelled")).unwrap_or(false)));
}
