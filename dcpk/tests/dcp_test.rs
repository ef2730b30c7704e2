// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! Whole-package write/read round trips.

mod common;

use common::{assetmap_entry_ids, config_with, make_simple, SimpleOptions, StubCodec};

use dcpk::equality::{EqualityOptions, NoteType};
use dcpk::kdm::{DecryptedKdm, DecryptedKdmKey};
use dcpk::package::{NameFormat, Package};
use dcpk::types::Id;
use dcpk::Standard;

const ISSUE_DATE: &str = "2012-07-17T04:45:18+00:00";

fn write_simple(directory: &std::path::Path, codec: &StubCodec) -> Package {
    let mut package = make_simple(directory, codec, &SimpleOptions::default());
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
    package
}

#[test]
fn minimal_smpte_dcp_has_expected_files() {
    let dir = tempfile::tempdir().unwrap();
    let codec = StubCodec::default();
    write_simple(dir.path(), &codec);

    let files = common::list_files(dir.path());
    let names: Vec<String> = files
        .iter()
        .map(|f| f.file_name().unwrap().to_string_lossy().to_string())
        .collect();

    // CPL, PKL, ASSETMAP plus VOLINDEX plus the two essence files.
    assert_eq!(files.len(), 6, "unexpected files: {:?}", names);
    assert!(names.iter().any(|n| n.starts_with("cpl_") && n.ends_with(".xml")));
    assert!(names.iter().any(|n| n.starts_with("pkl_") && n.ends_with(".xml")));
    assert!(names.contains(&"ASSETMAP.xml".to_string()));
    assert!(names.contains(&"VOLINDEX.xml".to_string()));
    assert!(names.contains(&"video.mxf".to_string()));
    assert!(names.contains(&"audio.mxf".to_string()));
}

#[test]
fn written_dcp_reads_back_equal() {
    let dir = tempfile::tempdir().unwrap();
    let codec = StubCodec::default();
    let mut written = write_simple(dir.path(), &codec);

    let mut read = Package::open(dir.path().to_path_buf()).unwrap();
    let mut notes = Vec::new();
    read.read(Some(&mut notes), &config_with(&codec)).unwrap();
    assert!(notes.is_empty(), "unexpected notes: {:?}", notes);
    assert_eq!(read.standard(), Some(Standard::Smpte));
    assert_eq!(read.cpls().len(), 1);
    assert_eq!(read.pkls().len(), 1);

    let mut differences = Vec::new();
    let mut handler = |t: NoteType, m: String| {
        if t == NoteType::Error {
            differences.push(m);
        }
    };
    assert!(
        written.equals(&mut read, &EqualityOptions::default(), &mut handler),
        "packages differ: {:?}",
        differences
    );
}

#[test]
fn reading_the_same_dcp_twice_is_equal_and_different_dcps_are_not() {
    let codec = StubCodec::default();
    let dir_a = tempfile::tempdir().unwrap();
    write_simple(dir_a.path(), &codec);
    // A second package that differs structurally: its picture is 3D.
    let codec_b = StubCodec {
        stereo: true,
        ..StubCodec::default()
    };
    let dir_b = tempfile::tempdir().unwrap();
    write_simple(dir_b.path(), &codec_b);

    let config = config_with(&codec);
    let mut first = Package::open(dir_a.path().to_path_buf()).unwrap();
    first.read(None, &config).unwrap();
    let mut second = Package::open(dir_a.path().to_path_buf()).unwrap();
    second.read(None, &config).unwrap();

    let mut quiet = |_: NoteType, _: String| {};
    assert!(first.equals(&mut second, &EqualityOptions::default(), &mut quiet));

    let mut other = Package::open(dir_b.path().to_path_buf()).unwrap();
    other.read(None, &config_with(&codec_b)).unwrap();
    let mut errors = Vec::new();
    let mut handler = |t: NoteType, m: String| {
        if t == NoteType::Error {
            errors.push(m);
        }
    };
    assert!(!first.equals(&mut other, &EqualityOptions::default(), &mut handler));
    assert!(!errors.is_empty());
}

#[test]
fn assetmap_order_is_preserved_across_read_and_write() {
    let dir = tempfile::tempdir().unwrap();
    let codec = StubCodec::default();
    write_simple(dir.path(), &codec);
    let original_order = assetmap_entry_ids(&dir.path().join("ASSETMAP.xml"));

    let mut package = Package::open(dir.path().to_path_buf()).unwrap();
    package.read(None, &config_with(&codec)).unwrap();
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

    let rewritten_order = assetmap_entry_ids(&dir.path().join("ASSETMAP.xml"));
    assert_eq!(original_order, rewritten_order);
}

#[test]
fn unreferenced_assetmap_entry_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let codec = StubCodec::default();
    write_simple(dir.path(), &codec);

    // Add an extra entry to the ASSETMAP for a file that no PKL mentions.
    let extra = dir.path().join("extra.bin");
    std::fs::write(&extra, b"not in any PKL").unwrap();
    let assetmap_path = dir.path().join("ASSETMAP.xml");
    let text = std::fs::read_to_string(&assetmap_path).unwrap();
    let extra_id = Id::generate();
    let entry = format!(
        "<Asset><Id>{}</Id><ChunkList><Chunk><Path>extra.bin</Path>\
         <VolumeIndex>1</VolumeIndex><Offset>0</Offset><Length>14</Length>\
         </Chunk></ChunkList></Asset></AssetList>",
        extra_id.to_urn()
    );
    std::fs::write(&assetmap_path, text.replacen("</AssetList>", &entry, 1)).unwrap();

    let mut package = Package::open(dir.path().to_path_buf()).unwrap();
    let mut notes = Vec::new();
    package.read(Some(&mut notes), &config_with(&codec)).unwrap();

    assert!(notes.is_empty(), "unexpected notes: {:?}", notes);
    assert!(package.asset_vector().iter().all(|a| a.id() != &extra_id));
    // But the map itself still knows about it.
    assert!(package.asset_map().unwrap().contains(&extra_id));
}

#[test]
fn interop_subtitle_package_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let codec = StubCodec::default();
    let mut package = Package::open(dir.path().to_path_buf()).unwrap();

    let mut subtitle = dcpk::asset::SubtitleAsset::new_interop("A Test DCP");
    subtitle.language = Some("fr".to_string());
    subtitle
        .write_xml(dir.path().join("subs.xml"))
        .unwrap();
    let subtitle_id = subtitle.id().clone();
    let subtitle = dcpk::asset::Asset::Subtitle(subtitle);

    let mut cpl = dcpk::cpl::Cpl::new("A Test DCP", dcpk::types::ContentKind::Short);
    let mut reel = dcpk::reel::Reel::new();
    reel.main_subtitle = Some(dcpk::reel::ReelSubtitle {
        reference: dcpk::reel::ReelAssetRef::for_asset(&subtitle),
        language: Some("fr".to_string()),
    });
    cpl.add(reel);
    package.add(cpl);
    package.add_asset(subtitle);

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

    let mut read = Package::open(dir.path().to_path_buf()).unwrap();
    let mut notes = Vec::new();
    read.read(Some(&mut notes), &config_with(&codec)).unwrap();
    assert!(notes.is_empty(), "unexpected notes: {:?}", notes);
    assert_eq!(read.standard(), Some(Standard::Interop));

    let subtitles: Vec<_> = read
        .asset_vector()
        .iter()
        .filter_map(|a| match a {
            dcpk::asset::Asset::Subtitle(s) => Some(s),
            _ => None,
        })
        .collect();
    assert_eq!(subtitles.len(), 1);
    assert_eq!(subtitles[0].id(), &subtitle_id);
    assert_eq!(subtitles[0].standard, Standard::Interop);
    assert_eq!(subtitles[0].language.as_deref(), Some("fr"));
    // The resolved reference points at the subtitle asset.
    assert!(read.cpls()[0].reels[0]
        .main_subtitle
        .as_ref()
        .unwrap()
        .reference
        .resolved());
}

#[test]
fn kdm_application_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let key_id = Id::generate();
    let codec = StubCodec {
        encrypted: true,
        key_id: Some(key_id.clone()),
        ..StubCodec::default()
    };
    write_simple(dir.path(), &codec);

    let mut package = Package::open(dir.path().to_path_buf()).unwrap();
    package.read(None, &config_with(&codec)).unwrap();
    assert!(package.encrypted());

    let cpl_id = package.cpls()[0].id().clone();
    let kdm = DecryptedKdm::new(vec![DecryptedKdmKey {
        cpl_id,
        key_id,
        key: vec![7; 16],
    }]);

    package.add_kdm(&kdm);
    let after_first: Vec<Option<Vec<u8>>> = package
        .asset_vector()
        .iter()
        .map(|a| a.key().map(|k| k.to_vec()))
        .collect();
    assert!(after_first.iter().any(|k| k.is_some()));

    package.add_kdm(&kdm);
    let after_second: Vec<Option<Vec<u8>>> = package
        .asset_vector()
        .iter()
        .map(|a| a.key().map(|k| k.to_vec()))
        .collect();
    assert_eq!(after_first, after_second);
}

#[test]
fn signed_package_round_trips_and_resigns_identically() {
    let dir = tempfile::tempdir().unwrap();
    let codec = StubCodec::default();
    let chain = dcpk::CertificateChain::new_self_signed(
        "example.org",
        "example.org",
        ".smpte-430-2.ROOT.NOT_FOR_PRODUCTION",
        ".smpte-430-2.INTERMEDIATE.NOT_FOR_PRODUCTION",
        "CS.smpte-430-2.LEAF.NOT_FOR_PRODUCTION",
    )
    .unwrap();

    let mut package = make_simple(dir.path(), &codec, &SimpleOptions::default());
    package
        .write_xml(
            Standard::Smpte,
            "OpenDCP",
            "OpenDCP",
            ISSUE_DATE,
            "A Test DCP",
            Some(&chain),
            &NameFormat::default(),
        )
        .unwrap();

    let mut read = Package::open(dir.path().to_path_buf()).unwrap();
    read.read(None, &config_with(&codec)).unwrap();
    assert!(read.cpls()[0].signed());
    assert!(read.pkls()[0].signed());

    // The CPL's signature verifies against the embedded chain.
    let cpl_file = read.cpls()[0].file().unwrap().to_path_buf();
    let document = dcpk::xml::Document::read_file(&cpl_file).unwrap();
    dcpk::sign::verify_signature(&document.root, None).unwrap();
    dcpk::sign::verify_signature(&document.root, Some(&chain)).unwrap();
    let first_signature = signature_value(&document.root);

    // Re-writing the same composition with the same signer reproduces the
    // same signature bytes.
    let mut again = Package::open(dir.path().to_path_buf()).unwrap();
    again.read(None, &config_with(&codec)).unwrap();
    again
        .write_xml(
            Standard::Smpte,
            "OpenDCP",
            "OpenDCP",
            ISSUE_DATE,
            "A Test DCP",
            Some(&chain),
            &NameFormat::default(),
        )
        .unwrap();
    let document = dcpk::xml::Document::read_file(&cpl_file).unwrap();
    assert_eq!(signature_value(&document.root), first_signature);
}

fn signature_value(root: &dcpk::xml::Element) -> String {
    root.child("Signature")
        .unwrap()
        .optional_string_child("SignatureValue")
        .unwrap()
}

#[test]
fn sound_rewrite_compares_equal_until_a_sample_changes() {
    let codec = StubCodec::default();
    let dir_a = tempfile::tempdir().unwrap();
    write_simple(dir_a.path(), &codec);

    // "Re-encode" the sound by copying the package, then perturb one
    // 24-bit sample by one step.
    let dir_b = tempfile::tempdir().unwrap();
    for entry in std::fs::read_dir(dir_a.path()).unwrap() {
        let entry = entry.unwrap();
        std::fs::copy(entry.path(), dir_b.path().join(entry.file_name())).unwrap();
    }

    let config = config_with(&codec);
    let options = EqualityOptions {
        reel_hashes_can_differ: true,
        max_audio_sample_error: 0,
        codec: Some(std::sync::Arc::new(codec.clone())),
        ..EqualityOptions::default()
    };

    let mut quiet = |_: NoteType, _: String| {};
    let mut a = Package::open(dir_a.path().to_path_buf()).unwrap();
    a.read(None, &config).unwrap();
    let mut b = Package::open(dir_b.path().to_path_buf()).unwrap();
    b.read(None, &config).unwrap();
    assert!(a.equals(&mut b, &options, &mut quiet));

    let audio = dir_b.path().join("audio.mxf");
    let mut bytes = std::fs::read(&audio).unwrap();
    bytes[4] ^= 0x01;
    std::fs::write(&audio, bytes).unwrap();

    let mut a = Package::open(dir_a.path().to_path_buf()).unwrap();
    a.read(None, &config).unwrap();
    let mut b = Package::open(dir_b.path().to_path_buf()).unwrap();
    b.read(None, &config).unwrap();
    assert!(!a.equals(&mut b, &options, &mut quiet));
}
