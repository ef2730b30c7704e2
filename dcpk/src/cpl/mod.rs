// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! Composition playlists.
//!
//! A CPL is both a manifest (it lists reels and their asset references)
//! and an asset in its own right: it has an id, lives in the package
//! directory, is entered into the PKL with a digest, and may be signed.
//! Reading infers the dialect from the root namespace; writing emits the
//! selected dialect and, when a signer is supplied, combines serialization
//! and signing into one step so the signature digest can never go stale.

pub mod metadata;

use std::path::{Path, PathBuf};

use crate::asset::Asset;
use crate::crypto::CertificateChain;
use crate::equality::{EqualityOptions, NoteHandler, NoteType};
use crate::error::{Error, ReadErrorKind, Result};
use crate::kdm::DecryptedKdm;
use crate::pkl::Pkl;
use crate::reel::Reel;
use crate::types::{ContentKind, ContentVersion, Id, Rating, Standard};
use crate::util::Progress;
use crate::xml::{namespaces, Document, Element};

pub use metadata::CompositionMetadata;

#[derive(Clone, Debug)]
pub struct Cpl {
    id: Id,
    file: Option<PathBuf>,
    hash: Option<String>,
    pub annotation_text: Option<String>,
    pub issuer: String,
    pub creator: String,
    pub issue_date: String,
    pub content_title_text: String,
    pub content_kind: ContentKind,
    content_versions: Vec<ContentVersion>,
    pub ratings: Vec<Rating>,
    pub reels: Vec<Reel>,
    pub metadata: Option<CompositionMetadata>,
    /// The dialect this CPL was read as, when it was read from a file.
    standard: Option<Standard>,
    /// Did the document carry a `<Signature>` when read?
    signed: bool,
}

pub fn static_pkl_type(standard: Standard) -> &'static str {
    match standard {
        Standard::Interop => "text/xml;asdcpKind=CPL",
        Standard::Smpte => "text/xml",
    }
}

impl Cpl {
    /// Create a CPL ready for writing. The content title defaults to the
    /// annotation text and a fresh content version is generated.
    pub fn new(annotation_text: &str, content_kind: ContentKind) -> Cpl {
        Cpl {
            id: Id::generate(),
            file: None,
            hash: None,
            annotation_text: Some(annotation_text.to_string()),
            issuer: String::new(),
            creator: String::new(),
            issue_date: crate::types::LocalTime::now().as_string(),
            content_title_text: annotation_text.to_string(),
            content_kind,
            content_versions: vec![ContentVersion::default_now()],
            ratings: Vec::new(),
            reels: Vec::new(),
            metadata: None,
            standard: None,
            signed: false,
        }
    }

    /// Read a CPL from an XML file.
    pub fn from_file(path: &Path) -> Result<Cpl> {
        let document = Document::read_file(path)?;
        let root = &document.root;
        if root.name() != "CompositionPlaylist" {
            return Err(ReadErrorKind::Other(format!(
                "expected <CompositionPlaylist>, found <{}>",
                root.name()
            ))
            .into());
        }
        let standard = match root.namespace() {
            Some(namespaces::CPL_INTEROP) => Standard::Interop,
            Some(namespaces::CPL_SMPTE) => Standard::Smpte,
            Some(other) => {
                return Err(ReadErrorKind::UnrecognizedNamespace(other.to_string()).into())
            }
            None => {
                return Err(ReadErrorKind::UnrecognizedNamespace(String::new()).into())
            }
        };

        let mut content_versions = Vec::new();
        for version in root.children_named("ContentVersion") {
            content_versions.push(ContentVersion::new(
                version.optional_string_child("Id").unwrap_or_default(),
                version.optional_string_child("LabelText").unwrap_or_default(),
            ));
        }

        let mut ratings = Vec::new();
        if let Some(list) = root.child("RatingList") {
            for rating in list.children_named("Rating") {
                ratings.push(Rating {
                    agency: rating.optional_string_child("Agency").unwrap_or_default(),
                    label: rating.optional_string_child("Label").unwrap_or_default(),
                });
            }
        }

        let mut metadata_element = None;
        let mut reels = Vec::new();
        if let Some(reel_list) = root.child("ReelList") {
            for reel in reel_list.children_named("Reel") {
                reels.push(Reel::parse(reel, &mut metadata_element)?);
            }
        }
        let metadata = metadata_element
            .map(|e| CompositionMetadata::parse(&e))
            .transpose()?;

        Ok(Cpl {
            id: Id::parse(&root.string_child("Id")?),
            file: Some(path.to_path_buf()),
            hash: None,
            annotation_text: root.optional_string_child("AnnotationText"),
            issuer: root.optional_string_child("Issuer").unwrap_or_default(),
            creator: root.optional_string_child("Creator").unwrap_or_default(),
            issue_date: root.string_child("IssueDate")?,
            content_title_text: root.string_child("ContentTitleText")?,
            content_kind: ContentKind::from_str_tolerant(&root.string_child("ContentKind")?)?,
            content_versions,
            ratings,
            reels,
            metadata,
            standard: Some(standard),
            signed: root.child("Signature").is_some(),
        })
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// The dialect this CPL was read as, if it was read from a file.
    pub fn standard(&self) -> Option<Standard> {
        self.standard
    }

    /// Was the document signed when it was read (or last written)?
    pub fn signed(&self) -> bool {
        self.signed
    }

    pub fn add(&mut self, reel: Reel) {
        self.reels.push(reel);
    }

    pub fn content_versions(&self) -> &[ContentVersion] {
        &self.content_versions
    }

    /// Replace the default content version. Fails if a version with the
    /// same id is already present.
    pub fn set_content_version(&mut self, version: ContentVersion) -> Result<()> {
        if self.content_versions.iter().any(|v| v.id == version.id) {
            return Err(Error::BadSetting("content version id"));
        }
        self.content_versions = vec![version];
        Ok(())
    }

    pub fn add_content_version(&mut self, version: ContentVersion) -> Result<()> {
        if self.content_versions.iter().any(|v| v.id == version.id) {
            return Err(Error::BadSetting("content version id"));
        }
        self.content_versions.push(version);
        Ok(())
    }

    /// Set the metadata version number; rejects values that cannot be
    /// represented in the manifest.
    pub fn set_version_number(&mut self, version: i64) -> Result<()> {
        if version < 0 {
            return Err(Error::BadSetting("version number"));
        }
        self.metadata
            .get_or_insert_with(CompositionMetadata::default)
            .version_number = Some(version as u32);
        Ok(())
    }

    /// The `<FullContentTitleText>` from the composition metadata, used as
    /// a proxy for the metadata's presence.
    pub fn full_content_title_text(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.full_content_title_text.as_deref())
    }

    pub fn version_number(&self) -> Option<u32> {
        self.metadata.as_ref().and_then(|m| m.version_number)
    }

    pub fn release_territory(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.release_territory.as_deref())
    }

    pub fn release_territory_scope(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.release_territory_scope.as_deref())
    }

    pub fn additional_subtitle_languages(&self) -> Vec<String> {
        self.metadata
            .as_ref()
            .map(|m| m.additional_subtitle_languages.clone())
            .unwrap_or_default()
    }

    /// Fill every reel reference from the package's flat asset vector.
    pub fn resolve_refs(&mut self, assets: &[Asset]) {
        for reel in &mut self.reels {
            reel.resolve_refs(assets);
        }
    }

    /// Route each of a KDM's keys to the matching encrypted assets.
    pub fn add_kdm(&self, kdm: &DecryptedKdm, assets: &mut [Asset]) {
        for reel in &self.reels {
            reel.add_kdm(kdm, assets);
        }
    }

    /// Is any referenced asset encrypted?
    pub fn any_encrypted(&self, assets: &[Asset]) -> bool {
        self.reels.iter().any(|r| r.encrypted(assets))
    }

    /// Are all resolvable MXF references encrypted?
    pub fn all_encrypted(&self, assets: &[Asset]) -> bool {
        let mut saw_any = false;
        for reel in &self.reels {
            for reference in reel.references() {
                if let Some(asset) = reference.resolved.and_then(|i| assets.get(i)) {
                    match asset {
                        Asset::Font(_) => continue,
                        Asset::Subtitle(s) if s.standard == Standard::Interop => continue,
                        _ => {
                            saw_any = true;
                            if !asset.encrypted() {
                                return false;
                            }
                        }
                    }
                }
            }
        }
        saw_any
    }

    /// Whether the CompositionMetadataAsset must be emitted: SMPTE CPLs
    /// must carry it whenever sound configuration, sample rate or picture
    /// areas are set.
    fn metadata_required(&self) -> bool {
        match &self.metadata {
            Some(m) => {
                m.any_set()
                    || m.main_sound_configuration.is_some()
                    || m.main_sound_sample_rate.is_some()
                    || m.main_picture_stored_area.is_some()
                    || m.main_picture_active_area.is_some()
            }
            None => false,
        }
    }

    /// Build the CPL document for the given dialect.
    pub fn build_xml(&self, standard: Standard, will_sign: bool) -> Element {
        let mut root = Element::with_namespace("CompositionPlaylist", namespaces::cpl(standard));
        if will_sign {
            root.set_namespace_declaration(namespaces::XMLDSIG, "dsig");
        }

        root.add_child_with_text("Id", &self.id.to_urn());
        root.add_child_with_text(
            "AnnotationText",
            self.annotation_text.as_deref().unwrap_or(""),
        );
        root.add_child_with_text("IssueDate", &self.issue_date);
        root.add_child_with_text("Issuer", &self.issuer);
        root.add_child_with_text("Creator", &self.creator);
        root.add_child_with_text("ContentTitleText", &self.content_title_text);
        root.add_child_with_text("ContentKind", self.content_kind.as_str());
        for version in &self.content_versions {
            let v = root.add_child(Element::new("ContentVersion"));
            v.add_child_with_text("Id", &version.id);
            v.add_child_with_text("LabelText", &version.label_text);
        }
        let rating_list = root.add_child(Element::new("RatingList"));
        for rating in &self.ratings {
            let r = rating_list.add_child(Element::new("Rating"));
            r.add_child_with_text("Agency", &rating.agency);
            r.add_child_with_text("Label", &rating.label);
        }

        let reel_list = root.add_child(Element::new("ReelList"));
        for (index, reel) in self.reels.iter().enumerate() {
            let metadata = if index == 0 && standard == Standard::Smpte && self.metadata_required()
            {
                self.metadata.as_ref().map(|m| m.build())
            } else {
                None
            };
            reel.write_to_cpl(reel_list, standard, metadata);
        }

        root
    }

    /// Write the CPL XML file, signing it when a signer is supplied.
    ///
    /// Signed output is serialized canonically in the same operation as the
    /// signature itself; there is deliberately no way to re-serialize a
    /// signed tree.
    pub fn write_xml(
        &mut self,
        path: &Path,
        standard: Standard,
        signer: Option<&CertificateChain>,
    ) -> Result<()> {
        let mut root = self.build_xml(standard, signer.is_some());
        match signer {
            Some(chain) => {
                crate::sign::sign(&mut root, standard, chain)?;
                Document::new(root).write_file_canonical(path)?;
                self.signed = true;
            }
            None => {
                Document::new(root).write_file_pretty(path)?;
                self.signed = false;
            }
        }
        self.file = Some(path.to_path_buf());
        self.standard = Some(standard);
        self.hash = None;
        Ok(())
    }

    /// The SHA-1 digest of the written CPL file, cached once computed.
    pub fn hash(&mut self, progress: Option<Progress>) -> Result<String> {
        if self.hash.is_none() {
            let file = self.file.as_ref().ok_or_else(|| {
                ReadErrorKind::Other("CPL has not been written, so it cannot be hashed".to_string())
            })?;
            self.hash = Some(crate::util::make_digest(file, progress)?);
        }
        Ok(self.hash.clone().unwrap())
    }

    /// Enter this CPL into a PKL.
    pub fn add_to_pkl(&mut self, pkl: &mut Pkl, standard: Standard) -> Result<()> {
        let hash = self.hash(None)?;
        let file = self.file.clone().expect("hashed CPL must have a file");
        let size = std::fs::metadata(&file)
            .map_err(|e| Error::file(&file, e))?
            .len();
        let annotation = self.annotation_text.clone().unwrap_or_default();
        pkl.add(
            self.id.clone(),
            Some(annotation),
            hash,
            size,
            static_pkl_type(standard).to_string(),
        );
        Ok(())
    }

    /// Enter this CPL into an ASSETMAP `<AssetList>`.
    pub fn write_to_assetmap(&self, asset_list: &mut Element, root: &Path) -> Result<()> {
        let file = self.file.as_ref().ok_or_else(|| {
            ReadErrorKind::Other("CPL has not been written, so it cannot be mapped".to_string())
        })?;
        let relative = file.strip_prefix(root).unwrap_or(file);
        let length = std::fs::metadata(file)
            .map_err(|e| Error::file(file, e))?
            .len();
        let asset = asset_list.add_child(Element::new("Asset"));
        asset.add_child_with_text("Id", &self.id.to_urn());
        let chunk_list = asset.add_child(Element::new("ChunkList"));
        let chunk = chunk_list.add_child(Element::new("Chunk"));
        chunk.add_child_with_text("Path", &relative.to_string_lossy());
        chunk.add_child_with_text("VolumeIndex", "1");
        chunk.add_child_with_text("Offset", "0");
        chunk.add_child_with_text("Length", &length.to_string());
        Ok(())
    }

    pub fn equals(&self, other: &Cpl, options: &EqualityOptions, note: NoteHandler) -> bool {
        if self.annotation_text != other.annotation_text {
            let message = format!(
                "CPL: annotation texts differ: {:?} vs {:?}",
                self.annotation_text, other.annotation_text
            );
            if options.cpl_annotation_texts_can_differ {
                note(NoteType::Note, message);
            } else {
                note(NoteType::Error, message);
                return false;
            }
        }

        if self.content_kind != other.content_kind {
            note(NoteType::Error, "CPL: content kinds differ".to_string());
            return false;
        }

        if self.issue_date != other.issue_date && !options.issue_dates_can_differ {
            note(NoteType::Error, "CPL: issue dates differ".to_string());
            return false;
        }

        if self.reels.len() != other.reels.len() {
            note(
                NoteType::Error,
                format!(
                    "CPL: reel counts differ ({} vs {})",
                    self.reels.len(),
                    other.reels.len()
                ),
            );
            return false;
        }

        for (a, b) in self.reels.iter().zip(other.reels.iter()) {
            if !a.equals(b, options, note) {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reel::{ReelAssetRef, ReelPicture};
    use crate::types::Fraction;

    fn simple_cpl() -> Cpl {
        let mut cpl = Cpl::new("A Test DCP", ContentKind::Feature);
        cpl.issuer = "OpenDCP".to_string();
        cpl.creator = "OpenDCP".to_string();
        cpl.issue_date = "2012-07-17T04:45:18+00:00".to_string();
        let mut reel = Reel::new();
        reel.main_picture = Some(ReelPicture {
            reference: ReelAssetRef::new(Id::generate(), Fraction::new(24, 1), 24),
            stereo: false,
        });
        cpl.add(reel);
        cpl
    }

    #[test]
    fn cpl_round_trips_through_xml() {
        let mut cpl = simple_cpl();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cpl.xml");
        cpl.write_xml(&path, Standard::Smpte, None).unwrap();

        let again = Cpl::from_file(&path).unwrap();
        assert_eq!(again.id(), cpl.id());
        assert_eq!(again.content_title_text, "A Test DCP");
        assert_eq!(again.content_kind, ContentKind::Feature);
        assert_eq!(again.standard(), Some(Standard::Smpte));
        assert_eq!(again.reels.len(), 1);
        assert!(again.reels[0].main_picture.is_some());
        assert!(!again.signed());
    }

    #[test]
    fn duplicate_content_version_id_is_rejected() {
        let mut cpl = simple_cpl();
        let version = ContentVersion::new("urn:uuid:x".to_string(), "x".to_string());
        cpl.set_content_version(version.clone()).unwrap();
        assert!(cpl.add_content_version(version).is_err());
    }

    #[test]
    fn negative_version_number_is_rejected() {
        let mut cpl = simple_cpl();
        assert!(cpl.set_version_number(-1).is_err());
        cpl.set_version_number(2).unwrap();
        assert_eq!(cpl.version_number(), Some(2));
    }

    #[test]
    fn smpte_cpl_with_sound_configuration_carries_metadata() {
        let mut cpl = simple_cpl();
        cpl.metadata = Some(CompositionMetadata {
            full_content_title_text: Some("A Test DCP".to_string()),
            version_number: Some(1),
            main_sound_configuration: Some("51/L,R,C".to_string()),
            main_sound_sample_rate: Some(48000),
            ..CompositionMetadata::default()
        });
        let root = cpl.build_xml(Standard::Smpte, false);
        let first_reel = root.child("ReelList").unwrap().child("Reel").unwrap();
        assert!(first_reel
            .child("AssetList")
            .unwrap()
            .child("CompositionMetadataAsset")
            .is_some());

        // Interop output never carries it.
        let interop = cpl.build_xml(Standard::Interop, false);
        let reel = interop.child("ReelList").unwrap().child("Reel").unwrap();
        assert!(reel
            .child("AssetList")
            .unwrap()
            .child("CompositionMetadataAsset")
            .is_none());
    }
}
