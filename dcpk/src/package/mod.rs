// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! The package model: one DCP directory and everything in it.
//!
//! Reading is a two-phase process. Phase one walks the ASSETMAP and the
//! packing lists, dispatching every mapped file to the right parser or
//! factory and collecting the results into a flat asset vector. Phase two
//! walks the CPLs' reels and resolves each asset reference by id lookup
//! into that vector. Problems that do not prevent the package from being
//! interpreted are appended to a caller-supplied note list; structural
//! problems fail the read.

pub mod asset_map;

use std::path::{Path, PathBuf};

use crate::asset::{asset_factory, Asset, FontAsset, SubtitleAsset};
use crate::config::Config;
use crate::cpl::Cpl;
use crate::crypto::CertificateChain;
use crate::equality::{EqualityOptions, NoteHandler, NoteType};
use crate::error::{Error, ReadErrorKind, Result};
use crate::kdm::DecryptedKdm;
use crate::pkl::Pkl;
use crate::types::{Id, Standard};
use crate::verify::{NoteType as VerifyNoteType, VerificationNote, VerificationNoteCode};
use crate::xml::{namespaces, Document, Element};

pub use asset_map::{AssetMap, AssetMapEntry};

/// Template for manifest file names. `%t` is replaced by the type tag
/// (`cpl` or `pkl`) and the document id is appended, so the default
/// produces `cpl_<uuid>.xml`.
#[derive(Clone, Debug, PartialEq)]
pub struct NameFormat {
    template: String,
}

impl NameFormat {
    pub fn new<S: Into<String>>(template: S) -> NameFormat {
        NameFormat {
            template: template.into(),
        }
    }

    pub fn format(&self, tag: &str, id: &Id) -> String {
        format!("{}_{}.xml", self.template.replace("%t", tag), id)
    }
}

impl Default for NameFormat {
    fn default() -> NameFormat {
        NameFormat::new("%t")
    }
}

/// One DCP directory.
#[derive(Debug, Default)]
pub struct Package {
    directory: PathBuf,
    standard: Option<Standard>,
    cpls: Vec<Cpl>,
    pkls: Vec<Pkl>,
    assets: Vec<Asset>,
    asset_map: Option<AssetMap>,
    asset_map_path: Option<PathBuf>,
}

impl Package {
    /// Open a package directory, creating it if necessary. No reading
    /// happens until [`read`](Package::read) is called.
    pub fn open<P: Into<PathBuf>>(directory: P) -> Result<Package> {
        let directory = directory.into();
        if !directory.exists() {
            std::fs::create_dir_all(&directory).map_err(|e| Error::file(&directory, e))?;
        }
        Ok(Package {
            directory,
            ..Package::default()
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The dialect of the package, known once it has been read or written.
    pub fn standard(&self) -> Option<Standard> {
        self.standard
    }

    pub fn cpls(&self) -> &[Cpl] {
        &self.cpls
    }

    pub fn cpls_mut(&mut self) -> &mut [Cpl] {
        &mut self.cpls
    }

    pub fn pkls(&self) -> &[Pkl] {
        &self.pkls
    }

    /// The flat asset vector that reel references resolve into.
    pub fn asset_vector(&self) -> &[Asset] {
        &self.assets
    }

    pub fn asset_vector_mut(&mut self) -> &mut Vec<Asset> {
        &mut self.assets
    }

    pub fn asset_map(&self) -> Option<&AssetMap> {
        self.asset_map.as_ref()
    }

    pub fn asset_map_path(&self) -> Option<&Path> {
        self.asset_map_path.as_deref()
    }

    /// Add a CPL built in memory.
    pub fn add(&mut self, cpl: Cpl) {
        self.cpls.push(cpl);
    }

    /// Add an asset built in memory.
    pub fn add_asset(&mut self, asset: Asset) {
        self.assets.push(asset);
    }

    /// Add a decrypted KDM, routing its keys into the matching CPLs'
    /// encrypted assets. Must be called after [`read`](Package::read);
    /// applying the same KDM twice is harmless.
    pub fn add_kdm(&mut self, kdm: &DecryptedKdm) {
        for cpl in &self.cpls {
            if kdm.keys().iter().any(|k| &k.cpl_id == cpl.id()) {
                cpl.add_kdm(kdm, &mut self.assets);
            }
        }
    }

    /// Is any asset in the package encrypted?
    pub fn encrypted(&self) -> bool {
        self.cpls.iter().any(|c| c.any_encrypted(&self.assets))
    }

    /// Read the package from disk.
    ///
    /// Conditions that prevent interpretation (no ASSETMAP, unknown
    /// namespaces or PKL types) fail with an error; recoverable problems
    /// (missing files, empty paths, mixed dialects, unresolvable
    /// references) are reported through `notes` when one is supplied.
    pub fn read(
        &mut self,
        mut notes: Option<&mut Vec<VerificationNote>>,
        config: &Config,
    ) -> Result<()> {
        // Locate the asset map.
        let asset_map_path = if self.directory.join("ASSETMAP").exists() {
            self.directory.join("ASSETMAP")
        } else if self.directory.join("ASSETMAP.xml").exists() {
            self.directory.join("ASSETMAP.xml")
        } else {
            return Err(ReadErrorKind::MissingAssetMap(self.directory.clone()).into());
        };

        let asset_map = AssetMap::from_file(&asset_map_path)?;
        self.standard = Some(asset_map.standard);
        let standard = asset_map.standard;

        let pkl_paths = asset_map.pkl_paths();
        if pkl_paths.is_empty() {
            return Err(ReadErrorKind::NoPackingList.into());
        }
        for path in pkl_paths {
            self.pkls.push(Pkl::from_file(&self.directory.join(path))?);
        }

        for entry in asset_map.entries.iter().filter(|e| !e.pkl) {
            if entry.path.as_os_str().is_empty() {
                // Seen in the wild from at least one mastering tool; there
                // is nothing useful we can do with the entry.
                if let Some(notes) = notes.as_deref_mut() {
                    notes.push(VerificationNote::new(
                        VerifyNoteType::Warning,
                        VerificationNoteCode::EmptyAssetPath,
                    ));
                }
                continue;
            }

            let path = self.directory.join(&entry.path);
            if !path.exists() {
                if let Some(notes) = notes.as_deref_mut() {
                    notes.push(
                        VerificationNote::new(
                            VerifyNoteType::Error,
                            VerificationNoteCode::MissingAsset,
                        )
                        .with_file(&path),
                    );
                }
                continue;
            }

            // The asset's <Type> comes from whichever PKL mentions it.
            let pkl_type = self
                .pkls
                .iter()
                .find_map(|p| p.type_of(&entry.id))
                .map(|t| t.to_string());
            let pkl_type = match pkl_type {
                Some(t) => t,
                // In the ASSETMAP but in no PKL: not our concern.
                None => continue,
            };

            if pkl_type == crate::cpl::static_pkl_type(standard)
                || pkl_type == crate::asset::subtitle::static_pkl_type(Standard::Interop)
            {
                // Both CPLs and Interop subtitle documents can hide behind
                // these types, so sniff the root element.
                let document = Document::read_file(&path)?;
                match document.root.name() {
                    "CompositionPlaylist" => {
                        let cpl = Cpl::from_file(&path)?;
                        if let (Some(cpl_standard), Some(notes)) =
                            (cpl.standard(), notes.as_deref_mut())
                        {
                            if cpl_standard != standard {
                                notes.push(VerificationNote::new(
                                    VerifyNoteType::Error,
                                    VerificationNoteCode::MismatchedStandard,
                                ));
                            }
                        }
                        self.cpls.push(cpl);
                    }
                    "DCSubtitle" => {
                        if standard == Standard::Smpte {
                            if let Some(notes) = notes.as_deref_mut() {
                                notes.push(VerificationNote::new(
                                    VerifyNoteType::Error,
                                    VerificationNoteCode::MismatchedStandard,
                                ));
                            }
                        }
                        self.assets.push(Asset::Subtitle(SubtitleAsset::from_interop_file(
                            entry.id.clone(),
                            &path,
                        )?));
                    }
                    other => {
                        log::debug!("ignoring XML asset with root <{}>", other);
                    }
                }
            } else if pkl_type == crate::asset::picture::static_pkl_type(standard)
                || pkl_type == crate::asset::sound::static_pkl_type(standard)
                || pkl_type == crate::asset::atmos::static_pkl_type(standard)
                || pkl_type == crate::asset::subtitle::static_pkl_type(Standard::Smpte)
            {
                self.assets.push(asset_factory(
                    entry.id.clone(),
                    &path,
                    config.codec.as_ref(),
                    config.ignore_incorrect_picture_mxf_type,
                )?);
            } else if pkl_type == crate::asset::font::static_pkl_type(standard) {
                self.assets
                    .push(Asset::Font(FontAsset::from_file(entry.id.clone(), &path)?));
            } else if pkl_type == "image/png" {
                // An Interop PNG subtitle image; it is referenced from
                // within subtitle XML, so nothing to do here.
            } else {
                return Err(ReadErrorKind::UnknownPklType(pkl_type).into());
            }
        }

        self.resolve_refs();

        // See whether the CPLs refer to anything that is in neither the
        // asset vector nor the ASSETMAP; that usually means a version file.
        if let Some(notes) = notes.as_deref_mut() {
            for cpl in &self.cpls {
                for reel in &cpl.reels {
                    for reference in reel.references() {
                        if !reference.resolved() && !asset_map.contains(&reference.id) {
                            notes.push(
                                VerificationNote::new(
                                    VerifyNoteType::Warning,
                                    VerificationNoteCode::ExternalAsset,
                                )
                                .with_note(reference.id.to_string()),
                            );
                        }
                    }
                }
            }
        }

        self.asset_map = Some(asset_map);
        self.asset_map_path = Some(asset_map_path);

        Ok(())
    }

    /// Resolve every CPL's reel references against the flat asset vector.
    pub fn resolve_refs(&mut self) {
        let assets = std::mem::take(&mut self.assets);
        for cpl in &mut self.cpls {
            cpl.resolve_refs(&assets);
        }
        self.assets = assets;
    }

    /// Write all the XML files for this package: CPLs (signed when a signer
    /// is given), the PKL, VOLINDEX and ASSETMAP.
    #[allow(clippy::too_many_arguments)]
    pub fn write_xml(
        &mut self,
        standard: Standard,
        issuer: &str,
        creator: &str,
        issue_date: &str,
        annotation_text: &str,
        signer: Option<&CertificateChain>,
        name_format: &NameFormat,
    ) -> Result<()> {
        self.resolve_refs();
        self.fill_reference_hashes()?;

        for cpl in &mut self.cpls {
            let path = self.directory.join(name_format.format("cpl", cpl.id()));
            cpl.write_xml(&path, standard, signer)?;
        }

        if self.pkls.is_empty() {
            let mut pkl = Pkl::new(standard, annotation_text, issue_date, issuer, creator);
            for cpl in &mut self.cpls {
                cpl.add_to_pkl(&mut pkl, standard)?;
            }
            let referenced = self.referenced_ids();
            for asset in &mut self.assets {
                if referenced.contains(asset.id()) {
                    asset.add_to_pkl(&mut pkl, standard)?;
                }
            }
            self.pkls.push(pkl);
        }

        let pkl_path = {
            let pkl = &mut self.pkls[0];
            let path = self.directory.join(name_format.format("pkl", pkl.id()));
            pkl.write(&path, signer)?;
            path
        };

        self.write_volindex(standard)?;
        self.write_assetmap(
            standard,
            &pkl_path,
            issuer,
            creator,
            issue_date,
            annotation_text,
        )?;
        self.standard = Some(standard);
        Ok(())
    }

    /// Copy each referenced asset's digest into the reel reference, so that
    /// the CPL's `<Hash>` values agree with the PKL by construction. Digests
    /// are cached per asset, so each file is read at most once per write.
    fn fill_reference_hashes(&mut self) -> Result<()> {
        let mut cpls = std::mem::take(&mut self.cpls);
        for cpl in &mut cpls {
            for reel in &mut cpl.reels {
                for reference in reel.references_mut() {
                    if reference.hash.is_some() {
                        continue;
                    }
                    let index = self.assets.iter().position(|a| a.id() == &reference.id);
                    if let Some(index) = index {
                        if self.assets[index].file().is_some() {
                            reference.hash = Some(self.assets[index].hash(None)?);
                        }
                    }
                }
            }
        }
        self.cpls = cpls;
        Ok(())
    }

    fn referenced_ids(&self) -> Vec<Id> {
        let mut ids = Vec::new();
        for cpl in &self.cpls {
            for reel in &cpl.reels {
                for reference in reel.references() {
                    ids.push(reference.id.clone());
                }
            }
        }
        ids
    }

    /// Write the VOLINDEX file (one volume, always).
    pub fn write_volindex(&self, standard: Standard) -> Result<()> {
        let path = self.directory.join(match standard {
            Standard::Interop => "VOLINDEX",
            Standard::Smpte => "VOLINDEX.xml",
        });
        let mut root = Element::with_namespace("VolumeIndex", namespaces::volindex(standard));
        root.add_child_with_text("Index", "1");
        Document::new(root).write_file_pretty(&path)
    }

    fn write_assetmap(
        &mut self,
        standard: Standard,
        pkl_path: &Path,
        issuer: &str,
        creator: &str,
        issue_date: &str,
        annotation_text: &str,
    ) -> Result<()> {
        let path = self.directory.join(match standard {
            Standard::Interop => "ASSETMAP",
            Standard::Smpte => "ASSETMAP.xml",
        });

        let mut root = Element::with_namespace("AssetMap", namespaces::assetmap(standard));
        root.add_child_with_text("Id", &Id::generate().to_urn());
        root.add_child_with_text("AnnotationText", annotation_text);
        match standard {
            Standard::Interop => {
                root.add_child_with_text("VolumeCount", "1");
                root.add_child_with_text("IssueDate", issue_date);
                root.add_child_with_text("Issuer", issuer);
                root.add_child_with_text("Creator", creator);
            }
            Standard::Smpte => {
                root.add_child_with_text("Creator", creator);
                root.add_child_with_text("VolumeCount", "1");
                root.add_child_with_text("IssueDate", issue_date);
                root.add_child_with_text("Issuer", issuer);
            }
        }

        let asset_list = root.add_child(Element::new("AssetList"));

        // The PKL's entry leads, flagged per the dialect.
        let pkl_length = std::fs::metadata(pkl_path)
            .map_err(|e| Error::file(pkl_path, e))?
            .len();
        let asset = asset_list.add_child(Element::new("Asset"));
        asset.add_child_with_text("Id", &self.pkls[0].id().to_urn());
        match standard {
            Standard::Interop => {
                asset.add_child(Element::new("PackingList"));
            }
            Standard::Smpte => {
                asset.add_child_with_text("PackingList", "true");
            }
        }
        let chunk_list = asset.add_child(Element::new("ChunkList"));
        let chunk = chunk_list.add_child(Element::new("Chunk"));
        chunk.add_child_with_text(
            "Path",
            &pkl_path
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_default(),
        );
        chunk.add_child_with_text("VolumeIndex", "1");
        chunk.add_child_with_text("Offset", "0");
        chunk.add_child_with_text("Length", &pkl_length.to_string());

        for cpl in &self.cpls {
            cpl.write_to_assetmap(asset_list, &self.directory)?;
        }
        let referenced = self.referenced_ids();
        let directory = self.directory.clone();
        for asset in &self.assets {
            if referenced.contains(asset.id()) {
                asset.write_to_assetmap(asset_list, &directory)?;
            }
        }

        Document::new(root).write_file_pretty(&path)?;
        self.asset_map_path = Some(path);
        Ok(())
    }

    /// Deep comparison against another package.
    pub fn equals(
        &mut self,
        other: &mut Package,
        options: &EqualityOptions,
        note: NoteHandler,
    ) -> bool {
        if self.cpls.len() != other.cpls.len() {
            note(
                NoteType::Error,
                format!(
                    "CPL counts differ: {} vs {}",
                    self.cpls.len(),
                    other.cpls.len()
                ),
            );
            return false;
        }

        for index in 0..self.cpls.len() {
            let matched = (0..other.cpls.len())
                .find(|&j| self.cpls[index].equals(&other.cpls[j], options, &mut |_, _| {}));
            let matched = match matched {
                Some(j) => j,
                None => {
                    // Re-run against the structurally-closest candidate so
                    // the caller hears why.
                    let j = index.min(other.cpls.len() - 1);
                    self.cpls[index].equals(&other.cpls[j], options, note);
                    return false;
                }
            };

            // CPL structures match; compare the referenced essence too.
            if !self.referenced_assets_equal(index, other, matched, options, note) {
                return false;
            }
        }

        true
    }

    fn referenced_assets_equal(
        &mut self,
        cpl_index: usize,
        other: &mut Package,
        other_cpl_index: usize,
        options: &EqualityOptions,
        note: NoteHandler,
    ) -> bool {
        let pairs: Vec<(usize, usize)> = {
            let a = &self.cpls[cpl_index];
            let b = &other.cpls[other_cpl_index];
            a.reels
                .iter()
                .zip(b.reels.iter())
                .flat_map(|(ra, rb)| {
                    ra.references()
                        .into_iter()
                        .zip(rb.references().into_iter())
                        .filter_map(|(x, y)| match (x.resolved, y.resolved) {
                            (Some(i), Some(j)) => Some((i, j)),
                            _ => None,
                        })
                        .collect::<Vec<_>>()
                })
                .collect()
        };

        for (i, j) in pairs {
            let mut theirs = other.assets[j].clone();
            if !self.assets[i].equals(&mut theirs, options, note) {
                return false;
            }
            other.assets[j] = theirs;
        }
        true
    }
}

/// Given files that may belong to one or more DCPs, return the package
/// directories (the parents of any ASSETMAPs found).
pub fn directories_from_files<P: AsRef<Path>>(files: &[P]) -> Vec<PathBuf> {
    let mut directories = Vec::new();
    for file in files {
        let file = file.as_ref();
        let name = file.file_name().and_then(|f| f.to_str()).unwrap_or("");
        if name == "ASSETMAP" || name == "ASSETMAP.xml" {
            if let Some(parent) = file.parent() {
                directories.push(parent.to_path_buf());
            }
        }
    }
    directories
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_assetmap_is_a_structural_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut package = Package::open(dir.path()).unwrap();
        match package.read(None, &Config::default()) {
            Err(Error::ReadError(ReadErrorKind::MissingAssetMap(_))) => (),
            other => panic!("unexpected result {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn name_format_substitutes_type_tag() {
        let id = Id::parse("81fb54df-e1bf-4647-8788-ea7ba154375b");
        assert_eq!(
            NameFormat::default().format("cpl", &id),
            "cpl_81fb54df-e1bf-4647-8788-ea7ba154375b.xml"
        );
        assert_eq!(
            NameFormat::new("my_%t").format("pkl", &id),
            "my_pkl_81fb54df-e1bf-4647-8788-ea7ba154375b.xml"
        );
    }

    #[test]
    fn directories_are_found_from_assetmap_files() {
        let dirs = directories_from_files(&[
            PathBuf::from("/dcp/one/ASSETMAP.xml"),
            PathBuf::from("/dcp/one/cpl.xml"),
            PathBuf::from("/dcp/two/ASSETMAP"),
        ]);
        assert_eq!(
            dirs,
            [PathBuf::from("/dcp/one"), PathBuf::from("/dcp/two")]
        );
    }
}
