// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! The polymorphic asset model.
//!
//! Everything a PKL can list (picture, sound, subtitle, closed caption,
//! atmos and font data) is an [`Asset`]. Rather than a class hierarchy,
//! the kinds are a tagged enum over per-kind structs, with the shared
//! surface (identity, file, cached digest, PKL/ASSETMAP emission) on the
//! enum itself. The loader maps discovered PKL `Type` strings to the
//! variant constructors through [`asset_factory`].

pub mod atmos;
pub mod font;
pub mod picture;
pub mod sound;
pub mod subtitle;

use std::path::{Path, PathBuf};

use crate::equality::{EqualityOptions, NoteHandler, NoteType};
use crate::error::Result;
use crate::essence::{EssenceCodec, EssenceKind};
use crate::pkl::Pkl;
use crate::types::{Id, Standard};
use crate::util::Progress;
use crate::xml::Element;

pub use atmos::AtmosAsset;
pub use font::FontAsset;
pub use picture::PictureAsset;
pub use sound::SoundAsset;
pub use subtitle::SubtitleAsset;

/// State shared by every asset kind: identity, the essence path, and a
/// cached digest so a file is hashed at most once per write or verify.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetData {
    pub id: Id,
    pub file: Option<PathBuf>,
    hash: Option<String>,
}

impl AssetData {
    pub fn new(id: Id, file: Option<PathBuf>) -> AssetData {
        AssetData {
            id,
            file,
            hash: None,
        }
    }

    /// The SHA-1 digest of the asset's file, computed on first use and
    /// cached.
    pub fn hash(&mut self, progress: Option<Progress>) -> Result<String> {
        if self.hash.is_none() {
            let file = self.file.as_ref().ok_or_else(|| {
                crate::error::ReadErrorKind::Other(format!(
                    "asset {} has no file to hash",
                    self.id
                ))
            })?;
            self.hash = Some(crate::util::make_digest(file, progress)?);
        }
        Ok(self.hash.clone().unwrap())
    }

    /// Seed the digest cache, for assets whose hash is already known.
    pub fn set_hash(&mut self, hash: String) {
        self.hash = Some(hash);
    }
}

/// One asset of a package.
#[derive(Clone, Debug)]
pub enum Asset {
    Picture(PictureAsset),
    Sound(SoundAsset),
    Subtitle(SubtitleAsset),
    Atmos(AtmosAsset),
    Font(FontAsset),
}

impl Asset {
    fn data(&self) -> &AssetData {
        match self {
            Asset::Picture(a) => &a.data,
            Asset::Sound(a) => &a.data,
            Asset::Subtitle(a) => &a.data,
            Asset::Atmos(a) => &a.data,
            Asset::Font(a) => &a.data,
        }
    }

    fn data_mut(&mut self) -> &mut AssetData {
        match self {
            Asset::Picture(a) => &mut a.data,
            Asset::Sound(a) => &mut a.data,
            Asset::Subtitle(a) => &mut a.data,
            Asset::Atmos(a) => &mut a.data,
            Asset::Font(a) => &mut a.data,
        }
    }

    pub fn id(&self) -> &Id {
        &self.data().id
    }

    pub fn file(&self) -> Option<&Path> {
        self.data().file.as_deref()
    }

    pub fn set_file<P: Into<PathBuf>>(&mut self, file: P) {
        self.data_mut().file = Some(file.into());
    }

    pub fn hash(&mut self, progress: Option<Progress>) -> Result<String> {
        self.data_mut().hash(progress)
    }

    /// Is the essence of this asset encrypted?
    pub fn encrypted(&self) -> bool {
        match self {
            Asset::Picture(a) => a.encrypted,
            Asset::Sound(a) => a.encrypted,
            Asset::Subtitle(a) => a.encrypted,
            Asset::Atmos(a) => a.encrypted,
            Asset::Font(_) => false,
        }
    }

    /// The decryption key id, for encrypted essence.
    pub fn key_id(&self) -> Option<&Id> {
        match self {
            Asset::Picture(a) => a.key_id.as_ref(),
            Asset::Sound(a) => a.key_id.as_ref(),
            Asset::Subtitle(a) => a.key_id.as_ref(),
            Asset::Atmos(a) => a.key_id.as_ref(),
            Asset::Font(_) => None,
        }
    }

    /// Install a decryption key delivered by a KDM.
    pub fn set_key(&mut self, key: Vec<u8>) {
        match self {
            Asset::Picture(a) => a.key = Some(key),
            Asset::Sound(a) => a.key = Some(key),
            Asset::Subtitle(a) => a.key = Some(key),
            Asset::Atmos(a) => a.key = Some(key),
            Asset::Font(_) => {}
        }
    }

    pub fn key(&self) -> Option<&[u8]> {
        match self {
            Asset::Picture(a) => a.key.as_deref(),
            Asset::Sound(a) => a.key.as_deref(),
            Asset::Subtitle(a) => a.key.as_deref(),
            Asset::Atmos(a) => a.key.as_deref(),
            Asset::Font(_) => None,
        }
    }

    /// The MIME-typed `Type` string this asset carries in a PKL.
    pub fn pkl_type(&self, standard: Standard) -> String {
        match self {
            Asset::Picture(_) => picture::static_pkl_type(standard),
            Asset::Sound(_) => sound::static_pkl_type(standard),
            Asset::Subtitle(a) => subtitle::static_pkl_type(a.standard),
            Asset::Atmos(_) => atmos::static_pkl_type(standard),
            Asset::Font(_) => font::static_pkl_type(standard),
        }
        .to_string()
    }

    /// Append this asset's entry to a PKL, computing size and digest.
    pub fn add_to_pkl(&mut self, pkl: &mut Pkl, standard: Standard) -> Result<()> {
        let hash = self.hash(None)?;
        let file = self
            .file()
            .expect("asset with a hash must have a file")
            .to_path_buf();
        let size = std::fs::metadata(&file)
            .map_err(|e| crate::error::Error::file(&file, e))?
            .len();
        let annotation = file
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_default();
        pkl.add(
            self.id().clone(),
            Some(annotation),
            hash,
            size,
            self.pkl_type(standard),
        );
        Ok(())
    }

    /// Append this asset's entry to an ASSETMAP `<AssetList>`.
    pub fn write_to_assetmap(&self, asset_list: &mut Element, root: &Path) -> Result<()> {
        let file = self.file().ok_or_else(|| {
            crate::error::ReadErrorKind::Other(format!(
                "asset {} has no file for the asset map",
                self.id()
            ))
        })?;
        let relative = file.strip_prefix(root).unwrap_or(file);
        let length = std::fs::metadata(file)
            .map_err(|e| crate::error::Error::file(file, e))?
            .len();

        let asset = asset_list.add_child(Element::new("Asset"));
        asset.add_child_with_text("Id", &self.id().to_urn());
        let chunk_list = asset.add_child(Element::new("ChunkList"));
        let chunk = chunk_list.add_child(Element::new("Chunk"));
        chunk.add_child_with_text("Path", &relative.to_string_lossy());
        chunk.add_child_with_text("VolumeIndex", "1");
        chunk.add_child_with_text("Offset", "0");
        chunk.add_child_with_text("Length", &length.to_string());
        Ok(())
    }

    /// Deep equality under the given options, reporting differences through
    /// `note`.
    pub fn equals(&mut self, other: &mut Asset, options: &EqualityOptions, note: NoteHandler) -> bool {
        match (&*self, &*other) {
            (Asset::Picture(a), Asset::Picture(b)) => {
                if !a.descriptor_equals(b, note) {
                    return false;
                }
            }
            (Asset::Sound(a), Asset::Sound(b)) => {
                if !a.descriptor_equals(b, note) {
                    return false;
                }
            }
            (Asset::Subtitle(a), Asset::Subtitle(b)) => return a.equals(b, options, note),
            (Asset::Atmos(a), Asset::Atmos(b)) => {
                if !a.descriptor_equals(b, note) {
                    return false;
                }
            }
            (Asset::Font(a), Asset::Font(b)) => return a.equals(b, note),
            _ => {
                note(NoteType::Error, "asset kinds differ".to_string());
                return false;
            }
        }

        // Essence comparison for the MXF kinds.
        if options.reel_hashes_can_differ {
            if let (Asset::Sound(a), Asset::Sound(b)) = (&*self, &*other) {
                if let (Some(fa), Some(fb), Some(codec)) =
                    (&a.data.file, &b.data.file, options.codec.as_ref())
                {
                    match codec.compare_sound(fa, fb, options.max_audio_sample_error) {
                        Ok(true) => return true,
                        Ok(false) => {
                            note(NoteType::Error, "sound samples differ".to_string());
                            return false;
                        }
                        Err(e) => {
                            note(NoteType::Note, format!("could not compare sound: {}", e));
                            return true;
                        }
                    }
                }
            }
            return true;
        }

        let ours = self.hash(None);
        let theirs = other.hash(None);
        match (ours, theirs) {
            (Ok(a), Ok(b)) if a == b => true,
            (Ok(_), Ok(_)) => {
                note(NoteType::Error, "asset hashes differ".to_string());
                false
            }
            _ => {
                note(NoteType::Error, "could not hash assets for comparison".to_string());
                false
            }
        }
    }
}

/// Build an asset from an essence container, dispatching on the probed
/// essence kind. `id` is the identity the asset map assigned the container.
///
/// `ignore_incorrect_picture_mxf_type` tolerates stereoscopic containers
/// that declare themselves monoscopic, which some mastering tools produce.
pub fn asset_factory(
    id: Id,
    path: &Path,
    codec: &dyn EssenceCodec,
    ignore_incorrect_picture_mxf_type: bool,
) -> Result<Asset> {
    match codec.kind(path)? {
        EssenceKind::MonoPicture | EssenceKind::StereoPicture => Ok(Asset::Picture(
            PictureAsset::from_file(id, path, codec, ignore_incorrect_picture_mxf_type)?,
        )),
        EssenceKind::Sound => Ok(Asset::Sound(SoundAsset::from_file(id, path, codec)?)),
        EssenceKind::Atmos => Ok(Asset::Atmos(AtmosAsset::from_file(id, path, codec)?)),
        EssenceKind::TimedText => Ok(Asset::Subtitle(SubtitleAsset::from_smpte_mxf(
            id, path, codec,
        )?)),
    }
}
