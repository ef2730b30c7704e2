// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! Packing lists.
//!
//! The PKL enumerates every file the package delivers, with its SHA-1
//! digest, byte size and MIME-typed `Type` string. The loader relies on it
//! twice over: the `Type` drives asset dispatch, and the digests are what
//! the verifier recomputes essence hashes against.

use std::path::{Path, PathBuf};

use crate::crypto::CertificateChain;
use crate::error::{ReadErrorKind, Result};
use crate::types::{Id, Standard};
use crate::xml::{namespaces, Document, Element};

/// One `<Asset>` entry of a packing list.
#[derive(Clone, Debug, PartialEq)]
pub struct PklAsset {
    pub id: Id,
    pub annotation_text: Option<String>,
    /// SHA-1 digest, base64 encoded.
    pub hash: String,
    pub size: u64,
    pub type_: String,
    pub original_file_name: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Pkl {
    id: Id,
    file: Option<PathBuf>,
    pub annotation_text: Option<String>,
    pub issuer: String,
    pub creator: String,
    pub issue_date: String,
    standard: Standard,
    signed: bool,
    assets: Vec<PklAsset>,
}

impl Pkl {
    pub fn new(
        standard: Standard,
        annotation_text: &str,
        issue_date: &str,
        issuer: &str,
        creator: &str,
    ) -> Pkl {
        Pkl {
            id: Id::generate(),
            file: None,
            annotation_text: Some(annotation_text.to_string()),
            issuer: issuer.to_string(),
            creator: creator.to_string(),
            issue_date: issue_date.to_string(),
            standard,
            signed: false,
            assets: Vec::new(),
        }
    }

    /// Read a PKL from an XML file, inferring the dialect from the root
    /// namespace.
    pub fn from_file(path: &Path) -> Result<Pkl> {
        let document = Document::read_file(path)?;
        let root = &document.root;
        if root.name() != "PackingList" {
            return Err(ReadErrorKind::Other(format!(
                "expected <PackingList>, found <{}>",
                root.name()
            ))
            .into());
        }
        let standard = match root.namespace() {
            Some(namespaces::PKL_INTEROP) => Standard::Interop,
            Some(namespaces::PKL_SMPTE) => Standard::Smpte,
            Some(other) => {
                return Err(ReadErrorKind::UnrecognizedNamespace(other.to_string()).into())
            }
            None => return Err(ReadErrorKind::UnrecognizedNamespace(String::new()).into()),
        };

        let mut assets = Vec::new();
        if let Some(list) = root.child("AssetList") {
            for asset in list.children_named("Asset") {
                assets.push(PklAsset {
                    id: Id::parse(&asset.string_child("Id")?),
                    annotation_text: asset.optional_string_child("AnnotationText"),
                    hash: asset.string_child("Hash")?,
                    size: asset.number_child("Size")?,
                    type_: asset.string_child("Type")?,
                    original_file_name: asset.optional_string_child("OriginalFileName"),
                });
            }
        }

        Ok(Pkl {
            id: Id::parse(&root.string_child("Id")?),
            file: Some(path.to_path_buf()),
            annotation_text: root.optional_string_child("AnnotationText"),
            issuer: root.optional_string_child("Issuer").unwrap_or_default(),
            creator: root.optional_string_child("Creator").unwrap_or_default(),
            issue_date: root.optional_string_child("IssueDate").unwrap_or_default(),
            standard,
            signed: root.child("Signature").is_some(),
            assets,
        })
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn standard(&self) -> Standard {
        self.standard
    }

    pub fn signed(&self) -> bool {
        self.signed
    }

    pub fn asset_list(&self) -> &[PklAsset] {
        &self.assets
    }

    /// The recorded digest of the asset with the given id.
    pub fn hash(&self, id: &Id) -> Option<&str> {
        self.assets
            .iter()
            .find(|a| &a.id == id)
            .map(|a| a.hash.as_str())
    }

    /// The recorded `Type` of the asset with the given id.
    pub fn type_of(&self, id: &Id) -> Option<&str> {
        self.assets
            .iter()
            .find(|a| &a.id == id)
            .map(|a| a.type_.as_str())
    }

    /// Append an entry. `annotation_text` is conventionally the file name.
    pub fn add(
        &mut self,
        id: Id,
        annotation_text: Option<String>,
        hash: String,
        size: u64,
        type_: String,
    ) {
        self.assets.push(PklAsset {
            id,
            annotation_text,
            hash,
            size,
            type_,
            original_file_name: None,
        });
    }

    /// Write the PKL XML, signing it when a signer is supplied.
    pub fn write(&mut self, path: &Path, signer: Option<&CertificateChain>) -> Result<()> {
        let mut root = Element::with_namespace("PackingList", namespaces::pkl(self.standard));
        if signer.is_some() {
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

        let list = root.add_child(Element::new("AssetList"));
        for asset in &self.assets {
            let node = list.add_child(Element::new("Asset"));
            node.add_child_with_text("Id", &asset.id.to_urn());
            if let Some(annotation) = &asset.annotation_text {
                if !annotation.is_empty() {
                    node.add_child_with_text("AnnotationText", annotation);
                }
            }
            node.add_child_with_text("Hash", &asset.hash);
            node.add_child_with_text("Size", &asset.size.to_string());
            node.add_child_with_text("Type", &asset.type_);
            if let Some(name) = &asset.original_file_name {
                node.add_child_with_text("OriginalFileName", name);
            }
        }

        match signer {
            Some(chain) => {
                crate::sign::sign(&mut root, self.standard, chain)?;
                Document::new(root).write_file_canonical(path)?;
                self.signed = true;
            }
            None => {
                Document::new(root).write_file_pretty(path)?;
                self.signed = false;
            }
        }
        self.file = Some(path.to_path_buf());
        Ok(())
    }
}
