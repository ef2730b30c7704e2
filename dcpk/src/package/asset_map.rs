// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! The ASSETMAP document: opaque asset ids to relative paths.

use std::path::{Path, PathBuf};

use crate::error::{ReadErrorKind, Result};
use crate::types::{Id, Standard};
use crate::xml::{namespaces, Document};

/// One `<Asset>` entry, in source order.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetMapEntry {
    pub id: Id,
    /// Path relative to the package directory.
    pub path: PathBuf,
    /// Is this entry a packing list? SMPTE uses a boolean element, Interop
    /// the presence of an empty `<PackingList/>`.
    pub pkl: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssetMap {
    pub id: Id,
    pub annotation_text: Option<String>,
    pub standard: Standard,
    pub entries: Vec<AssetMapEntry>,
}

impl AssetMap {
    pub fn from_file(path: &Path) -> Result<AssetMap> {
        let document = Document::read_file(path)?;
        let root = &document.root;

        let standard = match root.namespace() {
            Some(namespaces::ASSETMAP_INTEROP) => Standard::Interop,
            Some(namespaces::ASSETMAP_SMPTE) => Standard::Smpte,
            other => {
                return Err(ReadErrorKind::UnrecognizedNamespace(
                    other.unwrap_or("").to_string(),
                )
                .into())
            }
        };

        let mut entries = Vec::new();
        if let Some(list) = root.child("AssetList") {
            for asset in list.children_named("Asset") {
                let chunks: Vec<_> = asset
                    .child("ChunkList")
                    .map(|l| l.children_named("Chunk").collect())
                    .unwrap_or_default();
                if chunks.len() != 1 {
                    return Err(ReadErrorKind::UnsupportedChunkCount.into());
                }
                let mut raw_path = chunks[0].string_child("Path")?;
                if let Some(stripped) = raw_path.strip_prefix("file://") {
                    raw_path = stripped.to_string();
                }

                let pkl = match standard {
                    Standard::Interop => asset.child("PackingList").is_some(),
                    Standard::Smpte => asset
                        .optional_string_child("PackingList")
                        .map(|v| v.trim() == "true")
                        .unwrap_or(false),
                };

                entries.push(AssetMapEntry {
                    id: Id::parse(&asset.string_child("Id")?),
                    path: PathBuf::from(raw_path),
                    pkl,
                });
            }
        }

        Ok(AssetMap {
            id: Id::parse(&root.string_child("Id")?),
            annotation_text: root.optional_string_child("AnnotationText"),
            standard,
            entries,
        })
    }

    /// Paths of every packing list, in source order.
    pub fn pkl_paths(&self) -> Vec<&PathBuf> {
        self.entries.iter().filter(|e| e.pkl).map(|e| &e.path).collect()
    }

    /// Does the map mention this id (packing lists aside)?
    pub fn contains(&self, id: &Id) -> bool {
        self.entries.iter().any(|e| !e.pkl && &e.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_map(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("ASSETMAP.xml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn smpte_packing_list_flag_is_boolean() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_map(
            dir.path(),
            r#"<AssetMap xmlns="http://www.smpte-ra.org/schemas/429-9/2007/AM">
  <Id>urn:uuid:11111111-2222-3333-4444-555555555555</Id>
  <AssetList>
    <Asset>
      <Id>urn:uuid:aaaaaaaa-0000-0000-0000-000000000001</Id>
      <PackingList>true</PackingList>
      <ChunkList><Chunk><Path>pkl.xml</Path></Chunk></ChunkList>
    </Asset>
    <Asset>
      <Id>urn:uuid:aaaaaaaa-0000-0000-0000-000000000002</Id>
      <ChunkList><Chunk><Path>file://video.mxf</Path></Chunk></ChunkList>
    </Asset>
  </AssetList>
</AssetMap>"#,
        );
        let map = AssetMap::from_file(&path).unwrap();
        assert_eq!(map.standard, Standard::Smpte);
        assert_eq!(map.entries.len(), 2);
        assert!(map.entries[0].pkl);
        assert!(!map.entries[1].pkl);
        // file:// prefixes are stripped.
        assert_eq!(map.entries[1].path, PathBuf::from("video.mxf"));
        assert_eq!(map.pkl_paths(), [&PathBuf::from("pkl.xml")]);
    }

    #[test]
    fn interop_packing_list_flag_is_presence() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_map(
            dir.path(),
            r#"<AssetMap xmlns="http://www.digicine.com/PROTO-ASDCP-AM-20040311#">
  <Id>urn:uuid:11111111-2222-3333-4444-555555555555</Id>
  <AssetList>
    <Asset>
      <Id>urn:uuid:aaaaaaaa-0000-0000-0000-000000000001</Id>
      <PackingList/>
      <ChunkList><Chunk><Path>pkl.xml</Path></Chunk></ChunkList>
    </Asset>
  </AssetList>
</AssetMap>"#,
        );
        let map = AssetMap::from_file(&path).unwrap();
        assert_eq!(map.standard, Standard::Interop);
        assert!(map.entries[0].pkl);
    }

    #[test]
    fn unknown_namespace_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_map(
            dir.path(),
            r#"<AssetMap xmlns="http://example.com/am"><Id>urn:uuid:x</Id></AssetMap>"#,
        );
        assert!(AssetMap::from_file(&path).is_err());
    }

    #[test]
    fn multiple_chunks_are_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_map(
            dir.path(),
            r#"<AssetMap xmlns="http://www.smpte-ra.org/schemas/429-9/2007/AM">
  <Id>urn:uuid:x</Id>
  <AssetList>
    <Asset>
      <Id>urn:uuid:y</Id>
      <ChunkList>
        <Chunk><Path>a</Path></Chunk>
        <Chunk><Path>b</Path></Chunk>
      </ChunkList>
    </Asset>
  </AssetList>
</AssetMap>"#,
        );
        match AssetMap::from_file(&path) {
            Err(crate::Error::ReadError(ReadErrorKind::UnsupportedChunkCount)) => (),
            other => panic!("unexpected result {:?}", other.map(|_| ())),
        }
    }
}
