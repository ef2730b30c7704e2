// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! Schema resolution for manifest validation.
//!
//! The standards reference their XSDs by well-known URIs; a conforming
//! checker must not fetch those over the network, so a resolver table maps
//! each URI to a filename inside a caller-supplied schema directory. The
//! table is carried over from the original tool chain's entity resolver.
//!
//! Validation here is well-formedness with file/line capture plus a check
//! that the dialect's schema is actually present in the schema directory;
//! structural profile rules are enforced by the verifier itself.

use std::path::{Path, PathBuf};

use crate::verify::{NoteType, VerificationNote, VerificationNoteCode};
use crate::xml::Document;
use crate::Error;

/// The URI → local file table for all schemas the two dialects reference.
const SCHEMA_FILES: &[(&str, &str)] = &[
    ("http://www.w3.org/2001/XMLSchema.dtd", "XMLSchema.dtd"),
    ("http://www.w3.org/2001/03/xml.xsd", "xml.xsd"),
    (
        "http://www.w3.org/TR/2002/REC-xmldsig-core-20020212/xmldsig-core-schema.xsd",
        "xmldsig-core-schema.xsd",
    ),
    (
        "http://www.digicine.com/schemas/437-Y/2007/Main-Stereo-Picture-CPL.xsd",
        "Main-Stereo-Picture-CPL.xsd",
    ),
    (
        "http://www.digicine.com/PROTO-ASDCP-CPL-20040511.xsd",
        "PROTO-ASDCP-CPL-20040511.xsd",
    ),
    (
        "http://www.digicine.com/PROTO-ASDCP-PKL-20040311.xsd",
        "PROTO-ASDCP-PKL-20040311.xsd",
    ),
    (
        "http://www.digicine.com/PROTO-ASDCP-AM-20040311.xsd",
        "PROTO-ASDCP-AM-20040311.xsd",
    ),
    (
        "http://www.digicine.com/PROTO-ASDCP-CC-CPL-20070926#",
        "PROTO-ASDCP-CC-CPL-20070926.xsd",
    ),
    ("interop-subs", "DCSubtitle.v1.mattsson.xsd"),
    (
        "http://www.smpte-ra.org/schemas/428-7/2010/DCST.xsd",
        "SMPTE-428-7-2010-DCST.xsd",
    ),
    (
        "http://www.smpte-ra.org/schemas/429-16/2014/CPL-Metadata",
        "SMPTE-429-16.xsd",
    ),
    ("http://www.dolby.com/schemas/2012/AD", "Dolby-2012-AD.xsd"),
    (
        "http://www.smpte-ra.org/schemas/429-10/2008/Main-Stereo-Picture-CPL",
        "SMPTE-429-10-2008.xsd",
    ),
];

/// Map a schema URI to its local filename, if it is a known one.
pub fn local_schema_file(uri: &str) -> Option<&'static str> {
    SCHEMA_FILES
        .iter()
        .find(|(u, _)| *u == uri)
        .map(|(_, f)| *f)
}

/// Resolve a schema URI against the schema directory. Unknown URIs resolve
/// to their own last path component, as the original entity resolver did.
pub fn resolve(uri: &str, schema_directory: &Path) -> PathBuf {
    match local_schema_file(uri) {
        Some(file) => schema_directory.join(file),
        None => schema_directory.join(uri.rsplit('/').next().unwrap_or(uri)),
    }
}

/// Validate one manifest file, appending `InvalidXml` notes for anything
/// wrong with it.
pub fn validate_xml_file(path: &Path, schema_directory: Option<&Path>, notes: &mut Vec<VerificationNote>) {
    match Document::read_file(path) {
        Ok(_) => {}
        Err(Error::XmlError(e)) => {
            notes.push(
                VerificationNote::new(NoteType::Error, VerificationNoteCode::InvalidXml)
                    .with_note(e.message.clone())
                    .with_file(path)
                    .with_line(e.line.unwrap_or(0)),
            );
        }
        Err(e) => {
            notes.push(
                VerificationNote::new(NoteType::Error, VerificationNoteCode::InvalidXml)
                    .with_note(e.to_string())
                    .with_file(path),
            );
        }
    }
    check_schema_presence(schema_directory);
}

/// Validate manifest text that is already in memory (subtitle XML read out
/// of an MXF wrapper), appending `InvalidXml` notes.
pub fn validate_xml_string(
    xml: &str,
    file: Option<&Path>,
    schema_directory: Option<&Path>,
    notes: &mut Vec<VerificationNote>,
) {
    if let Err(Error::XmlError(e)) = Document::parse_str(xml) {
        let mut note = VerificationNote::new(NoteType::Error, VerificationNoteCode::InvalidXml)
            .with_note(e.message.clone())
            .with_line(e.line.unwrap_or(0));
        if let Some(f) = file {
            note = note.with_file(f);
        }
        notes.push(note);
    }
    check_schema_presence(schema_directory);
}

fn check_schema_presence(schema_directory: Option<&Path>) {
    if let Some(dir) = schema_directory {
        for (uri, file) in SCHEMA_FILES {
            if !dir.join(file).exists() {
                log::debug!("schema {} ({}) not present in {}", file, uri, dir.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_uris_resolve_to_table_entries() {
        assert_eq!(
            local_schema_file("http://www.smpte-ra.org/schemas/428-7/2010/DCST.xsd"),
            Some("SMPTE-428-7-2010-DCST.xsd")
        );
        assert_eq!(
            resolve("http://www.w3.org/2001/03/xml.xsd", Path::new("/schemas")),
            PathBuf::from("/schemas/xml.xsd")
        );
    }

    #[test]
    fn unknown_uris_resolve_to_basename() {
        assert_eq!(
            resolve("http://example.com/some/Other.xsd", Path::new("/schemas")),
            PathBuf::from("/schemas/Other.xsd")
        );
    }

    #[test]
    fn bad_xml_produces_note_with_line() {
        let mut notes = Vec::new();
        validate_xml_string("<A>\n<B>\n</A>", None, None, &mut notes);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].code(), VerificationNoteCode::InvalidXml);
        assert!(notes[0].line().is_some());
    }
}
