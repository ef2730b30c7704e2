// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! The XML layer used by every manifest in a package.
//!
//! Documents are parsed into an owned element tree and emitted from the same
//! tree. Two serializations exist: a pretty-printed one for human-facing
//! unsigned documents, and a canonical one (stable attribute order, no
//! indentation, UTF-8, newline-terminated) whose bytes are the input to
//! XML-DSig digests. A signed document must only ever be serialized
//! canonically, otherwise the embedded digest goes stale; the signing entry
//! points in [`crate::sign`] enforce this by combining serialization and
//! signature in one operation.
//!
//! The tree is deliberately small: name, optional prefix, attributes in
//! insertion order (namespace declarations are ordinary attributes named
//! `xmlns` / `xmlns:foo`), and children which are elements or text.

pub mod schema;

use std::fmt::Write as _;
use std::io::BufRead;
use std::path::Path;
use std::str::FromStr;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{Error, Result, XmlError};

/// Well-known namespace URIs for the two dialects.
pub mod namespaces {
    use crate::types::Standard;

    pub const ASSETMAP_INTEROP: &str = "http://www.digicine.com/PROTO-ASDCP-AM-20040311#";
    pub const ASSETMAP_SMPTE: &str = "http://www.smpte-ra.org/schemas/429-9/2007/AM";
    pub const VOLINDEX_INTEROP: &str = "http://www.digicine.com/PROTO-ASDCP-VL-20040311#";
    pub const VOLINDEX_SMPTE: &str = "http://www.smpte-ra.org/schemas/429-9/2007/AM";
    pub const PKL_INTEROP: &str = "http://www.digicine.com/PROTO-ASDCP-PKL-20040311#";
    pub const PKL_SMPTE: &str = "http://www.smpte-ra.org/schemas/429-8/2007/PKL";
    pub const CPL_INTEROP: &str = "http://www.digicine.com/PROTO-ASDCP-CPL-20040511#";
    pub const CPL_SMPTE: &str = "http://www.smpte-ra.org/schemas/429-7/2006/CPL";
    pub const CPL_METADATA_SMPTE: &str =
        "http://www.smpte-ra.org/schemas/429-16/2014/CPL-Metadata";
    pub const SUBTITLE_SMPTE: &str = "http://www.smpte-ra.org/schemas/428-7/2010/DCST";
    pub const XMLDSIG: &str = "http://www.w3.org/2000/09/xmldsig#";

    pub fn assetmap(standard: Standard) -> &'static str {
        match standard {
            Standard::Interop => ASSETMAP_INTEROP,
            Standard::Smpte => ASSETMAP_SMPTE,
        }
    }

    pub fn volindex(standard: Standard) -> &'static str {
        match standard {
            Standard::Interop => VOLINDEX_INTEROP,
            Standard::Smpte => VOLINDEX_SMPTE,
        }
    }

    pub fn pkl(standard: Standard) -> &'static str {
        match standard {
            Standard::Interop => PKL_INTEROP,
            Standard::Smpte => PKL_SMPTE,
        }
    }

    pub fn cpl(standard: Standard) -> &'static str {
        match standard {
            Standard::Interop => CPL_INTEROP,
            Standard::Smpte => CPL_SMPTE,
        }
    }
}

/// A child of an element: another element, or character data.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// One element of the tree.
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    name: String,
    prefix: Option<String>,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    pub fn new<S: Into<String>>(name: S) -> Element {
        Element {
            name: name.into(),
            prefix: None,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create a root element carrying a default namespace declaration.
    pub fn with_namespace<S: Into<String>>(name: S, namespace: &str) -> Element {
        let mut e = Element::new(name);
        e.set_attribute("xmlns", namespace);
        e
    }

    /// The local name, without any prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The default namespace declared on this element, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.attribute("xmlns")
    }

    /// Put this element into the given declared namespace prefix.
    pub fn set_prefix<S: Into<String>>(&mut self, prefix: S) {
        self.prefix = Some(prefix.into());
    }

    /// Declare a namespace prefix on this element.
    pub fn set_namespace_declaration(&mut self, uri: &str, prefix: &str) {
        self.set_attribute(&format!("xmlns:{}", prefix), uri);
    }

    /// Set an attribute, replacing any existing value.
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        for (k, v) in self.attributes.iter_mut() {
            if k == name {
                *v = value.to_string();
                return;
            }
        }
        self.attributes.push((name.to_string(), value.to_string()));
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Append a child element, returning a mutable reference to it.
    pub fn add_child(&mut self, child: Element) -> &mut Element {
        self.children.push(Node::Element(child));
        match self.children.last_mut() {
            Some(Node::Element(e)) => e,
            _ => unreachable!(),
        }
    }

    /// Append a child element holding only the given text.
    pub fn add_child_with_text(&mut self, name: &str, text: &str) -> &mut Element {
        let mut e = Element::new(name);
        e.add_text(text);
        self.add_child(e)
    }

    /// Append character data.
    pub fn add_text(&mut self, text: &str) {
        self.children.push(Node::Text(text.to_string()));
    }

    /// The concatenated text directly inside this element.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for c in &self.children {
            if let Node::Text(t) = c {
                out.push_str(t);
            }
        }
        out
    }

    /// Child elements, in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|c| match c {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// The first child element with the given local name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find_map(|c| match c {
            Node::Element(e) if e.name == name => Some(e),
            _ => None,
        })
    }

    /// All child elements with the given local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |e| e.name == name)
    }

    /// Remove and return the first child element with the given local name.
    pub fn take_child(&mut self, name: &str) -> Option<Element> {
        let index = self.children.iter().position(|c| match c {
            Node::Element(e) => e.name == name,
            _ => false,
        })?;
        match self.children.remove(index) {
            Node::Element(e) => Some(e),
            _ => unreachable!(),
        }
    }

    /// The text of a required child element.
    pub fn string_child(&self, name: &str) -> Result<String> {
        self.child(name)
            .map(|e| e.text())
            .ok_or_else(|| XmlError::new(format!("missing <{}> in <{}>", name, self.name)).into())
    }

    /// The text of an optional child element.
    pub fn optional_string_child(&self, name: &str) -> Option<String> {
        self.child(name).map(|e| e.text())
    }

    /// The parsed text of a required child element.
    pub fn number_child<T: FromStr>(&self, name: &str) -> Result<T> {
        let text = self.string_child(name)?;
        text.trim()
            .parse()
            .map_err(|_| XmlError::new(format!("bad value '{}' for <{}>", text, name)).into())
    }

    /// The parsed text of an optional child element.
    pub fn optional_number_child<T: FromStr>(&self, name: &str) -> Result<Option<T>> {
        match self.child(name) {
            None => Ok(None),
            Some(e) => {
                let text = e.text();
                text.trim()
                    .parse()
                    .map(Some)
                    .map_err(|_| XmlError::new(format!("bad value '{}' for <{}>", text, name)).into())
            }
        }
    }

    fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{}:{}", p, self.name),
            None => self.name.clone(),
        }
    }

    fn has_element_children(&self) -> bool {
        self.children.iter().any(|c| matches!(c, Node::Element(_)))
    }

    fn write(&self, out: &mut String, indent: Option<usize>) {
        if let Some(n) = indent {
            for _ in 0..n {
                out.push_str("  ");
            }
        }
        out.push('<');
        let qname = self.qualified_name();
        out.push_str(&qname);
        for (k, v) in &self.attributes {
            let _ = write!(out, " {}=\"{}\"", k, quick_xml::escape::escape(v));
        }
        if self.children.is_empty() {
            out.push_str("/>");
            if indent.is_some() {
                out.push('\n');
            }
            return;
        }
        out.push('>');
        if self.has_element_children() {
            if indent.is_some() {
                out.push('\n');
            }
            for c in &self.children {
                match c {
                    Node::Element(e) => e.write(out, indent.map(|n| n + 1)),
                    Node::Text(t) => out.push_str(&quick_xml::escape::escape(t)),
                }
            }
            if let Some(n) = indent {
                for _ in 0..n {
                    out.push_str("  ");
                }
            }
        } else {
            for c in &self.children {
                if let Node::Text(t) = c {
                    out.push_str(&quick_xml::escape::escape(t));
                }
            }
        }
        let _ = write!(out, "</{}>", qname);
        if indent.is_some() {
            out.push('\n');
        }
    }
}

/// An XML document: a root element plus serialization entry points.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub root: Element,
}

impl Document {
    pub fn new(root: Element) -> Document {
        Document { root }
    }

    /// Parse a document from bytes, with line information on failure.
    pub fn parse(data: &[u8]) -> Result<Document> {
        parse_tree(data, None)
    }

    /// Parse a document from a string.
    pub fn parse_str(data: &str) -> Result<Document> {
        Document::parse(data.as_bytes())
    }

    /// Read and parse a document from a file.
    pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Document> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| Error::file(path, e))?;
        parse_tree(&data, Some(path))
    }

    /// Serialize with pretty indentation, for unsigned human-facing output.
    pub fn to_pretty_string(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        self.root.write(&mut out, Some(0));
        out
    }

    /// Serialize canonically: no indentation, attributes in insertion order.
    /// This is the byte form that signature digests are computed over.
    pub fn to_canonical_string(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        self.root.write(&mut out, None);
        out.push('\n');
        out
    }

    /// Write the pretty form to a file.
    pub fn write_file_pretty<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_pretty_string()).map_err(|e| Error::file(path, e))
    }

    /// Write the canonical form to a file.
    pub fn write_file_canonical<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_canonical_string()).map_err(|e| Error::file(path, e))
    }
}

fn line_of(data: &[u8], position: usize) -> u64 {
    let end = position.min(data.len());
    data[..end].iter().filter(|b| **b == b'\n').count() as u64 + 1
}

fn xml_error(data: &[u8], position: usize, file: Option<&Path>, message: String) -> Error {
    match file {
        Some(f) => XmlError::in_file(message, f, Some(line_of(data, position))).into(),
        None => XmlError {
            message,
            file: None,
            line: Some(line_of(data, position)),
        }
        .into(),
    }
}

fn parse_tree(data: &[u8], file: Option<&Path>) -> Result<Document> {
    let mut reader = Reader::from_reader(data);
    reader.trim_text(true);
    parse_with(&mut reader, data, file)
}

fn parse_with<B: BufRead>(reader: &mut Reader<B>, data: &[u8], file: Option<&Path>) -> Result<Document> {
    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let position = reader.buffer_position();
        match reader.read_event_into(&mut buf) {
            Err(e) => {
                return Err(xml_error(data, reader.buffer_position(), file, e.to_string()));
            }
            Ok(Event::Start(start)) => {
                let element = element_from_start(&start, data, position, file)?;
                stack.push(element);
            }
            Ok(Event::Empty(start)) => {
                let element = element_from_start(&start, data, position, file)?;
                attach(&mut stack, &mut root, element, data, position, file)?;
            }
            Ok(Event::End(_)) => {
                let element = stack.pop().ok_or_else(|| {
                    xml_error(data, position, file, "unbalanced end tag".to_string())
                })?;
                attach(&mut stack, &mut root, element, data, position, file)?;
            }
            Ok(Event::Text(text)) => {
                let unescaped = text
                    .unescape()
                    .map_err(|e| xml_error(data, position, file, e.to_string()))?;
                if let Some(parent) = stack.last_mut() {
                    parent.add_text(&unescaped);
                }
            }
            Ok(Event::CData(cdata)) => {
                let raw = String::from_utf8_lossy(cdata.as_ref()).to_string();
                if let Some(parent) = stack.last_mut() {
                    parent.add_text(&raw);
                }
            }
            Ok(Event::Decl(_)) | Ok(Event::Comment(_)) | Ok(Event::PI(_)) | Ok(Event::DocType(_)) => {}
            Ok(Event::Eof) => break,
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(xml_error(
            data,
            data.len(),
            file,
            "unexpected end of document".to_string(),
        ));
    }

    match root {
        Some(root) => Ok(Document { root }),
        None => Err(xml_error(data, 0, file, "document has no root element".to_string())),
    }
}

fn element_from_start(
    start: &quick_xml::events::BytesStart,
    data: &[u8],
    position: usize,
    file: Option<&Path>,
) -> Result<Element> {
    let qname = String::from_utf8_lossy(start.name().as_ref()).to_string();
    let (prefix, name) = match qname.find(':') {
        Some(i) => (Some(qname[..i].to_string()), qname[i + 1..].to_string()),
        None => (None, qname),
    };
    let mut element = Element::new(name);
    element.prefix = prefix;
    for attr in start.attributes() {
        let attr = attr.map_err(|e| xml_error(data, position, file, e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| xml_error(data, position, file, e.to_string()))?
            .to_string();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut Vec<Element>,
    root: &mut Option<Element>,
    element: Element,
    data: &[u8],
    position: usize,
    file: Option<&Path>,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(Node::Element(element));
            Ok(())
        }
        None => {
            if root.is_some() {
                return Err(xml_error(
                    data,
                    position,
                    file,
                    "multiple root elements".to_string(),
                ));
            }
            *root = Some(element);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_query() {
        let doc = Document::parse_str(
            "<?xml version=\"1.0\"?>\n<AssetMap xmlns=\"http://example.com/am\">\
             <Id>urn:uuid:abc</Id><AssetList><Asset><Id>urn:uuid:1</Id></Asset>\
             <Asset><Id>urn:uuid:2</Id></Asset></AssetList></AssetMap>",
        )
        .unwrap();
        assert_eq!(doc.root.name(), "AssetMap");
        assert_eq!(doc.root.namespace(), Some("http://example.com/am"));
        assert_eq!(doc.root.string_child("Id").unwrap(), "urn:uuid:abc");
        let assets: Vec<_> = doc
            .root
            .child("AssetList")
            .unwrap()
            .children_named("Asset")
            .collect();
        assert_eq!(assets.len(), 2);
    }

    #[test]
    fn prefixed_names_match_on_local_name() {
        let doc = Document::parse_str(
            "<Root xmlns:dsig=\"http://www.w3.org/2000/09/xmldsig#\">\
             <dsig:Signature><dsig:SignedInfo/></dsig:Signature></Root>",
        )
        .unwrap();
        let signature = doc.root.child("Signature").unwrap();
        assert!(signature.child("SignedInfo").is_some());
    }

    #[test]
    fn serialization_round_trips() {
        let mut root = Element::with_namespace("VolumeIndex", "http://example.com/vl");
        root.add_child_with_text("Index", "1");
        let doc = Document::new(root);
        let text = doc.to_canonical_string();
        let again = Document::parse_str(&text).unwrap();
        assert_eq!(doc, again);
        // Canonical serialization is stable.
        assert_eq!(text, again.to_canonical_string());
    }

    #[test]
    fn pretty_and_canonical_parse_identically() {
        let mut root = Element::with_namespace("PackingList", "http://example.com/pkl");
        root.add_child_with_text("Id", "urn:uuid:x");
        let mut list = Element::new("AssetList");
        list.add_child_with_text("Asset", "a & b <c>");
        root.add_child(list);
        let doc = Document::new(root);
        let a = Document::parse_str(&doc.to_pretty_string()).unwrap();
        let b = Document::parse_str(&doc.to_canonical_string()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn parse_errors_carry_line_numbers() {
        let err = Document::parse_str("<A>\n<B>\n</C>\n</A>").unwrap_err();
        match err {
            Error::XmlError(e) => assert!(e.line.is_some()),
            other => panic!("unexpected error {:?}", other),
        }
    }
}
