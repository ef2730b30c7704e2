// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! Subtitle and closed-caption assets.
//!
//! Two shapes exist: Interop packages carry a bare `DCSubtitle` XML file
//! (with any PNG images as separate package members), while SMPTE packages
//! wrap a `SubtitleReel` document in an MXF container together with any
//! embedded fonts and image essence. Both parse into the same model here.
//!
//! The XML read off the disk (or out of the wrapper) is preserved verbatim
//! in `raw_xml`: the verifier validates and re-reads those exact bytes, so
//! that problems in the file are not masked by this parser's own clean-ups.
//!
//! On emission, `<Text>` nodes within one `<Subtitle>` are ordered by their
//! on-screen vertical position from the top of the screen. Some downstream
//! rendering hardware assumes that ordering, so for top-aligned text the
//! Vposition values ascend and for bottom-aligned text they descend.

use std::path::Path;

use crate::equality::{EqualityOptions, NoteHandler, NoteType};
use crate::error::{Result, XmlError};
use crate::essence::EssenceCodec;
use crate::types::{Fraction, Id, Standard, Time};
use crate::xml::{namespaces, Document, Element};

use super::AssetData;

/// Interop subtitle time codes count in ticks of 4ms.
const INTEROP_TICK_RATE: i64 = 250;

pub fn static_pkl_type(standard: Standard) -> &'static str {
    match standard {
        Standard::Interop => "text/xml",
        Standard::Smpte => "application/mxf",
    }
}

/// Font presentation attributes, kept in their textual XML form so that
/// read→write round trips are lossless.
#[derive(Clone, Debug, PartialEq)]
pub struct FontStyle {
    pub id: Option<String>,
    pub size: String,
    pub weight: String,
    pub italic: String,
    pub underline: String,
    pub colour: String,
    pub effect: String,
    pub effect_colour: String,
    pub aspect_adjust: String,
    pub script: String,
}

impl Default for FontStyle {
    fn default() -> FontStyle {
        FontStyle {
            id: None,
            size: "42".to_string(),
            weight: "normal".to_string(),
            italic: "no".to_string(),
            underline: "no".to_string(),
            colour: "FFFFFFFF".to_string(),
            effect: "none".to_string(),
            effect_colour: "FF000000".to_string(),
            aspect_adjust: "1.0".to_string(),
            script: "normal".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VAlign {
    Top,
    Center,
    Bottom,
}

impl VAlign {
    fn as_str(&self) -> &'static str {
        match self {
            VAlign::Top => "top",
            VAlign::Center => "center",
            VAlign::Bottom => "bottom",
        }
    }

    fn parse(s: &str) -> VAlign {
        match s {
            "top" => VAlign::Top,
            "bottom" => VAlign::Bottom,
            _ => VAlign::Center,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
    Right,
}

impl HAlign {
    fn as_str(&self) -> &'static str {
        match self {
            HAlign::Left => "left",
            HAlign::Center => "center",
            HAlign::Right => "right",
        }
    }

    fn parse(s: &str) -> HAlign {
        match s {
            "left" => HAlign::Left,
            "right" => HAlign::Right,
            _ => HAlign::Center,
        }
    }
}

/// The timing of one subtitle event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubtitleTiming {
    pub in_time: Time,
    pub out_time: Time,
    pub fade_up: Time,
    pub fade_down: Time,
}

/// A textual subtitle event.
#[derive(Clone, Debug, PartialEq)]
pub struct SubtitleText {
    pub text: String,
    pub font: FontStyle,
    pub timing: SubtitleTiming,
    pub h_align: HAlign,
    pub h_position: f32,
    pub v_align: VAlign,
    /// Fraction of screen height from the `v_align` edge, in [0, 1].
    pub v_position: f32,
}

/// A PNG image subtitle event. SMPTE references image essence by id;
/// Interop references a PNG file in the package by URI.
#[derive(Clone, Debug, PartialEq)]
pub struct SubtitleImage {
    pub id: Id,
    pub uri: Option<String>,
    pub png: Option<Vec<u8>>,
    pub timing: SubtitleTiming,
    pub v_align: VAlign,
    pub v_position: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Subtitle {
    Text(SubtitleText),
    Image(SubtitleImage),
}

impl Subtitle {
    pub fn timing(&self) -> &SubtitleTiming {
        match self {
            Subtitle::Text(t) => &t.timing,
            Subtitle::Image(i) => &i.timing,
        }
    }
}

/// A `<LoadFont>` reference: Interop gives a URI, SMPTE an essence urn.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadFont {
    pub id: String,
    pub uri: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SubtitleAsset {
    pub data: AssetData,
    /// Which dialect this asset was read as (or will be written as).
    pub standard: Standard,
    /// `<ContentTitleText>` (SMPTE) or `<MovieTitle>` (Interop).
    pub content_title_text: String,
    pub language: Option<String>,
    pub reel_number: String,
    /// SMPTE `<StartTime>`; absent from Interop documents.
    pub start_time: Option<Time>,
    pub edit_rate: Fraction,
    pub time_code_rate: i64,
    pub intrinsic_duration: i64,
    pub issue_date: Option<String>,
    /// The `<Id>` inside the subtitle document itself, which for SMPTE
    /// differs from the asset id of the wrapping container.
    pub xml_id: Option<Id>,
    pub load_fonts: Vec<LoadFont>,
    subtitles: Vec<Subtitle>,
    fonts: Vec<(String, Vec<u8>)>,
    raw_xml: Option<String>,
    pub encrypted: bool,
    pub key_id: Option<Id>,
    pub key: Option<Vec<u8>>,
}

impl SubtitleAsset {
    /// An empty SMPTE subtitle asset ready to receive events.
    pub fn new_smpte(content_title_text: &str) -> SubtitleAsset {
        SubtitleAsset {
            data: AssetData::new(Id::generate(), None),
            standard: Standard::Smpte,
            content_title_text: content_title_text.to_string(),
            language: None,
            reel_number: "1".to_string(),
            start_time: Some(Time::new(0, 0, 0, 0, 24)),
            edit_rate: Fraction::new(24, 1),
            time_code_rate: 24,
            intrinsic_duration: 0,
            issue_date: None,
            xml_id: Some(Id::generate()),
            load_fonts: Vec::new(),
            subtitles: Vec::new(),
            fonts: Vec::new(),
            raw_xml: None,
            encrypted: false,
            key_id: None,
            key: None,
        }
    }

    /// An empty Interop subtitle asset.
    pub fn new_interop(movie_title: &str) -> SubtitleAsset {
        SubtitleAsset {
            standard: Standard::Interop,
            start_time: None,
            time_code_rate: INTEROP_TICK_RATE,
            ..SubtitleAsset::new_smpte(movie_title)
        }
    }

    /// Read an Interop subtitle XML file.
    pub fn from_interop_file(id: Id, path: &Path) -> Result<SubtitleAsset> {
        let raw = crate::util::file_to_string(path, u64::MAX)?;
        let mut asset = SubtitleAsset::parse(&raw, Standard::Interop)?;
        asset.data = AssetData::new(id, Some(path.to_path_buf()));
        Ok(asset)
    }

    /// Read a SMPTE subtitle MXF through the codec boundary.
    pub fn from_smpte_mxf(id: Id, path: &Path, codec: &dyn EssenceCodec) -> Result<SubtitleAsset> {
        let descriptor = codec.timed_text(path)?;
        let mut asset = SubtitleAsset::parse(&descriptor.xml, Standard::Smpte)?;
        asset.data = AssetData::new(id, Some(path.to_path_buf()));
        asset.edit_rate = descriptor.edit_rate;
        asset.intrinsic_duration = descriptor.intrinsic_duration;
        asset.fonts = descriptor.fonts;
        asset.encrypted = descriptor.encrypted;
        asset.key_id = descriptor.key_id;
        Ok(asset)
    }

    /// Parse subtitle XML of either dialect, keeping the source text.
    pub fn parse(xml: &str, expected: Standard) -> Result<SubtitleAsset> {
        let document = Document::parse_str(xml)?;
        let root = &document.root;

        let standard = match root.name() {
            "DCSubtitle" => Standard::Interop,
            "SubtitleReel" => {
                match root.namespace() {
                    Some(namespaces::SUBTITLE_SMPTE) => {}
                    Some(other) => {
                        return Err(crate::error::ReadErrorKind::UnrecognizedNamespace(
                            other.to_string(),
                        )
                        .into())
                    }
                    None => {}
                }
                Standard::Smpte
            }
            other => {
                return Err(XmlError::new(format!(
                    "unexpected subtitle root element <{}>",
                    other
                ))
                .into())
            }
        };
        if standard != expected {
            log::warn!(
                "subtitle document dialect does not match the package it came from"
            );
        }

        let mut asset = match standard {
            Standard::Smpte => SubtitleAsset::new_smpte(""),
            Standard::Interop => SubtitleAsset::new_interop(""),
        };
        asset.subtitles.clear();
        asset.raw_xml = Some(xml.to_string());

        match standard {
            Standard::Smpte => {
                asset.xml_id = root
                    .optional_string_child("Id")
                    .map(|s| Id::parse(&s));
                asset.content_title_text = root.optional_string_child("ContentTitleText").unwrap_or_default();
                asset.language = root.optional_string_child("Language");
                asset.reel_number = root
                    .optional_string_child("ReelNumber")
                    .unwrap_or_else(|| "1".to_string());
                asset.issue_date = root.optional_string_child("IssueDate");
                asset.edit_rate = root
                    .optional_string_child("EditRate")
                    .map(|s| s.parse())
                    .transpose()?
                    .unwrap_or(Fraction::new(24, 1));
                asset.time_code_rate = root
                    .optional_number_child::<i64>("TimeCodeRate")?
                    .unwrap_or(24);
                asset.start_time = root
                    .optional_string_child("StartTime")
                    .map(|s| Time::parse(&s, asset.time_code_rate))
                    .transpose()?;
            }
            Standard::Interop => {
                asset.xml_id = root
                    .optional_string_child("SubtitleID")
                    .map(|s| Id::parse(&s));
                asset.content_title_text = root.optional_string_child("MovieTitle").unwrap_or_default();
                asset.language = root.optional_string_child("Language");
                asset.reel_number = root
                    .optional_string_child("ReelNumber")
                    .unwrap_or_else(|| "1".to_string());
                asset.time_code_rate = INTEROP_TICK_RATE;
                asset.start_time = None;
            }
        }

        for load_font in root.children_named("LoadFont") {
            let id = load_font
                .attribute("ID")
                .or_else(|| load_font.attribute("Id"))
                .unwrap_or_default()
                .to_string();
            let uri = load_font
                .attribute("URI")
                .map(|u| u.to_string())
                .or_else(|| {
                    let t = load_font.text();
                    if t.is_empty() {
                        None
                    } else {
                        Some(t)
                    }
                });
            asset.load_fonts.push(LoadFont { id, uri });
        }

        let tcr = asset.time_code_rate;
        let list_parent = root.child("SubtitleList").unwrap_or(root);
        let mut subtitles = Vec::new();
        collect_subtitles(list_parent, &FontStyle::default(), tcr, &mut subtitles)?;
        asset.subtitles = subtitles;

        Ok(asset)
    }

    pub fn subtitles(&self) -> &[Subtitle] {
        &self.subtitles
    }

    pub fn add(&mut self, subtitle: Subtitle) {
        self.subtitles.push(subtitle);
    }

    /// Embedded font payloads (SMPTE wrapper only).
    pub fn font_data(&self) -> &[(String, Vec<u8>)] {
        &self.fonts
    }

    pub fn add_font(&mut self, id: &str, bytes: Vec<u8>) {
        self.fonts.push((id.to_string(), bytes));
    }

    /// The subtitle XML exactly as read from the package, if this asset was
    /// read rather than constructed.
    pub fn raw_xml(&self) -> Option<&str> {
        self.raw_xml.as_deref()
    }

    /// The XML for this asset: the preserved source if there is one,
    /// otherwise freshly generated.
    pub fn xml_as_string(&self) -> String {
        match &self.raw_xml {
            Some(raw) => raw.clone(),
            None => Document::new(self.build_xml()).to_canonical_string(),
        }
    }

    /// Build the subtitle document for this asset's dialect.
    pub fn build_xml(&self) -> Element {
        match self.standard {
            Standard::Smpte => self.build_smpte_xml(),
            Standard::Interop => self.build_interop_xml(),
        }
    }

    fn build_smpte_xml(&self) -> Element {
        let mut root = Element::with_namespace("SubtitleReel", namespaces::SUBTITLE_SMPTE);
        root.set_namespace_declaration("http://www.w3.org/2001/XMLSchema", "xs");
        root.add_child_with_text(
            "Id",
            &self
                .xml_id
                .clone()
                .unwrap_or_else(|| self.data.id.clone())
                .to_urn(),
        );
        root.add_child_with_text("ContentTitleText", &self.content_title_text);
        if let Some(issue_date) = &self.issue_date {
            root.add_child_with_text("IssueDate", issue_date);
        }
        root.add_child_with_text("ReelNumber", &self.reel_number);
        if let Some(language) = &self.language {
            root.add_child_with_text("Language", language);
        }
        root.add_child_with_text("EditRate", &self.edit_rate.as_string());
        root.add_child_with_text("TimeCodeRate", &self.time_code_rate.to_string());
        if let Some(start_time) = &self.start_time {
            root.add_child_with_text("StartTime", &start_time.to_string());
        }
        for load_font in &self.load_fonts {
            let lf = root.add_child(Element::new("LoadFont"));
            lf.set_attribute("ID", &load_font.id);
            if let Some(uri) = &load_font.uri {
                lf.add_text(uri);
            }
        }
        let list = root.add_child(Element::new("SubtitleList"));
        write_subtitle_groups(list, &self.subtitles, Standard::Smpte);
        root
    }

    fn build_interop_xml(&self) -> Element {
        let mut root = Element::new("DCSubtitle");
        root.set_attribute("Version", "1.0");
        root.add_child_with_text(
            "SubtitleID",
            self.xml_id
                .clone()
                .unwrap_or_else(|| self.data.id.clone())
                .as_str(),
        );
        root.add_child_with_text("MovieTitle", &self.content_title_text);
        root.add_child_with_text("ReelNumber", &self.reel_number);
        if let Some(language) = &self.language {
            root.add_child_with_text("Language", language);
        }
        for load_font in &self.load_fonts {
            let lf = root.add_child(Element::new("LoadFont"));
            lf.set_attribute("Id", &load_font.id);
            if let Some(uri) = &load_font.uri {
                lf.set_attribute("URI", uri);
            }
        }
        write_subtitle_groups(&mut root, &self.subtitles, Standard::Interop);
        root
    }

    /// Write the Interop XML form to a file, preserving it for hashing.
    pub fn write_xml<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let text = Document::new(self.build_interop_xml()).to_canonical_string();
        std::fs::write(path.as_ref(), &text)
            .map_err(|e| crate::error::Error::file(path.as_ref(), e))?;
        self.raw_xml = Some(text);
        self.data.file = Some(path.as_ref().to_path_buf());
        Ok(())
    }

    pub fn id(&self) -> &Id {
        &self.data.id
    }

    pub(crate) fn equals(
        &self,
        other: &SubtitleAsset,
        _options: &EqualityOptions,
        note: NoteHandler,
    ) -> bool {
        if self.standard != other.standard {
            note(NoteType::Error, "subtitle standards differ".to_string());
            return false;
        }
        if self.language != other.language {
            note(NoteType::Error, "subtitle languages differ".to_string());
            return false;
        }
        if self.subtitles.len() != other.subtitles.len() {
            note(
                NoteType::Error,
                format!(
                    "subtitle counts differ ({} vs {})",
                    self.subtitles.len(),
                    other.subtitles.len()
                ),
            );
            return false;
        }
        for (a, b) in self.subtitles.iter().zip(other.subtitles.iter()) {
            if a != b {
                note(NoteType::Error, "subtitles differ".to_string());
                return false;
            }
        }
        true
    }
}

fn collect_subtitles(
    node: &Element,
    font: &FontStyle,
    tcr: i64,
    out: &mut Vec<Subtitle>,
) -> Result<()> {
    for child in node.elements() {
        match child.name() {
            "Font" => {
                let merged = merge_font(font, child);
                collect_subtitles(child, &merged, tcr, out)?;
            }
            "Subtitle" => {
                let timing = SubtitleTiming {
                    in_time: attr_time(child, "TimeIn", tcr)?,
                    out_time: attr_time(child, "TimeOut", tcr)?,
                    fade_up: attr_time_or_zero(child, "FadeUpTime", tcr)?,
                    fade_down: attr_time_or_zero(child, "FadeDownTime", tcr)?,
                };
                collect_subtitle_content(child, font, timing, out)?;
            }
            _ => collect_subtitles(child, font, tcr, out)?,
        }
    }
    Ok(())
}

fn collect_subtitle_content(
    subtitle: &Element,
    font: &FontStyle,
    timing: SubtitleTiming,
    out: &mut Vec<Subtitle>,
) -> Result<()> {
    for child in subtitle.elements() {
        match child.name() {
            "Font" => {
                let merged = merge_font(font, child);
                collect_subtitle_content(child, &merged, timing, out)?;
            }
            "Text" => {
                let (v_align, v_position) = vertical_of(child);
                out.push(Subtitle::Text(SubtitleText {
                    text: child.text(),
                    font: font.clone(),
                    timing,
                    h_align: HAlign::parse(
                        child
                            .attribute("Halign")
                            .or_else(|| child.attribute("HAlign"))
                            .unwrap_or("center"),
                    ),
                    h_position: percent_attr(child, &["Hposition", "HPosition"]).unwrap_or(0.0),
                    v_align,
                    v_position,
                }));
            }
            "Image" => {
                let (v_align, v_position) = vertical_of(child);
                let body = child.text();
                let (id, uri) = if body.starts_with("urn:uuid:") {
                    (Id::parse(&body), None)
                } else {
                    (Id::generate(), Some(body))
                };
                out.push(Subtitle::Image(SubtitleImage {
                    id,
                    uri,
                    png: None,
                    timing,
                    v_align,
                    v_position,
                }));
            }
            _ => {}
        }
    }
    Ok(())
}

fn vertical_of(element: &Element) -> (VAlign, f32) {
    let v_align = VAlign::parse(
        element
            .attribute("Valign")
            .or_else(|| element.attribute("VAlign"))
            .unwrap_or("center"),
    );
    let v_position = percent_attr(element, &["Vposition", "VPosition"]).unwrap_or(0.0);
    (v_align, v_position)
}

fn percent_attr(element: &Element, names: &[&str]) -> Option<f32> {
    for name in names {
        if let Some(value) = element.attribute(name) {
            if let Ok(v) = value.parse::<f32>() {
                return Some(v / 100.0);
            }
        }
    }
    None
}

fn attr_time(element: &Element, name: &str, tcr: i64) -> Result<Time> {
    let value = element
        .attribute(name)
        .ok_or_else(|| XmlError::new(format!("missing {} on <Subtitle>", name)))?;
    Time::parse(value, tcr)
}

fn attr_time_or_zero(element: &Element, name: &str, tcr: i64) -> Result<Time> {
    match element.attribute(name) {
        Some(value) => Time::parse(value, tcr),
        None => Ok(Time::new(0, 0, 0, 0, tcr)),
    }
}

/// Merge a `<Font>` element's attributes over the inherited style. SMPTE
/// spells the id attribute `ID`, Interop `Id`; `Underlined` is a historical
/// alias seen in Interop documents.
fn merge_font(parent: &FontStyle, node: &Element) -> FontStyle {
    let mut merged = parent.clone();
    if let Some(v) = node.attribute("ID").or_else(|| node.attribute("Id")) {
        merged.id = Some(v.to_string());
    }
    if let Some(v) = node.attribute("Size") {
        merged.size = v.to_string();
    }
    if let Some(v) = node.attribute("Weight") {
        merged.weight = v.to_string();
    }
    if let Some(v) = node.attribute("Italic") {
        merged.italic = v.to_string();
    }
    if let Some(v) = node
        .attribute("Underline")
        .or_else(|| node.attribute("Underlined"))
    {
        merged.underline = v.to_string();
    }
    if let Some(v) = node.attribute("Color") {
        merged.colour = v.to_string();
    }
    if let Some(v) = node.attribute("Effect") {
        merged.effect = v.to_string();
    }
    if let Some(v) = node.attribute("EffectColor") {
        merged.effect_colour = v.to_string();
    }
    if let Some(v) = node.attribute("AspectAdjust") {
        merged.aspect_adjust = v.to_string();
    }
    if let Some(v) = node.attribute("Script") {
        merged.script = v.to_string();
    }
    merged
}

/// The sort key for on-screen vertical order: distance of the event from
/// the top of the screen.
fn vertical_sort_key(v_align: VAlign, v_position: f32) -> f32 {
    match v_align {
        VAlign::Top => v_position,
        VAlign::Center => 0.5 + v_position,
        VAlign::Bottom => 1.0 - v_position,
    }
}

fn format_percent(fraction: f32) -> String {
    let percent = fraction * 100.0;
    if (percent - percent.round()).abs() < 0.005 {
        format!("{}", percent.round() as i64)
    } else {
        format!("{:.1}", percent)
    }
}

/// Emit `<Font>`/`<Subtitle>` groups: consecutive events sharing a font
/// style share a `<Font>` element, events sharing timing share a
/// `<Subtitle>` element, and within one `<Subtitle>` the events are sorted
/// into vertical order.
fn write_subtitle_groups(parent: &mut Element, subtitles: &[Subtitle], standard: Standard) {
    let mut spot_number = 0_u32;
    let mut index = 0;
    while index < subtitles.len() {
        let font = font_of(&subtitles[index]);
        let mut font_end = index;
        while font_end < subtitles.len() && font_of(&subtitles[font_end]) == font {
            font_end += 1;
        }

        let font_element = parent.add_child(font_element(&font, standard));

        let mut group_start = index;
        while group_start < font_end {
            let timing = *subtitles[group_start].timing();
            let mut group_end = group_start;
            while group_end < font_end && *subtitles[group_end].timing() == timing {
                group_end += 1;
            }

            spot_number += 1;
            let subtitle_element = font_element.add_child(Element::new("Subtitle"));
            subtitle_element.set_attribute("SpotNumber", &spot_number.to_string());
            subtitle_element.set_attribute("TimeIn", &timing.in_time.to_string());
            subtitle_element.set_attribute("TimeOut", &timing.out_time.to_string());
            subtitle_element.set_attribute("FadeUpTime", &timing.fade_up.to_string());
            subtitle_element.set_attribute("FadeDownTime", &timing.fade_down.to_string());

            let mut group: Vec<&Subtitle> = subtitles[group_start..group_end].iter().collect();
            group.sort_by(|a, b| {
                let ka = match a {
                    Subtitle::Text(t) => vertical_sort_key(t.v_align, t.v_position),
                    Subtitle::Image(i) => vertical_sort_key(i.v_align, i.v_position),
                };
                let kb = match b {
                    Subtitle::Text(t) => vertical_sort_key(t.v_align, t.v_position),
                    Subtitle::Image(i) => vertical_sort_key(i.v_align, i.v_position),
                };
                ka.partial_cmp(&kb).unwrap_or(std::cmp::Ordering::Equal)
            });

            for event in group {
                match event {
                    Subtitle::Text(text) => {
                        let e = subtitle_element.add_child(Element::new("Text"));
                        match standard {
                            Standard::Smpte => {
                                e.set_attribute("Valign", text.v_align.as_str());
                                e.set_attribute("Vposition", &format_percent(text.v_position));
                            }
                            Standard::Interop => {
                                e.set_attribute("VAlign", text.v_align.as_str());
                                e.set_attribute("VPosition", &format_percent(text.v_position));
                            }
                        }
                        if text.h_align != HAlign::Center {
                            match standard {
                                Standard::Smpte => {
                                    e.set_attribute("Halign", text.h_align.as_str());
                                    e.set_attribute("Hposition", &format_percent(text.h_position));
                                }
                                Standard::Interop => {
                                    e.set_attribute("HAlign", text.h_align.as_str());
                                    e.set_attribute("HPosition", &format_percent(text.h_position));
                                }
                            }
                        }
                        e.add_text(&text.text);
                    }
                    Subtitle::Image(image) => {
                        let e = subtitle_element.add_child(Element::new("Image"));
                        match standard {
                            Standard::Smpte => {
                                e.set_attribute("Valign", image.v_align.as_str());
                                e.set_attribute("Vposition", &format_percent(image.v_position));
                                e.add_text(&image.id.to_urn());
                            }
                            Standard::Interop => {
                                e.set_attribute("VAlign", image.v_align.as_str());
                                e.set_attribute("VPosition", &format_percent(image.v_position));
                                if let Some(uri) = &image.uri {
                                    e.add_text(uri);
                                }
                            }
                        }
                    }
                }
            }

            group_start = group_end;
        }

        index = font_end;
    }
}

fn font_of(subtitle: &Subtitle) -> FontStyle {
    match subtitle {
        Subtitle::Text(t) => t.font.clone(),
        Subtitle::Image(_) => FontStyle::default(),
    }
}

/// The `<Font>` element with its attributes in the stable order the
/// established tooling writes them.
fn font_element(font: &FontStyle, _standard: Standard) -> Element {
    let mut e = Element::new("Font");
    e.set_attribute("AspectAdjust", &font.aspect_adjust);
    e.set_attribute("Color", &font.colour);
    e.set_attribute("Effect", &font.effect);
    e.set_attribute("EffectColor", &font.effect_colour);
    if let Some(id) = &font.id {
        e.set_attribute("ID", id);
    }
    e.set_attribute("Italic", &font.italic);
    e.set_attribute("Script", &font.script);
    e.set_attribute("Size", &font.size);
    e.set_attribute("Underline", &font.underline);
    e.set_attribute("Weight", &font.weight);
    e
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_at(v_align: VAlign, v_position: f32, body: &str) -> Subtitle {
        Subtitle::Text(SubtitleText {
            text: body.to_string(),
            font: FontStyle {
                id: Some("Arial".to_string()),
                size: "48".to_string(),
                ..FontStyle::default()
            },
            timing: SubtitleTiming {
                in_time: Time::new(0, 0, 1, 0, 24),
                out_time: Time::new(0, 0, 9, 0, 24),
                fade_up: Time::new(0, 0, 0, 0, 24),
                fade_down: Time::new(0, 0, 0, 0, 24),
            },
            h_align: HAlign::Center,
            h_position: 0.0,
            v_align,
            v_position,
        })
    }

    fn emitted_vpositions(asset: &SubtitleAsset) -> Vec<String> {
        let root = asset.build_xml();
        let list = root.child("SubtitleList").unwrap();
        let font = list.child("Font").unwrap();
        let subtitle = font.child("Subtitle").unwrap();
        subtitle
            .children_named("Text")
            .map(|t| t.attribute("Vposition").unwrap().to_string())
            .collect()
    }

    #[test]
    fn top_aligned_texts_are_written_in_ascending_vposition() {
        let mut asset = SubtitleAsset::new_smpte("Test");
        asset.add(text_at(VAlign::Top, 0.8, "Top line"));
        asset.add(text_at(VAlign::Top, 0.7, "Higher line"));
        assert_eq!(emitted_vpositions(&asset), ["70", "80"]);
    }

    #[test]
    fn bottom_aligned_texts_are_written_in_descending_vposition() {
        let mut asset = SubtitleAsset::new_smpte("Test");
        asset.add(text_at(VAlign::Bottom, 0.7, "Bottom line"));
        asset.add(text_at(VAlign::Bottom, 0.8, "Higher line"));
        assert_eq!(emitted_vpositions(&asset), ["80", "70"]);
    }

    #[test]
    fn smpte_round_trip_preserves_events() {
        let mut asset = SubtitleAsset::new_smpte("A Film");
        asset.language = Some("en".to_string());
        asset.add(text_at(VAlign::Top, 0.1, "Hello"));
        asset.add(text_at(VAlign::Top, 0.2, "world"));
        let xml = Document::new(asset.build_xml()).to_canonical_string();
        let again = SubtitleAsset::parse(&xml, Standard::Smpte).unwrap();
        assert_eq!(again.language.as_deref(), Some("en"));
        assert_eq!(again.subtitles().len(), 2);
        match &again.subtitles()[0] {
            Subtitle::Text(t) => {
                assert_eq!(t.text, "Hello");
                assert_eq!(t.v_align, VAlign::Top);
                assert!((t.v_position - 0.1).abs() < 1e-3);
                assert_eq!(t.font.id.as_deref(), Some("Arial"));
                assert_eq!(t.font.size, "48");
            }
            _ => panic!("expected a text subtitle"),
        }
    }

    #[test]
    fn interop_documents_parse() {
        let xml = r#"<?xml version="1.0"?>
<DCSubtitle Version="1.0">
  <SubtitleID>9ab4c4f8-1c4b-4f54-91b2-6dbbd5c2ad0b</SubtitleID>
  <MovieTitle>Test Film</MovieTitle>
  <ReelNumber>1</ReelNumber>
  <Language>fr</Language>
  <LoadFont Id="theFont" URI="arial.ttf"/>
  <Font Id="theFont" Size="39" Color="FFFFFFFF">
    <Subtitle SpotNumber="1" TimeIn="00:00:02:000" TimeOut="00:00:05:000">
      <Text VAlign="bottom" VPosition="15">Bonjour</Text>
    </Subtitle>
  </Font>
</DCSubtitle>"#;
        let asset = SubtitleAsset::parse(xml, Standard::Interop).unwrap();
        assert_eq!(asset.standard, Standard::Interop);
        assert_eq!(asset.content_title_text, "Test Film");
        assert_eq!(asset.language.as_deref(), Some("fr"));
        assert_eq!(asset.load_fonts.len(), 1);
        assert_eq!(asset.subtitles().len(), 1);
        match &asset.subtitles()[0] {
            Subtitle::Text(t) => {
                assert_eq!(t.text, "Bonjour");
                assert_eq!(t.font.size, "39");
                assert_eq!(t.v_align, VAlign::Bottom);
            }
            _ => panic!("expected a text subtitle"),
        }
    }
}
