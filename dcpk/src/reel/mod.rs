// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! Reels and the references they hold.
//!
//! A reel is an ordered segment of a composition. It can carry at most one
//! each of main picture, main sound, main subtitle, markers and auxiliary
//! (Atmos) data, plus any number of closed-caption tracks. Each slot holds
//! a [`ReelAssetRef`]: the asset's id and trim window as written in the
//! CPL, plus a lazily-resolved index into the package's flat asset vector.
//! References are resolved in a second pass after every asset has been
//! loaded, so reels never own assets and no cycles arise.

use std::collections::BTreeMap;

use crate::asset::Asset;
use crate::equality::{EqualityOptions, NoteHandler, NoteType};
use crate::error::{Result, XmlError};
use crate::kdm::DecryptedKdm;
use crate::types::{Fraction, Id, Marker, Standard, Time};
use crate::xml::Element;

const CC_INTEROP_NS: &str = "http://www.digicine.com/PROTO-ASDCP-CC-CPL-20070926#";
const CC_SMPTE_NS: &str = "http://www.smpte-ra.org/schemas/429-12/2008/TT";
const ATMOS_NS: &str = "http://www.dolby.com/schemas/2012/AD";
const ATMOS_DATA_TYPE: &str = "urn:smpte:ul:060e2b34.04010105.0e090604.00000000";

/// A reference to an asset from a reel, as carried in the CPL.
#[derive(Clone, Debug, PartialEq)]
pub struct ReelAssetRef {
    pub id: Id,
    pub annotation_text: Option<String>,
    pub edit_rate: Fraction,
    pub intrinsic_duration: i64,
    pub entry_point: Option<i64>,
    pub duration: Option<i64>,
    pub hash: Option<String>,
    pub key_id: Option<Id>,
    /// Index into the package's flat asset vector, filled by
    /// [`Reel::resolve_refs`].
    pub resolved: Option<usize>,
}

impl ReelAssetRef {
    pub fn new(id: Id, edit_rate: Fraction, intrinsic_duration: i64) -> ReelAssetRef {
        ReelAssetRef {
            id,
            annotation_text: None,
            edit_rate,
            intrinsic_duration,
            entry_point: None,
            duration: None,
            hash: None,
            key_id: None,
            resolved: None,
        }
    }

    /// Reference an asset, copying its identity, rates and key id.
    pub fn for_asset(asset: &Asset) -> ReelAssetRef {
        let (edit_rate, intrinsic_duration) = match asset {
            Asset::Picture(a) => (a.edit_rate, a.intrinsic_duration),
            Asset::Sound(a) => (a.edit_rate, a.intrinsic_duration),
            Asset::Subtitle(a) => (a.edit_rate, a.intrinsic_duration),
            Asset::Atmos(a) => (a.edit_rate, a.intrinsic_duration),
            Asset::Font(_) => (Fraction::new(24, 1), 0),
        };
        let mut r = ReelAssetRef::new(asset.id().clone(), edit_rate, intrinsic_duration);
        r.key_id = asset.key_id().cloned();
        r
    }

    /// The duration the reel actually plays: the explicit `<Duration>` if
    /// there is one, else the intrinsic duration minus the entry point.
    pub fn actual_duration(&self) -> i64 {
        match self.duration {
            Some(d) => d,
            None => self.intrinsic_duration - self.entry_point.unwrap_or(0),
        }
    }

    pub fn resolved(&self) -> bool {
        self.resolved.is_some()
    }

    fn parse(node: &Element) -> Result<ReelAssetRef> {
        Ok(ReelAssetRef {
            id: Id::parse(&node.string_child("Id")?),
            annotation_text: node.optional_string_child("AnnotationText"),
            edit_rate: node.string_child("EditRate")?.parse()?,
            intrinsic_duration: node.number_child("IntrinsicDuration")?,
            entry_point: node.optional_number_child("EntryPoint")?,
            duration: node.optional_number_child("Duration")?,
            hash: node.optional_string_child("Hash"),
            key_id: node
                .optional_string_child("KeyId")
                .map(|k| Id::parse(&k)),
            resolved: None,
        })
    }

    /// Write the common children of a reel asset node. `KeyId` goes before
    /// `Hash`, as the schemas demand.
    fn write_children(&self, node: &mut Element) {
        node.add_child_with_text("Id", &self.id.to_urn());
        // Empty <AnnotationText> tags upset some older playback servers, so
        // the element is omitted rather than left blank.
        if let Some(annotation) = &self.annotation_text {
            if !annotation.is_empty() {
                node.add_child_with_text("AnnotationText", annotation);
            }
        }
        node.add_child_with_text("EditRate", &self.edit_rate.as_string());
        node.add_child_with_text("IntrinsicDuration", &self.intrinsic_duration.to_string());
        if let Some(entry_point) = self.entry_point {
            node.add_child_with_text("EntryPoint", &entry_point.to_string());
        }
        if let Some(duration) = self.duration {
            node.add_child_with_text("Duration", &duration.to_string());
        }
        if let Some(key_id) = &self.key_id {
            node.add_child_with_text("KeyId", &key_id.to_urn());
        }
        if let Some(hash) = &self.hash {
            node.add_child_with_text("Hash", hash);
        }
    }

    fn equals(&self, other: &ReelAssetRef, options: &EqualityOptions, note: NoteHandler, slot: &str) -> bool {
        if self.annotation_text != other.annotation_text {
            let message = format!("Reel {}: annotation texts differ", slot);
            if options.reel_annotation_texts_can_differ {
                note(NoteType::Note, message);
            } else {
                note(NoteType::Error, message);
                return false;
            }
        }
        if self.edit_rate != other.edit_rate {
            note(NoteType::Error, format!("Reel {}: edit rates differ", slot));
            return false;
        }
        if self.intrinsic_duration != other.intrinsic_duration {
            note(
                NoteType::Error,
                format!(
                    "Reel {}: intrinsic durations differ ({} vs {})",
                    slot, self.intrinsic_duration, other.intrinsic_duration
                ),
            );
            return false;
        }
        if self.entry_point != other.entry_point {
            note(NoteType::Error, format!("Reel {}: entry points differ", slot));
            return false;
        }
        if self.duration != other.duration {
            note(NoteType::Error, format!("Reel {}: durations differ", slot));
            return false;
        }
        if self.hash != other.hash && !options.reel_hashes_can_differ {
            note(NoteType::Error, format!("Reel {}: hashes differ", slot));
            return false;
        }
        true
    }
}

/// The main picture slot; stereoscopic pictures use a different node name.
#[derive(Clone, Debug, PartialEq)]
pub struct ReelPicture {
    pub reference: ReelAssetRef,
    pub stereo: bool,
}

impl ReelPicture {
    pub fn frame_rate(&self) -> Fraction {
        self.reference.edit_rate
    }
}

/// The main sound slot.
#[derive(Clone, Debug, PartialEq)]
pub struct ReelSound {
    pub reference: ReelAssetRef,
    pub language: Option<String>,
}

/// The main subtitle slot, or one closed-caption track.
#[derive(Clone, Debug, PartialEq)]
pub struct ReelSubtitle {
    pub reference: ReelAssetRef,
    pub language: Option<String>,
}

/// The auxiliary (Atmos) data slot.
#[derive(Clone, Debug, PartialEq)]
pub struct ReelAtmos {
    pub reference: ReelAssetRef,
}

/// The markers asset: symbolic labels with time codes, local to the CPL.
#[derive(Clone, Debug, PartialEq)]
pub struct ReelMarkers {
    pub id: Id,
    pub edit_rate: Fraction,
    pub intrinsic_duration: i64,
    markers: BTreeMap<Marker, Time>,
}

impl ReelMarkers {
    pub fn new(edit_rate: Fraction, intrinsic_duration: i64) -> ReelMarkers {
        ReelMarkers {
            id: Id::generate(),
            edit_rate,
            intrinsic_duration,
            markers: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, marker: Marker, time: Time) {
        self.markers.insert(marker, time);
    }

    pub fn get(&self) -> &BTreeMap<Marker, Time> {
        &self.markers
    }

    fn parse(node: &Element) -> Result<ReelMarkers> {
        let edit_rate: Fraction = node.string_child("EditRate")?.parse()?;
        let tcr = edit_rate.numerator / edit_rate.denominator.max(1);
        let mut markers = ReelMarkers {
            id: Id::parse(&node.string_child("Id")?),
            edit_rate,
            intrinsic_duration: node.number_child("IntrinsicDuration")?,
            markers: BTreeMap::new(),
        };
        if let Some(list) = node.child("MarkerList") {
            for marker in list.children_named("Marker") {
                let label = Marker::from_label(&marker.string_child("Label")?)?;
                let offset: i64 = marker.number_child("Offset")?;
                markers.markers.insert(label, offset_to_time(offset, tcr));
            }
        }
        Ok(markers)
    }

    fn write(&self, asset_list: &mut Element) {
        let node = asset_list.add_child(Element::new("MainMarkers"));
        node.add_child_with_text("Id", &self.id.to_urn());
        node.add_child_with_text("EditRate", &self.edit_rate.as_string());
        node.add_child_with_text("IntrinsicDuration", &self.intrinsic_duration.to_string());
        let list = node.add_child(Element::new("MarkerList"));
        for (marker, time) in &self.markers {
            let m = list.add_child(Element::new("Marker"));
            m.add_child_with_text("Label", marker.as_str());
            m.add_child_with_text(
                "Offset",
                &time.as_editable_units(time.tcr).to_string(),
            );
        }
    }
}

fn offset_to_time(offset: i64, tcr: i64) -> Time {
    let tcr = tcr.max(1);
    let total_seconds = offset / tcr;
    Time::new(
        total_seconds / 3600,
        (total_seconds / 60) % 60,
        total_seconds % 60,
        offset % tcr,
        tcr,
    )
}

/// One reel of a composition.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Reel {
    pub id: Option<Id>,
    pub main_picture: Option<ReelPicture>,
    pub main_sound: Option<ReelSound>,
    pub main_subtitle: Option<ReelSubtitle>,
    pub closed_captions: Vec<ReelSubtitle>,
    pub main_markers: Option<ReelMarkers>,
    pub atmos: Option<ReelAtmos>,
}

impl Reel {
    pub fn new() -> Reel {
        Reel {
            id: Some(Id::generate()),
            ..Reel::default()
        }
    }

    /// Parse a `<Reel>` node. If the reel carries a
    /// `<CompositionMetadataAsset>`, its element is handed back through
    /// `metadata` for the CPL to interpret.
    pub fn parse(node: &Element, metadata: &mut Option<Element>) -> Result<Reel> {
        let mut reel = Reel {
            id: node
                .optional_string_child("Id")
                .map(|s| Id::parse(&s)),
            ..Reel::default()
        };

        let asset_list = node
            .child("AssetList")
            .ok_or_else(|| XmlError::new("missing <AssetList> in <Reel>"))?;

        for asset in asset_list.elements() {
            match asset.name() {
                "MainPicture" => {
                    reel.main_picture = Some(ReelPicture {
                        reference: ReelAssetRef::parse(asset)?,
                        stereo: false,
                    });
                }
                "MainStereoscopicPicture" => {
                    reel.main_picture = Some(ReelPicture {
                        reference: ReelAssetRef::parse(asset)?,
                        stereo: true,
                    });
                }
                "MainSound" => {
                    reel.main_sound = Some(ReelSound {
                        reference: ReelAssetRef::parse(asset)?,
                        language: asset.optional_string_child("Language"),
                    });
                }
                "MainSubtitle" => {
                    reel.main_subtitle = Some(ReelSubtitle {
                        reference: ReelAssetRef::parse(asset)?,
                        language: asset.optional_string_child("Language"),
                    });
                }
                "MainClosedCaption" | "ClosedCaption" => {
                    reel.closed_captions.push(ReelSubtitle {
                        reference: ReelAssetRef::parse(asset)?,
                        language: asset.optional_string_child("Language"),
                    });
                }
                "MainMarkers" => {
                    reel.main_markers = Some(ReelMarkers::parse(asset)?);
                }
                "AuxData" => {
                    reel.atmos = Some(ReelAtmos {
                        reference: ReelAssetRef::parse(asset)?,
                    });
                }
                "CompositionMetadataAsset" => {
                    *metadata = Some(asset.clone());
                }
                other => {
                    log::debug!("ignoring unknown reel asset <{}>", other);
                }
            }
        }

        Ok(reel)
    }

    /// Emit this reel into a CPL `<ReelList>`. Slots are written in the
    /// canonical order regardless of how they were populated, and the
    /// CompositionMetadataAsset element, when supplied (SMPTE, first reel
    /// only), is inserted ahead of the markers.
    pub fn write_to_cpl(
        &self,
        reel_list: &mut Element,
        standard: Standard,
        metadata: Option<Element>,
    ) {
        let reel = reel_list.add_child(Element::new("Reel"));
        reel.add_child_with_text(
            "Id",
            &self.id.clone().unwrap_or_else(Id::generate).to_urn(),
        );
        let asset_list = reel.add_child(Element::new("AssetList"));

        if let Some(metadata) = metadata {
            asset_list.add_child(metadata);
        }

        if let Some(picture) = &self.main_picture {
            let name = if picture.stereo {
                "MainStereoscopicPicture"
            } else {
                "MainPicture"
            };
            let node = asset_list.add_child(Element::new(name));
            if picture.stereo && standard == Standard::Interop {
                node.set_namespace_declaration(
                    "http://www.digicine.com/schemas/437-Y/2007/Main-Stereo-Picture-CPL",
                    "msp-cpl",
                );
            }
            picture.reference.write_children(node);
            node.add_child_with_text("FrameRate", &picture.frame_rate().as_string());
            node.add_child_with_text(
                "ScreenAspectRatio",
                match standard {
                    Standard::Interop => "1.85",
                    Standard::Smpte => "1998 1080",
                },
            );
        }

        if let Some(sound) = &self.main_sound {
            let node = asset_list.add_child(Element::new("MainSound"));
            sound.reference.write_children(node);
            if let Some(language) = &sound.language {
                node.add_child_with_text("Language", language);
            }
        }

        if let Some(subtitle) = &self.main_subtitle {
            let node = asset_list.add_child(Element::new("MainSubtitle"));
            subtitle.reference.write_children(node);
            if let Some(language) = &subtitle.language {
                node.add_child_with_text("Language", language);
            }
        }

        for caption in &self.closed_captions {
            let (name, prefix, ns) = match standard {
                Standard::Interop => ("MainClosedCaption", "cc-cpl", CC_INTEROP_NS),
                Standard::Smpte => ("ClosedCaption", "tt", CC_SMPTE_NS),
            };
            let node = asset_list.add_child(Element::new(name));
            node.set_namespace_declaration(ns, prefix);
            node.set_prefix(prefix);
            caption.reference.write_children(node);
            if let Some(language) = &caption.language {
                node.add_child_with_text("Language", language);
            }
        }

        if let Some(markers) = &self.main_markers {
            markers.write(asset_list);
        }

        if let Some(atmos) = &self.atmos {
            let node = asset_list.add_child(Element::new("AuxData"));
            node.set_namespace_declaration(ATMOS_NS, "axd");
            node.set_prefix("axd");
            atmos.reference.write_children(node);
            node.add_child_with_text("DataType", ATMOS_DATA_TYPE);
        }
    }

    /// References to every slot that is populated, in canonical order.
    pub fn references(&self) -> Vec<&ReelAssetRef> {
        let mut refs = Vec::new();
        if let Some(p) = &self.main_picture {
            refs.push(&p.reference);
        }
        if let Some(s) = &self.main_sound {
            refs.push(&s.reference);
        }
        if let Some(s) = &self.main_subtitle {
            refs.push(&s.reference);
        }
        for c in &self.closed_captions {
            refs.push(&c.reference);
        }
        if let Some(a) = &self.atmos {
            refs.push(&a.reference);
        }
        refs
    }

    pub(crate) fn references_mut(&mut self) -> Vec<&mut ReelAssetRef> {
        let mut refs = Vec::new();
        if let Some(p) = &mut self.main_picture {
            refs.push(&mut p.reference);
        }
        if let Some(s) = &mut self.main_sound {
            refs.push(&mut s.reference);
        }
        if let Some(s) = &mut self.main_subtitle {
            refs.push(&mut s.reference);
        }
        for c in &mut self.closed_captions {
            refs.push(&mut c.reference);
        }
        if let Some(a) = &mut self.atmos {
            refs.push(&mut a.reference);
        }
        refs
    }

    /// Fill each reference's resolved slot by id lookup in the package's
    /// flat asset vector.
    pub fn resolve_refs(&mut self, assets: &[Asset]) {
        for reference in self.references_mut() {
            reference.resolved = assets.iter().position(|a| a.id() == &reference.id);
        }
    }

    /// The duration this reel plays, taken from its picture when there is
    /// one.
    pub fn duration(&self) -> i64 {
        self.main_picture
            .as_ref()
            .map(|p| p.reference.actual_duration())
            .or_else(|| self.main_sound.as_ref().map(|s| s.reference.actual_duration()))
            .unwrap_or(0)
    }

    /// Is any referenced asset encrypted?
    pub fn encrypted(&self, assets: &[Asset]) -> bool {
        self.references().iter().any(|r| {
            r.resolved
                .and_then(|i| assets.get(i))
                .map(|a| a.encrypted())
                .unwrap_or(false)
        })
    }

    /// Push each matching KDM key into this reel's encrypted assets.
    pub fn add_kdm(&self, kdm: &DecryptedKdm, assets: &mut [Asset]) {
        for reference in self.references() {
            let key_id = match &reference.key_id {
                Some(k) => k,
                None => continue,
            };
            for kdm_key in kdm.keys() {
                if &kdm_key.key_id == key_id {
                    if let Some(index) = reference.resolved {
                        if let Some(asset) = assets.get_mut(index) {
                            asset.set_key(kdm_key.key.clone());
                        }
                    }
                }
            }
        }
    }

    pub fn equals(&self, other: &Reel, options: &EqualityOptions, note: NoteHandler) -> bool {
        match (&self.main_picture, &other.main_picture) {
            (Some(a), Some(b)) => {
                if a.stereo != b.stereo {
                    note(NoteType::Error, "one reel picture is 3D and the other is not".to_string());
                    return false;
                }
                if !a.reference.equals(&b.reference, options, note, "MainPicture") {
                    return false;
                }
            }
            (None, None) => {}
            _ => {
                note(NoteType::Error, "reel picture presence differs".to_string());
                return false;
            }
        }

        match (&self.main_sound, &other.main_sound) {
            (Some(a), Some(b)) => {
                if !a.reference.equals(&b.reference, options, note, "MainSound") {
                    return false;
                }
            }
            (None, None) => {}
            _ => {
                note(NoteType::Error, "reel sound presence differs".to_string());
                return false;
            }
        }

        match (&self.main_subtitle, &other.main_subtitle) {
            (Some(a), Some(b)) => {
                if !a.reference.equals(&b.reference, options, note, "MainSubtitle") {
                    return false;
                }
            }
            (None, None) => {}
            _ => {
                note(NoteType::Error, "reel subtitle presence differs".to_string());
                return false;
            }
        }

        if self.closed_captions.len() != other.closed_captions.len() {
            note(NoteType::Error, "reel closed caption counts differ".to_string());
            return false;
        }
        for (a, b) in self.closed_captions.iter().zip(other.closed_captions.iter()) {
            if !a.reference.equals(&b.reference, options, note, "ClosedCaption") {
                return false;
            }
        }

        match (&self.atmos, &other.atmos) {
            (Some(a), Some(b)) => {
                if !a.reference.equals(&b.reference, options, note, "AuxData") {
                    return false;
                }
            }
            (None, None) => {}
            _ => {
                note(NoteType::Error, "reel atmos presence differs".to_string());
                return false;
            }
        }

        if self.main_markers != other.main_markers {
            note(NoteType::Note, "reel markers differ".to_string());
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actual_duration_follows_trim_rules() {
        let mut r = ReelAssetRef::new(Id::generate(), Fraction::new(24, 1), 240);
        assert_eq!(r.actual_duration(), 240);
        r.entry_point = Some(24);
        assert_eq!(r.actual_duration(), 216);
        r.duration = Some(100);
        assert_eq!(r.actual_duration(), 100);
    }

    #[test]
    fn slots_are_emitted_in_canonical_order() {
        let mut reel = Reel::new();
        // Populate out of order.
        reel.atmos = Some(ReelAtmos {
            reference: ReelAssetRef::new(Id::generate(), Fraction::new(24, 1), 48),
        });
        reel.main_sound = Some(ReelSound {
            reference: ReelAssetRef::new(Id::generate(), Fraction::new(24, 1), 48),
            language: None,
        });
        reel.main_picture = Some(ReelPicture {
            reference: ReelAssetRef::new(Id::generate(), Fraction::new(24, 1), 48),
            stereo: false,
        });

        let mut list = Element::new("ReelList");
        reel.write_to_cpl(&mut list, Standard::Smpte, None);
        let asset_list = list.child("Reel").unwrap().child("AssetList").unwrap();
        let names: Vec<&str> = asset_list.elements().map(|e| e.name()).collect();
        assert_eq!(names, ["MainPicture", "MainSound", "AuxData"]);
    }

    #[test]
    fn markers_round_trip_through_offsets() {
        let mut markers = ReelMarkers::new(Fraction::new(24, 1), 480);
        markers.set(Marker::Ffoc, Time::new(0, 0, 0, 1, 24));
        markers.set(Marker::Lfoc, Time::new(0, 0, 19, 23, 24));

        let mut list = Element::new("AssetList");
        markers.write(&mut list);
        let parsed = ReelMarkers::parse(list.child("MainMarkers").unwrap()).unwrap();
        assert_eq!(parsed.get().get(&Marker::Ffoc), Some(&Time::new(0, 0, 0, 1, 24)));
        assert_eq!(parsed.get().get(&Marker::Lfoc), Some(&Time::new(0, 0, 19, 23, 24)));
    }

    #[test]
    fn reel_reference_parse_includes_trims_and_key() {
        let mut node = Element::new("MainSound");
        node.add_child_with_text("Id", "urn:uuid:5407b210-4441-4e97-8b16-8bdc7c12da54");
        node.add_child_with_text("EditRate", "24 1");
        node.add_child_with_text("IntrinsicDuration", "240");
        node.add_child_with_text("EntryPoint", "12");
        node.add_child_with_text("KeyId", "urn:uuid:f3b9a4b0-2222-4e97-8b16-8bdc7c12da54");
        node.add_child_with_text("Hash", "xyz");
        let r = ReelAssetRef::parse(&node).unwrap();
        assert_eq!(r.entry_point, Some(12));
        assert_eq!(r.actual_duration(), 228);
        assert!(r.key_id.is_some());
        assert_eq!(r.hash.as_deref(), Some("xyz"));
    }
}
