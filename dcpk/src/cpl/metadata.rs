// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! The SMPTE `<CompositionMetadataAsset>` carried in a CPL's first reel.

use crate::error::Result;
use crate::types::{Id, Luminance, Size};
use crate::xml::{namespaces, Element};

/// The Bv2.1 extension-metadata scope and values that mark a composition
/// as conforming to the application profile.
pub const APP_SCOPE: &str = "http://isdcf.com/ns/cplmd/app";
pub const APP_NAME: &str = "Application";
pub const APP_PROPERTY_NAME: &str = "DCP Constraints Profile";
pub const APP_PROPERTY_VALUE: &str = "SMPTE-RDD-52:2020-Bv2.1";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompositionMetadata {
    pub id: Option<Id>,
    pub full_content_title_text: Option<String>,
    pub full_content_title_text_language: Option<String>,
    pub release_territory: Option<String>,
    pub release_territory_scope: Option<String>,
    pub version_number: Option<u32>,
    pub status: Option<String>,
    pub chain: Option<String>,
    pub distributor: Option<String>,
    pub facility: Option<String>,
    pub luminance: Option<Luminance>,
    pub main_sound_configuration: Option<String>,
    pub main_sound_sample_rate: Option<u32>,
    pub main_picture_stored_area: Option<Size>,
    pub main_picture_active_area: Option<Size>,
    pub additional_subtitle_languages: Vec<String>,
}

impl CompositionMetadata {
    /// Should this metadata cause a `<CompositionMetadataAsset>` node to be
    /// written at all?
    pub fn any_set(&self) -> bool {
        self != &CompositionMetadata::default()
    }

    pub fn parse(node: &Element) -> Result<CompositionMetadata> {
        let mut m = CompositionMetadata {
            id: node.optional_string_child("Id").map(|s| Id::parse(&s)),
            ..CompositionMetadata::default()
        };

        if let Some(title) = node.child("FullContentTitleText") {
            m.full_content_title_text = Some(title.text());
            m.full_content_title_text_language =
                title.attribute("language").map(|l| l.to_string());
        }
        if let Some(territory) = node.child("ReleaseTerritory") {
            m.release_territory = Some(territory.text());
            m.release_territory_scope = territory.attribute("scope").map(|s| s.to_string());
        }
        if let Some(version) = node.child("VersionNumber") {
            m.version_number = version.text().trim().parse().ok();
            m.status = version.attribute("status").map(|s| s.to_string());
        }
        m.chain = node.optional_string_child("Chain");
        m.distributor = node.optional_string_child("Distributor");
        m.facility = node.optional_string_child("Facility");
        if let Some(luminance) = node.child("Luminance") {
            if let Ok(value) = luminance.text().trim().parse() {
                m.luminance = Some(Luminance {
                    value,
                    unit: luminance
                        .attribute("units")
                        .unwrap_or("foot-lambert")
                        .to_string(),
                });
            }
        }
        m.main_sound_configuration = node.optional_string_child("MainSoundConfiguration");
        if let Some(rate) = node.optional_string_child("MainSoundSampleRate") {
            // Written as a rational, e.g. "48000 1".
            m.main_sound_sample_rate = rate.split_whitespace().next().and_then(|r| r.parse().ok());
        }
        m.main_picture_stored_area = parse_area(node, "MainPictureStoredArea");
        m.main_picture_active_area = parse_area(node, "MainPictureActiveArea");
        if let Some(list) = node.child("AdditionalSubtitleLanguageList") {
            for language in list.children_named("AdditionalSubtitleLanguage") {
                m.additional_subtitle_languages.push(language.text());
            }
        }

        Ok(m)
    }

    /// Build the `<meta:CompositionMetadataAsset>` element, including the
    /// Bv2.1 extension-metadata block.
    pub fn build(&self) -> Element {
        let mut node = Element::new("CompositionMetadataAsset");
        node.set_namespace_declaration(namespaces::CPL_METADATA_SMPTE, "meta");
        node.set_prefix("meta");
        node.add_child_with_text(
            "Id",
            &self.id.clone().unwrap_or_else(Id::generate).to_urn(),
        );

        if let Some(title) = &self.full_content_title_text {
            let t = meta_child(&mut node, "FullContentTitleText");
            if let Some(language) = &self.full_content_title_text_language {
                t.set_attribute("language", language);
            }
            t.add_text(title);
        }
        if let Some(territory) = &self.release_territory {
            let t = meta_child(&mut node, "ReleaseTerritory");
            if let Some(scope) = &self.release_territory_scope {
                t.set_attribute("scope", scope);
            }
            t.add_text(territory);
        }
        if let Some(version) = self.version_number {
            let v = meta_child(&mut node, "VersionNumber");
            v.set_attribute("status", self.status.as_deref().unwrap_or("final"));
            v.add_text(&version.to_string());
        }
        if let Some(chain) = &self.chain {
            meta_child(&mut node, "Chain").add_text(chain);
        }
        if let Some(distributor) = &self.distributor {
            meta_child(&mut node, "Distributor").add_text(distributor);
        }
        if let Some(facility) = &self.facility {
            meta_child(&mut node, "Facility").add_text(facility);
        }
        if let Some(luminance) = &self.luminance {
            let l = meta_child(&mut node, "Luminance");
            l.set_attribute("units", &luminance.unit);
            l.add_text(&luminance.value.to_string());
        }
        if let Some(configuration) = &self.main_sound_configuration {
            meta_child(&mut node, "MainSoundConfiguration").add_text(configuration);
        }
        if let Some(rate) = self.main_sound_sample_rate {
            meta_child(&mut node, "MainSoundSampleRate").add_text(&format!("{} 1", rate));
        }
        if let Some(area) = self.main_picture_stored_area {
            write_area(&mut node, "MainPictureStoredArea", area);
        }
        if let Some(area) = self.main_picture_active_area {
            write_area(&mut node, "MainPictureActiveArea", area);
        }
        if !self.additional_subtitle_languages.is_empty() {
            let list = meta_child(&mut node, "AdditionalSubtitleLanguageList");
            for language in &self.additional_subtitle_languages {
                let l = list.add_child(Element::new("AdditionalSubtitleLanguage"));
                l.set_prefix("meta");
                l.add_text(language);
            }
        }

        let extension_list = meta_child(&mut node, "ExtensionMetadataList");
        let extension = extension_list.add_child(Element::new("ExtensionMetadata"));
        extension.set_prefix("meta");
        extension.set_attribute("scope", APP_SCOPE);
        let name = extension.add_child(Element::new("Name"));
        name.set_prefix("meta");
        name.add_text(APP_NAME);
        let property_list = extension.add_child(Element::new("PropertyList"));
        property_list.set_prefix("meta");
        let property = property_list.add_child(Element::new("Property"));
        property.set_prefix("meta");
        let property_name = property.add_child(Element::new("Name"));
        property_name.set_prefix("meta");
        property_name.add_text(APP_PROPERTY_NAME);
        let property_value = property.add_child(Element::new("Value"));
        property_value.set_prefix("meta");
        property_value.add_text(APP_PROPERTY_VALUE);

        node
    }
}

fn meta_child<'a>(parent: &'a mut Element, name: &str) -> &'a mut Element {
    let mut child = Element::new(name);
    child.set_prefix("meta");
    parent.add_child(child)
}

fn parse_area(node: &Element, name: &str) -> Option<Size> {
    let area = node.child(name)?;
    let width = area.optional_string_child("Width")?.trim().parse().ok()?;
    let height = area.optional_string_child("Height")?.trim().parse().ok()?;
    Some(Size::new(width, height))
}

fn write_area(parent: &mut Element, name: &str, area: Size) {
    let node = meta_child(parent, name);
    let width = node.add_child(Element::new("Width"));
    width.set_prefix("meta");
    width.add_text(&area.width.to_string());
    let height = node.add_child(Element::new("Height"));
    height.set_prefix("meta");
    height.add_text(&area.height.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_round_trips() {
        let mut m = CompositionMetadata {
            full_content_title_text: Some("A Film".to_string()),
            version_number: Some(1),
            status: Some("final".to_string()),
            main_sound_sample_rate: Some(48000),
            main_picture_stored_area: Some(Size::new(1998, 1080)),
            main_picture_active_area: Some(Size::new(1998, 1080)),
            main_sound_configuration: Some("51/L,R,C,LFE,Ls,Rs".to_string()),
            ..CompositionMetadata::default()
        };
        m.additional_subtitle_languages.push("de-DE".to_string());

        let element = m.build();
        let parsed = CompositionMetadata::parse(&element).unwrap();
        assert_eq!(parsed.full_content_title_text.as_deref(), Some("A Film"));
        assert_eq!(parsed.version_number, Some(1));
        assert_eq!(parsed.main_sound_sample_rate, Some(48000));
        assert_eq!(parsed.main_picture_stored_area, Some(Size::new(1998, 1080)));
        assert_eq!(parsed.additional_subtitle_languages, ["de-DE"]);
    }

    #[test]
    fn extension_metadata_block_is_always_present() {
        let element = CompositionMetadata::default().build();
        let list = element.child("ExtensionMetadataList").unwrap();
        let extension = list.child("ExtensionMetadata").unwrap();
        assert_eq!(extension.attribute("scope"), Some(APP_SCOPE));
        assert_eq!(extension.string_child("Name").unwrap(), APP_NAME);
        let property = extension
            .child("PropertyList")
            .unwrap()
            .child("Property")
            .unwrap();
        assert_eq!(property.string_child("Name").unwrap(), APP_PROPERTY_NAME);
        assert_eq!(property.string_child("Value").unwrap(), APP_PROPERTY_VALUE);
    }
}
