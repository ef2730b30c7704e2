// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! RFC 5646 language tag well-formedness.
//!
//! Bv2.1 requires every language and territory in a package to conform to
//! RFC 5646. Full registry validation is out of scope; what is checked
//! here is the grammar of the tag.

use std::sync::OnceLock;

use regex::Regex;

fn langtag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // language [-extlang] [-script] [-region] (-variant)* (-extension)* [-privateuse]
        Regex::new(
            r"(?x)^
            (?:
              [A-Za-z]{2,3} (?: - [A-Za-z]{3} (?: - [A-Za-z]{3} ){0,2} )?   # language-extlang
              | [A-Za-z]{4}                                                 # reserved
              | [A-Za-z]{5,8}                                               # registered language
            )
            (?: - [A-Za-z]{4} )?                                            # script
            (?: - (?: [A-Za-z]{2} | [0-9]{3} ) )?                           # region
            (?: - (?: [A-Za-z0-9]{5,8} | [0-9][A-Za-z0-9]{3} ) )*           # variant
            (?: - [0-9A-WY-Za-wy-z] (?: - [A-Za-z0-9]{2,8} )+ )*            # extension
            (?: - [Xx] (?: - [A-Za-z0-9]{1,8} )+ )?                         # private use
            $",
        )
        .unwrap()
    })
}

/// Is `tag` a well-formed RFC 5646 language tag?
pub fn tag_is_valid(tag: &str) -> bool {
    // Private-use-only tags ("x-...") are also well-formed.
    if let Some(rest) = tag.strip_prefix("x-").or_else(|| tag.strip_prefix("X-")) {
        return !rest.is_empty()
            && rest
                .split('-')
                .all(|p| !p.is_empty() && p.len() <= 8 && p.chars().all(|c| c.is_ascii_alphanumeric()));
    }
    langtag_regex().is_match(tag)
}

/// Is `region` a well-formed RFC 5646 region subtag (two letters or three
/// digits)?
pub fn region_is_valid(region: &str) -> bool {
    (region.len() == 2 && region.chars().all(|c| c.is_ascii_alphabetic()))
        || (region.len() == 3 && region.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_tags() {
        for tag in ["en", "en-GB", "de-DE", "fr-CA", "zh-Hant-TW", "pt-419", "x-private"] {
            assert!(tag_is_valid(tag), "{} should be valid", tag);
        }
    }

    #[test]
    fn rejects_malformed_tags() {
        for tag in ["", "this is not a tag", "e", "en_GB", "en-", "123"] {
            assert!(!tag_is_valid(tag), "{} should be invalid", tag);
        }
    }

    #[test]
    fn region_subtags() {
        assert!(region_is_valid("DE"));
        assert!(region_is_valid("419"));
        assert!(!region_is_valid("001x"));
        assert!(!region_is_valid("D"));
    }
}
