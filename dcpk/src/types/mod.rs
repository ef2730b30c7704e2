// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! Small value types shared across the crate: identifiers, rational edit
//! rates, time codes, content kinds, markers and the Interop/SMPTE dialect
//! switch.

pub mod language;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Local};

use crate::error::{Error, ReadErrorKind, Result, XmlError};

/// The two dialects of DCP in the wild. They are distinguished by the
/// namespace of their top-level XML documents, and must not be mixed within
/// one package.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Standard {
    /// The early "Interop" dialect.
    Interop,
    /// SMPTE 429.
    Smpte,
}

/// An identifier for a manifest-visible entity: a UUID, serialized into XML
/// as `urn:uuid:<hex>`.
///
/// The hex form is canonicalised to lower case on construction, so equality
/// is case-insensitive as the standards require.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(String);

impl Id {
    /// Generate a fresh random (RFC 4122 version 4) identifier.
    pub fn generate() -> Id {
        Id(crate::util::make_uuid())
    }

    /// Parse an identifier, accepting the bare hex form or the `urn:uuid:`
    /// prefixed form used in manifests.
    pub fn parse(s: &str) -> Id {
        Id(remove_urn_uuid(s).trim().to_lowercase())
    }

    /// The bare lower-case hex form, without the urn prefix.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `urn:uuid:` form used when emitting manifests.
    pub fn to_urn(&self) -> String {
        format!("urn:uuid:{}", self.0)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strip a `urn:uuid:` prefix if there is one.
pub fn remove_urn_uuid(s: &str) -> &str {
    s.strip_prefix("urn:uuid:").unwrap_or(s)
}

/// A rational frame (edit) rate, e.g. 24/1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fraction {
    pub numerator: i64,
    pub denominator: i64,
}

impl Fraction {
    pub fn new(numerator: i64, denominator: i64) -> Fraction {
        Fraction {
            numerator,
            denominator,
        }
    }

    /// The space-separated form used in CPL `<EditRate>` nodes, e.g. "24 1".
    pub fn as_string(&self) -> String {
        format!("{} {}", self.numerator, self.denominator)
    }

    pub fn as_float(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

impl FromStr for Fraction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Fraction> {
        let mut parts = s.split_whitespace();
        let numerator = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(|| XmlError::new(format!("bad edit rate '{}'", s)))?;
        // A single number is tolerated and treated as n/1.
        let denominator = match parts.next() {
            Some(p) => p
                .parse()
                .map_err(|_| XmlError::new(format!("bad edit rate '{}'", s)))?,
            None => 1,
        };
        Ok(Fraction {
            numerator,
            denominator,
        })
    }
}

/// A picture size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Size {
        Size { width, height }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// The kind of content that a CPL describes, from the `<ContentKind>` node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentKind {
    Feature,
    Short,
    Trailer,
    Test,
    Transitional,
    Rating,
    Teaser,
    Policy,
    PublicServiceAnnouncement,
    Advertisement,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Feature => "feature",
            ContentKind::Short => "short",
            ContentKind::Trailer => "trailer",
            ContentKind::Test => "test",
            ContentKind::Transitional => "transitional",
            ContentKind::Rating => "rating",
            ContentKind::Teaser => "teaser",
            ContentKind::Policy => "policy",
            ContentKind::PublicServiceAnnouncement => "psa",
            ContentKind::Advertisement => "advertisement",
        }
    }

    /// Parse a `<ContentKind>` value. Reasonably tolerant about case.
    pub fn from_str_tolerant(s: &str) -> Result<ContentKind> {
        match s.to_lowercase().as_str() {
            "feature" => Ok(ContentKind::Feature),
            "short" => Ok(ContentKind::Short),
            "trailer" => Ok(ContentKind::Trailer),
            "test" => Ok(ContentKind::Test),
            "transitional" => Ok(ContentKind::Transitional),
            "rating" => Ok(ContentKind::Rating),
            "teaser" => Ok(ContentKind::Teaser),
            "policy" => Ok(ContentKind::Policy),
            "psa" => Ok(ContentKind::PublicServiceAnnouncement),
            "advertisement" => Ok(ContentKind::Advertisement),
            _ => Err(XmlError::new(format!("unrecognised content kind '{}'", s)).into()),
        }
    }
}

/// Symbolic marker labels that can appear in a reel's `<MainMarkers>` asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Marker {
    /// First frame of composition
    Ffoc,
    /// Last frame of composition
    Lfoc,
    /// First frame of title credits
    Fftc,
    /// Last frame of title credits
    Lftc,
    /// First frame of intermission
    Ffoi,
    /// Last frame of intermission
    Lfoi,
    /// First frame of end credits
    Ffec,
    /// Last frame of end credits
    Lfec,
    /// First frame of moving credits
    Ffmc,
    /// Last frame of moving credits
    Lfmc,
}

impl Marker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Marker::Ffoc => "FFOC",
            Marker::Lfoc => "LFOC",
            Marker::Fftc => "FFTC",
            Marker::Lftc => "LFTC",
            Marker::Ffoi => "FFOI",
            Marker::Lfoi => "LFOI",
            Marker::Ffec => "FFEC",
            Marker::Lfec => "LFEC",
            Marker::Ffmc => "FFMC",
            Marker::Lfmc => "LFMC",
        }
    }

    pub fn from_label(s: &str) -> Result<Marker> {
        match s {
            "FFOC" => Ok(Marker::Ffoc),
            "LFOC" => Ok(Marker::Lfoc),
            "FFTC" => Ok(Marker::Fftc),
            "LFTC" => Ok(Marker::Lftc),
            "FFOI" => Ok(Marker::Ffoi),
            "LFOI" => Ok(Marker::Lfoi),
            "FFEC" => Ok(Marker::Ffec),
            "LFEC" => Ok(Marker::Lfec),
            "FFMC" => Ok(Marker::Ffmc),
            "LFMC" => Ok(Marker::Lfmc),
            _ => Err(ReadErrorKind::Other(format!("unrecognised marker '{}'", s)).into()),
        }
    }
}

/// A subtitle/marker time code: hours, minutes, seconds and editable units at
/// a given time-code rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Time {
    pub h: i64,
    pub m: i64,
    pub s: i64,
    /// Editable units, in the range [0, tcr).
    pub e: i64,
    /// Time-code rate: the number of editable units per second.
    pub tcr: i64,
}

impl Time {
    pub fn new(h: i64, m: i64, s: i64, e: i64, tcr: i64) -> Time {
        Time { h, m, s, e, tcr }
    }

    /// A zero time at a nominal rate.
    pub fn zero() -> Time {
        Time::new(0, 0, 0, 0, 24)
    }

    pub fn is_zero(&self) -> bool {
        self.h == 0 && self.m == 0 && self.s == 0 && self.e == 0
    }

    /// Parse a "HH:MM:SS:EE" string against the given time-code rate.
    pub fn parse(s: &str, tcr: i64) -> Result<Time> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 4 {
            return Err(XmlError::new(format!("bad time '{}'", s)).into());
        }
        let mut v = [0_i64; 4];
        for (i, p) in parts.iter().enumerate() {
            v[i] = p
                .parse()
                .map_err(|_| XmlError::new(format!("bad time '{}'", s)))?;
        }
        Ok(Time::new(v[0], v[1], v[2], v[3], tcr))
    }

    /// Whole seconds represented by this time, discarding editable units.
    fn whole_seconds(&self) -> i64 {
        (self.h * 60 + self.m) * 60 + self.s
    }

    /// Convert to a count of editable units at the given rate.
    pub fn as_editable_units(&self, rate: i64) -> i64 {
        self.whole_seconds() * rate + self.e * rate / self.tcr
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}:{:02}", self.h, self.m, self.s, self.e)
    }
}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Time) -> Option<std::cmp::Ordering> {
        // Compare on a common base so that differing time-code rates order
        // correctly.
        let a = self.whole_seconds() * self.tcr * other.tcr + self.e * other.tcr;
        let b = other.whole_seconds() * self.tcr * other.tcr + other.e * self.tcr;
        a.partial_cmp(&b)
    }
}

/// A local date-time with explicit UTC offset, rendered in the ISO 8601 form
/// that `<IssueDate>` nodes carry.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalTime(DateTime<FixedOffset>);

impl LocalTime {
    pub fn now() -> LocalTime {
        let now = Local::now();
        LocalTime(now.with_timezone(now.offset()))
    }

    pub fn as_string(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
    }
}

/// One `<ContentVersion>` of a CPL.
#[derive(Clone, Debug, PartialEq)]
pub struct ContentVersion {
    pub id: String,
    pub label_text: String,
}

impl ContentVersion {
    pub fn new(id: String, label_text: String) -> ContentVersion {
        ContentVersion { id, label_text }
    }

    /// The default content version: a random ID qualified with the current
    /// time, used when the caller supplies none.
    pub fn default_now() -> ContentVersion {
        let v = format!(
            "urn:uuid:{}{}",
            crate::util::make_uuid(),
            LocalTime::now().as_string()
        );
        ContentVersion {
            id: v.clone(),
            label_text: v,
        }
    }
}

/// One `<Rating>` of a CPL: the rating agency's URI and its label.
#[derive(Clone, Debug, PartialEq)]
pub struct Rating {
    pub agency: String,
    pub label: String,
}

/// Luminance for CPL metadata, a value with its unit string.
#[derive(Clone, Debug, PartialEq)]
pub struct Luminance {
    pub value: f32,
    pub unit: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_case_insensitive() {
        let a = Id::parse("urn:uuid:81FB54DF-E1BF-4647-8788-EA7BA154375B");
        let b = Id::parse("81fb54df-e1bf-4647-8788-ea7ba154375b");
        assert_eq!(a, b);
        assert_eq!(a.to_urn(), "urn:uuid:81fb54df-e1bf-4647-8788-ea7ba154375b");
    }

    #[test]
    fn fraction_round_trip() {
        let f: Fraction = "24 1".parse().unwrap();
        assert_eq!(f, Fraction::new(24, 1));
        assert_eq!(f.as_string(), "24 1");
        assert_eq!("25".parse::<Fraction>().unwrap(), Fraction::new(25, 1));
    }

    #[test]
    fn time_editable_units() {
        let t = Time::parse("00:00:04:00", 24).unwrap();
        assert_eq!(t.as_editable_units(24), 96);
        assert_eq!(t.as_editable_units(48), 192);
        let u = Time::new(0, 0, 1, 12, 24);
        assert_eq!(u.as_editable_units(24), 36);
    }

    #[test]
    fn time_ordering_across_rates() {
        let a = Time::new(0, 0, 1, 0, 24);
        let b = Time::new(0, 0, 1, 125, 250);
        assert!(a < b);
        assert!(Time::new(0, 0, 0, 23, 24) < a);
    }

    #[test]
    fn content_kind_round_trip() {
        for kind in [
            ContentKind::Feature,
            ContentKind::PublicServiceAnnouncement,
            ContentKind::Advertisement,
        ] {
            assert_eq!(
                ContentKind::from_str_tolerant(kind.as_str()).unwrap(),
                kind
            );
        }
        assert_eq!(
            ContentKind::from_str_tolerant("Feature").unwrap(),
            ContentKind::Feature
        );
        assert!(ContentKind::from_str_tolerant("sitcom").is_err());
    }
}
