// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! Minimal DER structures for building X.509 certificates.
//!
//! Only what the self-signed chain generator needs is modelled: a version 3
//! TBSCertificate with UTF-8 distinguished names, UTCTime validity, an RSA
//! SubjectPublicKeyInfo and the basicConstraints/keyUsage extensions that
//! SMPTE 430-2 requires. Serialization is through the picky ASN.1 wrappers,
//! the same DER layer the rest of the crate uses for public key digests.

use std::convert::TryFrom;

use picky_asn1::bit_string::BitString;
use picky_asn1::date::UTCTime;
use picky_asn1::restricted_string::Utf8String;
use picky_asn1::wrapper::{
    Asn1SequenceOf, Asn1SetOf, BitStringAsn1, ExplicitContextTag0, ExplicitContextTag3,
    IntegerAsn1, ObjectIdentifierAsn1, OctetStringAsn1, UTCTimeAsn1, Utf8StringAsn1,
};
use picky_asn1_x509::subject_public_key_info::SubjectPublicKeyInfo;
use serde::{Deserialize, Serialize};

use crate::error::{CryptoErrorKind, Result};

fn object_id(dotted: &str) -> ObjectIdentifierAsn1 {
    // The inputs are compile-time constants, so failure here is a programming
    // error rather than a data error.
    ObjectIdentifierAsn1::from(oid::ObjectIdentifier::try_from(dotted).unwrap())
}

/// sha256WithRSAEncryption, with its NULL parameter.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct AlgorithmIdentifier {
    algorithm: ObjectIdentifierAsn1,
    parameters: (),
}

impl AlgorithmIdentifier {
    pub fn sha256_with_rsa() -> AlgorithmIdentifier {
        AlgorithmIdentifier {
            algorithm: object_id("1.2.840.113549.1.1.11"),
            parameters: (),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct AttributeTypeAndValue {
    ty: ObjectIdentifierAsn1,
    value: Utf8StringAsn1,
}

/// An X.501 RDNSequence: one single-valued RDN per attribute.
pub(crate) type Name = Asn1SequenceOf<Asn1SetOf<AttributeTypeAndValue>>;

/// The distinguished-name shape used throughout DCP certificates:
/// organisation, organisational unit, common name and the dnQualifier
/// carrying the public key digest.
pub(crate) fn directory_name(
    organisation: &str,
    organisational_unit: &str,
    common_name: &str,
    dn_qualifier: &str,
) -> Name {
    let attr = |oid: &str, value: &str| {
        Asn1SetOf(vec![AttributeTypeAndValue {
            ty: object_id(oid),
            value: Utf8StringAsn1::from(
                Utf8String::from_string(value.to_string())
                    .expect("valid UTF-8 string"),
            ),
        }])
    };
    Asn1SequenceOf(vec![
        attr("2.5.4.10", organisation),
        attr("2.5.4.11", organisational_unit),
        attr("2.5.4.3", common_name),
        attr("2.5.4.46", dn_qualifier),
    ])
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct Validity {
    not_before: UTCTimeAsn1,
    not_after: UTCTimeAsn1,
}

impl Validity {
    pub fn days_from_now(days: i64) -> Validity {
        let now = chrono::Utc::now();
        let later = now + chrono::Duration::days(days);
        Validity {
            not_before: utc_time(&now),
            not_after: utc_time(&later),
        }
    }
}

fn utc_time(t: &chrono::DateTime<chrono::Utc>) -> UTCTimeAsn1 {
    use chrono::{Datelike, Timelike};
    UTCTimeAsn1::from(
        UTCTime::new(
            t.year() as u16,
            t.month() as u8,
            t.day() as u8,
            t.hour() as u8,
            t.minute() as u8,
            t.second() as u8,
        )
        .expect("valid UTC time components"),
    )
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct Extension {
    id: ObjectIdentifierAsn1,
    critical: bool,
    value: OctetStringAsn1,
}

/// basicConstraints with CA:TRUE and a path length.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct CaBasicConstraints {
    ca: bool,
    path_len: u8,
}

impl Extension {
    pub fn basic_constraints_ca(path_len: u8) -> Result<Extension> {
        let body = CaBasicConstraints { ca: true, path_len };
        Ok(Extension {
            id: object_id("2.5.29.19"),
            critical: true,
            value: OctetStringAsn1::from(der(&body)?),
        })
    }

    pub fn basic_constraints_leaf() -> Result<Extension> {
        let empty: Asn1SequenceOf<IntegerAsn1> = Asn1SequenceOf(Vec::new());
        Ok(Extension {
            id: object_id("2.5.29.19"),
            critical: true,
            value: OctetStringAsn1::from(der(&empty)?),
        })
    }

    /// keyUsage keyCertSign + cRLSign, for signing certificates.
    pub fn key_usage_certificate_authority() -> Result<Extension> {
        let mut bits = BitString::with_len(7);
        bits.set(5, true); // keyCertSign
        bits.set(6, true); // cRLSign
        Extension::key_usage(bits)
    }

    /// keyUsage digitalSignature + keyEncipherment, for the leaf.
    pub fn key_usage_signer() -> Result<Extension> {
        let mut bits = BitString::with_len(3);
        bits.set(0, true); // digitalSignature
        bits.set(2, true); // keyEncipherment
        Extension::key_usage(bits)
    }

    fn key_usage(bits: BitString) -> Result<Extension> {
        let body = BitStringAsn1::from(bits);
        Ok(Extension {
            id: object_id("2.5.29.15"),
            critical: true,
            value: OctetStringAsn1::from(der(&body)?),
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct TbsCertificate {
    version: ExplicitContextTag0<u8>,
    serial_number: IntegerAsn1,
    signature: AlgorithmIdentifier,
    issuer: Name,
    validity: Validity,
    subject: Name,
    subject_public_key_info: SubjectPublicKeyInfo,
    extensions: ExplicitContextTag3<Asn1SequenceOf<Extension>>,
}

impl TbsCertificate {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        serial: u8,
        issuer: Name,
        subject: Name,
        validity: Validity,
        subject_public_key_info: SubjectPublicKeyInfo,
        extensions: Vec<Extension>,
    ) -> TbsCertificate {
        TbsCertificate {
            version: ExplicitContextTag0(2),
            serial_number: IntegerAsn1::from_bytes_be_unsigned(vec![serial]),
            signature: AlgorithmIdentifier::sha256_with_rsa(),
            issuer,
            validity,
            subject,
            subject_public_key_info,
            extensions: ExplicitContextTag3(Asn1SequenceOf(extensions)),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct CertificateDer {
    tbs_certificate: TbsCertificate,
    signature_algorithm: AlgorithmIdentifier,
    signature_value: BitStringAsn1,
}

impl CertificateDer {
    /// Assemble a certificate from its signed TBS part.
    pub fn assemble(tbs_certificate: TbsCertificate, signature: Vec<u8>) -> CertificateDer {
        let bits = BitString::with_bytes(signature);
        CertificateDer {
            tbs_certificate,
            signature_algorithm: AlgorithmIdentifier::sha256_with_rsa(),
            signature_value: BitStringAsn1::from(bits),
        }
    }
}

/// DER-encode any of the structures in this module.
pub(crate) fn der<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    picky_asn1_der::to_vec(value).map_err(|e| CryptoErrorKind::CouldNotSign(e.to_string()).into())
}
