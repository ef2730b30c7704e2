// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! A single X.509 certificate.
//!
//! Certificates are held as their PEM text plus the decoded DER, with the
//! fields that the rest of the crate needs (distinguished names, serial,
//! RSA modulus) extracted eagerly so that accessors are infallible.

use picky_asn1_x509::RsaPublicKey;
use x509_parser::certificate::X509Certificate;
use x509_parser::parse_x509_certificate;
use x509_parser::pem::parse_x509_pem;

use crate::error::{CryptoErrorKind, Result};

#[derive(Clone, Debug)]
pub struct Certificate {
    pem: String,
    der: Vec<u8>,
    issuer: String,
    subject: String,
    issuer_der: Vec<u8>,
    subject_der: Vec<u8>,
    serial: String,
    modulus: Vec<u8>,
    exponent: Vec<u8>,
}

impl Certificate {
    /// Parse a certificate from PEM text.
    pub fn from_pem(pem: &str) -> Result<Certificate> {
        let (_, parsed) = parse_x509_pem(pem.as_bytes())
            .map_err(|e| CryptoErrorKind::BadCertificate(e.to_string()))?;
        Certificate::build(pem.to_string(), parsed.contents)
    }

    /// Parse a certificate from raw DER bytes.
    pub fn from_der(der: Vec<u8>) -> Result<Certificate> {
        let pem = format!(
            "-----BEGIN CERTIFICATE-----\n{}-----END CERTIFICATE-----\n",
            wrap_base64(&base64::encode(&der))
        );
        Certificate::build(pem, der)
    }

    /// Read the first PEM certificate out of `text`, returning it together
    /// with the remainder of the text. Used to split concatenated chain
    /// files.
    pub fn read_string(text: &str) -> Result<(Certificate, &str)> {
        let begin = text
            .find("-----BEGIN CERTIFICATE-----")
            .ok_or_else(|| CryptoErrorKind::BadCertificate("no certificate found".to_string()))?;
        let end_marker = "-----END CERTIFICATE-----";
        let end = text[begin..]
            .find(end_marker)
            .ok_or_else(|| CryptoErrorKind::BadCertificate("unterminated certificate".to_string()))?
            + begin
            + end_marker.len();
        let certificate = Certificate::from_pem(&text[begin..end])?;
        Ok((certificate, &text[end..]))
    }

    fn build(pem: String, der: Vec<u8>) -> Result<Certificate> {
        let (issuer, subject, issuer_der, subject_der, serial, modulus, exponent) = {
            let (_, x509) = parse_x509_certificate(&der)
                .map_err(|e| CryptoErrorKind::BadCertificate(e.to_string()))?;
            let tbs = &x509.tbs_certificate;
            let spki_data: &[u8] = &tbs.subject_pki.subject_public_key.data;
            let rsa: RsaPublicKey = picky_asn1_der::from_bytes(spki_data)
                .map_err(|e| CryptoErrorKind::BadCertificate(format!("not an RSA key: {}", e)))?;
            (
                tbs.issuer.to_string(),
                tbs.subject.to_string(),
                tbs.issuer.as_raw().to_vec(),
                tbs.subject.as_raw().to_vec(),
                tbs.serial.to_string(),
                trim_leading_zeros(rsa.modulus.as_unsigned_bytes_be()).to_vec(),
                trim_leading_zeros(rsa.public_exponent.as_unsigned_bytes_be()).to_vec(),
            )
        };
        Ok(Certificate {
            pem,
            der,
            issuer,
            subject,
            issuer_der,
            subject_der,
            serial,
            modulus,
            exponent,
        })
    }

    /// Run `f` against the freshly-parsed certificate. The parsed form
    /// borrows from our DER, so it cannot be stored.
    pub(crate) fn with_parsed<R>(&self, f: impl FnOnce(&X509Certificate) -> R) -> Result<R> {
        let (_, x509) = parse_x509_certificate(&self.der)
            .map_err(|e| CryptoErrorKind::BadCertificate(e.to_string()))?;
        Ok(f(&x509))
    }

    /// The issuer distinguished name, in display form.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// The subject distinguished name, in display form.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The certificate serial number, in decimal.
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// The RSA modulus of the certificate's public key, big-endian with
    /// leading zeros removed.
    pub fn modulus(&self) -> &[u8] {
        &self.modulus
    }

    /// The RSA public exponent of the certificate's public key.
    pub fn exponent(&self) -> &[u8] {
        &self.exponent
    }

    pub(crate) fn issuer_der(&self) -> &[u8] {
        &self.issuer_der
    }

    pub(crate) fn subject_der(&self) -> &[u8] {
        &self.subject_der
    }

    /// The certificate text: full PEM with armour, or just the base64 body
    /// as it appears inside `<X509Certificate>` nodes.
    pub fn certificate(&self, with_armour: bool) -> String {
        if with_armour {
            self.pem.clone()
        } else {
            self.pem
                .lines()
                .filter(|l| !l.starts_with("-----"))
                .collect()
        }
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Certificate) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

pub(crate) fn wrap_base64(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + s.len() / 64 + 1);
    for chunk in s.as_bytes().chunks(64) {
        out.push_str(std::str::from_utf8(chunk).unwrap());
        out.push('\n');
    }
    out
}
