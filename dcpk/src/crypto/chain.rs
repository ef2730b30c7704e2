// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! Certificate chains: ordering inference, validity checking and the
//! private-key/leaf binding.

use pkcs1::FromRsaPrivateKey;
use pkcs8::FromPrivateKey;
use rsa::{PublicKeyParts, RsaPrivateKey};

use super::certificate::Certificate;
use crate::error::{CryptoErrorKind, Result};

/// An unordered set of X.509 certificates plus an optional PEM-encoded RSA
/// private key for the leaf.
///
/// The chain is kept in the order certificates were added; ordering for
/// signing or display is derived on demand from issuer/subject
/// relationships.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CertificateChain {
    certificates: Vec<Certificate>,
    key: Option<String>,
}

impl CertificateChain {
    /// An empty chain.
    pub fn new() -> CertificateChain {
        CertificateChain::default()
    }

    /// Build a chain from a string holding one or more concatenated PEM
    /// certificates. Fails if the certificates cannot be ordered into a
    /// chain.
    pub fn from_string(text: &str) -> Result<CertificateChain> {
        let mut chain = CertificateChain::new();
        let mut rest = text;
        while let Ok((certificate, remainder)) = Certificate::read_string(rest) {
            chain.certificates.push(certificate);
            rest = remainder;
        }
        // This will fail if the chain cannot be ordered.
        chain.root_to_leaf()?;
        Ok(chain)
    }

    /// Add a certificate to the chain.
    pub fn add(&mut self, certificate: Certificate) {
        self.certificates.push(certificate);
    }

    /// Remove a certificate from the chain.
    pub fn remove(&mut self, certificate: &Certificate) {
        self.certificates.retain(|c| c != certificate);
    }

    /// Remove the i'th certificate, counting from root to leaf.
    pub fn remove_nth(&mut self, i: usize) -> Result<()> {
        let ordered: Vec<Certificate> = self.root_to_leaf()?.into_iter().cloned().collect();
        if let Some(target) = ordered.get(i) {
            let target = target.clone();
            self.remove(&target);
        }
        Ok(())
    }

    pub fn set_key<S: Into<String>>(&mut self, key: S) {
        self.key = Some(key.into());
    }

    /// The leaf's RSA private key in PEM form, if one has been attached.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn unordered(&self) -> &[Certificate] {
        &self.certificates
    }

    /// The root certificate.
    pub fn root(&self) -> Result<&Certificate> {
        Ok(self.root_to_leaf()?[0])
    }

    /// The leaf certificate.
    pub fn leaf(&self) -> Result<&Certificate> {
        let ordered = self.root_to_leaf()?;
        Ok(ordered[ordered.len() - 1])
    }

    /// The certificates ordered from root to leaf.
    ///
    /// The order is found by walking the issuer→subject graph: the root is
    /// the certificate that no other certificate issued, and each subsequent
    /// link is the certificate the previous one issued. The resulting order
    /// must also pass [`chain_valid_order`](Self::chain_valid); otherwise
    /// this fails with `NotAChain`.
    pub fn root_to_leaf(&self) -> Result<Vec<&Certificate>> {
        if self.certificates.is_empty() {
            return Ok(Vec::new());
        }
        if self.certificates.len() == 1 {
            return Ok(self.certificates.iter().collect());
        }

        let ordered = self.graph_order().ok_or(CryptoErrorKind::NotAChain)?;
        if !Self::order_valid(&ordered)? {
            return Err(CryptoErrorKind::NotAChain.into());
        }
        Ok(ordered)
    }

    /// The certificates ordered from leaf to root.
    pub fn leaf_to_root(&self) -> Result<Vec<&Certificate>> {
        let mut ordered = self.root_to_leaf()?;
        ordered.reverse();
        Ok(ordered)
    }

    fn graph_order(&self) -> Option<Vec<&Certificate>> {
        // The root is issued by nothing else in the set (usually it is
        // self-signed, but an externally-issued root is tolerated here; the
        // validity check still applies to every link we return).
        let mut root = None;
        for candidate in &self.certificates {
            let issued_by_other = self.certificates.iter().any(|other| {
                other.subject_der() == candidate.issuer_der()
                    && other.subject_der() != candidate.subject_der()
            });
            if !issued_by_other {
                if root.is_some() {
                    // Two disconnected roots: not a single chain.
                    return None;
                }
                root = Some(candidate);
            }
        }

        let mut ordered = vec![root?];
        while ordered.len() < self.certificates.len() {
            let current = *ordered.last().unwrap();
            let mut next = None;
            for candidate in &self.certificates {
                if candidate.issuer_der() == current.subject_der()
                    && candidate.subject_der() != current.subject_der()
                {
                    if next.is_some() {
                        // Branching: more than one child, so not a chain.
                        return None;
                    }
                    next = Some(candidate);
                }
            }
            ordered.push(next?);
        }
        Some(ordered)
    }

    /// Is the stored certificate order a valid chain?
    ///
    /// Each successive pair is interpreted as (issuer, subject): the child's
    /// signature must verify against the parent's public key, and in
    /// addition the child's issuer DN must equal the parent's subject DN
    /// while differing from its own subject DN. Raw signature verification
    /// alone can succeed on inputs that do not form a linear chain, which is
    /// why the DN checks are required as well.
    pub fn chain_valid(&self) -> Result<bool> {
        let order: Vec<&Certificate> = self.certificates.iter().collect();
        Self::order_valid(&order)
    }

    fn order_valid(order: &[&Certificate]) -> Result<bool> {
        for pair in order.windows(2) {
            let (parent, child) = (pair[0], pair[1]);
            if child.issuer_der() != parent.subject_der()
                || child.subject_der() == parent.subject_der()
            {
                return Ok(false);
            }
            let signature_ok = child.with_parsed(|child_x509| {
                parent
                    .with_parsed(|parent_x509| {
                        child_x509
                            .verify_signature(Some(&parent_x509.tbs_certificate.subject_pki))
                            .is_ok()
                    })
                    .unwrap_or(false)
            })?;
            if !signature_ok {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Does the attached private key match the leaf certificate?
    ///
    /// An empty chain is trivially valid. The check compares the RSA
    /// modulus of the loaded key against the leaf's public key.
    pub fn private_key_valid(&self) -> Result<bool> {
        if self.certificates.is_empty() {
            return Ok(true);
        }
        let key = match &self.key {
            Some(k) => k,
            None => return Ok(false),
        };
        let private = match load_private_key(key) {
            Ok(k) => k,
            Err(_) => return Ok(false),
        };
        let leaf = self.leaf()?;
        let modulus = private.n().to_bytes_be();
        Ok(trimmed(&modulus) == leaf.modulus())
    }

    /// Is the whole chain usable for signing? On failure, `reason` is filled
    /// in with a human-readable explanation.
    pub fn valid(&self, reason: Option<&mut String>) -> bool {
        if self.root_to_leaf().is_err() {
            if let Some(r) = reason {
                *r = "certificates do not form a chain".to_string();
            }
            return false;
        }

        if !self.private_key_valid().unwrap_or(false) {
            if let Some(r) = reason {
                *r = "private key does not exist, or does not match leaf certificate".to_string();
            }
            return false;
        }

        true
    }

    /// All certificates concatenated in root-to-leaf order, as PEM.
    pub fn chain(&self) -> Result<String> {
        let mut out = String::new();
        for certificate in self.root_to_leaf()? {
            out.push_str(&certificate.certificate(true));
        }
        Ok(out)
    }

    /// Load the attached private key as an RSA key.
    pub(crate) fn private_key(&self) -> Result<RsaPrivateKey> {
        let key = self
            .key
            .as_ref()
            .ok_or(CryptoErrorKind::KeyMismatch)?;
        load_private_key(key)
    }
}

/// Parse an RSA private key in PEM form, accepting either the PKCS#1
/// (`BEGIN RSA PRIVATE KEY`) or PKCS#8 (`BEGIN PRIVATE KEY`) encodings.
pub(crate) fn load_private_key(pem: &str) -> Result<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs1_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
        .map_err(|e| CryptoErrorKind::BadKey(e.to_string()).into())
}

fn trimmed(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}
