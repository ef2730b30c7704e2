// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! Generation of self-signed certificate chains.
//!
//! Produces the conventional three-link DCP signer chain (root, one
//! intermediate, leaf) entirely in process: RSA-2048 keys from [`rsa`],
//! certificates assembled through the DER structures in [`super::asn1`].
//! Serial numbers are 5/6/7 and path-length constraints 3/2/none, matching
//! the certificates that established tooling emits, and every subject
//! carries a `dnQualifier` with the digest of its own public key as
//! SMPTE 430-2 requires.

use picky_asn1::wrapper::IntegerAsn1;
use picky_asn1_x509::subject_public_key_info::SubjectPublicKeyInfo;
use pkcs1::ToRsaPrivateKey;
use rand::rngs::OsRng;
use rsa::hash::Hash;
use rsa::{PaddingScheme, PublicKeyParts, RsaPrivateKey};
use sha2::{Digest, Sha256};

use super::asn1::{der, directory_name, CertificateDer, Extension, TbsCertificate, Validity};
use super::certificate::Certificate;
use super::chain::CertificateChain;
use crate::error::{CryptoErrorKind, Result};
use crate::util::public_key_digest;

const KEY_BITS: usize = 2048;

/// Default common names, marked not-for-production as the usual convention.
pub const DEFAULT_ROOT_COMMON_NAME: &str = ".smpte-430-2.ROOT.NOT_FOR_PRODUCTION";
pub const DEFAULT_INTERMEDIATE_COMMON_NAME: &str = ".smpte-430-2.INTERMEDIATE.NOT_FOR_PRODUCTION";
pub const DEFAULT_LEAF_COMMON_NAME: &str = "CS.smpte-430-2.LEAF.NOT_FOR_PRODUCTION";

impl CertificateChain {
    /// Generate a complete self-signed chain, with the leaf's private key
    /// attached, ready for signing CPLs and PKLs.
    pub fn new_self_signed(
        organisation: &str,
        organisational_unit: &str,
        root_common_name: &str,
        intermediate_common_name: &str,
        leaf_common_name: &str,
    ) -> Result<CertificateChain> {
        let root_key = generate_key()?;
        let intermediate_key = generate_key()?;
        let leaf_key = generate_key()?;

        let root_name = directory_name(
            organisation,
            organisational_unit,
            root_common_name,
            &public_key_digest(&root_key)?,
        );
        let intermediate_name = directory_name(
            organisation,
            organisational_unit,
            intermediate_common_name,
            &public_key_digest(&intermediate_key)?,
        );
        let leaf_name = directory_name(
            organisation,
            organisational_unit,
            leaf_common_name,
            &public_key_digest(&leaf_key)?,
        );

        let root = issue(
            5,
            root_name.clone(),
            root_name.clone(),
            &root_key,
            &root_key,
            Validity::days_from_now(3650),
            vec![
                Extension::basic_constraints_ca(3)?,
                Extension::key_usage_certificate_authority()?,
            ],
        )?;

        let intermediate = issue(
            6,
            root_name,
            intermediate_name.clone(),
            &root_key,
            &intermediate_key,
            Validity::days_from_now(3649),
            vec![
                Extension::basic_constraints_ca(2)?,
                Extension::key_usage_certificate_authority()?,
            ],
        )?;

        let leaf = issue(
            7,
            intermediate_name,
            leaf_name,
            &intermediate_key,
            &leaf_key,
            Validity::days_from_now(3648),
            vec![
                Extension::basic_constraints_leaf()?,
                Extension::key_usage_signer()?,
            ],
        )?;

        let mut chain = CertificateChain::new();
        chain.add(root);
        chain.add(intermediate);
        chain.add(leaf);
        chain.set_key(
            leaf_key
                .to_pkcs1_pem()
                .map_err(|e| CryptoErrorKind::BadKey(e.to_string()))?
                .to_string(),
        );
        Ok(chain)
    }
}

fn generate_key() -> Result<RsaPrivateKey> {
    RsaPrivateKey::new(&mut OsRng, KEY_BITS)
        .map_err(|e| CryptoErrorKind::BadKey(e.to_string()).into())
}

fn issue(
    serial: u8,
    issuer: super::asn1::Name,
    subject: super::asn1::Name,
    issuer_key: &RsaPrivateKey,
    subject_key: &RsaPrivateKey,
    validity: Validity,
    extensions: Vec<Extension>,
) -> Result<Certificate> {
    let public = subject_key.to_public_key();
    let spki = SubjectPublicKeyInfo::new_rsa_key(
        IntegerAsn1::from_bytes_be_unsigned(public.n().to_bytes_be()),
        IntegerAsn1::from_bytes_be_unsigned(public.e().to_bytes_be()),
    );

    let tbs = TbsCertificate::new(serial, issuer, subject, validity, spki, extensions);
    let tbs_der = der(&tbs)?;

    let digest = Sha256::digest(&tbs_der);
    let signature = issuer_key
        .sign(
            PaddingScheme::new_pkcs1v15_sign(Some(Hash::SHA2_256)),
            &digest,
        )
        .map_err(|e| CryptoErrorKind::CouldNotSign(e.to_string()))?;

    let certificate = CertificateDer::assemble(tbs, signature);
    Certificate::from_der(der(&certificate)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    // RSA key generation is slow in debug builds, so the heavier chain
    // behaviour is covered by the integration tests; this checks the pieces
    // that do not need a full chain.

    #[test]
    fn empty_chain_is_trivially_key_valid() {
        let chain = CertificateChain::new();
        assert!(chain.private_key_valid().unwrap());
        assert!(chain.root_to_leaf().unwrap().is_empty());
    }
}
