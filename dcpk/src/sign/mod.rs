// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! XML-DSig enveloped signatures over manifest documents.
//!
//! Signing appends a `<Signer>` element (identifying the leaf certificate)
//! and a `<dsig:Signature>` envelope to the document root. The reference
//! digest is computed over the canonicalized document with the `Signature`
//! subtree excluded (the enveloped-signature transform); `SignedInfo` is
//! then canonicalized and signed with the chain's RSA key. Interop uses
//! SHA-1 / rsa-sha1, SMPTE uses SHA-256 / rsa-sha256.
//!
//! Because the digest is over serialized bytes, the envelope is
//! order-sensitive: a signed tree must not be re-indented or re-serialized
//! differently afterwards. The writers in this crate therefore always emit
//! signed documents through the canonical serializer, and signing is only
//! reachable through operations that serialize immediately afterwards.

use rsa::hash::Hash;
use rsa::{BigUint, PaddingScheme, PublicKey, RsaPublicKey};
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::crypto::{Certificate, CertificateChain};
use crate::error::{CryptoErrorKind, Result};
use crate::types::Standard;
use crate::xml::{namespaces, Document, Element};

const C14N_ALGORITHM: &str = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315";
const ENVELOPED_TRANSFORM: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";
const SHA1_DIGEST: &str = "http://www.w3.org/2000/09/xmldsig#sha1";
const SHA256_DIGEST: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
const RSA_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#rsa-sha1";
const RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";

/// Add `<Signer>` and `<dsig:Signature>` nodes to `root` and fill in the
/// digest and signature values.
pub fn sign(root: &mut Element, standard: Standard, chain: &CertificateChain) -> Result<()> {
    let leaf = chain.leaf()?;

    // <Signer>
    let mut signer = Element::new("Signer");
    signer.set_namespace_declaration(namespaces::XMLDSIG, "dsig");
    let data = add_dsig_child(&mut signer, "X509Data");
    let serial_element = add_dsig_child(data, "X509IssuerSerial");
    add_dsig_text(serial_element, "X509IssuerName", leaf.issuer());
    add_dsig_text(serial_element, "X509SerialNumber", leaf.serial());
    add_dsig_text(data, "X509SubjectName", leaf.subject());
    root.add_child(signer);

    // <Signature>
    let mut signature = Element::new("Signature");
    signature.set_namespace_declaration(namespaces::XMLDSIG, "dsig");
    signature.set_prefix("dsig");

    let signed_info = add_dsig_child(&mut signature, "SignedInfo");
    add_dsig_child(signed_info, "CanonicalizationMethod")
        .set_attribute("Algorithm", C14N_ALGORITHM);
    let signature_method = match standard {
        Standard::Interop => RSA_SHA1,
        Standard::Smpte => RSA_SHA256,
    };
    add_dsig_child(signed_info, "SignatureMethod").set_attribute("Algorithm", signature_method);

    let reference = add_dsig_child(signed_info, "Reference");
    reference.set_attribute("URI", "");
    let transforms = add_dsig_child(reference, "Transforms");
    add_dsig_child(transforms, "Transform").set_attribute("Algorithm", ENVELOPED_TRANSFORM);
    let digest_method = match standard {
        Standard::Interop => SHA1_DIGEST,
        Standard::Smpte => SHA256_DIGEST,
    };
    add_dsig_child(reference, "DigestMethod").set_attribute("Algorithm", digest_method);
    add_dsig_child(reference, "DigestValue");

    add_dsig_child(&mut signature, "SignatureValue");
    let key_info = add_dsig_child(&mut signature, "KeyInfo");

    // The whole certificate list is embedded, leaf first.
    for certificate in chain.leaf_to_root()? {
        let data = add_dsig_child(key_info, "X509Data");
        let serial = add_dsig_child(data, "X509IssuerSerial");
        add_dsig_text(serial, "X509IssuerName", certificate.issuer());
        add_dsig_text(serial, "X509SerialNumber", certificate.serial());
        add_dsig_text(data, "X509Certificate", &certificate.certificate(false));
    }

    root.add_child(signature);

    // Reference digest: the document without its Signature subtree.
    let document_digest = digest_without_signature(root, standard);
    let signature = root.child_mut("Signature").unwrap();
    set_text(
        signature
            .child_mut("SignedInfo")
            .unwrap()
            .child_mut("Reference")
            .unwrap()
            .child_mut("DigestValue")
            .unwrap(),
        &document_digest,
    );

    // Sign the canonicalized SignedInfo.
    let signed_info_bytes = canonical_signed_info(signature.child("SignedInfo").unwrap());
    let key = chain.private_key()?;
    let (padding, hashed) = match standard {
        Standard::Interop => (
            PaddingScheme::new_pkcs1v15_sign(Some(Hash::SHA1)),
            Sha1::digest(&signed_info_bytes).to_vec(),
        ),
        Standard::Smpte => (
            PaddingScheme::new_pkcs1v15_sign(Some(Hash::SHA2_256)),
            Sha256::digest(&signed_info_bytes).to_vec(),
        ),
    };
    let signature_value = key
        .sign(padding, &hashed)
        .map_err(|e| CryptoErrorKind::CouldNotSign(e.to_string()))?;
    set_text(
        signature.child_mut("SignatureValue").unwrap(),
        &base64::encode(signature_value),
    );

    Ok(())
}

/// Check the enveloped signature on `root`.
///
/// The reference digest is recomputed over the canonicalized document minus
/// the `Signature` subtree; the RSA signature over `SignedInfo` is verified
/// against `chain`'s leaf certificate if a chain is supplied, otherwise
/// against the first certificate embedded in `KeyInfo`.
pub fn verify_signature(root: &Element, chain: Option<&CertificateChain>) -> Result<()> {
    let signature = root
        .child("Signature")
        .ok_or_else(|| CryptoErrorKind::BadSignature("document is not signed".to_string()))?;
    let signed_info = signature
        .child("SignedInfo")
        .ok_or_else(|| CryptoErrorKind::BadSignature("no <SignedInfo>".to_string()))?;

    let signature_method = signed_info
        .child("SignatureMethod")
        .and_then(|e| e.attribute("Algorithm"))
        .unwrap_or("");
    let standard = match signature_method {
        RSA_SHA1 => Standard::Interop,
        RSA_SHA256 => Standard::Smpte,
        other => {
            return Err(CryptoErrorKind::BadSignature(format!(
                "unsupported signature method '{}'",
                other
            ))
            .into())
        }
    };

    let declared_digest = signed_info
        .child("Reference")
        .and_then(|r| r.optional_string_child("DigestValue"))
        .ok_or_else(|| CryptoErrorKind::BadSignature("no <DigestValue>".to_string()))?;
    let actual_digest = digest_without_signature(root, standard);
    if strip_whitespace(&declared_digest) != actual_digest {
        return Err(CryptoErrorKind::BadSignature("document digest mismatch".to_string()).into());
    }

    let signature_value = signature
        .optional_string_child("SignatureValue")
        .ok_or_else(|| CryptoErrorKind::BadSignature("no <SignatureValue>".to_string()))?;
    let signature_bytes = base64::decode(strip_whitespace(&signature_value))
        .map_err(|e| CryptoErrorKind::BadSignature(e.to_string()))?;

    let certificate = match chain {
        Some(chain) => chain.leaf()?.clone(),
        None => embedded_leaf(signature)?,
    };
    let public_key = RsaPublicKey::new(
        BigUint::from_bytes_be(certificate.modulus()),
        BigUint::from_bytes_be(certificate.exponent()),
    )
    .map_err(|e| CryptoErrorKind::BadSignature(e.to_string()))?;

    let signed_info_bytes = canonical_signed_info(signed_info);
    let (padding, hashed) = match standard {
        Standard::Interop => (
            PaddingScheme::new_pkcs1v15_sign(Some(Hash::SHA1)),
            Sha1::digest(&signed_info_bytes).to_vec(),
        ),
        Standard::Smpte => (
            PaddingScheme::new_pkcs1v15_sign(Some(Hash::SHA2_256)),
            Sha256::digest(&signed_info_bytes).to_vec(),
        ),
    };

    public_key
        .verify(padding, &hashed, &signature_bytes)
        .map_err(|e| CryptoErrorKind::BadSignature(e.to_string()).into())
}

/// The first certificate under `KeyInfo` is the leaf, since the chain is
/// embedded leaf-to-root.
fn embedded_leaf(signature: &Element) -> Result<Certificate> {
    let key_info = signature
        .child("KeyInfo")
        .ok_or_else(|| CryptoErrorKind::BadSignature("no <KeyInfo>".to_string()))?;
    let body = key_info
        .elements()
        .filter(|e| e.name() == "X509Data")
        .filter_map(|d| d.optional_string_child("X509Certificate"))
        .next()
        .ok_or_else(|| CryptoErrorKind::BadSignature("no embedded certificate".to_string()))?;
    let der = base64::decode(strip_whitespace(&body))
        .map_err(|e| CryptoErrorKind::BadSignature(e.to_string()))?;
    Certificate::from_der(der)
}

/// Canonical bytes of the document with the `Signature` subtree removed.
fn digest_without_signature(root: &Element, standard: Standard) -> String {
    let mut copy = root.clone();
    copy.take_child("Signature");
    let bytes = Document::new(copy).to_canonical_string();
    match standard {
        Standard::Interop => base64::encode(Sha1::digest(bytes.as_bytes())),
        Standard::Smpte => base64::encode(Sha256::digest(bytes.as_bytes())),
    }
}

/// Canonical bytes of a `SignedInfo` element, with the dsig namespace
/// declaration pulled into scope as canonicalization requires.
fn canonical_signed_info(signed_info: &Element) -> Vec<u8> {
    let mut copy = signed_info.clone();
    if copy.attribute("xmlns:dsig").is_none() {
        copy.set_namespace_declaration(namespaces::XMLDSIG, "dsig");
    }
    Document::new(copy).to_canonical_string().into_bytes()
}

fn add_dsig_child<'a>(parent: &'a mut Element, name: &str) -> &'a mut Element {
    let mut child = Element::new(name);
    child.set_prefix("dsig");
    parent.add_child(child)
}

fn add_dsig_text(parent: &mut Element, name: &str, text: &str) {
    add_dsig_child(parent, name).add_text(text);
}

fn set_text(element: &mut Element, text: &str) {
    element.add_text(text);
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_document_fails_verification() {
        let root = Element::with_namespace("CompositionPlaylist", namespaces::CPL_SMPTE);
        match verify_signature(&root, None) {
            Err(crate::Error::CryptoError(CryptoErrorKind::BadSignature(_))) => (),
            other => panic!("unexpected result {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn digest_ignores_signature_subtree() {
        let mut a = Element::with_namespace("CompositionPlaylist", namespaces::CPL_SMPTE);
        a.add_child_with_text("Id", "urn:uuid:x");
        let mut b = a.clone();
        b.add_child(Element::new("Signature"));
        assert_eq!(
            digest_without_signature(&a, Standard::Smpte),
            digest_without_signature(&b, Standard::Smpte)
        );
    }
}
