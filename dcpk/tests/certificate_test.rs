// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! Certificate chain generation, ordering and signing.

use dcpk::crypto::CertificateChain;
use dcpk::sign::{sign, verify_signature};
use dcpk::xml::{namespaces, Document, Element};
use dcpk::Standard;

fn generated_chain() -> CertificateChain {
    CertificateChain::new_self_signed(
        "example.org",
        "example.org",
        ".smpte-430-2.ROOT.NOT_FOR_PRODUCTION",
        ".smpte-430-2.INTERMEDIATE.NOT_FOR_PRODUCTION",
        "CS.smpte-430-2.LEAF.NOT_FOR_PRODUCTION",
    )
    .unwrap()
}

#[test]
fn generated_chain_is_valid() {
    let chain = generated_chain();
    assert!(chain.valid(None));
    assert!(chain.private_key_valid().unwrap());

    let ordered = chain.root_to_leaf().unwrap();
    assert_eq!(ordered.len(), 3);
    // Root is self-signed; each link's issuer is its parent's subject.
    assert_eq!(ordered[0].issuer(), ordered[0].subject());
    assert_eq!(ordered[1].issuer(), ordered[0].subject());
    assert_eq!(ordered[2].issuer(), ordered[1].subject());
    assert_ne!(ordered[1].subject(), ordered[0].subject());
    // Serial numbers 5/6/7 from root to leaf.
    assert_eq!(ordered[0].serial(), "5");
    assert_eq!(ordered[1].serial(), "6");
    assert_eq!(ordered[2].serial(), "7");
}

#[test]
fn ordering_is_inferred_from_an_arbitrary_permutation() {
    let chain = generated_chain();
    let ordered: Vec<_> = chain.root_to_leaf().unwrap().into_iter().cloned().collect();

    let mut shuffled = CertificateChain::new();
    shuffled.add(ordered[2].clone());
    shuffled.add(ordered[0].clone());
    shuffled.add(ordered[1].clone());
    let reordered = shuffled.root_to_leaf().unwrap();
    assert_eq!(reordered[0], &ordered[0]);
    assert_eq!(reordered[1], &ordered[1]);
    assert_eq!(reordered[2], &ordered[2]);
}

#[test]
fn removing_the_intermediate_breaks_the_chain() {
    let mut chain = generated_chain();
    chain.remove_nth(1).unwrap();
    let mut reason = String::new();
    assert!(!chain.valid(Some(&mut reason)));
    assert_eq!(reason, "certificates do not form a chain");
}

#[test]
fn chain_round_trips_through_pem_text() {
    let chain = generated_chain();
    let text = chain.chain().unwrap();
    let mut again = CertificateChain::from_string(&text).unwrap();
    again.set_key(chain.key().unwrap().to_string());
    assert!(again.valid(None));
    assert_eq!(
        again.leaf().unwrap().subject(),
        chain.leaf().unwrap().subject()
    );
}

fn simple_cpl_root(signed: bool) -> Element {
    let mut root = Element::with_namespace("CompositionPlaylist", namespaces::CPL_SMPTE);
    if signed {
        root.set_namespace_declaration(namespaces::XMLDSIG, "dsig");
    }
    root.add_child_with_text("Id", "urn:uuid:81fb54df-e1bf-4647-8788-ea7ba154375b");
    root.add_child_with_text("ContentTitleText", "A Test DCP");
    root
}

#[test]
fn signing_then_verifying_succeeds() {
    let chain = generated_chain();
    let mut root = simple_cpl_root(true);
    sign(&mut root, Standard::Smpte, &chain).unwrap();

    // The chain is embedded under KeyInfo, so verification works both with
    // and without the original chain.
    verify_signature(&root, Some(&chain)).unwrap();
    verify_signature(&root, None).unwrap();
}

#[test]
fn signature_survives_serialization_and_reparse() {
    let chain = generated_chain();
    let mut root = simple_cpl_root(true);
    sign(&mut root, Standard::Smpte, &chain).unwrap();

    let text = Document::new(root).to_canonical_string();
    let again = Document::parse_str(&text).unwrap();
    verify_signature(&again.root, None).unwrap();
}

#[test]
fn modifying_a_signed_document_invalidates_the_signature() {
    let chain = generated_chain();
    let mut root = simple_cpl_root(true);
    sign(&mut root, Standard::Smpte, &chain).unwrap();
    let text = Document::new(root).to_canonical_string();

    // Flip one byte of the content title.
    let tampered = text.replace("A Test DCP", "A Best DCP");
    assert_ne!(text, tampered);
    let document = Document::parse_str(&tampered).unwrap();
    assert!(verify_signature(&document.root, None).is_err());
}

#[test]
fn interop_signatures_use_sha1_and_smpte_sha256() {
    let chain = generated_chain();

    let mut interop = simple_cpl_root(true);
    sign(&mut interop, Standard::Interop, &chain).unwrap();
    let method = signature_method(&interop);
    assert_eq!(method, "http://www.w3.org/2000/09/xmldsig#rsa-sha1");
    verify_signature(&interop, None).unwrap();

    let mut smpte = simple_cpl_root(true);
    sign(&mut smpte, Standard::Smpte, &chain).unwrap();
    let method = signature_method(&smpte);
    assert_eq!(method, "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256");
}

fn signature_method(root: &Element) -> String {
    root.child("Signature")
        .unwrap()
        .child("SignedInfo")
        .unwrap()
        .child("SignatureMethod")
        .unwrap()
        .attribute("Algorithm")
        .unwrap()
        .to_string()
}

#[test]
fn signer_element_carries_the_leaf_identity() {
    let chain = generated_chain();
    let mut root = simple_cpl_root(true);
    sign(&mut root, Standard::Smpte, &chain).unwrap();

    let signer = root.child("Signer").unwrap();
    let data = signer.child("X509Data").unwrap();
    let leaf = chain.leaf().unwrap();
    assert_eq!(
        data.child("X509IssuerSerial")
            .unwrap()
            .string_child("X509SerialNumber")
            .unwrap(),
        leaf.serial()
    );
    assert_eq!(data.string_child("X509SubjectName").unwrap(), leaf.subject());

    // All three certificates are embedded leaf-to-root in KeyInfo.
    let key_info = root.child("Signature").unwrap().child("KeyInfo").unwrap();
    let embedded: Vec<_> = key_info
        .elements()
        .filter(|e| e.name() == "X509Data")
        .collect();
    assert_eq!(embedded.len(), 3);
}
