// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! X.509 certificates, certificate chains and chain generation.
//!
//! A DCP signer is an ordered chain of certificates (root, zero or more
//! intermediates, leaf) plus the RSA private key belonging to the leaf.
//! Chains arrive unordered from configuration files and `<KeyInfo>` blocks,
//! so ordering is inferred from issuer/subject relationships; validity
//! additionally requires every link's signature to verify.

mod asn1;
mod builder;
mod certificate;
mod chain;

pub use builder::{
    DEFAULT_INTERMEDIATE_COMMON_NAME, DEFAULT_LEAF_COMMON_NAME, DEFAULT_ROOT_COMMON_NAME,
};
pub use certificate::Certificate;
pub use chain::CertificateChain;
