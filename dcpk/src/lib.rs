// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! The dcpk crate contains the functionality required to read, write and verify
//! Digital Cinema Packages (DCPs): the on-disk bundle of XML manifests and MXF
//! essence containers used to distribute motion pictures to theatres.
//!
//! Two dialects of the format exist in the wild: the early "Interop" documents
//! and the later SMPTE family. Both are read transparently, either can be
//! written, and a package that mixes the two is reported by the verifier.
//!
//! The main entry points are:
//!
//! - [`Package`](package::Package), the in-memory model of one DCP directory,
//!   with [`read`](package::Package::read) and
//!   [`write_xml`](package::Package::write_xml).
//! - [`verify`](verify::verify), which checks one or more package directories
//!   against the SMPTE Bv2.1 application profile and returns a list of
//!   [`VerificationNote`](verify::VerificationNote)s.
//! - [`CertificateChain`](crypto::CertificateChain), which holds the X.509
//!   chain and RSA private key used to sign CPLs and PKLs.
//!
//! The MXF/JPEG2000/PCM codec layer is deliberately not part of this crate.
//! It is reached through the traits in [`essence`], so that a codec backend
//! (or a test stub) can be plugged in by the caller.

pub mod asset;
pub mod config;
pub mod cpl;
pub mod crypto;
pub mod equality;
pub mod error;
pub mod essence;
pub mod kdm;
pub mod package;
pub mod pkl;
pub mod reel;
pub mod sign;
pub mod types;
pub mod util;
pub mod verify;
pub mod xml;

pub use config::Config;
pub use crypto::CertificateChain;
pub use error::{Error, Result};
pub use package::Package;
pub use types::Standard;
