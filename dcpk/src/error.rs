// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! Error definitions and protocols for everything that can go wrong while
//! reading, writing, signing or verifying a package.
//!
//! The taxonomy distinguishes structural problems (the package cannot be
//! interpreted at all), I/O and codec refusals, XML well-formedness failures,
//! and violated crypto invariants. Conformance findings are deliberately not
//! errors: they are collected as [`crate::verify::VerificationNote`]s and
//! never thrown.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error for the dcpk crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Error emanating from standard I/O, without a more specific context.
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// An I/O failure while operating on a known file.
    #[error("{}: {source}", path.display())]
    FileError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Structural problems that prevent a package from being interpreted.
    #[error(transparent)]
    ReadError(#[from] ReadErrorKind),

    /// XML well-formedness or dialect failure during load.
    #[error(transparent)]
    XmlError(#[from] XmlError),

    /// The essence codec refused a container file.
    #[error("MXF error in {}: {message}", path.display())]
    MxfFileError { path: PathBuf, message: String },

    /// A crypto invariant was violated.
    #[error(transparent)]
    CryptoError(#[from] CryptoErrorKind),

    /// An invalid argument was passed to a setter.
    #[error("bad value for {0}")]
    BadSetting(&'static str),

    /// A caller-supplied progress callback asked for the operation to stop.
    #[error("the operation was cancelled")]
    Cancelled,
}

/// Structural errors: the package (or one of its manifests) cannot be
/// interpreted, so the operation fails rather than producing a partial model.
#[derive(Error, Debug)]
pub enum ReadErrorKind {
    /// Neither ASSETMAP nor ASSETMAP.xml was found in the package directory.
    #[error("could not find ASSETMAP nor ASSETMAP.xml in '{}'", .0.display())]
    MissingAssetMap(PathBuf),

    /// A top-level document carries a namespace from neither dialect.
    #[error("unrecognised namespace '{0}'")]
    UnrecognizedNamespace(String),

    /// A PKL `Type` string matched no known asset kind.
    #[error("unknown asset type '{0}' in PKL")]
    UnknownPklType(String),

    /// The asset map mentioned no packing list at all.
    #[error("no packing lists found in asset map")]
    NoPackingList,

    /// An asset map `ChunkList` had other than exactly one chunk.
    #[error("unsupported asset chunk count")]
    UnsupportedChunkCount,

    /// Some other condition that prevents the read from proceeding.
    #[error("{0}")]
    Other(String),
}

/// An XML parse or structure failure, with the position when it is known.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct XmlError {
    pub message: String,
    pub file: Option<PathBuf>,
    pub line: Option<u64>,
}

impl XmlError {
    pub fn new<S: Into<String>>(message: S) -> XmlError {
        XmlError {
            message: message.into(),
            file: None,
            line: None,
        }
    }

    pub fn in_file<S: Into<String>, P: Into<PathBuf>>(message: S, file: P, line: Option<u64>) -> XmlError {
        XmlError {
            message: message.into(),
            file: Some(file.into()),
            line,
        }
    }
}

/// Violated invariants in the certificate chain or signing machinery.
#[derive(Error, Debug)]
pub enum CryptoErrorKind {
    /// The certificates cannot be put into root-to-leaf order.
    #[error("certificate chain is not consistent")]
    NotAChain,

    /// The private key does not match the leaf certificate.
    #[error("private key does not exist, or does not match leaf certificate")]
    KeyMismatch,

    /// The signing operation itself failed.
    #[error("could not sign ({0})")]
    CouldNotSign(String),

    /// A certificate could not be parsed.
    #[error("could not read certificate: {0}")]
    BadCertificate(String),

    /// A private key could not be parsed.
    #[error("could not read private key: {0}")]
    BadKey(String),

    /// A signature did not verify.
    #[error("signature verification failed: {0}")]
    BadSignature(String),
}

/// Convenient result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wrap an I/O error with the file it occurred on.
    pub fn file<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Error {
        Error::FileError {
            path: path.into(),
            source,
        }
    }

    /// Build an MXF error for the given container file.
    pub fn mxf<P: Into<PathBuf>, S: Into<String>>(path: P, message: S) -> Error {
        Error::MxfFileError {
            path: path.into(),
            message: message.into(),
        }
    }
}
