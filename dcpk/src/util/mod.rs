// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! Identifier and digest utilities.
//!
//! Everything in a DCP is bound together by two primitives: random UUIDs for
//! identity and base64-encoded SHA-1 digests for integrity. The digest of an
//! essence file is computed by streaming it in 64 KiB chunks so that
//! multi-gigabyte picture containers do not need to fit in memory, and the
//! caller can watch (and cancel) progress.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use picky_asn1::wrapper::IntegerAsn1;
use picky_asn1_x509::subject_public_key_info::SubjectPublicKeyInfo;
use rsa::{PublicKeyParts, RsaPrivateKey};
use sha1::{Digest, Sha1};
use uuid::Uuid;

use crate::error::{CryptoErrorKind, Error, Result};

/// The default read buffer for digesting, in bytes.
pub const DIGEST_BUFFER_SIZE: usize = 65536;

/// A progress callback: receives a fraction in [0, 1] and returns `true` to
/// keep going or `false` to cancel the operation.
pub type Progress<'a> = &'a mut dyn FnMut(f32) -> bool;

/// Create a fresh UUID, rendered as lower-case hyphenated hex without the
/// `urn:uuid:` prefix.
pub fn make_uuid() -> String {
    Uuid::new_v4().to_string()
}

/// Compute the base64-encoded SHA-1 digest of a file, as carried in PKL
/// `<Hash>` entries.
///
/// `progress`, if given, is called with a fraction in [0, 1] at least once
/// per buffer read; returning `false` from it abandons the digest with
/// [`Error::Cancelled`].
pub fn make_digest<P: AsRef<Path>>(path: P, progress: Option<Progress>) -> Result<String> {
    make_digest_with(path, DIGEST_BUFFER_SIZE, progress)
}

/// As [`make_digest`], with an explicit buffer size.
pub fn make_digest_with<P: AsRef<Path>>(
    path: P,
    buffer_size: usize,
    mut progress: Option<Progress>,
) -> Result<String> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|e| Error::file(path, e))?;
    let size = file
        .metadata()
        .map_err(|e| Error::file(path, e))?
        .len();

    let mut sha = Sha1::new();
    let mut buffer = vec![0_u8; buffer_size];
    let mut done: u64 = 0;

    loop {
        let read = file.read(&mut buffer).map_err(|e| Error::file(path, e))?;
        if read == 0 {
            break;
        }
        sha.update(&buffer[..read]);
        done += read as u64;
        if let Some(cb) = progress.as_mut() {
            if !cb(if size == 0 { 1.0 } else { done as f32 / size as f32 }) {
                return Err(Error::Cancelled);
            }
        }
    }

    Ok(base64::encode(sha.finalize()))
}

/// Compute the base64-encoded SHA-1 digest of an in-memory buffer.
pub fn make_digest_of_data(data: &[u8]) -> String {
    let mut sha = Sha1::new();
    sha.update(data);
    base64::encode(sha.finalize())
}

/// Are two identifiers equal, ignoring case and surrounding whitespace?
pub fn ids_equal(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Read a whole file into a string, with a sanity limit on its size.
pub fn file_to_string<P: AsRef<Path>>(path: P, max_length: u64) -> Result<String> {
    let path = path.as_ref();
    let len = std::fs::metadata(path)
        .map_err(|e| Error::file(path, e))?
        .len();
    if len > max_length {
        return Err(Error::file(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidData, "unexpectedly long file"),
        ));
    }
    std::fs::read_to_string(path).map_err(|e| Error::file(path, e))
}

/// Compute the SHA-1 fingerprint of an RSA private key in PEM form: the
/// BEGIN/END armour is stripped, the base64 body decoded, and the raw DER
/// digested.
pub fn private_key_fingerprint(key: &str) -> Result<String> {
    let body: String = key
        .lines()
        .filter(|l| !l.starts_with("-----BEGIN") && !l.starts_with("-----END"))
        .collect();
    let der = base64::decode(body.trim())
        .map_err(|e| CryptoErrorKind::BadKey(e.to_string()))?;
    Ok(make_digest_of_data(&der))
}

/// Compute the `dnQualifier` digest of the public key belonging to an RSA
/// private key.
///
/// The DER SubjectPublicKeyInfo of the public key is built, its first 24
/// bytes (the SPKI header preceding the RSA key material on 2048-bit keys)
/// are skipped, and the rest is SHA-1 digested and base64 encoded. `/`
/// characters are escaped to suit the subject-name form that DCP
/// certificates carry.
pub fn public_key_digest(private_key: &RsaPrivateKey) -> Result<String> {
    let public = private_key.to_public_key();
    let spki = SubjectPublicKeyInfo::new_rsa_key(
        IntegerAsn1::from_bytes_be_unsigned(public.n().to_bytes_be()),
        IntegerAsn1::from_bytes_be_unsigned(public.e().to_bytes_be()),
    );
    let der = picky_asn1_der::to_vec(&spki)
        .map_err(|e| CryptoErrorKind::BadKey(e.to_string()))?;

    // The fixed skip only holds for the SPKI header of 2048-bit RSA keys,
    // which is the only key type the chain builder produces.
    if der.len() <= 24 {
        return Err(CryptoErrorKind::BadKey("public key SPKI too short".to_string()).into());
    }

    let digest = make_digest_of_data(&der[24..]);
    if cfg!(windows) {
        Ok(digest.replace('/', "\\/"))
    } else {
        Ok(digest.replace('/', "\\\\/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn uuid_is_bare_lowercase_hex() {
        let u = make_uuid();
        assert_eq!(u.len(), 36);
        assert!(!u.starts_with("urn:"));
        assert_eq!(u, u.to_lowercase());
    }

    #[test]
    fn digest_is_stable() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"Digital Cinema Package").unwrap();
        let a = make_digest(f.path(), None).unwrap();
        let b = make_digest(f.path(), None).unwrap();
        assert_eq!(a, b);
        assert!(!a.contains('\n'));
        // SHA-1 in base64 is 28 characters including padding.
        assert_eq!(a.len(), 28);
    }

    #[test]
    fn digest_matches_in_memory_form() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"some essence bytes").unwrap();
        assert_eq!(
            make_digest(f.path(), None).unwrap(),
            make_digest_of_data(b"some essence bytes")
        );
    }

    #[test]
    fn digest_can_be_cancelled() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(&vec![0_u8; 256 * 1024]).unwrap();
        let mut stop = |_: f32| false;
        match make_digest(f.path(), Some(&mut stop)) {
            Err(Error::Cancelled) => (),
            other => panic!("expected cancellation, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn ids_equal_ignores_case_and_space() {
        assert!(ids_equal(" ABC-def ", "abc-DEF"));
        assert!(!ids_equal("abc", "abd"));
    }
}
