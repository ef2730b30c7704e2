// Copyright 2026 Contributors to the Cinema Packaging project.
// SPDX-License-Identifier: MIT

//! Decrypted KDM content.
//!
//! KDM parsing and decryption happen outside this crate; what arrives here
//! is the decrypted result: symmetric content keys, each bound to a CPL and
//! to the key id that encrypted assets carry. Adding a KDM to a package
//! routes each key to the matching asset. Applying the same KDM twice is
//! idempotent.

use crate::types::Id;

/// One decrypted content key.
#[derive(Clone, Debug, PartialEq)]
pub struct DecryptedKdmKey {
    /// The CPL this key belongs to.
    pub cpl_id: Id,
    /// The key id that matching encrypted assets reference.
    pub key_id: Id,
    /// The 128-bit content key.
    pub key: Vec<u8>,
}

/// A decrypted KDM: a set of content keys for one CPL.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecryptedKdm {
    keys: Vec<DecryptedKdmKey>,
}

impl DecryptedKdm {
    pub fn new(keys: Vec<DecryptedKdmKey>) -> DecryptedKdm {
        DecryptedKdm { keys }
    }

    pub fn add_key(&mut self, key: DecryptedKdmKey) {
        self.keys.push(key);
    }

    pub fn keys(&self) -> &[DecryptedKdmKey] {
        &self.keys
    }
}
