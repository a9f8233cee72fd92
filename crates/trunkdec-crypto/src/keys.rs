//! Key registry shared by the service and CLI.
//!
//! Key material is opaque bytes; its length selects the cipher family on
//! insertion. The table is populated before workers start and read-only
//! afterwards; each decoder copies the keys it needs into its own engines.

use std::collections::HashMap;

use crate::error::CryptoError;

/// The cipher family a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherFamily {
    /// ADP / RC4 (5-octet keys).
    Adp,
    /// DES-OFB (8-octet keys).
    Des,
    /// AES-256-OFB (32-octet keys).
    Aes256,
}

impl CipherFamily {
    /// Select a family from key material length.
    #[must_use]
    pub fn from_key_len(len: usize) -> Option<CipherFamily> {
        match len {
            5 => Some(CipherFamily::Adp),
            8 => Some(CipherFamily::Des),
            32 => Some(CipherFamily::Aes256),
            _ => None,
        }
    }

    /// Short name used in logs and the CLI.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            CipherFamily::Adp => "ADP/RC4",
            CipherFamily::Des => "DES-OFB",
            CipherFamily::Aes256 => "AES-256",
        }
    }
}

/// Three independent key-ID to key-material mappings, one per family.
#[derive(Debug, Default, Clone)]
pub struct KeyTable {
    families: HashMap<CipherFamily, HashMap<u16, Vec<u8>>>,
}

impl KeyTable {
    /// Empty table.
    #[must_use]
    pub fn new() -> KeyTable {
        KeyTable::default()
    }

    /// Register key material; the length selects the family.
    pub fn add_key(&mut self, key_id: u16, key: Vec<u8>) -> Result<CipherFamily, CryptoError> {
        let family = CipherFamily::from_key_len(key.len())
            .ok_or(CryptoError::InvalidKeyLength { len: key.len() })?;

        self.families.entry(family).or_default().insert(key_id, key);
        Ok(family)
    }

    /// Whether a key is registered for a family.
    #[must_use]
    pub fn has_key(&self, family: CipherFamily, key_id: u16) -> bool {
        self.families
            .get(&family)
            .is_some_and(|keys| keys.contains_key(&key_id))
    }

    /// All keys registered for a family.
    pub fn keys_for(&self, family: CipherFamily) -> impl Iterator<Item = (u16, &[u8])> {
        self.families
            .get(&family)
            .into_iter()
            .flatten()
            .map(|(&id, key)| (id, key.as_slice()))
    }

    /// Total number of registered keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.families.values().map(HashMap::len).sum()
    }

    /// Whether any key is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
