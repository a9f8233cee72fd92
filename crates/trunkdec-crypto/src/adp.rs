//! ADP (RC4) keystream engine.
//!
//! ADP keys RC4 with 13 octets: the 5-octet key followed by the first 8
//! octets of the message indicator. The key schedule is standard RC4 with
//! that nonstandard input length, and no initial keystream is discarded;
//! the PRGA runs for exactly 469 octets. Voice starts 267 octets in.

use std::collections::HashMap;

use crate::engine::{
    left_pad_key, xor_at, KeystreamEngine, CODEWORD_OCTETS, LDU2_KEYSTREAM_SKIP, POSITIONS,
};
use crate::error::CryptoError;
use crate::keys::CipherFamily;

/// Octets of ADP keystream covering one superframe.
pub const KEYSTREAM_LEN: usize = 469;

/// Keystream octets preceding the first voice codeword.
const VOICE_BASE: usize = 267;

/// Octets of RC4 key input: key material plus MI prefix.
const RC4_KEY_LEN: usize = 13;

/// ADP / RC4 voice keystream engine.
pub struct AdpRc4 {
    keys: HashMap<u16, Vec<u8>>,
    keystream: [u8; KEYSTREAM_LEN],
    position: u8,
}

impl AdpRc4 {
    /// Engine with no keys registered.
    #[must_use]
    pub fn new() -> AdpRc4 {
        AdpRc4 {
            keys: HashMap::new(),
            keystream: [0; KEYSTREAM_LEN],
            position: 0,
        }
    }

    /// The prepared keystream buffer.
    #[must_use]
    pub fn keystream(&self) -> &[u8; KEYSTREAM_LEN] {
        &self.keystream
    }

    fn generate(&mut self, key: &[u8], mi: &[u8; 9]) {
        let mut rc4_key = [0u8; RC4_KEY_LEN];
        rc4_key[..5].copy_from_slice(&left_pad_key::<5>(key));
        rc4_key[5..].copy_from_slice(&mi[..8]);

        let mut s: [u8; 256] = std::array::from_fn(|i| i as u8);

        // Key-scheduling algorithm over the repeated 13-octet key.
        let mut j = 0u8;
        for i in 0..256 {
            j = j
                .wrapping_add(s[i])
                .wrapping_add(rc4_key[i % RC4_KEY_LEN]);
            s.swap(i, usize::from(j));
        }

        // Pseudo-random generation, no discard.
        let mut i = 0u8;
        let mut j = 0u8;
        for out in self.keystream.iter_mut() {
            i = i.wrapping_add(1);
            j = j.wrapping_add(s[usize::from(i)]);
            s.swap(usize::from(i), usize::from(j));
            *out = s[usize::from(s[usize::from(i)].wrapping_add(s[usize::from(j)]))];
        }
    }

    fn codeword_offset(&self, is_ldu2: bool) -> usize {
        let p = usize::from(self.position);
        let ldu2 = if is_ldu2 { LDU2_KEYSTREAM_SKIP } else { 0 };

        ldu2 + p * 11 + VOICE_BASE + if p < 8 { 0 } else { 2 }
    }
}

impl Default for AdpRc4 {
    fn default() -> Self {
        AdpRc4::new()
    }
}

impl KeystreamEngine for AdpRc4 {
    fn family(&self) -> CipherFamily {
        CipherFamily::Adp
    }

    fn add_key(&mut self, key_id: u16, key: Vec<u8>) {
        self.keys.insert(key_id, key);
    }

    fn has_key(&self, key_id: u16) -> bool {
        self.keys.contains_key(&key_id)
    }

    fn prepare(&mut self, key_id: u16, mi: &[u8; 9]) -> Result<(), CryptoError> {
        let key = self
            .keys
            .get(&key_id)
            .cloned()
            .ok_or(CryptoError::UnknownKey { key_id })?;

        self.position = 0;
        self.generate(&key, mi);
        Ok(())
    }

    fn decrypt_codeword(&mut self, codeword: &mut [u8; CODEWORD_OCTETS], is_ldu2: bool) {
        let offset = self.codeword_offset(is_ldu2);
        xor_at(&self.keystream, offset, codeword);
        self.position = (self.position + 1) % POSITIONS;
    }

    fn position(&self) -> u8 {
        self.position
    }
}
