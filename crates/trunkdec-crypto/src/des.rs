//! DES-OFB keystream engine.
//!
//! The message indicator's first 8 octets form the initialization vector.
//! Running DES in output feedback mode (encrypt the IV, emit the block,
//! feed it back) 28 times yields the 224-octet voice keystream. The first
//! 8 octets are a discard block; voice starts 11 octets further in.

use std::collections::HashMap;

use cipher::generic_array::GenericArray;
use cipher::{BlockEncrypt, KeyInit};
use des::Des;

use crate::engine::{
    left_pad_key, xor_at, KeystreamEngine, CODEWORD_OCTETS, LDU2_KEYSTREAM_SKIP, POSITIONS,
};
use crate::error::CryptoError;
use crate::keys::CipherFamily;

/// Octets of DES-OFB keystream covering one superframe.
pub const KEYSTREAM_LEN: usize = 224;

/// Octets of initial keystream discarded before any voice.
const DISCARD: usize = 8;

/// DES-OFB voice keystream engine.
pub struct DesOfb {
    keys: HashMap<u16, Vec<u8>>,
    keystream: [u8; KEYSTREAM_LEN],
    position: u8,
}

impl DesOfb {
    /// Engine with no keys registered.
    #[must_use]
    pub fn new() -> DesOfb {
        DesOfb {
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
        let des_key = left_pad_key::<8>(key);
        let cipher = Des::new(&des_key.into());

        let mut iv = [0u8; 8];
        iv.copy_from_slice(&mi[..8]);

        for block in self.keystream.chunks_exact_mut(8) {
            let mut buf = GenericArray::from(iv);
            cipher.encrypt_block(&mut buf);
            iv.copy_from_slice(&buf);
            block.copy_from_slice(&buf);
        }
    }

    fn codeword_offset(&self, is_ldu2: bool) -> usize {
        let p = usize::from(self.position);
        let ldu2 = if is_ldu2 { LDU2_KEYSTREAM_SKIP } else { 0 };

        DISCARD + ldu2 + p * 11 + 11 + if p < 8 { 0 } else { 2 }
    }
}

impl Default for DesOfb {
    fn default() -> Self {
        DesOfb::new()
    }
}

impl KeystreamEngine for DesOfb {
    fn family(&self) -> CipherFamily {
        CipherFamily::Des
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
