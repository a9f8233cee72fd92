//! AES-256-OFB keystream engine.
//!
//! The 9-octet message indicator sits left-aligned in a zero-filled
//! 16-octet initialization vector. Fifteen OFB blocks yield the 240-octet
//! voice keystream; the first 16 octets are the discard block, mirroring
//! the DES engine's structure at AES's block size.

use std::collections::HashMap;

use aes::Aes256;
use cipher::generic_array::GenericArray;
use cipher::{BlockEncrypt, KeyInit};

use crate::engine::{
    left_pad_key, xor_at, KeystreamEngine, CODEWORD_OCTETS, LDU2_KEYSTREAM_SKIP, POSITIONS,
};
use crate::error::CryptoError;
use crate::keys::CipherFamily;

/// Octets of AES-OFB keystream covering one superframe.
pub const KEYSTREAM_LEN: usize = 240;

/// Octets of initial keystream discarded before any voice.
const DISCARD: usize = 16;

/// AES-256-OFB voice keystream engine.
pub struct Aes256Ofb {
    keys: HashMap<u16, Vec<u8>>,
    keystream: [u8; KEYSTREAM_LEN],
    position: u8,
}

impl Aes256Ofb {
    /// Engine with no keys registered.
    #[must_use]
    pub fn new() -> Aes256Ofb {
        Aes256Ofb {
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
        let aes_key = left_pad_key::<32>(key);
        let cipher = Aes256::new(&aes_key.into());

        let mut iv = [0u8; 16];
        iv[..9].copy_from_slice(mi);

        for block in self.keystream.chunks_exact_mut(16) {
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

impl Default for Aes256Ofb {
    fn default() -> Self {
        Aes256Ofb::new()
    }
}

impl KeystreamEngine for Aes256Ofb {
    fn family(&self) -> CipherFamily {
        CipherFamily::Aes256
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keystream_matches_known_vectors() {
        let mut engine = Aes256Ofb::new();
        engine.add_key(0x20, (0u8..32).collect());

        let mi = [0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        engine.prepare(0x20, &mi).unwrap();

        assert_eq!(
            engine.keystream()[..16],
            hex::decode("58f556139e1d115a8f6a08e4b4a6228b").unwrap()[..]
        );
        assert_eq!(
            engine.keystream()[16..32],
            hex::decode("30b01904cfdc225ac68a839938afa134").unwrap()[..]
        );
        assert_eq!(
            engine.keystream()[224..],
            hex::decode("22a11094f2348c84c26e39157bd81d9e").unwrap()[..]
        );
    }

    #[test]
    fn first_codeword_xors_at_offset_27() {
        let mut engine = Aes256Ofb::new();
        engine.add_key(0x20, (0u8..32).collect());

        let mi = [0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        engine.prepare(0x20, &mi).unwrap();

        assert_eq!(engine.codeword_offset(false), 27);
        assert_eq!(engine.codeword_offset(true), 128);

        let mut cw = [0u8; CODEWORD_OCTETS];
        engine.decrypt_codeword(&mut cw, false);
        assert_eq!(cw[..], hex::decode("9938afa134d6f72cf96e7b").unwrap()[..]);
        assert_eq!(engine.position(), 1);
    }

    #[test]
    fn cursor_wraps_after_nine_codewords() {
        let mut engine = Aes256Ofb::new();
        engine.add_key(1, vec![0; 32]);
        engine.prepare(1, &[0; 9]).unwrap();

        for want in [1, 2, 3, 4, 5, 6, 7, 8, 0] {
            engine.decrypt_codeword(&mut [0; CODEWORD_OCTETS], false);
            assert_eq!(engine.position(), want);
        }
    }

    #[test]
    fn xor_is_an_involution() {
        let mut engine = Aes256Ofb::new();
        engine.add_key(1, (100u8..132).collect());

        let mi = [1, 1, 2, 3, 5, 8, 13, 21, 34];
        let plain: [u8; CODEWORD_OCTETS] = *b"payload-xyz";

        engine.prepare(1, &mi).unwrap();
        let mut cw = plain;
        engine.decrypt_codeword(&mut cw, false);
        assert_ne!(cw, plain);

        engine.prepare(1, &mi).unwrap();
        engine.decrypt_codeword(&mut cw, false);
        assert_eq!(cw, plain);
    }
}
