//! The keystream engine interface shared by all three ciphers.

use crate::error::CryptoError;
use crate::keys::CipherFamily;

/// Octets in a packed IMBE codeword, the unit of voice encryption.
pub const CODEWORD_OCTETS: usize = 11;

/// Extra keystream consumed before an LDU2's codewords.
///
/// The keystream covers a full superframe; LDU1's nine codewords and the
/// interleaved signaling account for 101 octets before LDU2's voice starts.
pub const LDU2_KEYSTREAM_SKIP: usize = 101;

/// Voice codeword slots per data unit; the position cursor counts modulo
/// this.
pub const POSITIONS: u8 = 9;

/// A prepared voice keystream.
///
/// `prepare` derives the full keystream buffer from a registered key and
/// the message indicator and resets the position cursor. Each
/// `decrypt_codeword` XORs one packed codeword at the cipher's offset and
/// advances the cursor modulo 9. Engines are single-call stateful: one
/// engine instance serves one decoder.
pub trait KeystreamEngine {
    /// The family this engine implements.
    fn family(&self) -> CipherFamily;

    /// Register key material under a key ID.
    fn add_key(&mut self, key_id: u16, key: Vec<u8>);

    /// Whether a key ID is registered.
    fn has_key(&self, key_id: u16) -> bool;

    /// Derive the keystream for a key and message indicator, resetting the
    /// position cursor to 0.
    fn prepare(&mut self, key_id: u16, mi: &[u8; 9]) -> Result<(), CryptoError>;

    /// XOR one packed codeword against the keystream and advance the
    /// cursor.
    fn decrypt_codeword(&mut self, codeword: &mut [u8; CODEWORD_OCTETS], is_ldu2: bool);

    /// Current position cursor, always in `0..9`.
    fn position(&self) -> u8;
}

/// XOR a codeword against `keystream[offset..]`, stopping at the buffer
/// end. Truncation is deliberate: a damaged sync word must not panic the
/// pipeline.
pub(crate) fn xor_at(keystream: &[u8], offset: usize, codeword: &mut [u8; CODEWORD_OCTETS]) {
    for (j, byte) in codeword.iter_mut().enumerate() {
        if let Some(&k) = keystream.get(offset + j) {
            *byte ^= k;
        }
    }
}

/// Left-pad key material into a fixed-size cipher key, matching how short
/// hex keys are conventionally written.
pub(crate) fn left_pad_key<const N: usize>(key: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    let take = key.len().min(N);
    out[N - take..].copy_from_slice(&key[key.len() - take..]);
    out
}
