//! Capture-file synthesis.
//!
//! Builds the byte-exact inverse of what the codec crate parses: framed
//! data units whose voice payloads carry FEC-encoded IMBE codewords at the
//! on-air positions, with encryption sync hexbits Hamming-encoded into the
//! link-signaling slots.

use std::fs;
use std::io;
use std::path::Path;

use trunkdec_codec::coding::hamming;
use trunkdec_codec::esw::{EncryptionSync, ES_BIT_POSITIONS, LDU_BITS};
use trunkdec_codec::voice::codeword_bit_position;
use trunkdec_codec::{bits, ImbeFrame};
use trunkdec_crypto::KeystreamEngine;

/// DUID octets used by the builder.
const DUID_HEADER: u8 = 0x00;
const DUID_TERMINATOR: u8 = 0x03;
const DUID_LDU1: u8 = 0x05;
const DUID_LDU2: u8 = 0x0A;

/// Nine in-range parameter sets with distinct values per slot.
#[must_use]
pub fn sample_params() -> [[u16; 8]; 9] {
    std::array::from_fn(|slot| {
        let s = slot as u16;
        [
            (0x123 + s * 0x111) & 0xFFF,
            (0xA50 ^ s * 0x0F3) & 0xFFF,
            (s * 0x17D + 7) & 0xFFF,
            (0xFFF - s * 0x101) & 0xFFF,
            (0x400 + s * 0x55) & 0x7FF,
            (0x2AA ^ s * 0x33) & 0x7FF,
            (s * 0xE9 + 1) & 0x7FF,
            (0x55 + s * 3) & 0x7F,
        ]
    })
}

/// Incremental capture-file builder.
pub struct CaptureBuilder {
    nac: u16,
    bytes: Vec<u8>,
}

impl CaptureBuilder {
    /// Builder for a capture with the given network access code.
    #[must_use]
    pub fn new(nac: u16) -> CaptureBuilder {
        CaptureBuilder {
            nac,
            bytes: Vec::new(),
        }
    }

    /// Append a raw frame with an arbitrary DUID and payload.
    pub fn push_raw(&mut self, duid: u8, payload: &[u8]) -> &mut Self {
        self.bytes.push(duid);
        self.bytes.extend_from_slice(&self.nac.to_be_bytes());
        self.bytes
            .extend_from_slice(&(payload.len() as u16).to_be_bytes());
        self.bytes.extend_from_slice(payload);
        self
    }

    /// Append an empty header data unit.
    pub fn header(&mut self) -> &mut Self {
        self.push_raw(DUID_HEADER, &[])
    }

    /// Append an empty terminator data unit.
    pub fn terminator(&mut self) -> &mut Self {
        self.push_raw(DUID_TERMINATOR, &[])
    }

    /// Append a clear LDU1 carrying the given parameter words.
    pub fn ldu1(&mut self, params: &[[u16; 8]; 9]) -> &mut Self {
        let payload = voice_payload(params, None, None);
        self.push_raw(DUID_LDU1, &payload)
    }

    /// Append an LDU1 whose parameter blocks are pre-encrypted with the
    /// given engine, continuing its cursor.
    pub fn ldu1_encrypted(
        &mut self,
        params: &[[u16; 8]; 9],
        engine: &mut dyn KeystreamEngine,
    ) -> &mut Self {
        let payload = voice_payload(params, None, Some((engine, false)));
        self.push_raw(DUID_LDU1, &payload)
    }

    /// Append an LDU2 carrying the given sync word, voice in the clear.
    pub fn ldu2(&mut self, params: &[[u16; 8]; 9], sync: &EncryptionSync) -> &mut Self {
        let payload = voice_payload(params, Some(sync), None);
        self.push_raw(DUID_LDU2, &payload)
    }

    /// Append an LDU2 carrying the given sync word, with voice encrypted
    /// the way the pipeline will decrypt it: the engine is prepared from
    /// the sync word, then applied slot by slot from cursor 0.
    pub fn ldu2_encrypted(
        &mut self,
        params: &[[u16; 8]; 9],
        sync: &EncryptionSync,
        engine: &mut dyn KeystreamEngine,
    ) -> &mut Self {
        engine
            .prepare(sync.key_id, &sync.mi)
            .expect("fixture key must be registered");
        let payload = voice_payload(params, Some(sync), Some((engine, true)));
        self.push_raw(DUID_LDU2, &payload)
    }

    /// The capture bytes.
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    /// Write the capture to a file.
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        fs::write(path, &self.bytes)
    }
}

/// Assemble a full 216-octet voice payload.
fn voice_payload(
    params: &[[u16; 8]; 9],
    sync: Option<&EncryptionSync>,
    cipher: Option<(&mut dyn KeystreamEngine, bool)>,
) -> Vec<u8> {
    let mut frame_bits = vec![0u8; LDU_BITS];
    let mut cipher = cipher;

    for (slot, u) in params.iter().enumerate() {
        let mut imbe = ImbeFrame {
            u: *u,
            e0: 0,
            et: 0,
            errors: 0,
        };

        if let Some((engine, is_ldu2)) = cipher.as_mut() {
            let mut packed = imbe.pack();
            engine.decrypt_codeword(&mut packed, *is_ldu2);
            imbe.unpack(&packed);
        }

        let cw = imbe.encode();
        for (k, &bit) in cw.0.iter().enumerate() {
            frame_bits[codeword_bit_position(slot, k)] = bit;
        }
    }

    if let Some(sync) = sync {
        embed_sync(&mut frame_bits, sync);
    }

    bits::pack(&frame_bits)
}

/// Hamming-encode the sync word's 24 hexbits into the link-signaling bit
/// positions, the inverse of the codec's extraction.
fn embed_sync(frame_bits: &mut [u8], sync: &EncryptionSync) {
    let mut hexbits = [0u8; 24];

    for group in 0..3 {
        let m = &sync.mi[group * 3..group * 3 + 3];
        hexbits[group * 4] = m[0] >> 2;
        hexbits[group * 4 + 1] = (m[0] & 0x03) << 4 | m[1] >> 4;
        hexbits[group * 4 + 2] = (m[1] & 0x0F) << 2 | m[2] >> 6;
        hexbits[group * 4 + 3] = m[2] & 0x3F;
    }

    hexbits[12] = sync.algorithm_id >> 2;
    hexbits[13] = (sync.algorithm_id & 0x03) << 4 | (sync.key_id >> 12) as u8;
    hexbits[14] = ((sync.key_id >> 6) & 0x3F) as u8;
    hexbits[15] = (sync.key_id & 0x3F) as u8;

    for (i, &hb) in hexbits.iter().enumerate() {
        let word = hamming::shortened::encode(hb);
        for (j, &pos) in ES_BIT_POSITIONS[i * 10..i * 10 + 10].iter().enumerate() {
            frame_bits[pos] = ((word >> (9 - j)) & 1) as u8;
        }
    }
}
