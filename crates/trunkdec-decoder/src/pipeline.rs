//! The capture-to-PCM state machine.
//!
//! Frames are processed strictly in file order. Every LDU2 refreshes the
//! cipher state from its encryption sync word (the message indicator
//! normally changes each superframe); the selected engine then decrypts
//! the packed parameter words of every following voice codeword until the
//! next sync arrives. Voice always reaches the vocoder: unknown keys and
//! unknown algorithms degrade to unintelligible audio, never to an abort.

use std::path::Path;
use std::time::Instant;

use tracing::{debug, warn};

use trunkdec_audio::metadata::CallMetadata;
use trunkdec_audio::wav::WavWriter;
use trunkdec_codec::voice::{self, CODEWORDS_PER_FRAME};
use trunkdec_codec::{
    bits, CodecError, CryptoAlgorithm, Frame, FrameReader, ImbeFrame, Vocoder,
    SAMPLES_PER_CODEWORD, SAMPLE_RATE,
};
use trunkdec_crypto::{
    AdpRc4, Aes256Ofb, CipherFamily, CryptoError, DesOfb, KeyTable, KeystreamEngine,
};

use crate::error::DecodeError;

/// Result of decoding one capture.
#[derive(Debug, Clone)]
pub struct CallSummary {
    /// Counters and identity for the metadata sidecar.
    pub metadata: CallMetadata,
    /// PCM samples synthesized.
    pub samples: u64,
    /// Whether the capture ended in a truncated payload.
    pub truncated: bool,
    /// Whether an encrypted stream named a key this decoder does not hold.
    pub unknown_key: bool,
}

/// One capture's worth of decode state plus the long-lived vocoder and
/// cipher engines.
pub struct Decoder {
    vocoder: Box<dyn Vocoder>,
    des: DesOfb,
    aes: Aes256Ofb,
    adp: AdpRc4,
}

impl Decoder {
    /// Decoder around a synthesis backend, with no keys loaded.
    #[must_use]
    pub fn new(vocoder: Box<dyn Vocoder>) -> Decoder {
        Decoder {
            vocoder,
            des: DesOfb::new(),
            aes: Aes256Ofb::new(),
            adp: AdpRc4::new(),
        }
    }

    /// Register one key; the length selects the cipher family.
    pub fn add_key(&mut self, key_id: u16, key: Vec<u8>) -> Result<CipherFamily, CryptoError> {
        let family = CipherFamily::from_key_len(key.len())
            .ok_or(CryptoError::InvalidKeyLength { len: key.len() })?;

        self.engine_mut(family).add_key(key_id, key);
        Ok(family)
    }

    /// Copy every key from a shared table into this decoder's engines.
    pub fn load_keys(&mut self, table: &KeyTable) {
        for family in [CipherFamily::Adp, CipherFamily::Des, CipherFamily::Aes256] {
            let keys: Vec<(u16, Vec<u8>)> = table
                .keys_for(family)
                .map(|(id, key)| (id, key.to_vec()))
                .collect();
            for (id, key) in keys {
                self.engine_mut(family).add_key(id, key);
            }
        }
    }

    fn engine_mut(&mut self, family: CipherFamily) -> &mut dyn KeystreamEngine {
        match family {
            CipherFamily::Des => &mut self.des,
            CipherFamily::Aes256 => &mut self.aes,
            CipherFamily::Adp => &mut self.adp,
        }
    }

    /// Decode a capture, optionally writing a WAV artifact.
    ///
    /// `deadline` implements the per-job wall-clock timeout; crossing it
    /// aborts with [`DecodeError::Timeout`]. A capture that ends in a
    /// truncated payload finalizes normally with `truncated` set, while a
    /// truncated header is surfaced as an error.
    pub fn decode_file(
        &mut self,
        input: &Path,
        wav_path: Option<&Path>,
        deadline: Option<Instant>,
    ) -> Result<CallSummary, DecodeError> {
        let mut reader = FrameReader::open(input)?;
        let mut writer = match wav_path {
            Some(path) => Some(WavWriter::create(path, SAMPLE_RATE)?),
            None => None,
        };

        self.vocoder.reset();

        let mut summary = CallSummary {
            metadata: CallMetadata::default(),
            samples: 0,
            truncated: false,
            unknown_key: false,
        };
        let mut cipher: Option<CipherFamily> = None;

        loop {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(DecodeError::Timeout);
            }

            let frame = match reader.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(CodecError::TruncatedPayload { declared, got }) => {
                    warn!(declared, got, "capture ends in truncated payload");
                    summary.truncated = true;
                    break;
                }
                Err(e) => return Err(e.into()),
            };

            if summary.metadata.total_frames == 0 {
                summary.metadata.nac = frame.nac;
            }
            summary.metadata.total_frames += 1;

            if let Some(sync) = &frame.crypto {
                cipher = self.refresh_cipher(sync, &mut summary);
            }

            if frame.is_voice() {
                summary.metadata.voice_frames += 1;

                let pcm = self.decode_voice(&frame, cipher);
                summary.samples += pcm.len() as u64;
                if let Some(writer) = writer.as_mut() {
                    writer.write_samples(&pcm)?;
                }
            }
        }

        if let Some(writer) = writer {
            writer.finish()?;
        }

        summary.metadata.call_length = summary.samples as f64 / f64::from(SAMPLE_RATE);
        debug!(
            frames = summary.metadata.total_frames,
            voice = summary.metadata.voice_frames,
            samples = summary.samples,
            "capture decoded"
        );

        Ok(summary)
    }

    /// Update cipher state from an LDU2's encryption sync word.
    fn refresh_cipher(
        &mut self,
        sync: &trunkdec_codec::EncryptionSync,
        summary: &mut CallSummary,
    ) -> Option<CipherFamily> {
        if !sync.is_encrypted() {
            return None;
        }

        summary.metadata.has_encrypted_frames = true;

        let family = match sync.algorithm() {
            CryptoAlgorithm::Des => CipherFamily::Des,
            CryptoAlgorithm::Aes256 => CipherFamily::Aes256,
            CryptoAlgorithm::Adp => CipherFamily::Adp,
            other => {
                warn!(?other, algid = sync.algorithm_id, "no engine for algorithm");
                return None;
            }
        };

        let key_id = sync.key_id;
        let engine = self.engine_mut(family);
        if !engine.has_key(key_id) {
            if !summary.unknown_key {
                warn!(
                    key_id = format_args!("0x{key_id:04X}"),
                    cipher = family.name(),
                    "no key for encrypted stream; audio will be unintelligible"
                );
            }
            summary.unknown_key = true;
            return None;
        }

        match engine.prepare(key_id, &sync.mi) {
            Ok(()) => Some(family),
            Err(e) => {
                warn!(error = %e, "keystream preparation failed");
                summary.unknown_key = true;
                None
            }
        }
    }

    /// Synthesize one voice frame's nine codewords.
    ///
    /// Slots the payload cannot hold become silence so audio timing is
    /// preserved.
    fn decode_voice(&mut self, frame: &Frame, cipher: Option<CipherFamily>) -> Vec<i16> {
        let is_ldu2 = frame.crypto.is_some();
        let frame_bits = bits::expand(&frame.payload);

        let mut pcm = Vec::with_capacity(CODEWORDS_PER_FRAME * SAMPLES_PER_CODEWORD);
        let mut block = [0i16; SAMPLES_PER_CODEWORD];

        for slot in 0..CODEWORDS_PER_FRAME {
            match voice::extract_codeword(&frame_bits, slot) {
                Some(cw) => {
                    let mut imbe = ImbeFrame::decode(&cw);

                    if let Some(family) = cipher {
                        let mut packed = imbe.pack();
                        self.engine_mut(family).decrypt_codeword(&mut packed, is_ldu2);
                        imbe.unpack(&packed);
                    }

                    self.vocoder.synthesize(&imbe.vocoder_params(), &mut block);
                    pcm.extend_from_slice(&block);
                }
                None => {
                    pcm.extend_from_slice(&[0i16; SAMPLES_PER_CODEWORD]);
                }
            }
        }

        pcm
    }
}
