//! End-to-end pipeline scenarios over synthesized captures.

use std::time::Instant;

use trunkdec_codec::{EncryptionSync, NullVocoder, ALGID_CLEAR};
use trunkdec_crypto::{DesOfb, KeyTable, KeystreamEngine};
use trunkdec_decoder::{DecodeError, Decoder};
use trunkdec_testkit::{sample_params, CaptureBuilder, RampVocoder};

const NAC: u16 = 0x293;
const DES_KEY: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
const MI: [u8; 9] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09];

fn clear_sync() -> EncryptionSync {
    EncryptionSync {
        algorithm_id: ALGID_CLEAR,
        key_id: 0,
        mi: [0; 9],
    }
}

fn des_sync() -> EncryptionSync {
    EncryptionSync {
        algorithm_id: 0x81,
        key_id: 0x001,
        mi: MI,
    }
}

/// Four LDU1/LDU2 pairs in the clear, bracketed by header and terminator.
fn clear_capture() -> Vec<u8> {
    let params = sample_params();
    let mut builder = CaptureBuilder::new(NAC);
    builder.header();
    for _ in 0..4 {
        builder.ldu1(&params);
        builder.ldu2(&params, &clear_sync());
    }
    builder.terminator();
    builder.build()
}

fn decode_bytes(decoder: &mut Decoder, capture: &[u8], wav: Option<&std::path::Path>) -> trunkdec_decoder::CallSummary {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("call.p25");
    std::fs::write(&input, capture).unwrap();
    decoder.decode_file(&input, wav, None).unwrap()
}

#[test]
fn clear_voice_produces_expected_counts() {
    let mut decoder = Decoder::new(Box::new(NullVocoder));
    let summary = decode_bytes(&mut decoder, &clear_capture(), None);

    assert_eq!(summary.metadata.nac, 659);
    assert_eq!(summary.metadata.total_frames, 10);
    assert_eq!(summary.metadata.voice_frames, 8);
    assert_eq!(summary.samples, 8 * 1440);
    assert!(!summary.metadata.has_encrypted_frames);
    assert!((summary.metadata.call_length - 1.44).abs() < 1e-9);
}

#[test]
fn wav_artifact_matches_sample_count() {
    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("call.wav");

    let mut decoder = Decoder::new(Box::new(NullVocoder));
    let summary = decode_bytes(&mut decoder, &clear_capture(), Some(&wav));

    let bytes = std::fs::read(&wav).unwrap();
    assert_eq!(&bytes[..4], b"RIFF");
    let riff = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
    assert_eq!(riff as usize, bytes.len() - 8);

    let data = u32::from_le_bytes(bytes[40..44].try_into().unwrap());
    assert_eq!(u64::from(data), summary.samples * 2);
    assert_eq!(summary.samples, 11520);
}

#[test]
fn des_encrypted_voice_with_key_recovers_clear_audio() {
    let params = sample_params();

    // Encrypted rendition: LDU2 prepares the stream, LDU1 continues it.
    let mut engine = DesOfb::new();
    engine.add_key(0x001, DES_KEY.to_vec());
    let mut builder = CaptureBuilder::new(NAC);
    builder.header();
    builder.ldu2_encrypted(&params, &des_sync(), &mut engine);
    builder.ldu1_encrypted(&params, &mut engine);
    builder.terminator();
    let encrypted = builder.build();

    // Clear rendition of the same voice.
    let mut builder = CaptureBuilder::new(NAC);
    builder.header();
    builder.ldu2(&params, &clear_sync());
    builder.ldu1(&params);
    builder.terminator();
    let clear = builder.build();

    let dir = tempfile::tempdir().unwrap();

    let mut decoder = Decoder::new(Box::new(RampVocoder));
    decoder.add_key(0x001, DES_KEY.to_vec()).unwrap();
    let enc_wav = dir.path().join("enc.wav");
    let enc_input = dir.path().join("enc.p25");
    std::fs::write(&enc_input, &encrypted).unwrap();
    let enc_summary = decoder
        .decode_file(&enc_input, Some(&enc_wav), None)
        .unwrap();

    let mut decoder = Decoder::new(Box::new(RampVocoder));
    let clear_wav = dir.path().join("clear.wav");
    let clear_input = dir.path().join("clear.p25");
    std::fs::write(&clear_input, &clear).unwrap();
    decoder
        .decode_file(&clear_input, Some(&clear_wav), None)
        .unwrap();

    assert!(enc_summary.metadata.has_encrypted_frames);
    assert!(!enc_summary.unknown_key);
    assert_eq!(
        std::fs::read(&enc_wav).unwrap(),
        std::fs::read(&clear_wav).unwrap(),
        "decrypted audio must equal the clear rendition"
    );
}

#[test]
fn encrypted_voice_without_key_still_completes() {
    let params = sample_params();

    let mut engine = DesOfb::new();
    engine.add_key(0x001, DES_KEY.to_vec());
    let mut builder = CaptureBuilder::new(NAC);
    builder.header();
    let mut aes_sync = des_sync();
    aes_sync.algorithm_id = 0x84; // announce AES, key not registered
    builder.ldu2(&params, &aes_sync);
    builder.ldu1(&params);
    builder.terminator();

    let mut decoder = Decoder::new(Box::new(RampVocoder));
    let summary = decode_bytes(&mut decoder, &builder.build(), None);

    assert!(summary.metadata.has_encrypted_frames);
    assert!(summary.unknown_key);
    assert_eq!(summary.samples, 2 * 1440);
}

#[test]
fn keys_load_from_shared_table() {
    let mut table = KeyTable::new();
    table.add_key(0x001, DES_KEY.to_vec()).unwrap();
    table.add_key(0x002, vec![0; 5]).unwrap();

    let params = sample_params();
    let mut engine = DesOfb::new();
    engine.add_key(0x001, DES_KEY.to_vec());
    let mut builder = CaptureBuilder::new(NAC);
    builder.ldu2_encrypted(&params, &des_sync(), &mut engine);

    let mut decoder = Decoder::new(Box::new(RampVocoder));
    decoder.load_keys(&table);
    let summary = decode_bytes(&mut decoder, &builder.build(), None);

    assert!(summary.metadata.has_encrypted_frames);
    assert!(!summary.unknown_key);
}

#[test]
fn empty_capture_yields_zero_frames_and_valid_wav() {
    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("empty.wav");

    let mut decoder = Decoder::new(Box::new(NullVocoder));
    let summary = decode_bytes(&mut decoder, &[], Some(&wav));

    assert_eq!(summary.metadata.total_frames, 0);
    assert_eq!(summary.metadata.voice_frames, 0);
    assert_eq!(summary.samples, 0);

    let bytes = std::fs::read(&wav).unwrap();
    assert_eq!(bytes.len(), 44);
    assert_eq!(&bytes[..4], b"RIFF");
}

#[test]
fn truncated_payload_finalizes_what_it_has() {
    let mut capture = clear_capture();
    capture.truncate(capture.len() - 100);

    let mut decoder = Decoder::new(Box::new(NullVocoder));
    let summary = decode_bytes(&mut decoder, &capture, None);

    assert!(summary.truncated);
    // Header plus seven complete voice frames survive the cut.
    assert_eq!(summary.metadata.total_frames, 8);
    assert_eq!(summary.samples, 7 * 1440);
}

#[test]
fn truncated_header_is_surfaced() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("bad.p25");
    std::fs::write(&input, [0x05u8, 0x02]).unwrap();

    let mut decoder = Decoder::new(Box::new(NullVocoder));
    let err = decoder.decode_file(&input, None, None).unwrap_err();
    assert!(matches!(err, DecodeError::Codec(_)));
}

#[test]
fn short_voice_payload_is_padded_to_full_timing() {
    let mut builder = CaptureBuilder::new(NAC);
    builder.push_raw(0x05, &[0u8; 50]);

    let mut decoder = Decoder::new(Box::new(NullVocoder));
    let summary = decode_bytes(&mut decoder, &builder.build(), None);

    assert_eq!(summary.metadata.voice_frames, 1);
    assert_eq!(summary.samples, 1440);
}

#[test]
fn expired_deadline_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("call.p25");
    std::fs::write(&input, clear_capture()).unwrap();

    let mut decoder = Decoder::new(Box::new(NullVocoder));
    let err = decoder
        .decode_file(&input, None, Some(Instant::now()))
        .unwrap_err();
    assert!(matches!(err, DecodeError::Timeout));
}
