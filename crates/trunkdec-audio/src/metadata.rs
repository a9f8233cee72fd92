//! Call metadata and the JSON sidecar merger.
//!
//! The upstream recorder is the authority on call information: when the
//! caller supplies metadata the merger preserves its text verbatim and only
//! appends decoder-computed fields before the closing brace. Caller text is
//! never canonicalized; it may carry trailing whitespace or a trailing
//! comma, both tolerated. Without caller metadata a minimal object carries
//! the decoder fields alone.

use serde::Serialize;
use serde_json::json;

/// Name written into the `decoder_source` sidecar field.
pub const DECODER_SOURCE: &str = "trunkdec";

/// Counters and identity accumulated while decoding one capture.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CallMetadata {
    /// Network access code from the first frame.
    pub nac: u16,
    /// Data units read from the capture.
    pub total_frames: u64,
    /// Voice data units among them.
    pub voice_frames: u64,
    /// Whether any LDU2 announced an encrypted stream.
    pub has_encrypted_frames: bool,
    /// Call length in seconds, derived from the synthesized sample count.
    pub call_length: f64,
}

impl CallMetadata {
    /// The fixed audio type field; this decoder only produces digital
    /// voice.
    #[must_use]
    pub fn audio_type(&self) -> &'static str {
        "digital"
    }
}

/// Merge caller-supplied metadata with decoder-computed fields, producing
/// the sidecar text.
///
/// `input_file` is the capture's basename. Caller text without a closing
/// brace is unusable and falls back to the minimal object.
#[must_use]
pub fn merge_sidecar(caller: Option<&str>, meta: &CallMetadata, input_file: &str) -> String {
    if let Some(text) = caller {
        if let Some(merged) = merge_with_caller(text, meta, input_file) {
            return merged;
        }
    }

    minimal_sidecar(meta, input_file)
}

fn merge_with_caller(text: &str, meta: &CallMetadata, input_file: &str) -> Option<String> {
    let brace = text.rfind('}')?;
    let mut base = text[..brace].trim_end().to_string();

    if !base.is_empty() && !base.ends_with(',') && !base.ends_with('{') {
        base.push(',');
    }
    base.push('\n');

    base.push_str(&format!(
        "  \"decoder_source\": {},\n",
        json!(DECODER_SOURCE)
    ));
    base.push_str(&format!("  \"input_file\": {},\n", json!(input_file)));
    base.push_str(&format!("  \"p25_frames\": {},\n", meta.total_frames));
    base.push_str(&format!("  \"voice_frames\": {}\n", meta.voice_frames));
    base.push('}');

    Some(base)
}

fn minimal_sidecar(meta: &CallMetadata, input_file: &str) -> String {
    let object = json!({
        "call_length": meta.call_length,
        "audio_type": meta.audio_type(),
        "nac": meta.nac,
        "encrypted": u8::from(meta.has_encrypted_frames),
        "decoder_source": DECODER_SOURCE,
        "input_file": input_file,
        "p25_frames": meta.total_frames,
        "voice_frames": meta.voice_frames,
    });

    serde_json::to_string_pretty(&object).expect("static object serializes")
}
