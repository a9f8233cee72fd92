//! The external IMBE synthesis component boundary.
//!
//! Synthesis proper (parameter words to PCM) is a licensed reusable
//! component and not implemented here. Implementations carry inter-frame
//! state (pitch tracking, spectral smoothing), so one instance serves one
//! call at a time and is never shared across concurrent calls; the worker
//! pool gives each worker its own instance for exactly this reason.

/// PCM samples synthesized from one IMBE codeword.
pub const SAMPLES_PER_CODEWORD: usize = 160;

/// An IMBE synthesis backend.
///
/// `synthesize` consumes the eight parameter words (with `u7` already
/// shifted, see [`crate::voice::ImbeFrame::vocoder_params`]) and always
/// produces a full block of samples; a damaged frame degrades to silence
/// or concealment inside the backend, never to an error.
pub trait Vocoder: Send {
    /// Synthesize 160 samples at 8 kHz from one set of parameter words.
    fn synthesize(&mut self, params: &[i16; 8], out: &mut [i16; SAMPLES_PER_CODEWORD]);

    /// Drop inter-frame state between calls. Invoked when a decoder is
    /// reused for a new capture.
    fn reset(&mut self) {}
}

/// Stand-in backend emitting silence.
///
/// Used when no licensed IMBE implementation is linked; the pipeline,
/// timing, and artifact layout stay exercisable end to end.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullVocoder;

impl Vocoder for NullVocoder {
    fn synthesize(&mut self, _params: &[i16; 8], out: &mut [i16; SAMPLES_PER_CODEWORD]) {
        out.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_vocoder_emits_silence() {
        let mut v = NullVocoder;
        let mut out = [1i16; SAMPLES_PER_CODEWORD];
        v.synthesize(&[0; 8], &mut out);
        assert!(out.iter().all(|&s| s == 0));
    }
}
