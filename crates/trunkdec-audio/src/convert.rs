//! Transcoding decoded WAV into web formats.
//!
//! The converter is an external collaborator (`ffmpeg`) run as a child
//! process with explicit arguments. The WAV artifact is always retained;
//! conversion failure is reported to the caller, who logs it without
//! failing the job.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

use tracing::debug;

use crate::error::AudioError;

/// Requested audio output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// Plain RIFF/WAVE, no conversion.
    Wav,
    /// MP3, legacy compatibility.
    Mp3,
    /// AAC in an M4A container.
    M4a,
    /// Opus, best compression for voice.
    Opus,
}

impl AudioFormat {
    /// File extension for this format.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Opus => "opus",
        }
    }

    /// Bitrate used when the configuration leaves it at 0.
    #[must_use]
    pub fn default_bitrate_kbps(self) -> u32 {
        match self {
            AudioFormat::Wav => 0,
            AudioFormat::Mp3 | AudioFormat::M4a => 64,
            AudioFormat::Opus => 32,
        }
    }

    fn codec_args(self, bitrate: &str) -> Vec<String> {
        let codec = match self {
            AudioFormat::Wav => unreachable!("wav needs no conversion"),
            AudioFormat::Mp3 => "libmp3lame",
            AudioFormat::M4a => "aac",
            AudioFormat::Opus => "libopus",
        };

        let mut args = vec!["-c:a".into(), codec.into(), "-b:a".into(), bitrate.into()];
        if self == AudioFormat::M4a {
            args.push("-movflags".into());
            args.push("+faststart".into());
        }
        args
    }
}

impl FromStr for AudioFormat {
    type Err = AudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wav" => Ok(AudioFormat::Wav),
            "mp3" => Ok(AudioFormat::Mp3),
            "m4a" => Ok(AudioFormat::M4a),
            "opus" => Ok(AudioFormat::Opus),
            other => Err(AudioError::Unsupported(other.to_string())),
        }
    }
}

/// Transcode `wav_path` into `format`, returning the converted file's path.
///
/// `bitrate_kbps` of 0 selects the format default. `Wav` is a no-op
/// returning the input path.
pub fn convert(
    wav_path: &Path,
    format: AudioFormat,
    bitrate_kbps: u32,
) -> Result<PathBuf, AudioError> {
    if format == AudioFormat::Wav {
        return Ok(wav_path.to_path_buf());
    }

    let bitrate = if bitrate_kbps == 0 {
        format.default_bitrate_kbps()
    } else {
        bitrate_kbps
    };
    let bitrate = format!("{bitrate}k");

    let out_path = wav_path.with_extension(format.extension());

    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-y")
        .arg("-i")
        .arg(wav_path)
        .args(["-ac", "1", "-ar", "8000"])
        .args(format.codec_args(&bitrate))
        .arg(&out_path);

    debug!(?cmd, "running media converter");
    let output = cmd.output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.chars().take(512).collect();
        return Err(AudioError::ChildProcessFailed {
            status: output.status.code().unwrap_or(-1),
            stderr,
        });
    }

    Ok(out_path)
}
