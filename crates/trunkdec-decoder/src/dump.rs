//! Frame-analysis dumps: the `--text` report and `--csv` table.
//!
//! Both walk the capture independently of audio decoding and tolerate
//! truncation the same way the pipeline does.

use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

use tracing::warn;

use trunkdec_codec::{CodecError, Frame, FrameReader};

use crate::error::DecodeError;

/// Render one frame the way the text report shows it.
#[must_use]
pub fn frame_text(frame: &Frame) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "==== P25 Frame ====");
    let _ = writeln!(
        out,
        "DUID: 0x{:02X} ({})",
        frame.duid,
        frame.kind.name()
    );
    let _ = writeln!(out, "NAC:  0x{:03X} ({})", frame.nac, frame.nac);
    let _ = writeln!(
        out,
        "Length: {} bytes ({} bits)",
        frame.payload.len(),
        frame.payload.len() * 8
    );
    let _ = writeln!(
        out,
        "Voice Frame: {}",
        if frame.is_voice() { "YES" } else { "NO" }
    );

    if let Some(sync) = &frame.crypto {
        let _ = writeln!(
            out,
            "Encryption: algid=0x{:02X} kid=0x{:04X} {}",
            sync.algorithm_id,
            sync.key_id,
            if sync.is_encrypted() { "ENCRYPTED" } else { "clear" }
        );
    }

    let _ = writeln!(out, "Raw Data ({} bytes):", frame.payload.len());
    for (row, chunk) in frame.payload.chunks(16).enumerate() {
        let _ = write!(out, "{:04x}: ", row * 16);
        for byte in chunk {
            let _ = write!(out, "{byte:02x} ");
        }
        let _ = writeln!(out);
    }

    out
}

/// Write the human-readable frame analysis report.
pub fn write_text_dump<W: Write>(input: &Path, mut out: W) -> Result<(), DecodeError> {
    let mut reader = FrameReader::open(input)?;
    let mut index = 0u64;

    loop {
        match reader.next_frame() {
            Ok(Some(frame)) => {
                index += 1;
                writeln!(out, "Frame {index}:")?;
                out.write_all(frame_text(&frame).as_bytes())?;
                writeln!(out, "----------------------------------------")?;
            }
            Ok(None) => break,
            Err(CodecError::TruncatedPayload { declared, got }) => {
                warn!(declared, got, "text dump stops at truncated payload");
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

/// Write the per-frame CSV table.
pub fn write_csv_dump<W: Write>(input: &Path, mut out: W) -> Result<(), DecodeError> {
    writeln!(
        out,
        "frame,duid,duid_name,nac,length,is_voice,is_encrypted,algorithm_id,key_id,data_hex"
    )?;

    let mut reader = FrameReader::open(input)?;
    let mut index = 0u64;

    loop {
        let frame = match reader.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(CodecError::TruncatedPayload { declared, got }) => {
                warn!(declared, got, "CSV dump stops at truncated payload");
                break;
            }
            Err(e) => return Err(e.into()),
        };
        index += 1;

        let (encrypted, algid, kid) = match &frame.crypto {
            Some(sync) => (sync.is_encrypted(), sync.algorithm_id, sync.key_id),
            None => (false, 0, 0),
        };

        let hex: String = frame
            .payload
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(" ");

        writeln!(
            out,
            "{index},0x{:02X},\"{}\",0x{:03X},{},{},{},0x{algid:02X},{kid},\"{hex}\"",
            frame.duid,
            frame.kind.name(),
            frame.nac,
            frame.payload.len(),
            if frame.is_voice() { "YES" } else { "NO" },
            if encrypted { "YES" } else { "NO" },
        )?;
    }

    Ok(())
}
