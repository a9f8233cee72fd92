//! Capture container parsing.
//!
//! A capture is a plain concatenation of framed data units. Each unit
//! carries a 5-octet header followed by its payload:
//!
//! ```text
//!   Octet 0:    DUID (data unit identifier)
//!   Octets 1-2: NAC (u16 BE, low 12 bits significant)
//!   Octets 3-4: payload length (u16 BE)
//!   Octets 5+:  payload
//! ```
//!
//! There is no outer envelope and no trailer; a clean EOF lands exactly on
//! a frame boundary. Anything else is a truncation error, which the decoder
//! pipeline treats as the end of the recording.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::CodecError;
use crate::esw::{self, EncryptionSync};

/// Octets in the frame header.
pub const HEADER_LEN: usize = 5;

/// The frame kind named by a DUID octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Header data unit opening a call.
    Header,
    /// Logical data unit 1 (voice, link control).
    Ldu1,
    /// Logical data unit 2 (voice, encryption sync).
    Ldu2,
    /// Terminator data unit closing a call.
    Terminator,
    /// Packet data unit.
    PacketData,
    /// Trunking signaling block.
    TrunkingSignalBlock,
    /// A DUID this decoder does not interpret; forwarded, never fatal.
    Unknown(u8),
}

impl FrameKind {
    /// Map a DUID octet to its frame kind.
    #[must_use]
    pub fn from_duid(duid: u8) -> FrameKind {
        match duid {
            0x00 => FrameKind::Header,
            0x03 | 0x07 | 0x0F => FrameKind::Terminator,
            0x05 => FrameKind::Ldu1,
            0x0A => FrameKind::Ldu2,
            0x0C => FrameKind::PacketData,
            0x12 => FrameKind::TrunkingSignalBlock,
            other => FrameKind::Unknown(other),
        }
    }

    /// Whether this kind carries IMBE voice.
    #[must_use]
    pub fn is_voice(self) -> bool {
        matches!(self, FrameKind::Ldu1 | FrameKind::Ldu2)
    }

    /// Human-readable name used by the text and CSV dumps.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            FrameKind::Header => "HDU (Header Data Unit)",
            FrameKind::Ldu1 => "LDU1 (Logical Data Unit 1)",
            FrameKind::Ldu2 => "LDU2 (Logical Data Unit 2)",
            FrameKind::Terminator => "TDU (Terminator Data Unit)",
            FrameKind::PacketData => "PDU (Packet Data Unit)",
            FrameKind::TrunkingSignalBlock => "TSBK (Trunking Signal Block)",
            FrameKind::Unknown(_) => "Unknown DUID",
        }
    }
}

/// One parsed data unit.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw DUID octet.
    pub duid: u8,
    /// 12-bit network access code.
    pub nac: u16,
    /// Payload octets; always exactly as long as the header declared.
    pub payload: Vec<u8>,
    /// Kind derived from the DUID.
    pub kind: FrameKind,
    /// Encryption sync recovered from LDU2 payloads, `None` elsewhere.
    pub crypto: Option<EncryptionSync>,
}

impl Frame {
    /// Whether this frame carries IMBE voice.
    #[must_use]
    pub fn is_voice(&self) -> bool {
        self.kind.is_voice()
    }
}

/// Streaming reader over a capture.
///
/// Restartable by reopening the capture, but not rewindable within a
/// session.
pub struct FrameReader<R> {
    inner: R,
}

impl FrameReader<BufReader<File>> {
    /// Open a capture file.
    pub fn open(path: &Path) -> Result<Self, CodecError> {
        Ok(FrameReader::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: Read> FrameReader<R> {
    /// Wrap any byte source.
    pub fn new(inner: R) -> Self {
        FrameReader { inner }
    }

    /// Read the next frame.
    ///
    /// Returns `Ok(None)` at a clean EOF. A partial header or short payload
    /// is an error; callers decide whether to recover.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, CodecError> {
        let mut header = [0u8; HEADER_LEN];

        let got = read_up_to(&mut self.inner, &mut header)?;
        if got == 0 {
            return Ok(None);
        }
        if got < HEADER_LEN {
            return Err(CodecError::TruncatedHeader { got });
        }

        let duid = header[0];
        let nac = u16::from_be_bytes([header[1], header[2]]) & 0x0FFF;
        let declared = usize::from(u16::from_be_bytes([header[3], header[4]]));

        let mut payload = vec![0u8; declared];
        let got = read_up_to(&mut self.inner, &mut payload)?;
        if got < declared {
            return Err(CodecError::TruncatedPayload { declared, got });
        }

        let kind = FrameKind::from_duid(duid);
        if let FrameKind::Unknown(value) = kind {
            tracing::debug!(duid = value, "unknown DUID, forwarding frame");
        }
        let crypto = if kind == FrameKind::Ldu2 {
            Some(esw::extract(&payload))
        } else {
            None
        };

        Ok(Some(Frame {
            duid,
            nac,
            payload,
            kind,
            crypto,
        }))
    }
}

/// Fill as much of `buf` as the source provides, returning the octet count.
/// Unlike `read_exact`, a short read is reported rather than an error so the
/// caller can distinguish truncation from I/O failure.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize, CodecError> {
    let mut filled = 0;

    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(CodecError::Io(e)),
        }
    }

    Ok(filled)
}
