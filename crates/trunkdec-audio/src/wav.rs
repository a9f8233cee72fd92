//! Streaming RIFF/WAVE writer for decoded voice.
//!
//! Samples stream out as they are synthesized, so the RIFF and `data`
//! chunk sizes are unknown until the call ends; a placeholder header is
//! written up front and patched on [`WavWriter::finish`]. One writer owns
//! one file; concurrent writes to the same file are undefined.

use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

/// Octets in the canonical 16-bit PCM header.
pub const HEADER_LEN: u64 = 44;

/// Streaming mono 16-bit PCM writer.
pub struct WavWriter<W> {
    inner: W,
    sample_rate: u32,
    sample_count: u32,
}

impl WavWriter<BufWriter<File>> {
    /// Create the file and write the placeholder header.
    pub fn create(path: &Path, sample_rate: u32) -> io::Result<Self> {
        WavWriter::new(BufWriter::new(File::create(path)?), sample_rate)
    }
}

impl<W: Write + Seek> WavWriter<W> {
    /// Write the placeholder header to `inner`.
    pub fn new(mut inner: W, sample_rate: u32) -> io::Result<Self> {
        inner.write_all(&[0u8; HEADER_LEN as usize])?;

        Ok(WavWriter {
            inner,
            sample_rate,
            sample_count: 0,
        })
    }

    /// Append a block of samples.
    pub fn write_samples(&mut self, samples: &[i16]) -> io::Result<()> {
        for &sample in samples {
            self.inner.write_all(&sample.to_le_bytes())?;
        }
        self.sample_count += samples.len() as u32;
        Ok(())
    }

    /// Samples written so far.
    #[must_use]
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Seek back and patch the header with the final sizes.
    pub fn finish(mut self) -> io::Result<W> {
        let data_size = self.sample_count * 2;
        let riff_size = 36 + data_size;
        let byte_rate = self.sample_rate * 2;

        self.inner.seek(SeekFrom::Start(0))?;

        self.inner.write_all(b"RIFF")?;
        self.inner.write_all(&riff_size.to_le_bytes())?;
        self.inner.write_all(b"WAVE")?;

        self.inner.write_all(b"fmt ")?;
        self.inner.write_all(&16u32.to_le_bytes())?;
        self.inner.write_all(&1u16.to_le_bytes())?; // PCM
        self.inner.write_all(&1u16.to_le_bytes())?; // mono
        self.inner.write_all(&self.sample_rate.to_le_bytes())?;
        self.inner.write_all(&byte_rate.to_le_bytes())?;
        self.inner.write_all(&2u16.to_le_bytes())?; // block align
        self.inner.write_all(&16u16.to_le_bytes())?; // bits per sample

        self.inner.write_all(b"data")?;
        self.inner.write_all(&data_size.to_le_bytes())?;

        self.inner.flush()?;
        Ok(self.inner)
    }
}
