//! MSB-first bit expansion and extraction helpers.
//!
//! Capture payloads are bit-addressed throughout the P25 on-air layout, so
//! most of this crate works on a `Vec<u8>` of 0/1 values expanded from the
//! payload octets.

/// Expand octets into one 0/1 value per bit, most significant bit first.
#[must_use]
pub fn expand(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() * 8);

    for &byte in bytes {
        for shift in (0..8).rev() {
            out.push((byte >> shift) & 1);
        }
    }

    out
}

/// Collect `len` bits starting at `start` into the low bits of a `u32`,
/// first bit ending up most significant.
///
/// # Panics
/// Panics if the range runs past the end of `bits` or `len > 32`.
#[must_use]
pub fn extract(bits: &[u8], start: usize, len: usize) -> u32 {
    assert!(len <= 32);

    bits[start..start + len]
        .iter()
        .fold(0, |acc, &b| acc << 1 | u32::from(b))
}

/// Pack 0/1 values back into octets, most significant bit first. The bit
/// count must be a multiple of 8.
#[must_use]
pub fn pack(bits: &[u8]) -> Vec<u8> {
    assert_eq!(bits.len() % 8, 0);

    bits.chunks(8)
        .map(|chunk| chunk.iter().fold(0, |acc, &b| acc << 1 | b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_is_msb_first() {
        assert_eq!(expand(&[0b1010_0001]), [1, 0, 1, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn extract_spans_octets() {
        let bits = expand(&[0xAB, 0xCD]);
        assert_eq!(extract(&bits, 0, 16), 0xABCD);
        assert_eq!(extract(&bits, 4, 8), 0xBC);
    }

    #[test]
    fn pack_inverts_expand() {
        let bytes = [0x00, 0xFF, 0x5A, 0x12];
        assert_eq!(pack(&expand(&bytes)), bytes);
    }
}
