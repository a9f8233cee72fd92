//! Voice codeword positions within the on-air data unit.
//!
//! Two layers sit between a codeword's logical bits and the capture bits:
//!
//! 1. The intra-codeword scramble. The coded chunks protecting `u0..u7`
//!    are not transmitted back to back; each chunk's bits zig-zag through
//!    the 144-bit block with a stride of three dibits, alternating between
//!    the high and low bit of each dibit. [`CODEWORD_BIT_SCRAMBLE`] maps
//!    logical bit `k` (chunk-major, the order the header decoder reads) to
//!    its position inside the block.
//! 2. Status symbols. A 2-bit status symbol follows every 70 data bits of
//!    the unit, shifting on-air positions; [`onair_position`] applies it.
//!
//! Extraction composes both: capture bit =
//! `onair_position(slot_offset + CODEWORD_BIT_SCRAMBLE[k])`.

use super::{Codeword, CODEWORD_BITS};

/// Data-bit offset of each voice codeword slot within the data unit.
pub const CODEWORD_DATA_OFFSETS: [usize; 9] =
    [112, 256, 440, 624, 808, 992, 1176, 1360, 1536];

/// Position of each logical codeword bit within its 144-bit block.
///
/// Chunk-major order: the Golay words for `u0..u3` (23 bits each), the
/// Hamming words for `u4..u6` (15 bits each), then the 7 plain `u7` bits.
/// Within a chunk the entries advance six bit positions at a time,
/// alternating dibit halves, wrapping into a second zig-zag run where the
/// chunk spills past the block end.
pub const CODEWORD_BIT_SCRAMBLE: [usize; CODEWORD_BITS] = [
    // u0, Golay(23,12)
      0,   7,  12,  19,  24,  31,  36,  43,  48,  55,  60,  67,
     72,  79,  84,  91,  96, 103, 108, 115, 120, 127, 132,
    // u1, Golay(23,12)
    139,   1,   6,  13,  18,  25,  30,  37,  42,  49,  54,  61,
     66,  73,  78,  85,  90,  97, 102, 109, 114, 121, 126,
    // u2, Golay(23,12)
    133, 138,   2,   9,  14,  21,  26,  33,  38,  45,  50,  57,
     62,  69,  74,  81,  86,  93,  98, 105, 110, 117, 122,
    // u3, Golay(23,12)
      3,   8,  15,  20,  27,  32,  39,  44,  51,  56,  63,  68,
     75,  80,  87,  92,  99, 104, 111, 116, 129, 134, 141,
    // u4, Hamming(15,11)
    123, 128, 135, 140,   4,  11,  16,  23,  28,  35,  40,  47,
     52,  59,  64,
    // u5, Hamming(15,11)
     71,  76,  83,  88,  95, 100, 107, 112, 119, 124, 131, 136,
    143,   5,  10,
    // u6, Hamming(15,11)
     17,  22,  29,  34,  41,  46,  53,  58,  65,  70,  77,  82,
     89,  94, 101,
    // u7, unprotected
    106, 113, 118, 125, 130, 137, 142,
];

/// Map a data-bit index to its on-air bit index.
///
/// A 2-bit status symbol follows every 70 data bits.
#[must_use]
pub fn onair_position(data_bit: usize) -> usize {
    data_bit + 2 * (data_bit / 70)
}

/// Capture bit position of logical bit `k` of the codeword in `slot`.
#[must_use]
pub fn codeword_bit_position(slot: usize, k: usize) -> usize {
    onair_position(CODEWORD_DATA_OFFSETS[slot] + CODEWORD_BIT_SCRAMBLE[k])
}

/// Extract the codeword for `slot` (0..9) from the expanded payload bits,
/// undoing the scramble so the result reads chunk-major.
///
/// Returns `None` when the payload is too short to hold the slot; the
/// pipeline substitutes silence so audio timing is preserved.
#[must_use]
pub fn extract_codeword(frame_bits: &[u8], slot: usize) -> Option<Codeword> {
    let start = CODEWORD_DATA_OFFSETS[slot];

    if onair_position(start + CODEWORD_BITS - 1) >= frame_bits.len() {
        return None;
    }

    let mut cw = Codeword::zeroed();
    for (k, bit) in cw.0.iter_mut().enumerate() {
        *bit = frame_bits[codeword_bit_position(slot, k)];
    }

    Some(cw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::esw::LDU_BITS;

    /// One zig-zag run: dibit start, count, whether it opens on the high
    /// bit of the dibit.
    struct Run {
        hi: bool,
        dibit: usize,
        num: usize,
    }

    const fn hi(dibit: usize, num: usize) -> Run {
        Run {
            hi: true,
            dibit,
            num,
        }
    }

    const fn lo(dibit: usize, num: usize) -> Run {
        Run {
            hi: false,
            dibit,
            num,
        }
    }

    /// The scramble as run specifications, one list per coded chunk.
    const CHUNK_RUNS: [&[Run]; 8] = [
        &[hi(0, 23)],
        &[lo(69, 1), lo(0, 22)],
        &[lo(66, 2), hi(1, 21)],
        &[lo(1, 20), lo(64, 3)],
        &[lo(61, 4), hi(2, 11)],
        &[lo(35, 13), lo(2, 2)],
        &[lo(8, 15)],
        &[hi(53, 7)],
    ];

    #[test]
    fn table_matches_the_zigzag_runs() {
        let mut derived = Vec::with_capacity(CODEWORD_BITS);

        for runs in CHUNK_RUNS {
            for run in runs {
                let mut dibit = run.dibit;
                let mut high = run.hi;
                for _ in 0..run.num {
                    derived.push(2 * dibit + usize::from(!high));
                    dibit += 3;
                    high = !high;
                }
            }
        }

        assert_eq!(derived[..], CODEWORD_BIT_SCRAMBLE[..]);
    }

    #[test]
    fn table_is_a_permutation_using_each_dibit_half_once() {
        let mut seen = [false; CODEWORD_BITS];
        for &pos in &CODEWORD_BIT_SCRAMBLE {
            assert!(!seen[pos], "position {pos} used twice");
            seen[pos] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn pinned_scramble_entries() {
        // Chunk openings and closings, computed independently of the run
        // specs above.
        assert_eq!(CODEWORD_BIT_SCRAMBLE[0], 0);
        assert_eq!(CODEWORD_BIT_SCRAMBLE[1], 7);
        assert_eq!(CODEWORD_BIT_SCRAMBLE[22], 132);
        assert_eq!(CODEWORD_BIT_SCRAMBLE[23], 139);
        assert_eq!(CODEWORD_BIT_SCRAMBLE[24], 1);
        assert_eq!(CODEWORD_BIT_SCRAMBLE[46], 133);
        assert_eq!(CODEWORD_BIT_SCRAMBLE[69], 3);
        assert_eq!(CODEWORD_BIT_SCRAMBLE[91], 141);
        assert_eq!(CODEWORD_BIT_SCRAMBLE[92], 123);
        assert_eq!(CODEWORD_BIT_SCRAMBLE[106], 64);
        assert_eq!(CODEWORD_BIT_SCRAMBLE[107], 71);
        assert_eq!(CODEWORD_BIT_SCRAMBLE[122], 17);
        assert_eq!(CODEWORD_BIT_SCRAMBLE[137], 106);
        assert_eq!(CODEWORD_BIT_SCRAMBLE[143], 142);
    }

    #[test]
    fn pinned_onair_positions() {
        assert_eq!(onair_position(0), 0);
        assert_eq!(onair_position(69), 69);
        assert_eq!(onair_position(70), 72);
        assert_eq!(onair_position(400), 410);
        assert_eq!(onair_position(1679), 1725);

        // Composite positions: slot offset + scramble + status symbols.
        assert_eq!(codeword_bit_position(0, 0), 114);
        assert_eq!(codeword_bit_position(0, 23), 257);
        assert_eq!(codeword_bit_position(2, 137), 560);
        assert_eq!(codeword_bit_position(8, 143), 1724);
    }

    #[test]
    fn slots_fit_a_full_data_unit() {
        let bits = vec![0u8; LDU_BITS];
        for slot in 0..9 {
            assert!(extract_codeword(&bits, slot).is_some(), "slot {slot}");
        }
    }

    #[test]
    fn short_payload_drops_tail_slots() {
        // Half a data unit holds the first few codewords only.
        let bits = vec![0u8; LDU_BITS / 2];
        assert!(extract_codeword(&bits, 0).is_some());
        assert!(extract_codeword(&bits, 8).is_none());
    }

    #[test]
    fn extraction_reads_the_scrambled_positions() {
        let mut bits = vec![0u8; LDU_BITS];

        // Light up logical bits 0 and 143 of slot 2 through the scramble.
        bits[codeword_bit_position(2, 0)] = 1;
        bits[codeword_bit_position(2, 143)] = 1;

        let cw = extract_codeword(&bits, 2).unwrap();
        assert_eq!(cw.0[0], 1);
        assert_eq!(cw.0[143], 1);
        assert_eq!(cw.0.iter().map(|&b| usize::from(b)).sum::<usize>(), 2);

        // A bit at the slot's first *contiguous* position is NOT logical
        // bit 0: the scramble is not the identity.
        let mut bits = vec![0u8; LDU_BITS];
        bits[onair_position(CODEWORD_DATA_OFFSETS[2] + 1)] = 1;
        let cw = extract_codeword(&bits, 2).unwrap();
        assert_eq!(cw.0[0], 0);
        assert_eq!(cw.0[24], 1);
    }
}
