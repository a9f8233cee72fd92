//! Encoding and decoding of the (23, 12, 7) standard Golay code protecting
//! the high-priority IMBE parameter words.
//!
//! Decoding expands each 23-bit word to the (24, 12, 8) extended code by
//! appending an overall parity bit, then corrects up to 3 errors via the
//! two-level syndrome search.

use super::{matrix_mul, matrix_mul_systematic};

/// Encoding and decoding of the (23, 12, 7) code.
pub mod standard {
    use super::*;

    /// Encode the given 12 data bits into a 23-bit codeword.
    #[must_use]
    pub fn encode(data: u16) -> u32 {
        assert!(data >> 12 == 0);
        matrix_mul_systematic(u32::from(data), &CORE_SHORT)
    }

    /// Try to decode the given 23-bit word to the nearest codeword,
    /// correcting up to 3 errors.
    ///
    /// On success returns `Some((data, err))` with the 12 data bits and the
    /// number of bits corrected in the data bits, and `None` on an
    /// unrecoverable error.
    #[must_use]
    pub fn decode(word: u32) -> Option<(u16, usize)> {
        assert!(word >> 23 == 0);

        // Expand to a 24-bit codeword with odd weight.
        let expanded = if word.count_ones() % 2 == 0 {
            word << 1 | 1
        } else {
            word << 1
        };

        let data = word_data(expanded);
        let s = syndrome_24(expanded);

        if s == *CORE.last().unwrap() as u16 {
            Some((data, 0))
        } else {
            decode_syndrome(data, s)
        }
    }
}

/// The core matrix used to create the generator and syndrome matrices. It's
/// usually cyclic, but not in the case of P25.
const CORE: [u32; 12] = [
    0b101001001111,
    0b111101101000,
    0b011110110100,
    0b001111011010,
    0b000111101101,
    0b101010111001,
    0b111100010011,
    0b110111000110,
    0b011011100011,
    0b100100111110,
    0b010010011111,
    0b110001110101,
];

/// The core matrix and its transpose are equal if it's cyclic, but that's
/// not the case here.
const CORE_XPOSE: [u32; 12] = [
    0b110001110101,
    0b011000111011,
    0b111101101000,
    0b011110110100,
    0b001111011010,
    0b110110011001,
    0b011011001101,
    0b001101100111,
    0b110111000110,
    0b101010010111,
    0b100100111110,
    0b100011101011,
];

/// The core matrix with the LSB of each row removed.
const CORE_SHORT: [u32; 11] = [
    0b101001001111,
    0b111101101000,
    0b011110110100,
    0b001111011010,
    0b000111101101,
    0b101010111001,
    0b111100010011,
    0b110111000110,
    0b011011100011,
    0b100100111110,
    0b010010011111,
];

/// Syndrome/parity-check matrix.
const PAR: [u32; 12] = [
    0b100000000000110001110101,
    0b010000000000011000111011,
    0b001000000000111101101000,
    0b000100000000011110110100,
    0b000010000000001111011010,
    0b000001000000110110011001,
    0b000000100000011011001101,
    0b000000010000001101100111,
    0b000000001000110111000110,
    0b000000000100101010010111,
    0b000000000010100100111110,
    0b000000000001100011101011,
];

/// Try to correct errors in the given data bits using the given first-level
/// syndrome.
fn decode_syndrome(data: u16, s: u16) -> Option<(u16, usize)> {
    decode_parity(s, &CORE)
        .map(|(a, _)| (data ^ a, a.count_ones() as usize))
        .or_else(|| {
            decode_parity(syndrome_12(s), &CORE_XPOSE)
                .map(|(_, b)| (data ^ b, b.count_ones() as usize))
        })
}

/// Try to find an error pattern for the given syndrome using the rows from
/// the given matrix.
fn decode_parity(s: u16, matrix: &[u32; 12]) -> Option<(u16, u16)> {
    if s.count_ones() <= 3 {
        return Some((s, 0));
    }

    for (i, sum) in matrix.iter().map(|&row| s ^ row as u16).enumerate() {
        if sum.count_ones() <= 2 {
            return Some((sum, 1 << (12 - i - 1)));
        }
    }

    None
}

/// Calculate the first-level syndrome.
fn syndrome_24(word: u32) -> u16 {
    matrix_mul(word, &PAR) as u16
}

/// Calculate the second-level syndrome.
fn syndrome_12(syn: u16) -> u16 {
    matrix_mul(u32::from(syn), &CORE) as u16
}

/// Extract the data bits from the given 24-bit codeword.
fn word_data(word: u32) -> u16 {
    (word >> 12) as u16
}
