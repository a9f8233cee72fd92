//! Forward error correction used by the P25 voice and link-signaling
//! layers: shortened and standard Hamming codes plus the (23, 12, 7) Golay
//! code protecting IMBE parameter words.

pub mod golay;
pub mod hamming;

/// Parity of the bits selected by `row` in `word`.
fn parity(word: u32, row: u32) -> u32 {
    (word & row).count_ones() & 1
}

/// Multiply `word` by the binary matrix given as `rows`, producing one
/// output bit per row (first row most significant).
pub(crate) fn matrix_mul(word: u32, rows: &[u32]) -> u32 {
    rows.iter().fold(0, |acc, &row| acc << 1 | parity(word, row))
}

/// Systematic encode: append one parity bit per row after the data bits.
pub(crate) fn matrix_mul_systematic(data: u32, rows: &[u32]) -> u32 {
    rows.iter()
        .fold(data, |acc, &row| acc << 1 | parity(data, row))
}
