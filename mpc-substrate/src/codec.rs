//! Textual wire layout shared by every party.
//!
//! Field elements inside a vector are written as decimal text and joined with
//! [`ELEMENT_SEPARATOR`]; matrix rows are joined with [`ROW_SEPARATOR`]. The
//! layout has to match bit-for-bit across parties, so both directions live here.

use crate::errors::MpcError;

use itertools::Itertools;
use num_bigint::BigUint;

/// Separates the elements of a vector.
pub const ELEMENT_SEPARATOR: u8 = b'.';
/// Separates the rows of a matrix.
pub const ROW_SEPARATOR: u8 = b';';

/// Joins already encoded parts with a single separator byte.
///
/// # Example
///
/// ```
/// # use mpc_substrate::codec::join_parts;
/// let parts = vec![b"12".to_vec(), b"0".to_vec(), b"7".to_vec()];
/// assert_eq!(join_parts(parts, b'.'), b"12.0.7".to_vec());
/// ```
pub fn join_parts<I>(parts: I, separator: u8) -> Vec<u8>
where
    I: IntoIterator<Item = Vec<u8>>,
{
    let mut out = Vec::new();
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            out.push(separator);
        }
        out.extend_from_slice(&part);
    }
    out
}

/// Splits an encoded buffer on `separator`. An empty buffer has no parts.
pub fn split_parts(bytes: &[u8], separator: u8) -> Vec<&[u8]> {
    if bytes.is_empty() {
        return Vec::new();
    }
    bytes.split(|&b| b == separator).collect()
}

/// Parses one decimal token into an arbitrary-precision integer.
///
/// Leading signs, whitespace and empty tokens are rejected.
pub fn parse_decimal(token: &[u8]) -> Result<BigUint, MpcError> {
    if token.is_empty() || !token.iter().all(u8::is_ascii_digit) {
        return Err(MpcError::Decode(format!(
            "expected a decimal integer, got {:?}",
            String::from_utf8_lossy(token)
        )));
    }
    BigUint::parse_bytes(token, 10).ok_or_else(|| {
        MpcError::Decode(format!(
            "invalid decimal integer {:?}",
            String::from_utf8_lossy(token)
        ))
    })
}

/// Renders values through their `Display` impl and joins them with `separator`.
pub fn join_display<T, I>(values: I, separator: u8) -> Vec<u8>
where
    T: std::fmt::Display,
    I: IntoIterator<Item = T>,
{
    values
        .into_iter()
        .join(&(separator as char).to_string())
        .into_bytes()
}
