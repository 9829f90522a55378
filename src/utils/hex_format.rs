//! Hex formatting at the crate boundary
//!
//! Output is always lowercase with no separators. Input may carry a `0x`/`0X`
//! prefix and must have an even number of digits.

use crate::error::{Eip712Error, Eip712Result};

/// Strip an optional `0x`/`0X` prefix
pub fn strip_hex_prefix(input: &str) -> &str {
    input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input)
}

/// Lowercase hex, no prefix
pub fn encode_hex(bytes: impl AsRef<[u8]>) -> String {
    hex::encode(bytes)
}

/// Lowercase hex with a `0x` prefix
pub fn encode_hex_prefixed(bytes: impl AsRef<[u8]>) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decode a hex string (with or without 0x prefix)
pub fn decode_hex(input: &str) -> Eip712Result<Vec<u8>> {
    let clean = strip_hex_prefix(input);

    if !clean.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Eip712Error::InvalidHex(format!(
            "non-hex character in {:?}",
            input
        )));
    }

    if clean.len() % 2 != 0 {
        return Err(Eip712Error::InvalidHex(
            "hex string must have even number of characters".to_string(),
        ));
    }

    Ok(hex::decode(clean)?)
}

/// Decode a hex string into exactly `N` bytes
pub fn decode_hex_array<const N: usize>(input: &str) -> Eip712Result<[u8; N]> {
    let bytes = decode_hex(input)?;
    bytes.as_slice().try_into().map_err(|_| {
        Eip712Error::InvalidHex(format!("expected {} bytes, got {}", N, bytes.len()))
    })
}
