//! Signature Codec
//!
//! Packed 65-byte `r || s || v` signatures and their components.

use crate::error::{Eip712Error, Eip712Result};
use crate::utils::hex_format::{decode_hex, encode_hex_prefixed};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Length of a packed signature
pub const SIGNATURE_LENGTH: usize = 65;

/// Half the secp256k1 group order; EIP-2 requires `s <= SECP256K1_HALF_ORDER`
pub const SECP256K1_HALF_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b, 0x20, 0xa0,
];

/// Split a packed signature into `(r, s, v)`
///
/// `v` is returned exactly as stored in the last byte.
pub fn split(sig: &[u8]) -> Eip712Result<([u8; 32], [u8; 32], u8)> {
    if sig.len() != SIGNATURE_LENGTH {
        return Err(Eip712Error::InvalidSignatureLength(sig.len()));
    }

    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&sig[0..32]);
    s.copy_from_slice(&sig[32..64]);

    Ok((r, s, sig[64]))
}

/// Pack `r`, `s` and `v` into a 65-byte signature
pub fn join(r: &[u8], s: &[u8], v: u8) -> Eip712Result<[u8; SIGNATURE_LENGTH]> {
    if r.len() != 32 {
        return Err(Eip712Error::InvalidComponentLength {
            component: "r",
            len: r.len(),
        });
    }
    if s.len() != 32 {
        return Err(Eip712Error::InvalidComponentLength {
            component: "s",
            len: s.len(),
        });
    }

    let mut sig = [0u8; SIGNATURE_LENGTH];
    sig[0..32].copy_from_slice(r);
    sig[32..64].copy_from_slice(s);
    sig[64] = v;
    Ok(sig)
}

/// Form of the recovery identifier byte
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VConvention {
    /// 0 or 1
    Raw,
    /// 27 or 28
    #[default]
    Ethereum,
}

impl VConvention {
    /// Offset added to a raw recovery id
    pub fn offset(self) -> u8 {
        match self {
            Self::Raw => 0,
            Self::Ethereum => 27,
        }
    }
}

/// EIP-712 signature components
#[derive(Debug, Clone, PartialEq, Eq, Zeroize)]
#[zeroize(drop)]
pub struct Eip712Signature {
    /// r component (32 bytes)
    pub r: [u8; 32],
    /// s component (32 bytes)
    pub s: [u8; 32],
    /// v component (recovery id, typically 27 or 28)
    pub v: u8,
}

impl Eip712Signature {
    /// Create from raw components
    pub fn new(r: [u8; 32], s: [u8; 32], v: u8) -> Self {
        Self { r, s, v }
    }

    /// Create from 65-byte signature (r || s || v)
    pub fn from_bytes(bytes: &[u8]) -> Eip712Result<Self> {
        let (r, s, v) = split(bytes)?;
        Ok(Self { r, s, v })
    }

    /// Convert to 65-byte representation (r || s || v)
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LENGTH] {
        let mut bytes = [0u8; SIGNATURE_LENGTH];
        bytes[0..32].copy_from_slice(&self.r);
        bytes[32..64].copy_from_slice(&self.s);
        bytes[64] = self.v;
        bytes
    }

    /// Parse a hex signature, with or without `0x`
    pub fn from_hex(input: &str) -> Eip712Result<Self> {
        Self::from_bytes(&decode_hex(input)?)
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        encode_hex_prefixed(self.to_bytes())
    }

    /// Raw recovery id (0 or 1)
    ///
    /// Both conventions are accepted; any other `v` is rejected rather than
    /// guessed at.
    pub fn recovery_id(&self) -> Eip712Result<u8> {
        match self.v {
            0 | 1 => Ok(self.v),
            27 | 28 => Ok(self.v - 27),
            other => Err(Eip712Error::RecoveryError(format!(
                "unsupported recovery identifier {}",
                other
            ))),
        }
    }

    /// Re-express `v` in the given convention
    pub fn with_v_convention(&self, convention: VConvention) -> Eip712Result<Self> {
        let v = self.recovery_id()? + convention.offset();
        Ok(Self::new(self.r, self.s, v))
    }

    /// Whether `s` is in the lower half of the curve order
    pub fn is_low_s(&self) -> bool {
        // Big-endian arrays compare like the numbers they encode
        self.s <= SECP256K1_HALF_ORDER
    }
}
