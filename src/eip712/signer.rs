//! EIP-712 Signing
//!
//! ECDSA signing and recovery over signing digests. The hashing core never
//! touches key material; it hands a digest to an [`EcdsaSigner`].

use super::encoder::keccak256;
use super::signature::{split, Eip712Signature};
use super::typed_data::TypedData;
use crate::error::{Eip712Error, Eip712Result};
use crate::utils::hex_format::{decode_hex, decode_hex_array, encode_hex, encode_hex_prefixed};
use crate::utils::signing_config::Eip712Config;
use crate::{log_debug, log_warn};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};
use zeroize::Zeroizing;

const MODULE: &str = "eip712::signer";

/// Signing collaborator for digests produced by the hasher
pub trait EcdsaSigner {
    /// Address controlled by `private_key`
    fn derive_address(&self, private_key: &[u8]) -> Eip712Result<[u8; 20]>;

    /// Sign a 32-byte digest
    fn sign(&self, digest: &[u8; 32], private_key: &[u8]) -> Eip712Result<Eip712Signature>;

    /// Address that produced `signature` (65 packed bytes) over `digest`
    fn recover(&self, digest: &[u8; 32], signature: &[u8]) -> Eip712Result<[u8; 20]>;
}

/// secp256k1 signer with RFC 6979 deterministic nonces
#[derive(Debug, Clone)]
pub struct Secp256k1Signer {
    secp: Secp256k1<All>,
    config: Eip712Config,
}

impl Default for Secp256k1Signer {
    fn default() -> Self {
        Self::new()
    }
}

impl Secp256k1Signer {
    pub fn new() -> Self {
        Self::with_config(Eip712Config::standard())
    }

    pub fn with_config(config: Eip712Config) -> Self {
        Self {
            secp: Secp256k1::new(),
            config,
        }
    }

    pub fn config(&self) -> &Eip712Config {
        &self.config
    }
}

impl EcdsaSigner for Secp256k1Signer {
    fn derive_address(&self, private_key: &[u8]) -> Eip712Result<[u8; 20]> {
        let secret_key = secret_key(private_key).map_err(Eip712Error::InvalidPrivateKey)?;
        let public_key = PublicKey::from_secret_key(&self.secp, &secret_key);
        Ok(public_key_to_address(&public_key))
    }

    fn sign(&self, digest: &[u8; 32], private_key: &[u8]) -> Eip712Result<Eip712Signature> {
        let secret_key = secret_key(private_key).map_err(Eip712Error::SigningError)?;
        let message = Message::from_digest(*digest);

        let (recovery_id, compact) = self
            .secp
            .sign_ecdsa_recoverable(&message, &secret_key)
            .serialize_compact();

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&compact[0..32]);
        s.copy_from_slice(&compact[32..64]);

        let raw_v = u8::try_from(recovery_id.to_i32())
            .map_err(|_| Eip712Error::SigningError("recovery id out of range".to_string()))?;
        let signature = Eip712Signature::new(r, s, raw_v + self.config.v_convention.offset());

        log_debug!(
            MODULE,
            "digest signed",
            digest = encode_hex_prefixed(digest),
            signer = checksum_address(&public_key_to_address(&PublicKey::from_secret_key(&self.secp, &secret_key))),
        );
        Ok(signature)
    }

    fn recover(&self, digest: &[u8; 32], signature: &[u8]) -> Eip712Result<[u8; 20]> {
        let (r, s, v) = split(signature)?;
        let signature = Eip712Signature::new(r, s, v);

        if self.config.require_low_s && !signature.is_low_s() {
            log_warn!(MODULE, "rejected high-s signature", digest = encode_hex_prefixed(digest));
            return Err(Eip712Error::RecoveryError(
                "s is above half the curve order".to_string(),
            ));
        }

        let recovery_id = RecoveryId::from_i32(i32::from(signature.recovery_id()?))?;
        let mut compact = [0u8; 64];
        compact[0..32].copy_from_slice(&signature.r);
        compact[32..64].copy_from_slice(&signature.s);

        let recoverable = RecoverableSignature::from_compact(&compact, recovery_id)?;
        let public_key = self
            .secp
            .recover_ecdsa(&Message::from_digest(*digest), &recoverable)
            .map_err(|e| {
                log_warn!(MODULE, "recovery failed", digest = encode_hex_prefixed(digest));
                Eip712Error::RecoveryError(e.to_string())
            })?;

        let address = public_key_to_address(&public_key);
        log_debug!(MODULE, "signer recovered", signer = checksum_address(&address));
        Ok(address)
    }
}

fn secret_key(private_key: &[u8]) -> Result<SecretKey, String> {
    if private_key.len() != 32 {
        return Err(format!(
            "invalid private key length: expected 32, got {}",
            private_key.len()
        ));
    }
    SecretKey::from_slice(private_key).map_err(|e| e.to_string())
}

/// Decode a hex private key into a buffer wiped on drop
pub fn parse_private_key(input: &str) -> Eip712Result<Zeroizing<[u8; 32]>> {
    let bytes = Zeroizing::new(
        decode_hex(input).map_err(|_| Eip712Error::InvalidPrivateKey("not valid hex".to_string()))?,
    );
    if bytes.len() != 32 {
        return Err(Eip712Error::InvalidPrivateKey(format!(
            "invalid private key length: expected 32, got {}",
            bytes.len()
        )));
    }

    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&bytes);
    secret_key(&key[..]).map_err(Eip712Error::InvalidPrivateKey)?;
    Ok(key)
}

/// Convert a secp256k1 public key to an Ethereum address
pub fn public_key_to_address(public_key: &PublicKey) -> [u8; 20] {
    // Uncompressed point without the 0x04 tag
    let pubkey_bytes = public_key.serialize_uncompressed();
    let hash = keccak256(&pubkey_bytes[1..]);

    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..32]);
    address
}

/// Compute the EIP-55 checksum address
pub fn checksum_address(address: &[u8; 20]) -> String {
    let hex_addr = encode_hex(address);
    let hash = keccak256(hex_addr.as_bytes());

    let mut checksummed = String::with_capacity(42);
    checksummed.push_str("0x");

    for (i, c) in hex_addr.chars().enumerate() {
        // High nibble for even positions, low nibble for odd
        let nibble = if i % 2 == 0 { hash[i / 2] >> 4 } else { hash[i / 2] & 0x0f };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            checksummed.push(c.to_ascii_uppercase());
        } else {
            checksummed.push(c);
        }
    }

    checksummed
}

/// Sign a pre-computed hash with standard settings
pub fn sign_hash(hash: &[u8; 32], private_key: &[u8]) -> Eip712Result<Eip712Signature> {
    Secp256k1Signer::new().sign(hash, private_key)
}

/// Recover the signer's checksummed address from a signature
pub fn recover_address(hash: &[u8; 32], signature: &Eip712Signature) -> Eip712Result<String> {
    let address = Secp256k1Signer::new().recover(hash, &signature.to_bytes())?;
    Ok(checksum_address(&address))
}

/// Verify a signature against a hash and expected address
///
/// The expected address is compared as bytes, so checksum casing is ignored.
pub fn verify_signature(
    hash: &[u8; 32],
    signature: &Eip712Signature,
    expected_address: &str,
) -> Eip712Result<bool> {
    let expected: [u8; 20] = decode_hex_array(expected_address)?;
    let recovered = Secp256k1Signer::new().recover(hash, &signature.to_bytes())?;
    Ok(expected == recovered)
}

/// Sign EIP-712 typed data
pub fn sign_typed_data(typed_data: &TypedData, private_key: &[u8]) -> Eip712Result<Eip712Signature> {
    let hash = typed_data.hash()?;
    sign_hash(&hash, private_key)
}

/// Verify an EIP-712 signature
///
/// Returns true if the signature is valid for the given address.
pub fn verify_typed_data(
    typed_data: &TypedData,
    signature: &Eip712Signature,
    expected_address: &str,
) -> Eip712Result<bool> {
    let hash = typed_data.hash()?;
    verify_signature(&hash, signature, expected_address)
}
