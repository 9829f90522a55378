//! EIP-712 Typed Data Hashing and Signing
//!
//! Computes the canonical digest of typed, structured messages under the
//! EIP-712 scheme and produces or parses ECDSA signatures over it.
//!
//! # Architecture
//!
//! This crate provides:
//! - **eip712**: type registry, type/struct encoding, domain hashing,
//!   typed-data documents, the signature codec and a secp256k1 signer
//! - **utils**: hex formatting at the boundary, structured logging and
//!   hashing/signing configuration
//! - **error**: the shared error type
//!
//! # Security
//!
//! This crate uses `zeroize` to clear private keys and signatures from
//! memory when they are dropped.
//!
//! # Example
//!
//! ```rust,ignore
//! use eip712_signer::{Eip712Domain, TypeRegistry, TypedDataEncoder, Value};
//!
//! let mut registry = TypeRegistry::new();
//! registry.register_parsed("Person", &[("name", "string"), ("wallet", "address")])?;
//!
//! let domain = Eip712Domain::new().with_name("Ether Mail").with_chain_id(1u64);
//! let pre_image = domain.pre_image(&registry, "Person", &person)?;
//! println!("digest: 0x{}", hex::encode(pre_image.final_hash));
//! ```

pub mod error;
pub mod eip712;
pub mod utils;

// Re-export key types for convenience
pub use error::{Eip712Error, Eip712Result, ErrorCode};

pub use eip712::{
    checksum_address,
    join,
    keccak256,
    split,
    EcdsaSigner,
    Eip712Domain,
    Eip712PreImage,
    Eip712Signature,
    PrimitiveKind,
    Secp256k1Signer,
    TypeField,
    TypeRef,
    TypeRegistry,
    TypedData,
    TypedDataEncoder,
    VConvention,
    Value,
};

pub use utils::signing_config::Eip712Config;
