//! EIP-712 Typed Data Signing
//!
//! Implementation of EIP-712 typed structured data hashing and signing.
//! A [`TypeRegistry`] holds the struct schema; [`TypedDataEncoder`] turns a
//! schema plus a [`Value`] record into type hashes, struct hashes and the
//! final signing digest, which an [`EcdsaSigner`] signs.
//!
//! # Reference
//! - <https://eips.ethereum.org/EIPS/eip-712>
//!
//! # Example
//! ```rust,ignore
//! use eip712_signer::eip712::{TypedData, sign_typed_data};
//!
//! let typed_data = TypedData::from_json(json_string)?;
//! let hash = typed_data.hash()?;
//! let signature = sign_typed_data(&typed_data, &private_key)?;
//! ```

pub mod types;
pub mod registry;
pub mod value;
pub mod encoder;
pub mod hasher;
pub mod typed_data;
pub mod signature;
pub mod signer;

pub use types::*;
pub use registry::*;
pub use value::*;
pub use encoder::*;
pub use hasher::*;
pub use typed_data::*;
pub use signature::*;
pub use signer::*;
