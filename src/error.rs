//! Unified error types for typed-data hashing and signing
//!
//! Every fallible operation in the crate returns [`Eip712Error`]. Errors are
//! plain values: nothing is coerced, truncated or retried on the caller's
//! behalf.

use serde::{Deserialize, Serialize};

/// Errors that can occur during EIP-712 operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Eip712Error {
    #[error("Duplicate type: {0}")]
    DuplicateType(String),

    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Unknown type `{field_type}` for field {type_name}.{field}")]
    UnknownFieldType {
        type_name: String,
        field: String,
        field_type: String,
    },

    #[error("Invalid type name: {0}")]
    InvalidTypeName(String),

    #[error("Type {0} references itself without an array boundary")]
    CyclicType(String),

    #[error("Schema mismatch for {type_name}: {reason}")]
    SchemaMismatch { type_name: String, reason: String },

    #[error("Value at {path} does not match type {expected}: {reason}")]
    ValueTypeMismatch {
        path: String,
        expected: String,
        reason: String,
    },

    #[error("Value nesting exceeds depth limit of {0}")]
    DepthLimitExceeded(usize),

    #[error("Invalid signature length: expected 65 bytes, got {0}")]
    InvalidSignatureLength(usize),

    #[error("Invalid {component} length: expected 32 bytes, got {len}")]
    InvalidComponentLength { component: &'static str, len: usize },

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Signing error: {0}")]
    SigningError(String),

    #[error("Recovery error: {0}")]
    RecoveryError(String),

    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Eip712Error {
    pub(crate) fn schema(type_name: &str, reason: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            type_name: type_name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn mismatch(
        path: &str,
        expected: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::ValueTypeMismatch {
            path: path.to_string(),
            expected: expected.to_string(),
            reason: reason.into(),
        }
    }

    /// Coarse category of this error, stable across message wording changes
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::DuplicateType(_)
            | Self::UnknownType(_)
            | Self::UnknownFieldType { .. }
            | Self::InvalidTypeName(_)
            | Self::CyclicType(_) => ErrorCode::SchemaError,
            Self::SchemaMismatch { .. }
            | Self::ValueTypeMismatch { .. }
            | Self::DepthLimitExceeded(_) => ErrorCode::ValueError,
            Self::InvalidSignatureLength(_) | Self::InvalidComponentLength { .. } => {
                ErrorCode::SignatureFormat
            }
            Self::InvalidPrivateKey(_) => ErrorCode::InvalidPrivateKey,
            Self::SigningError(_) => ErrorCode::SigningFailed,
            Self::RecoveryError(_) => ErrorCode::RecoveryFailed,
            Self::InvalidHex(_) => ErrorCode::HexError,
            Self::InvalidJson(_) => ErrorCode::JsonError,
            Self::InvalidConfig(_) => ErrorCode::ConfigError,
        }
    }
}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Schema errors
    SchemaError,

    // Value errors
    ValueError,

    // Signature errors
    SignatureFormat,
    InvalidPrivateKey,
    SigningFailed,
    RecoveryFailed,

    // Parse errors
    HexError,
    JsonError,

    ConfigError,
}

/// Result type alias for EIP-712 operations
pub type Eip712Result<T> = Result<T, Eip712Error>;

// Conversions from common error types

impl From<serde_json::Error> for Eip712Error {
    fn from(e: serde_json::Error) -> Self {
        Eip712Error::InvalidJson(e.to_string())
    }
}

impl From<hex::FromHexError> for Eip712Error {
    fn from(e: hex::FromHexError) -> Self {
        Eip712Error::InvalidHex(e.to_string())
    }
}

impl From<secp256k1::Error> for Eip712Error {
    fn from(e: secp256k1::Error) -> Self {
        Eip712Error::RecoveryError(format!("secp256k1: {}", e))
    }
}
