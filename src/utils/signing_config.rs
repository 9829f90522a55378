//! Hashing and Signing Configuration
//!
//! Immutable settings passed to the encoder and signer:
//! - Name of the domain struct type
//! - Value nesting limit
//! - Recovery identifier convention
//! - Low-`s` enforcement on recovery

use crate::eip712::signature::VConvention;
use crate::eip712::types::is_valid_struct_name;
use crate::error::{Eip712Error, Eip712Result};
use serde::{Deserialize, Serialize};

/// Default domain struct type name
pub const DEFAULT_DOMAIN_TYPE: &str = "EIP712Domain";

/// Default maximum nesting depth of struct/array values
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Settings for hashing and signing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Eip712Config {
    /// Struct type hashed into the domain separator
    pub domain_type: String,
    /// Maximum nesting depth of struct/array values while encoding
    pub max_depth: usize,
    /// Form of `v` emitted by the signer
    pub v_convention: VConvention,
    /// Reject signatures with `s` above half the curve order on recovery
    pub require_low_s: bool,
}

impl Default for Eip712Config {
    fn default() -> Self {
        Self::standard()
    }
}

impl Eip712Config {
    /// Standard settings: 27/28 recovery ids, malleable `s` accepted
    pub fn standard() -> Self {
        Self {
            domain_type: DEFAULT_DOMAIN_TYPE.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            v_convention: VConvention::Ethereum,
            require_low_s: false,
        }
    }

    /// Strict settings: shallower nesting and EIP-2 low-`s` only
    pub fn strict() -> Self {
        Self {
            max_depth: 16,
            require_low_s: true,
            ..Self::standard()
        }
    }

    pub fn with_domain_type(mut self, domain_type: impl Into<String>) -> Self {
        self.domain_type = domain_type.into();
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_v_convention(mut self, v_convention: VConvention) -> Self {
        self.v_convention = v_convention;
        self
    }

    pub fn with_low_s(mut self, require_low_s: bool) -> Self {
        self.require_low_s = require_low_s;
        self
    }

    /// Parse settings from JSON; missing keys take standard values
    pub fn from_json(json: &str) -> Eip712Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the settings
    pub fn validate(&self) -> Eip712Result<()> {
        if self.max_depth == 0 {
            return Err(Eip712Error::InvalidConfig(
                "max_depth must be at least 1".to_string(),
            ));
        }

        if !is_valid_struct_name(&self.domain_type) {
            return Err(Eip712Error::InvalidConfig(format!(
                "domain type {:?} is not a valid type name",
                self.domain_type
            )));
        }

        Ok(())
    }
}
