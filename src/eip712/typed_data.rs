//! Typed Data Documents
//!
//! The JSON payload accepted by `eth_signTypedData_v4`:
//! `{ types, primaryType, domain, message }`.

use super::encoder::TypedDataEncoder;
use super::hasher::Eip712PreImage;
use super::registry::TypeRegistry;
use super::types::{TypeField, TypeRef};
use super::value::Value;
use crate::error::{Eip712Error, Eip712Result};
use crate::log_debug;
use crate::utils::signing_config::Eip712Config;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const MODULE: &str = "eip712::typed_data";

/// Domain keys in the order the derived domain type lists them
const DOMAIN_FIELDS: [(&str, &str); 5] = [
    ("name", "string"),
    ("version", "string"),
    ("chainId", "uint256"),
    ("verifyingContract", "address"),
    ("salt", "bytes32"),
];

/// Complete EIP-712 typed data structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedData {
    /// Type definitions (struct name -> fields)
    pub types: BTreeMap<String, Vec<TypeField>>,
    /// The primary type being signed
    pub primary_type: String,
    /// Domain values, keyed by domain field name
    pub domain: serde_json::Value,
    /// The message values
    pub message: serde_json::Value,
}

impl TypedData {
    /// Parse from JSON string
    pub fn from_json(json: &str) -> Eip712Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Eip712Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Registry of the declared types, with `EIP712Domain` as the domain type
    pub fn registry(&self) -> Eip712Result<TypeRegistry> {
        self.registry_for(&Eip712Config::standard().domain_type)
    }

    /// Registry of the declared types
    ///
    /// If `domain_type` is not declared it is derived from the keys present
    /// in `domain`.
    pub fn registry_for(&self, domain_type: &str) -> Eip712Result<TypeRegistry> {
        let mut registry = TypeRegistry::try_from(self.types.clone())?;
        if !registry.contains(domain_type) {
            registry.register(domain_type, self.derived_domain_fields(domain_type)?)?;
        }
        Ok(registry)
    }

    fn derived_domain_fields(&self, domain_type: &str) -> Eip712Result<Vec<TypeField>> {
        let keys = self.domain.as_object().ok_or_else(|| {
            Eip712Error::schema(domain_type, format!("domain must be an object, got {}", self.domain))
        })?;

        DOMAIN_FIELDS
            .iter()
            .filter(|(name, _)| keys.contains_key(*name))
            .map(|(name, type_name)| TypeField::parse(*name, type_name))
            .collect()
    }

    /// Check the schema and every value against its declared type
    ///
    /// Accepts exactly the documents [`hash`](Self::hash) accepts.
    pub fn validate(&self) -> Eip712Result<()> {
        self.validate_with(&Eip712Config::standard())
    }

    pub fn validate_with(&self, config: &Eip712Config) -> Eip712Result<()> {
        let registry = self.registry_for(&config.domain_type)?;
        registry.validate()?;
        let (domain, message) = self.records(&registry, config)?;

        // Widths and byte lengths are only enforced while encoding
        let encoder = TypedDataEncoder::with_config(&registry, config.clone());
        encoder.hash_struct(&config.domain_type, &domain)?;
        encoder.hash_struct(&self.primary_type, &message)?;
        Ok(())
    }

    /// Domain record converted against `domain_type`
    pub fn domain_value(&self, registry: &TypeRegistry, domain_type: &str) -> Eip712Result<Value> {
        Value::record_from_json(registry, domain_type, &self.domain)
    }

    /// Message record converted against the primary type
    pub fn message_value(&self, registry: &TypeRegistry) -> Eip712Result<Value> {
        Value::record_from_json(registry, &self.primary_type, &self.message)
    }

    fn records(&self, registry: &TypeRegistry, config: &Eip712Config) -> Eip712Result<(Value, Value)> {
        let domain = Value::record_from_json_with(registry, &config.domain_type, &self.domain, config.max_depth)?;
        let message = Value::record_from_json_with(registry, &self.primary_type, &self.message, config.max_depth)?;
        Ok((domain, message))
    }

    /// Type of a single message field, for callers inspecting the payload
    pub fn field_type(&self, type_name: &str, field: &str) -> Option<&TypeRef> {
        self.types
            .get(type_name)?
            .iter()
            .find(|f| f.name == field)
            .map(|f| &f.ty)
    }

    /// Pre-image components with standard settings
    pub fn pre_image(&self) -> Eip712Result<Eip712PreImage> {
        self.pre_image_with(&Eip712Config::standard())
    }

    pub fn pre_image_with(&self, config: &Eip712Config) -> Eip712Result<Eip712PreImage> {
        let registry = self.registry_for(&config.domain_type)?;
        let (domain, message) = self.records(&registry, config)?;

        log_debug!(
            MODULE,
            "hashing typed data",
            primary_type = self.primary_type,
            types = registry.len(),
        );

        TypedDataEncoder::with_config(&registry, config.clone()).pre_image(&domain, &self.primary_type, &message)
    }

    /// The digest to sign
    pub fn hash(&self) -> Eip712Result<[u8; 32]> {
        Ok(self.pre_image()?.final_hash)
    }

    pub fn hash_with(&self, config: &Eip712Config) -> Eip712Result<[u8; 32]> {
        Ok(self.pre_image_with(config)?.final_hash)
    }
}
