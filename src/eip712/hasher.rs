//! EIP-712 Hashing
//!
//! Implements domain separator and signing digest computation.

use super::encoder::{keccak256, TypedDataEncoder};
use super::registry::TypeRegistry;
use super::types::{TypeField, TypeRef};
use super::value::Value;
use crate::error::Eip712Result;
use crate::log_debug;
use crate::utils::hex_format::encode_hex_prefixed;
use crate::utils::signing_config::DEFAULT_DOMAIN_TYPE;
use ethers_core::types::U256;

/// Magic prefix for EIP-712 encoding
pub const EIP712_PREFIX: &[u8] = b"\x19\x01";

const MODULE: &str = "eip712::hasher";

/// Pre-image components (for external signing)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eip712PreImage {
    pub domain_separator: [u8; 32],
    pub struct_hash: [u8; 32],
    pub final_hash: [u8; 32],
}

impl Eip712PreImage {
    pub fn new(domain_separator: [u8; 32], struct_hash: [u8; 32]) -> Self {
        Self {
            domain_separator,
            struct_hash,
            final_hash: signing_digest_from_parts(&domain_separator, &struct_hash),
        }
    }
}

/// hash = keccak256("\x19\x01" || domainSeparator || hashStruct(message))
pub fn signing_digest_from_parts(domain_separator: &[u8; 32], struct_hash: &[u8; 32]) -> [u8; 32] {
    let mut data = Vec::with_capacity(2 + 32 + 32);
    data.extend_from_slice(EIP712_PREFIX);
    data.extend_from_slice(domain_separator);
    data.extend_from_slice(struct_hash);
    keccak256(&data)
}

impl<'a> TypedDataEncoder<'a> {
    /// Hash the domain record and the primary message
    ///
    /// The domain struct type is the one named in the encoder settings.
    pub fn pre_image(
        &self,
        domain: &Value,
        primary_type: &str,
        message: &Value,
    ) -> Eip712Result<Eip712PreImage> {
        self.pre_image_with_domain_type(&self.config().domain_type, domain, primary_type, message)
    }

    /// Like [`pre_image`](Self::pre_image) with an explicit domain type name
    pub fn pre_image_with_domain_type(
        &self,
        domain_type: &str,
        domain: &Value,
        primary_type: &str,
        message: &Value,
    ) -> Eip712Result<Eip712PreImage> {
        // Both closures are checked before either hash is computed
        self.registry().check_closure(domain_type)?;
        self.registry().check_closure(primary_type)?;

        let domain_separator = self.hash_struct(domain_type, domain)?;
        let struct_hash = self.hash_struct(primary_type, message)?;
        let pre_image = Eip712PreImage::new(domain_separator, struct_hash);

        log_debug!(
            MODULE,
            "signing digest computed",
            primary_type = primary_type,
            domain_separator = encode_hex_prefixed(domain_separator),
            digest = encode_hex_prefixed(pre_image.final_hash),
        );
        Ok(pre_image)
    }

    /// The only digest ever handed to a signer
    pub fn signing_digest(
        &self,
        domain: &Value,
        primary_type: &str,
        message: &Value,
    ) -> Eip712Result<[u8; 32]> {
        Ok(self.pre_image(domain, primary_type, message)?.final_hash)
    }
}

/// Calculate the pre-image components for EIP-712
pub fn pre_image(
    registry: &TypeRegistry,
    domain_type: &str,
    domain: &Value,
    primary_type: &str,
    message: &Value,
) -> Eip712Result<Eip712PreImage> {
    TypedDataEncoder::new(registry).pre_image_with_domain_type(domain_type, domain, primary_type, message)
}

/// Calculate the final EIP-712 hash for signing
pub fn signing_digest(
    registry: &TypeRegistry,
    domain_type: &str,
    domain: &Value,
    primary_type: &str,
    message: &Value,
) -> Eip712Result<[u8; 32]> {
    Ok(pre_image(registry, domain_type, domain, primary_type, message)?.final_hash)
}

/// The conventional EIP-712 domain separator data
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Eip712Domain {
    /// The human-readable name of the signing domain
    pub name: Option<String>,
    /// The current major version of the signing domain
    pub version: Option<String>,
    /// The EIP-155 chain ID
    pub chain_id: Option<U256>,
    /// The address of the contract that will verify the signature
    pub verifying_contract: Option<[u8; 20]>,
    /// An optional disambiguating salt
    pub salt: Option<[u8; 32]>,
}

impl Eip712Domain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_chain_id(mut self, chain_id: impl Into<U256>) -> Self {
        self.chain_id = Some(chain_id.into());
        self
    }

    pub fn with_verifying_contract(mut self, address: [u8; 20]) -> Self {
        self.verifying_contract = Some(address);
        self
    }

    pub fn with_salt(mut self, salt: [u8; 32]) -> Self {
        self.salt = Some(salt);
        self
    }

    /// Domain type fields for the values present, in canonical order
    pub fn fields(&self) -> Vec<TypeField> {
        let mut fields = Vec::new();

        if self.name.is_some() {
            fields.push(TypeField::new("name", TypeRef::string()));
        }
        if self.version.is_some() {
            fields.push(TypeField::new("version", TypeRef::string()));
        }
        if self.chain_id.is_some() {
            fields.push(TypeField::new("chainId", TypeRef::uint(256)));
        }
        if self.verifying_contract.is_some() {
            fields.push(TypeField::new("verifyingContract", TypeRef::address()));
        }
        if self.salt.is_some() {
            fields.push(TypeField::new("salt", TypeRef::fixed_bytes(32)));
        }

        fields
    }

    /// Domain record matching [`fields`](Self::fields)
    pub fn to_value(&self) -> Value {
        let mut record = Vec::new();

        if let Some(ref name) = self.name {
            record.push(("name", Value::string(name.clone())));
        }
        if let Some(ref version) = self.version {
            record.push(("version", Value::string(version.clone())));
        }
        if let Some(chain_id) = self.chain_id {
            record.push(("chainId", Value::Uint(chain_id)));
        }
        if let Some(address) = self.verifying_contract {
            record.push(("verifyingContract", Value::address(address)));
        }
        if let Some(salt) = self.salt {
            record.push(("salt", Value::from(salt)));
        }

        Value::record(record)
    }

    /// Add the `EIP712Domain` type for this domain to a registry
    pub fn register(&self, registry: &mut TypeRegistry) -> Eip712Result<()> {
        registry.register(DEFAULT_DOMAIN_TYPE, self.fields())
    }

    /// domainSeparator = hashStruct(eip712Domain)
    pub fn separator(&self) -> Eip712Result<[u8; 32]> {
        let mut registry = TypeRegistry::new();
        self.register(&mut registry)?;
        TypedDataEncoder::new(&registry).hash_struct(DEFAULT_DOMAIN_TYPE, &self.to_value())
    }

    /// Pre-image of `message` under this domain
    ///
    /// `registry` holds the message types and must not define its own
    /// `EIP712Domain`.
    pub fn pre_image(
        &self,
        registry: &TypeRegistry,
        primary_type: &str,
        message: &Value,
    ) -> Eip712Result<Eip712PreImage> {
        let domain_separator = self.separator()?;
        let struct_hash = TypedDataEncoder::new(registry).hash_struct(primary_type, message)?;
        Ok(Eip712PreImage::new(domain_separator, struct_hash))
    }
}

#[cfg(test)]
mod hasher_tests {
    use super::*;
    use crate::utils::hex_format::decode_hex_array;

    fn mail_domain() -> Eip712Domain {
        Eip712Domain::new()
            .with_name("Ether Mail")
            .with_version("1")
            .with_chain_id(1u64)
            .with_verifying_contract(decode_hex_array("0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC").unwrap())
    }

    fn mail_types() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry
            .register_parsed("Mail", &[("from", "Person"), ("to", "Person"), ("contents", "string")])
            .unwrap();
        registry
            .register_parsed("Person", &[("name", "string"), ("wallet", "address")])
            .unwrap();
        registry
    }

    fn mail_message() -> Value {
        let person = |name: &str, wallet: &str| {
            Value::record([
                ("name", Value::from(name)),
                ("wallet", Value::address(decode_hex_array(wallet).unwrap())),
            ])
        };
        Value::record([
            ("from", person("Cow", "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826")),
            ("to", person("Bob", "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB")),
            ("contents", Value::from("Hello, Bob!")),
        ])
    }

    #[test]
    fn test_domain_separator() {
        let separator = mail_domain().separator().unwrap();
        assert_eq!(
            hex::encode(separator),
            "f2cee375fa42b42143804025fc449deafd50cc031ca257e0b194a650a912090f"
        );
    }

    #[test]
    fn test_signing_digest_mail() {
        let mut registry = mail_types();
        mail_domain().register(&mut registry).unwrap();

        let digest = signing_digest(
            &registry,
            "EIP712Domain",
            &mail_domain().to_value(),
            "Mail",
            &mail_message(),
        )
        .unwrap();

        // Mail example digest from EIP-712
        assert_eq!(
            hex::encode(digest),
            "be609aee343fb3c4b28e1df9e632fca64fcfaede20f02e86244efddf30957bd2"
        );
    }

    #[test]
    fn test_domain_pre_image_matches_registry_path() {
        let registry = mail_types();
        let pre_image = mail_domain().pre_image(&registry, "Mail", &mail_message()).unwrap();

        assert_eq!(
            hex::encode(pre_image.struct_hash),
            "c52c0ee5d84264471806290a3f2c4cecfc5490626bf912d01f240d7a274b371e"
        );
        assert_eq!(
            pre_image.final_hash,
            signing_digest_from_parts(&pre_image.domain_separator, &pre_image.struct_hash)
        );
    }

    #[test]
    fn test_domain_fields_follow_presence() {
        let domain = Eip712Domain::new().with_name("Test").with_chain_id(1u64);
        let names: Vec<_> = domain.fields().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["name", "chainId"]);

        let empty = Eip712Domain::new();
        assert!(empty.fields().is_empty());
        assert!(empty.separator().is_ok());
    }

    #[test]
    fn test_unknown_primary_type_fails_before_hashing() {
        let mut registry = mail_types();
        mail_domain().register(&mut registry).unwrap();
        let err = signing_digest(&registry, "EIP712Domain", &mail_domain().to_value(), "Order", &mail_message())
            .unwrap_err();
        assert_eq!(err, crate::error::Eip712Error::UnknownType("Order".to_string()));
    }
}
