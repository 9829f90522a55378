//! EIP-712 Values
//!
//! A tagged value tree checked against the declared field types at encode
//! time, plus schema-directed conversion from the JSON shape used by
//! `eth_signTypedData` payloads.

use super::registry::TypeRegistry;
use super::types::{PrimitiveKind, TypeRef};
use crate::error::{Eip712Error, Eip712Result};
use crate::utils::hex_format::{decode_hex, strip_hex_prefix};
use crate::utils::signing_config::Eip712Config;
use ethers_core::types::{I256, U256};
use std::collections::BTreeMap;

/// A dynamically typed field value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Non-negative integer, up to 256 bits
    Uint(U256),
    /// Signed integer, two's complement 256-bit
    Int(I256),
    /// Raw bytes: `address` (20 bytes), `bytesN` or `bytes`
    Bytes(Vec<u8>),
    String(String),
    Bool(bool),
    /// Nested struct, keyed by field name
    Record(BTreeMap<String, Value>),
    /// Fixed or dynamic array
    Array(Vec<Value>),
}

impl Value {
    pub fn uint(value: impl Into<U256>) -> Self {
        Self::Uint(value.into())
    }

    pub fn int(value: i64) -> Self {
        Self::Int(signed(value))
    }

    pub fn address(address: [u8; 20]) -> Self {
        Self::Bytes(address.to_vec())
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(bytes.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    pub fn record<K: Into<String>>(fields: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Self::Array(items.into_iter().collect())
    }

    /// Shape name used in mismatch errors
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Uint(_) => "unsigned integer",
            Self::Int(_) => "signed integer",
            Self::Bytes(_) => "bytes",
            Self::String(_) => "string",
            Self::Bool(_) => "bool",
            Self::Record(_) => "record",
            Self::Array(_) => "array",
        }
    }

    /// Convert a JSON value into the shape declared by `ty`
    ///
    /// Integers accept JSON numbers, decimal strings and `0x` hex strings;
    /// byte types accept hex strings. Nothing is truncated: out-of-range
    /// input fails with `ValueTypeMismatch`.
    pub fn from_json(
        registry: &TypeRegistry,
        ty: &TypeRef,
        json: &serde_json::Value,
    ) -> Eip712Result<Self> {
        if let Some(name) = ty.struct_name() {
            registry.check_closure(name)?;
        }
        let reader = JsonReader::new(registry, Eip712Config::standard().max_depth);
        reader.value_at(ty, json, &ty.to_string(), 0)
    }

    /// Convert a JSON object into a record of struct type `type_name`
    pub fn record_from_json(
        registry: &TypeRegistry,
        type_name: &str,
        json: &serde_json::Value,
    ) -> Eip712Result<Self> {
        Self::record_from_json_with(registry, type_name, json, Eip712Config::standard().max_depth)
    }

    /// Like [`record_from_json`](Self::record_from_json) with an explicit
    /// nesting limit, counted the same way as the encoder counts it
    pub fn record_from_json_with(
        registry: &TypeRegistry,
        type_name: &str,
        json: &serde_json::Value,
        max_depth: usize,
    ) -> Eip712Result<Self> {
        registry.check_closure(type_name)?;
        JsonReader::new(registry, max_depth).record_at(type_name, json, type_name, 1)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::Uint(U256::from(value))
    }
}

impl From<U256> for Value {
    fn from(value: U256) -> Self {
        Self::Uint(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::int(value)
    }
}

impl From<I256> for Value {
    fn from(value: I256) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<[u8; 20]> for Value {
    fn from(value: [u8; 20]) -> Self {
        Self::address(value)
    }
}

impl From<[u8; 32]> for Value {
    fn from(value: [u8; 32]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

/// Schema-directed JSON conversion bounded by a nesting limit
struct JsonReader<'a> {
    registry: &'a TypeRegistry,
    max_depth: usize,
}

impl<'a> JsonReader<'a> {
    fn new(registry: &'a TypeRegistry, max_depth: usize) -> Self {
        Self { registry, max_depth }
    }

    fn check_depth(&self, depth: usize) -> Eip712Result<()> {
        if depth > self.max_depth {
            return Err(Eip712Error::DepthLimitExceeded(self.max_depth));
        }
        Ok(())
    }

    fn value_at(
        &self,
        ty: &TypeRef,
        json: &serde_json::Value,
        path: &str,
        depth: usize,
    ) -> Eip712Result<Value> {
        match ty {
            TypeRef::Array { element, length } => {
                self.check_depth(depth + 1)?;

                let items = json
                    .as_array()
                    .ok_or_else(|| Eip712Error::mismatch(path, ty, format!("expected array, got {}", json)))?;
                if let Some(n) = length {
                    if items.len() != *n {
                        return Err(Eip712Error::mismatch(
                            path,
                            ty,
                            format!("expected {} elements, got {}", n, items.len()),
                        ));
                    }
                }
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.value_at(element, item, &format!("{}[{}]", path, i), depth + 1))
                    .collect::<Eip712Result<Vec<_>>>()
                    .map(Value::Array)
            }
            TypeRef::Struct(name) => self.record_at(name, json, path, depth + 1),
            TypeRef::Primitive(kind) => primitive_from_json(*kind, json, path),
        }
    }

    fn record_at(
        &self,
        type_name: &str,
        json: &serde_json::Value,
        path: &str,
        depth: usize,
    ) -> Eip712Result<Value> {
        self.check_depth(depth)?;

        let obj = json.as_object().ok_or_else(|| {
            Eip712Error::mismatch(path, type_name, format!("expected object, got {}", json))
        })?;
        let fields = self.registry.resolve(type_name)?;

        if let Some(extra) = obj.keys().find(|k| !fields.iter().any(|f| &f.name == *k)) {
            return Err(Eip712Error::schema(type_name, format!("unexpected field {}", extra)));
        }

        let mut record = BTreeMap::new();
        for field in fields {
            let field_json = obj
                .get(&field.name)
                .ok_or_else(|| Eip712Error::schema(type_name, format!("missing field {}", field.name)))?;
            let field_path = format!("{}.{}", path, field.name);
            record.insert(
                field.name.clone(),
                self.value_at(&field.ty, field_json, &field_path, depth)?,
            );
        }

        Ok(Value::Record(record))
    }
}

fn primitive_from_json(kind: PrimitiveKind, json: &serde_json::Value, path: &str) -> Eip712Result<Value> {
    let mismatch = |reason: String| Eip712Error::mismatch(path, kind, reason);

    match kind {
        PrimitiveKind::Uint(_) => parse_uint(json).map(Value::Uint).map_err(mismatch),
        PrimitiveKind::Int(_) => parse_int(json).map(Value::Int).map_err(mismatch),
        PrimitiveKind::Bool => json
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| mismatch(format!("expected boolean, got {}", json))),
        PrimitiveKind::String => json
            .as_str()
            .map(|s| Value::string(s))
            .ok_or_else(|| mismatch(format!("expected string, got {}", json))),
        PrimitiveKind::Address | PrimitiveKind::FixedBytes(_) | PrimitiveKind::Bytes => {
            let hex_str = json
                .as_str()
                .ok_or_else(|| mismatch(format!("expected hex string, got {}", json)))?;
            decode_hex(hex_str)
                .map(Value::Bytes)
                .map_err(|e| mismatch(e.to_string()))
        }
    }
}

/// Parse a uint value (supports decimal string, hex string, or number)
fn parse_uint(json: &serde_json::Value) -> Result<U256, String> {
    match json {
        serde_json::Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| format!("{} is not a non-negative integer", n)),
        serde_json::Value::String(s) => parse_magnitude(s),
        other => Err(format!("expected integer, got {}", other)),
    }
}

/// Parse a signed int value; a leading `-` negates decimal or hex input
fn parse_int(json: &serde_json::Value) -> Result<I256, String> {
    match json {
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(signed)
            .or_else(|| n.as_u64().map(|u| I256::from_raw(U256::from(u))))
            .ok_or_else(|| format!("{} is not an integer", n)),
        serde_json::Value::String(s) => {
            let (negative, body) = match s.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, s.as_str()),
            };
            let magnitude = parse_magnitude(body)?;
            let limit = U256::one() << 255;

            if negative {
                if magnitude > limit {
                    return Err(format!("{} is below the 256-bit signed range", s));
                }
                Ok(I256::from_raw(negate(magnitude)))
            } else {
                if magnitude >= limit {
                    return Err(format!("{} exceeds the 256-bit signed range", s));
                }
                Ok(I256::from_raw(magnitude))
            }
        }
        other => Err(format!("expected integer, got {}", other)),
    }
}

/// Two's complement negation in 256 bits
fn negate(magnitude: U256) -> U256 {
    (!magnitude).overflowing_add(U256::one()).0
}

pub(crate) fn signed(value: i64) -> I256 {
    let magnitude = U256::from(value.unsigned_abs());
    if value < 0 {
        I256::from_raw(negate(magnitude))
    } else {
        I256::from_raw(magnitude)
    }
}

/// Decimal or `0x` hex digits into a 256-bit magnitude
fn parse_magnitude(s: &str) -> Result<U256, String> {
    let is_hex = s.starts_with("0x") || s.starts_with("0X");

    if is_hex {
        let digits = strip_hex_prefix(s);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("{:?} is not a hex integer", s));
        }
        let significant = digits.trim_start_matches('0');
        if significant.len() > 64 {
            return Err(format!("{} exceeds 256 bits", s));
        }
        let padded = format!("{:0>64}", significant);
        let bytes = hex::decode(padded).map_err(|e| e.to_string())?;
        return Ok(U256::from_big_endian(&bytes));
    }

    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("{:?} is not a decimal integer", s));
    }
    U256::from_dec_str(s).map_err(|_| format!("{} exceeds 256 bits", s))
}

#[cfg(test)]
mod value_tests {
    use super::*;
    use serde_json::json;

    fn permit_registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry
            .register_parsed(
                "Permit",
                &[
                    ("owner", "address"),
                    ("spender", "address"),
                    ("value", "uint256"),
                    ("nonce", "uint256"),
                    ("deadline", "uint256"),
                ],
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_record_from_json() {
        let registry = permit_registry();
        let value = Value::record_from_json(
            &registry,
            "Permit",
            &json!({
                "owner": "0xcfdfcdf4e30cf2c9caa2c239677c8d42ad7d67de",
                "spender": "0x0D1d31abea2384b0D5add552E3a9b9F66d57e141",
                "value": "0xffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff",
                "nonce": 0,
                "deadline": "1000"
            }),
        )
        .unwrap();

        let Value::Record(fields) = value else {
            panic!("expected record");
        };
        assert_eq!(fields["value"], Value::Uint(U256::MAX));
        assert_eq!(fields["nonce"], Value::uint(0u64));
        assert_eq!(fields["deadline"], Value::uint(1000u64));
        assert!(matches!(&fields["owner"], Value::Bytes(b) if b.len() == 20));
    }

    #[test]
    fn test_over_wide_literal_rejected() {
        let ty = TypeRef::uint(256);
        let registry = TypeRegistry::new();
        let wide = json!("0xffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff");
        let err = Value::from_json(&registry, &ty, &wide).unwrap_err();
        assert!(matches!(err, Eip712Error::ValueTypeMismatch { .. }));

        // Leading zeros do not count towards the width
        let padded = json!("0x0000ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff");
        assert_eq!(Value::from_json(&registry, &ty, &padded).unwrap(), Value::Uint(U256::MAX));

        let decimal_overflow = json!(
            "115792089237316195423570985008687907853269984665640564039457584007913129639936"
        );
        assert!(Value::from_json(&registry, &ty, &decimal_overflow).is_err());
    }

    #[test]
    fn test_missing_and_extra_fields() {
        let registry = permit_registry();
        let missing = json!({
            "owner": "0xcfdfcdf4e30cf2c9caa2c239677c8d42ad7d67de",
            "spender": "0x0D1d31abea2384b0D5add552E3a9b9F66d57e141",
            "value": 1,
            "nonce": 0
        });
        assert!(matches!(
            Value::record_from_json(&registry, "Permit", &missing),
            Err(Eip712Error::SchemaMismatch { .. })
        ));

        let mut extra = missing.clone();
        extra["deadline"] = json!(1);
        extra["memo"] = json!("hi");
        assert!(matches!(
            Value::record_from_json(&registry, "Permit", &extra),
            Err(Eip712Error::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_signed_integers() {
        let registry = TypeRegistry::new();
        let ty = TypeRef::int(256);
        assert_eq!(Value::from_json(&registry, &ty, &json!(-1)).unwrap(), Value::int(-1));
        assert_eq!(Value::from_json(&registry, &ty, &json!("-42")).unwrap(), Value::int(-42));
        assert_eq!(Value::from_json(&registry, &ty, &json!("0x10")).unwrap(), Value::int(16));
        assert!(Value::from_json(&registry, &TypeRef::uint(8), &json!(-1)).is_err());
        assert!(Value::from_json(&registry, &ty, &json!(1.5)).is_err());
    }

    #[test]
    fn test_fixed_array_length_checked() {
        let registry = TypeRegistry::new();
        let ty: TypeRef = "bool[2]".parse().unwrap();
        let err = Value::from_json(&registry, &ty, &json!([true])).unwrap_err();
        assert!(matches!(err, Eip712Error::ValueTypeMismatch { ref path, .. } if path == "bool[2]"));

        let nested: TypeRef = "uint8[][]".parse().unwrap();
        let err = Value::from_json(&registry, &nested, &json!([[1], [2, "x"]])).unwrap_err();
        assert!(matches!(err, Eip712Error::ValueTypeMismatch { ref path, .. } if path == "uint8[][][1][1]"));
    }

    #[test]
    fn test_json_nesting_is_bounded() {
        let mut registry = TypeRegistry::new();
        registry
            .register_parsed("Node", &[("label", "string"), ("children", "Node[]")])
            .unwrap();

        let mut node = json!({"label": "leaf", "children": []});
        for _ in 0..4 {
            node = json!({"label": "inner", "children": [node]});
        }

        assert_eq!(
            Value::record_from_json_with(&registry, "Node", &node, 4).unwrap_err(),
            Eip712Error::DepthLimitExceeded(4)
        );
        assert!(Value::record_from_json(&registry, "Node", &node).is_ok());

        for _ in 0..64 {
            node = json!({"label": "inner", "children": [node]});
        }
        assert_eq!(
            Value::record_from_json(&registry, "Node", &node).unwrap_err(),
            Eip712Error::DepthLimitExceeded(Eip712Config::standard().max_depth)
        );
    }

    #[test]
    fn test_bool_is_strict() {
        let registry = TypeRegistry::new();
        assert!(Value::from_json(&registry, &TypeRef::bool(), &json!("true")).is_err());
        assert!(Value::from_json(&registry, &TypeRef::bool(), &json!(1)).is_err());
    }
}
