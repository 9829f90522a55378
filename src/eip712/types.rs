//! EIP-712 Type Definitions
//!
//! Parsed field types. Type strings such as `uint256`, `bytes32`, `Person`
//! or `Item[2][]` are parsed once into [`TypeRef`] and rendered back
//! canonically when building type signatures.

use crate::error::{Eip712Error, Eip712Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Built-in (non-struct) EIP-712 types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// `uintN`, N in 8..=256 step 8
    Uint(u16),
    /// `intN`, N in 8..=256 step 8
    Int(u16),
    /// `bytesN`, N in 1..=32
    FixedBytes(u8),
    /// 20-byte account address
    Address,
    Bool,
    /// Variable-length `bytes`
    Bytes,
    String,
}

impl PrimitiveKind {
    /// Parse a primitive type name; `None` for anything else
    pub fn parse(type_name: &str) -> Option<Self> {
        match type_name {
            "address" => return Some(Self::Address),
            "bool" => return Some(Self::Bool),
            "bytes" => return Some(Self::Bytes),
            "string" => return Some(Self::String),
            _ => {}
        }

        if let Some(bits) = type_name.strip_prefix("uint") {
            return parse_width(bits).map(Self::Uint);
        }
        if let Some(bits) = type_name.strip_prefix("int") {
            return parse_width(bits).map(Self::Int);
        }
        if let Some(size) = type_name.strip_prefix("bytes") {
            let n = parse_canonical_number(size)?;
            return (1..=32).contains(&n).then_some(Self::FixedBytes(n as u8));
        }

        None
    }

    /// Whether the encoding of this kind is a hash of its contents
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Bytes | Self::String)
    }
}

fn parse_width(bits: &str) -> Option<u16> {
    let n = parse_canonical_number(bits)?;
    (n > 0 && n <= 256 && n % 8 == 0).then_some(n as u16)
}

/// Decimal digits with no sign and no leading zero
fn parse_canonical_number(digits: &str) -> Option<usize> {
    if digits.is_empty() || digits.starts_with('0') {
        return None;
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uint(bits) => write!(f, "uint{}", bits),
            Self::Int(bits) => write!(f, "int{}", bits),
            Self::FixedBytes(n) => write!(f, "bytes{}", n),
            Self::Address => f.write_str("address"),
            Self::Bool => f.write_str("bool"),
            Self::Bytes => f.write_str("bytes"),
            Self::String => f.write_str("string"),
        }
    }
}

/// A field type: primitive, named struct, or array of either
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Primitive(PrimitiveKind),
    Struct(String),
    Array {
        element: Box<TypeRef>,
        /// `Some(n)` for `T[n]`, `None` for `T[]`
        length: Option<usize>,
    },
}

impl TypeRef {
    pub fn uint(bits: u16) -> Self {
        Self::Primitive(PrimitiveKind::Uint(bits))
    }

    pub fn int(bits: u16) -> Self {
        Self::Primitive(PrimitiveKind::Int(bits))
    }

    pub fn fixed_bytes(n: u8) -> Self {
        Self::Primitive(PrimitiveKind::FixedBytes(n))
    }

    pub fn address() -> Self {
        Self::Primitive(PrimitiveKind::Address)
    }

    pub fn bool() -> Self {
        Self::Primitive(PrimitiveKind::Bool)
    }

    pub fn bytes() -> Self {
        Self::Primitive(PrimitiveKind::Bytes)
    }

    pub fn string() -> Self {
        Self::Primitive(PrimitiveKind::String)
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::Struct(name.into())
    }

    /// `T[]`
    pub fn array_of(element: TypeRef) -> Self {
        Self::Array {
            element: Box::new(element),
            length: None,
        }
    }

    /// `T[n]`
    pub fn fixed_array_of(element: TypeRef, length: usize) -> Self {
        Self::Array {
            element: Box::new(element),
            length: Some(length),
        }
    }

    /// The innermost non-array type
    /// e.g. `Person[][2]` -> `Person`
    pub fn base(&self) -> &TypeRef {
        match self {
            Self::Array { element, .. } => element.base(),
            other => other,
        }
    }

    /// Struct name referenced by this type after stripping arrays
    pub fn struct_name(&self) -> Option<&str> {
        match self.base() {
            Self::Struct(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array { .. })
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(kind) => fmt::Display::fmt(kind, f),
            Self::Struct(name) => f.write_str(name),
            Self::Array {
                element,
                length: Some(n),
            } => write!(f, "{}[{}]", element, n),
            Self::Array {
                element,
                length: None,
            } => write!(f, "{}[]", element),
        }
    }
}

impl FromStr for TypeRef {
    type Err = Eip712Error;

    fn from_str(type_name: &str) -> Result<Self, Self::Err> {
        let invalid = || Eip712Error::InvalidTypeName(type_name.to_string());

        // Arrays nest left to right: `T[2][]` is a dynamic array of `T[2]`
        if let Some(stripped) = type_name.strip_suffix(']') {
            let open = stripped.rfind('[').ok_or_else(invalid)?;
            let element = &stripped[..open];
            let length = match &stripped[open + 1..] {
                "" => None,
                digits => Some(parse_canonical_number(digits).ok_or_else(invalid)?),
            };
            if element.is_empty() {
                return Err(invalid());
            }
            return Ok(Self::Array {
                element: Box::new(element.parse()?),
                length,
            });
        }

        if let Some(kind) = PrimitiveKind::parse(type_name) {
            return Ok(Self::Primitive(kind));
        }

        if is_valid_struct_name(type_name) {
            return Ok(Self::Struct(type_name.to_string()));
        }

        Err(invalid())
    }
}

impl Serialize for TypeRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TypeRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Check that a name can be used for a struct type
///
/// Identifiers follow Solidity rules and may not collide with, or look like,
/// a primitive type name (`uint257` is rejected rather than treated as a
/// struct reference).
pub fn is_valid_struct_name(name: &str) -> bool {
    let mut chars = name.chars();
    let first_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$');
    if !first_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
        return false;
    }

    if PrimitiveKind::parse(name).is_some() {
        return false;
    }

    let numeric_suffix = |prefix: &str| {
        name.strip_prefix(prefix)
            .map(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
            .unwrap_or(false)
    };
    !(numeric_suffix("uint") || numeric_suffix("int") || numeric_suffix("bytes"))
}

/// A field in a struct type definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypeField {
    /// The name of the field
    pub name: String,
    /// The type of the field
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

impl TypeField {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    /// Build a field from a type string such as `"uint256"` or `"Person[]"`
    pub fn parse(name: impl Into<String>, type_name: &str) -> Eip712Result<Self> {
        Ok(Self::new(name, type_name.parse()?))
    }
}

#[cfg(test)]
mod type_tests {
    use super::*;

    #[test]
    fn test_primitive_types() {
        assert_eq!(PrimitiveKind::parse("address"), Some(PrimitiveKind::Address));
        assert_eq!(PrimitiveKind::parse("bool"), Some(PrimitiveKind::Bool));
        assert_eq!(PrimitiveKind::parse("uint256"), Some(PrimitiveKind::Uint(256)));
        assert_eq!(PrimitiveKind::parse("uint8"), Some(PrimitiveKind::Uint(8)));
        assert_eq!(PrimitiveKind::parse("int256"), Some(PrimitiveKind::Int(256)));
        assert_eq!(PrimitiveKind::parse("bytes32"), Some(PrimitiveKind::FixedBytes(32)));
        assert_eq!(PrimitiveKind::parse("bytes1"), Some(PrimitiveKind::FixedBytes(1)));
        assert_eq!(PrimitiveKind::parse("bytes"), Some(PrimitiveKind::Bytes));
        assert_eq!(PrimitiveKind::parse("string"), Some(PrimitiveKind::String));

        assert_eq!(PrimitiveKind::parse("uint"), None);
        assert_eq!(PrimitiveKind::parse("uint257"), None);
        assert_eq!(PrimitiveKind::parse("uint7"), None);
        assert_eq!(PrimitiveKind::parse("uint0256"), None);
        assert_eq!(PrimitiveKind::parse("bytes33"), None);
        assert_eq!(PrimitiveKind::parse("bytes0"), None);
        assert_eq!(PrimitiveKind::parse("Person"), None);
    }

    #[test]
    fn test_parse_arrays() {
        let ty: TypeRef = "uint256[2][]".parse().unwrap();
        assert_eq!(
            ty,
            TypeRef::array_of(TypeRef::fixed_array_of(TypeRef::uint(256), 2))
        );
        assert_eq!(ty.to_string(), "uint256[2][]");
        assert_eq!(ty.base(), &TypeRef::uint(256));

        let people: TypeRef = "Person[]".parse().unwrap();
        assert_eq!(people.struct_name(), Some("Person"));
        assert!(people.is_array());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "[]", "Person[", "Person]", "uint256[x]", "uint256[0]", "uint256[01]", "my type", "uint257"] {
            assert!(bad.parse::<TypeRef>().is_err(), "{:?} should not parse", bad);
        }
    }

    #[test]
    fn test_struct_names() {
        assert!(is_valid_struct_name("Permit"));
        assert!(is_valid_struct_name("EIP712Domain"));
        assert!(is_valid_struct_name("_Inner$1"));
        assert!(is_valid_struct_name("uintX"));

        assert!(!is_valid_struct_name("uint256"));
        assert!(!is_valid_struct_name("uint257"));
        assert!(!is_valid_struct_name("bytes99"));
        assert!(!is_valid_struct_name("1Permit"));
        assert!(!is_valid_struct_name("Per mit"));
        assert!(!is_valid_struct_name(""));
    }

    #[test]
    fn test_field_serde() {
        let field: TypeField = serde_json::from_str(r#"{"name": "owner", "type": "address"}"#).unwrap();
        assert_eq!(field, TypeField::new("owner", TypeRef::address()));

        let json = serde_json::to_string(&TypeField::parse("items", "Item[3]").unwrap()).unwrap();
        assert_eq!(json, r#"{"name":"items","type":"Item[3]"}"#);

        assert!(serde_json::from_str::<TypeField>(r#"{"name": "x", "type": "uint7"}"#).is_err());
    }
}
