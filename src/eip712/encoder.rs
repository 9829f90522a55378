//! EIP-712 Type Encoding
//!
//! Implements `encodeType`, `typeHash`, `encodeData` and `hashStruct`.
//! Every field encodes to exactly one 32-byte slot.

use super::registry::TypeRegistry;
use super::types::{PrimitiveKind, TypeField, TypeRef};
use super::value::Value;
use crate::error::{Eip712Error, Eip712Result};
use crate::log_debug;
use crate::utils::hex_format::encode_hex_prefixed;
use crate::utils::signing_config::Eip712Config;
use ethers_core::types::{I256, U256};
use std::collections::BTreeMap;
use tiny_keccak::{Hasher, Keccak};

const MODULE: &str = "eip712::encoder";

/// Type hashes already computed during one top-level encode
type TypeHashes = BTreeMap<String, [u8; 32]>;

/// Compute keccak256 hash
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    output
}

/// Schema-driven encoder over an immutable registry
///
/// Cheap to construct; holds only a borrow of the registry and a copy of the
/// settings, so independent encoders may run on separate threads.
#[derive(Debug, Clone)]
pub struct TypedDataEncoder<'a> {
    registry: &'a TypeRegistry,
    config: Eip712Config,
}

impl<'a> TypedDataEncoder<'a> {
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self {
            registry,
            config: Eip712Config::default(),
        }
    }

    pub fn with_config(registry: &'a TypeRegistry, config: Eip712Config) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    pub fn config(&self) -> &Eip712Config {
        &self.config
    }

    /// Encode a type string for a struct type
    ///
    /// Format: `Name(type1 name1,type2 name2,...)` followed by every other
    /// struct type it reaches, each once, sorted by name.
    pub fn encode_type(&self, type_name: &str) -> Eip712Result<String> {
        self.registry.check_closure(type_name)?;
        self.encode_type_unchecked(type_name)
    }

    /// typeHash = keccak256(encodeType(type))
    pub fn type_hash(&self, type_name: &str) -> Eip712Result<[u8; 32]> {
        let encoded = self.encode_type(type_name)?;
        Ok(keccak256(encoded.as_bytes()))
    }

    /// Concatenated 32-byte field slots of a record, without the type hash
    pub fn encode_data(&self, type_name: &str, record: &Value) -> Eip712Result<Vec<u8>> {
        self.registry.check_closure(type_name)?;
        self.encode_data_at(type_name, record, type_name, 1, &mut TypeHashes::new())
    }

    /// hashStruct(s) = keccak256(typeHash || encodeData(s))
    pub fn hash_struct(&self, type_name: &str, record: &Value) -> Eip712Result<[u8; 32]> {
        self.registry.check_closure(type_name)?;
        let hash = self.hash_struct_at(type_name, record, type_name, 1, &mut TypeHashes::new())?;

        log_debug!(
            MODULE,
            "struct hashed",
            type_name = type_name,
            struct_hash = encode_hex_prefixed(hash),
        );
        Ok(hash)
    }

    /// Encode a single value of type `ty` into its 32-byte slot
    pub fn encode_field(&self, ty: &TypeRef, value: &Value) -> Eip712Result<[u8; 32]> {
        if let Some(name) = ty.struct_name() {
            self.registry.check_closure(name)?;
        }
        self.encode_value_at(ty, value, &ty.to_string(), 0, &mut TypeHashes::new())
    }

    fn hash_struct_at(
        &self,
        type_name: &str,
        record: &Value,
        path: &str,
        depth: usize,
        hashes: &mut TypeHashes,
    ) -> Eip712Result<[u8; 32]> {
        let data = self.encode_data_at(type_name, record, path, depth, hashes)?;

        let type_hash = match hashes.get(type_name) {
            Some(hash) => *hash,
            None => {
                let hash = self.type_hash_unchecked(type_name)?;
                hashes.insert(type_name.to_string(), hash);
                hash
            }
        };

        let mut buf = Vec::with_capacity(32 + data.len());
        buf.extend_from_slice(&type_hash);
        buf.extend_from_slice(&data);
        Ok(keccak256(&buf))
    }

    fn encode_type_unchecked(&self, type_name: &str) -> Eip712Result<String> {
        let dependencies = self.registry.dependencies(type_name)?;
        let mut result = format_type_string(type_name, self.registry.resolve(type_name)?);

        // BTreeSet iterates in lexicographic order
        for dep in dependencies.into_iter().filter(|dep| *dep != type_name) {
            result.push_str(&format_type_string(dep, self.registry.resolve(dep)?));
        }

        Ok(result)
    }

    fn type_hash_unchecked(&self, type_name: &str) -> Eip712Result<[u8; 32]> {
        let encoded = self.encode_type_unchecked(type_name)?;
        Ok(keccak256(encoded.as_bytes()))
    }

    fn encode_data_at(
        &self,
        type_name: &str,
        record: &Value,
        path: &str,
        depth: usize,
        hashes: &mut TypeHashes,
    ) -> Eip712Result<Vec<u8>> {
        self.check_depth(depth)?;

        let Value::Record(values) = record else {
            return Err(Eip712Error::mismatch(
                path,
                type_name,
                format!("expected record, got {}", record.kind_name()),
            ));
        };
        let fields = self.registry.resolve(type_name)?;

        // Presence is checked for the whole record before any field is encoded
        if let Some(missing) = fields.iter().find(|f| !values.contains_key(&f.name)) {
            return Err(Eip712Error::schema(type_name, format!("missing field {}", missing.name)));
        }
        if let Some(extra) = values.keys().find(|k| !fields.iter().any(|f| &f.name == *k)) {
            return Err(Eip712Error::schema(type_name, format!("unexpected field {}", extra)));
        }

        let mut encoded = Vec::with_capacity(fields.len() * 32);
        for field in fields {
            let field_path = format!("{}.{}", path, field.name);
            let slot = self.encode_value_at(&field.ty, &values[&field.name], &field_path, depth, hashes)?;
            encoded.extend_from_slice(&slot);
        }

        Ok(encoded)
    }

    fn encode_value_at(
        &self,
        ty: &TypeRef,
        value: &Value,
        path: &str,
        depth: usize,
        hashes: &mut TypeHashes,
    ) -> Eip712Result<[u8; 32]> {
        match ty {
            TypeRef::Primitive(kind) => encode_primitive(*kind, value, path),
            TypeRef::Struct(name) => self.hash_struct_at(name, value, path, depth + 1, hashes),
            TypeRef::Array { element, length } => {
                self.check_depth(depth + 1)?;

                let Value::Array(items) = value else {
                    return Err(Eip712Error::mismatch(
                        path,
                        ty,
                        format!("expected array, got {}", value.kind_name()),
                    ));
                };
                if let Some(n) = length {
                    if items.len() != *n {
                        return Err(Eip712Error::mismatch(
                            path,
                            ty,
                            format!("expected {} elements, got {}", n, items.len()),
                        ));
                    }
                }

                let mut encoded = Vec::with_capacity(items.len() * 32);
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{}[{}]", path, i);
                    encoded.extend_from_slice(&self.encode_value_at(element, item, &item_path, depth + 1, hashes)?);
                }
                Ok(keccak256(&encoded))
            }
        }
    }

    fn check_depth(&self, depth: usize) -> Eip712Result<()> {
        if depth > self.config.max_depth {
            return Err(Eip712Error::DepthLimitExceeded(self.config.max_depth));
        }
        Ok(())
    }
}

/// Format a single type string
fn format_type_string(type_name: &str, fields: &[TypeField]) -> String {
    let field_strs: Vec<String> = fields
        .iter()
        .map(|f| format!("{} {}", f.ty, f.name))
        .collect();

    format!("{}({})", type_name, field_strs.join(","))
}

/// Encode an atomic or dynamic value into its slot
fn encode_primitive(kind: PrimitiveKind, value: &Value, path: &str) -> Eip712Result<[u8; 32]> {
    let mut slot = [0u8; 32];
    let wrong_shape = || {
        Eip712Error::mismatch(path, kind, format!("unexpected {}", value.kind_name()))
    };

    match (kind, value) {
        // uintN - big-endian, left-padded
        (PrimitiveKind::Uint(bits), Value::Uint(n)) => {
            check_uint_width(*n, bits, path, kind)?;
            n.to_big_endian(&mut slot);
        }
        (PrimitiveKind::Uint(bits), Value::Int(n)) => {
            if n.is_negative() {
                return Err(Eip712Error::mismatch(path, kind, "negative value"));
            }
            check_uint_width(n.into_raw(), bits, path, kind)?;
            n.into_raw().to_big_endian(&mut slot);
        }

        // intN - two's complement, sign-extended
        (PrimitiveKind::Int(bits), Value::Int(n)) => {
            check_int_width(*n, bits, path, kind)?;
            n.into_raw().to_big_endian(&mut slot);
        }
        (PrimitiveKind::Int(bits), Value::Uint(n)) => {
            // Non-negative, so the top bit of the N-bit range must stay clear
            check_uint_width(*n, bits - 1, path, kind)?;
            n.to_big_endian(&mut slot);
        }

        (PrimitiveKind::Bool, Value::Bool(b)) => {
            slot[31] = u8::from(*b);
        }

        // address - 20 bytes, left-padded to 32
        (PrimitiveKind::Address, Value::Bytes(bytes)) => {
            if bytes.len() != 20 {
                return Err(Eip712Error::mismatch(
                    path,
                    kind,
                    format!("expected 20 bytes, got {}", bytes.len()),
                ));
            }
            slot[12..].copy_from_slice(bytes);
        }

        // bytesN - exactly N bytes, right-padded to 32
        (PrimitiveKind::FixedBytes(n), Value::Bytes(bytes)) => {
            if bytes.len() != n as usize {
                return Err(Eip712Error::mismatch(
                    path,
                    kind,
                    format!("expected {} bytes, got {}", n, bytes.len()),
                ));
            }
            slot[..bytes.len()].copy_from_slice(bytes);
        }

        // Dynamic types are hashed
        (PrimitiveKind::Bytes, Value::Bytes(bytes)) => slot = keccak256(bytes),
        (PrimitiveKind::String, Value::String(s)) => slot = keccak256(s.as_bytes()),

        _ => return Err(wrong_shape()),
    }

    Ok(slot)
}

fn check_uint_width(n: U256, bits: u16, path: &str, kind: PrimitiveKind) -> Eip712Result<()> {
    if n.bits() > bits as usize {
        return Err(Eip712Error::mismatch(
            path,
            kind,
            format!("{} does not fit in {} bits", n, bits),
        ));
    }
    Ok(())
}

fn check_int_width(n: I256, bits: u16, path: &str, kind: PrimitiveKind) -> Eip712Result<()> {
    // For negative n, !raw == |n| - 1, which must fit below the sign bit
    let raw = n.into_raw();
    let magnitude = if n.is_negative() { !raw } else { raw };
    if magnitude.bits() >= bits as usize {
        return Err(Eip712Error::mismatch(
            path,
            kind,
            format!("value does not fit in {} signed bits", bits),
        ));
    }
    Ok(())
}

/// [`TypedDataEncoder::encode_type`] with default settings
pub fn encode_type(registry: &TypeRegistry, type_name: &str) -> Eip712Result<String> {
    TypedDataEncoder::new(registry).encode_type(type_name)
}

/// [`TypedDataEncoder::type_hash`] with default settings
pub fn type_hash(registry: &TypeRegistry, type_name: &str) -> Eip712Result<[u8; 32]> {
    TypedDataEncoder::new(registry).type_hash(type_name)
}

/// [`TypedDataEncoder::encode_data`] with default settings
pub fn encode_data(registry: &TypeRegistry, type_name: &str, record: &Value) -> Eip712Result<Vec<u8>> {
    TypedDataEncoder::new(registry).encode_data(type_name, record)
}

/// [`TypedDataEncoder::hash_struct`] with default settings
pub fn hash_struct(registry: &TypeRegistry, type_name: &str, record: &Value) -> Eip712Result<[u8; 32]> {
    TypedDataEncoder::new(registry).hash_struct(type_name, record)
}
