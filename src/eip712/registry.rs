//! EIP-712 Type Registry
//!
//! Named struct definitions with their ordered field lists. Struct references
//! may point at types registered later; they are resolved and checked when a
//! type is first hashed, before any output is produced.

use super::types::{is_valid_struct_name, TypeField, TypeRef};
use crate::error::{Eip712Error, Eip712Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Mapping from struct type name to its fields, in declared order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, Vec<TypeField>>",
    into = "BTreeMap<String, Vec<TypeField>>"
)]
pub struct TypeRegistry {
    types: BTreeMap<String, Vec<TypeField>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a struct type
    ///
    /// Fails with `DuplicateType` if the name is taken. Field types that
    /// reference other structs are not resolved here.
    pub fn register(&mut self, name: impl Into<String>, fields: Vec<TypeField>) -> Eip712Result<()> {
        let name = name.into();

        if !is_valid_struct_name(&name) {
            return Err(Eip712Error::InvalidTypeName(name));
        }
        if self.types.contains_key(&name) {
            return Err(Eip712Error::DuplicateType(name));
        }

        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if field.name.is_empty() {
                return Err(Eip712Error::schema(&name, "empty field name"));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(Eip712Error::schema(
                    &name,
                    format!("field {} declared twice", field.name),
                ));
            }
        }

        self.types.insert(name, fields);
        Ok(())
    }

    /// Register a struct type from `(field name, type string)` pairs
    pub fn register_parsed(&mut self, name: &str, fields: &[(&str, &str)]) -> Eip712Result<()> {
        let parsed = fields
            .iter()
            .map(|(field, type_name)| {
                TypeField::parse(*field, type_name).map_err(|_| Eip712Error::UnknownFieldType {
                    type_name: name.to_string(),
                    field: field.to_string(),
                    field_type: type_name.to_string(),
                })
            })
            .collect::<Eip712Result<Vec<_>>>()?;

        self.register(name, parsed)
    }

    /// Builder form of [`register`](Self::register)
    pub fn with_type(mut self, name: impl Into<String>, fields: Vec<TypeField>) -> Eip712Result<Self> {
        self.register(name, fields)?;
        Ok(self)
    }

    /// Look up the fields of a struct type
    pub fn resolve(&self, name: &str) -> Eip712Result<&[TypeField]> {
        self.types
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| Eip712Error::UnknownType(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Registered type names in lexicographic order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Every struct type reachable from `root`, including `root` itself
    ///
    /// Follows references through arrays. Fails with `UnknownType` if `root`
    /// is missing and `UnknownFieldType` on the first dangling reference.
    pub fn dependencies(&self, root: &str) -> Eip712Result<BTreeSet<&str>> {
        let (root_key, _) = self
            .types
            .get_key_value(root)
            .ok_or_else(|| Eip712Error::UnknownType(root.to_string()))?;

        let mut found = BTreeSet::new();
        let mut to_visit = vec![root_key.as_str()];

        while let Some(current) = to_visit.pop() {
            if !found.insert(current) {
                continue;
            }

            for field in self.resolve(current)? {
                let Some(child) = field.ty.struct_name() else {
                    continue;
                };
                match self.types.get_key_value(child) {
                    Some((key, _)) if !found.contains(key.as_str()) => to_visit.push(key.as_str()),
                    Some(_) => {}
                    None => {
                        return Err(Eip712Error::UnknownFieldType {
                            type_name: current.to_string(),
                            field: field.name.clone(),
                            field_type: field.ty.to_string(),
                        })
                    }
                }
            }
        }

        Ok(found)
    }

    /// Check everything reachable from `root` resolves and terminates
    ///
    /// A struct may only reach itself through an array, otherwise no finite
    /// value could satisfy it.
    pub fn check_closure(&self, root: &str) -> Eip712Result<()> {
        self.dependencies(root)?;

        let mut done = BTreeSet::new();
        let mut path = Vec::new();
        self.visit_direct(root, &mut path, &mut done)
    }

    /// Check every registered type
    pub fn validate(&self) -> Eip712Result<()> {
        for name in self.types.keys() {
            self.check_closure(name)?;
        }
        Ok(())
    }

    fn visit_direct<'a>(
        &'a self,
        name: &str,
        path: &mut Vec<&'a str>,
        done: &mut BTreeSet<&'a str>,
    ) -> Eip712Result<()> {
        let (key, fields) = self
            .types
            .get_key_value(name)
            .ok_or_else(|| Eip712Error::UnknownType(name.to_string()))?;
        let key = key.as_str();

        if done.contains(key) {
            return Ok(());
        }
        if path.contains(&key) {
            return Err(Eip712Error::CyclicType(key.to_string()));
        }

        path.push(key);
        for field in fields {
            if let TypeRef::Struct(child) = &field.ty {
                self.visit_direct(child, path, done)?;
            }
        }
        path.pop();
        done.insert(key);

        Ok(())
    }
}

impl TryFrom<BTreeMap<String, Vec<TypeField>>> for TypeRegistry {
    type Error = Eip712Error;

    fn try_from(types: BTreeMap<String, Vec<TypeField>>) -> Result<Self, Self::Error> {
        let mut registry = Self::new();
        for (name, fields) in types {
            registry.register(name, fields)?;
        }
        Ok(registry)
    }
}

impl From<TypeRegistry> for BTreeMap<String, Vec<TypeField>> {
    fn from(registry: TypeRegistry) -> Self {
        registry.types
    }
}

#[cfg(test)]
mod registry_tests {
    use super::*;

    fn mail_registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        // Mail before Person: forward references are resolved lazily
        registry
            .register_parsed("Mail", &[("from", "Person"), ("to", "Person"), ("contents", "string")])
            .unwrap();
        registry
            .register_parsed("Person", &[("name", "string"), ("wallet", "address")])
            .unwrap();
        registry
    }

    #[test]
    fn test_register_and_resolve() {
        let registry = mail_registry();
        let fields = registry.resolve("Person").unwrap();
        assert_eq!(fields[0], TypeField::new("name", TypeRef::string()));
        assert_eq!(fields[1], TypeField::new("wallet", TypeRef::address()));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["Mail", "Person"]);
        assert!(registry.check_closure("Mail").is_ok());
    }

    #[test]
    fn test_duplicate_type() {
        let mut registry = mail_registry();
        let err = registry.register_parsed("Person", &[("id", "uint256")]).unwrap_err();
        assert_eq!(err, Eip712Error::DuplicateType("Person".to_string()));
    }

    #[test]
    fn test_unknown_type() {
        let registry = mail_registry();
        assert_eq!(
            registry.resolve("Order").unwrap_err(),
            Eip712Error::UnknownType("Order".to_string())
        );
    }

    #[test]
    fn test_dangling_reference_fails_at_check() {
        let mut registry = TypeRegistry::new();
        registry.register_parsed("Order", &[("items", "Item[]")]).unwrap();

        let err = registry.check_closure("Order").unwrap_err();
        assert_eq!(
            err,
            Eip712Error::UnknownFieldType {
                type_name: "Order".to_string(),
                field: "items".to_string(),
                field_type: "Item[]".to_string(),
            }
        );
    }

    #[test]
    fn test_malformed_field_type() {
        let mut registry = TypeRegistry::new();
        let err = registry.register_parsed("Bad", &[("x", "uint7")]).unwrap_err();
        assert!(matches!(err, Eip712Error::UnknownFieldType { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_invalid_names() {
        let mut registry = TypeRegistry::new();
        assert!(matches!(
            registry.register_parsed("uint256", &[]),
            Err(Eip712Error::InvalidTypeName(_))
        ));
        assert!(matches!(
            registry.register_parsed("Pair", &[("a", "bool"), ("a", "bool")]),
            Err(Eip712Error::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_direct_cycle_rejected() {
        let mut registry = TypeRegistry::new();
        registry.register_parsed("A", &[("b", "B")]).unwrap();
        registry.register_parsed("B", &[("a", "A")]).unwrap();
        assert!(matches!(registry.check_closure("A"), Err(Eip712Error::CyclicType(_))));
        assert!(registry.validate().is_err());
    }

    #[test]
    fn test_cycle_through_array_allowed() {
        let mut registry = TypeRegistry::new();
        registry
            .register_parsed("Node", &[("label", "string"), ("children", "Node[]")])
            .unwrap();
        assert!(registry.check_closure("Node").is_ok());
        assert_eq!(registry.dependencies("Node").unwrap().len(), 1);
    }

    #[test]
    fn test_serde_validates_names() {
        let json = r#"{"Person": [{"name": "wallet", "type": "address"}]}"#;
        let registry: TypeRegistry = serde_json::from_str(json).unwrap();
        assert!(registry.contains("Person"));
        assert_eq!(
            serde_json::to_string(&registry).unwrap(),
            r#"{"Person":[{"name":"wallet","type":"address"}]}"#
        );

        let bad = r#"{"bytes32": [{"name": "x", "type": "bool"}]}"#;
        assert!(serde_json::from_str::<TypeRegistry>(bad).is_err());
    }
}
