//! Record schemas and the type registry
//!
//! A [`RecordSchema`] declares a record type's members. The
//! [`TypeRegistry`] holds schemas by name and produces zero values, which
//! is where absent containers come from: a freshly instantiated record has
//! every variable-length sequence and mapping member absent.
//!
//! Schemas can be loaded from a JSON [`SchemaDocument`]:
//!
//! ```json
//! {
//!   "root": "Page",
//!   "records": [
//!     { "name": "Page", "fields": [
//!       { "name": "links", "type": "Array<String>" },
//!       { "name": "err", "type": "String", "visibility": "privileged" }
//!     ] }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::containers::{Mapping, Sequence};
use super::record::Record;
use super::scalar::Scalar;
use super::types::{check_array_len, Type, MAX_TYPE_DEPTH};
use super::{Dynamic, Reference, Value};
use crate::{Error, Result};

/// Who may read and write a record member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Read and written by anyone
    #[default]
    Public,
    /// Read through the field accessor only, never written from outside
    Private,
    /// Private, but the record type opts in to writes through the field accessor
    Privileged,
}

/// One member declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    name: String,
    ty: Type,
    visibility: Visibility,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, ty: Type, visibility: Visibility) -> Self {
        FieldDecl {
            name: name.into(),
            ty,
            visibility,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }
}

/// Declared shape of a record type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    name: String,
    fields: Vec<FieldDecl>,
}

impl RecordSchema {
    pub fn new(name: impl Into<String>) -> Self {
        RecordSchema {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn declare(mut self, name: impl Into<String>, ty: Type, visibility: Visibility) -> Self {
        self.fields.push(FieldDecl::new(name, ty, visibility));
        self
    }

    pub fn field(self, name: impl Into<String>, ty: Type) -> Self {
        self.declare(name, ty, Visibility::Public)
    }

    pub fn private_field(self, name: impl Into<String>, ty: Type) -> Self {
        self.declare(name, ty, Visibility::Private)
    }

    pub fn privileged_field(self, name: impl Into<String>, ty: Type) -> Self {
        self.declare(name, ty, Visibility::Privileged)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field_decl(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }
}

// ── Registry ──────────────────────────────────────────────

/// Most slots a single zero value may hold, counting every nested member
/// and fixed-array element
pub const MAX_ZERO_SLOTS: usize = 1 << 20;

/// Records being instantiated, innermost last, and slots created so far
#[derive(Default)]
struct Zeroing {
    stack: Vec<String>,
    slots: usize,
}

/// Record schemas by name
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    records: BTreeMap<String, Arc<RecordSchema>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema. Names and member names must be unique.
    pub fn register(&mut self, schema: RecordSchema) -> Result<Arc<RecordSchema>> {
        if self.records.contains_key(schema.name()) {
            return Err(Error::DuplicateType(schema.name().to_string()));
        }
        for (i, field) in schema.fields().iter().enumerate() {
            if schema.fields()[..i].iter().any(|f| f.name == field.name) {
                return Err(Error::DuplicateType(format!(
                    "{}.{}",
                    schema.name(),
                    field.name
                )));
            }
        }
        let schema = Arc::new(schema);
        self.records
            .insert(schema.name().to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    pub fn schema(&self, name: &str) -> Result<Arc<RecordSchema>> {
        self.records
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownType(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Check that every record name used by a member type is registered and
    /// every fixed length is within [`MAX_ARRAY_LEN`](super::types::MAX_ARRAY_LEN)
    pub fn validate(&self) -> Result<()> {
        for schema in self.records.values() {
            for field in schema.fields() {
                self.check_known(field.ty())?;
            }
        }
        Ok(())
    }

    /// A zeroed record: scalars zero, variable containers absent,
    /// references null, dynamic slots empty
    pub fn instantiate(&self, name: &str) -> Result<Record> {
        self.instantiate_in(name, &mut Zeroing::default())
    }

    /// Zero value of any type
    pub fn zero(&self, ty: &Type) -> Result<Value> {
        self.zero_in(ty, &mut Zeroing::default())
    }

    /// `count` zero values of `elem`, all within one slot budget
    pub fn zeros(&self, elem: &Type, count: usize) -> Result<Vec<Value>> {
        check_array_len(count)?;
        let mut zeroing = Zeroing::default();
        (0..count).map(|_| self.zero_in(elem, &mut zeroing)).collect()
    }

    fn instantiate_in(&self, name: &str, zeroing: &mut Zeroing) -> Result<Record> {
        if zeroing.stack.iter().any(|n| n == name) {
            return Err(Error::RecursiveType(name.to_string()));
        }
        if zeroing.stack.len() >= MAX_TYPE_DEPTH {
            return Err(Error::TypeSyntax(format!(
                "{} nests records deeper than {}",
                name, MAX_TYPE_DEPTH
            )));
        }
        let schema = self.schema(name)?;
        zeroing.stack.push(name.to_string());
        let fields = schema
            .fields()
            .iter()
            .map(|f| self.zero_in(f.ty(), zeroing))
            .collect::<Result<Vec<_>>>();
        zeroing.stack.pop();
        Ok(Record::from_parts(schema, fields?))
    }

    fn zero_in(&self, ty: &Type, zeroing: &mut Zeroing) -> Result<Value> {
        zeroing.slots += 1;
        if zeroing.slots > MAX_ZERO_SLOTS {
            return Err(Error::TypeSyntax(format!(
                "zero value of {} exceeds {} slots",
                ty, MAX_ZERO_SLOTS
            )));
        }
        let value = match ty {
            Type::Scalar(s) => Value::Scalar(Scalar::zero(*s)),
            Type::Sequence { elem, len: None } => Value::Sequence(Sequence::absent((**elem).clone())),
            Type::Sequence {
                elem,
                len: Some(n),
            } => {
                check_array_len(*n)?;
                let items = (0..*n)
                    .map(|_| self.zero_in(elem, zeroing))
                    .collect::<Result<Vec<_>>>()?;
                Value::Sequence(Sequence::from_parts((**elem).clone(), Some(*n), Some(items)))
            }
            Type::Map { key, value } => Value::Mapping(Mapping::absent(*key, (**value).clone())),
            Type::Record(name) => Value::Record(self.instantiate_in(name, zeroing)?),
            Type::Reference(target) => Value::Reference(Reference::null((**target).clone())),
            Type::Any => Value::Dynamic(Dynamic::empty()),
        };
        Ok(value)
    }

    fn check_known(&self, ty: &Type) -> Result<()> {
        match ty {
            Type::Record(name) if !self.contains(name) => Err(Error::UnknownType(name.clone())),
            Type::Sequence { elem, len: Some(n) } => {
                check_array_len(*n)?;
                self.check_known(elem)
            }
            Type::Sequence { elem: inner, .. }
            | Type::Map { value: inner, .. }
            | Type::Reference(inner) => self.check_known(inner),
            _ => Ok(()),
        }
    }
}

// ── Schema documents ──────────────────────────────────────

/// Serialized form of a set of record schemas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    /// Record type of the document root, if fixed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    pub records: Vec<RecordDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDocument {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDocument {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub visibility: Visibility,
}

impl SchemaDocument {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parse every member type and register every record.
    ///
    /// Fails on malformed type expressions, duplicate names, and
    /// references to unregistered record types.
    pub fn into_registry(self) -> Result<TypeRegistry> {
        let mut registry = TypeRegistry::new();
        for record in self.records {
            let mut schema = RecordSchema::new(record.name);
            for field in record.fields {
                let ty: Type = field.ty.parse()?;
                schema = schema.declare(field.name, ty, field.visibility);
            }
            registry.register(schema)?;
        }
        registry.validate()?;
        if let Some(root) = &self.root {
            registry.schema(root)?;
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ScalarType;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry
            .register(
                RecordSchema::new("Page")
                    .field("title", ScalarType::String.into())
                    .field("links", Type::sequence(ScalarType::String.into()))
                    .field("meta", Type::record("Meta"))
                    .field("next", Type::reference(Type::record("Page")))
                    .privileged_field("err", ScalarType::String.into()),
            )
            .unwrap();
        registry
            .register(
                RecordSchema::new("Meta")
                    .field("headers", Type::map(ScalarType::String, ScalarType::String.into()))
                    .field("rgb", Type::array(ScalarType::Int32.into(), 3)),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_instantiate_zero_values() {
        let page = registry().instantiate("Page").unwrap();
        assert!(page.get("links").unwrap().as_sequence().unwrap().is_absent());
        assert!(page.get("next").unwrap().as_reference().unwrap().is_null());

        let meta = page.get("meta").unwrap().as_record().unwrap();
        assert!(meta.get("headers").unwrap().as_mapping().unwrap().is_absent());
        let rgb = meta.get("rgb").unwrap().as_sequence().unwrap();
        assert_eq!(rgb.len(), 3);
        assert_eq!(rgb.get(0), Some(&Value::from(0i32)));
    }

    #[test]
    fn test_private_member_hidden_from_record_api() {
        let mut page = registry().instantiate("Page").unwrap();
        assert!(matches!(page.get("err"), Err(Error::Inaccessible { .. })));
        assert!(matches!(
            page.set("err", "boom".into()),
            Err(Error::Inaccessible { .. })
        ));
        assert!(matches!(page.get("nope"), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_record_set_coerces() {
        let mut registry = registry();
        registry
            .register(RecordSchema::new("Counter").field("n", ScalarType::Integer.into()))
            .unwrap();
        let counter = registry
            .instantiate("Counter")
            .unwrap()
            .with("n", 5i32)
            .unwrap();
        assert_eq!(counter.get("n").unwrap(), &Value::from(5i64));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = registry();
        let err = registry.register(RecordSchema::new("Page")).unwrap_err();
        assert_eq!(err, Error::DuplicateType("Page".into()));

        let err = registry
            .register(
                RecordSchema::new("Twice")
                    .field("a", Type::Any)
                    .field("a", Type::Any),
            )
            .unwrap_err();
        assert_eq!(err, Error::DuplicateType("Twice.a".into()));
    }

    #[test]
    fn test_recursive_by_value_rejected() {
        let mut registry = TypeRegistry::new();
        registry
            .register(RecordSchema::new("Loop").field("inner", Type::record("Loop")))
            .unwrap();
        assert_eq!(
            registry.instantiate("Loop").unwrap_err(),
            Error::RecursiveType("Loop".into())
        );
    }

    #[test]
    fn test_schema_document_into_registry() {
        let doc = SchemaDocument::from_json(
            r#"{
              "root": "Page",
              "records": [
                { "name": "Page", "fields": [
                  { "name": "links", "type": "Array<String>" },
                  { "name": "err", "type": "String", "visibility": "privileged" }
                ] }
              ]
            }"#,
        )
        .unwrap();
        let registry = doc.into_registry().unwrap();
        let schema = registry.schema("Page").unwrap();
        assert_eq!(schema.fields().len(), 2);
        assert_eq!(
            schema.field_decl("err").unwrap().visibility(),
            Visibility::Privileged
        );
    }

    #[test]
    fn test_oversized_zero_value_rejected() {
        // 4096 * 4096 slots, each length individually within bounds
        let doc = SchemaDocument::from_json(
            r#"{ "records": [
                { "name": "Grid", "fields": [ { "name": "rows", "type": "Array<Row, 4096>" } ] },
                { "name": "Row", "fields": [ { "name": "cells", "type": "Array<Integer, 4096>" } ] }
            ] }"#,
        )
        .unwrap();
        let registry = doc.into_registry().unwrap();
        assert!(matches!(
            registry.instantiate("Grid"),
            Err(Error::TypeSyntax(_))
        ));
        assert!(registry.instantiate("Row").is_ok());
        assert!(matches!(
            registry.zeros(&Type::record("Row"), 4096),
            Err(Error::TypeSyntax(_))
        ));
    }

    #[test]
    fn test_oversized_array_length_rejected() {
        let doc = SchemaDocument::from_json(
            r#"{ "records": [ { "name": "R", "fields": [ { "name": "xs", "type": "Array<Integer, 100000000000>" } ] } ] }"#,
        )
        .unwrap();
        assert!(matches!(doc.into_registry(), Err(Error::TypeSyntax(_))));

        let mut registry = TypeRegistry::new();
        registry
            .register(
                RecordSchema::new("R")
                    .field("xs", Type::array(ScalarType::Integer.into(), usize::MAX)),
            )
            .unwrap();
        assert!(matches!(registry.validate(), Err(Error::TypeSyntax(_))));
        assert!(matches!(registry.instantiate("R"), Err(Error::TypeSyntax(_))));
    }

    #[test]
    fn test_deep_record_chain_rejected() {
        let mut registry = TypeRegistry::new();
        for i in 0..=MAX_TYPE_DEPTH {
            registry
                .register(
                    RecordSchema::new(format!("R{i}"))
                        .field("inner", Type::record(format!("R{}", i + 1))),
                )
                .unwrap();
        }
        registry
            .register(RecordSchema::new(format!("R{}", MAX_TYPE_DEPTH + 1)))
            .unwrap();
        assert!(matches!(
            registry.instantiate("R0"),
            Err(Error::TypeSyntax(_))
        ));
        assert!(registry.instantiate("R2").is_ok());
    }

    #[test]
    fn test_schema_document_unknown_reference() {
        let doc = SchemaDocument::from_json(
            r#"{ "records": [ { "name": "A", "fields": [ { "name": "b", "type": "Ref<B>" } ] } ] }"#,
        )
        .unwrap();
        assert_eq!(
            doc.into_registry().unwrap_err(),
            Error::UnknownType("B".into())
        );
    }
}
