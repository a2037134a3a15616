//! Records: schema-described sets of named members

use std::fmt;
use std::sync::Arc;

use super::schema::{FieldDecl, RecordSchema, Visibility};
use super::Value;
use crate::{Error, Result};

/// A record value. Members are stored in schema order.
///
/// Public members are read and written through [`Record::get`] and
/// [`Record::set`]. Private members are reachable only through the
/// field accessor in [`crate::access`].
#[derive(Clone, PartialEq)]
pub struct Record {
    schema: Arc<RecordSchema>,
    fields: Vec<Value>,
}

impl Record {
    /// Assemble from a schema and one already-typed value per member
    pub(crate) fn from_parts(schema: Arc<RecordSchema>, fields: Vec<Value>) -> Self {
        debug_assert_eq!(schema.fields().len(), fields.len());
        Record { schema, fields }
    }

    pub fn type_name(&self) -> &str {
        self.schema.name()
    }

    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    /// Read a public member
    pub fn get(&self, name: &str) -> Result<&Value> {
        let index = self.public_index(name)?;
        Ok(&self.fields[index])
    }

    /// Write a public member, coercing the value to the member's type
    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        let index = self.public_index(name)?;
        let value = value.coerce_to(self.schema.fields()[index].ty())?;
        self.fields[index] = value;
        Ok(())
    }

    /// Builder form of [`Record::set`]
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Result<Self> {
        self.set(name, value.into())?;
        Ok(self)
    }

    /// All members with their declarations, in schema order
    pub fn fields(&self) -> impl Iterator<Item = (&FieldDecl, &Value)> {
        self.schema.fields().iter().zip(self.fields.iter())
    }

    pub(crate) fn index_of(&self, name: &str) -> Result<usize> {
        self.schema.index_of(name).ok_or_else(|| Error::NotFound {
            record: self.type_name().to_string(),
            field: name.to_string(),
        })
    }

    pub(crate) fn slot(&self, index: usize) -> &Value {
        &self.fields[index]
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> &mut Value {
        &mut self.fields[index]
    }

    fn public_index(&self, name: &str) -> Result<usize> {
        let index = self.index_of(name)?;
        match self.schema.fields()[index].visibility() {
            Visibility::Public => Ok(index),
            Visibility::Private | Visibility::Privileged => Err(Error::Inaccessible {
                record: self.type_name().to_string(),
                field: name.to_string(),
            }),
        }
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct(self.type_name());
        for (decl, value) in self.fields() {
            out.field(decl.name(), value);
        }
        out.finish()
    }
}
