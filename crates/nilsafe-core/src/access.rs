//! Field accessor — read or write a record member by name
//!
//! Unlike [`Record::get`]/[`Record::set`], the accessor also reaches
//! non-public members:
//!
//! - every member can be **read** (a copy is returned),
//! - `privileged` members can be **written**: the record type opts in to
//!   outside writes for exactly those members,
//! - `private` members are never written from outside (`Inaccessible`).
//!
//! Writes go through the member type's coercion rules and require the
//! owning record to be addressable: a record held by a dynamic slot is a
//! copy and fails with `NotAddressable`.

use crate::value::{Record, Value, Visibility};
use crate::{Error, Result};

/// Read a member of the record behind `target`.
///
/// `target` may be a non-null reference to a record, a record, or a
/// dynamic slot holding a record. References inside the returned copy
/// still alias the originals.
pub fn get_field(target: &Value, name: &str) -> Result<Value> {
    match target {
        Value::Record(record) => read_field(record, name).cloned(),
        Value::Reference(reference) => {
            let value = reference.read()?;
            let record = value
                .as_record()
                .ok_or_else(|| Error::NotARecord(value.kind().to_string()))?;
            read_field(record, name).cloned()
        }
        Value::Dynamic(slot) => match slot.payload() {
            Some(Value::Record(record)) => read_field(record, name).cloned(),
            Some(other) => Err(Error::NotARecord(other.kind().to_string())),
            None => Err(Error::NotARecord("empty dynamic slot".to_string())),
        },
        other => Err(Error::NotARecord(other.kind().to_string())),
    }
}

/// Write a member of the record behind `target`.
///
/// On any error the record is left unchanged.
pub fn set_field(target: &mut Value, name: &str, value: Value) -> Result<()> {
    match target {
        Value::Record(record) => write_field(record, name, value),
        Value::Reference(reference) => {
            if reference.is_null() {
                return Err(Error::NotAddressable(format!(
                    "null reference to {}",
                    reference.target_type()
                )));
            }
            let mut slot = reference.write()?;
            match &mut *slot {
                Value::Record(record) => write_field(record, name, value),
                other => Err(Error::NotARecord(other.kind().to_string())),
            }
        }
        Value::Dynamic(slot) => match slot.payload() {
            Some(Value::Record(record)) => Err(Error::NotAddressable(format!(
                "{} held by a dynamic slot is a copy",
                record.type_name()
            ))),
            Some(other) => Err(Error::NotARecord(other.kind().to_string())),
            None => Err(Error::NotARecord("empty dynamic slot".to_string())),
        },
        other => Err(Error::NotARecord(other.kind().to_string())),
    }
}

/// Read any member of an addressable record, whatever its visibility
pub fn read_field<'r>(record: &'r Record, name: &str) -> Result<&'r Value> {
    let index = record.index_of(name)?;
    Ok(record.slot(index))
}

/// Write a public or privileged member of an addressable record.
///
/// Order of checks: the member must exist, the value must fit the
/// member's type (directly or by coercion), and the member must accept
/// outside writes.
pub fn write_field(record: &mut Record, name: &str, value: Value) -> Result<()> {
    let index = record.index_of(name)?;
    let decl = &record.schema().fields()[index];
    let value = value.coerce_to(decl.ty())?;
    if decl.visibility() == Visibility::Private {
        return Err(Error::Inaccessible {
            record: record.type_name().to_string(),
            field: name.to_string(),
        });
    }
    *record.slot_mut(index) = value;
    Ok(())
}
