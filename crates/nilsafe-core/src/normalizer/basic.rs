//! Basic tier — shallow normalization of one record
//!
//! Only public members are touched. Absent sequences and mappings become
//! empty; nested records and referenced records are entered; elements of
//! containers and dynamic slots are left alone. There is no visited set: a
//! reference back to an ancestor fails with `Borrowed` because the
//! ancestor is still held for writing.

use std::sync::Arc;

use tracing::debug;

use crate::value::{Record, Reference, Value, Visibility};
use crate::Result;

/// Normalize the record behind a reference.
///
/// Anything other than a non-null reference to a record is a no-op.
pub fn normalize(root: &Value) -> Result<()> {
    let Value::Reference(reference) = root else {
        return Ok(());
    };
    let filled = referenced(reference)?;
    debug!(tier = "basic", filled, "normalization finished");
    Ok(())
}

fn referenced(reference: &Reference) -> Result<usize> {
    if reference.is_null() {
        return Ok(0);
    }
    let mut target = reference.write()?;
    match &mut *target {
        Value::Record(record) => shallow(record),
        _ => Ok(0),
    }
}

fn shallow(record: &mut Record) -> Result<usize> {
    let schema = Arc::clone(record.schema());
    let mut filled = 0;
    for (index, decl) in schema.fields().iter().enumerate() {
        if decl.visibility() != Visibility::Public {
            continue;
        }
        match record.slot_mut(index) {
            Value::Sequence(seq) => filled += usize::from(seq.fill_absent()),
            Value::Mapping(map) => filled += usize::from(map.fill_absent()),
            Value::Record(nested) => filled += shallow(nested)?,
            Value::Reference(reference) if reference.target_type().is_record() => {
                filled += referenced(reference)?;
            }
            _ => {}
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Mapping, RecordSchema, ScalarType, Sequence, Type, TypeRegistry};
    use crate::Error;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry
            .register(
                RecordSchema::new("Response")
                    .field("items", Type::sequence(ScalarType::String.into()))
                    .field("headers", Type::map(ScalarType::String, ScalarType::String.into()))
                    .field("meta", Type::record("Meta"))
                    .field("next", Type::reference(Type::record("Response")))
                    .field("rows", Type::sequence(Type::record("Meta")))
                    .private_field("hidden", Type::sequence(ScalarType::Integer.into())),
            )
            .unwrap();
        registry
            .register(RecordSchema::new("Meta").field("tags", Type::sequence(ScalarType::String.into())))
            .unwrap();
        registry
    }

    fn member(root: &Value, name: &str) -> Value {
        crate::access::get_field(root, name).unwrap()
    }

    #[test]
    fn test_fills_direct_members() {
        let root = Value::reference(registry().instantiate("Response").unwrap());
        normalize(&root).unwrap();
        assert_eq!(
            member(&root, "items"),
            Value::Sequence(Sequence::empty(ScalarType::String.into()))
        );
        assert_eq!(
            member(&root, "headers"),
            Value::Mapping(Mapping::empty(ScalarType::String, ScalarType::String.into()))
        );
    }

    #[test]
    fn test_recurses_into_nested_record() {
        let root = Value::reference(registry().instantiate("Response").unwrap());
        normalize(&root).unwrap();
        let meta = member(&root, "meta");
        let tags = crate::access::get_field(&meta, "tags").unwrap();
        assert_eq!(tags.as_sequence().map(Sequence::is_absent), Some(false));
    }

    #[test]
    fn test_private_members_untouched() {
        let root = Value::reference(registry().instantiate("Response").unwrap());
        normalize(&root).unwrap();
        assert_eq!(
            member(&root, "hidden").as_sequence().map(Sequence::is_absent),
            Some(true)
        );
    }

    #[test]
    fn test_no_element_wise_work() {
        let registry = registry();
        let row = Value::Record(registry.instantiate("Meta").unwrap());
        let rows = Sequence::from_values(Type::record("Meta"), vec![row.clone()]).unwrap();
        let response = registry.instantiate("Response").unwrap().with("rows", rows).unwrap();
        let root = Value::reference(response);
        normalize(&root).unwrap();
        let rows = member(&root, "rows");
        assert_eq!(rows.as_sequence().and_then(|s| s.get(0)), Some(&row));
    }

    #[test]
    fn test_follows_references() {
        let registry = registry();
        let next = Value::reference(registry.instantiate("Response").unwrap());
        let response = registry
            .instantiate("Response")
            .unwrap()
            .with("next", next.clone())
            .unwrap();
        normalize(&Value::reference(response)).unwrap();
        assert_eq!(
            member(&next, "items").as_sequence().map(Sequence::is_absent),
            Some(false)
        );
    }

    #[test]
    fn test_self_reference_is_borrow_error() {
        let root = Value::reference(registry().instantiate("Response").unwrap());
        crate::access::set_field(&mut root.clone(), "next", root.clone()).unwrap();
        assert!(matches!(normalize(&root), Err(Error::Borrowed(_))));
    }

    #[test]
    fn test_non_reference_is_noop() {
        let record = Value::Record(registry().instantiate("Response").unwrap());
        normalize(&record).unwrap();
        assert_eq!(
            member(&record, "items").as_sequence().map(Sequence::is_absent),
            Some(true)
        );
        normalize(&Value::from(3i64)).unwrap();
        normalize(&Value::Reference(Reference::null(Type::record("Response")))).unwrap();
    }
}
