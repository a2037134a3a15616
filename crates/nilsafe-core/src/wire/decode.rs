//! JSON → graph

use std::sync::Arc;

use serde_json::Value as Json;

use crate::path::{Path, Segment};
use crate::value::{
    check_array_len, Dynamic, Key, Mapping, Reference, Scalar, ScalarType, Sequence, Type, TypeRegistry, Value,
    Visibility,
};
use crate::{Error, Result};

/// Decode `json` as a value of type `ty`.
///
/// `null` becomes the absent container, a null reference, an empty dynamic
/// slot, or the zero value of a scalar or record. Records take their public
/// members by exact name; missing members keep their zero value and unknown
/// keys are ignored.
pub fn decode(json: &Json, ty: &Type, registry: &TypeRegistry) -> Result<Value> {
    Decoder {
        registry,
        path: Path::root(),
    }
    .decode(json, ty)
}

struct Decoder<'r> {
    registry: &'r TypeRegistry,
    path: Path,
}

impl Decoder<'_> {
    fn decode(&mut self, json: &Json, ty: &Type) -> Result<Value> {
        if json.is_null() {
            return self.null(ty);
        }
        match ty {
            Type::Scalar(scalar) => self.scalar(json, *scalar).map(Value::Scalar),
            Type::Sequence { elem, len } => self.sequence(json, elem, *len),
            Type::Map { key, value } => self.mapping(json, *key, value),
            Type::Record(name) => self.record(json, name),
            Type::Reference(target) => {
                let value = self.decode(json, target)?;
                Ok(Value::Reference(Reference::new(value)))
            }
            Type::Any => self.infer(json),
        }
    }

    fn null(&self, ty: &Type) -> Result<Value> {
        match ty {
            Type::Reference(target) => Ok(Value::Reference(Reference::null((**target).clone()))),
            Type::Any => Ok(Value::Dynamic(Dynamic::empty())),
            other => self.registry.zero(other),
        }
    }

    fn scalar(&self, json: &Json, ty: ScalarType) -> Result<Scalar> {
        let scalar = match ty {
            ScalarType::Boolean => json.as_bool().map(Scalar::Boolean),
            ScalarType::Int32 => json
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(Scalar::Int32),
            ScalarType::Integer => json.as_i64().map(Scalar::Integer),
            ScalarType::Float32 => json.as_f64().map(|v| Scalar::Float32(v as f32)),
            ScalarType::Float => json.as_f64().map(Scalar::Float),
            ScalarType::String => json.as_str().map(|s| Scalar::String(s.to_string())),
        };
        scalar.ok_or_else(|| self.mismatch(ty, json))
    }

    fn sequence(&mut self, json: &Json, elem: &Type, len: Option<usize>) -> Result<Value> {
        let items = json
            .as_array()
            .ok_or_else(|| self.mismatch("an array", json))?;
        if let Some(n) = len {
            check_array_len(n)?;
        }
        let take = len.unwrap_or(items.len()).min(items.len());
        let mut values = Vec::with_capacity(take);
        for (index, item) in items.iter().take(take).enumerate() {
            self.path.push(Segment::Index(index));
            let value = self.decode(item, elem);
            self.path.pop();
            values.push(value?);
        }
        let seq = match len {
            Some(n) => {
                if values.len() < n {
                    values.extend(self.registry.zeros(elem, n - values.len())?);
                }
                Sequence::fixed(elem.clone(), values)?
            }
            None => Sequence::from_values(elem.clone(), values)?,
        };
        Ok(Value::Sequence(seq))
    }

    fn mapping(&mut self, json: &Json, key: ScalarType, value: &Type) -> Result<Value> {
        let object = json
            .as_object()
            .ok_or_else(|| self.mismatch("an object", json))?;
        let mut mapping = Mapping::empty(key, value.clone());
        for (text, item) in object {
            let parsed = Key::parse(text, key).map_err(|err| self.error(err.to_string()))?;
            self.path.push(Segment::Key(parsed.clone()));
            let decoded = self.decode(item, value);
            self.path.pop();
            mapping.insert(parsed, decoded?)?;
        }
        Ok(Value::Mapping(mapping))
    }

    fn record(&mut self, json: &Json, name: &str) -> Result<Value> {
        let object = json
            .as_object()
            .ok_or_else(|| self.mismatch(format!("a {} object", name), json))?;
        let mut record = self.registry.instantiate(name)?;
        let schema = Arc::clone(record.schema());
        for decl in schema.fields() {
            if decl.visibility() != Visibility::Public {
                continue;
            }
            let Some(item) = object.get(decl.name()) else {
                continue;
            };
            self.path.push(Segment::Field(decl.name().to_string()));
            let decoded = self.decode(item, decl.ty());
            self.path.pop();
            record.set(decl.name(), decoded?)?;
        }
        Ok(Value::Record(record))
    }

    /// Dynamic slots take whatever shape the JSON has
    fn infer(&mut self, json: &Json) -> Result<Value> {
        let value = match json {
            Json::Null => return Ok(Value::Dynamic(Dynamic::empty())),
            Json::Bool(b) => Value::from(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::from(i),
                None => Value::from(n.as_f64().ok_or_else(|| self.mismatch("a number", json))?),
            },
            Json::String(s) => Value::from(s.as_str()),
            Json::Array(_) => self.sequence(json, &Type::Any, None)?,
            Json::Object(_) => self.mapping(json, ScalarType::String, &Type::Any)?,
        };
        Ok(Value::Dynamic(Dynamic::new(value)))
    }

    fn mismatch(&self, expected: impl ToString, found: &Json) -> Error {
        let found = match found {
            Json::Null => "null",
            Json::Bool(_) => "boolean",
            Json::Number(_) => "number",
            Json::String(_) => "string",
            Json::Array(_) => "array",
            Json::Object(_) => "object",
        };
        self.error(format!("expected {}, found {}", expected.to_string(), found))
    }

    fn error(&self, message: String) -> Error {
        Error::Decode {
            path: self.path.to_string(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::RecordSchema;
    use serde_json::json;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry
            .register(
                RecordSchema::new("Result")
                    .field("content", Type::sequence(Type::record("Content")))
                    .field("meta", Type::map(ScalarType::String, Type::Any))
                    .field("is_error", ScalarType::Boolean.into())
                    .field("rgb", Type::array(ScalarType::Int32.into(), 3))
                    .field("next", Type::reference(Type::record("Result")))
                    .declare("session", ScalarType::String.into(), Visibility::Private),
            )
            .unwrap();
        registry
            .register(
                RecordSchema::new("Content")
                    .field("text", ScalarType::String.into())
                    .field("annotations", Type::sequence(ScalarType::String.into())),
            )
            .unwrap();
        registry
    }

    fn decode_result(json: Json) -> Result<Value> {
        decode(&json, &Type::record("Result"), &registry())
    }

    #[test]
    fn test_nulls_become_absent() {
        let value = decode_result(json!({ "content": null, "meta": null, "next": null })).unwrap();
        let record = value.as_record().unwrap();
        assert!(record.get("content").unwrap().as_sequence().unwrap().is_absent());
        assert!(record.get("meta").unwrap().as_mapping().unwrap().is_absent());
        assert!(record.get("next").unwrap().as_reference().unwrap().is_null());
    }

    #[test]
    fn test_nested_records_and_unknown_keys() {
        let value = decode_result(json!({
            "content": [{ "text": "hi", "annotations": null }, { "text": "there" }],
            "is_error": true,
            "unknown": 1,
            "session": "ignored"
        }))
        .unwrap();
        let record = value.as_record().unwrap();
        let content = record.get("content").unwrap().as_sequence().unwrap();
        assert_eq!(content.len(), 2);
        let first = content.get(0).unwrap().as_record().unwrap();
        assert_eq!(first.get("text").unwrap(), &Value::from("hi"));
        assert!(first.get("annotations").unwrap().as_sequence().unwrap().is_absent());
        assert_eq!(record.get("is_error").unwrap(), &Value::from(true));
        assert_eq!(
            crate::access::read_field(record, "session").unwrap(),
            &Value::from("")
        );
    }

    #[test]
    fn test_fixed_array_zero_filled_and_truncated() {
        let short = decode_result(json!({ "rgb": [7] })).unwrap();
        let rgb = short.as_record().unwrap().get("rgb").unwrap().as_sequence().unwrap();
        let items: Vec<_> = rgb.iter().cloned().collect();
        assert_eq!(items, vec![Value::from(7i32), Value::from(0i32), Value::from(0i32)]);

        let long = decode_result(json!({ "rgb": [1, 2, 3, 4] })).unwrap();
        let rgb = long.as_record().unwrap().get("rgb").unwrap().as_sequence().unwrap();
        assert_eq!(rgb.len(), 3);
    }

    #[test]
    fn test_oversized_fixed_array_rejected() {
        let huge = Type::array(ScalarType::Integer.into(), usize::MAX);
        let err = decode(&json!([1]), &huge, &registry()).unwrap_err();
        assert!(matches!(err, Error::TypeSyntax(_)), "{err:?}");
    }

    #[test]
    fn test_dynamic_inference() {
        let value = decode_result(json!({
            "meta": { "count": 3, "ratio": 0.5, "tags": ["a", null], "nested": { "x": false } }
        }))
        .unwrap();
        let meta = value.as_record().unwrap().get("meta").unwrap().as_mapping().unwrap();
        let payload = |key: &str| meta.get(&Key::from(key)).unwrap().as_dynamic().unwrap().payload().cloned();
        assert_eq!(payload("count"), Some(Value::from(3i64)));
        assert_eq!(payload("ratio"), Some(Value::from(0.5)));
        assert_eq!(payload("tags").unwrap().ty(), Type::sequence(Type::Any));
        assert_eq!(
            payload("nested").unwrap().ty(),
            Type::map(ScalarType::String, Type::Any)
        );
    }

    #[test]
    fn test_integer_keys() {
        let ty = Type::map(ScalarType::Int32, ScalarType::String.into());
        let value = decode(&json!({ "2": "b", "1": "a" }), &ty, &registry()).unwrap();
        let keys: Vec<_> = value.as_mapping().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec![Key::Integer(1), Key::Integer(2)]);

        let err = decode(&json!({ "x": "a" }), &ty, &registry()).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_kind_mismatch_reports_path() {
        let err = decode_result(json!({ "content": [{ "text": 5 }] })).unwrap_err();
        assert_eq!(
            err,
            Error::Decode {
                path: "$.content[0].text".into(),
                message: "expected String, found number".into(),
            }
        );
    }

    #[test]
    fn test_int32_out_of_range() {
        let err = decode(&json!(1u64 << 40), &ScalarType::Int32.into(), &registry()).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }
}
