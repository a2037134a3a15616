//! Graph → JSON

use std::collections::HashSet;

use serde_json::{Map, Number, Value as Json};

use crate::path::{Path, Segment};
use crate::value::{Identity, Scalar, Value, Visibility};
use crate::{Error, Result};

/// Encode a normalized graph as JSON.
///
/// Fails with `AbsentContainer` on the first absent sequence or mapping and
/// with `Cycle` when a reference leads back to one of its ancestors. Null
/// references and empty dynamic slots encode as `null`; records emit their
/// public members only.
pub fn encode(value: &Value) -> Result<Json> {
    Encoder::default().encode(value)
}

#[derive(Default)]
struct Encoder {
    ancestors: HashSet<Identity>,
    path: Path,
}

impl Encoder {
    fn encode(&mut self, value: &Value) -> Result<Json> {
        match value {
            Value::Scalar(scalar) => self.scalar(scalar),
            Value::Sequence(seq) => {
                if seq.is_absent() {
                    return Err(Error::AbsentContainer(self.path.to_string()));
                }
                let mut items = Vec::with_capacity(seq.len());
                for (index, element) in seq.iter().enumerate() {
                    items.push(self.within(Segment::Index(index), element)?);
                }
                Ok(Json::Array(items))
            }
            Value::Mapping(map) => {
                if map.is_absent() {
                    return Err(Error::AbsentContainer(self.path.to_string()));
                }
                let mut object = Map::new();
                for (key, element) in map.iter() {
                    let encoded = self.within(Segment::Key(key.clone()), element)?;
                    object.insert(key.to_string(), encoded);
                }
                Ok(Json::Object(object))
            }
            Value::Record(record) => {
                let mut object = Map::new();
                for (decl, member) in record.fields() {
                    if decl.visibility() != Visibility::Public {
                        continue;
                    }
                    let encoded = self.within(Segment::Field(decl.name().to_string()), member)?;
                    object.insert(decl.name().to_string(), encoded);
                }
                Ok(Json::Object(object))
            }
            Value::Reference(reference) => {
                let Some(identity) = reference.identity() else {
                    return Ok(Json::Null);
                };
                if !self.ancestors.insert(identity) {
                    return Err(Error::Cycle(self.path.to_string()));
                }
                let encoded = reference.read().and_then(|target| self.encode(&target));
                self.ancestors.remove(&identity);
                encoded
            }
            Value::Dynamic(slot) => match slot.payload() {
                Some(payload) => self.encode(payload),
                None => Ok(Json::Null),
            },
        }
    }

    fn scalar(&self, scalar: &Scalar) -> Result<Json> {
        let json = match scalar {
            Scalar::Boolean(b) => Json::Bool(*b),
            Scalar::Int32(i) => Json::from(*i),
            Scalar::Integer(i) => Json::from(*i),
            Scalar::Float32(v) => self.float(f64::from(*v))?,
            Scalar::Float(v) => self.float(*v)?,
            Scalar::String(s) => Json::String(s.clone()),
        };
        Ok(json)
    }

    fn float(&self, v: f64) -> Result<Json> {
        Number::from_f64(v).map(Json::Number).ok_or_else(|| Error::Encode {
            path: self.path.to_string(),
            message: format!("{} has no JSON representation", v),
        })
    }

    fn within(&mut self, segment: Segment, value: &Value) -> Result<Json> {
        self.path.push(segment);
        let result = self.encode(value);
        self.path.pop();
        result
    }
}
