//! JSON wire boundary
//!
//! [`decode`] turns a JSON document into a graph of a declared type, mapping
//! `null` to absent containers, null references and empty dynamic slots.
//! [`encode`] is the serialization side: it refuses absent containers and
//! reference cycles, which is exactly the post-condition the normalizers
//! establish. [`absent_paths`] lists what `encode` would refuse.

mod decode;
mod encode;

use std::collections::HashSet;

pub use decode::decode;
pub use encode::encode;

use crate::path::{Path, Segment};
use crate::value::{Identity, Value};
use crate::Result;

/// Paths of every absent sequence or mapping reachable from `value`.
///
/// Members of every visibility are inspected. Each reference is entered at
/// most once.
pub fn absent_paths(value: &Value) -> Result<Vec<String>> {
    let mut scan = AbsentScan::default();
    scan.value(value)?;
    Ok(scan.found)
}

#[derive(Default)]
struct AbsentScan {
    visited: HashSet<Identity>,
    path: Path,
    found: Vec<String>,
}

impl AbsentScan {
    fn value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Scalar(_) => {}
            Value::Sequence(seq) => {
                if seq.is_absent() {
                    self.found.push(self.path.to_string());
                }
                for (index, element) in seq.iter().enumerate() {
                    self.within(Segment::Index(index), element)?;
                }
            }
            Value::Mapping(map) => {
                if map.is_absent() {
                    self.found.push(self.path.to_string());
                }
                for (key, element) in map.iter() {
                    self.within(Segment::Key(key.clone()), element)?;
                }
            }
            Value::Record(record) => {
                for (decl, member) in record.fields() {
                    self.within(Segment::Field(decl.name().to_string()), member)?;
                }
            }
            Value::Reference(reference) => {
                if let Some(identity) = reference.identity() {
                    if self.visited.insert(identity) {
                        let target = reference.read()?;
                        self.value(&target)?;
                    }
                }
            }
            Value::Dynamic(slot) => {
                if let Some(payload) = slot.payload() {
                    self.value(payload)?;
                }
            }
        }
        Ok(())
    }

    fn within(&mut self, segment: Segment, value: &Value) -> Result<()> {
        self.path.push(segment);
        let result = self.value(value);
        self.path.pop();
        result
    }
}
