//! Graph fingerprints — SHA-256 over a canonical serialization
//!
//! The canonical form covers every member of every record (private ones
//! included), distinguishes absent containers from empty ones, and encodes
//! shared references by first-visit ordinal: `&n` introduces a cell, `@n`
//! refers back to it. Cyclic graphs therefore have finite, stable
//! fingerprints, and two graphs that differ only in where their cells live
//! in memory fingerprint the same.
//!
//! # Guarantees
//!
//! - **Deterministic**: mapping entries are ordered by key, record members by
//!   schema order
//! - **Sensitive to absence**: an absent container and an empty one differ

use std::collections::HashMap;
use std::fmt::Write;

use sha2::{Digest, Sha256};

use crate::value::{Identity, Scalar, Value};
use crate::Result;

// ── Public API ─────────────────────────────────────────────

/// Hex SHA-256 of the canonical serialization of `value`
pub fn fingerprint(value: &Value) -> Result<String> {
    let canonical = serialize_canonical(value)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Canonical text form of a graph
///
/// Fails only when a reference target is currently borrowed for writing.
pub fn serialize_canonical(value: &Value) -> Result<String> {
    let mut canon = Canonical::default();
    canon.value(value)?;
    Ok(canon.out)
}

// ── Canonical serializer ───────────────────────────────────

#[derive(Default)]
struct Canonical {
    out: String,
    ordinals: HashMap<Identity, usize>,
}

impl Canonical {
    fn value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Scalar(scalar) => self.scalar(scalar),
            Value::Sequence(seq) => {
                let _ = write!(self.out, "{}", seq.ty());
                if seq.is_absent() {
                    self.out.push('~');
                    return Ok(());
                }
                self.out.push('[');
                for element in seq.iter() {
                    self.value(element)?;
                    self.out.push(',');
                }
                self.out.push(']');
            }
            Value::Mapping(map) => {
                let _ = write!(self.out, "{}", map.ty());
                if map.is_absent() {
                    self.out.push('~');
                    return Ok(());
                }
                self.out.push('{');
                for (key, element) in map.iter() {
                    let _ = write!(self.out, "{:?}:", key);
                    self.value(element)?;
                    self.out.push(',');
                }
                self.out.push('}');
            }
            Value::Record(record) => {
                let _ = write!(self.out, "{}{{", record.type_name());
                for (decl, member) in record.fields() {
                    let _ = write!(self.out, "{}=", decl.name());
                    self.value(member)?;
                    self.out.push(';');
                }
                self.out.push('}');
            }
            Value::Reference(reference) => {
                let Some(identity) = reference.identity() else {
                    let _ = write!(self.out, "Ref<{}>null", reference.target_type());
                    return Ok(());
                };
                if let Some(ordinal) = self.ordinals.get(&identity) {
                    let _ = write!(self.out, "@{}", ordinal);
                    return Ok(());
                }
                let ordinal = self.ordinals.len();
                self.ordinals.insert(identity, ordinal);
                let _ = write!(self.out, "&{}", ordinal);
                let target = reference.read()?;
                self.value(&target)?;
            }
            Value::Dynamic(slot) => match slot.payload() {
                Some(payload) => {
                    self.out.push_str("Any(");
                    self.value(payload)?;
                    self.out.push(')');
                }
                None => self.out.push_str("Any()"),
            },
        }
        Ok(())
    }

    fn scalar(&mut self, scalar: &Scalar) {
        let _ = match scalar {
            Scalar::Boolean(b) => write!(self.out, "{}", b),
            Scalar::Int32(i) => write!(self.out, "i32:{}", i),
            Scalar::Integer(i) => write!(self.out, "i64:{}", i),
            // Bit patterns keep -0.0 and NaN payloads distinct
            Scalar::Float32(v) => write!(self.out, "f32:{:08x}", v.to_bits()),
            Scalar::Float(v) => write!(self.out, "f64:{:016x}", v.to_bits()),
            Scalar::String(s) => write!(self.out, "{:?}", s),
        };
    }
}
