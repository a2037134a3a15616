//! Graph values — the closed set of shapes the normalizers walk
//!
//! A [`Value`] is one of six variants. Every slot in a graph holds a value of
//! exactly its declared [`Type`]: values written into a slot go through
//! [`Value::coerce_to`], and values written into an `Any` slot are wrapped in
//! a [`Dynamic`].
//!
//! # Addressability
//!
//! - [`Reference`] targets are shared cells, so they are always writable in
//!   place (unless currently borrowed).
//! - A [`Dynamic`] payload is read by shared reference and replaced
//!   wholesale. It is never handed out for in-place mutation.
//! - Sequence elements and mapping values are written back through the
//!   container's checked `set`/`insert`.

mod containers;
mod record;
mod scalar;
mod schema;
mod types;

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

pub use containers::{Mapping, Sequence};
pub use record::Record;
pub use scalar::{Key, Scalar};
pub use schema::{
    FieldDecl, FieldDocument, RecordDocument, RecordSchema, SchemaDocument, TypeRegistry,
    Visibility, MAX_ZERO_SLOTS,
};
pub(crate) use types::check_array_len;
pub use types::{ScalarType, Type, MAX_ARRAY_LEN, MAX_TYPE_DEPTH};

use crate::{Error, Result};

/// A node in an object graph
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    Sequence(Sequence),
    Mapping(Mapping),
    Record(Record),
    Reference(Reference),
    Dynamic(Dynamic),
}

impl Value {
    /// Wrap a value in a fresh shared cell
    pub fn reference(value: impl Into<Value>) -> Value {
        Value::Reference(Reference::new(value.into()))
    }

    /// Wrap a value in a dynamic slot
    pub fn dynamic(value: impl Into<Value>) -> Value {
        Value::Dynamic(Dynamic::new(value.into()))
    }

    /// Declared type of this value
    pub fn ty(&self) -> Type {
        match self {
            Value::Scalar(s) => Type::Scalar(s.scalar_type()),
            Value::Sequence(s) => s.ty(),
            Value::Mapping(m) => m.ty(),
            Value::Record(r) => Type::Record(r.type_name().to_string()),
            Value::Reference(r) => Type::reference(r.target_type().clone()),
            Value::Dynamic(_) => Type::Any,
        }
    }

    /// Short variant name for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Scalar(_) => "scalar",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
            Value::Record(_) => "record",
            Value::Reference(_) => "reference",
            Value::Dynamic(_) => "dynamic",
        }
    }

    /// Convert this value so it can be stored in a slot of type `target`.
    ///
    /// Same type: unchanged. `Any`: wrapped in a dynamic slot. Scalars:
    /// lossless numeric conversion. Anything else is `IncompatibleType`.
    pub fn coerce_to(self, target: &Type) -> Result<Value> {
        if *target == Type::Any {
            return Ok(match self {
                Value::Dynamic(_) => self,
                other => Value::Dynamic(Dynamic::new(other)),
            });
        }
        let found = self.ty();
        if found == *target {
            return Ok(self);
        }
        match (self, target) {
            (Value::Scalar(s), Type::Scalar(to)) => s
                .convert(*to)
                .map(Value::Scalar)
                .ok_or_else(|| Error::mismatch(target, &found)),
            _ => Err(Error::mismatch(target, &found)),
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Value::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence_mut(&mut self) -> Option<&mut Sequence> {
        match self {
            Value::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Value::Reference(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_dynamic(&self) -> Option<&Dynamic> {
        match self {
            Value::Dynamic(d) => Some(d),
            _ => None,
        }
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Value::Scalar(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Scalar(Scalar::Boolean(b))
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Scalar(Scalar::Int32(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Scalar(Scalar::Integer(i))
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Scalar(Scalar::Float32(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Scalar(Scalar::Float(v))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(Scalar::String(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(Scalar::String(s))
    }
}

impl From<Sequence> for Value {
    fn from(s: Sequence) -> Self {
        Value::Sequence(s)
    }
}

impl From<Mapping> for Value {
    fn from(m: Mapping) -> Self {
        Value::Mapping(m)
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(r)
    }
}

impl From<Reference> for Value {
    fn from(r: Reference) -> Self {
        Value::Reference(r)
    }
}

impl From<Dynamic> for Value {
    fn from(d: Dynamic) -> Self {
        Value::Dynamic(d)
    }
}

// ── References ────────────────────────────────────────────

/// Opaque identity of a shared cell. Used only as a set key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity(usize);

/// Shared, possibly null indirection to another value.
///
/// Cloning a reference aliases the same cell. Equality is identity.
#[derive(Clone)]
pub struct Reference {
    target: Type,
    cell: Option<Rc<RefCell<Value>>>,
}

impl Reference {
    pub fn new(value: Value) -> Self {
        Reference {
            target: value.ty(),
            cell: Some(Rc::new(RefCell::new(value))),
        }
    }

    pub fn null(target: Type) -> Self {
        Reference { target, cell: None }
    }

    pub fn is_null(&self) -> bool {
        self.cell.is_none()
    }

    pub fn target_type(&self) -> &Type {
        &self.target
    }

    /// Identity of the target cell; `None` for null
    pub fn identity(&self) -> Option<Identity> {
        self.cell
            .as_ref()
            .map(|cell| Identity(Rc::as_ptr(cell) as *const () as usize))
    }

    /// Whether both references point at the same cell
    pub fn ptr_eq(&self, other: &Reference) -> bool {
        match (&self.cell, &other.cell) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Shared access to the target
    pub fn read(&self) -> Result<Ref<'_, Value>> {
        let cell = self.cell()?;
        cell.try_borrow()
            .map_err(|_| Error::Borrowed(self.target.to_string()))
    }

    /// Exclusive access to the target
    pub fn write(&self) -> Result<RefMut<'_, Value>> {
        let cell = self.cell()?;
        cell.try_borrow_mut()
            .map_err(|_| Error::Borrowed(self.target.to_string()))
    }

    /// Replace the target, coercing to the target type. Returns the old value.
    pub fn replace(&self, value: Value) -> Result<Value> {
        let value = value.coerce_to(&self.target)?;
        let mut slot = self.write()?;
        Ok(std::mem::replace(&mut *slot, value))
    }

    fn cell(&self) -> Result<&Rc<RefCell<Value>>> {
        self.cell
            .as_ref()
            .ok_or_else(|| Error::NullReference(self.target.to_string()))
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target
            && match (&self.cell, &other.cell) {
                (None, None) => true,
                (Some(a), Some(b)) => Rc::ptr_eq(a, b),
                _ => false,
            }
    }
}

// Targets are not printed: graphs may be cyclic.
impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.identity() {
            Some(Identity(addr)) => write!(f, "Reference<{}>({:#x})", self.target, addr),
            None => write!(f, "Reference<{}>(null)", self.target),
        }
    }
}

// ── Dynamic slots ─────────────────────────────────────────

/// A slot holding a value whose type is known only at run time.
///
/// The payload is a copy: it can be read and replaced, not mutated in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dynamic {
    payload: Option<Box<Value>>,
}

impl Dynamic {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap a value. Wrapping a dynamic slot yields that slot.
    pub fn new(value: Value) -> Self {
        match value {
            Value::Dynamic(inner) => inner,
            other => Dynamic {
                payload: Some(Box::new(other)),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_none()
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_deref()
    }

    /// Replace the payload, returning the previous one
    pub fn replace(&mut self, value: Value) -> Option<Value> {
        let previous = self.take();
        *self = Dynamic::new(value);
        previous
    }

    pub fn take(&mut self) -> Option<Value> {
        self.payload.take().map(|boxed| *boxed)
    }
}
