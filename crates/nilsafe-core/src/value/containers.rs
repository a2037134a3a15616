//! Sequences and mappings
//!
//! Both containers carry their declared element type and may be *absent*
//! (the null container), which is distinct from present-but-empty.
//! Fixed-length sequences are never absent.

use std::collections::BTreeMap;

use super::scalar::Key;
use super::types::{ScalarType, Type};
use super::Value;
use crate::{Error, Result};

// ── Sequence ──────────────────────────────────────────────

/// Ordered list of values of one declared element type
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    elem: Type,
    len: Option<usize>,
    items: Option<Vec<Value>>,
}

impl Sequence {
    /// The absent (null) variable-length sequence
    pub fn absent(elem: Type) -> Self {
        Sequence {
            elem,
            len: None,
            items: None,
        }
    }

    /// A present, zero-length variable-length sequence
    pub fn empty(elem: Type) -> Self {
        Sequence {
            elem,
            len: None,
            items: Some(Vec::new()),
        }
    }

    /// Variable-length sequence; each value is coerced to `elem`
    pub fn from_values(elem: Type, values: impl IntoIterator<Item = Value>) -> Result<Self> {
        let items = values
            .into_iter()
            .map(|v| v.coerce_to(&elem))
            .collect::<Result<Vec<_>>>()?;
        Ok(Sequence {
            elem,
            len: None,
            items: Some(items),
        })
    }

    /// Fixed-length sequence whose length is the number of values given
    pub fn fixed(elem: Type, values: Vec<Value>) -> Result<Self> {
        let mut seq = Sequence::from_values(elem, values)?;
        seq.len = Some(seq.len());
        Ok(seq)
    }

    /// Assemble from already-typed parts
    pub(crate) fn from_parts(elem: Type, len: Option<usize>, items: Option<Vec<Value>>) -> Self {
        Sequence { elem, len, items }
    }

    pub fn elem_type(&self) -> &Type {
        &self.elem
    }

    /// `Some(n)` for fixed-length sequences
    pub fn fixed_len(&self) -> Option<usize> {
        self.len
    }

    pub fn ty(&self) -> Type {
        Type::Sequence {
            elem: Box::new(self.elem.clone()),
            len: self.len,
        }
    }

    pub fn is_absent(&self) -> bool {
        self.items.is_none()
    }

    pub fn len(&self) -> usize {
        self.items.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.as_ref()?.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.as_deref().unwrap_or(&[]).iter()
    }

    /// Replace the element at `index`, returning the previous one.
    ///
    /// The new value is coerced to the element type before anything is
    /// written; on error the sequence is unchanged.
    pub fn set(&mut self, index: usize, value: Value) -> Result<Value> {
        let value = value.coerce_to(&self.elem)?;
        let len = self.len();
        let slot = self
            .items
            .as_mut()
            .and_then(|items| items.get_mut(index))
            .ok_or(Error::OutOfBounds { index, len })?;
        Ok(std::mem::replace(slot, value))
    }

    /// Append to a variable-length sequence, materializing it if absent
    pub fn push(&mut self, value: Value) -> Result<()> {
        if let Some(len) = self.len {
            return Err(Error::OutOfBounds { index: len, len });
        }
        let value = value.coerce_to(&self.elem)?;
        self.items.get_or_insert_with(Vec::new).push(value);
        Ok(())
    }

    /// Replace the absent state with an empty sequence. Returns true if
    /// the sequence was absent.
    pub fn fill_absent(&mut self) -> bool {
        if self.items.is_some() {
            return false;
        }
        self.items = Some(Vec::new());
        true
    }
}

// ── Mapping ───────────────────────────────────────────────

/// Associative container from scalar keys to values of one declared type
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    key: ScalarType,
    value: Type,
    entries: Option<BTreeMap<Key, Value>>,
}

impl Mapping {
    /// The absent (null) mapping
    pub fn absent(key: ScalarType, value: Type) -> Self {
        Mapping {
            key,
            value,
            entries: None,
        }
    }

    /// A present mapping with no entries
    pub fn empty(key: ScalarType, value: Type) -> Self {
        Mapping {
            key,
            value,
            entries: Some(BTreeMap::new()),
        }
    }

    pub fn from_entries(
        key: ScalarType,
        value: Type,
        entries: impl IntoIterator<Item = (Key, Value)>,
    ) -> Result<Self> {
        let mut mapping = Mapping::empty(key, value);
        for (k, v) in entries {
            mapping.insert(k, v)?;
        }
        Ok(mapping)
    }

    pub(crate) fn from_parts(
        key: ScalarType,
        value: Type,
        entries: Option<BTreeMap<Key, Value>>,
    ) -> Self {
        Mapping {
            key,
            value,
            entries,
        }
    }

    pub fn key_type(&self) -> ScalarType {
        self.key
    }

    pub fn value_type(&self) -> &Type {
        &self.value
    }

    pub fn ty(&self) -> Type {
        Type::map(self.key, self.value.clone())
    }

    pub fn is_absent(&self) -> bool {
        self.entries.is_none()
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &Key) -> Option<&Value> {
        self.entries.as_ref()?.get(key)
    }

    /// Entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.entries.iter().flat_map(BTreeMap::iter)
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.iter().map(|(k, _)| k)
    }

    /// Insert an entry, materializing the mapping if absent.
    ///
    /// Key and value are checked against the declared types first; on
    /// error the mapping is unchanged.
    pub fn insert(&mut self, key: Key, value: Value) -> Result<Option<Value>> {
        let key = key.check(self.key)?;
        let value = value.coerce_to(&self.value)?;
        Ok(self.entries.get_or_insert_with(BTreeMap::new).insert(key, value))
    }

    pub fn remove(&mut self, key: &Key) -> Option<Value> {
        self.entries.as_mut()?.remove(key)
    }

    /// Replace the absent state with an empty mapping. Returns true if
    /// the mapping was absent.
    pub fn fill_absent(&mut self) -> bool {
        if self.entries.is_some() {
            return false;
        }
        self.entries = Some(BTreeMap::new());
        true
    }
}
