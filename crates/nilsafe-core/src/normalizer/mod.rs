//! Normalizers — replace absent containers with empty ones
//!
//! Three tiers trade strictness for resilience:
//!
//! - [`basic`]: direct public members of one record, recursing into nested
//!   records. No cycle tracking, no dynamic slots, no element-wise work.
//! - [`advanced`]: full descent through references, dynamic slots, records,
//!   sequences and mappings. Any failed step aborts the call.
//! - [`recoverable`]: the advanced traversal with every failed step logged,
//!   recorded and skipped. Never fails.
//!
//! # Guarantees (advanced, recoverable)
//!
//! - **Absent-free**: no sequence or mapping reachable through writable
//!   storage is left absent
//! - **Idempotent**: normalizing twice is the same as normalizing once
//! - **Cycle-safe**: each reference identity is entered at most once per call
//! - **Scalar-preserving**: scalars are never touched
//!
//! # Addressability
//!
//! Reference targets, record members and the argument itself are mutated
//! in place. Dynamic payloads, sequence elements, mapping values and
//! privileged members are not: they are normalized as *elements*, producing a
//! replacement that the parent writes back through a checked step.

pub mod advanced;
pub mod basic;
pub mod recoverable;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::access;
use crate::path::{Path, Segment};
use crate::value::{Dynamic, Identity, Mapping, Record, Reference, Sequence, Value, Visibility};
use crate::{Error, Result};

/// A mutation or construction step that can fail during traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Taking exclusive access to a reference target
    BorrowReference,
    /// Writing a privileged member back through the field accessor
    SetField,
    /// Writing a replacement into a sequence index
    SetIndex,
    /// Reinserting a replacement under its mapping key
    SetEntry,
    /// Building a normalized copy of a sequence
    CopySequence,
    /// Building a normalized copy of a mapping
    CopyMapping,
    /// Error escaping the traversal as a whole
    TopLevel,
}

impl Step {
    pub fn name(self) -> &'static str {
        match self {
            Step::BorrowReference => "borrow reference",
            Step::SetField => "set field",
            Step::SetIndex => "set index",
            Step::SetEntry => "set entry",
            Step::CopySequence => "copy sequence",
            Step::CopyMapping => "copy mapping",
            Step::TopLevel => "top level",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Traversal engine ───────────────────────────────────────

/// What to do when a step fails.
///
/// Returning `Err` aborts the traversal; returning `Ok` skips the step and
/// keeps the previous value in place.
pub(crate) trait FaultPolicy {
    fn on_fault(&mut self, step: Step, path: &Path, error: Error) -> Result<()>;
}

/// Counters reported in the per-call debug summary
#[derive(Debug, Default, Clone, Copy)]
struct Stats {
    filled: usize,
    copies: usize,
    references: usize,
    cycles: usize,
}

/// Shared walk used by the advanced and recoverable tiers
pub(crate) struct Traversal<P> {
    policy: P,
    visited: HashSet<Identity>,
    path: Path,
    stats: Stats,
}

impl<P: FaultPolicy> Traversal<P> {
    pub(crate) fn new(policy: P) -> Self {
        Traversal {
            policy,
            visited: HashSet::new(),
            path: Path::root(),
            stats: Stats::default(),
        }
    }

    /// Log the call summary and hand back the policy
    pub(crate) fn finish(self, tier: &str) -> P {
        debug!(
            tier,
            filled = self.stats.filled,
            copies = self.stats.copies,
            references = self.stats.references,
            cycles = self.stats.cycles,
            "normalization finished"
        );
        self.policy
    }

    /// Run a fallible step. `Ok(None)` means the policy absorbed the fault.
    fn guard<T>(&mut self, step: Step, result: Result<T>) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(error) => {
                self.policy.on_fault(step, &self.path, error)?;
                Ok(None)
            }
        }
    }

    fn within<T>(&mut self, segment: Segment, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.path.push(segment);
        let result = f(self);
        self.path.pop();
        result
    }

    // ── In place ───────────────────────────────────────

    /// Normalize addressable storage in place
    pub(crate) fn value(&mut self, value: &mut Value) -> Result<()> {
        match value {
            Value::Scalar(_) => Ok(()),
            Value::Sequence(seq) => self.sequence(seq),
            Value::Mapping(map) => self.mapping(map),
            Value::Record(record) => self.record(record),
            Value::Reference(reference) => self.reference(reference),
            Value::Dynamic(slot) => self.dynamic(slot),
        }
    }

    pub(crate) fn reference(&mut self, reference: &Reference) -> Result<()> {
        let Some(identity) = reference.identity() else {
            return Ok(());
        };
        if !self.visited.insert(identity) {
            self.stats.cycles += 1;
            trace!(path = %self.path, target = %reference.target_type(), "reference already visited");
            return Ok(());
        }
        self.stats.references += 1;
        if let Some(mut target) = self.guard(Step::BorrowReference, reference.write())? {
            self.value(&mut target)?;
        }
        Ok(())
    }

    fn dynamic(&mut self, slot: &mut Dynamic) -> Result<()> {
        let Some(payload) = slot.payload() else {
            return Ok(());
        };
        if let Some(replacement) = self.element(payload)? {
            slot.replace(replacement);
        }
        Ok(())
    }

    fn record(&mut self, record: &mut Record) -> Result<()> {
        let schema = Arc::clone(record.schema());
        for (index, decl) in schema.fields().iter().enumerate() {
            let segment = Segment::Field(decl.name().to_string());
            match decl.visibility() {
                Visibility::Public => {
                    self.within(segment, |t| t.value(record.slot_mut(index)))?;
                }
                Visibility::Privileged => {
                    self.within(segment, |t| t.privileged(record, decl.name()))?;
                }
                Visibility::Private => {
                    trace!(record = schema.name(), field = decl.name(), "skipping private member");
                }
            }
        }
        Ok(())
    }

    fn privileged(&mut self, record: &mut Record, name: &str) -> Result<()> {
        let current = access::read_field(record, name)?;
        if let Some(replacement) = self.element(current)? {
            self.guard(Step::SetField, access::write_field(record, name, replacement))?;
        }
        Ok(())
    }

    fn sequence(&mut self, seq: &mut Sequence) -> Result<()> {
        if seq.fill_absent() {
            self.stats.filled += 1;
        }
        for index in 0..seq.len() {
            self.within(Segment::Index(index), |t| {
                let Some(element) = seq.get(index) else {
                    return Ok(());
                };
                if let Some(replacement) = t.element(element)? {
                    t.guard(Step::SetIndex, seq.set(index, replacement))?;
                }
                Ok(())
            })?;
        }
        Ok(())
    }

    fn mapping(&mut self, map: &mut Mapping) -> Result<()> {
        if map.fill_absent() {
            self.stats.filled += 1;
        }
        let keys: Vec<_> = map.keys().cloned().collect();
        for key in keys {
            self.within(Segment::Key(key.clone()), |t| {
                let Some(value) = map.get(&key) else {
                    return Ok(());
                };
                if let Some(replacement) = t.element(value)? {
                    t.guard(Step::SetEntry, map.insert(key, replacement))?;
                }
                Ok(())
            })?;
        }
        Ok(())
    }

    // ── By copy ────────────────────────────────────────

    /// Normalize a value that cannot be mutated where it lives.
    ///
    /// Returns the replacement to write back, or `None` when there is
    /// nothing to reattach (scalars, references normalized in place, empty
    /// slots, or a copy step absorbed by the policy).
    pub(crate) fn element(&mut self, value: &Value) -> Result<Option<Value>> {
        match value {
            Value::Scalar(_) => Ok(None),
            Value::Reference(reference) => {
                self.reference(reference)?;
                Ok(None)
            }
            Value::Record(record) => {
                let mut copy = record.clone();
                self.stats.copies += 1;
                self.record(&mut copy)?;
                Ok(Some(Value::Record(copy)))
            }
            Value::Dynamic(slot) => match slot.payload() {
                Some(payload) => Ok(self
                    .element(payload)?
                    .map(|copy| Value::Dynamic(Dynamic::new(copy)))),
                None => Ok(None),
            },
            Value::Sequence(seq) => self.copy_sequence(seq),
            Value::Mapping(map) => self.copy_mapping(map),
        }
    }

    fn copy_sequence(&mut self, seq: &Sequence) -> Result<Option<Value>> {
        if seq.is_absent() {
            self.stats.filled += 1;
            let mut filled = seq.clone();
            filled.fill_absent();
            return Ok(Some(Value::Sequence(filled)));
        }
        self.stats.copies += 1;
        let mut items = Vec::with_capacity(seq.len());
        for (index, element) in seq.iter().enumerate() {
            let replacement = self.within(Segment::Index(index), |t| t.element(element))?;
            items.push(replacement.unwrap_or_else(|| element.clone()));
        }
        let elem = seq.elem_type().clone();
        let copy = match seq.fixed_len() {
            Some(_) => Sequence::fixed(elem, items),
            None => Sequence::from_values(elem, items),
        };
        Ok(self.guard(Step::CopySequence, copy)?.map(Value::Sequence))
    }

    fn copy_mapping(&mut self, map: &Mapping) -> Result<Option<Value>> {
        if map.is_absent() {
            self.stats.filled += 1;
            return Ok(Some(Value::Mapping(Mapping::empty(
                map.key_type(),
                map.value_type().clone(),
            ))));
        }
        self.stats.copies += 1;
        let mut entries = Vec::with_capacity(map.len());
        for (key, value) in map.iter() {
            let replacement = self.within(Segment::Key(key.clone()), |t| t.element(value))?;
            entries.push((key.clone(), replacement.unwrap_or_else(|| value.clone())));
        }
        let copy = Mapping::from_entries(map.key_type(), map.value_type().clone(), entries);
        Ok(self.guard(Step::CopyMapping, copy)?.map(Value::Mapping))
    }
}
