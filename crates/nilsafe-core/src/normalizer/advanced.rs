//! Advanced tier — full, cycle-safe, fail-fast normalization
//!
//! The first failed step aborts the call with [`Error::Traversal`], which
//! names the step and the path where it failed.

use super::{FaultPolicy, Step, Traversal};
use crate::path::Path;
use crate::value::Value;
use crate::{Error, Result};

/// Abort on the first fault
pub(crate) struct FailFast;

impl FaultPolicy for FailFast {
    fn on_fault(&mut self, step: Step, path: &Path, error: Error) -> Result<()> {
        Err(Error::Traversal {
            step,
            path: path.to_string(),
            source: Box::new(error),
        })
    }
}

/// Normalize any value in place.
///
/// The argument is addressable, so a record or container passed directly is
/// mutated in place. Pass a reference to share the result with other
/// holders of the same cell.
pub fn normalize(value: &mut Value) -> Result<()> {
    let mut traversal = Traversal::new(FailFast);
    traversal.value(value)?;
    traversal.finish("advanced");
    Ok(())
}

/// Normalize a value that is not addressable and return its replacement.
///
/// References are normalized in place and returned as-is (same identity).
/// Records, sequences and mappings come back as normalized copies; the
/// argument itself is never modified.
pub fn normalize_element(value: &Value) -> Result<Value> {
    let mut traversal = Traversal::new(FailFast);
    let replacement = traversal.element(value)?;
    traversal.finish("advanced");
    Ok(replacement.unwrap_or_else(|| value.clone()))
}
