//! Recoverable tier — the advanced traversal behind per-step failure boundaries
//!
//! Every failed step is logged at `warn` with its step name, path and error,
//! recorded in the returned [`Report`], and skipped: a reference that cannot
//! be borrowed keeps its subtree as-is, and a replacement that cannot be
//! written back leaves the previous value in place. Siblings of a failed
//! step are still normalized. The call itself never fails.

use std::fmt;

use tracing::warn;

use super::{FaultPolicy, Step, Traversal};
use crate::path::Path;
use crate::value::Value;
use crate::{Error, Result};

/// One isolated failure
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    pub step: Step,
    pub path: String,
    pub error: Error,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed at {}: {}", self.step, self.path, self.error)
    }
}

/// Outcome of a normalization call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    faults: Vec<Fault>,
}

impl Report {
    /// True when no step failed
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }

    pub fn faults(&self) -> &[Fault] {
        &self.faults
    }

    fn record(&mut self, step: Step, path: String, error: Error) {
        warn!(step = %step, path = %path, error = %error, "normalization step failed");
        self.faults.push(Fault { step, path, error });
    }
}

/// Log, record and continue
#[derive(Default)]
pub(crate) struct Isolate {
    report: Report,
}

impl FaultPolicy for Isolate {
    fn on_fault(&mut self, step: Step, path: &Path, error: Error) -> Result<()> {
        self.report.record(step, path.to_string(), error);
        Ok(())
    }
}

/// Normalize the record behind a reference, isolating every failed step.
///
/// Anything other than a non-null reference to a record type is a no-op
/// and yields a clean report.
pub fn normalize(root: &Value) -> Report {
    let Value::Reference(reference) = root else {
        return Report::default();
    };
    if reference.is_null() || !reference.target_type().is_record() {
        return Report::default();
    }

    let mut traversal = Traversal::new(Isolate::default());
    let outcome = traversal.reference(reference);
    settle(traversal.finish("recoverable").report, outcome)
}

/// Outer boundary. `Isolate` absorbs every guarded step, so only an error
/// raised outside a guard lands here, as a `top level` fault at `$`.
fn settle(mut report: Report, outcome: Result<()>) -> Report {
    if let Err(error) = outcome {
        report.record(Step::TopLevel, Path::root().to_string(), error);
    }
    report
}
