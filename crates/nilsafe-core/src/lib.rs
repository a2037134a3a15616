//! nilsafe core — object-graph normalization
//!
//! Decoded API responses often carry *absent* sequences and mappings where a
//! consumer expects containers. This crate walks an arbitrary, possibly
//! cyclic graph of [`Value`]s and replaces every absent container with an
//! empty one of the same type, so the graph can cross the wire boundary.
//!
//! # Architecture
//!
//! ```text
//! JSON → wire::decode → Value graph → normalize(tier) → wire::encode → JSON
//!                          ↑                ↑
//!                    TypeRegistry     access::{get_field, set_field}
//! ```
//!
//! # Guarantees
//!
//! - **Absent-free**: after the advanced or recoverable tier no reachable
//!   public or privileged container is absent
//! - **Idempotent**: `normalize(normalize(x)) == normalize(x)`
//! - **Cycle-safe**: every reference identity is entered at most once per call
//! - **Isolated**: the recoverable tier never fails; faults are reported

pub mod access;
pub mod error;
pub mod fingerprint;
pub mod normalizer;
pub mod path;
pub mod value;
pub mod wire;

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use access::{get_field, set_field};
pub use error::{Error, Result};
pub use fingerprint::fingerprint;
pub use normalizer::recoverable::{Fault, Report};
pub use normalizer::Step;
pub use value::{
    Dynamic, Key, Mapping, Record, RecordSchema, Reference, Scalar, ScalarType, SchemaDocument,
    Sequence, Type, TypeRegistry, Value, Visibility,
};

// ── Tiers ──────────────────────────────────────────────────

/// Normalization strictness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Shallow, public members only, no cycle tracking
    #[default]
    Basic,
    /// Full traversal, aborts on the first failed step
    Advanced,
    /// Full traversal, isolates every failed step
    Recoverable,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Basic, Tier::Advanced, Tier::Recoverable];

    pub fn name(self) -> &'static str {
        match self {
            Tier::Basic => "basic",
            Tier::Advanced => "advanced",
            Tier::Recoverable => "recoverable",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unrecognized names select [`Tier::Basic`]
impl FromStr for Tier {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let tier = match s.trim().to_ascii_lowercase().as_str() {
            "advanced" => Tier::Advanced,
            "recoverable" => Tier::Recoverable,
            _ => Tier::Basic,
        };
        Ok(tier)
    }
}

/// `1` advanced, `2` recoverable, anything else basic
impl From<u8> for Tier {
    fn from(code: u8) -> Self {
        match code {
            1 => Tier::Advanced,
            2 => Tier::Recoverable,
            _ => Tier::Basic,
        }
    }
}

// ── Public API ─────────────────────────────────────────────

/// Normalize `value` with the selected tier.
///
/// Basic and advanced return an empty report or an error. Recoverable
/// always returns `Ok` with the faults it isolated.
pub fn normalize(value: &mut Value, tier: Tier) -> Result<Report> {
    match tier {
        Tier::Basic => normalizer::basic::normalize(value).map(|()| Report::default()),
        Tier::Advanced => normalizer::advanced::normalize(value).map(|()| Report::default()),
        Tier::Recoverable => Ok(normalizer::recoverable::normalize(value)),
    }
}

/// Shallow normalization of the record behind a reference
pub fn normalize_basic(root: &Value) -> Result<()> {
    normalizer::basic::normalize(root)
}

/// Full, fail-fast normalization of any value
pub fn normalize_advanced(value: &mut Value) -> Result<()> {
    normalizer::advanced::normalize(value)
}

/// Full normalization of the record behind a reference; never fails
pub fn normalize_recoverable(root: &Value) -> Report {
    normalizer::recoverable::normalize(root)
}
