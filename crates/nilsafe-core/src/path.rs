//! Graph paths for diagnostics
//!
//! Rendered JSONPath-style from the root: `$.result.links[2]["content-type"]`.
//! References and dynamic slots are transparent.

use std::fmt;

use crate::value::Key;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Field(String),
    Index(usize),
    Key(Key),
}

/// Location of a value relative to the root of a traversal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn pop(&mut self) {
        self.segments.pop();
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.segments {
            match segment {
                Segment::Field(name) => write!(f, ".{}", name)?,
                Segment::Index(i) => write!(f, "[{}]", i)?,
                Segment::Key(Key::String(s)) => write!(f, "[{:?}]", s)?,
                Segment::Key(key) => write!(f, "[{}]", key)?,
            }
        }
        Ok(())
    }
}
