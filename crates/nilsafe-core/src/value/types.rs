//! Type descriptors for graph values
//!
//! Every slot in a graph (record member, sequence element, mapping value,
//! reference target) declares one of these types. Types have a textual form
//! used by schema documents:
//!
//! ```text
//! Boolean | Int32 | Integer | Float32 | Float | String | Any
//! Array<T> | Array<T, N> | Map<K, V> | Ref<T> | RecordName
//! ```

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Longest fixed-length array a type may declare
pub const MAX_ARRAY_LEN: usize = 1 << 16;

/// Deepest nesting of `Array`, `Map` and `Ref` in one type expression
pub const MAX_TYPE_DEPTH: usize = 64;

/// Reject fixed lengths above [`MAX_ARRAY_LEN`]
pub(crate) fn check_array_len(len: usize) -> Result<()> {
    if len > MAX_ARRAY_LEN {
        return Err(Error::TypeSyntax(format!(
            "array length {} exceeds {}",
            len, MAX_ARRAY_LEN
        )));
    }
    Ok(())
}

/// Leaf value types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Boolean,
    Int32,
    Integer,
    Float32,
    Float,
    String,
}

impl ScalarType {
    /// Whether the type may key a mapping (floats cannot)
    pub fn is_key_type(self) -> bool {
        !matches!(self, ScalarType::Float32 | ScalarType::Float)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarType::Boolean => "Boolean",
            ScalarType::Int32 => "Int32",
            ScalarType::Integer => "Integer",
            ScalarType::Float32 => "Float32",
            ScalarType::Float => "Float",
            ScalarType::String => "String",
        };
        f.write_str(name)
    }
}

/// Declared type of a slot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Scalar(ScalarType),
    /// Variable-length when `len` is `None`, fixed-length otherwise
    Sequence { elem: Box<Type>, len: Option<usize> },
    Map { key: ScalarType, value: Box<Type> },
    /// Record type, by registered name
    Record(String),
    Reference(Box<Type>),
    /// Dynamic slot holding a value of any type
    Any,
}

impl Type {
    pub fn sequence(elem: Type) -> Self {
        Type::Sequence {
            elem: Box::new(elem),
            len: None,
        }
    }

    pub fn array(elem: Type, len: usize) -> Self {
        Type::Sequence {
            elem: Box::new(elem),
            len: Some(len),
        }
    }

    pub fn map(key: ScalarType, value: Type) -> Self {
        Type::Map {
            key,
            value: Box::new(value),
        }
    }

    pub fn record(name: impl Into<String>) -> Self {
        Type::Record(name.into())
    }

    pub fn reference(target: Type) -> Self {
        Type::Reference(Box::new(target))
    }

    pub fn is_record(&self) -> bool {
        matches!(self, Type::Record(_))
    }
}

impl From<ScalarType> for Type {
    fn from(scalar: ScalarType) -> Self {
        Type::Scalar(scalar)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Scalar(s) => write!(f, "{}", s),
            Type::Sequence { elem, len: None } => write!(f, "Array<{}>", elem),
            Type::Sequence {
                elem,
                len: Some(n),
            } => write!(f, "Array<{}, {}>", elem, n),
            Type::Map { key, value } => write!(f, "Map<{}, {}>", key, value),
            Type::Record(name) => f.write_str(name),
            Type::Reference(target) => write!(f, "Ref<{}>", target),
            Type::Any => f.write_str("Any"),
        }
    }
}

impl FromStr for Type {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parser = TypeParser::new(s);
        let ty = parser.parse_type()?;
        parser.skip_whitespace();
        if !parser.is_at_end() {
            return Err(parser.error("trailing input"));
        }
        Ok(ty)
    }
}

// ── Parser ────────────────────────────────────────────────

struct TypeParser {
    input: Vec<char>,
    position: usize,
    depth: usize,
}

impl TypeParser {
    fn new(text: &str) -> Self {
        TypeParser {
            input: text.chars().collect(),
            position: 0,
            depth: 0,
        }
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
            self.position += 1;
        }
    }

    fn error(&self, message: &str) -> Error {
        let text: String = self.input.iter().collect();
        Error::TypeSyntax(format!("{} at column {} in {:?}", message, self.position + 1, text))
    }

    fn expect(&mut self, ch: char) -> Result<()> {
        self.skip_whitespace();
        if self.peek() == Some(ch) {
            self.position += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", ch)))
        }
    }

    fn read_identifier(&mut self) -> Result<String> {
        self.skip_whitespace();
        let start = self.position;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.position += 1;
        }
        if start == self.position {
            return Err(self.error("expected a type name"));
        }
        Ok(self.input[start..self.position].iter().collect())
    }

    fn read_length(&mut self) -> Result<usize> {
        self.skip_whitespace();
        let start = self.position;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.position += 1;
        }
        let digits: String = self.input[start..self.position].iter().collect();
        let len = digits
            .parse()
            .map_err(|_| self.error("expected an array length"))?;
        if len > MAX_ARRAY_LEN {
            return Err(self.error(&format!("array length exceeds {}", MAX_ARRAY_LEN)));
        }
        Ok(len)
    }

    fn parse_type(&mut self) -> Result<Type> {
        if self.depth >= MAX_TYPE_DEPTH {
            return Err(self.error(&format!("type nested deeper than {}", MAX_TYPE_DEPTH)));
        }
        self.depth += 1;
        let ty = self.parse_named();
        self.depth -= 1;
        ty
    }

    fn parse_named(&mut self) -> Result<Type> {
        let name = self.read_identifier()?;
        match name.as_str() {
            "Boolean" => Ok(Type::Scalar(ScalarType::Boolean)),
            "Int32" => Ok(Type::Scalar(ScalarType::Int32)),
            "Integer" => Ok(Type::Scalar(ScalarType::Integer)),
            "Float32" => Ok(Type::Scalar(ScalarType::Float32)),
            "Float" => Ok(Type::Scalar(ScalarType::Float)),
            "String" => Ok(Type::Scalar(ScalarType::String)),
            "Any" => Ok(Type::Any),
            "Array" => {
                self.expect('<')?;
                let elem = self.parse_type()?;
                self.skip_whitespace();
                let len = if self.peek() == Some(',') {
                    self.position += 1;
                    Some(self.read_length()?)
                } else {
                    None
                };
                self.expect('>')?;
                Ok(Type::Sequence {
                    elem: Box::new(elem),
                    len,
                })
            }
            "Map" => {
                self.expect('<')?;
                let key = match self.parse_type()? {
                    Type::Scalar(s) if s.is_key_type() => s,
                    other => {
                        return Err(self.error(&format!("{} cannot key a map", other)));
                    }
                };
                self.expect(',')?;
                let value = self.parse_type()?;
                self.expect('>')?;
                Ok(Type::map(key, value))
            }
            "Ref" => {
                self.expect('<')?;
                let target = self.parse_type()?;
                self.expect('>')?;
                Ok(Type::reference(target))
            }
            _ => Ok(Type::Record(name)),
        }
    }
}
