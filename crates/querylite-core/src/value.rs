//! Runtime values and materialized rows.
//!
//! Typed fields lower into [`Value`] when a predicate is built or an entity
//! is written, and rows coming back from a store are lifted out of it again.

use crate::error::{Error, Result};
use crate::schema::{Field, FieldType};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Value type tag carried by field descriptors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Text
    String,
    /// Signed 64-bit integer
    Integer,
    /// 64-bit float
    Float,
    /// Boolean
    Boolean,
    /// Identifier of another entity
    Reference,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::String => write!(f, "string"),
            ValueType::Integer => write!(f, "integer"),
            ValueType::Float => write!(f, "float"),
            ValueType::Boolean => write!(f, "boolean"),
            ValueType::Reference => write!(f, "reference"),
        }
    }
}

/// A single stored or literal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Integers and entity references
    Integer(i64),
    /// Floating point number
    Float(f64),
    /// Text
    String(String),
    /// Boolean
    Boolean(bool),
    /// Absent value; compares as unknown
    Null,
}

impl Value {
    /// True for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in mapping errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Boolean(_) => "boolean",
            Value::Null => "null",
        }
    }

    /// Compares two non-null values of compatible types.
    ///
    /// Returns `None` when either side is null or the types cannot be
    /// compared; callers treat that as SQL "unknown".
    pub fn partial_compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Integer(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl Value {
    /// Total order used for sorting non-null values.
    ///
    /// Agrees with [`partial_compare`](Self::partial_compare) wherever that
    /// is defined. NaN sorts above every other number and equal to itself.
    /// Values of incomparable types are ordered by type: booleans, numbers,
    /// strings.
    pub fn sort_compare(&self, other: &Value) -> Ordering {
        if let Some(ordering) = self.partial_compare(other) {
            return ordering;
        }
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => match (a.is_nan(), b.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => a.total_cmp(&b),
            },
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Integer(_) | Value::Float(_) => 2,
            Value::String(_) => 3,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", FloatLiteral(*fl)),
            Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
        }
    }
}

/// Renders a float so the query lexer reads back the same value.
pub(crate) struct FloatLiteral(pub(crate) f64);

impl fmt::Display for FloatLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.0;
        if value.is_nan() {
            write!(f, "nan")
        } else if value.is_infinite() {
            write!(f, "{}infinity", if value < 0.0 { "-" } else { "" })
        } else {
            write!(f, "{:?}", value)
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// A materialized result row: column names with their values, in order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Creates an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a row from parallel column and value vectors.
    pub fn from_parts(columns: Vec<String>, values: Vec<Value>) -> Result<Self> {
        if columns.len() != values.len() {
            return Err(Error::InvalidArgument(format!(
                "row has {} columns but {} values",
                columns.len(),
                values.len()
            )));
        }
        Ok(Self { columns, values })
    }

    /// Appends a typed field value.
    pub fn with<E, T: FieldType>(mut self, field: &Field<E, T>, value: T) -> Self {
        self.columns.push(field.name().to_string());
        self.values.push(value.into_value());
        self
    }

    /// Appends a raw column value.
    pub fn push(&mut self, column: impl Into<String>, value: Value) {
        self.columns.push(column.into());
        self.values.push(value);
    }

    /// Column names, in insertion order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Column values, aligned with [`columns`](Self::columns).
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value of a column, if present.
    pub fn value(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
    }

    /// Typed value of a field.
    ///
    /// A missing column maps like a null, so non-nullable fields report it
    /// as a mapping error.
    pub fn get<E, T: FieldType>(&self, field: &Field<E, T>) -> Result<T> {
        let value = self.value(field.name()).cloned().unwrap_or(Value::Null);
        T::from_value(field.name(), value)
    }

    /// Splits the row into column names and values.
    pub fn into_parts(self) -> (Vec<String>, Vec<Value>) {
        (self.columns, self.values)
    }
}
