//! Leaf values
//!
//! The payload stored in one physical slot.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single leaf value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),

    /// Flat numeric tensor (e.g. an observation vector)
    Array(Vec<f64>),

    /// Values stacked along a leading batch axis
    Batch(Vec<Value>),
}

impl Value {
    /// Approximate number of bytes held by this value
    pub fn nbytes(&self) -> usize {
        match self {
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 8,
            Value::Array(data) => data.len() * 8,
            Value::Batch(items) => items.iter().map(Value::nbytes).sum(),
        }
    }

    /// Name of the variant, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Array(_) => "array",
            Value::Batch(_) => "batch",
        }
    }

    /// Members of a batch, `None` for any other variant
    pub fn as_batch(&self) -> Option<&[Value]> {
        match self {
            Value::Batch(items) => Some(items),
            _ => None,
        }
    }

    /// Consume a batch into its members
    pub fn into_batch(self) -> Option<Vec<Value>> {
        match self {
            Value::Batch(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Array(data) => write!(f, "{:?}", data),
            Value::Batch(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Array(v)
    }
}
