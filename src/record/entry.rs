//! Logical entries
//!
//! Nested, insertion-ordered key-value trees as callers see them.

use std::fmt;

use super::Value;

/// A logical record: the ordered top-level entries of one push or sample
pub type Record = Vec<Entry>;

/// One node of a logical record
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// A leaf stored in a single physical slot
    Value(Value),

    /// Named children in insertion order. Keys are unique.
    Map(Vec<(String, Entry)>),
}

impl Entry {
    /// Build a map entry from `(key, entry)` pairs, keeping their order
    ///
    /// A repeated key replaces the earlier child in place.
    pub fn map<K, E, I>(pairs: I) -> Self
    where
        K: Into<String>,
        E: Into<Entry>,
        I: IntoIterator<Item = (K, E)>,
    {
        let mut children: Vec<(String, Entry)> = Vec::new();
        for (key, entry) in pairs {
            let key = key.into();
            let entry = entry.into();
            match children.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = entry,
                None => children.push((key, entry)),
            }
        }
        Entry::Map(children)
    }

    /// Look up a direct child of a map entry
    pub fn get(&self, key: &str) -> Option<&Entry> {
        match self {
            Entry::Map(children) => children.iter().find(|(k, _)| k == key).map(|(_, e)| e),
            Entry::Value(_) => None,
        }
    }

    /// The leaf value, if this entry is one
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Entry::Value(v) => Some(v),
            Entry::Map(_) => None,
        }
    }

    /// Name of the entry kind, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Entry::Value(v) => v.kind(),
            Entry::Map(_) => "map",
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Value(v) => write!(f, "{}", v),
            Entry::Map(children) => {
                write!(f, "{{")?;
                for (i, (key, child)) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: {}", key, child)?;
                }
                write!(f, "}}")
            }
        }
    }
}

macro_rules! entry_from_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Entry {
                fn from(v: $ty) -> Self {
                    Entry::Value(Value::from(v))
                }
            }
        )*
    };
}

entry_from_value!(Value, bool, i64, i32, f64, Vec<f64>);
