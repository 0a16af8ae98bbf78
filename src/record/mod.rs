//! Record Module
//!
//! Data types that flow through the buffers.
//!
//! ## Two Representations
//! - **Physical**: `Vec<Value>`, a flat fixed-width row. This is all a
//!   storage engine ever sees; slot `i` of every row holds the same field.
//! - **Logical**: `Record` (`Vec<Entry>`), where each top-level entry is
//!   either a plain value or an ordered map of named entries, nested to any
//!   depth.
//!
//! ## Bulk Form
//! A bulk push carries many rows at once. Every leaf is then a
//! `Value::Batch` and all batches share one length:
//! ```text
//! single: [ Int(1),           Map{ "a": Float(0.5) } ]
//! bulk:   [ Batch[Int(1),..], Map{ "a": Batch[Float(0.5),..] } ]
//! ```
//! Sampled batches come back in the same bulk form.

mod entry;
mod value;

pub use entry::{Entry, Record};
pub use value::Value;
