//! Nested-record adapter
//!
//! Lets a flat engine store records made of plain values and ordered maps
//! nested to any depth.
//!
//! ## Mapping
//! The shape of the first record ever pushed is walked depth-first; every
//! leaf gets the next slot index:
//! ```text
//! record:  [ 32, 65, { "a": 5, "b": { "c": 6, "d": 7 } }, 100 ]
//! mapping: [ 0,  1,  { "a": 2, "b": { "c": 3, "d": 4 } }, 5   ]
//! total_elements: 6
//! ```
//! The mapping is then frozen. Every later record must have the same number
//! of top-level entries and exactly the same key set in every map.
//!
//! ## Persisted Form
//! `{"mapping": [0, 1, {"a": 2, "b": {"c": 3, "d": 4}}, 5], "total_elements": 6}`
//! Object keys are written and read back in mapping order.

mod mapping;
mod transform;

pub use mapping::{Mapping, MappingNode};
pub use transform::NestedTransform;
