//! Wrapper Module
//!
//! Decorators that present a logical view over a storage engine.
//!
//! ## Data Flow
//! ```text
//!   caller ──push(logical)──▶ Transform::unwrap ──physical──▶ engine.push
//!   caller ◀──logical batch── Transform::wrap   ◀──physical── engine.sample
//! ```
//!
//! ## Responsibilities
//! - `Transform`: a pair of inverse conversions plus the state they need
//!   (for `NestedTransform`, the frozen key-path → slot mapping)
//! - `TransformingBuffer`: owns one engine, runs every push/sample/index
//!   through the transform, implements merge and the combined snapshot
//!
//! ## Lifecycle of a Transform
//! The first `unwrap` is the only call allowed to establish conversion
//! state. From then on the state is frozen, including across dump/load.

mod nested;
mod transforming;

use crate::error::Result;
use crate::record::Value;

pub use nested::{Mapping, MappingNode, NestedTransform};
pub use transforming::TransformingBuffer;

use crate::buffer::FlatBuffer;

/// Buffer accepting nested key-value records
pub type DictReplayBuffer<E = FlatBuffer> = TransformingBuffer<NestedTransform, E>;

/// Conversion between a logical record and a flat physical row
///
/// `wrap(unwrap(x)) == x` must hold for every `x` accepted by `unwrap`
/// once the conversion state is frozen.
pub trait Transform: PartialEq + Sized + 'static {
    /// Logical record type; sampled batches use the same type in bulk form
    type Logical;

    /// Flatten a logical record into physical slots
    ///
    /// The first call may derive conversion state from `data`. A failure
    /// leaves no usable partial row.
    fn unwrap(&mut self, data: Self::Logical, bulk: bool) -> Result<Vec<Value>>;

    /// Rebuild a logical record from physical slots
    fn wrap(&self, data: Vec<Value>) -> Result<Self::Logical>;

    /// Conversion state as a UTF-8 JSON document
    fn running_params(&self) -> Result<Vec<u8>>;

    /// Restore conversion state verbatim from `running_params` output
    fn from_running_params(params: &[u8]) -> Result<Self>;
}
