//! Buffer Module
//!
//! The capability interface every replay buffer satisfies, plus the flat
//! fixed-capacity storage engine the wrappers sit on.
//!
//! ## Responsibilities
//! - `ReplayBuffer`: push / sample / index / merge / dump / load
//! - `StorageEngine`: a `ReplayBuffer` over flat physical rows that also
//!   exposes its field containers (one column per slot)
//! - `FlatBuffer`: circular overwrite, uniform sampling, own snapshot format
//!
//! ## Memory Layout
//! ```text
//!            slot 0     slot 1     slot 2
//!          ┌──────────┬──────────┬──────────┐
//! row 0    │ Int(1)   │ Float(.) │ Array[.] │
//! row 1    │ Int(2)   │ Float(.) │ Array[.] │
//!  ...     │   ...    │   ...    │   ...    │
//! row m-1  │ Int(m)   │ Float(.) │ Array[.] │   m = mem_size
//!          └──────────┴──────────┴──────────┘
//!            column     column     column
//! ```
//! Row `count mod mem_size` is overwritten once the buffer is full.

mod codec;
mod flat;

use std::any::Any;
use std::io::{Read, Write};
use std::ops::Range;

use crate::config::BufferConfig;
use crate::error::{ReplayError, Result};
use crate::record::Value;

pub use codec::{EngineSnapshot, HEADER_SIZE, MAGIC, VERSION};
pub use flat::FlatBuffer;

/// Shared capability interface of every buffer in the stack
///
/// `Record` is what one push carries and one index returns; `Batch` is what
/// one sample returns.
pub trait ReplayBuffer: Any {
    type Record;
    type Batch;

    /// Fixed capacity set at construction
    fn mem_size(&self) -> usize;

    /// Number of records ever pushed (keeps growing past capacity)
    fn count(&self) -> usize;

    /// Number of records currently held
    fn len(&self) -> usize {
        self.mem_size().min(self.count())
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the buffer has reached capacity
    fn is_full(&self) -> bool {
        self.count() >= self.mem_size()
    }

    /// Bytes held by the underlying storage
    fn nbytes(&self) -> usize;

    /// Push one record, or many when `bulk` is set
    fn push(&mut self, data: Self::Record, bulk: bool) -> Result<()>;

    /// Draw a batch of `batch_size` records
    fn sample(&self, batch_size: usize) -> Result<Self::Batch>;

    /// The record stored at `index`
    fn get(&self, index: usize) -> Result<Self::Record>;

    /// Append the held records of `other`, which must be the same kind
    fn merge(
        &mut self,
        other: &dyn ReplayBuffer<Record = Self::Record, Batch = Self::Batch>,
    ) -> Result<()>;

    /// Write a snapshot to `sink`
    fn dump(&self, sink: &mut dyn Write) -> Result<()>;

    /// Rebuild a buffer from a snapshot written by `dump`
    fn load(source: &mut dyn Read) -> Result<Self>
    where
        Self: Sized;

    /// Concrete type name, used for exact-kind checks
    fn kind(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn as_any(&self) -> &dyn Any;
}

/// A buffer over flat physical rows
pub trait StorageEngine: ReplayBuffer<Record = Vec<Value>, Batch = Vec<Value>> {
    /// Create an empty engine
    fn from_config(config: BufferConfig) -> Result<Self>
    where
        Self: Sized;

    /// The configuration this engine was built with
    fn config(&self) -> &BufferConfig;

    /// Field containers, one column per slot, `len()` rows each
    fn memory(&self) -> &[Vec<Value>];
}

/// Downcast `other` to the concrete kind of `this`
///
/// Fails with `MergeKindMismatch` when the kinds differ, even if both
/// satisfy the same interface.
pub fn same_kind<'a, B: ReplayBuffer>(
    this: &B,
    other: &'a dyn ReplayBuffer<Record = B::Record, Batch = B::Batch>,
) -> Result<&'a B> {
    other
        .as_any()
        .downcast_ref::<B>()
        .ok_or(ReplayError::MergeKindMismatch {
            expected: this.kind(),
            found: other.kind(),
        })
}

/// Slice every column to `rows` and stack each slice into a bulk slot
pub fn slice_columns(memory: &[Vec<Value>], rows: Range<usize>) -> Vec<Value> {
    memory
        .iter()
        .map(|column| Value::Batch(column[rows.clone()].to_vec()))
        .collect()
}
