//! # replaykit
//!
//! Fixed-capacity experience replay buffers with:
//! - A flat storage engine with circular overwrite and uniform sampling
//! - A wrapper layer translating nested key-value records to flat rows
//! - Lossless snapshots bundling the wrapper state with the engine data
//! - One-ahead prefetching of sampled batches
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Caller                               │
//! │             push(record) / sample(n) / get(i)                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ logical records (nested maps)
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 TransformingBuffer                           │
//! │        NestedTransform: frozen key-path → slot mapping       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ physical rows (fixed width)
//!                       ▼
//!               ┌───────────────┐        ┌──────────────────┐
//!               │  FlatBuffer   │──dump─▶│ Snapshot archive │
//!               │ (circular)    │        │ params + engine  │
//!               └───────────────┘        └──────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod buffer;
pub mod wrapper;
pub mod archive;
pub mod prefetch;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ReplayError, Result};
pub use config::BufferConfig;
pub use record::{Entry, Record, Value};
pub use buffer::{FlatBuffer, ReplayBuffer, StorageEngine};
pub use wrapper::{DictReplayBuffer, Mapping, MappingNode, NestedTransform, Transform, TransformingBuffer};
pub use prefetch::{for_each_sample, iter_sample, SampleIter};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of replaykit
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
