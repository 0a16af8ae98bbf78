//! Error types for replaykit
//!
//! Provides a unified error type for all buffer operations.

use thiserror::Error;

/// Result type alias using ReplayError
pub type Result<T> = std::result::Result<T, ReplayError>;

/// Unified error type for replaykit operations
#[derive(Debug, Error)]
pub enum ReplayError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Structural Errors (logical <-> physical conversion)
    // -------------------------------------------------------------------------
    #[error("Shape mismatch: expected {expected} items, got {found}")]
    ShapeMismatch { expected: usize, found: usize },

    #[error("Missing key '{key}' in entry {entry}")]
    MissingKey { entry: usize, key: String },

    #[error("Unexpected key '{key}' in entry {entry}")]
    UnexpectedKey { entry: usize, key: String },

    #[error("Duplicate key '{key}' in entry {entry}")]
    DuplicateKey { entry: usize, key: String },

    #[error("Expected {expected} for key '{key}' in entry {entry}, got {found}")]
    KindMismatch {
        entry: usize,
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Bulk push length mismatch: expected {expected} rows, got {found}")]
    BulkLengthMismatch { expected: usize, found: usize },

    #[error("Mapping has not been derived yet")]
    MappingUnset,

    /// A mapping that cannot have been produced by derivation. Signals
    /// corrupted state, never bad user input.
    #[error("Corrupted mapping: {0}")]
    CorruptedMapping(String),

    // -------------------------------------------------------------------------
    // Merge Errors
    // -------------------------------------------------------------------------
    #[error("Cannot merge buffer of kind {found} into {expected}")]
    MergeKindMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Cannot merge from an empty buffer")]
    MergeEmptySource,

    #[error("Cannot merge buffers with different physical layouts")]
    LayoutMismatch,

    // -------------------------------------------------------------------------
    // Construction Errors
    // -------------------------------------------------------------------------
    #[error("Base buffer already holds {count} records; construct with from_populated")]
    PrePopulated { count: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Access Errors
    // -------------------------------------------------------------------------
    #[error("Index {index} out of range for buffer of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Cannot sample from an empty buffer")]
    EmptyBuffer,

    #[error("Invalid batch size: {0}")]
    InvalidBatchSize(usize),

    // -------------------------------------------------------------------------
    // Snapshot Errors
    // -------------------------------------------------------------------------
    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
