//! Archive Module
//!
//! Compressed container bundling the parts of a buffer snapshot.
//!
//! ## Entries
//! - `running_params.json`: conversion state of the wrapper (UTF-8 JSON)
//! - `base_buffer.zip`: the engine's own snapshot bytes, stored verbatim
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │ Header                                              │
//! │ ┌──────────┬──────────┬──────────────┐              │
//! │ │Magic (4) │Version(2)│ EntryCount(2)│              │
//! │ └──────────┴──────────┴──────────────┘              │
//! ├─────────────────────────────────────────────────────┤
//! │ Entry (repeated EntryCount times)                   │
//! │ ┌────────┬──────┬────────┬─────────┬────────┬─────┐ │
//! │ │NameLen │ Name │RawLen  │CRC32    │ZstdLen │Data │ │
//! │ │  (2)   │      │  (8)   │ raw (4) │  (8)   │     │ │
//! │ └────────┴──────┴────────┴─────────┴────────┴─────┘ │
//! └─────────────────────────────────────────────────────┘
//! ```
//! All integers are little-endian. Each entry is compressed on its own.
//!
//! This is not a zip file. The entry names are fixed for compatibility of
//! layout only; snapshots written by zip-based tools cannot be read here,
//! and `dump` output cannot be opened by them.

mod reader;
mod writer;

pub use reader::ArchiveReader;
pub use writer::ArchiveWriter;

/// Magic bytes identifying a snapshot archive
pub const MAGIC: &[u8; 4] = b"RKAR";

/// Current format version
pub const VERSION: u16 = 1;

/// Header size: magic + version + entry count
pub const HEADER_SIZE: usize = 4 + 2 + 2;

/// Entry holding the wrapper's conversion state
pub const RUNNING_PARAMS_ENTRY: &str = "running_params.json";

/// Entry holding the engine snapshot
pub const BASE_BUFFER_ENTRY: &str = "base_buffer.zip";
