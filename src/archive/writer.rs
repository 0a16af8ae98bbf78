//! Archive Writer
//!
//! Collects named entries and writes them as one compressed archive.

use std::io::Write;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{ReplayError, Result};

use super::{HEADER_SIZE, MAGIC, VERSION};

/// Builds a snapshot archive in memory
pub struct ArchiveWriter {
    /// Zstd compression level
    level: i32,

    /// Entries in insertion order
    entries: Vec<(String, Bytes)>,
}

impl ArchiveWriter {
    /// Create a writer compressing entries at `level`
    pub fn new(level: i32) -> Self {
        Self {
            level,
            entries: Vec::new(),
        }
    }

    /// Add a named entry. Names must be unique.
    pub fn add(&mut self, name: &str, data: impl Into<Bytes>) -> Result<()> {
        if name.len() > u16::MAX as usize {
            return Err(ReplayError::Archive(format!(
                "Entry name too long: {} bytes",
                name.len()
            )));
        }
        if self.entries.iter().any(|(n, _)| n == name) {
            return Err(ReplayError::Archive(format!("Duplicate entry: {}", name)));
        }
        if self.entries.len() == u16::MAX as usize {
            return Err(ReplayError::Archive("Too many entries".to_string()));
        }

        self.entries.push((name.to_string(), data.into()));
        Ok(())
    }

    /// Number of entries added so far
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Compress every entry and write the archive to `sink`
    pub fn finish(self, sink: &mut dyn Write) -> Result<()> {
        let mut out = BytesMut::with_capacity(HEADER_SIZE);
        out.put_slice(MAGIC);
        out.put_u16_le(VERSION);
        out.put_u16_le(self.entries.len() as u16);

        for (name, raw) in &self.entries {
            let compressed = zstd::encode_all(raw.as_ref(), self.level).map_err(|e| {
                ReplayError::Archive(format!("Failed to compress entry {}: {}", name, e))
            })?;

            let mut hasher = crc32fast::Hasher::new();
            hasher.update(raw);

            out.reserve(2 + name.len() + 8 + 4 + 8 + compressed.len());
            out.put_u16_le(name.len() as u16);
            out.put_slice(name.as_bytes());
            out.put_u64_le(raw.len() as u64);
            out.put_u32_le(hasher.finalize());
            out.put_u64_le(compressed.len() as u64);
            out.put_slice(&compressed);

            tracing::trace!(entry = %name, raw = raw.len(), compressed = compressed.len(), "archived entry");
        }

        sink.write_all(&out)?;
        sink.flush()?;
        Ok(())
    }
}
