//! Archive Reader
//!
//! Parses and verifies a snapshot archive.

use std::io::Read;

use bytes::{Buf, Bytes};

use crate::error::{ReplayError, Result};

use super::{HEADER_SIZE, MAGIC, VERSION};

/// Decompressed entries of a snapshot archive
#[derive(Debug)]
pub struct ArchiveReader {
    entries: Vec<(String, Bytes)>,
}

impl ArchiveReader {
    /// Read a whole archive from `source`, decompressing and checking
    /// every entry
    pub fn read(source: &mut dyn Read) -> Result<Self> {
        let mut raw = Vec::new();
        source.read_to_end(&mut raw)?;
        Self::parse(Bytes::from(raw))
    }

    /// Parse an archive already held in memory
    pub fn parse(mut buf: Bytes) -> Result<Self> {
        if buf.remaining() < HEADER_SIZE {
            return Err(ReplayError::Archive(format!(
                "Incomplete header: expected {} bytes, got {}",
                HEADER_SIZE,
                buf.remaining()
            )));
        }

        let magic = buf.split_to(4);
        if magic.as_ref() != MAGIC {
            return Err(ReplayError::Archive(format!(
                "Bad archive magic: {:?}",
                magic.as_ref()
            )));
        }

        let version = buf.get_u16_le();
        if version != VERSION {
            return Err(ReplayError::Archive(format!(
                "Unsupported archive version: {} (expected {})",
                version, VERSION
            )));
        }

        let entry_count = buf.get_u16_le() as usize;
        let mut entries: Vec<(String, Bytes)> = Vec::with_capacity(entry_count);

        for _ in 0..entry_count {
            let name_len = take_u16(&mut buf, "name length")? as usize;
            let name_bytes = take_bytes(&mut buf, name_len, "name")?;
            let name = String::from_utf8(name_bytes.to_vec())
                .map_err(|_| ReplayError::Archive("Entry name is not UTF-8".to_string()))?;

            let raw_len = take_u64(&mut buf, "raw length")? as usize;
            let stored_crc = take_u32(&mut buf, "checksum")?;
            let compressed_len = take_u64(&mut buf, "compressed length")? as usize;
            let compressed = take_bytes(&mut buf, compressed_len, "data")?;

            let data = zstd::decode_all(compressed.as_ref()).map_err(|e| {
                ReplayError::Archive(format!("Failed to decompress entry {}: {}", name, e))
            })?;

            if data.len() != raw_len {
                return Err(ReplayError::Corruption(format!(
                    "Entry {} decompressed to {} bytes, expected {}",
                    name,
                    data.len(),
                    raw_len
                )));
            }

            let mut hasher = crc32fast::Hasher::new();
            hasher.update(&data);
            let computed_crc = hasher.finalize();
            if computed_crc != stored_crc {
                return Err(ReplayError::Corruption(format!(
                    "Entry {} CRC mismatch: stored 0x{:08x}, computed 0x{:08x}",
                    name, stored_crc, computed_crc
                )));
            }

            if entries.iter().any(|(n, _)| *n == name) {
                return Err(ReplayError::Archive(format!("Duplicate entry: {}", name)));
            }
            entries.push((name, Bytes::from(data)));
        }

        if buf.has_remaining() {
            return Err(ReplayError::Archive(format!(
                "{} trailing bytes after last entry",
                buf.remaining()
            )));
        }

        Ok(Self { entries })
    }

    /// Contents of the entry called `name`
    pub fn entry(&self, name: &str) -> Result<&Bytes> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data)
            .ok_or_else(|| ReplayError::Archive(format!("Missing entry: {}", name)))
    }

    /// Entry names in archive order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Bounds-checked reads
// =============================================================================

fn ensure(buf: &Bytes, needed: usize, what: &str) -> Result<()> {
    if buf.remaining() < needed {
        return Err(ReplayError::Archive(format!(
            "Truncated archive reading {}: need {} bytes, have {}",
            what,
            needed,
            buf.remaining()
        )));
    }
    Ok(())
}

fn take_u16(buf: &mut Bytes, what: &str) -> Result<u16> {
    ensure(buf, 2, what)?;
    Ok(buf.get_u16_le())
}

fn take_u32(buf: &mut Bytes, what: &str) -> Result<u32> {
    ensure(buf, 4, what)?;
    Ok(buf.get_u32_le())
}

fn take_u64(buf: &mut Bytes, what: &str) -> Result<u64> {
    ensure(buf, 8, what)?;
    Ok(buf.get_u64_le())
}

fn take_bytes(buf: &mut Bytes, len: usize, what: &str) -> Result<Bytes> {
    ensure(buf, len, what)?;
    Ok(buf.split_to(len))
}
