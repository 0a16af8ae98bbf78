//! Engine snapshot codec
//!
//! Binary format written by `FlatBuffer::dump`.
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Header (34 bytes)                                            │
//! │ ┌──────────┬──────────┬───────────┬─────────┬─────────┬────────────┐
//! │ │Magic (4) │Version(2)│MemSize (8)│Count (8)│Width (4)│BodyLen (8) │
//! │ └──────────┴──────────┴───────────┴─────────┴─────────┴────────────┘
//! ├──────────────────────────────────────────────────────────────┤
//! │ Body: bincode-encoded columns                                │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Footer: CRC32 of body (4)                                    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//! All integers are little-endian.

use std::io::{Read, Write};

use crate::error::{ReplayError, Result};
use crate::record::Value;

/// Magic bytes identifying an engine snapshot
pub const MAGIC: &[u8; 4] = b"RKFB";

/// Current format version
pub const VERSION: u16 = 1;

/// Header size: magic + version + mem_size + count + width + body_len
pub const HEADER_SIZE: usize = 4 + 2 + 8 + 8 + 4 + 8;

/// Footer size: CRC32 of the body
const FOOTER_SIZE: usize = 4;

/// Decoded contents of an engine snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSnapshot {
    pub mem_size: usize,
    pub count: usize,
    pub memory: Vec<Vec<Value>>,
}

impl EngineSnapshot {
    /// Encode and write the snapshot to `sink`
    pub fn write_to(&self, sink: &mut dyn Write) -> Result<()> {
        let body = bincode::serialize(&self.memory)
            .map_err(|e| ReplayError::Serialization(format!("Failed to encode columns: {}", e)))?;

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&body);
        let crc = hasher.finalize();

        sink.write_all(MAGIC)?;
        sink.write_all(&VERSION.to_le_bytes())?;
        sink.write_all(&(self.mem_size as u64).to_le_bytes())?;
        sink.write_all(&(self.count as u64).to_le_bytes())?;
        sink.write_all(&(self.memory.len() as u32).to_le_bytes())?;
        sink.write_all(&(body.len() as u64).to_le_bytes())?;
        sink.write_all(&body)?;
        sink.write_all(&crc.to_le_bytes())?;
        sink.flush()?;

        Ok(())
    }

    /// Read and validate a snapshot from `source`
    pub fn read_from(source: &mut dyn Read) -> Result<Self> {
        let mut header = [0u8; HEADER_SIZE];
        source.read_exact(&mut header)?;

        if &header[0..4] != MAGIC {
            return Err(ReplayError::Corruption(format!(
                "Bad engine snapshot magic: {:?}",
                &header[0..4]
            )));
        }

        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != VERSION {
            return Err(ReplayError::Corruption(format!(
                "Unsupported engine snapshot version: {} (expected {})",
                version, VERSION
            )));
        }

        let mem_size = read_u64(&header[6..14]) as usize;
        let count = read_u64(&header[14..22]) as usize;
        let width = u32::from_le_bytes([header[22], header[23], header[24], header[25]]) as usize;
        let body_len = read_u64(&header[26..34]);

        // never preallocate an untrusted length
        let mut body = Vec::new();
        (&mut *source).take(body_len).read_to_end(&mut body)?;
        if body.len() as u64 != body_len {
            return Err(ReplayError::Corruption(format!(
                "Engine snapshot body truncated: header says {} bytes, got {}",
                body_len,
                body.len()
            )));
        }

        let mut footer = [0u8; FOOTER_SIZE];
        source.read_exact(&mut footer)?;
        let stored_crc = u32::from_le_bytes(footer);

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&body);
        let computed_crc = hasher.finalize();

        if stored_crc != computed_crc {
            return Err(ReplayError::Corruption(format!(
                "Engine snapshot CRC mismatch: stored 0x{:08x}, computed 0x{:08x}",
                stored_crc, computed_crc
            )));
        }

        let memory: Vec<Vec<Value>> = bincode::deserialize(&body)
            .map_err(|e| ReplayError::Serialization(format!("Failed to decode columns: {}", e)))?;

        if memory.len() != width {
            return Err(ReplayError::Corruption(format!(
                "Engine snapshot width mismatch: header says {}, body has {}",
                width,
                memory.len()
            )));
        }

        let held = mem_size.min(count);
        if let Some(column) = memory.iter().find(|c| c.len() != held) {
            return Err(ReplayError::Corruption(format!(
                "Engine snapshot column holds {} rows, expected {}",
                column.len(),
                held
            )));
        }

        Ok(Self {
            mem_size,
            count,
            memory,
        })
    }
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}
