//! Flat replay buffer
//!
//! Fixed-capacity storage engine over flat physical rows.

use std::any::Any;
use std::fmt;
use std::io::{Read, Write};

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::BufferConfig;
use crate::error::{ReplayError, Result};
use crate::record::Value;

use super::{same_kind, EngineSnapshot, ReplayBuffer, StorageEngine};

/// Rows shown by the `Display` view
const PREVIEW_ROWS: usize = 5;

/// Circular buffer of fixed-width rows
///
/// ## Concurrency:
/// - `push`/`merge` take `&mut self`
/// - `sample` takes `&self`; the RNG sits behind a Mutex so a shared
///   buffer can be sampled from a prefetch thread
pub struct FlatBuffer {
    /// Buffer configuration (capacity, seed, snapshot level)
    config: BufferConfig,

    /// Records ever pushed
    count: usize,

    /// One column per slot; empty until the first push fixes the width
    memory: Vec<Vec<Value>>,

    /// Sampling RNG
    rng: Mutex<StdRng>,
}

impl FlatBuffer {
    /// Create an empty buffer holding at most `mem_size` rows
    pub fn new(mem_size: usize) -> Result<Self> {
        Self::with_config(BufferConfig::builder().mem_size(mem_size).build())
    }

    /// Create an empty buffer from a full config
    pub fn with_config(config: BufferConfig) -> Result<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            config,
            count: 0,
            memory: Vec::new(),
            rng: Mutex::new(rng),
        })
    }

    /// Row width, or `None` before the first push
    pub fn width(&self) -> Option<usize> {
        if self.count == 0 && self.memory.is_empty() {
            None
        } else {
            Some(self.memory.len())
        }
    }

    /// Fix the width on first push, check it afterwards
    fn ensure_width(&mut self, width: usize) -> Result<()> {
        match self.width() {
            None => {
                let reserve = self.config.mem_size.min(1024);
                self.memory = (0..width).map(|_| Vec::with_capacity(reserve)).collect();
                tracing::debug!(width, mem_size = self.config.mem_size, "allocated field containers");
                Ok(())
            }
            Some(existing) if existing != width => Err(ReplayError::ShapeMismatch {
                expected: existing,
                found: width,
            }),
            Some(_) => Ok(()),
        }
    }

    /// Write one row at the next circular slot
    fn write_row<I>(&mut self, row: I)
    where
        I: IntoIterator<Item = Value>,
    {
        let slot = self.count % self.config.mem_size;
        for (column, value) in self.memory.iter_mut().zip(row) {
            if slot == column.len() {
                column.push(value);
            } else {
                column[slot] = value;
            }
        }

        self.count += 1;
        if self.count == self.config.mem_size + 1 {
            tracing::debug!(mem_size = self.config.mem_size, "buffer full, overwriting oldest rows");
        }
    }

    /// Validate a bulk push: every slot a batch, all of one length
    fn bulk_rows(data: &[Value]) -> Result<usize> {
        let mut rows: Option<usize> = None;
        for (i, value) in data.iter().enumerate() {
            let items = value.as_batch().ok_or_else(|| ReplayError::KindMismatch {
                entry: i,
                key: format!("slot {}", i),
                expected: "batch",
                found: value.kind(),
            })?;

            match rows {
                None => rows = Some(items.len()),
                Some(expected) if expected != items.len() => {
                    return Err(ReplayError::BulkLengthMismatch {
                        expected,
                        found: items.len(),
                    })
                }
                Some(_) => {}
            }
        }
        Ok(rows.unwrap_or(0))
    }
}

impl ReplayBuffer for FlatBuffer {
    type Record = Vec<Value>;
    type Batch = Vec<Value>;

    fn mem_size(&self) -> usize {
        self.config.mem_size
    }

    fn count(&self) -> usize {
        self.count
    }

    fn nbytes(&self) -> usize {
        self.memory
            .iter()
            .flat_map(|column| column.iter())
            .map(Value::nbytes)
            .sum()
    }

    fn push(&mut self, data: Vec<Value>, bulk: bool) -> Result<()> {
        if !bulk {
            self.ensure_width(data.len())?;
            self.write_row(data);
            return Ok(());
        }

        let rows = Self::bulk_rows(&data)?;
        self.ensure_width(data.len())?;
        tracing::trace!(rows, "bulk push");

        let mut columns: Vec<std::vec::IntoIter<Value>> = data
            .into_iter()
            .map(|v| v.into_batch().unwrap_or_default().into_iter())
            .collect();

        for _ in 0..rows {
            let row: Vec<Value> = columns.iter_mut().filter_map(|c| c.next()).collect();
            self.write_row(row);
        }

        Ok(())
    }

    fn sample(&self, batch_size: usize) -> Result<Vec<Value>> {
        if batch_size == 0 {
            return Err(ReplayError::InvalidBatchSize(batch_size));
        }

        let len = self.len();
        if len == 0 {
            return Err(ReplayError::EmptyBuffer);
        }

        let indices: Vec<usize> = {
            let mut rng = self.rng.lock();
            (0..batch_size).map(|_| rng.gen_range(0..len)).collect()
        };

        Ok(self
            .memory
            .iter()
            .map(|column| Value::Batch(indices.iter().map(|&i| column[i].clone()).collect()))
            .collect())
    }

    fn get(&self, index: usize) -> Result<Vec<Value>> {
        let len = self.len();
        if index >= len {
            return Err(ReplayError::IndexOutOfRange { index, len });
        }

        Ok(self.memory.iter().map(|column| column[index].clone()).collect())
    }

    fn merge(
        &mut self,
        other: &dyn ReplayBuffer<Record = Vec<Value>, Batch = Vec<Value>>,
    ) -> Result<()> {
        let other = same_kind(&*self, other)?;
        if other.is_empty() {
            return Ok(());
        }

        tracing::debug!(rows = other.len(), "merging flat buffer");
        let columns = super::slice_columns(&other.memory, 0..other.len());
        self.push(columns, true)
    }

    fn dump(&self, sink: &mut dyn Write) -> Result<()> {
        let snapshot = EngineSnapshot {
            mem_size: self.config.mem_size,
            count: self.count,
            memory: self.memory.clone(),
        };
        snapshot.write_to(sink)?;

        tracing::debug!(count = self.count, width = self.memory.len(), "dumped flat buffer");
        Ok(())
    }

    fn load(source: &mut dyn Read) -> Result<Self> {
        let snapshot = EngineSnapshot::read_from(source)?;

        let mut buffer = Self::new(snapshot.mem_size)?;
        buffer.count = snapshot.count;
        buffer.memory = snapshot.memory;

        tracing::debug!(count = buffer.count, width = buffer.memory.len(), "loaded flat buffer");
        Ok(buffer)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl StorageEngine for FlatBuffer {
    fn from_config(config: BufferConfig) -> Result<Self> {
        Self::with_config(config)
    }

    fn config(&self) -> &BufferConfig {
        &self.config
    }

    fn memory(&self) -> &[Vec<Value>] {
        &self.memory
    }
}

impl fmt::Display for FlatBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "FlatBuffer of size {} with {} elements.",
            self.config.mem_size,
            self.len()
        )?;
        writeln!(f, "A brief view of the memory:")?;

        for row in 0..self.len().min(PREVIEW_ROWS) {
            write!(f, "  [{}]", row)?;
            for column in &self.memory {
                write!(f, " {}", column[row])?;
            }
            writeln!(f)?;
        }
        if self.len() > PREVIEW_ROWS {
            writeln!(f, "  ... {} more", self.len() - PREVIEW_ROWS)?;
        }
        Ok(())
    }
}

impl fmt::Debug for FlatBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlatBuffer")
            .field("mem_size", &self.config.mem_size)
            .field("count", &self.count)
            .field("width", &self.memory.len())
            .finish()
    }
}
