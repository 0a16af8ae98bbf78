//! Transforming buffer
//!
//! Generic decorator: one owned storage engine plus a `Transform`.

use std::any::Any;
use std::fmt;
use std::io::{Read, Write};

use crate::archive::{ArchiveReader, ArchiveWriter, BASE_BUFFER_ENTRY, RUNNING_PARAMS_ENTRY};
use crate::buffer::{same_kind, slice_columns, ReplayBuffer, StorageEngine};
use crate::error::{ReplayError, Result};
use crate::record::Value;

use super::Transform;

/// A storage engine seen through a logical representation
pub struct TransformingBuffer<T, E> {
    /// The engine holding physical rows
    base: E,

    /// Conversion between logical records and physical rows
    transform: T,
}

impl<T: Transform, E: StorageEngine> TransformingBuffer<T, E> {
    /// Wrap an empty engine
    ///
    /// Fails with `PrePopulated` if `base` already holds records: there is
    /// no conversion state describing them. Use `from_populated` for that.
    pub fn new(base: E) -> Result<Self>
    where
        T: Default,
    {
        if base.count() > 0 {
            return Err(ReplayError::PrePopulated {
                count: base.count(),
            });
        }

        Ok(Self {
            base,
            transform: T::default(),
        })
    }

    /// Wrap an engine that already holds records, with conversion state
    /// supplied by the caller. Nothing is re-derived.
    pub fn from_populated(base: E, transform: T) -> Self {
        tracing::debug!(count = base.count(), "wrapping pre-populated engine");
        Self { base, transform }
    }

    /// The wrapped engine
    pub fn base(&self) -> &E {
        &self.base
    }

    /// The conversion state
    pub fn transform(&self) -> &T {
        &self.transform
    }

    /// Physical field containers of the wrapped engine
    ///
    /// These are the engine's flat columns, not the logical view this
    /// buffer presents through `get`/`sample`.
    pub fn raw_base_memory(&self) -> &[Vec<Value>] {
        self.base.memory()
    }

    /// Give back the wrapped engine
    pub fn into_base(self) -> E {
        self.base
    }
}

impl<T: Transform, E: StorageEngine> ReplayBuffer for TransformingBuffer<T, E> {
    type Record = T::Logical;
    type Batch = T::Logical;

    fn mem_size(&self) -> usize {
        self.base.mem_size()
    }

    fn count(&self) -> usize {
        self.base.count()
    }

    fn len(&self) -> usize {
        self.base.len()
    }

    fn nbytes(&self) -> usize {
        self.base.nbytes()
    }

    fn push(&mut self, data: T::Logical, bulk: bool) -> Result<()> {
        let physical = self.transform.unwrap(data, bulk)?;
        self.base.push(physical, bulk)
    }

    fn sample(&self, batch_size: usize) -> Result<T::Logical> {
        let physical = self.base.sample(batch_size)?;
        self.transform.wrap(physical)
    }

    fn get(&self, index: usize) -> Result<T::Logical> {
        let physical = self.base.get(index)?;
        self.transform.wrap(physical)
    }

    /// Merge another buffer of exactly this kind
    ///
    /// An empty target first pushes `other`'s record 0 through the logical
    /// path so its own transform freezes, then copies the remaining
    /// physical rows straight into the engine. A non-empty target copies
    /// all of `other`'s rows. Both copies require equal transforms.
    fn merge(
        &mut self,
        other: &dyn ReplayBuffer<Record = T::Logical, Batch = T::Logical>,
    ) -> Result<()> {
        let other = same_kind(&*self, other)?;

        if other.count() == 0 {
            return Err(ReplayError::MergeEmptySource);
        }

        let rows = if self.count() == 0 {
            self.push(other.get(0)?, false)?;

            // also covers other.mem_size() == 1
            if other.len() == 1 {
                return Ok(());
            }
            1..other.len()
        } else {
            0..other.len()
        };

        if self.transform != other.transform {
            return Err(ReplayError::LayoutMismatch);
        }

        tracing::debug!(rows = rows.len(), "merging physical rows");
        self.base
            .push(slice_columns(other.base.memory(), rows), true)
    }

    /// Write the combined snapshot archive
    fn dump(&self, sink: &mut dyn Write) -> Result<()> {
        let mut base_bytes = Vec::new();
        self.base.dump(&mut base_bytes)?;

        let mut archive = ArchiveWriter::new(self.base.config().compression_level);
        archive.add(RUNNING_PARAMS_ENTRY, self.transform.running_params()?)?;
        archive.add(BASE_BUFFER_ENTRY, base_bytes)?;
        archive.finish(sink)?;

        tracing::info!(count = self.count(), mem_size = self.mem_size(), "dumped buffer snapshot");
        Ok(())
    }

    /// Restore from a combined snapshot archive
    ///
    /// The engine comes back through its own `load`; the conversion state
    /// is assigned verbatim from the running params.
    fn load(source: &mut dyn Read) -> Result<Self> {
        let archive = ArchiveReader::read(source)?;

        let transform = T::from_running_params(archive.entry(RUNNING_PARAMS_ENTRY)?)?;
        let mut base_bytes: &[u8] = archive.entry(BASE_BUFFER_ENTRY)?;
        let base = E::load(&mut base_bytes)?;

        tracing::info!(count = base.count(), mem_size = base.mem_size(), "loaded buffer snapshot");
        Ok(Self::from_populated(base, transform))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T, E> fmt::Display for TransformingBuffer<T, E>
where
    T: Transform,
    E: StorageEngine + fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "TransformingBuffer of size {} with {} elements.",
            self.base.mem_size(),
            self.base.len()
        )?;
        writeln!(f, "A brief view of the memory:")?;
        write!(f, "{}", self.base)
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for TransformingBuffer<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformingBuffer")
            .field("base", &self.base)
            .field("transform", &self.transform)
            .finish()
    }
}
