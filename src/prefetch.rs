//! Prefetching sample iterator
//!
//! Overlaps preparing the next sampled batch with the caller consuming the
//! current one.
//!
//! ## Handoff
//! A producer thread computes batches and hands them over a zero-capacity
//! (rendezvous) channel. It blocks in `send` until the consumer asks for
//! the next item, so at most one batch is ever computed ahead:
//! ```text
//! producer: [compute 0]──send──[compute 1]──────send──[compute 2]── ...
//! consumer:          recv──[use 0]──────────recv──[use 1]──── ...
//! ```
//! Each call starts a fresh sequence of exactly `num_iter` items. A sampling
//! error is yielded on the iteration it happened and ends the sequence.
//! Dropping the iterator early disconnects the channel; a batch already in
//! flight is finished and discarded, never interrupted.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver};

use crate::buffer::ReplayBuffer;
use crate::error::Result;

/// Lazy, finite sequence of sampled batches
pub struct SampleIter<T> {
    /// Rendezvous channel from the producer thread
    receiver: Option<Receiver<Result<T>>>,

    /// Producer thread, joined on exhaustion or drop
    handle: Option<JoinHandle<()>>,

    /// Items still to be yielded
    remaining: usize,
}

impl<T: Send + 'static> SampleIter<T> {
    /// Start a producer calling `sampler` up to `num_iter` times
    pub fn spawn<F>(num_iter: usize, mut sampler: F) -> Result<Self>
    where
        F: FnMut() -> Result<T> + Send + 'static,
    {
        let (sender, receiver) = channel::bounded::<Result<T>>(0);

        let handle = thread::Builder::new()
            .name("replaykit-prefetch".to_string())
            .spawn(move || {
                for i in 0..num_iter {
                    let batch = sampler();
                    let failed = batch.is_err();

                    if sender.send(batch).is_err() {
                        tracing::trace!(iteration = i, "prefetch consumer went away");
                        return;
                    }
                    if failed {
                        return;
                    }
                }
            })?;

        Ok(Self {
            receiver: Some(receiver),
            handle: Some(handle),
            remaining: num_iter,
        })
    }
}

impl<T> SampleIter<T> {
    /// Disconnect from the producer and wait for it to exit
    fn shutdown(&mut self) {
        self.remaining = 0;
        self.receiver.take();

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("prefetch producer panicked");
            }
        }
    }
}

impl<T> Iterator for SampleIter<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            self.shutdown();
            return None;
        }

        let received = self.receiver.as_ref()?.recv();
        match received {
            Ok(Ok(batch)) => {
                self.remaining -= 1;
                Some(Ok(batch))
            }
            Ok(Err(e)) => {
                self.shutdown();
                Some(Err(e))
            }
            // producer died without sending (it panicked)
            Err(_) => {
                self.shutdown();
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

impl<T> Drop for SampleIter<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Sample `num_iter` batches of `batch_size` from a shared buffer, one
/// batch ahead of the consumer
pub fn iter_sample<B>(
    buffer: Arc<B>,
    batch_size: usize,
    num_iter: usize,
) -> Result<SampleIter<B::Batch>>
where
    B: ReplayBuffer + Send + Sync,
    B::Batch: Send + 'static,
{
    SampleIter::spawn(num_iter, move || buffer.sample(batch_size))
}

/// Feed `num_iter` sampled batches to `consume` without giving up ownership
/// of the buffer
///
/// Same one-ahead handoff as `iter_sample`, on a scoped thread. Stops at
/// the first error from either sampling or `consume`.
pub fn for_each_sample<B, F>(
    buffer: &B,
    batch_size: usize,
    num_iter: usize,
    mut consume: F,
) -> Result<()>
where
    B: ReplayBuffer + Sync,
    B::Batch: Send,
    F: FnMut(B::Batch) -> Result<()>,
{
    let (sender, receiver) = channel::bounded::<Result<B::Batch>>(0);

    thread::scope(|scope| {
        scope.spawn(move || {
            for _ in 0..num_iter {
                let batch = buffer.sample(batch_size);
                let failed = batch.is_err();
                if sender.send(batch).is_err() || failed {
                    return;
                }
            }
        });

        while let Ok(batch) = receiver.recv() {
            if let Err(e) = batch.and_then(&mut consume) {
                // disconnect so the producer stops after its in-flight batch
                drop(receiver);
                return Err(e);
            }
        }
        Ok(())
    })
}
