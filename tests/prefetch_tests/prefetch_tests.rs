//! Tests for the prefetching sample iterator
//!
//! These tests verify:
//! - Exactly `num_iter` batches are yielded
//! - At most one batch is computed ahead of the consumer
//! - Sampling errors surface on the iteration they happen and end the sequence
//! - Dropping the iterator early stops the producer

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use replaykit::buffer::{FlatBuffer, ReplayBuffer};
use replaykit::prefetch::{for_each_sample, iter_sample, SampleIter};
use replaykit::{DictReplayBuffer, Entry, Record, ReplayError, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn transition(step: i64) -> Record {
    vec![
        Entry::from(step),
        Entry::map([("reward", Entry::from(step as f64)), ("done", Entry::from(false))]),
    ]
}

fn filled_buffer(rows: i64) -> DictReplayBuffer<FlatBuffer> {
    let mut buffer = DictReplayBuffer::new(FlatBuffer::new(64).unwrap()).unwrap();
    for step in 0..rows {
        buffer.push(transition(step), false).unwrap();
    }
    buffer
}

fn batch_len(batch: &Record) -> usize {
    batch[0]
        .as_value()
        .and_then(Value::as_batch)
        .map_or(0, |items| items.len())
}

// =============================================================================
// Iterator Tests
// =============================================================================

#[test]
fn test_yields_exactly_num_iter() {
    let buffer = Arc::new(filled_buffer(10));

    let batches: Vec<Record> = iter_sample(buffer, 4, 7)
        .unwrap()
        .collect::<replaykit::Result<_>>()
        .unwrap();

    assert_eq!(batches.len(), 7);
    for batch in &batches {
        assert_eq!(batch_len(batch), 4);
    }
}

#[test]
fn test_zero_iterations() {
    let buffer = Arc::new(filled_buffer(10));

    let mut iter = iter_sample(buffer, 4, 0).unwrap();

    assert!(iter.next().is_none());
    assert!(iter.next().is_none());
}

#[test]
fn test_size_hint_counts_down() {
    let buffer = Arc::new(filled_buffer(10));
    let mut iter = iter_sample(buffer, 2, 3).unwrap();

    assert_eq!(iter.size_hint(), (0, Some(3)));
    iter.next().unwrap().unwrap();
    assert_eq!(iter.size_hint(), (0, Some(2)));
}

#[test]
fn test_error_ends_sequence() {
    let buffer = Arc::new(DictReplayBuffer::new(FlatBuffer::new(8).unwrap()).unwrap());

    let mut iter = iter_sample(buffer, 2, 5).unwrap();

    assert!(matches!(iter.next(), Some(Err(ReplayError::EmptyBuffer))));
    assert!(iter.next().is_none());
}

#[test]
fn test_sequence_restarts_per_call() {
    let buffer = Arc::new(filled_buffer(10));

    let first = iter_sample(Arc::clone(&buffer), 2, 3).unwrap().count();
    let second = iter_sample(Arc::clone(&buffer), 2, 3).unwrap().count();

    assert_eq!(first, 3);
    assert_eq!(second, 3);
}

// =============================================================================
// Lookahead Tests
// =============================================================================

#[test]
fn test_at_most_one_batch_ahead() {
    let computed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&computed);

    let mut iter = SampleIter::spawn(100, move || {
        Ok(counter.fetch_add(1, Ordering::SeqCst))
    })
    .unwrap();

    assert_eq!(iter.next().unwrap().unwrap(), 0);
    thread::sleep(Duration::from_millis(100));

    // the consumed batch plus one waiting in the handoff
    assert!(computed.load(Ordering::SeqCst) <= 2);
}

#[test]
fn test_early_drop_stops_producer() {
    let computed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&computed);

    let mut iter = SampleIter::spawn(1000, move || {
        Ok(counter.fetch_add(1, Ordering::SeqCst))
    })
    .unwrap();

    iter.next().unwrap().unwrap();
    iter.next().unwrap().unwrap();
    drop(iter);

    // drop joins the producer, so the count is final here
    let after_drop = computed.load(Ordering::SeqCst);
    assert!(after_drop <= 3);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(computed.load(Ordering::SeqCst), after_drop);
}

// =============================================================================
// Scoped Consumer Tests
// =============================================================================

#[test]
fn test_for_each_sample_feeds_every_batch() {
    let buffer = filled_buffer(10);
    let mut seen = Vec::new();

    for_each_sample(&buffer, 3, 5, |batch| {
        seen.push(batch_len(&batch));
        Ok(())
    })
    .unwrap();

    assert_eq!(seen, vec![3; 5]);
}

#[test]
fn test_for_each_sample_buffer_usable_afterwards() {
    let mut buffer = filled_buffer(10);

    for_each_sample(&buffer, 2, 2, |_| Ok(())).unwrap();
    buffer.push(transition(10), false).unwrap();

    assert_eq!(buffer.count(), 11);
}

#[test]
fn test_for_each_sample_sampling_error() {
    let buffer = DictReplayBuffer::new(FlatBuffer::new(8).unwrap()).unwrap();
    let mut calls = 0;

    let result = for_each_sample(&buffer, 2, 5, |_| {
        calls += 1;
        Ok(())
    });

    assert!(matches!(result, Err(ReplayError::EmptyBuffer)));
    assert_eq!(calls, 0);
}

#[test]
fn test_for_each_sample_consumer_error_stops() {
    let buffer = filled_buffer(10);
    let mut calls = 0;

    let result = for_each_sample(&buffer, 2, 100, |_| {
        calls += 1;
        if calls == 3 {
            return Err(ReplayError::InvalidBatchSize(0));
        }
        Ok(())
    });

    assert!(matches!(result, Err(ReplayError::InvalidBatchSize(0))));
    assert_eq!(calls, 3);
}
