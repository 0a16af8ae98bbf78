//! Tests for merging wrapped buffers
//!
//! These tests verify:
//! - Merging into an empty target freezes the target's mapping
//! - Merging into a non-empty target appends every held row
//! - Kind, emptiness and layout checks
//! - Single-capacity sources

use std::any::Any;
use std::io::{Read, Write};

use replaykit::buffer::{FlatBuffer, ReplayBuffer};
use replaykit::{DictReplayBuffer, Entry, Record, ReplayError, Result, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn new_buffer(mem_size: usize) -> DictReplayBuffer<FlatBuffer> {
    DictReplayBuffer::new(FlatBuffer::new(mem_size).unwrap()).unwrap()
}

fn record(a: i64, b: i64) -> Record {
    vec![Entry::map([("a", Entry::from(a)), ("b", Entry::map([("c", b)]))])]
}

fn filled(mem_size: usize, start: i64, rows: i64) -> DictReplayBuffer<FlatBuffer> {
    let mut buffer = new_buffer(mem_size);
    for i in start..start + rows {
        buffer.push(record(i, i * 100), false).unwrap();
    }
    buffer
}

/// Satisfies the same interface as `DictReplayBuffer` but is a different kind
struct OtherBuffer {
    records: Vec<Record>,
}

impl ReplayBuffer for OtherBuffer {
    type Record = Record;
    type Batch = Record;

    fn mem_size(&self) -> usize {
        16
    }

    fn count(&self) -> usize {
        self.records.len()
    }

    fn nbytes(&self) -> usize {
        0
    }

    fn push(&mut self, data: Record, _bulk: bool) -> Result<()> {
        self.records.push(data);
        Ok(())
    }

    fn sample(&self, _batch_size: usize) -> Result<Record> {
        self.records.first().cloned().ok_or(ReplayError::EmptyBuffer)
    }

    fn get(&self, index: usize) -> Result<Record> {
        self.records
            .get(index)
            .cloned()
            .ok_or(ReplayError::IndexOutOfRange {
                index,
                len: self.records.len(),
            })
    }

    fn merge(&mut self, _other: &dyn ReplayBuffer<Record = Record, Batch = Record>) -> Result<()> {
        Ok(())
    }

    fn dump(&self, _sink: &mut dyn Write) -> Result<()> {
        Ok(())
    }

    fn load(_source: &mut dyn Read) -> Result<Self> {
        Ok(Self {
            records: Vec::new(),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// Merge Into Empty Target Tests
// =============================================================================

#[test]
fn test_merge_into_empty_target() {
    let mut target = new_buffer(10);
    let source = filled(10, 0, 3);

    target.merge(&source).unwrap();

    assert_eq!(target.count(), 3);
    assert_eq!(target.transform(), source.transform());
    for i in 0..3 {
        assert_eq!(target.get(i).unwrap(), source.get(i).unwrap());
    }
}

#[test]
fn test_merge_into_empty_target_freezes_mapping() {
    let mut target = new_buffer(10);
    assert!(!target.transform().is_set());

    target.merge(&filled(10, 0, 2)).unwrap();

    assert!(target.transform().is_set());
    assert_eq!(target.transform().total_elements(), 2);

    // the frozen mapping now polices later pushes
    let result = target.push(vec![Entry::map([("a", 1)])], false);
    assert!(matches!(result, Err(ReplayError::MissingKey { .. })));
}

#[test]
fn test_merge_single_record_source() {
    let mut target = new_buffer(10);
    let source = filled(10, 7, 1);

    target.merge(&source).unwrap();

    assert_eq!(target.count(), 1);
    assert_eq!(target.get(0).unwrap(), record(7, 700));
}

#[test]
fn test_merge_single_capacity_source() {
    let mut target = new_buffer(10);
    // held record is the last one pushed
    let source = filled(1, 0, 4);
    assert_eq!(source.count(), 4);
    assert_eq!(source.len(), 1);

    target.merge(&source).unwrap();

    assert_eq!(target.count(), 1);
    assert_eq!(target.get(0).unwrap(), record(3, 300));
}

// =============================================================================
// Merge Into Non-Empty Target Tests
// =============================================================================

#[test]
fn test_merge_appends_all_rows() {
    let mut target = filled(10, 0, 2);
    let source = filled(10, 50, 3);

    target.merge(&source).unwrap();

    assert_eq!(target.count(), 5);
    assert_eq!(target.get(0).unwrap(), record(0, 0));
    assert_eq!(target.get(2).unwrap(), record(50, 5000));
    assert_eq!(target.get(4).unwrap(), record(52, 5200));
}

#[test]
fn test_merge_wrapped_source_copies_held_rows() {
    let mut target = filled(10, 0, 1);
    // slots hold 3, 4, 2 after wrapping
    let source = filled(3, 0, 5);

    target.merge(&source).unwrap();

    assert_eq!(target.count(), 4);
    assert_eq!(target.get(1).unwrap(), record(3, 300));
    assert_eq!(target.get(2).unwrap(), record(4, 400));
    assert_eq!(target.get(3).unwrap(), record(2, 200));
}

#[test]
fn test_merge_overflows_target_capacity() {
    let mut target = filled(4, 0, 3);
    let source = filled(10, 10, 3);

    target.merge(&source).unwrap();

    assert_eq!(target.count(), 6);
    assert_eq!(target.len(), 4);
    assert!(target.is_full());
    assert_eq!(target.get(0).unwrap(), record(11, 1100));
    assert_eq!(target.get(1).unwrap(), record(12, 1200));
}

// =============================================================================
// Merge Error Tests
// =============================================================================

#[test]
fn test_merge_empty_source_fails() {
    let mut target = filled(10, 0, 2);
    let source = new_buffer(10);

    let result = target.merge(&source);

    assert!(matches!(result, Err(ReplayError::MergeEmptySource)));
    assert_eq!(target.count(), 2);
}

#[test]
fn test_merge_different_kind_fails() {
    let mut target = new_buffer(10);
    let source = OtherBuffer {
        records: vec![record(1, 2)],
    };

    let result = target.merge(&source);

    match result {
        Err(ReplayError::MergeKindMismatch { expected, found }) => {
            assert!(expected.contains("TransformingBuffer"));
            assert!(found.contains("OtherBuffer"));
        }
        other => panic!("Expected MergeKindMismatch, got {:?}", other),
    }
    assert_eq!(target.count(), 0);
}

#[test]
fn test_merge_layout_mismatch() {
    let mut target = new_buffer(10);
    target.push(vec![Entry::map([("a", 1)])], false).unwrap();

    let mut source = new_buffer(10);
    source.push(vec![Entry::map([("b", 2)])], false).unwrap();

    let result = target.merge(&source);

    assert!(matches!(result, Err(ReplayError::LayoutMismatch)));
    assert_eq!(target.count(), 1);
}

#[test]
fn test_merge_leaves_source_untouched() {
    let mut target = new_buffer(10);
    let source = filled(10, 0, 3);
    let before: Vec<Vec<Value>> = source.raw_base_memory().to_vec();

    target.merge(&source).unwrap();

    assert_eq!(source.count(), 3);
    assert_eq!(source.raw_base_memory(), before.as_slice());
}
