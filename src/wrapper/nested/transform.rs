//! Nested transform
//!
//! `unwrap`/`wrap` between nested records and flat rows, driven by a
//! lazily derived `Mapping`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ReplayError, Result};
use crate::record::{Entry, Record, Value};
use crate::wrapper::Transform;

use super::{Mapping, MappingNode};

/// Persisted conversion state (`running_params.json`)
#[derive(Serialize, Deserialize)]
struct RunningParams {
    mapping: Vec<MappingNode>,
    total_elements: usize,
}

/// Conversion state of the nested-record adapter
///
/// Unset until the first successful `unwrap`, then frozen. Deriving the mapping
/// mutates this state, so concurrent first pushes must be serialized by
/// the caller (`&mut self` already enforces this for owned buffers).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NestedTransform {
    mapping: Option<Mapping>,
}

impl NestedTransform {
    /// A transform with an externally supplied, already frozen mapping
    pub fn from_mapping(mapping: Mapping) -> Self {
        Self {
            mapping: Some(mapping),
        }
    }

    /// The frozen mapping, `None` before the first unwrap
    pub fn mapping(&self) -> Option<&Mapping> {
        self.mapping.as_ref()
    }

    /// Width of a physical row (0 while unset)
    pub fn total_elements(&self) -> usize {
        self.mapping.as_ref().map_or(0, Mapping::total_elements)
    }

    pub fn is_set(&self) -> bool {
        self.mapping.is_some()
    }
}

impl Transform for NestedTransform {
    type Logical = Record;

    fn unwrap(&mut self, data: Record, bulk: bool) -> Result<Vec<Value>> {
        if let Some(mapping) = &self.mapping {
            return flatten(mapping, data, bulk);
        }

        // only a record that flattens cleanly may freeze the mapping
        let mapping = Mapping::derive(&data);
        let row = flatten(&mapping, data, bulk)?;

        tracing::debug!(
            entries = mapping.len(),
            total_elements = mapping.total_elements(),
            "derived record mapping"
        );
        self.mapping = Some(mapping);
        Ok(row)
    }

    fn wrap(&self, data: Vec<Value>) -> Result<Record> {
        let mapping = self.mapping.as_ref().ok_or(ReplayError::MappingUnset)?;

        if data.len() != mapping.total_elements() {
            return Err(ReplayError::ShapeMismatch {
                expected: mapping.total_elements(),
                found: data.len(),
            });
        }

        let mut slots: Vec<Option<Value>> = data.into_iter().map(Some).collect();
        mapping
            .entries()
            .iter()
            .map(|node| pack(node, &mut slots))
            .collect()
    }

    fn running_params(&self) -> Result<Vec<u8>> {
        let params = RunningParams {
            mapping: self
                .mapping
                .as_ref()
                .map(|m| m.entries().to_vec())
                .unwrap_or_default(),
            total_elements: self.total_elements(),
        };
        Ok(serde_json::to_vec(&params)?)
    }

    fn from_running_params(params: &[u8]) -> Result<Self> {
        let params: RunningParams = serde_json::from_slice(params).map_err(|e| {
            ReplayError::CorruptedMapping(format!("unreadable running params: {}", e))
        })?;

        // an empty mapping is what an adapter that never saw a record dumps
        if params.mapping.is_empty() && params.total_elements == 0 {
            return Ok(Self::default());
        }

        let mapping = Mapping::from_parts(params.mapping, params.total_elements)?;
        Ok(Self::from_mapping(mapping))
    }
}

/// Flatten `data` into one physical row laid out by `mapping`
fn flatten(mapping: &Mapping, data: Record, bulk: bool) -> Result<Vec<Value>> {
    if data.len() != mapping.len() {
        return Err(ReplayError::ShapeMismatch {
            expected: mapping.len(),
            found: data.len(),
        });
    }

    tracing::trace!(bulk, width = mapping.total_elements(), "unwrapping record");

    let mut slots: Vec<Option<Value>> = vec![None; mapping.total_elements()];
    for (entry_idx, (node, entry)) in mapping.entries().iter().zip(data).enumerate() {
        let key = entry_idx.to_string();
        unpack(entry_idx, &key, node, entry, &mut slots)?;
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(i, slot)| {
            slot.ok_or_else(|| ReplayError::CorruptedMapping(format!("slot {} has no leaf", i)))
        })
        .collect()
}

/// Write the leaves of `entry` into their slots
fn unpack(
    entry_idx: usize,
    key: &str,
    node: &MappingNode,
    entry: Entry,
    slots: &mut [Option<Value>],
) -> Result<()> {
    match (node, entry) {
        (MappingNode::Leaf(idx), Entry::Value(value)) => {
            let slot = slots.get_mut(*idx).ok_or_else(|| {
                ReplayError::CorruptedMapping(format!("slot {} out of range", idx))
            })?;
            *slot = Some(value);
            Ok(())
        }
        (MappingNode::Leaf(_), Entry::Map(_)) => Err(ReplayError::KindMismatch {
            entry: entry_idx,
            key: key.to_string(),
            expected: "value",
            found: "map",
        }),
        (MappingNode::Node(_), Entry::Value(value)) => Err(ReplayError::KindMismatch {
            entry: entry_idx,
            key: key.to_string(),
            expected: "map",
            found: value.kind(),
        }),
        (MappingNode::Node(children), Entry::Map(fields)) => {
            for (i, (field_key, _)) in fields.iter().enumerate() {
                if fields[..i].iter().any(|(seen, _)| seen == field_key) {
                    return Err(ReplayError::DuplicateKey {
                        entry: entry_idx,
                        key: field_key.clone(),
                    });
                }
            }

            if let Some((extra, _)) = fields
                .iter()
                .find(|(k, _)| !children.iter().any(|(c, _)| c == k))
            {
                return Err(ReplayError::UnexpectedKey {
                    entry: entry_idx,
                    key: extra.clone(),
                });
            }

            let mut fields: HashMap<String, Entry> = fields.into_iter().collect();
            for (child_key, child) in children {
                let value = fields.remove(child_key).ok_or_else(|| ReplayError::MissingKey {
                    entry: entry_idx,
                    key: child_key.clone(),
                })?;
                unpack(entry_idx, child_key, child, value, slots)?;
            }
            Ok(())
        }
    }
}

/// Rebuild the entry described by `node`, taking its leaves out of `slots`
fn pack(node: &MappingNode, slots: &mut [Option<Value>]) -> Result<Entry> {
    match node {
        MappingNode::Leaf(idx) => slots
            .get_mut(*idx)
            .and_then(Option::take)
            .map(Entry::Value)
            .ok_or_else(|| {
                ReplayError::CorruptedMapping(format!("slot {} missing or used twice", idx))
            }),
        MappingNode::Node(children) => children
            .iter()
            .map(|(key, child)| -> Result<(String, Entry)> {
                Ok((key.clone(), pack(child, slots)?))
            })
            .collect::<Result<Vec<_>>>()
            .map(Entry::Map),
    }
}
