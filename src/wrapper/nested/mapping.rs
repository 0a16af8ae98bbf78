//! Mapping tree
//!
//! Frozen record of which physical slot every logical leaf occupies.

use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ReplayError, Result};
use crate::record::Entry;

/// One node of the mapping tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingNode {
    /// Slot index of a leaf value
    Leaf(usize),

    /// Children of a map entry, in first-seen key order
    Node(Vec<(String, MappingNode)>),
}

impl MappingNode {
    fn derive(entry: &Entry, next: &mut usize) -> Self {
        match entry {
            Entry::Value(_) => {
                let leaf = MappingNode::Leaf(*next);
                *next += 1;
                leaf
            }
            Entry::Map(children) => MappingNode::Node(
                children
                    .iter()
                    .map(|(key, child)| (key.clone(), MappingNode::derive(child, next)))
                    .collect(),
            ),
        }
    }

    /// Look up a direct child of an interior node
    pub fn get(&self, key: &str) -> Option<&MappingNode> {
        match self {
            MappingNode::Node(children) => {
                children.iter().find(|(k, _)| k == key).map(|(_, n)| n)
            }
            MappingNode::Leaf(_) => None,
        }
    }

    /// First child key repeated within one interior node, at any depth
    fn duplicate_key(&self) -> Option<&str> {
        match self {
            MappingNode::Leaf(_) => None,
            MappingNode::Node(children) => children.iter().enumerate().find_map(|(i, (key, child))| {
                if children[..i].iter().any(|(seen, _)| seen == key) {
                    Some(key.as_str())
                } else {
                    child.duplicate_key()
                }
            }),
        }
    }

    fn collect_leaves(&self, out: &mut Vec<usize>) {
        match self {
            MappingNode::Leaf(idx) => out.push(*idx),
            MappingNode::Node(children) => {
                for (_, child) in children {
                    child.collect_leaves(out);
                }
            }
        }
    }
}

/// The full mapping: one node per top-level entry plus the slot count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    entries: Vec<MappingNode>,
    total_elements: usize,
}

impl Mapping {
    /// Derive the mapping from the shape of `record`
    ///
    /// Slot indices follow a depth-first walk in the record's own entry and
    /// key order, so the result is only as reproducible as that order.
    pub fn derive(record: &[Entry]) -> Self {
        let mut next = 0;
        let entries = record
            .iter()
            .map(|entry| MappingNode::derive(entry, &mut next))
            .collect();

        Self {
            entries,
            total_elements: next,
        }
    }

    /// Build a mapping from externally supplied parts
    ///
    /// Fails with `CorruptedMapping` unless the leaves are exactly the slots
    /// `0..total_elements`, each used once, and no node repeats a key.
    pub fn from_parts(entries: Vec<MappingNode>, total_elements: usize) -> Result<Self> {
        let mapping = Self {
            entries,
            total_elements,
        };
        mapping.validate()?;
        Ok(mapping)
    }

    /// Top-level nodes
    pub fn entries(&self) -> &[MappingNode] {
        &self.entries
    }

    /// Number of top-level entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Width of every physical row
    pub fn total_elements(&self) -> usize {
        self.total_elements
    }

    /// Number of leaves reachable from the top-level entries
    pub fn leaf_count(&self) -> usize {
        self.leaves().len()
    }

    fn leaves(&self) -> Vec<usize> {
        let mut leaves = Vec::with_capacity(self.total_elements);
        for node in &self.entries {
            node.collect_leaves(&mut leaves);
        }
        leaves
    }

    fn validate(&self) -> Result<()> {
        if let Some(key) = self.entries.iter().find_map(MappingNode::duplicate_key) {
            return Err(ReplayError::CorruptedMapping(format!(
                "key '{}' repeated within one node",
                key
            )));
        }

        let leaves = self.leaves();
        if leaves.len() != self.total_elements {
            return Err(ReplayError::CorruptedMapping(format!(
                "{} leaves for {} total elements",
                leaves.len(),
                self.total_elements
            )));
        }

        let mut seen = vec![false; self.total_elements];
        for idx in leaves {
            match seen.get_mut(idx) {
                Some(slot) if !*slot => *slot = true,
                Some(_) => {
                    return Err(ReplayError::CorruptedMapping(format!(
                        "slot {} mapped twice",
                        idx
                    )))
                }
                None => {
                    return Err(ReplayError::CorruptedMapping(format!(
                        "slot {} out of range for {} total elements",
                        idx, self.total_elements
                    )))
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// JSON form: a leaf is an integer, a node is an object in child order
// =============================================================================

impl Serialize for MappingNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            MappingNode::Leaf(idx) => serializer.serialize_u64(*idx as u64),
            MappingNode::Node(children) => {
                let mut map = serializer.serialize_map(Some(children.len()))?;
                for (key, child) in children {
                    map.serialize_entry(key, child)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for MappingNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(MappingNodeVisitor)
    }
}

struct MappingNodeVisitor;

impl<'de> Visitor<'de> for MappingNodeVisitor {
    type Value = MappingNode;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a slot index or an object of mapping nodes")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<MappingNode, E> {
        usize::try_from(v)
            .map(MappingNode::Leaf)
            .map_err(|_| E::custom(format!("slot index {} too large", v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<MappingNode, E> {
        usize::try_from(v)
            .map(MappingNode::Leaf)
            .map_err(|_| E::custom(format!("invalid slot index {}", v)))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<MappingNode, A::Error> {
        let mut children: Vec<(String, MappingNode)> = Vec::new();
        while let Some((key, child)) = access.next_entry::<String, MappingNode>()? {
            if children.iter().any(|(k, _)| *k == key) {
                return Err(de::Error::custom(format!("duplicate key '{}'", key)));
            }
            children.push((key, child));
        }
        Ok(MappingNode::Node(children))
    }
}
