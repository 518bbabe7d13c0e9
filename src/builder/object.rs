//! Object builder.
//!
//! Objects are stored as a hash trie: every level consumes 4 bits of the key hash, starting from the
//! least significant bits, for at most 7 levels. Keys that still share a slot after the last level
//! end up together in one leaf, sorted by key bytes.

use crate::binary::{BRANCH_FACTOR, CHILD_OFFSET_SIZE, MAP_BRANCH_HEADER_SIZE, MAX_MAP_DEPTH, SLOT_BITS, SLOT_MASK};
use crate::builder::scalar::push_string;
use crate::builder::{BuildResult, Encoder, Pending};
use crate::data_type::{KeyType, NodeKind};
use crate::util::{cmp_key, hash_key};
use crate::vec::VecExt;
use crate::Map;

pub(crate) struct MapEntry<'a> {
    key: &'a str,
    value: Pending<'a>,
    hash: u32,
}

pub(crate) enum MapNode<'a> {
    Leaf(Vec<MapEntry<'a>>),
    Branch { bitmap: u16, children: Vec<MapNode<'a>> },
}

impl<'a> MapNode<'a> {
    pub(crate) fn from_map(map: &'a Map, depth: usize) -> BuildResult<Self> {
        let mut entries = Vec::new();
        entries.try_reserve(map.len())?;
        for (key, value) in map {
            entries.push(MapEntry {
                key,
                value: Pending::try_new(value, depth + 1)?,
                hash: hash_key(key),
            });
        }
        Ok(MapNode::build(entries, 0))
    }

    fn build(mut entries: Vec<MapEntry<'a>>, level: u32) -> Self {
        if entries.len() <= 1 {
            return MapNode::Leaf(entries);
        }
        if level >= MAX_MAP_DEPTH {
            entries.sort_by(|a, b| cmp_key(a.key, b.key));
            return MapNode::Leaf(entries);
        }

        let mut groups: [Vec<MapEntry<'a>>; BRANCH_FACTOR] = Default::default();
        for entry in entries {
            let slot = (entry.hash >> (level * SLOT_BITS)) & SLOT_MASK;
            groups[slot as usize].push(entry);
        }

        let mut bitmap = 0u16;
        let mut children = Vec::new();
        for (slot, group) in groups.into_iter().enumerate() {
            if group.is_empty() {
                continue;
            }
            bitmap |= 1 << slot;
            children.push(MapNode::build(group, level + 1));
        }
        MapNode::Branch { bitmap, children }
    }
}

impl Encoder<'_> {
    pub(crate) fn encode_map_node(&mut self, node: &MapNode) -> BuildResult<u32> {
        match node {
            MapNode::Leaf(entries) => {
                let mut values = Vec::new();
                values.try_reserve(entries.len())?;
                for entry in entries {
                    values.push(self.resolve(&entry.value)?);
                }

                let pos = self.begin_node(0)?;
                for (entry, value) in entries.iter().zip(&values) {
                    push_string(self.bytes(), entry.key)?;
                    self.push_resolved(value)?;
                }
                self.finish_node(pos, NodeKind::Leaf, KeyType::Object, entries.len())
            }
            MapNode::Branch { bitmap, children } => {
                let mut offsets = Vec::new();
                offsets.try_reserve(children.len())?;
                for child in children {
                    offsets.push(self.encode_map_node(child)?);
                }

                let pos = self.begin_node(MAP_BRANCH_HEADER_SIZE + CHILD_OFFSET_SIZE * offsets.len())?;
                let bytes = self.bytes();
                bytes.push_u16(*bitmap);
                bytes.push_u16(0);
                for offset in &offsets {
                    bytes.push_u32(*offset);
                }
                self.finish_node(pos, NodeKind::Branch, KeyType::Object, offsets.len())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    static NULL: Value = Value::Null;

    fn entry(key: &str, hash: u32) -> MapEntry {
        MapEntry {
            key,
            value: Pending::Scalar(&NULL),
            hash,
        }
    }

    fn keys<'a>(node: &'a MapNode) -> Vec<&'a str> {
        match node {
            MapNode::Leaf(entries) => entries.iter().map(|e| e.key).collect(),
            MapNode::Branch { .. } => panic!("expected a leaf"),
        }
    }

    #[test]
    fn test_build_leaf() {
        let node = MapNode::build(vec![], 0);
        assert!(keys(&node).is_empty());

        let node = MapNode::build(vec![entry("a", 0x1234_5678)], 0);
        assert_eq!(keys(&node), vec!["a"]);
    }

    #[test]
    fn test_build_branch() {
        let node = MapNode::build(vec![entry("a", 0x02), entry("b", 0x05), entry("c", 0x15)], 0);
        match &node {
            MapNode::Branch { bitmap, children } => {
                assert_eq!(*bitmap, (1 << 2) | (1 << 5));
                assert_eq!(children.len(), 2);
                assert_eq!(keys(&children[0]), vec!["a"]);
                match &children[1] {
                    MapNode::Branch { bitmap, children } => {
                        assert_eq!(*bitmap, (1 << 0) | (1 << 1));
                        assert_eq!(keys(&children[0]), vec!["b"]);
                        assert_eq!(keys(&children[1]), vec!["c"]);
                    }
                    MapNode::Leaf(_) => panic!("expected a branch"),
                }
            }
            MapNode::Leaf(_) => panic!("expected a branch"),
        }
    }

    #[test]
    fn test_build_collision_leaf() {
        // the top nibble is never consumed
        let node = MapNode::build(vec![entry("zz", 0x1abc_def0), entry("b", 0x2abc_def0), entry("a", 0x0abc_def0)], 0);
        let mut node = &node;
        for _ in 0..MAX_MAP_DEPTH {
            node = match node {
                MapNode::Branch { bitmap, children } => {
                    assert_eq!(bitmap.count_ones(), 1);
                    &children[0]
                }
                MapNode::Leaf(_) => panic!("expected a branch"),
            };
        }
        assert_eq!(keys(node), vec!["a", "b", "zz"]);
    }
}
