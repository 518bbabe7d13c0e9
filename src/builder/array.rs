//! Array builder.
//!
//! Arrays are stored as a radix trie over element indices. The root consumes the highest 4-bit group
//! that is needed to address `length - 1`; every level below consumes the next lower group, down to
//! the leaves at shift 0 which hold the values.

use crate::binary::{ARRAY_HEADER_SIZE, BRANCH_FACTOR, CHILD_OFFSET_SIZE, SLOT_BITS, SLOT_MASK};
use crate::builder::{BuildError, BuildResult, Encoder, Pending};
use crate::data_type::{KeyType, NodeKind};
use crate::tron::{Tron, TronBuf};
use crate::vec::VecExt;
use crate::Value;

pub(crate) enum ArrayNode<'a> {
    Leaf {
        bitmap: u16,
        length: u32,
        values: Vec<Pending<'a>>,
    },
    Branch {
        shift: u32,
        bitmap: u16,
        length: u32,
        children: Vec<ArrayNode<'a>>,
    },
}

/// Smallest multiple of 4 such that `(length - 1) >> shift` fits in one slot.
#[inline]
pub(crate) fn root_shift(length: u32) -> u32 {
    let max_index = length.saturating_sub(1);
    let mut shift = 0;
    while (max_index >> shift) > SLOT_MASK {
        shift += SLOT_BITS;
    }
    shift
}

impl<'a> ArrayNode<'a> {
    pub(crate) fn from_values(values: &'a [Value], depth: usize) -> BuildResult<Self> {
        let length = u32::try_from(values.len()).map_err(|_| BuildError::LengthTooLarge(values.len() as u64))?;
        let mut entries = Vec::new();
        entries.try_reserve(values.len())?;
        for (index, value) in values.iter().enumerate() {
            entries.push((index as u32, Pending::try_new(value, depth + 1)?));
        }
        ArrayNode::build(entries, root_shift(length), length)
    }

    /// Builds the subtree for `entries`. Only the root carries the array length, descendants get 0.
    fn build(entries: Vec<(u32, Pending<'a>)>, shift: u32, length: u32) -> BuildResult<Self> {
        debug_assert!(shift % SLOT_BITS == 0);

        if shift == 0 {
            let mut slots: [Option<Pending<'a>>; BRANCH_FACTOR] = Default::default();
            for (index, value) in entries {
                let slot = &mut slots[(index & SLOT_MASK) as usize];
                if slot.is_some() {
                    return Err(BuildError::DuplicateIndex(index));
                }
                *slot = Some(value);
            }

            let mut bitmap = 0u16;
            let mut values = Vec::new();
            for (slot, value) in slots.into_iter().enumerate() {
                if let Some(value) = value {
                    bitmap |= 1 << slot;
                    values.push(value);
                }
            }
            return Ok(ArrayNode::Leaf { bitmap, length, values });
        }

        let mut groups: [Vec<(u32, Pending<'a>)>; BRANCH_FACTOR] = Default::default();
        for (index, value) in entries {
            groups[((index >> shift) & SLOT_MASK) as usize].push((index, value));
        }

        let mut bitmap = 0u16;
        let mut children = Vec::new();
        for (slot, group) in groups.into_iter().enumerate() {
            if group.is_empty() {
                continue;
            }
            bitmap |= 1 << slot;
            children.push(ArrayNode::build(group, shift - SLOT_BITS, 0)?);
        }
        Ok(ArrayNode::Branch {
            shift,
            bitmap,
            length,
            children,
        })
    }
}

impl Encoder<'_> {
    pub(crate) fn encode_array_node(&mut self, node: &ArrayNode) -> BuildResult<u32> {
        match node {
            ArrayNode::Leaf { bitmap, length, values } => {
                let mut resolved = Vec::new();
                resolved.try_reserve(values.len())?;
                for value in values {
                    resolved.push(self.resolve(value)?);
                }

                let pos = self.begin_node(ARRAY_HEADER_SIZE)?;
                push_array_header(self.bytes(), 0, *bitmap, *length);
                for value in &resolved {
                    self.push_resolved(value)?;
                }
                self.finish_node(pos, NodeKind::Leaf, KeyType::Array, resolved.len())
            }
            ArrayNode::Branch {
                shift,
                bitmap,
                length,
                children,
            } => {
                let mut offsets = Vec::new();
                offsets.try_reserve(children.len())?;
                for child in children {
                    offsets.push(self.encode_array_node(child)?);
                }

                let pos = self.begin_node(ARRAY_HEADER_SIZE + CHILD_OFFSET_SIZE * offsets.len())?;
                let bytes = self.bytes();
                push_array_header(bytes, *shift as u8, *bitmap, *length);
                for offset in &offsets {
                    bytes.push_u32(*offset);
                }
                self.finish_node(pos, NodeKind::Branch, KeyType::Array, offsets.len())
            }
        }
    }
}

#[inline]
fn push_array_header(bytes: &mut Vec<u8>, shift: u8, bitmap: u16, length: u32) {
    bytes.push_u8(shift);
    bytes.push_u8(0);
    bytes.push_u16(bitmap);
    bytes.push_u32(length);
}

/// Builder for encoding an array whose elements are supplied by index, in any order.
///
/// ```rust
/// use tron::{ArrayBuilder, Value};
///
/// let mut builder = ArrayBuilder::try_new(3).unwrap();
/// builder.push(2, "c").unwrap();
/// builder.push(0, "a").unwrap().push(1, "b").unwrap();
/// let tron = builder.finish().unwrap();
/// assert_eq!(tron.decode().unwrap(), Value::from_iter(["a", "b", "c"]));
/// ```
#[derive(Debug)]
pub struct ArrayBuilder {
    length: u32,
    entries: Vec<(u32, Value)>,
}

impl ArrayBuilder {
    /// Creates `ArrayBuilder` for an array of `length` elements.
    #[inline]
    pub fn try_new(length: usize) -> BuildResult<Self> {
        let length = u32::try_from(length).map_err(|_| BuildError::LengthTooLarge(length as u64))?;
        Ok(ArrayBuilder {
            length,
            entries: Vec::new(),
        })
    }

    /// Returns the declared length of the array.
    #[inline]
    pub fn len(&self) -> usize {
        self.length as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Sets the element at `index`.
    #[inline]
    pub fn push<V: Into<Value>>(&mut self, index: usize, value: V) -> BuildResult<&mut Self> {
        if index >= self.length as usize {
            return Err(BuildError::IndexOutOfRange {
                index,
                length: self.length,
            });
        }
        self.entries.try_reserve(1)?;
        self.entries.push((index as u32, value.into()));
        Ok(self)
    }

    /// Finishes building the array.
    #[inline]
    pub fn finish(self) -> BuildResult<TronBuf> {
        let mut bytes = Vec::new();
        self.finish_with_vec(&mut bytes)?;
        Ok(TronBuf::from_vec(bytes))
    }

    /// Finishes building the array into the provided vector.
    pub fn finish_with_vec(self, bytes: &mut Vec<u8>) -> BuildResult<&Tron> {
        let mut entries = Vec::new();
        entries.try_reserve(self.entries.len())?;
        for (index, value) in &self.entries {
            entries.push((*index, Pending::try_new(value, 1)?));
        }

        let count = entries.len();
        let root = ArrayNode::build(entries, root_shift(self.length), self.length)?;
        if count != self.length as usize {
            return Err(BuildError::MissingIndex {
                expected: self.length,
                actual: count,
            });
        }
        Encoder::new(bytes).finish(Pending::Array(root))
    }
}
