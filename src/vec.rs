//! Vec extension.

use crate::binary::NODE_HEADER_SIZE;
use crate::data_type::{KeyType, NodeKind};
use std::collections::TryReserveError;
use std::mem::size_of;

pub trait VecExt: Sized {
    fn try_with_capacity(capacity: usize) -> Result<Self, TryReserveError>;
    fn push_u8(&mut self, val: u8);
    fn push_u16(&mut self, val: u16);
    fn push_u32(&mut self, val: u32);
    fn push_bytes(&mut self, bytes: &[u8]);
    fn skip_node_header(&mut self) -> usize;
    fn write_u32(&mut self, val: u32, pos: usize);
    fn write_node_header(&mut self, pos: usize, node_len: u32, kind: NodeKind, key_type: KeyType, entry_count: u32);
}

impl VecExt for Vec<u8> {
    #[inline]
    fn try_with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        let mut vec = Vec::new();
        vec.try_reserve(capacity)?;
        Ok(vec)
    }

    #[inline]
    fn push_u8(&mut self, val: u8) {
        self.push(val);
    }

    #[inline]
    fn push_u16(&mut self, val: u16) {
        self.extend_from_slice(&val.to_le_bytes());
    }

    #[inline]
    fn push_u32(&mut self, val: u32) {
        self.extend_from_slice(&val.to_le_bytes());
    }

    #[inline]
    fn push_bytes(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes)
    }

    /// Reserves a zeroed node header, returning its position.
    #[inline]
    fn skip_node_header(&mut self) -> usize {
        let pos = self.len();
        self.resize(pos + NODE_HEADER_SIZE, 0);
        pos
    }

    #[inline]
    fn write_u32(&mut self, val: u32, pos: usize) {
        debug_assert!(pos + size_of::<u32>() <= self.len());
        let s = &mut self[pos..pos + size_of::<u32>()];
        s.copy_from_slice(&val.to_le_bytes());
    }

    #[inline]
    fn write_node_header(&mut self, pos: usize, node_len: u32, kind: NodeKind, key_type: KeyType, entry_count: u32) {
        debug_assert!(node_len % 4 == 0);
        let word = node_len | kind as u32 | (key_type as u32) << 1;
        self.write_u32(word, pos);
        self.write_u32(entry_count, pos + size_of::<u32>());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_header() {
        let mut bytes = vec![0xaa];
        let pos = bytes.skip_node_header();
        assert_eq!(pos, 1);
        assert_eq!(bytes.len(), 1 + NODE_HEADER_SIZE);

        bytes.write_node_header(pos, 24, NodeKind::Leaf, KeyType::Object, 3);
        assert_eq!(&bytes[1..], &[0x1b, 0, 0, 0, 3, 0, 0, 0]);

        bytes.write_node_header(pos, 16, NodeKind::Branch, KeyType::Array, 2);
        assert_eq!(&bytes[1..], &[0x10, 0, 0, 0, 2, 0, 0, 0]);
    }
}
