//! Array decoding.

use crate::binary::{ARRAY_HEADER_SIZE, CHILD_OFFSET_SIZE, MAX_ARRAY_SHIFT, NODE_ALIGN, SLOT_BITS};
use crate::data_type::{KeyType, NodeKind};
use crate::tron::{read_u16, read_u32, read_u8, Decoder, NodeHeader, TronError, TronResult};
use crate::{DataType, Value};
use std::mem::size_of;

struct ArrayHeader {
    shift: u32,
    bitmap: u16,
    length: u32,
}

impl Decoder<'_> {
    /// Decodes the array whose root node is described by `header`.
    pub(super) fn read_array(&self, header: &NodeHeader, depth: usize) -> TronResult<Value> {
        let root = self.read_array_header(header)?;
        // every element takes at least one byte
        if root.length as usize > self.bytes.len() {
            return Err(TronError::InvalidArrayLength(root.length));
        }

        let mut slots: Vec<Option<Value>> = Vec::new();
        slots.try_reserve(root.length as usize)?;
        slots.resize(root.length as usize, None);

        self.read_array_node(header, &root, None, 0, depth, &mut slots)?;

        let mut values = Vec::new();
        values.try_reserve(slots.len())?;
        for (index, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(value) => values.push(value),
                None => return Err(TronError::MissingIndex(index)),
            }
        }
        Ok(Value::Array(values))
    }

    fn read_array_header(&self, header: &NodeHeader) -> TronResult<ArrayHeader> {
        let bytes = &self.bytes[..header.end()];
        let body = header.body();

        let shift = read_u8(bytes, body)?;
        if read_u8(bytes, body + 1)? != 0 {
            return Err(TronError::ReservedNotZero { pos: body + 1 });
        }
        if shift as u32 > MAX_ARRAY_SHIFT || shift as u32 % SLOT_BITS != 0 {
            return Err(TronError::InvalidShift(shift));
        }

        let bitmap = read_u16(bytes, body + 2)?;
        if bitmap.count_ones() != header.entry_count {
            return Err(TronError::EntryCountMismatch {
                bitmap,
                entry_count: header.entry_count,
            });
        }

        let length = read_u32(bytes, body + 2 + size_of::<u16>())?;
        Ok(ArrayHeader {
            shift: shift as u32,
            bitmap,
            length,
        })
    }

    /// Reads the subtree covering indices from `base`, storing every element into `slots`.
    fn read_array_node(
        &self,
        header: &NodeHeader,
        array: &ArrayHeader,
        expected_shift: Option<u32>,
        base: u64,
        depth: usize,
        slots: &mut [Option<Value>],
    ) -> TronResult<()> {
        if let Some(expected) = expected_shift {
            if array.shift != expected {
                return Err(TronError::InvalidShift(array.shift as u8));
            }
        }

        let bytes = &self.bytes[..header.end()];
        let body = header.body() + ARRAY_HEADER_SIZE;

        match header.kind {
            NodeKind::Leaf => {
                if array.shift != 0 {
                    return Err(TronError::InvalidShift(array.shift as u8));
                }

                let length = slots.len();
                let mut pos = body;
                for slot in set_slots(array.bitmap) {
                    let index = base + slot as u64;
                    let entry = slots
                        .get_mut(index as usize)
                        .ok_or(TronError::ArrayIndexOutOfRange { index, length })?;
                    if entry.is_some() {
                        return Err(TronError::DuplicateIndex(index));
                    }

                    let (value, size) = self.read_value(pos, header.end(), header.offset, depth)?;
                    pos += size;
                    *entry = Some(value);
                }

                let remaining = header.end() - pos;
                if remaining >= NODE_ALIGN {
                    return Err(TronError::UnconsumedNodeBytes {
                        offset: header.offset,
                        remaining,
                    });
                }
                Ok(())
            }
            NodeKind::Branch => {
                if array.shift == 0 {
                    return Err(TronError::InvalidShift(0));
                }

                for (i, slot) in set_slots(array.bitmap).enumerate() {
                    let child_base = base + ((slot as u64) << array.shift);
                    if child_base >= slots.len() as u64 {
                        return Err(TronError::ArrayIndexOutOfRange {
                            index: child_base,
                            length: slots.len(),
                        });
                    }

                    let offset = read_u32(bytes, body + i * CHILD_OFFSET_SIZE)?;
                    let child = self.read_node_header(offset, header.offset)?;
                    if child.key_type != KeyType::Array {
                        return Err(TronError::UnexpectedType {
                            expected: DataType::Array,
                            actual: child.key_type.data_type(),
                        });
                    }
                    let child_array = self.read_array_header(&child)?;
                    self.read_array_node(
                        &child,
                        &child_array,
                        Some(array.shift - SLOT_BITS),
                        child_base,
                        depth,
                        slots,
                    )?;
                }
                Ok(())
            }
        }
    }
}

/// Occupied slots of a bitmap, in ascending order.
#[inline]
fn set_slots(bitmap: u16) -> impl Iterator<Item = u32> {
    (0..u16::BITS).filter(move |slot| bitmap & (1 << slot) != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decode, encode, DecodeOptions};

    fn root_offset(bytes: &[u8]) -> usize {
        let trailer = bytes.len() - 12;
        u32::from_le_bytes([bytes[trailer], bytes[trailer + 1], bytes[trailer + 2], bytes[trailer + 3]]) as usize
    }

    #[test]
    fn test_set_slots() {
        assert_eq!(set_slots(0).count(), 0);
        assert_eq!(set_slots(0b1000_0000_0000_0101).collect::<Vec<_>>(), vec![0, 2, 15]);
    }

    #[test]
    fn test_read_array() {
        for len in [0usize, 1, 16, 17, 20, 256, 257, 1000] {
            let value = Value::Array((0..len as i64).map(Value::Int64).collect());
            let doc = encode(&value).unwrap();
            assert_eq!(doc.decode().unwrap(), value, "len {}", len);
        }
    }

    #[test]
    fn test_read_missing_index() {
        let doc = encode(&Value::Array(vec![Value::Null, Value::Null, Value::Null])).unwrap();
        let mut bytes = doc.into_vec();
        let root = root_offset(&bytes);
        // drop index 2 from the leaf
        bytes[root + 4] = 2;
        bytes[root + 10] = 0b011;

        let res = decode(&bytes, DecodeOptions::new());
        assert!(matches!(res, Err(TronError::MissingIndex(2))));
    }

    #[test]
    fn test_read_unconsumed_leaf() {
        let doc = encode(&Value::Array(vec![Value::Int64(1), Value::Int64(2)])).unwrap();
        let mut bytes = doc.into_vec();
        let root = root_offset(&bytes);
        // keep index 0 only, leaving the second value unread
        bytes[root + 4] = 1;
        bytes[root + 10] = 0b01;
        bytes[root + 12] = 1;

        let res = decode(&bytes, DecodeOptions::new());
        assert!(matches!(res, Err(TronError::UnconsumedNodeBytes { remaining: 11, .. })));
    }

    #[test]
    fn test_read_invalid_array() {
        let doc = encode(&Value::Array((0..20).map(Value::Int64).collect())).unwrap();
        let bytes = doc.into_vec();
        let root = root_offset(&bytes);
        assert_eq!(bytes[root + 8], 4);

        let mut corrupted = bytes.clone();
        corrupted[root + 4] += 1;
        assert!(matches!(
            decode(&corrupted, DecodeOptions::new()),
            Err(TronError::EntryCountMismatch { .. })
        ));

        let mut corrupted = bytes.clone();
        corrupted[root + 8] = 8;
        assert!(matches!(
            decode(&corrupted, DecodeOptions::new()),
            Err(TronError::InvalidShift(_))
        ));

        let mut corrupted = bytes.clone();
        corrupted[root + 8] = 3;
        assert!(matches!(
            decode(&corrupted, DecodeOptions::new()),
            Err(TronError::InvalidShift(3))
        ));

        let mut corrupted = bytes.clone();
        corrupted[root + 12..root + 16].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            decode(&corrupted, DecodeOptions::new()),
            Err(TronError::InvalidArrayLength(u32::MAX))
        ));

        let mut corrupted = bytes;
        corrupted[root + 12] = 40;
        assert!(matches!(
            decode(&corrupted, DecodeOptions::new()),
            Err(TronError::MissingIndex(20))
        ));
    }
}
