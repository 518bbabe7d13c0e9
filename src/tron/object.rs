//! Object decoding.

use crate::binary::{CHILD_OFFSET_SIZE, MAP_BRANCH_HEADER_SIZE, MAX_MAP_DEPTH, NODE_ALIGN};
use crate::data_type::{KeyType, NodeKind};
use crate::tron::{read_u16, read_u32, read_u8, Decoder, NodeHeader, TronError, TronResult};
use crate::{DataType, Map, Value};
use std::mem::size_of;

impl Decoder<'_> {
    /// Decodes the object whose root node is described by `header`.
    pub(super) fn read_object(&self, header: &NodeHeader, depth: usize) -> TronResult<Value> {
        let mut map = Map::new();
        self.read_map_node(header, 0, depth, &mut map)?;
        Ok(Value::Object(map))
    }

    fn read_map_node(&self, header: &NodeHeader, level: u32, depth: usize, map: &mut Map) -> TronResult<()> {
        let bytes = &self.bytes[..header.end()];

        match header.kind {
            NodeKind::Leaf => {
                let mut pos = header.body();
                for _ in 0..header.entry_count {
                    let tag = read_u8(bytes, pos)?;
                    let actual = DataType::from_tag(tag);
                    if actual != DataType::String {
                        return Err(TronError::UnexpectedType {
                            expected: DataType::String,
                            actual,
                        });
                    }
                    let key = match self.read_value(pos, header.end(), header.offset, depth)? {
                        (Value::String(key), size) => {
                            pos += size;
                            key
                        }
                        _ => unreachable!("string tag decoded to a non-string value"),
                    };

                    let (value, size) = self.read_value(pos, header.end(), header.offset, depth)?;
                    pos += size;

                    if map.contains_key(&key) {
                        return Err(TronError::DuplicateKey(key));
                    }
                    map.insert(key, value);
                }

                // only alignment padding may follow the last entry
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
                if level >= MAX_MAP_DEPTH {
                    return Err(TronError::TrieTooDeep);
                }

                let body = header.body();
                let bitmap = read_u16(bytes, body)?;
                if read_u16(bytes, body + size_of::<u16>())? != 0 {
                    return Err(TronError::ReservedNotZero {
                        pos: body + size_of::<u16>(),
                    });
                }
                if bitmap.count_ones() != header.entry_count {
                    return Err(TronError::EntryCountMismatch {
                        bitmap,
                        entry_count: header.entry_count,
                    });
                }

                for i in 0..header.entry_count as usize {
                    let offset = read_u32(bytes, body + MAP_BRANCH_HEADER_SIZE + i * CHILD_OFFSET_SIZE)?;
                    let child = self.read_node_header(offset, header.offset)?;
                    if child.key_type != KeyType::Object {
                        return Err(TronError::UnexpectedType {
                            expected: DataType::Object,
                            actual: child.key_type.data_type(),
                        });
                    }
                    self.read_map_node(&child, level + 1, depth, map)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{decode, encode, DecodeOptions, TronError, Value};

    fn object(pairs: &[(&str, i64)]) -> Value {
        Value::from_iter(pairs.iter().map(|(k, v)| (k.to_string(), Value::Int64(*v))))
    }

    #[test]
    fn test_read_object() {
        let value = object(&[("a", 1), ("b", 2), ("c", 3)]);
        let doc = encode(&value).unwrap();
        assert_eq!(doc.decode().unwrap(), value);

        let value = Value::from_iter((0..200).map(|i| (format!("key{}", i), Value::Int64(i))));
        let doc = encode(&value).unwrap();
        assert_eq!(doc.decode().unwrap(), value);
    }

    #[test]
    fn test_read_duplicate_key() {
        // leaf with two entries for "a": tag 0x91 'a', int 1 / tag 0x91 'a', int 2
        let mut bytes = vec![0x23, 0, 0, 0, 2, 0, 0, 0];
        for v in [1u8, 2] {
            bytes.extend_from_slice(&[0x91, b'a', 0x40, v, 0, 0, 0, 0, 0, 0, 0]);
        }
        bytes.resize(32, 0);
        bytes.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 0]);
        bytes.extend_from_slice(b"TRON");

        let res = decode(&bytes, DecodeOptions::new());
        assert!(matches!(res, Err(TronError::DuplicateKey(key)) if key == "a"));
    }

    #[test]
    fn test_read_lowered_entry_count() {
        let doc = encode(&object(&[("a", 1)])).unwrap();
        let mut bytes = doc.into_vec();
        let trailer = bytes.len() - 12;
        let root = u32::from_le_bytes([bytes[trailer], bytes[trailer + 1], bytes[trailer + 2], bytes[trailer + 3]]);
        let root = root as usize;
        assert_eq!(bytes[root] & 0x3, 0x3, "one key should fit a leaf");
        assert_eq!(bytes[root + 4], 1);

        bytes[root + 4] = 0;
        assert!(matches!(
            decode(&bytes, DecodeOptions::new()),
            Err(TronError::UnconsumedNodeBytes { .. })
        ));

        // a leaf holding two entries, as a collision leaf does
        let mut bytes = vec![0x23, 0, 0, 0, 2, 0, 0, 0];
        for (k, v) in [(b'a', 1u8), (b'b', 2)] {
            bytes.extend_from_slice(&[0x91, k, 0x40, v, 0, 0, 0, 0, 0, 0, 0]);
        }
        bytes.resize(32, 0);
        bytes.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 0]);
        bytes.extend_from_slice(b"TRON");
        let res = decode(&bytes, DecodeOptions::new()).unwrap();
        assert_eq!(res, object(&[("a", 1), ("b", 2)]));

        bytes[4] = 1;
        assert!(matches!(
            decode(&bytes, DecodeOptions::new()),
            Err(TronError::UnconsumedNodeBytes { offset: 0, remaining: 13 })
        ));
    }

    #[test]
    fn test_read_non_string_key() {
        let mut bytes = vec![0x0f, 0, 0, 0, 1, 0, 0, 0, 0x21, 0x00, 0, 0];
        bytes.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 0]);
        bytes.extend_from_slice(b"TRON");

        let res = decode(&bytes, DecodeOptions::new());
        assert!(matches!(res, Err(TronError::UnexpectedType { .. })));
    }

    #[test]
    fn test_read_branch_errors() {
        let value = object(&[("a", 1), ("b", 2)]);
        let doc = encode(&value).unwrap();
        let mut bytes = doc.into_vec();
        let trailer = bytes.len() - 12;
        let root = u32::from_le_bytes([bytes[trailer], bytes[trailer + 1], bytes[trailer + 2], bytes[trailer + 3]]);
        let root = root as usize;
        assert_eq!(bytes[root] & 0x3, 0x2, "two keys should need a branch");

        let mut corrupted = bytes.clone();
        corrupted[root + 4] += 1;
        assert!(matches!(
            decode(&corrupted, DecodeOptions::new()),
            Err(TronError::EntryCountMismatch { .. })
        ));

        bytes[root + 10] = 1;
        assert!(matches!(
            decode(&bytes, DecodeOptions::new()),
            Err(TronError::ReservedNotZero { .. })
        ));
    }
}
