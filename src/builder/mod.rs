//! Tron builder.

mod array;
mod object;
mod scalar;

pub use array::ArrayBuilder;
pub use scalar::Scalar;

use crate::binary::{MAX_NESTED_DEPTH, NODE_ALIGN, NODE_HEADER_SIZE, SCALAR_MAGIC, TRAILER_SIZE, TREE_MAGIC};
use crate::builder::array::ArrayNode;
use crate::builder::object::MapNode;
use crate::data_type::{KeyType, NodeKind};
use crate::tron::{ErrorKind, Tron, TronBuf};
use crate::util::{align_up, encode_length, offset_size};
use crate::vec::VecExt;
use crate::{DataType, Value};
use std::collections::TryReserveError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use tracing::trace;

const DEFAULT_SIZE: usize = 128;

/// Possible errors that can arise during building.
#[derive(Debug)]
pub enum BuildError {
    TryReserveError(TryReserveError),
    NonFiniteFloat(f64),
    LengthTooLarge(u64),
    DocumentTooLarge(usize),
    NestedTooDeeply,
    DuplicateIndex(u32),
    IndexOutOfRange { index: usize, length: u32 },
    MissingIndex { expected: u32, actual: usize },
    UnsupportedValue(&'static str),
    JsonError(serde_json::Error),
}

impl BuildError {
    /// Returns the category of this error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        match self {
            BuildError::NonFiniteFloat(_) | BuildError::UnsupportedValue(_) => ErrorKind::ValueDomain,
            BuildError::LengthTooLarge(_) | BuildError::DocumentTooLarge(_) | BuildError::NestedTooDeeply => {
                ErrorKind::Capacity
            }
            BuildError::DuplicateIndex(_) | BuildError::IndexOutOfRange { .. } | BuildError::MissingIndex { .. } => {
                ErrorKind::Structural
            }
            BuildError::TryReserveError(_) | BuildError::JsonError(_) => ErrorKind::Resource,
        }
    }
}

impl Display for BuildError {
    #[inline]
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            BuildError::TryReserveError(e) => write!(f, "{}", e),
            BuildError::NonFiniteFloat(v) => write!(f, "number must be finite, got {}", v),
            BuildError::LengthTooLarge(len) => write!(f, "length {} exceeds the safe integer range", len),
            BuildError::DocumentTooLarge(len) => {
                write!(f, "document too large, {} bytes exceed the 32-bit offset range", len)
            }
            BuildError::NestedTooDeeply => write!(f, "value nested too deeply"),
            BuildError::DuplicateIndex(index) => write!(f, "duplicate array index {}", index),
            BuildError::IndexOutOfRange { index, length } => {
                write!(f, "array index {} out of range, the length is {}", index, length)
            }
            BuildError::MissingIndex { expected, actual } => write!(
                f,
                "array has missing indices, expected {} elements, actual {}",
                expected, actual
            ),
            BuildError::UnsupportedValue(e) => write!(f, "unsupported value: {}", e),
            BuildError::JsonError(e) => write!(f, "{}", e),
        }
    }
}

impl Error for BuildError {}

impl From<TryReserveError> for BuildError {
    #[inline]
    fn from(e: TryReserveError) -> Self {
        BuildError::TryReserveError(e)
    }
}

pub type BuildResult<T> = std::result::Result<T, BuildError>;

/// Encodes a value into a new tron document.
#[inline]
pub fn encode(value: &Value) -> BuildResult<TronBuf> {
    let mut bytes: Vec<u8> = VecExt::try_with_capacity(DEFAULT_SIZE)?;
    encode_with_vec(value, &mut bytes)?;
    Ok(TronBuf::from_vec(bytes))
}

/// Encodes a value into the provided vector, returning the document written after its initial length.
#[inline]
pub fn encode_with_vec<'a>(value: &Value, bytes: &'a mut Vec<u8>) -> BuildResult<&'a Tron> {
    let pending = Pending::try_new(value, 0)?;
    Encoder::new(bytes).finish(pending)
}

/// A value whose composite parts have been arranged into tries but not yet written.
pub(crate) enum Pending<'a> {
    Scalar(&'a Value),
    Array(ArrayNode<'a>),
    Object(MapNode<'a>),
}

impl<'a> Pending<'a> {
    pub(crate) fn try_new(value: &'a Value, depth: usize) -> BuildResult<Self> {
        match value {
            Value::Array(values) => {
                check_depth(depth)?;
                Ok(Pending::Array(ArrayNode::from_values(values, depth)?))
            }
            Value::Object(map) => {
                check_depth(depth)?;
                Ok(Pending::Object(MapNode::from_map(map, depth)?))
            }
            Value::Float64(v) if !v.is_finite() => Err(BuildError::NonFiniteFloat(*v)),
            _ => Ok(Pending::Scalar(value)),
        }
    }
}

#[inline]
fn check_depth(depth: usize) -> BuildResult<()> {
    if depth >= MAX_NESTED_DEPTH {
        return Err(BuildError::NestedTooDeeply);
    }
    Ok(())
}

/// A value ready to be written into a node body.
pub(crate) enum Resolved<'a> {
    Scalar(&'a Value),
    Offset(DataType, u32),
}

/// Writes nodes into a single growing buffer, children before the nodes referencing them.
pub(crate) struct Encoder<'b> {
    bytes: &'b mut Vec<u8>,
    base: usize,
}

impl<'b> Encoder<'b> {
    #[inline]
    pub(crate) fn new(bytes: &'b mut Vec<u8>) -> Self {
        let base = bytes.len();
        Encoder { bytes, base }
    }

    /// Writes the whole document for `pending` and its trailer.
    pub(crate) fn finish(mut self, pending: Pending) -> BuildResult<&'b Tron> {
        match pending {
            Pending::Scalar(value) => {
                scalar::push_scalar(self.bytes, value)?;
                self.bytes.try_reserve(SCALAR_MAGIC.len())?;
                self.bytes.push_bytes(&SCALAR_MAGIC);
            }
            pending => {
                let root = match self.resolve(&pending)? {
                    Resolved::Offset(_, offset) => offset,
                    Resolved::Scalar(_) => unreachable!("composite value resolved to a scalar"),
                };
                self.bytes.try_reserve(TRAILER_SIZE)?;
                self.bytes.push_u32(root);
                self.bytes.push_u32(0);
                self.bytes.push_bytes(&TREE_MAGIC);
            }
        }

        let len = self.bytes.len() - self.base;
        if u32::try_from(len).is_err() {
            return Err(BuildError::DocumentTooLarge(len));
        }
        trace!(len, "encoded tron document");

        let bytes: &'b Vec<u8> = self.bytes;
        Ok(Tron::new(&bytes[self.base..]))
    }

    /// Writes the nodes of a composite value, returning its offset; scalars pass through.
    pub(crate) fn resolve<'a>(&mut self, pending: &Pending<'a>) -> BuildResult<Resolved<'a>> {
        match pending {
            Pending::Scalar(value) => Ok(Resolved::Scalar(*value)),
            Pending::Array(node) => Ok(Resolved::Offset(DataType::Array, self.encode_array_node(node)?)),
            Pending::Object(node) => Ok(Resolved::Offset(DataType::Object, self.encode_map_node(node)?)),
        }
    }

    pub(crate) fn push_resolved(&mut self, value: &Resolved) -> BuildResult<()> {
        match value {
            Resolved::Scalar(value) => scalar::push_scalar(self.bytes, value),
            Resolved::Offset(data_type, offset) => {
                let size = offset_size(*offset);
                encode_length(data_type.tag_prefix(), size as u64, self.bytes)?;
                self.bytes.push_bytes(&offset.to_le_bytes()[..size]);
                Ok(())
            }
        }
    }

    #[inline]
    pub(crate) fn bytes(&mut self) -> &mut Vec<u8> {
        self.bytes
    }

    /// Reserves the node header, returning the position of the node.
    #[inline]
    pub(crate) fn begin_node(&mut self, body_size: usize) -> BuildResult<usize> {
        self.bytes.try_reserve(NODE_HEADER_SIZE + body_size + NODE_ALIGN)?;
        Ok(self.bytes.skip_node_header())
    }

    /// Pads the node started at `pos` and fills in its header, returning its offset.
    pub(crate) fn finish_node(
        &mut self,
        pos: usize,
        kind: NodeKind,
        key_type: KeyType,
        entry_count: usize,
    ) -> BuildResult<u32> {
        let node_len = align_up(self.bytes.len() - pos, NODE_ALIGN);
        self.bytes.resize(pos + node_len, 0);

        let end = self.bytes.len() - self.base;
        let node_len = u32::try_from(node_len).map_err(|_| BuildError::DocumentTooLarge(end))?;
        if u32::try_from(end).is_err() {
            return Err(BuildError::DocumentTooLarge(end));
        }

        self.bytes.write_node_header(pos, node_len, kind, key_type, entry_count as u32);
        Ok((pos - self.base) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Map;

    #[test]
    fn test_encode_scalar_document() {
        let doc = encode(&Value::Null).unwrap();
        assert_eq!(doc.as_bytes(), b"\x00NORT");

        let doc = encode(&Value::Bool(true)).unwrap();
        assert_eq!(doc.as_bytes(), b"\x21NORT");

        let doc = encode(&Value::Int64(1)).unwrap();
        assert_eq!(doc.as_bytes(), b"\x40\x01\x00\x00\x00\x00\x00\x00\x00NORT");

        let doc = encode(&Value::String("hi".to_string())).unwrap();
        assert_eq!(doc.as_bytes(), b"\x92hiNORT");
    }

    #[test]
    fn test_encode_empty_composites() {
        let doc = encode(&Value::Array(vec![])).unwrap();
        assert_eq!(
            doc.as_bytes(),
            &[
                0x11, 0x00, 0x00, 0x00, // node length 16, leaf, array
                0x00, 0x00, 0x00, 0x00, // entry count
                0x00, 0x00, 0x00, 0x00, // shift, reserved, bitmap
                0x00, 0x00, 0x00, 0x00, // length
                0x00, 0x00, 0x00, 0x00, // root offset
                0x00, 0x00, 0x00, 0x00, // reserved
                b'T', b'R', b'O', b'N',
            ]
        );

        let doc = encode(&Value::Object(Map::new())).unwrap();
        assert_eq!(
            doc.as_bytes(),
            &[
                0x0b, 0x00, 0x00, 0x00, // node length 8, leaf, object
                0x00, 0x00, 0x00, 0x00, // entry count
                0x00, 0x00, 0x00, 0x00, // root offset
                0x00, 0x00, 0x00, 0x00, // reserved
                b'T', b'R', b'O', b'N',
            ]
        );
    }

    #[test]
    fn test_encode_with_used_vec() {
        let mut bytes = vec![1u8, 2, 3];
        let value = Value::Array(vec![Value::Array(vec![])]);
        let doc = encode_with_vec(&value, &mut bytes).unwrap();
        // inner node at 0, outer node at 16
        assert_eq!(&doc.as_bytes()[doc.as_bytes().len() - 12..][..4], &[16, 0, 0, 0]);
        assert_eq!(doc.decode().unwrap(), value);
        assert_eq!(&bytes[..3], &[1, 2, 3]);
    }

    #[test]
    fn test_encode_errors() {
        let err = encode(&Value::Float64(f64::NAN)).unwrap_err();
        assert!(matches!(err, BuildError::NonFiniteFloat(_)));
        assert_eq!(err.kind(), ErrorKind::ValueDomain);

        let nested = Value::Array(vec![Value::Float64(f64::INFINITY)]);
        assert!(matches!(encode(&nested), Err(BuildError::NonFiniteFloat(_))));

        let mut deep = Value::Null;
        for _ in 0..MAX_NESTED_DEPTH {
            deep = Value::Array(vec![deep]);
        }
        assert!(encode(&deep).is_ok());
        let deeper = Value::Array(vec![deep]);
        let err = encode(&deeper).unwrap_err();
        assert!(matches!(err, BuildError::NestedTooDeeply));
        assert_eq!(err.kind(), ErrorKind::Capacity);
    }
}
