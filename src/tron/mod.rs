//! Tron manipulation.

mod array;
mod object;

use crate::binary::{
    FIXED_PAYLOAD_SIZE, MAGIC_SIZE, MAX_NATIVE_INT, MAX_NESTED_DEPTH, MAX_OFFSET_SIZE, NODE_HEADER_SIZE,
    NODE_LENGTH_MASK, SCALAR_MAGIC, TAG_LOW_BITS, TAG_SIZE, TRAILER_SIZE, TREE_MAGIC,
};
use crate::data_type::{KeyType, NodeKind};
use crate::util::decode_length;
use crate::{DataType, Value};
use std::borrow::Borrow;
use std::cell::RefCell;
use std::collections::HashSet;
use std::collections::TryReserveError;
use std::error::Error;
use std::fmt;
use std::mem::size_of;
use std::ops::Deref;
use std::str::Utf8Error;
use tracing::{debug, trace};

/// Category of a codec failure.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ErrorKind {
    /// The bytes violate the layout of the format.
    Structural,
    /// A value lies outside the domain the format can represent.
    ValueDomain,
    /// A length, size or nesting limit was exceeded.
    Capacity,
    /// Allocation or text interchange failed.
    Resource,
}

/// Possible errors that can arise during decoding.
#[derive(Debug)]
pub enum TronError {
    IndexOutOfBounds { len: usize, index: usize },
    DocumentTooShort(usize),
    UnknownTrailer([u8; MAGIC_SIZE]),
    TrailingBytes { len: usize, consumed: usize },
    ReservedNotZero { pos: usize },
    InvalidTag(u8),
    InvalidLengthSize(u8),
    InvalidOffsetSize(u64),
    InvalidNodeLength { offset: usize, len: usize },
    NodeOutOfBounds { offset: usize, limit: usize },
    SharedNode(usize),
    UnconsumedNodeBytes { offset: usize, remaining: usize },
    UnexpectedType { expected: DataType, actual: DataType },
    EntryCountMismatch { bitmap: u16, entry_count: u32 },
    InvalidShift(u8),
    TrieTooDeep,
    InvalidArrayLength(u32),
    ArrayIndexOutOfRange { index: u64, length: usize },
    DuplicateIndex(u64),
    DuplicateKey(String),
    MissingIndex(usize),
    InvalidUtf8(Utf8Error),
    IntegerOutOfRange(i64),
    NonFiniteFloat(f64),
    LengthTooLarge(u64),
    NestedTooDeeply,
    TryReserveError(TryReserveError),
    JsonError(serde_json::Error),
}

impl TronError {
    /// Returns the category of this error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        match self {
            TronError::InvalidUtf8(_) | TronError::IntegerOutOfRange(_) | TronError::NonFiniteFloat(_) => {
                ErrorKind::ValueDomain
            }
            TronError::LengthTooLarge(_) | TronError::NestedTooDeeply => ErrorKind::Capacity,
            TronError::TryReserveError(_) | TronError::JsonError(_) => ErrorKind::Resource,
            _ => ErrorKind::Structural,
        }
    }
}

impl fmt::Display for TronError {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TronError::IndexOutOfBounds { len, index } => {
                write!(f, "index out of bounds: the len is {} but the index is {}", len, index)
            }
            TronError::DocumentTooShort(len) => write!(f, "document too short, the len is {}", len),
            TronError::UnknownTrailer(magic) => write!(f, "unknown document trailer {:02x?}", magic),
            TronError::TrailingBytes { len, consumed } => write!(
                f,
                "trailing bytes after scalar value, the len is {} but {} bytes were consumed",
                len, consumed
            ),
            TronError::ReservedNotZero { pos } => write!(f, "reserved field at {} is not zero", pos),
            TronError::InvalidTag(tag) => write!(f, "invalid tag byte {:#04x}", tag),
            TronError::InvalidLengthSize(n) => write!(f, "invalid length-of-length {}", n),
            TronError::InvalidOffsetSize(n) => write!(f, "invalid node offset width {}", n),
            TronError::InvalidNodeLength { offset, len } => {
                write!(f, "invalid node length {} at offset {}", len, offset)
            }
            TronError::NodeOutOfBounds { offset, limit } => {
                write!(f, "node at offset {} does not end before {}", offset, limit)
            }
            TronError::SharedNode(offset) => write!(f, "node at offset {} is referenced more than once", offset),
            TronError::UnconsumedNodeBytes { offset, remaining } => write!(
                f,
                "node at offset {} has {} bytes left after its last entry",
                offset, remaining
            ),
            TronError::UnexpectedType { expected, actual } => {
                write!(f, "data type mismatch, expect {}, but actual {}", expected, actual)
            }
            TronError::EntryCountMismatch { bitmap, entry_count } => write!(
                f,
                "entry count {} does not match bitmap {:#06x}",
                entry_count, bitmap
            ),
            TronError::InvalidShift(shift) => write!(f, "invalid array node shift {}", shift),
            TronError::TrieTooDeep => write!(f, "object trie exceeds the maximum depth"),
            TronError::InvalidArrayLength(len) => write!(f, "invalid array length {}", len),
            TronError::ArrayIndexOutOfRange { index, length } => {
                write!(f, "array index {} out of range, the length is {}", index, length)
            }
            TronError::DuplicateIndex(index) => write!(f, "duplicate array index {}", index),
            TronError::DuplicateKey(key) => write!(f, "duplicate object key {:?}", key),
            TronError::MissingIndex(index) => write!(f, "array index {} is missing", index),
            TronError::InvalidUtf8(e) => write!(f, "{}", e),
            TronError::IntegerOutOfRange(v) => {
                write!(f, "integer {} exceeds the native integer range", v)
            }
            TronError::NonFiniteFloat(v) => write!(f, "number must be finite, got {}", v),
            TronError::LengthTooLarge(len) => write!(f, "length {} exceeds the safe integer range", len),
            TronError::NestedTooDeeply => write!(f, "value nested too deeply"),
            TronError::TryReserveError(e) => write!(f, "{}", e),
            TronError::JsonError(e) => write!(f, "{}", e),
        }
    }
}

impl Error for TronError {}

impl From<TryReserveError> for TronError {
    #[inline]
    fn from(e: TryReserveError) -> Self {
        TronError::TryReserveError(e)
    }
}

pub type TronResult<T> = std::result::Result<T, TronError>;

/// Kind of a tron document, given by its trailing marker.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum DocumentType {
    /// A single scalar value followed by `NORT`.
    Scalar,
    /// Trie nodes followed by the root offset and `TRON`.
    Tree,
}

/// How 64-bit integers are surfaced by the decoder.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum Int64Mode {
    /// Only integers exactly representable by a double, `[-(2^53 - 1), 2^53 - 1]`, are accepted.
    PreferNative,
    /// Every integer decodes exactly.
    PreferExact,
    /// Native when it fits, exact otherwise. As `i64` is exact for the whole range this equals
    /// `PreferExact`.
    #[default]
    Auto,
}

/// Options for decoding.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct DecodeOptions {
    int64_mode: Int64Mode,
}

impl DecodeOptions {
    #[inline]
    pub const fn new() -> Self {
        DecodeOptions {
            int64_mode: Int64Mode::Auto,
        }
    }

    #[inline]
    pub const fn int64_mode(mut self, mode: Int64Mode) -> Self {
        self.int64_mode = mode;
        self
    }
}

/// An owned `Tron` document.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct TronBuf {
    bytes: Vec<u8>,
}

impl TronBuf {
    /// Wraps encoded bytes. Nothing is validated until the document is decoded.
    #[inline]
    pub const fn from_vec(bytes: Vec<u8>) -> Self {
        TronBuf { bytes }
    }

    #[inline]
    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }
}

/// A slice of a tron document. This can be created from a [`TronBuf`] or any bytes.
#[repr(transparent)]
pub struct Tron {
    bytes: [u8],
}

impl Deref for TronBuf {
    type Target = Tron;

    #[inline]
    fn deref(&self) -> &Tron {
        Tron::new(&self.bytes)
    }
}

impl Borrow<Tron> for TronBuf {
    #[inline]
    fn borrow(&self) -> &Tron {
        self.deref()
    }
}

impl ToOwned for Tron {
    type Owned = TronBuf;

    #[inline]
    fn to_owned(&self) -> TronBuf {
        TronBuf::from_vec(self.bytes.to_vec())
    }
}

impl AsRef<Tron> for TronBuf {
    #[inline]
    fn as_ref(&self) -> &Tron {
        self
    }
}

impl fmt::Debug for Tron {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Tron").field(&&self.bytes).finish()
    }
}

impl PartialEq for Tron {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for Tron {}

impl Tron {
    /// Creates a new `Tron` from the reference of `[u8]`.
    #[inline]
    pub fn new<B: AsRef<[u8]> + ?Sized>(bytes: &B) -> &Tron {
        // SAFETY: `Tron` is a transparent wrapper of `[u8]`.
        unsafe { &*(bytes.as_ref() as *const [u8] as *const Tron) }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Detects the document type from the trailing marker.
    #[inline]
    pub fn document_type(&self) -> TronResult<DocumentType> {
        let len = self.bytes.len();
        if len < MAGIC_SIZE {
            return Err(TronError::DocumentTooShort(len));
        }

        let mut magic = [0u8; MAGIC_SIZE];
        magic.copy_from_slice(&self.bytes[len - MAGIC_SIZE..]);
        match magic {
            SCALAR_MAGIC => Ok(DocumentType::Scalar),
            TREE_MAGIC if len < TRAILER_SIZE => Err(TronError::DocumentTooShort(len)),
            TREE_MAGIC => Ok(DocumentType::Tree),
            magic => Err(TronError::UnknownTrailer(magic)),
        }
    }

    /// Decodes the document with the default options.
    #[inline]
    pub fn decode(&self) -> TronResult<Value> {
        self.decode_with(DecodeOptions::default())
    }

    /// Decodes the document.
    pub fn decode_with(&self, options: DecodeOptions) -> TronResult<Value> {
        let res = self.decode_inner(options);
        if let Err(e) = &res {
            debug!(len = self.bytes.len(), error = %e, "rejected tron document");
        }
        res
    }

    fn decode_inner(&self, options: DecodeOptions) -> TronResult<Value> {
        let document_type = self.document_type()?;
        trace!(len = self.bytes.len(), ?document_type, "decoding tron document");

        match document_type {
            DocumentType::Scalar => {
                let payload = &self.bytes[..self.bytes.len() - MAGIC_SIZE];
                let decoder = Decoder::new(payload, options);
                let (value, consumed) = decoder.read_value(0, payload.len(), 0, 0)?;
                if consumed != payload.len() {
                    return Err(TronError::TrailingBytes {
                        len: payload.len(),
                        consumed,
                    });
                }
                Ok(value)
            }
            DocumentType::Tree => {
                let trailer = self.bytes.len() - TRAILER_SIZE;
                let decoder = Decoder::new(&self.bytes[..trailer], options);
                let root = read_u32(&self.bytes, trailer)?;
                if read_u32(&self.bytes, trailer + size_of::<u32>())? != 0 {
                    return Err(TronError::ReservedNotZero {
                        pos: trailer + size_of::<u32>(),
                    });
                }
                decoder.read_node(root, trailer, None, 0)
            }
        }
    }
}

/// Detects the type of the document in `bytes`.
#[inline]
pub fn detect_document_type(bytes: &[u8]) -> TronResult<DocumentType> {
    Tron::new(bytes).document_type()
}

/// Decodes the document in `bytes`.
#[inline]
pub fn decode(bytes: &[u8], options: DecodeOptions) -> TronResult<Value> {
    Tron::new(bytes).decode_with(options)
}

#[inline]
fn slice(bytes: &[u8], from: usize, len: usize) -> TronResult<&[u8]> {
    from.checked_add(len)
        .and_then(|to| bytes.get(from..to))
        .ok_or(TronError::IndexOutOfBounds {
            len: bytes.len(),
            index: from.saturating_add(len),
        })
}

#[inline]
fn read_u8(bytes: &[u8], index: usize) -> TronResult<u8> {
    bytes.get(index).copied().ok_or(TronError::IndexOutOfBounds {
        len: bytes.len(),
        index,
    })
}

#[inline]
fn read_u16(bytes: &[u8], index: usize) -> TronResult<u16> {
    let mut buf = [0u8; size_of::<u16>()];
    buf.copy_from_slice(slice(bytes, index, size_of::<u16>())?);
    Ok(u16::from_le_bytes(buf))
}

#[inline]
fn read_u32(bytes: &[u8], index: usize) -> TronResult<u32> {
    let mut buf = [0u8; size_of::<u32>()];
    buf.copy_from_slice(slice(bytes, index, size_of::<u32>())?);
    Ok(u32::from_le_bytes(buf))
}

#[inline]
fn read_fixed(bytes: &[u8], index: usize) -> TronResult<[u8; FIXED_PAYLOAD_SIZE]> {
    let mut buf = [0u8; FIXED_PAYLOAD_SIZE];
    buf.copy_from_slice(slice(bytes, index, FIXED_PAYLOAD_SIZE)?);
    Ok(buf)
}

/// Header shared by every node.
pub(crate) struct NodeHeader {
    offset: usize,
    len: usize,
    kind: NodeKind,
    key_type: KeyType,
    entry_count: u32,
}

impl NodeHeader {
    #[inline]
    fn body(&self) -> usize {
        self.offset + NODE_HEADER_SIZE
    }

    #[inline]
    fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Reconstructs values from the bytes of a document, trailer excluded.
///
/// Every node must end before the node or value referencing it, so offsets strictly decrease along
/// any path and decoding always terminates. Every node is referenced at most once, so the work done
/// is bounded by the document length.
pub(crate) struct Decoder<'a> {
    bytes: &'a [u8],
    options: DecodeOptions,
    visited: RefCell<HashSet<usize>>,
}

impl<'a> Decoder<'a> {
    #[inline]
    fn new(bytes: &'a [u8], options: DecodeOptions) -> Self {
        Decoder {
            bytes,
            options,
            visited: RefCell::new(HashSet::new()),
        }
    }

    /// Reads the value at `pos`, which must end before `end`. Nodes referenced by the value must end
    /// before `limit`.
    ///
    /// Returns the value and the number of bytes it occupies.
    pub(crate) fn read_value(&self, pos: usize, end: usize, limit: usize, depth: usize) -> TronResult<(Value, usize)> {
        let bytes = &self.bytes[..end];
        let tag = read_u8(bytes, pos)?;

        match DataType::from_tag(tag) {
            DataType::Null => {
                if tag & TAG_LOW_BITS != 0 {
                    return Err(TronError::InvalidTag(tag));
                }
                Ok((Value::Null, TAG_SIZE))
            }
            DataType::Bool => {
                if tag & TAG_LOW_BITS & !1 != 0 {
                    return Err(TronError::InvalidTag(tag));
                }
                Ok((Value::Bool(tag & 1 == 1), TAG_SIZE))
            }
            DataType::Int64 => {
                if tag & TAG_LOW_BITS != 0 {
                    return Err(TronError::InvalidTag(tag));
                }
                let value = i64::from_le_bytes(read_fixed(bytes, pos + TAG_SIZE)?);
                if self.options.int64_mode == Int64Mode::PreferNative
                    && !(-MAX_NATIVE_INT..=MAX_NATIVE_INT).contains(&value)
                {
                    return Err(TronError::IntegerOutOfRange(value));
                }
                Ok((Value::Int64(value), TAG_SIZE + FIXED_PAYLOAD_SIZE))
            }
            DataType::Float64 => {
                if tag & TAG_LOW_BITS != 0 {
                    return Err(TronError::InvalidTag(tag));
                }
                let value = f64::from_le_bytes(read_fixed(bytes, pos + TAG_SIZE)?);
                Ok((Value::Float64(value), TAG_SIZE + FIXED_PAYLOAD_SIZE))
            }
            data_type @ (DataType::String | DataType::Binary) => {
                let (len, len_size) = decode_length(tag, bytes, pos + TAG_SIZE)?;
                let start = pos + TAG_SIZE + len_size;
                let len = usize::try_from(len).map_err(|_| TronError::LengthTooLarge(len))?;
                let payload = slice(bytes, start, len)?;

                let value = if data_type == DataType::String {
                    let s = std::str::from_utf8(payload).map_err(TronError::InvalidUtf8)?;
                    let mut string = String::new();
                    string.try_reserve(s.len())?;
                    string.push_str(s);
                    Value::String(string)
                } else {
                    let mut binary = Vec::new();
                    binary.try_reserve(payload.len())?;
                    binary.extend_from_slice(payload);
                    Value::Binary(binary)
                };
                Ok((value, TAG_SIZE + len_size + len))
            }
            data_type @ (DataType::Array | DataType::Object) => {
                let (size, len_size) = decode_length(tag, bytes, pos + TAG_SIZE)?;
                if size == 0 || size > MAX_OFFSET_SIZE as u64 {
                    return Err(TronError::InvalidOffsetSize(size));
                }
                let size = size as usize;
                let raw = slice(bytes, pos + TAG_SIZE + len_size, size)?;
                let mut buf = [0u8; size_of::<u32>()];
                buf[..size].copy_from_slice(raw);
                let offset = u32::from_le_bytes(buf);

                let value = self.read_node(offset, limit, Some(data_type), depth + 1)?;
                Ok((value, TAG_SIZE + len_size + size))
            }
        }
    }

    /// Decodes the composite value whose root node is at `offset`.
    pub(crate) fn read_node(
        &self,
        offset: u32,
        limit: usize,
        expected: Option<DataType>,
        depth: usize,
    ) -> TronResult<Value> {
        if depth >= MAX_NESTED_DEPTH {
            return Err(TronError::NestedTooDeeply);
        }

        let header = self.read_node_header(offset, limit)?;
        let actual = header.key_type.data_type();
        if let Some(expected) = expected {
            if expected != actual {
                return Err(TronError::UnexpectedType { expected, actual });
            }
        }

        match header.key_type {
            KeyType::Array => self.read_array(&header, depth),
            KeyType::Object => self.read_object(&header, depth),
        }
    }

    /// Reads and validates the header of the node at `offset`, which must end before `limit`.
    ///
    /// A node can be read once per decode, a second reference fails with `SharedNode`.
    pub(crate) fn read_node_header(&self, offset: u32, limit: usize) -> TronResult<NodeHeader> {
        let offset = offset as usize;
        debug_assert!(limit <= self.bytes.len());
        if offset.saturating_add(NODE_HEADER_SIZE) > limit {
            return Err(TronError::NodeOutOfBounds { offset, limit });
        }

        let word = read_u32(self.bytes, offset)?;
        let len = (word & NODE_LENGTH_MASK) as usize;
        if len < NODE_HEADER_SIZE {
            return Err(TronError::InvalidNodeLength { offset, len });
        }
        if offset + len > limit {
            return Err(TronError::NodeOutOfBounds { offset, limit });
        }
        if !self.visited.borrow_mut().insert(offset) {
            return Err(TronError::SharedNode(offset));
        }

        let kind = if word & 1 == 0 { NodeKind::Branch } else { NodeKind::Leaf };
        let key_type = if word & 2 == 0 { KeyType::Array } else { KeyType::Object };
        let entry_count = read_u32(self.bytes, offset + size_of::<u32>())?;

        Ok(NodeHeader {
            offset,
            len,
            kind,
            key_type,
            entry_count,
        })
    }
}
