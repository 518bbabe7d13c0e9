//! Data type.

use crate::binary::TAG_TYPE_SHIFT;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Value type held in the top 3 bits of a tag byte.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[repr(u8)]
pub enum DataType {
    Null = 0,
    Bool = 1,
    Int64 = 2,
    Float64 = 3,
    String = 4,
    Binary = 5,
    Array = 6,
    Object = 7,
}

impl DataType {
    /// Extracts the data type from a tag byte.
    #[inline]
    pub const fn from_tag(tag: u8) -> DataType {
        match tag >> TAG_TYPE_SHIFT {
            0 => DataType::Null,
            1 => DataType::Bool,
            2 => DataType::Int64,
            3 => DataType::Float64,
            4 => DataType::String,
            5 => DataType::Binary,
            6 => DataType::Array,
            _ => DataType::Object,
        }
    }

    /// Returns the tag byte prefix of this data type.
    #[inline]
    pub const fn tag_prefix(self) -> u8 {
        (self as u8) << TAG_TYPE_SHIFT
    }

    #[inline]
    pub const fn is_composite(self) -> bool {
        matches!(self, DataType::Array | DataType::Object)
    }
}

impl From<DataType> for u8 {
    #[inline]
    fn from(t: DataType) -> Self {
        t as u8
    }
}

#[derive(Debug)]
#[repr(transparent)]
pub struct InvalidDataType(u8);

impl TryFrom<u8> for DataType {
    type Error = InvalidDataType;

    #[inline]
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DataType::Null),
            1 => Ok(DataType::Bool),
            2 => Ok(DataType::Int64),
            3 => Ok(DataType::Float64),
            4 => Ok(DataType::String),
            5 => Ok(DataType::Binary),
            6 => Ok(DataType::Array),
            7 => Ok(DataType::Object),
            v => Err(InvalidDataType(v)),
        }
    }
}

impl Display for InvalidDataType {
    #[inline]
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "invalid data type value '{}'", self.0)
    }
}

impl Error for InvalidDataType {}

impl Display for DataType {
    #[inline]
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let name = match self {
            DataType::Null => "null",
            DataType::Bool => "bool",
            DataType::Int64 => "int64",
            DataType::Float64 => "float64",
            DataType::String => "string",
            DataType::Binary => "binary",
            DataType::Array => "array",
            DataType::Object => "object",
        };
        f.write_str(name)
    }
}

/// Whether a node holds child offsets or materialized entries.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[repr(u8)]
pub enum NodeKind {
    Branch = 0,
    Leaf = 1,
}

/// Which trie a node belongs to.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[repr(u8)]
pub enum KeyType {
    Array = 0,
    Object = 1,
}

impl KeyType {
    #[inline]
    pub const fn data_type(self) -> DataType {
        match self {
            KeyType::Array => DataType::Array,
            KeyType::Object => DataType::Object,
        }
    }
}
