//! Tron binary format.

use std::mem::size_of;

pub const TAG_SIZE: usize = size_of::<u8>();
pub const TAG_NULL: u8 = 0x00;
pub const TAG_FALSE: u8 = 0x20;
pub const TAG_TRUE: u8 = 0x21;
pub const TAG_INT64: u8 = 0x40;
pub const TAG_FLOAT64: u8 = 0x60;
pub const TAG_PACKED: u8 = 0x10;
pub const TAG_LOW_BITS: u8 = 0x1f;
pub const TAG_LENGTH_BITS: u8 = 0x0f;
pub const TAG_TYPE_SHIFT: u8 = 5;

pub const FIXED_PAYLOAD_SIZE: usize = size_of::<u64>();
pub const MAX_PACKED_LENGTH: u64 = 15;
pub const MAX_LENGTH_SIZE: usize = size_of::<u64>();
/// Largest length a document may declare, 2^53 - 1.
pub const MAX_SAFE_LENGTH: u64 = (1 << 53) - 1;
pub const MAX_OFFSET_SIZE: usize = size_of::<u32>();

pub const NODE_HEADER_SIZE: usize = 2 * size_of::<u32>();
pub const NODE_ALIGN: usize = 4;
pub const NODE_LENGTH_MASK: u32 = !0x3;
pub const CHILD_OFFSET_SIZE: usize = size_of::<u32>();
pub const MAP_BRANCH_HEADER_SIZE: usize = 2 * size_of::<u16>();
pub const ARRAY_HEADER_SIZE: usize = 2 * size_of::<u8>() + size_of::<u16>() + size_of::<u32>();

pub const BRANCH_FACTOR: usize = 16;
pub const SLOT_BITS: u32 = 4;
pub const SLOT_MASK: u32 = 0x0f;
pub const MAX_MAP_DEPTH: u32 = 7;
pub const MAX_ARRAY_SHIFT: u32 = 28;
pub const HASH_SEED: u32 = 0;

pub const TREE_MAGIC: [u8; 4] = *b"TRON";
pub const SCALAR_MAGIC: [u8; 4] = *b"NORT";
pub const MAGIC_SIZE: usize = TREE_MAGIC.len();
pub const TRAILER_SIZE: usize = 12;

/// Largest exact integer magnitude of an IEEE-754 double, 2^53 - 1.
pub const MAX_NATIVE_INT: i64 = (1 << 53) - 1;
pub const MAX_NESTED_DEPTH: usize = 128;
