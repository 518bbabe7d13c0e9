//! Basic functions.

use crate::binary::{
    HASH_SEED, MAX_LENGTH_SIZE, MAX_OFFSET_SIZE, MAX_PACKED_LENGTH, MAX_SAFE_LENGTH, TAG_LENGTH_BITS, TAG_PACKED,
};
use crate::builder::BuildResult;
use crate::tron::TronResult;
use crate::{BuildError, TronError};
use std::cmp::Ordering;
use xxhash_rust::xxh32::xxh32;

/// Seeded 32-bit hash used to spread object keys across trie slots.
#[inline]
pub fn hash32(bytes: &[u8], seed: u32) -> u32 {
    xxh32(bytes, seed)
}

#[inline]
pub fn hash_key(key: &str) -> u32 {
    hash32(key.as_bytes(), HASH_SEED)
}

/// Byte-lexicographic key order used inside collision leaves.
#[inline]
pub fn cmp_key(left: &str, right: &str) -> Ordering {
    left.as_bytes().cmp(right.as_bytes())
}

/// Returns how many explicit length bytes `length` needs, 0 meaning it is packed into the tag.
#[inline]
pub fn length_size(length: u64) -> BuildResult<usize> {
    if length > MAX_SAFE_LENGTH {
        return Err(BuildError::LengthTooLarge(length));
    }
    if length <= MAX_PACKED_LENGTH {
        return Ok(0);
    }
    let bits = u64::BITS - length.leading_zeros();
    Ok(((bits + 7) / 8) as usize)
}

/// Encodes a tag carrying `length` with the packed or explicit length form.
#[inline]
pub fn encode_length(prefix: u8, length: u64, buf: &mut Vec<u8>) -> BuildResult<()> {
    let size = length_size(length)?;
    if size == 0 {
        buf.push(prefix | TAG_PACKED | length as u8);
    } else {
        buf.push(prefix | size as u8);
        buf.extend_from_slice(&length.to_le_bytes()[..size]);
    }
    Ok(())
}

/// Decodes the length announced by `tag`, whose explicit length bytes (if any) start at `index`.
///
/// Returns the length and the number of length bytes consumed.
#[inline]
pub fn decode_length(tag: u8, buf: &[u8], index: usize) -> TronResult<(u64, usize)> {
    if tag & TAG_PACKED != 0 {
        return Ok(((tag & TAG_LENGTH_BITS) as u64, 0));
    }

    let size = (tag & TAG_LENGTH_BITS) as usize;
    if size == 0 || size > MAX_LENGTH_SIZE {
        return Err(TronError::InvalidLengthSize(size as u8));
    }
    let bytes = buf.get(index..index + size).ok_or(TronError::IndexOutOfBounds {
        len: buf.len(),
        index: index + size,
    })?;

    let mut raw = [0u8; MAX_LENGTH_SIZE];
    raw[..size].copy_from_slice(bytes);
    let length = u64::from_le_bytes(raw);
    if length > MAX_SAFE_LENGTH {
        return Err(TronError::LengthTooLarge(length));
    }
    Ok((length, size))
}

/// Minimal byte width of a node offset.
#[inline]
pub fn offset_size(offset: u32) -> usize {
    let bits = u32::BITS - offset.leading_zeros();
    ((bits + 7) / 8).clamp(1, MAX_OFFSET_SIZE as u32) as usize
}

/// Rounds `len` up to the next multiple of `align`.
#[inline]
pub fn align_up(len: usize, align: usize) -> usize {
    (len + align - 1) / align * align
}
