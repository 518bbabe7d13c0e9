//! Scalar builder.

use crate::binary::{
    FIXED_PAYLOAD_SIZE, MAX_LENGTH_SIZE, SCALAR_MAGIC, TAG_FALSE, TAG_FLOAT64, TAG_INT64, TAG_NULL, TAG_SIZE, TAG_TRUE,
};
use crate::builder::{BuildError, BuildResult, Encoder, Pending};
use crate::tron::{Tron, TronBuf};
use crate::util::encode_length;
use crate::vec::VecExt;
use crate::{DataType, Value};

/// Writes a scalar value: tag byte, then fixed or length-prefixed payload.
pub(crate) fn push_scalar(bytes: &mut Vec<u8>, value: &Value) -> BuildResult<()> {
    match value {
        Value::Null => {
            bytes.try_reserve(TAG_SIZE)?;
            bytes.push_u8(TAG_NULL);
        }
        Value::Bool(v) => {
            bytes.try_reserve(TAG_SIZE)?;
            bytes.push_u8(if *v { TAG_TRUE } else { TAG_FALSE });
        }
        Value::Int64(v) => {
            bytes.try_reserve(TAG_SIZE + FIXED_PAYLOAD_SIZE)?;
            bytes.push_u8(TAG_INT64);
            bytes.push_bytes(&v.to_le_bytes());
        }
        Value::Float64(v) => {
            if !v.is_finite() {
                return Err(BuildError::NonFiniteFloat(*v));
            }
            bytes.try_reserve(TAG_SIZE + FIXED_PAYLOAD_SIZE)?;
            bytes.push_u8(TAG_FLOAT64);
            bytes.push_bytes(&v.to_le_bytes());
        }
        Value::String(v) => push_string(bytes, v)?,
        Value::Binary(v) => push_payload(bytes, DataType::Binary, v)?,
        Value::Array(_) | Value::Object(_) => {
            return Err(BuildError::UnsupportedValue("composite value cannot be written as a scalar"))
        }
    }
    Ok(())
}

#[inline]
pub(crate) fn push_string(bytes: &mut Vec<u8>, s: &str) -> BuildResult<()> {
    push_payload(bytes, DataType::String, s.as_bytes())
}

#[inline]
fn push_payload(bytes: &mut Vec<u8>, data_type: DataType, payload: &[u8]) -> BuildResult<()> {
    bytes.try_reserve(TAG_SIZE + MAX_LENGTH_SIZE + payload.len())?;
    encode_length(data_type.tag_prefix(), payload.len() as u64, bytes)?;
    bytes.push_bytes(payload);
    Ok(())
}

/// Builder for encoding a scalar document.
#[derive(Debug)]
pub struct Scalar {}

macro_rules! impl_scalar {
    ($(#[$doc: meta] $name: ident, $name_with_vec: ident, $ty: ty, $to_value: expr;)*) => {
        impl Scalar {
            $(
                #[$doc]
                #[inline]
                pub fn $name(value: $ty) -> BuildResult<TronBuf> {
                    let mut bytes = Vec::new();
                    Scalar::$name_with_vec(value, &mut bytes)?;
                    Ok(TronBuf::from_vec(bytes))
                }

                #[$doc]
                ///
                /// The document is appended to the provided vector.
                #[inline]
                pub fn $name_with_vec<'a>(value: $ty, bytes: &'a mut Vec<u8>) -> BuildResult<&'a Tron> {
                    let value: Value = $to_value(value);
                    Scalar::scalar_with_vec(&value, bytes)
                }
            )*
        }
    };
}

impl_scalar! {
    /// Encodes a bool value.
    bool, bool_with_vec, bool, Value::Bool;
    /// Encodes a 64-bit integer value.
    int64, int64_with_vec, i64, Value::Int64;
    /// Encodes a 64-bit floating point value, which must be finite.
    float64, float64_with_vec, f64, Value::Float64;
    /// Encodes a string value.
    string, string_with_vec, &str, |s: &str| Value::String(s.to_string());
    /// Encodes a binary value.
    binary, binary_with_vec, &[u8], |b: &[u8]| Value::Binary(b.to_vec());
}

impl Scalar {
    /// Encodes a null value.
    #[inline]
    pub fn null() -> BuildResult<TronBuf> {
        let mut bytes = Vec::new();
        Scalar::null_with_vec(&mut bytes)?;
        Ok(TronBuf::from_vec(bytes))
    }

    /// Encodes a null value into the provided vector.
    #[inline]
    pub fn null_with_vec(bytes: &mut Vec<u8>) -> BuildResult<&Tron> {
        Scalar::scalar_with_vec(&Value::Null, bytes)
    }

    #[inline]
    fn scalar_with_vec<'a>(value: &Value, bytes: &'a mut Vec<u8>) -> BuildResult<&'a Tron> {
        debug_assert!(!value.data_type().is_composite());
        bytes.try_reserve(SCALAR_MAGIC.len())?;
        Encoder::new(bytes).finish(Pending::Scalar(value))
    }
}
