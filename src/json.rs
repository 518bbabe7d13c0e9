//! Json to Tron, and back.
//!
//! Json has no binary type, so binary values travel as strings carrying [`BLOB_PREFIX`] followed by
//! their base64 text. A prefixed string whose remainder is not valid base64 stays a string.

use crate::builder::{encode, encode_with_vec, BuildError, BuildResult};
use crate::tron::{DecodeOptions, Tron, TronBuf, TronError, TronResult};
use crate::{Map, Value};
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use serde_json::Number;

/// Prefix marking a json string as an encoded binary value.
pub const BLOB_PREFIX: &str = "b64:";

/// Standard alphabet, padded on output. Padding is optional on input and non-zero trailing bits are
/// ignored.
const BLOB_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Encodes binary data as base64 text.
#[inline]
pub fn blob_to_text(bytes: &[u8]) -> String {
    BLOB_ENGINE.encode(bytes)
}

/// Decodes base64 text, returning `None` if it is not valid.
#[inline]
pub fn text_to_blob(text: &str) -> Option<Vec<u8>> {
    BLOB_ENGINE.decode(text).ok()
}

impl TryFrom<&serde_json::Value> for Value {
    type Error = BuildError;

    fn try_from(json: &serde_json::Value) -> Result<Self, Self::Error> {
        let value = match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(v) => Value::Bool(*v),
            serde_json::Value::Number(n) => number_to_value(n)?,
            serde_json::Value::String(s) => match s.strip_prefix(BLOB_PREFIX).and_then(text_to_blob) {
                Some(blob) => Value::Binary(blob),
                None => Value::String(s.clone()),
            },
            serde_json::Value::Array(array) => {
                let mut values = Vec::new();
                values.try_reserve(array.len())?;
                for v in array {
                    values.push(Value::try_from(v)?);
                }
                Value::Array(values)
            }
            serde_json::Value::Object(object) => {
                let mut map = Map::new();
                for (k, v) in object {
                    map.insert(k.clone(), Value::try_from(v)?);
                }
                Value::Object(map)
            }
        };
        Ok(value)
    }
}

/// Integers fitting `i64` stay exact, everything else becomes a finite double.
#[inline]
fn number_to_value(n: &Number) -> BuildResult<Value> {
    if let Some(v) = n.as_i64() {
        return Ok(Value::Int64(v));
    }
    match n.as_f64() {
        Some(v) if v.is_finite() => Ok(Value::Float64(v)),
        Some(v) => Err(BuildError::NonFiniteFloat(v)),
        None => Err(BuildError::UnsupportedValue("number is not representable as a double")),
    }
}

impl TryFrom<&Value> for serde_json::Value {
    type Error = TronError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let json = match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(v) => serde_json::Value::Bool(*v),
            Value::Int64(v) => serde_json::Value::Number(Number::from(*v)),
            Value::Float64(v) => Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .ok_or(TronError::NonFiniteFloat(*v))?,
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Binary(b) => serde_json::Value::String(format!("{}{}", BLOB_PREFIX, blob_to_text(b))),
            Value::Array(values) => {
                let mut array = Vec::new();
                array.try_reserve(values.len())?;
                for v in values {
                    array.push(serde_json::Value::try_from(v)?);
                }
                serde_json::Value::Array(array)
            }
            Value::Object(map) => {
                let mut object = serde_json::Map::new();
                for (k, v) in map {
                    object.insert(k.clone(), serde_json::Value::try_from(v)?);
                }
                serde_json::Value::Object(object)
            }
        };
        Ok(json)
    }
}

impl TronBuf {
    /// Parses a json string to `TronBuf`.
    #[inline]
    pub fn parse<T: AsRef<str>>(str: T) -> BuildResult<Self> {
        let json: serde_json::Value = serde_json::from_str(str.as_ref()).map_err(BuildError::JsonError)?;
        encode(&Value::try_from(&json)?)
    }
}

impl Tron {
    /// Parses a json string to `Tron`, appending the document to `bytes`.
    #[inline]
    pub fn parse_to<T: AsRef<str>>(bytes: &mut Vec<u8>, str: T) -> BuildResult<&Tron> {
        let json: serde_json::Value = serde_json::from_str(str.as_ref()).map_err(BuildError::JsonError)?;
        let value = Value::try_from(&json)?;
        encode_with_vec(&value, bytes)
    }

    /// Decodes the document with `options` and writes it as compact json.
    #[inline]
    pub fn to_json(&self, options: DecodeOptions) -> TronResult<String> {
        let json = serde_json::Value::try_from(&self.decode_with(options)?)?;
        serde_json::to_string(&json).map_err(TronError::JsonError)
    }

    /// Formats the document as json.
    #[inline]
    pub fn format(&self, pretty: bool) -> TronResult<String> {
        let json = serde_json::Value::try_from(&self.decode()?)?;
        let res = if pretty {
            serde_json::to_string_pretty(&json)
        } else {
            serde_json::to_string(&json)
        };
        res.map_err(TronError::JsonError)
    }
}
