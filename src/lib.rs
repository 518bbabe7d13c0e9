//! Encoding and decoding support for TRON in Rust.
//!
//! TRON is a self-describing binary document format. Mappings are stored as hash tries and sequences
//! as radix tries, so a document is a set of immutable nodes written children first and referenced by
//! absolute offset.
//!
//! ## Optional features
//!
//! ### `serde`
//!
//! When this optional dependency is enabled, `TronBuf` implements the `serde::Serialize` and
//! `serde::Deserialize` traits.
//!
//! ## Tron binary format
//!
//! All integers are little-endian.
//!
//! ```BNF
//! document ::= scalar-document | tree-document
//!
//! scalar-document ::= scalar "NORT"
//! tree-document ::= node* root-offset reserved "TRON"
//!
//! root-offset ::= uint32      // offset of the root node from the start of the document
//! reserved ::= uint32         // must be 0
//!
//! tag ::= uint8               // high 3 bits: type, low 5 bits: type specific
//!
//! type ::=
//!     0 |     // null
//!     1 |     // bool
//!     2 |     // 64-bit signed integer
//!     3 |     // 64-bit floating point
//!     4 |     // string
//!     5 |     // binary data
//!     6 |     // array
//!     7       // object
//!
//! value ::= scalar | array-ref | object-ref
//!
//! scalar ::=
//!     0x00 |                  // null
//!     0x20 | 0x21 |           // false, true
//!     0x40 int64 |            // 64-bit signed integer
//!     0x60 float64 |          // 64-bit floating point, finite
//!     string-tag length uint8* |
//!     binary-tag length uint8*
//!
//! length ::= packed | uint8{1,8}
//!                             // If bit 0x10 of the tag is set, its low 4 bits are the length (0..=15).
//!                             // Otherwise the low 4 bits are the count of length bytes that follow,
//!                             // always the minimal count. Lengths never exceed 2^53 - 1.
//!
//! array-ref ::= array-tag uint8{1,4}  // node offset, the length field holds its width
//! object-ref ::= object-tag uint8{1,4}
//!
//! node ::= node-header node-body padding
//!
//! node-header ::= node-word entry-count
//! node-word ::= uint32        // node length (multiple of 4) | kind (bit 0, leaf = 1)
//!                             // | key type (bit 1, object = 1)
//! entry-count ::= uint32
//!
//! object-branch ::= bitmap uint16 child-offset*   // reserved uint16 is 0
//! object-leaf ::= (string value)*                 // key-value pairs
//!
//! array-node ::= shift uint8 bitmap array-length (value* | child-offset*)
//! shift ::= uint8             // multiple of 4, 0 for leaves
//! array-length ::= uint32     // element count at the root node, 0 elsewhere
//!
//! bitmap ::= uint16           // one bit per occupied slot, popcount equals entry-count
//! child-offset ::= uint32
//! padding ::= 0*              // up to the next multiple of 4
//! ```
//!
//! An object key is routed by its xxHash32 (seed 0): level `d` of the trie takes slot
//! `(hash >> (4 * d)) & 0xf`, for at most 7 levels. An array element at index `i` takes slot
//! `(i >> shift) & 0xf` at every level.
//!
//! ## Usage
//!
//! ### `encode` / `decode`
//!
//! ```rust
//! use tron::{encode, DocumentType, Value};
//!
//! let value = Value::from_iter([("name", Value::from("tron")), ("version", Value::from(1))]);
//! let doc = encode(&value).unwrap();
//! assert_eq!(doc.document_type().unwrap(), DocumentType::Tree);
//! assert_eq!(doc.decode().unwrap(), value);
//! ```
//!
//! ### `Scalar`
//!
//! To encode a scalar document directly, use [`Scalar`]:
//!
//! ```rust
//! use tron::{DocumentType, Scalar};
//!
//! let tron = Scalar::string("string").unwrap();
//! assert_eq!(tron.document_type().unwrap(), DocumentType::Scalar);
//!
//! let mut bytes = Vec::with_capacity(16);
//! let tron = Scalar::string_with_vec("string", &mut bytes).unwrap();
//! assert_eq!(tron.as_bytes(), b"\x96stringNORT");
//! ```
//!
//! ### `DecodeOptions`
//!
//! ```rust
//! use tron::{DecodeOptions, Int64Mode, Scalar, TronError};
//!
//! let tron = Scalar::int64(i64::MAX).unwrap();
//! let options = DecodeOptions::new().int64_mode(Int64Mode::PreferNative);
//! assert!(matches!(tron.decode_with(options), Err(TronError::IntegerOutOfRange(_))));
//! ```
//!
//! ### JSON
//!
//! ```rust
//! use tron::TronBuf;
//!
//! let tron = TronBuf::parse(r#"{"key": [1, 2.5, "b64:AQI="]}"#).unwrap();
//! assert_eq!(tron.format(false).unwrap(), r#"{"key":[1,2.5,"b64:AQI="]}"#);
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

mod binary;
mod builder;
mod data_type;
mod json;
mod tron;
mod util;
mod value;
mod vec;

#[cfg(feature = "serde")]
mod serde;

pub use self::{
    builder::{encode, encode_with_vec, ArrayBuilder, BuildError, BuildResult, Scalar},
    data_type::{DataType, InvalidDataType},
    json::{blob_to_text, text_to_blob, BLOB_PREFIX},
    tron::{
        decode, detect_document_type, DecodeOptions, DocumentType, ErrorKind, Int64Mode, Tron, TronBuf, TronError,
        TronResult,
    },
    util::hash32,
    value::{Map, Value},
};
