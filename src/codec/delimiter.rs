//! Multi-level delimiter codec.
//!
//! D3 payloads are flat byte strings where nesting is expressed with four
//! single-byte separators, outermost first:
//!
//! ```text
//! level 0  0x01  field
//! level 1  0xFE  value
//! level 2  0xFD  subvalue
//! level 3  0xFC  sub-subvalue
//! ```
//!
//! The server omits separators for levels without repeated substructure, so
//! decoding looks ahead across all deeper levels, not only the next one. When
//! it jumps over levels, each skipped level shows up as an empty list.
//!
//! # Example
//!
//! ```
//! use d3_connector::codec::{DelimiterCodec, Value};
//!
//! let codec = DelimiterCodec::default();
//! let wire = codec.encode(&Value::from(vec!["4", "GETCUST", "1", "123"])).unwrap();
//! assert_eq!(&wire[..], b"4\x01GETCUST\x011\x01123");
//!
//! let decoded = codec.decode(b"a\xFDb");
//! assert_eq!(
//!     decoded,
//!     Value::List(vec![Value::List(vec![]), Value::from(vec!["a", "b"])])
//! );
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use super::{Charset, Value};
use crate::error::{D3Error, Result};

/// Separator bytes, outermost to innermost.
pub const SEPARATORS: [u8; 4] = [0x01, 0xFE, 0xFD, 0xFC];

/// Number of nesting levels the separator table can express.
pub const MAX_DEPTH: usize = SEPARATORS.len();

/// Delimiter codec bound to a wire charset.
///
/// Stateless; cheap to copy and safe to share across tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelimiterCodec {
    charset: Charset,
}

impl DelimiterCodec {
    /// Create a codec using the given wire charset.
    pub fn new(charset: Charset) -> Self {
        Self { charset }
    }

    /// Get the wire charset.
    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// Encode a value to wire bytes.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a list is nested deeper than
    /// [`MAX_DEPTH`] levels.
    pub fn encode(&self, value: &Value) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        self.encode_into(value, 0, &mut buf)?;
        Ok(buf.freeze())
    }

    fn encode_into(&self, value: &Value, depth: usize, buf: &mut BytesMut) -> Result<()> {
        match value {
            Value::Null => Ok(()),
            Value::Str(s) => {
                buf.extend_from_slice(&self.charset.to_wire(s));
                Ok(())
            }
            Value::List(items) => {
                let separator = *SEPARATORS.get(depth).ok_or_else(|| {
                    D3Error::Validation(format!(
                        "cannot encode more than {} nesting levels",
                        MAX_DEPTH
                    ))
                })?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        buf.put_u8(separator);
                    }
                    self.encode_into(item, depth + 1, buf)?;
                }
                Ok(())
            }
        }
    }

    /// Decode wire bytes starting at the outermost level.
    pub fn decode(&self, wire: &[u8]) -> Value {
        self.decode_at(wire, 0)
    }

    /// Decode wire bytes as if they sat at nesting level `depth`.
    pub fn decode_at(&self, wire: &[u8], depth: usize) -> Value {
        if depth < MAX_DEPTH {
            let separator = SEPARATORS[depth];
            if wire.contains(&separator) {
                return Value::List(
                    wire.split(|&b| b == separator)
                        .map(|part| self.decode_at(part, depth + 1))
                        .collect(),
                );
            }

            for level in depth + 1..MAX_DEPTH {
                if wire.contains(&SEPARATORS[level]) {
                    let mut items = vec![Value::List(Vec::new()); level - depth - 1];
                    items.push(self.decode_at(wire, level));
                    return Value::List(items);
                }
            }
        }

        if wire.is_empty() {
            Value::Null
        } else {
            Value::Str(self.charset.from_wire(wire))
        }
    }
}
