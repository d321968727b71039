//! Request frame building.
//!
//! A frame is the 8-byte decimal length prefix followed by the payload.
//!
//! # Example
//!
//! ```
//! use d3_connector::protocol::build_frame;
//!
//! let frame = build_frame(b"hello").unwrap();
//! assert_eq!(&frame[..], b"00000005hello");
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use super::wire_format::{encode_length_prefix, LENGTH_PREFIX_SIZE};
use crate::error::Result;

/// Build a complete frame (prefix + payload) in a single allocation.
pub fn build_frame(payload: &[u8]) -> Result<Bytes> {
    let prefix = encode_length_prefix(payload.len())?;
    let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    buf.put_slice(&prefix);
    buf.put_slice(payload);
    Ok(buf.freeze())
}
