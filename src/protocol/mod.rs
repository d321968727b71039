//! Protocol module - wire format, framing, and the request/response exchange.
//!
//! This module implements the D3 line protocol:
//! - 8-byte ASCII decimal length prefix encoding/decoding
//! - Reply buffer for accumulating chunked reads
//! - Framed exchange with per-I/O and whole-call timeout checks
//! - Dispatcher line reply reading

mod exchange;
mod frame;
mod frame_buffer;
mod wire_format;

pub(crate) use exchange::bounded;
pub use exchange::{exchange, read_line_reply};
pub use frame::build_frame;
pub use frame_buffer::ReplyBuffer;
pub use wire_format::{
    decode_length_prefix, encode_length_prefix, parse_line_port, CALL_TAG, LENGTH_PREFIX_SIZE,
    LINE_REPLY_MAX, MAX_CHUNK_SIZE, MAX_PAYLOAD_SIZE,
};
