//! Codec module - wire payload encoding/decoding.
//!
//! This module provides:
//!
//! - [`Value`] - nested wire value (`Null`, `Str`, `List`)
//! - [`DelimiterCodec`] - four-level separator encoding of nested values
//! - [`Charset`] - byte transform between the wire charset and UTF-8
//!
//! # Design
//!
//! The delimiter codec is a plain `Copy` struct carrying only its charset.
//! Encoding and decoding are pure functions of their input, so one codec can
//! be shared freely between sessions.
//!
//! # Example
//!
//! ```
//! use d3_connector::codec::{Charset, DelimiterCodec, Value};
//!
//! let codec = DelimiterCodec::new(Charset::Latin1);
//! let request = Value::from(vec!["4", "PING", "1", "x"]);
//! let wire = codec.encode(&request).unwrap();
//! assert_eq!(codec.decode(&wire), request);
//! ```

mod charset;
mod delimiter;
mod value;

pub use charset::{Charset, REPLACEMENT};
pub use delimiter::{DelimiterCodec, MAX_DEPTH, SEPARATORS};
pub use value::Value;
