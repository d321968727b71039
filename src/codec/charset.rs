//! Wire charset conversion.
//!
//! D3 servers speak a single-byte charset (Latin-1). Application strings are
//! UTF-8. The conversion is a pure byte transform applied at the edge of the
//! codec: on encode every scalar is converted to the wire charset, on decode
//! every scalar is converted back.
//!
//! # Example
//!
//! ```
//! use d3_connector::codec::Charset;
//!
//! let wire = Charset::Latin1.to_wire("año");
//! assert_eq!(&wire[..], b"a\xF1o");
//! assert_eq!(Charset::Latin1.from_wire(&wire), "año");
//! ```

use std::borrow::Cow;

/// Replacement byte for characters outside the wire charset.
pub const REPLACEMENT: u8 = b'?';

/// Charset used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    /// ISO-8859-1: one byte per code point `U+0000..=U+00FF`.
    #[default]
    Latin1,
    /// Bytes are passed through as UTF-8 (invalid sequences are replaced).
    Utf8,
}

impl Charset {
    /// Convert an application string to wire bytes.
    ///
    /// Latin-1 maps characters above `U+00FF` to `?`.
    pub fn to_wire<'a>(&self, s: &'a str) -> Cow<'a, [u8]> {
        match self {
            Charset::Utf8 => Cow::Borrowed(s.as_bytes()),
            Charset::Latin1 => {
                if s.is_ascii() {
                    return Cow::Borrowed(s.as_bytes());
                }
                Cow::Owned(
                    s.chars()
                        .map(|c| u8::try_from(u32::from(c)).unwrap_or(REPLACEMENT))
                        .collect(),
                )
            }
        }
    }

    /// Convert wire bytes to an application string.
    pub fn from_wire(&self, bytes: &[u8]) -> String {
        match self {
            Charset::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Charset::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
        }
    }
}
