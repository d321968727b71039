//! Wire format encoding and decoding.
//!
//! Request and reply frames share one layout:
//! ```text
//! ┌──────────────────────┬─────────────────────┐
//! │ Length               │ Payload             │
//! │ 8 bytes              │ Length bytes        │
//! │ ASCII decimal, %08d  │ delimited, charset  │
//! └──────────────────────┴─────────────────────┘
//! ```
//!
//! Line negotiation uses a bare decimal port number terminated by `\n`,
//! of which at most 8 bytes are read.

use crate::error::{D3Error, Result};

/// Length prefix size in bytes (fixed, exactly 8).
pub const LENGTH_PREFIX_SIZE: usize = 8;

/// Largest payload expressible in an 8-digit decimal prefix.
pub const MAX_PAYLOAD_SIZE: usize = 99_999_999;

/// Maximum bytes requested per body read.
pub const MAX_CHUNK_SIZE: usize = 8192;

/// Maximum bytes read from the dispatcher while negotiating a line.
pub const LINE_REPLY_MAX: usize = 8;

/// Command tag placed first in every request.
pub const CALL_TAG: u32 = 4;

/// Encode a payload length as an 8-digit zero-padded ASCII prefix.
///
/// # Example
///
/// ```
/// use d3_connector::protocol::encode_length_prefix;
///
/// assert_eq!(&encode_length_prefix(42).unwrap(), b"00000042");
/// ```
pub fn encode_length_prefix(len: usize) -> Result<[u8; LENGTH_PREFIX_SIZE]> {
    if len > MAX_PAYLOAD_SIZE {
        return Err(D3Error::Validation(format!(
            "payload size {} exceeds maximum {}",
            len, MAX_PAYLOAD_SIZE
        )));
    }
    let mut buf = [0u8; LENGTH_PREFIX_SIZE];
    buf.copy_from_slice(format!("{:08}", len).as_bytes());
    Ok(buf)
}

/// Decode an ASCII decimal length prefix.
///
/// Surrounding ASCII whitespace is tolerated; anything else that is not a
/// digit is a protocol error.
pub fn decode_length_prefix(buf: &[u8]) -> Result<usize> {
    let digits = buf.trim_ascii();
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(D3Error::Protocol(format!(
            "invalid length prefix {:?}",
            String::from_utf8_lossy(buf)
        )));
    }
    // At most 8 digits, cannot overflow usize.
    Ok(digits
        .iter()
        .fold(0usize, |acc, d| acc * 10 + usize::from(*d - b'0')))
}

/// Parse the line port handed out by the dispatcher.
///
/// Returns `None` when the reply is not a valid port number.
pub fn parse_line_port(reply: &[u8]) -> Option<u16> {
    std::str::from_utf8(reply).ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_prefix_is_exactly_8() {
        assert_eq!(LENGTH_PREFIX_SIZE, 8);
        assert_eq!(&encode_length_prefix(0).unwrap(), b"00000000");
        assert_eq!(&encode_length_prefix(8192).unwrap(), b"00008192");
        assert_eq!(
            &encode_length_prefix(MAX_PAYLOAD_SIZE).unwrap(),
            b"99999999"
        );
    }

    #[test]
    fn test_length_prefix_too_large() {
        let result = encode_length_prefix(MAX_PAYLOAD_SIZE + 1);
        assert!(result.unwrap_err().to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_decode_length_prefix() {
        assert_eq!(decode_length_prefix(b"00000042").unwrap(), 42);
        assert_eq!(decode_length_prefix(b"99999999").unwrap(), MAX_PAYLOAD_SIZE);
        assert_eq!(decode_length_prefix(b"     120").unwrap(), 120);
    }

    #[test]
    fn test_decode_length_prefix_rejects_garbage() {
        assert!(decode_length_prefix(b"0000004x").is_err());
        assert!(decode_length_prefix(b"        ").is_err());
        assert!(decode_length_prefix(b"-0000001").is_err());
    }

    #[test]
    fn test_parse_line_port() {
        assert_eq!(parse_line_port(b"9012\n"), Some(9012));
        assert_eq!(parse_line_port(b"9012\r\n"), Some(9012));
        assert_eq!(parse_line_port(b"busy\n"), None);
        assert_eq!(parse_line_port(b"99999999"), None);
        assert_eq!(parse_line_port(b""), None);
    }
}
