//! Error types for d3-connector.

use thiserror::Error;

/// Main error type for all D3 operations.
///
/// Every failure of a call surfaces as exactly one of these variants; no
/// partial results are returned alongside an error.
#[derive(Debug, Error)]
pub enum D3Error {
    /// Invalid input from the caller (empty routine name, empty parameter
    /// list, empty outgoing payload, nesting too deep to encode).
    #[error("D3: {0}")]
    Validation(String),

    /// Settings missing, incomplete or disabled.
    #[error("D3: configuration error: {0}")]
    Configuration(String),

    /// Dispatcher or line could not be reached, or no line was free.
    #[error("D3: {0}")]
    Connectivity(String),

    /// `send` invoked without an acquired line.
    #[error("D3: not connected")]
    NotConnected,

    /// The exchange exceeded the configured I/O timeout.
    #[error("D3: request took longer than {} to be processed", describe_limit(.limit))]
    Timeout {
        /// Configured I/O timeout.
        limit: std::time::Duration,
        /// A read or write was cut off, so the line may hold part of a reply.
        in_flight: bool,
    },

    /// Decoded data does not match the expected structure.
    #[error("D3: structure error: {0}")]
    Schema(String),

    /// Malformed frame received from the server.
    #[error("D3: protocol error: {0}")]
    Protocol(String),

    /// I/O error during socket operations.
    #[error("D3: I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Discriminant of [`D3Error`], for callers that branch on the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Configuration,
    Connectivity,
    NotConnected,
    Timeout,
    Schema,
    Protocol,
    Io,
}

impl D3Error {
    /// Get the kind tag of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            D3Error::Validation(_) => ErrorKind::Validation,
            D3Error::Configuration(_) => ErrorKind::Configuration,
            D3Error::Connectivity(_) => ErrorKind::Connectivity,
            D3Error::NotConnected => ErrorKind::NotConnected,
            D3Error::Timeout { .. } => ErrorKind::Timeout,
            D3Error::Schema(_) => ErrorKind::Schema,
            D3Error::Protocol(_) => ErrorKind::Protocol,
            D3Error::Io(_) => ErrorKind::Io,
        }
    }
}

impl D3Error {
    /// Check if the line this error came from can no longer carry a call.
    ///
    /// True for transport failures, malformed or truncated frames, and
    /// timeouts that interrupted a read or write. A timeout raised after the
    /// whole reply was read leaves the line clean.
    pub fn drops_line(&self) -> bool {
        match self {
            D3Error::Io(_) | D3Error::Protocol(_) => true,
            D3Error::Timeout { in_flight, .. } => *in_flight,
            _ => false,
        }
    }
}

fn describe_limit(limit: &std::time::Duration) -> String {
    if limit.subsec_nanos() == 0 {
        format!("{} seconds", limit.as_secs())
    } else {
        format!("{} ms", limit.as_millis())
    }
}

/// Result type alias using D3Error.
pub type Result<T> = std::result::Result<T, D3Error>;
