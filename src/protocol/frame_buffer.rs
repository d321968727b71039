//! Reply buffer for accumulating a framed response.
//!
//! Uses `bytes::BytesMut` for buffer management.
//! Implements a state machine for the two read phases:
//! - `WaitingForLength`: Need 8 bytes of decimal length
//! - `WaitingForPayload`: Length parsed, need N more payload bytes
//!
//! The body may arrive in any chunk partition; the reply is complete only
//! after exactly the declared number of bytes has been pushed.

use bytes::{Bytes, BytesMut};

use super::wire_format::{decode_length_prefix, LENGTH_PREFIX_SIZE, MAX_CHUNK_SIZE};
use crate::error::{D3Error, Result};

/// Upper bound for the up-front payload allocation; larger replies grow as
/// bytes arrive.
const INITIAL_PAYLOAD_CAPACITY: usize = 64 * 1024;

/// State machine for reply parsing.
#[derive(Debug, Clone, Copy)]
enum State {
    /// Waiting for the complete length prefix.
    WaitingForLength,
    /// Length parsed, waiting for payload bytes.
    WaitingForPayload { declared: usize, remaining: usize },
}

/// Buffer for one reply frame.
pub struct ReplyBuffer {
    /// Accumulated bytes (prefix bytes first, then payload bytes).
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
}

impl ReplyBuffer {
    /// Create an empty reply buffer.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(LENGTH_PREFIX_SIZE),
            state: State::WaitingForLength,
        }
    }

    /// Push bytes read from the socket.
    ///
    /// Bytes beyond the declared payload length are ignored.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if the length prefix is not decimal.
    pub fn push(&mut self, data: &[u8]) -> Result<()> {
        let mut data = data;
        while !data.is_empty() {
            match self.state {
                State::WaitingForLength => {
                    let need = LENGTH_PREFIX_SIZE - self.buffer.len();
                    let take = need.min(data.len());
                    self.buffer.extend_from_slice(&data[..take]);
                    data = &data[take..];

                    if self.buffer.len() == LENGTH_PREFIX_SIZE {
                        let declared = decode_length_prefix(&self.buffer)?;
                        self.buffer.clear();
                        self.buffer.reserve(declared.min(INITIAL_PAYLOAD_CAPACITY));
                        self.state = State::WaitingForPayload {
                            declared,
                            remaining: declared,
                        };
                    }
                }
                State::WaitingForPayload { declared, remaining } => {
                    if remaining == 0 {
                        break;
                    }
                    let take = remaining.min(data.len());
                    self.buffer.extend_from_slice(&data[..take]);
                    data = &data[take..];
                    self.state = State::WaitingForPayload {
                        declared,
                        remaining: remaining - take,
                    };
                }
            }
        }
        Ok(())
    }

    /// Bytes still needed to finish the current phase.
    pub fn remaining(&self) -> usize {
        match self.state {
            State::WaitingForLength => LENGTH_PREFIX_SIZE - self.buffer.len(),
            State::WaitingForPayload { remaining, .. } => remaining,
        }
    }

    /// Size of the next body read: remaining bytes capped at [`MAX_CHUNK_SIZE`].
    pub fn next_chunk_size(&self) -> usize {
        self.remaining().min(MAX_CHUNK_SIZE)
    }

    /// Declared payload length, once the prefix has been read.
    pub fn declared_len(&self) -> Option<usize> {
        match self.state {
            State::WaitingForLength => None,
            State::WaitingForPayload { declared, .. } => Some(declared),
        }
    }

    /// Check if the length prefix has been fully read.
    pub fn has_length(&self) -> bool {
        matches!(self.state, State::WaitingForPayload { .. })
    }

    /// Check if the whole declared payload has been read.
    pub fn is_complete(&self) -> bool {
        matches!(self.state, State::WaitingForPayload { remaining: 0, .. })
    }

    /// Number of payload bytes received so far.
    pub fn payload_len(&self) -> usize {
        match self.state {
            State::WaitingForLength => 0,
            State::WaitingForPayload { .. } => self.buffer.len(),
        }
    }

    /// Take the payload received so far.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if the length prefix was never completed.
    pub fn into_payload(self) -> Result<Bytes> {
        match self.state {
            State::WaitingForLength => Err(D3Error::Protocol(format!(
                "reply ended after {} of {} length bytes",
                self.buffer.len(),
                LENGTH_PREFIX_SIZE
            ))),
            State::WaitingForPayload { .. } => Ok(self.buffer.freeze()),
        }
    }

    /// Get the current state for debugging.
    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match &self.state {
            State::WaitingForLength => "WaitingForLength",
            State::WaitingForPayload { .. } => "WaitingForPayload",
        }
    }
}

impl Default for ReplyBuffer {
    fn default() -> Self {
        Self::new()
    }
}
