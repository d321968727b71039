//! Framed request/response exchange over an async stream.
//!
//! Every individual write and read is bounded by the I/O timeout. After the
//! read loop the total elapsed time is checked against the same limit, so a
//! reply that trickled in slower than the limit still fails even though all
//! of its bytes arrived.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

use super::frame::build_frame;
use super::frame_buffer::ReplyBuffer;
use super::wire_format::{LINE_REPLY_MAX, MAX_CHUNK_SIZE};
use crate::error::{D3Error, Result};

/// Run an I/O future under a timeout, mapping expiry to [`D3Error::Timeout`].
pub(crate) async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = std::io::Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(D3Error::Timeout {
            limit,
            in_flight: true,
        }),
    }
}

/// Send one framed request and read the framed reply.
///
/// Returns the reply payload without its length prefix. If the stream ends
/// before the declared length is reached, the bytes received so far are
/// returned.
///
/// # Errors
///
/// - [`D3Error::Validation`] if `payload` is empty
/// - [`D3Error::Timeout`] if a single read/write exceeds `io_timeout`
///   (`in_flight: true`), or the exchange as a whole does after the full
///   reply was read (`in_flight: false`)
/// - [`D3Error::Protocol`] if the length prefix is missing or not decimal
/// - [`D3Error::Io`] on transport failure
pub async fn exchange<S>(stream: &mut S, payload: &[u8], io_timeout: Duration) -> Result<Bytes>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let started = Instant::now();

    if payload.is_empty() {
        return Err(D3Error::Validation("nothing to send".to_string()));
    }

    let frame = build_frame(payload)?;
    bounded(io_timeout, async {
        stream.write_all(&frame).await?;
        stream.flush().await
    })
    .await?;
    tracing::debug!(bytes = frame.len(), "request frame written");

    let mut reply = ReplyBuffer::new();
    let mut chunk = vec![0u8; MAX_CHUNK_SIZE];

    while !reply.is_complete() {
        let size = reply.next_chunk_size();
        let n = bounded(io_timeout, stream.read(&mut chunk[..size])).await?;
        if n == 0 {
            break; // EOF
        }
        reply.push(&chunk[..n])?;
    }

    if !reply.has_length() {
        return Err(D3Error::Protocol(
            "connection closed before reply length was received".to_string(),
        ));
    }
    if !reply.is_complete() {
        tracing::warn!(
            declared = reply.declared_len().unwrap_or(0),
            received = reply.payload_len(),
            "reply stream ended early"
        );
    }

    let elapsed = started.elapsed();
    if elapsed > io_timeout {
        tracing::warn!(?elapsed, ?io_timeout, "reply received after I/O timeout");
        return Err(D3Error::Timeout {
            limit: io_timeout,
            in_flight: false,
        });
    }

    let payload = reply.into_payload()?;
    tracing::debug!(bytes = payload.len(), ?elapsed, "reply received");
    Ok(payload)
}

/// Read the dispatcher's line reply: at most [`LINE_REPLY_MAX`] bytes,
/// stopping after a newline.
///
/// Returns `None` when nothing could be read (EOF, error or timeout).
pub async fn read_line_reply<R>(reader: &mut R, limit: Duration) -> Option<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; LINE_REPLY_MAX];
    let mut len = 0;

    while len < LINE_REPLY_MAX {
        match bounded(limit, reader.read(&mut buf[len..])).await {
            Ok(0) => break,
            Ok(n) => {
                let newline = buf[len..len + n].iter().position(|&b| b == b'\n');
                if let Some(pos) = newline {
                    len += pos + 1;
                    break;
                }
                len += n;
            }
            Err(e) => {
                tracing::debug!("line reply read failed: {}", e);
                break;
            }
        }
    }

    if len == 0 {
        None
    } else {
        Some(buf[..len].to_vec())
    }
}
