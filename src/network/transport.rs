//! Framed transport
//!
//! One exchange on the fail2ban socket is a pickled request followed by the
//! terminator, answered by a pickled response followed by the same
//! terminator. Responses carry no length, so the reader accumulates fixed
//! size chunks until the terminator shows up.

use std::io::{ErrorKind, Read, Write};

use bytes::{Bytes, BytesMut};

use crate::error::{JailwatchError, Result};
use crate::protocol::{decode, write_command, WireValue};

/// End-of-message marker agreed with the fail2ban server
pub const TERMINATOR: &[u8] = b"<F2B_END_COMMAND>";

/// Size of each socket read
pub const READ_CHUNK_SIZE: usize = 1024;

/// Give up on responses that grow past this without a terminator (16 MB)
pub const MAX_RESPONSE_SIZE: usize = 16 * 1024 * 1024;

/// Send one command and decode its response.
///
/// The caller must hold exclusive access to `stream` for the whole exchange.
pub fn send_command<S, T>(stream: &mut S, tokens: &[T]) -> Result<WireValue>
where
    S: Read + Write,
    T: AsRef<str>,
{
    write_request(stream, tokens)?;
    let body = read_response(stream)?;
    tracing::trace!("Decoding {} byte response", body.len());
    decode(&body)
}

/// Write an encoded command followed by the terminator
pub fn write_request<W: Write, T: AsRef<str>>(writer: &mut W, tokens: &[T]) -> Result<()> {
    write_command(writer, tokens)?;
    writer.write_all(TERMINATOR)?;
    writer.flush()?;
    Ok(())
}

/// Read until the terminator appears and return the bytes before it.
///
/// Bytes after the terminator in the final chunk are discarded.
pub fn read_response<R: Read>(reader: &mut R) -> Result<Bytes> {
    let mut buffer = BytesMut::with_capacity(READ_CHUNK_SIZE);
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    let mut reads = 0usize;

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => {
                tracing::warn!(
                    "Socket closed after {} bytes without terminator",
                    buffer.len()
                );
                return Err(JailwatchError::ConnectionClosed {
                    received: buffer.len(),
                });
            }
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        reads += 1;

        // The terminator may straddle the previous chunk boundary
        let search_from = buffer.len().saturating_sub(TERMINATOR.len() - 1);
        buffer.extend_from_slice(&chunk[..n]);

        if let Some(pos) = find_terminator(&buffer[search_from..]) {
            let end = search_from + pos;
            tracing::trace!(
                "Terminator found after {} reads, {} payload bytes",
                reads,
                end
            );
            buffer.truncate(end);
            return Ok(buffer.freeze());
        }

        if buffer.len() > MAX_RESPONSE_SIZE {
            return Err(JailwatchError::ResponseTooLarge { size: buffer.len() });
        }
    }
}

fn find_terminator(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(TERMINATOR.len())
        .position(|window| window == TERMINATOR)
}
