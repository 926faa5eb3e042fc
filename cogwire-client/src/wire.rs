//! # Wire Framing
//!
//! Purpose: Send command text and reassemble newline-terminated replies from
//! a stream that may split messages across reads, interleave keepalive
//! probes, and open with an unterminated greeting.
//!
//! ## Design Principles
//! 1. **Chunked Reads**: Fixed-size reads; message boundaries come from the
//!    protocol, never from how the bytes happened to arrive.
//! 2. **Reader-Generic Core**: The receive loop only needs `Read`, so the
//!    boundary rules are testable with scripted chunk sequences.
//! 3. **Buffer Reuse**: The session owns one scratch buffer; multi-chunk
//!    replies accumulate there without per-call allocations.
//! 4. **Closed Is Its Own Kind**: A zero-length read is reported distinctly
//!    so callers can tell an orderly peer close from corruption.

use std::io::{Read, Write};
use std::net::TcpStream;

use bytes::BytesMut;
use tracing::trace;

use crate::client::{ClientError, ClientResult};

/// Bytes requested per read call.
pub(crate) const RECV_CHUNK: usize = 4096;

/// Synchronous-idle control byte. A congested server sends it alone as a
/// keepalive probe; it is never part of a reply.
pub(crate) const IDLE_BYTE: u8 = 0x16;

/// An established connection plus its reusable receive scratch buffer.
#[derive(Debug)]
pub(crate) struct Wire {
    stream: TcpStream,
    scratch: BytesMut,
}

impl Wire {
    pub(crate) fn new(stream: TcpStream) -> Wire {
        Wire {
            stream,
            scratch: BytesMut::with_capacity(RECV_CHUNK),
        }
    }

    /// Writes the full byte sequence of `text` to the socket.
    pub(crate) fn send_text(&mut self, text: &str) -> ClientResult<()> {
        self.stream.write_all(text.as_bytes())?;
        Ok(())
    }

    /// Reads one complete frame; see [`read_frame`] for the boundary rules.
    pub(crate) fn read_frame(&mut self, expect_greeting: bool) -> ClientResult<String> {
        read_frame(&mut self.stream, &mut self.scratch, expect_greeting)
    }
}

/// Reads one protocol frame from `reader`, one chunk per `read` call.
///
/// Rules, in order, per chunk:
/// - a read error is a [`ClientError::Transport`] failure;
/// - zero bytes read means [`ClientError::PeerClosed`];
/// - a solitary [`IDLE_BYTE`] is a keepalive probe and is dropped;
/// - the first data chunk is returned as the whole frame when it is shorter
///   than [`RECV_CHUNK`] and either ends in a newline or `expect_greeting`
///   is set; the greeting after connecting is the one reply that never
///   carries a terminator;
/// - otherwise chunks accumulate in `scratch` until one ends in a newline.
///
/// The returned text keeps its trailing newline, so callers see the frame
/// exactly as the server sent it.
pub(crate) fn read_frame<R: Read>(
    reader: &mut R,
    scratch: &mut BytesMut,
    expect_greeting: bool,
) -> ClientResult<String> {
    scratch.clear();
    let mut chunk = [0u8; RECV_CHUNK];
    let mut first = true;
    loop {
        let len = reader.read(&mut chunk)?;
        if len == 0 {
            return Err(ClientError::PeerClosed);
        }
        if len == 1 && chunk[0] == IDLE_BYTE {
            trace!("discarding idle keepalive byte");
            continue;
        }

        let terminated = chunk[len - 1] == b'\n';
        if first && len < RECV_CHUNK && (terminated || expect_greeting) {
            return Ok(String::from_utf8_lossy(&chunk[..len]).into_owned());
        }
        first = false;

        scratch.extend_from_slice(&chunk[..len]);
        if terminated {
            return Ok(String::from_utf8_lossy(scratch).into_owned());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    /// Hands out one scripted chunk per read call, then reports end of
    /// stream, matching the shape the receive loop sees from a socket.
    struct ChunkReader {
        chunks: Vec<Vec<u8>>,
        next: usize,
    }

    impl ChunkReader {
        fn new(chunks: &[&[u8]]) -> ChunkReader {
            ChunkReader {
                chunks: chunks.iter().map(|chunk| chunk.to_vec()).collect(),
                next: 0,
            }
        }
    }

    impl Read for ChunkReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.next >= self.chunks.len() {
                return Ok(0);
            }
            let chunk = &self.chunks[self.next];
            self.next += 1;
            buf[..chunk.len()].copy_from_slice(chunk);
            Ok(chunk.len())
        }
    }

    /// Always fails, for the transport-error path.
    struct BrokenReader;

    impl Read for BrokenReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
        }
    }

    fn frame(chunks: &[&[u8]], expect_greeting: bool) -> ClientResult<String> {
        let mut reader = ChunkReader::new(chunks);
        let mut scratch = BytesMut::new();
        read_frame(&mut reader, &mut scratch, expect_greeting)
    }

    #[test]
    fn short_terminated_chunk_is_a_frame() {
        assert_eq!(frame(&[b"pong\n"], false).unwrap(), "pong\n");
    }

    #[test]
    fn greeting_returns_without_terminator() {
        assert_eq!(frame(&[b"opencog> "], true).unwrap(), "opencog> ");
    }

    #[test]
    fn leading_idle_byte_is_discarded() {
        assert_eq!(frame(&[&[IDLE_BYTE], b"pong\n"], false).unwrap(), "pong\n");
    }

    #[test]
    fn idle_byte_before_greeting_is_discarded() {
        assert_eq!(frame(&[&[IDLE_BYTE], b"cog> "], true).unwrap(), "cog> ");
    }

    #[test]
    fn idle_byte_between_chunks_is_discarded() {
        let head = vec![b'x'; RECV_CHUNK];
        let got = frame(&[head.as_slice(), &[IDLE_BYTE], b"tail\n"], false).unwrap();
        assert_eq!(got.len(), RECV_CHUNK + 5);
        assert!(got.ends_with("tail\n"));
    }

    #[test]
    fn long_reply_accumulates_across_chunks() {
        let head = vec![b'a'; RECV_CHUNK];
        let got = frame(&[head.as_slice(), b"end\n"], false).unwrap();
        assert_eq!(got.len(), RECV_CHUNK + 4);
        assert!(got.starts_with("aaa"));
        assert!(got.ends_with("end\n"));
    }

    #[test]
    fn full_first_chunk_with_newline_completes() {
        let mut whole = vec![b'b'; RECV_CHUNK - 1];
        whole.push(b'\n');
        let got = frame(&[whole.as_slice()], false).unwrap();
        assert_eq!(got.len(), RECV_CHUNK);
        assert!(got.ends_with('\n'));
    }

    #[test]
    fn greeting_flag_only_covers_the_first_chunk() {
        // A full first chunk pushes even a greeting read into accumulation;
        // after that the frame needs a terminator like any other.
        let head = vec![b'p'; RECV_CHUNK];
        let got = frame(&[head.as_slice(), b"> \n"], true).unwrap();
        assert_eq!(got.len(), RECV_CHUNK + 3);
        assert!(got.ends_with("> \n"));
    }

    #[test]
    fn zero_read_is_peer_closed() {
        assert!(matches!(frame(&[], false), Err(ClientError::PeerClosed)));
    }

    #[test]
    fn read_error_is_transport() {
        let mut scratch = BytesMut::new();
        let got = read_frame(&mut BrokenReader, &mut scratch, false);
        assert!(matches!(got, Err(ClientError::Transport(_))));
    }

    #[test]
    fn scratch_is_cleared_between_frames() {
        let head = vec![b'x'; RECV_CHUNK];
        let mut scratch = BytesMut::new();

        let mut reader = ChunkReader::new(&[head.as_slice(), b"one\n"]);
        read_frame(&mut reader, &mut scratch, false).unwrap();

        let mut reader = ChunkReader::new(&[head.as_slice(), b"two\n"]);
        let got = read_frame(&mut reader, &mut scratch, false).unwrap();
        assert_eq!(got.len(), RECV_CHUNK + 4);
        assert!(got.ends_with("two\n"));
    }
}
