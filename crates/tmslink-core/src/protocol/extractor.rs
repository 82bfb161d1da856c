//! Response frame extraction
//!
//! Replies carry neither a length prefix nor a terminator. The length of a
//! frame is inferred from its first two bytes:
//!
//! 1. `?` as first byte: 1-byte "unrecognized command" frame
//! 2. `?` or `S` as second byte: 3-byte error frame, whatever the command
//! 3. otherwise the expected reply length of the echoed command code
//!
//! The order matters: looking up the table on an error frame would consume
//! the wrong number of bytes and desynchronize the stream.

use tracing::warn;

use super::commands::{
    expected_response_len, INVALID_DATA, SETTINGS_CONFLICT, UNRECOGNIZED_COMMAND,
};

/// Smallest frame whose second byte can be inspected: code, status, checksum
const MIN_FRAME_LEN: usize = 3;

/// Short frame returned for rejected data or conflicting settings
const ERROR_FRAME_LEN: usize = 3;

/// Outcome of scanning the front of a receive buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan {
    /// Not enough bytes for a complete frame yet
    Incomplete,
    /// The first `n` bytes form one complete frame
    Frame(usize),
    /// The leading byte is not a known reply code
    UnknownCode(u8),
}

/// Determine how many leading bytes of `buf` make up one complete frame
pub fn scan(buf: &[u8]) -> Scan {
    let Some(&first) = buf.first() else {
        return Scan::Incomplete;
    };
    if first == UNRECOGNIZED_COMMAND {
        return Scan::Frame(1);
    }
    if buf.len() < MIN_FRAME_LEN {
        return Scan::Incomplete;
    }
    if buf[1] == INVALID_DATA || buf[1] == SETTINGS_CONFLICT {
        return Scan::Frame(ERROR_FRAME_LEN);
    }
    match expected_response_len(first) {
        Some(len) if buf.len() >= len => Scan::Frame(len),
        Some(_) => Scan::Incomplete,
        None => Scan::UnknownCode(first),
    }
}

/// Split one complete frame off the front of `buf`.
///
/// Returns an empty frame and the untouched buffer when no complete frame
/// is available.
pub fn extract(buf: &[u8]) -> (&[u8], &[u8]) {
    match scan(buf) {
        Scan::Frame(len) => buf.split_at(len),
        Scan::Incomplete | Scan::UnknownCode(_) => (&[], buf),
    }
}

/// Accumulating receive buffer that yields complete frames in arrival order
#[derive(Debug, Default)]
pub struct FrameExtractor {
    buffer: Vec<u8>,
}

impl FrameExtractor {
    /// Create an empty extractor
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk read from the port.
    ///
    /// Leading NUL bytes are idle fill from the adapter and are dropped, but
    /// only from a chunk that starts between frames, not from every read.
    /// Inside a partial frame a NUL is data (a checksum can be `0x00`), so
    /// idle fill landing mid-frame yields a frame that fails checksum
    /// validation, and the stream resynchronizes on the following bytes.
    pub fn push(&mut self, chunk: &[u8]) {
        let start = if self.buffer.is_empty() {
            chunk.iter().position(|&b| b != 0).unwrap_or(chunk.len())
        } else {
            0
        };
        self.buffer.extend_from_slice(&chunk[start..]);
    }

    /// Remove and return the next complete frame, if any.
    ///
    /// A leading byte that is no known reply code is discarded so that the
    /// stream can resynchronize.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        loop {
            match scan(&self.buffer) {
                Scan::Frame(len) => return Some(self.buffer.drain(..len).collect()),
                Scan::Incomplete => return None,
                Scan::UnknownCode(code) => {
                    warn!("Discarding unexpected byte {:#04x} from receive buffer", code);
                    self.buffer.remove(0);
                }
            }
        }
    }

    /// Number of bytes waiting for a frame to complete
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drop all buffered bytes
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
