//! Carriage-return tokenizer for the tool's stdout.
//!
//! youtube-dl redraws its progress line in place by writing `\r` instead of
//! `\n`, so a newline-based reader would only surface the progress once the
//! download is over. Tokens here are delimited by `\r` only; newlines stay
//! inside the token (the destination announcement relies on that).

use std::io;

use bytes::BytesMut;
use tokio_util::codec::Decoder;

const CARRIAGE_RETURN: u8 = b'\r';

/// Outcome of one tokenizer step over the buffered data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split<'a> {
    /// Emit `token` and drop `advance` bytes from the front of the buffer.
    Token { advance: usize, token: &'a [u8] },
    /// No delimiter yet and the source is still open.
    NeedMore,
    /// Source exhausted and nothing left to flush.
    End,
}

/// Decide what to emit from `data`, the bytes read so far.
///
/// `at_eof` tells whether the source is exhausted. A trailing partial token
/// (no final `\r`) is emitted once, consuming the whole buffer, so the next
/// call sees an empty buffer and reports [`Split::End`].
pub fn split_carriage_return(data: &[u8], at_eof: bool) -> Split<'_> {
    if at_eof && data.is_empty() {
        return Split::End;
    }

    if let Some(idx) = data.iter().position(|&b| b == CARRIAGE_RETURN) {
        return Split::Token {
            advance: idx + 1,
            token: &data[..idx],
        };
    }

    if at_eof {
        return Split::Token {
            advance: data.len(),
            token: data,
        };
    }

    Split::NeedMore
}

/// [`Decoder`] yielding `\r`-delimited tokens as (lossily decoded) text.
#[derive(Debug, Clone, Default)]
pub struct CarriageReturnCodec {
    /// Bytes before this offset are known to hold no `\r`.
    next_index: usize,
}

impl CarriageReturnCodec {
    pub fn new() -> Self {
        Self::default()
    }

    fn step(&mut self, src: &mut BytesMut, at_eof: bool) -> Option<String> {
        let start = self.next_index.min(src.len());
        let (advance, len) = match split_carriage_return(&src[start..], at_eof) {
            Split::Token { advance, token } => (start + advance, start + token.len()),
            Split::NeedMore => {
                self.next_index = src.len();
                return None;
            }
            Split::End if start > 0 => (src.len(), src.len()),
            Split::End => return None,
        };

        self.next_index = 0;
        let frame = src.split_to(advance);
        Some(String::from_utf8_lossy(&frame[..len]).into_owned())
    }
}

impl Decoder for CarriageReturnCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(self.step(src, false))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(self.step(src, true))
    }
}
