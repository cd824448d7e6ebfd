//! Line codec - frames a TCP byte stream into protocol lines.
//!
//! Splits on `\n` (a trailing `\r` is dropped). A line is never an error:
//! bytes that are not UTF-8 and lines over [`MAX_LINE_LENGTH`] come out as
//! their own frames so the connection can answer them and keep reading.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

/// Maximum line length (excluding the terminator).
pub const MAX_LINE_LENGTH: usize = 4096;

/// One framed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete UTF-8 line
    Line(String),
    /// A complete line that is not UTF-8, lossily decoded
    Malformed(String),
    /// The first [`MAX_LINE_LENGTH`] bytes of an over-long line; the rest,
    /// up to the next newline, is discarded
    TooLong(String),
}

/// A tokio codec that frames herd lines on `\n` boundaries.
#[derive(Debug)]
pub struct LineCodec {
    max_length: usize,
    /// Where the newline search resumes
    next_index: usize,
    /// Dropping the tail of an over-long line
    discarding: bool,
}

impl LineCodec {
    /// Codec with the default [`MAX_LINE_LENGTH`].
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_LENGTH)
    }

    /// Codec that cuts lines after `max_length` bytes.
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
            discarding: false,
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = Frame;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let start = self.next_index.min(src.len());
            let newline = src[start..]
                .iter()
                .position(|b| *b == b'\n')
                .map(|i| start + i);

            if self.discarding {
                self.next_index = 0;
                match newline {
                    Some(pos) => {
                        src.advance(pos + 1);
                        self.discarding = false;
                        continue;
                    }
                    None => {
                        src.clear();
                        return Ok(None);
                    }
                }
            }

            return match newline {
                Some(pos) if pos <= self.max_length => {
                    let line = src.split_to(pos + 1);
                    self.next_index = 0;
                    Ok(Some(frame(&line[..pos])))
                }
                Some(_) | None if src.len() > self.max_length => {
                    let head = src.split_to(self.max_length);
                    self.next_index = 0;
                    self.discarding = true;
                    Ok(Some(Frame::TooLong(
                        String::from_utf8_lossy(&head).into_owned(),
                    )))
                }
                _ => {
                    self.next_index = src.len();
                    Ok(None)
                }
            };
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        self.next_index = 0;
        if src.is_empty() || self.discarding {
            src.clear();
            return Ok(None);
        }
        // Unterminated last line
        let rest = src.split_to(src.len());
        Ok(Some(frame(&rest)))
    }
}

fn frame(bytes: &[u8]) -> Frame {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => Frame::Line(text.to_string()),
        Err(_) => Frame::Malformed(String::from_utf8_lossy(bytes).into_owned()),
    }
}
