use std::str;

use crate::util::find_crlf;

use super::{FailureKind, TransportFailure};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dechunker {
    Size,
    Chunk(usize),
    CrLf,
    Ending,
    Trailer,
    Ended,
}

#[derive(Debug)]
struct Pos {
    index_in: usize,
}

fn bad_chunk(reason: &str) -> TransportFailure {
    TransportFailure::new(FailureKind::Receive, format!("bad chunk: {}", reason))
}

impl Dechunker {
    pub fn new() -> Self {
        Dechunker::Size
    }

    /// Decode as much of `src` as possible, appending the body to `dst`.
    ///
    /// Returns the amount of input used.
    pub fn parse_input(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Result<usize, TransportFailure> {
        let mut pos = Pos { index_in: 0 };

        loop {
            let more = match self {
                Dechunker::Size => self.read_size(src, &mut pos)?,
                Dechunker::Chunk(_) => self.read_data(src, dst, &mut pos),
                Dechunker::CrLf => self.expect_crlf(src, &mut pos)?,
                Dechunker::Ending => self.trailer_or_ended(src, &mut pos),
                Dechunker::Trailer => self.trailer(src, &mut pos),
                Dechunker::Ended => false,
            };

            if !more {
                break;
            }
        }

        Ok(pos.index_in)
    }

    pub fn is_ended(&self) -> bool {
        matches!(self, Self::Ended)
    }

    fn read_size(&mut self, src: &[u8], pos: &mut Pos) -> Result<bool, TransportFailure> {
        let src = &src[pos.index_in..];

        let i = match find_crlf(src) {
            Some(v) => v,
            None => return Ok(false),
        };

        const SANITY_CHECK: usize = 20;

        // Some sanity check for how long the chunk length is
        if i > SANITY_CHECK {
            return Err(bad_chunk("expected crlf"));
        }
        let maybe_meta = src[..i].iter().position(|c| *c == b';');

        let len_end = maybe_meta.unwrap_or(i);
        let len_str = str::from_utf8(&src[..len_end]).map_err(|_| bad_chunk("length not ascii"))?;

        let len = usize::from_str_radix(len_str.trim(), 16)
            .map_err(|_| bad_chunk("length not a number"))?;

        pos.index_in += i + 2;
        *self = if len == 0 {
            Self::Ending
        } else {
            Self::Chunk(len)
        };

        Ok(true)
    }

    fn read_data(&mut self, src: &[u8], dst: &mut Vec<u8>, pos: &mut Pos) -> bool {
        let src = &src[pos.index_in..];

        let left = match self {
            Self::Chunk(v) => v,
            _ => unreachable!(),
        };

        // Read the smallest amount of input or length left of chunk.
        let to_read = src.len().min(*left);

        dst.extend_from_slice(&src[..to_read]);
        pos.index_in += to_read;
        *left -= to_read;

        if *left == 0 {
            *self = Self::CrLf;
        }

        to_read > 0
    }

    fn expect_crlf(&mut self, src: &[u8], pos: &mut Pos) -> Result<bool, TransportFailure> {
        let src = &src[pos.index_in..];

        let i = match find_crlf(src) {
            Some(v) => v,
            None => return Ok(false),
        };

        if i > 0 {
            return Err(bad_chunk("expected crlf after chunk"));
        }

        pos.index_in += 2;
        *self = Self::Size;

        Ok(true)
    }

    fn trailer_or_ended(&mut self, src: &[u8], pos: &mut Pos) -> bool {
        let src = &src[pos.index_in..];

        let i = match find_crlf(src) {
            Some(v) => v,
            None => return false,
        };

        if i == 0 {
            pos.index_in += 2;
            *self = Self::Ended;
        } else {
            // Non-crlf before
            *self = Self::Trailer;
        }

        true
    }

    fn trailer(&mut self, src: &[u8], pos: &mut Pos) -> bool {
        let src = &src[pos.index_in..];

        let i = match find_crlf(src) {
            Some(v) => v,
            None => return false,
        };

        // advance the trailer, and 2 for the crlf.
        pos.index_in += i + 2;
        *self = Self::Ending;

        true
    }
}
