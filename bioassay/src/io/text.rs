//! Line and field splitting shared by every reader
use super::*;
use memchr::{memchr_iter, Memchr};
use std::borrow::Cow;

/// Generalized wrapper around [`Memchr`] iterator for splitting `&[u8]` slices
/// by a byte.
///
/// `n` occurrences of the needle always yield `n + 1` slices, so empty
/// trailing fields are kept.
pub(crate) struct Pitchfork<'a> {
    pos: usize,
    haystack: &'a [u8],
    inner: Memchr<'a>,
    done: bool,
}

impl<'a> Pitchfork<'a> {
    pub fn new(needle: u8, haystack: &'a [u8]) -> Self {
        Self {
            pos: 0,
            haystack,
            inner: memchr_iter(needle, haystack),
            done: false,
        }
    }
}

impl<'a> Iterator for Pitchfork<'a> {
    type Item = &'a [u8];

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let end = match self.inner.next() {
            Some(e) => e,
            None => {
                self.done = true;
                self.haystack.len()
            }
        };
        let slice = &self.haystack[self.pos..end];
        self.pos = end + 1;
        Some(slice)
    }
}

/// Split `line` on `separator` into owned-or-borrowed strings
pub(crate) fn split(separator: u8, line: &str) -> Vec<Cow<'_, str>> {
    Pitchfork::new(separator, line.as_bytes())
        .map(String::from_utf8_lossy)
        .collect()
}

/// Strip one layer of surrounding double quotes
pub(crate) fn unquote(s: &str) -> &str {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Reads a stream line by line, decoding invalid UTF-8 lossily and
/// stripping `\n` / `\r\n` terminators.
///
/// Scanner software routinely writes Latin-1 (`µm`, `°C`) into otherwise
/// ASCII headers, so decoding never fails.
pub struct LineReader<R> {
    inner: R,
    buf: Vec<u8>,
    line_number: usize,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R) -> Self {
        LineReader {
            inner,
            buf: Vec::with_capacity(256),
            line_number: 0,
        }
    }

    /// Next line, or `None` at end of stream
    pub fn next_line(&mut self) -> Result<Option<String>> {
        self.buf.clear();
        if self.inner.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        self.line_number += 1;
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }
        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }

    /// Number of lines consumed so far
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}
