/*
 * parser.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Tagliacarte, a cross-platform email client.
 *
 * Tagliacarte is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Tagliacarte is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Tagliacarte.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Header block parser: byte-at-a-time state machine, push model.
//!
//! Bytes are taken as Latin-1 characters. A line starting with whitespace continues the
//! previous value (leading whitespace dropped, no space inserted). A line with no colon is
//! dropped, except as the last fragment before end of input. An empty line ends the block;
//! its LF is consumed and nothing after it is.

use std::io::{self, Read};

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

use crate::error::HeaderError;
use crate::header::Header;

const CR: u8 = 13;

/// Receives each header as soon as it is complete (name and value trimmed).
pub trait HeaderHandler {
    fn header(&mut self, name: &str, value: &str);
}

impl<H: HeaderHandler + ?Sized> HeaderHandler for &mut H {
    fn header(&mut self, name: &str, value: &str) {
        (**self).header(name, value)
    }
}

impl HeaderHandler for Vec<Header> {
    fn header(&mut self, name: &str, value: &str) {
        self.push(Header::new(name, value));
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    /// Start of a physical line.
    LineStart,
    /// Skipping leading whitespace of a continuation line.
    Continuation,
    Name,
    /// Colon seen; the next byte starts the value.
    AfterColon,
    Value,
    /// CR seen at end of a header line; expecting LF.
    LineFeed,
    /// CR of the empty line seen; expecting LF.
    Terminator,
    Done,
}

#[inline]
fn is_whitespace(b: u8) -> bool {
    char::from(b).is_whitespace()
}

/// Push parser for one header block. Feed via push()/receive(), then close().
pub struct HeaderParser<H> {
    handler: H,
    state: State,
    name: String,
    value: String,
    consumed: u64,
}

impl<H: HeaderHandler> HeaderParser<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            state: State::LineStart,
            name: String::with_capacity(32),
            value: String::with_capacity(128),
            consumed: 0,
        }
    }

    /// Feed one byte. Returns false, without consuming it, once the block has ended.
    pub fn push(&mut self, b: u8) -> bool {
        match self.state {
            State::Done => return false,
            State::LineStart => {
                if b == CR {
                    self.flush();
                    self.state = State::Terminator;
                } else if is_whitespace(b) {
                    self.state = State::Continuation;
                } else {
                    self.flush();
                    self.name.push(char::from(b));
                    self.state = State::Name;
                }
            }
            State::Continuation => {
                if !is_whitespace(b) {
                    self.value.push(char::from(b));
                    self.state = State::Value;
                }
            }
            State::Name => {
                if b == b':' {
                    self.state = State::AfterColon;
                } else if b == CR {
                    // Line ended without a colon: not a header.
                    trace!(fragment = self.name.as_str(), "dropped line without colon");
                    self.name.clear();
                    self.value.clear();
                    self.state = State::LineFeed;
                } else {
                    self.name.push(char::from(b));
                }
            }
            State::AfterColon | State::Value => {
                if b == CR {
                    self.state = State::LineFeed;
                } else {
                    self.value.push(char::from(b));
                    self.state = State::Value;
                }
            }
            // Whatever follows CR is taken as its LF.
            State::LineFeed => self.state = State::LineStart,
            State::Terminator => self.state = State::Done,
        }
        self.consumed += 1;
        true
    }

    /// Feed a buffer. Returns the number of bytes consumed; less than buf.len() only when
    /// the block ended inside buf (the remainder is body).
    pub fn receive(&mut self, buf: &[u8]) -> usize {
        let mut n = 0;
        for &b in buf {
            if !self.push(b) {
                break;
            }
            n += 1;
        }
        n
    }

    /// End of input: deliver any pending header. Further bytes are refused.
    pub fn close(&mut self) {
        self.flush();
        self.state = State::Done;
    }

    /// True once the empty line (or close) has ended the block.
    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Total bytes consumed so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn into_inner(self) -> H {
        self.handler
    }

    /// Read from a blocking stream one byte at a time until the block ends or the stream does.
    /// Headers already delivered stay delivered if the read fails; the pending one is lost.
    pub fn read_from<R: Read>(&mut self, mut reader: R) -> Result<(), HeaderError> {
        let mut byte = [0u8; 1];
        while !self.is_done() {
            match reader.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    self.push(byte[0]);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(HeaderError::load(e)),
            }
        }
        self.close();
        Ok(())
    }

    /// As read_from, over an async stream.
    pub async fn read_from_async<R: AsyncRead + Unpin>(&mut self, mut reader: R) -> Result<(), HeaderError> {
        let mut byte = [0u8; 1];
        while !self.is_done() {
            match reader.read(&mut byte).await {
                Ok(0) => break,
                Ok(_) => {
                    self.push(byte[0]);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(HeaderError::load(e)),
            }
        }
        self.close();
        Ok(())
    }

    fn flush(&mut self) {
        if !self.name.is_empty() {
            let name = self.name.trim();
            let value = self.value.trim();
            trace!(header.name = name, header.value = value, "parsed header");
            self.handler.header(name, value);
        }
        self.name.clear();
        self.value.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &[u8]) -> (Vec<Header>, usize) {
        let mut parser = HeaderParser::new(Vec::<Header>::new());
        let n = parser.receive(input);
        parser.close();
        (parser.into_inner(), n)
    }

    fn pairs(headers: &[Header]) -> Vec<(&str, &str)> {
        headers.iter().map(|h| (h.name(), h.value())).collect()
    }

    #[test]
    fn simple_block() {
        let (h, n) = parse(b"From: alice@example.com\r\nTo: bob@example.com\r\n\r\n");
        assert_eq!(pairs(&h), vec![("From", "alice@example.com"), ("To", "bob@example.com")]);
        assert_eq!(n, 48);
    }

    #[test]
    fn continuation_is_folded_without_space() {
        let (h, _) = parse(b"Subject: Hello\r\n World\r\n\r\n");
        assert_eq!(pairs(&h), vec![("Subject", "HelloWorld")]);
    }

    #[test]
    fn tab_continuation_and_multiple_lines() {
        let (h, _) = parse(b"Received: from a\r\n\tby b\r\n   with c\r\nX: y\r\n\r\n");
        assert_eq!(pairs(&h), vec![("Received", "from aby bwith c"), ("X", "y")]);
    }

    #[test]
    fn stops_after_blank_line() {
        let input = b"A: 1\r\n\r\nBody: not a header\r\n";
        let (h, n) = parse(input);
        assert_eq!(pairs(&h), vec![("A", "1")]);
        assert_eq!(&input[n..], b"Body: not a header\r\n");
    }

    #[test]
    fn refuses_bytes_after_end() {
        let mut parser = HeaderParser::new(Vec::<Header>::new());
        assert_eq!(parser.receive(b"A: 1\r\n\r\n"), 8);
        assert!(parser.is_done());
        assert!(!parser.push(b'B'));
        assert_eq!(parser.consumed(), 8);
    }

    #[test]
    fn unterminated_block_is_flushed_on_close() {
        let (h, _) = parse(b"A: 1\r\nB: 2");
        assert_eq!(pairs(&h), vec![("A", "1"), ("B", "2")]);
    }

    #[test]
    fn name_without_colon_at_eof() {
        let (h, _) = parse(b"A: 1\r\nTrailing");
        assert_eq!(pairs(&h), vec![("A", "1"), ("Trailing", "")]);
    }

    #[test]
    fn line_without_colon_is_dropped() {
        let (h, _) = parse(b"Bogus\r\nX: y\r\n\r\nBody");
        assert_eq!(pairs(&h), vec![("X", "y")]);
    }

    #[test]
    fn line_without_colon_does_not_swallow_blank_line() {
        let input = b"A: 1\r\nBogus\r\n\r\nBody: x\r\n";
        let (h, n) = parse(input);
        assert_eq!(pairs(&h), vec![("A", "1")]);
        assert_eq!(&input[n..], b"Body: x\r\n");
    }

    #[test]
    fn blank_line_at_start_ends_block() {
        let (h, n) = parse(b"\r\nA: 1");
        assert!(h.is_empty());
        assert_eq!(n, 2);
    }

    #[test]
    fn leading_continuation_with_nothing_pending() {
        let (h, _) = parse(b" stray\r\nA: 1\r\n\r\n");
        assert_eq!(pairs(&h), vec![("A", "1")]);
    }

    #[test]
    fn whitespace_only_continuation_at_eof() {
        let input = b"A: 1\r\n   ";
        let (h, n) = parse(input);
        assert_eq!(pairs(&h), vec![("A", "1")]);
        assert_eq!(n, input.len());
    }

    #[test]
    fn nbsp_starts_continuation() {
        let (h, _) = parse(b"A: 1\r\n\xa0B: 2\r\n\r\n");
        assert_eq!(pairs(&h), vec![("A", "1B: 2")]);
    }

    #[test]
    fn no_space_after_colon() {
        let (h, _) = parse(b"X-Flag:on\r\nEmpty:\r\n\r\n");
        assert_eq!(pairs(&h), vec![("X-Flag", "on"), ("Empty", "")]);
    }

    #[test]
    fn value_keeps_later_colons() {
        let (h, _) = parse(b"Date: Fri, 21 Nov 1997 09:55:06 -0600\r\n\r\n");
        assert_eq!(pairs(&h), vec![("Date", "Fri, 21 Nov 1997 09:55:06 -0600")]);
    }

    #[test]
    fn latin1_bytes_map_to_chars() {
        let (h, _) = parse(b"X-Name: Jos\xe9\r\n\r\n");
        assert_eq!(h[0].value(), "Jos\u{e9}");
    }

    #[test]
    fn split_across_receive_calls() {
        let mut parser = HeaderParser::new(Vec::<Header>::new());
        assert_eq!(parser.receive(b"Subj"), 4);
        assert_eq!(parser.receive(b"ect: Hel"), 8);
        assert_eq!(parser.receive(b"lo\r\n"), 4);
        assert!(parser.handler().is_empty());
        assert_eq!(parser.receive(b"\r\nrest"), 2);
        assert_eq!(pairs(parser.handler()), vec![("Subject", "Hello")]);
    }

    #[test]
    fn read_from_stream() {
        let mut parser = HeaderParser::new(Vec::<Header>::new());
        let mut input: &[u8] = b"A: 1\r\n\r\nbody";
        parser.read_from(&mut input).unwrap();
        assert_eq!(pairs(parser.handler()), vec![("A", "1")]);
        assert_eq!(input, b"body");
    }

    struct FailAfter {
        data: &'static [u8],
        pos: usize,
    }

    impl Read for FailAfter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.pos >= self.data.len() {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
            }
            buf[0] = self.data[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    #[test]
    fn read_failure_keeps_completed_headers() {
        let mut parser = HeaderParser::new(Vec::<Header>::new());
        let err = parser
            .read_from(FailAfter { data: b"A: 1\r\nB: 2\r\nC: part", pos: 0 })
            .unwrap_err();
        assert_eq!(err.io_kind(), io::ErrorKind::ConnectionReset);
        assert_eq!(pairs(parser.handler()), vec![("A", "1"), ("B", "2")]);
    }

    #[tokio::test]
    async fn read_from_async_stream() {
        let mut parser = HeaderParser::new(Vec::<Header>::new());
        let input: &[u8] = b"To: a@x\r\n b@x\r\n\r\n";
        parser.read_from_async(input).await.unwrap();
        assert_eq!(pairs(parser.handler()), vec![("To", "a@xb@x")]);
    }
}
