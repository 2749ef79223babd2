/*
 * store.rs
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

//! Ordered multi-valued header store.
//!
//! Names are case-folded for lookup; each name maps to its headers in the order they were
//! added. Names iterate in order of first appearance, so a store created with
//! [`HeaderStore::new`] writes the RFC 822 fields in conventional order whatever order
//! they are set in.

use std::collections::HashSet;
use std::fmt::Display;
use std::io::{self, Read, Write};
use std::iter::FusedIterator;
use std::slice;

use bytes::{BufMut, Bytes, BytesMut};
use indexmap::IndexMap;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::config::HeaderConfig;
use crate::error::HeaderError;
use crate::header::{header_key, Header};
use crate::lines::HeaderLineSession;
use crate::parser::{HeaderHandler, HeaderParser};

/// Fields pre-registered by [`HeaderStore::new`], in RFC 822 order
/// (dates, trace, originator, resent, destination, optional).
pub const CANONICAL_ORDER: [&str; 24] = [
    "Date",
    "Resent-Date",
    "Return-path",
    "Received",
    "Sender",
    "From",
    "Reply-To",
    "Resent-Sender",
    "Resent-From",
    "Resent-Reply-To",
    "To",
    "Resent-To",
    "cc",
    "Resent-cc",
    "bcc",
    "Resent-bcc",
    "Message-ID",
    "Resent-Message-ID",
    "In-Reply-To",
    "References",
    "Keywords",
    "Subject",
    "Comments",
    "Encrypted",
];

/// RFC 822 headers of one message. Not synchronized; wrap in a lock to share.
#[derive(Debug, Clone)]
pub struct HeaderStore {
    headers: IndexMap<String, Vec<Header>>,
    config: HeaderConfig,
}

impl Default for HeaderStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderStore {
    /// Empty store with the canonical field slots registered.
    pub fn new() -> Self {
        Self::with_config(HeaderConfig::default())
    }

    pub fn with_config(config: HeaderConfig) -> Self {
        let mut headers = IndexMap::new();
        if config.canonical_order {
            for name in CANONICAL_ORDER {
                headers.insert(header_key(name), Vec::new());
            }
        }
        Self { headers, config }
    }

    /// Read a header block from a stream. Fields are kept in the order they appear.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, HeaderError> {
        Self::from_reader_with_config(reader, HeaderConfig::unordered())
    }

    pub fn from_reader_with_config<R: Read>(reader: R, config: HeaderConfig) -> Result<Self, HeaderError> {
        let mut store = Self::with_config(config);
        store.load(reader)?;
        Ok(store)
    }

    pub async fn from_reader_async<R: AsyncRead + Unpin>(reader: R) -> Result<Self, HeaderError> {
        let mut store = Self::with_config(HeaderConfig::unordered());
        store.load_async(reader).await?;
        Ok(store)
    }

    /// Parse the header block at the start of a raw message. Returns the store and the
    /// offset of the first body byte (input length if there is no blank line).
    pub fn parse(raw: &[u8]) -> (Self, usize) {
        Self::parse_with_config(raw, HeaderConfig::unordered())
    }

    pub fn parse_with_config(raw: &[u8], config: HeaderConfig) -> (Self, usize) {
        let mut store = Self::with_config(config);
        let mut parser = HeaderParser::new(&mut store);
        let consumed = parser.receive(raw);
        parser.close();
        (store, consumed)
    }

    /// Read headers from the stream and add them to this store. Stops after the blank line
    /// that ends the block; the stream is left positioned at the body.
    pub fn load<R: Read>(&mut self, reader: R) -> Result<(), HeaderError> {
        let before = self.len();
        let mut parser = HeaderParser::new(&mut *self);
        let result = parser.read_from(reader);
        let consumed = parser.consumed();
        debug!(consumed, added = self.len() - before, ok = result.is_ok(), "loaded headers");
        result
    }

    pub async fn load_async<R: AsyncRead + Unpin>(&mut self, reader: R) -> Result<(), HeaderError> {
        let before = self.len();
        let mut parser = HeaderParser::new(&mut *self);
        let result = parser.read_from_async(reader).await;
        let consumed = parser.consumed();
        debug!(consumed, added = self.len() - before, ok = result.is_ok(), "loaded headers");
        result
    }

    /// All values for the name, oldest first. None if the name was never registered;
    /// an empty vec if it was and currently has no values.
    pub fn get_header(&self, name: &str) -> Option<Vec<&str>> {
        self.headers
            .get(&header_key(name))
            .map(|list| list.iter().map(Header::value).collect())
    }

    /// Values for the name joined with the delimiter. With no delimiter only the first
    /// value is returned. Empty string if the name has no values; None if never registered.
    pub fn get_header_joined(&self, name: &str, delimiter: Option<&str>) -> Option<String> {
        let list = self.headers.get(&header_key(name))?;
        let joined = match (list.as_slice(), delimiter) {
            ([], _) => String::new(),
            ([first, ..], None) | ([first], _) => first.value().to_string(),
            (list, Some(delimiter)) => list
                .iter()
                .map(Header::value)
                .collect::<Vec<_>>()
                .join(delimiter),
        };
        Some(joined)
    }

    /// True if the name has been registered, even if it currently has no values.
    pub fn contains(&self, name: &str) -> bool {
        self.headers.contains_key(&header_key(name))
    }

    /// Replace every value for the name with this one.
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.insert(header_key(name), vec![Header::new(name, value)]);
    }

    /// Append a value for the name.
    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers
            .entry(header_key(name))
            .or_default()
            .push(Header::new(name, value));
    }

    /// Replace every value for the name with one header per address, each in its
    /// display form (e.g. `Alice <alice@example.com>`).
    pub fn set_address_header<A: Display>(&mut self, name: &str, addresses: &[A]) {
        let list = addresses
            .iter()
            .map(|address| Header::new(name, address.to_string()))
            .collect();
        self.headers.insert(header_key(name), list);
    }

    /// Drop every value for the name. The name stays registered (get_header returns an
    /// empty vec). Unknown names are ignored.
    pub fn remove_header(&mut self, name: &str) {
        if let Some(list) = self.headers.get_mut(&header_key(name)) {
            list.clear();
        }
    }

    /// Number of header fields (not distinct names).
    pub fn len(&self) -> usize {
        self.headers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.values().all(Vec::is_empty)
    }

    /// Every header, in name order then insertion order. One pass; call again to restart.
    pub fn all_headers(&self) -> Headers<'_> {
        Headers::new(self, NameFilter::All)
    }

    /// Headers whose name is in the set (case-insensitive).
    pub fn matching_headers<I, S>(&self, names: I) -> Headers<'_>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Headers::new(self, NameFilter::Include(key_set(names)))
    }

    /// Headers whose name is not in the set (case-insensitive).
    pub fn non_matching_headers<I, S>(&self, names: I) -> Headers<'_>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Headers::new(self, NameFilter::Exclude(key_set(names)))
    }

    pub fn all_header_lines(&self) -> HeaderLines<'_> {
        HeaderLines(self.all_headers())
    }

    pub fn matching_header_lines<I, S>(&self, names: I) -> HeaderLines<'_>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        HeaderLines(self.matching_headers(names))
    }

    pub fn non_matching_header_lines<I, S>(&self, names: I) -> HeaderLines<'_>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        HeaderLines(self.non_matching_headers(names))
    }

    /// Start adding raw header lines. Continuation state lives in the session only.
    pub fn line_session(&mut self) -> HeaderLineSession<'_> {
        HeaderLineSession::new(self, None)
    }

    /// Resume a line session whose last header name was saved with
    /// [`HeaderLineSession::finish`].
    pub fn resume_line_session(&mut self, last_header_name: Option<String>) -> HeaderLineSession<'_> {
        HeaderLineSession::new(self, last_header_name)
    }

    /// Add raw header lines in one session (continuations fold into the preceding line).
    pub fn add_header_lines<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut session = self.line_session();
        for line in lines {
            session.add_header_line(line.as_ref());
        }
    }

    /// Append continuation text to the last value of the name, re-adding it under that name.
    /// Returns false if the name has no values.
    pub(crate) fn fold_continuation(&mut self, name: &str, text: &str) -> bool {
        let Some(list) = self.headers.get_mut(&header_key(name)) else {
            return false;
        };
        let Some(last) = list.pop() else {
            return false;
        };
        let folded = format!("{}{}", last.value(), text);
        list.push(Header::new(name, folded.trim()));
        true
    }

    /// Serialized header block: `Name:Value` CRLF per header, skipping ignored names.
    /// No blank line is appended.
    pub fn to_bytes(&self, ignore: &[&str]) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.len() * 64);
        for header in self.non_matching_headers(ignore) {
            put_latin1(&mut buf, header.name());
            buf.put_u8(b':');
            if self.config.space_after_colon {
                buf.put_u8(b' ');
            }
            put_latin1(&mut buf, header.value());
            buf.put_slice(b"\r\n");
        }
        buf.freeze()
    }

    pub fn write_to<W: Write>(&self, mut out: W, ignore: &[&str]) -> io::Result<()> {
        out.write_all(&self.to_bytes(ignore))
    }

    pub async fn write_to_async<W: AsyncWrite + Unpin>(&self, mut out: W, ignore: &[&str]) -> io::Result<()> {
        out.write_all(&self.to_bytes(ignore)).await
    }
}

impl HeaderHandler for HeaderStore {
    fn header(&mut self, name: &str, value: &str) {
        self.add_header(name, value);
    }
}

/// Characters up to U+00FF go out as single bytes, mirroring how they were read;
/// anything wider is written as UTF-8.
fn put_latin1(buf: &mut BytesMut, s: &str) {
    for c in s.chars() {
        match u8::try_from(u32::from(c)) {
            Ok(b) => buf.put_u8(b),
            Err(_) => {
                let mut tmp = [0u8; 4];
                buf.put_slice(c.encode_utf8(&mut tmp).as_bytes());
            }
        }
    }
}

fn key_set<I, S>(names: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names.into_iter().map(|n| header_key(n.as_ref())).collect()
}

enum NameFilter {
    All,
    Include(HashSet<String>),
    Exclude(HashSet<String>),
}

impl NameFilter {
    fn accepts(&self, key: &str) -> bool {
        match self {
            NameFilter::All => true,
            NameFilter::Include(keys) => keys.contains(key),
            NameFilter::Exclude(keys) => !keys.contains(key),
        }
    }
}

/// One-pass iterator over the headers of a store. Borrows the store; not restartable.
pub struct Headers<'a> {
    entries: indexmap::map::Iter<'a, String, Vec<Header>>,
    current: slice::Iter<'a, Header>,
    filter: NameFilter,
}

impl<'a> Headers<'a> {
    fn new(store: &'a HeaderStore, filter: NameFilter) -> Self {
        Self {
            entries: store.headers.iter(),
            current: (&[] as &[Header]).iter(),
            filter,
        }
    }
}

impl<'a> Iterator for Headers<'a> {
    type Item = &'a Header;

    fn next(&mut self) -> Option<&'a Header> {
        loop {
            if let Some(header) = self.current.next() {
                return Some(header);
            }
            let (key, list) = self.entries.next()?;
            if self.filter.accepts(key) {
                self.current = list.iter();
            }
        }
    }
}

impl FusedIterator for Headers<'_> {}

/// Headers rendered as `Name: Value` lines.
pub struct HeaderLines<'a>(Headers<'a>);

impl Iterator for HeaderLines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.0.next().map(Header::to_string)
    }
}

impl FusedIterator for HeaderLines<'_> {}
