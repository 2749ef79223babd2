/*
 * lines.rs
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

//! Adding raw header lines one at a time (e.g. from an IMAP fetch or a line reader).

use tracing::warn;

use crate::store::HeaderStore;

/// Line-by-line ingestion into a store. Remembers the last header name so a following
/// continuation line can be folded into it; that state ends with the session.
pub struct HeaderLineSession<'a> {
    store: &'a mut HeaderStore,
    last_header_name: Option<String>,
}

impl<'a> HeaderLineSession<'a> {
    pub(crate) fn new(store: &'a mut HeaderStore, last_header_name: Option<String>) -> Self {
        Self {
            store,
            last_header_name,
        }
    }

    /// Add one raw line (without CRLF). A line starting with whitespace continues the last
    /// header: its leading whitespace is dropped and the rest appended with no separator.
    /// Otherwise the line is split at the first colon; a line with no colon is all name.
    pub fn add_header_line(&mut self, line: &str) {
        let Some(first) = line.chars().next() else {
            return;
        };
        if first.is_whitespace() {
            let Some(name) = self.last_header_name.as_deref() else {
                warn!(line, "continuation line with no preceding header");
                return;
            };
            if !self.store.fold_continuation(name, line.trim_start()) {
                warn!(header = name, "continuation line for header with no value");
            }
        } else {
            let (name, value) = line.split_once(':').unwrap_or((line, ""));
            let name = name.trim();
            self.store.add_header(name, value.trim());
            self.last_header_name = Some(name.to_string());
        }
    }

    /// Name of the header a continuation line would currently extend.
    pub fn last_header_name(&self) -> Option<&str> {
        self.last_header_name.as_deref()
    }

    pub fn store(&self) -> &HeaderStore {
        &*self.store
    }

    /// End the session, returning its continuation state for a later resume.
    pub fn finish(self) -> Option<String> {
        self.last_header_name
    }
}
