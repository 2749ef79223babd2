/*
 * lib.rs
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

//! RFC 822 header blocks: streaming parser, ordered multi-valued header store, serializer.
//!
//! ```
//! use tagliacarte_headers::HeaderStore;
//!
//! let (headers, body) = HeaderStore::parse(b"Subject: Hello\r\n World\r\n\r\nBody");
//! assert_eq!(headers.get_header("subject"), Some(vec!["HelloWorld"]));
//! assert_eq!(body, 26);
//! ```

mod config;
mod error;
mod header;
mod lines;
mod parser;
mod store;

pub use config::HeaderConfig;
pub use error::HeaderError;
pub use header::{header_key, Header};
pub use lines::HeaderLineSession;
pub use parser::{HeaderHandler, HeaderParser};
pub use store::{HeaderLines, HeaderStore, Headers, CANONICAL_ORDER};
