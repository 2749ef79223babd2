/*
 * error.rs
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

//! Header loading errors.

use std::io;

use thiserror::Error;

/// Error while loading a header block. Malformed input is absorbed; only the stream can fail.
#[derive(Debug, Error)]
pub enum HeaderError {
    /// Reading the underlying stream failed.
    #[error("error loading headers: {source}")]
    Load {
        #[source]
        source: io::Error,
    },
}

impl HeaderError {
    pub fn load(source: io::Error) -> Self {
        Self::Load { source }
    }

    /// Kind of the underlying I/O failure.
    pub fn io_kind(&self) -> io::ErrorKind {
        match self {
            HeaderError::Load { source } => source.kind(),
        }
    }
}
