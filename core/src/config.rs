/*
 * config.rs
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

//! Header store settings. Missing JSON fields take their defaults.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderConfig {
    /// Pre-register empty slots for the RFC 822 fields so they serialize in conventional order.
    pub canonical_order: bool,
    /// Write `Name: Value` instead of `Name:Value`.
    pub space_after_colon: bool,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            canonical_order: true,
            space_after_colon: false,
        }
    }
}

impl HeaderConfig {
    /// Settings used when a store is built from a stream: no pre-registered slots.
    pub fn unordered() -> Self {
        Self {
            canonical_order: false,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> String {
        // Plain struct of bools; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}
