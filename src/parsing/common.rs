// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Line helpers shared by the report parsers.

use crate::error::{Error, Result};

/// Collapse every run of whitespace into a single space and trim both ends.
///
/// Column-aligned reports pad with a varying number of spaces (and sometimes
/// tabs) between releases, so header comparisons are done on this form.
pub fn normalize_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True when the line has no visible characters.
pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Parse a plain unsigned integer, mapping failure to [`Error::InvalidNumber`].
pub fn parse_u64(s: &str) -> Result<u64> {
    let s = s.trim();
    s.parse::<u64>().map_err(|e| Error::invalid_number(s, e))
}

/// Split a `key: value` line into its trimmed halves.
pub fn split_key_value(line: &str) -> Option<(&str, &str)> {
    line.split_once(':').map(|(k, v)| (k.trim(), v.trim()))
}

/// Return the first line of a sysfs attribute with the trailing newline removed.
pub fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or("")
}

/// Remove the trailing colon from a row label such as `btree:`.
pub fn strip_label_colon(token: &str) -> &str {
    token.trim_end_matches(':')
}
