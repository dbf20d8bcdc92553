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

use std::collections::BTreeMap;

use serde::Serialize;

use super::{parse_dir_entries, SysfsRoot};
use crate::error::{Error, Result};
use crate::parsing::common::{is_blank, normalize_whitespace, parse_u64, split_key_value};
use crate::parsing::units::decode_size_value;

pub const COUNTERS_DIR: &str = "counters";

/// A counter value as printed: a plain event count or a unit-scaled byte amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum CounterValue {
    Count(u64),
    Bytes(u64),
}

impl CounterValue {
    pub fn as_u64(&self) -> u64 {
        match self {
            CounterValue::Count(v) | CounterValue::Bytes(v) => *v,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CounterRecord {
    pub since_mount: CounterValue,
    pub since_creation: CounterValue,
}

/// Parse every file of `<uuid>/counters`. A missing directory is reported as
/// [`Error::AbsentInput`], unwrapped, so callers can tell it apart from a bad file.
pub fn parse_counters(root: &SysfsRoot, uuid: &str) -> Result<BTreeMap<String, CounterRecord>> {
    parse_dir_entries(&root.fs_dir(uuid).join(COUNTERS_DIR), parse_counter)
}

const CONTEXT: &str = "counter";

/// Parse one counter file, exactly these two lines in this order:
///
/// ```text
/// since mount:                   1.32 TiB
/// since filesystem creation:     81.2 TiB
/// ```
pub fn parse_counter(text: &str) -> Result<CounterRecord> {
    let lines: Vec<&str> = text.lines().filter(|line| !is_blank(line)).collect();
    let [mount, creation] = lines.as_slice() else {
        return Err(Error::format(CONTEXT, normalize_whitespace(text)));
    };

    Ok(CounterRecord {
        since_mount: parse_counter_line(mount, "since mount")?,
        since_creation: parse_counter_line(creation, "since filesystem creation")?,
    })
}

fn parse_counter_line(line: &str, expected: &str) -> Result<CounterValue> {
    match split_key_value(line) {
        Some((key, value)) if key == expected => parse_counter_value(value),
        _ => Err(Error::format(CONTEXT, normalize_whitespace(line))),
    }
}

/// Bare digits are a count; anything with a unit is decoded as bytes.
pub fn parse_counter_value(value: &str) -> Result<CounterValue> {
    let value = value.trim();
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        return parse_u64(value).map(CounterValue::Count);
    }
    decode_size_value(value).map(CounterValue::Bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_counter() {
        let record = parse_counter("since mount:                   1\nsince filesystem creation:     551\n").unwrap();
        assert_eq!(record.since_mount, CounterValue::Count(1));
        assert_eq!(record.since_creation, CounterValue::Count(551));
    }

    #[test]
    fn test_parse_byte_counter() {
        let record = parse_counter(
            "since mount:                   1.32 TiB\nsince filesystem creation:     81.2 TiB\n",
        )
        .unwrap();
        assert_eq!(record.since_mount, CounterValue::Bytes(1451355348664));
        assert_eq!(record.since_creation.as_u64(), 89280344175411);
    }

    #[test]
    fn test_counter_value_forms() {
        assert_eq!(parse_counter_value("42").unwrap(), CounterValue::Count(42));
        assert_eq!(parse_counter_value("0 B").unwrap(), CounterValue::Bytes(0));
        assert_eq!(parse_counter_value("4KiB").unwrap(), CounterValue::Bytes(4096));
        assert!(parse_counter_value("").is_err());
    }

    #[test]
    fn test_counter_missing_line() {
        let err = parse_counter("since mount: 1\n").unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_counter_unknown_line() {
        let err = parse_counter("since mount: 1\nsince boot: 2\nsince filesystem creation: 3\n")
            .unwrap_err();
        assert!(matches!(err, Error::UnexpectedFormat { .. }));
    }

    #[test]
    fn test_counter_repeated_line() {
        let err = parse_counter("since mount: 1
since mount: 2
since filesystem creation: 3
")
            .unwrap_err();
        assert!(err.is_malformed());

        let err = parse_counter("since mount: 1
since mount: 2
").unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_counter_lines_out_of_order() {
        let err = parse_counter("since filesystem creation: 3
since mount: 1
").unwrap_err();
        assert!(matches!(err, Error::UnexpectedFormat { .. }));
    }
}
