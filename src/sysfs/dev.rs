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

//! Per-device directories (`<uuid>/dev-N/`).
//!
//! Unlike the status files, every file here is required: a device whose
//! directory is incomplete fails with an error naming the file.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use super::time_stats::{parse_time_stat, IntervalHistogram, QuantileMode};
use super::{list_dir, parse_file, SysfsRoot};
use crate::error::{Error, Result};
use crate::parsing::common::{first_line, is_blank, normalize_whitespace, parse_u64, split_key_value};
use crate::parsing::units::decode_size_value;
use crate::parsing::LineCursor;

pub const DEVICE_DIR_PREFIX: &str = "dev-";
const IO_ERRORS_HEADER: &str = "IO errors since filesystem creation";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceRecord {
    pub label: String,
    pub uuid: String,
    pub bucket_size: u64,
    pub first_bucket: u64,
    pub nbuckets: u64,
    pub durability: u64,
    pub io_done: IoDoneCounters,
    pub io_errors: IoErrorCounters,
    pub latency_read: IntervalHistogram,
    pub latency_write: IntervalHistogram,
}

/// Completed IO per data category, split by direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IoDoneCounters {
    pub read: BTreeMap<String, u64>,
    pub write: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IoErrorCounters {
    pub read: u64,
    pub write: u64,
    pub checksum: u64,
}

/// Parse every `dev-*` directory of filesystem `uuid`, keyed by directory name.
pub fn parse_devices(root: &SysfsRoot, uuid: &str) -> Result<BTreeMap<String, DeviceRecord>> {
    let mut devices = BTreeMap::new();
    for (name, path) in list_dir(&root.fs_dir(uuid))? {
        if !name.starts_with(DEVICE_DIR_PREFIX) {
            continue;
        }
        let record = parse_device_dir(&path).map_err(|e| e.in_file(name.as_str()))?;
        devices.insert(name, record);
    }
    Ok(devices)
}

pub fn parse_device_dir(dir: &Path) -> Result<DeviceRecord> {
    let text_line = |s: &str| -> Result<String> { Ok(first_line(s).to_string()) };
    let scalar = |s: &str| decode_size_value(first_line(s));

    Ok(DeviceRecord {
        label: parse_file(dir, "label", text_line)?,
        uuid: parse_file(dir, "uuid", text_line)?,
        bucket_size: parse_file(dir, "bucket_size", scalar)?,
        first_bucket: parse_file(dir, "first_bucket", scalar)?,
        nbuckets: parse_file(dir, "nbuckets", scalar)?,
        durability: parse_file(dir, "durability", scalar)?,
        io_done: parse_file(dir, "io_done", parse_io_done)?,
        io_errors: parse_file(dir, "io_errors", parse_io_errors)?,
        latency_read: parse_file(dir, "io_latency_stats_read", |s| {
            parse_time_stat(s, QuantileMode::Ignore)
        })?,
        latency_write: parse_file(dir, "io_latency_stats_write", |s| {
            parse_time_stat(s, QuantileMode::Ignore)
        })?,
    })
}

/// Parse `io_done`: a `read:` block and a `write:` block of `name: count` rows.
pub fn parse_io_done(text: &str) -> Result<IoDoneCounters> {
    const CONTEXT: &str = "io_done";
    let mut counters = IoDoneCounters::default();
    let mut direction: Option<&mut BTreeMap<String, u64>> = None;

    for line in text.lines().filter(|line| !is_blank(line)) {
        match line.trim() {
            "read:" => direction = Some(&mut counters.read),
            "write:" => direction = Some(&mut counters.write),
            row => {
                let (name, count) =
                    split_key_value(row).ok_or_else(|| Error::format(CONTEXT, row))?;
                let target = direction
                    .as_deref_mut()
                    .ok_or_else(|| Error::format(CONTEXT, normalize_whitespace(row)))?;
                if name.is_empty() {
                    return Err(Error::format(CONTEXT, normalize_whitespace(row)));
                }
                target.insert(name.to_string(), parse_u64(count)?);
            }
        }
    }
    Ok(counters)
}

/// Parse `io_errors`. Only the block since filesystem creation is read.
pub fn parse_io_errors(text: &str) -> Result<IoErrorCounters> {
    const CONTEXT: &str = "io_errors";
    let mut cursor = LineCursor::new(text);
    let header = cursor.expect_line(CONTEXT)?;
    if normalize_whitespace(header) != IO_ERRORS_HEADER {
        return Err(Error::format(CONTEXT, normalize_whitespace(header)));
    }

    let mut read = None;
    let mut write = None;
    let mut checksum = None;
    for row in cursor.take_exact(3, CONTEXT)? {
        let (name, count) = split_key_value(row).ok_or_else(|| Error::format(CONTEXT, row.trim()))?;
        let slot = match name {
            "read" => &mut read,
            "write" => &mut write,
            "checksum" => &mut checksum,
            _ => return Err(Error::format(CONTEXT, normalize_whitespace(row))),
        };
        if slot.replace(parse_u64(count)?).is_some() {
            return Err(Error::format(CONTEXT, normalize_whitespace(row)));
        }
    }

    match (read, write, checksum) {
        (Some(read), Some(write), Some(checksum)) => Ok(IoErrorCounters {
            read,
            write,
            checksum,
        }),
        _ => Err(Error::format(CONTEXT, "incomplete error counters")),
    }
}
