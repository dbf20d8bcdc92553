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

use once_cell::sync::Lazy;
use regex::Regex;

use super::{DeviceCategoryUsage, DeviceUsage};
use crate::error::{Error, Result};
use crate::parsing::common::{normalize_whitespace, split_key_value};
use crate::parsing::units::decode_size_run;
use crate::parsing::LineCursor;

/// `hdd.hdd1 (device 0): sdd rw 79%` -> label, device id. Trailing annotations are ignored.
static DEVICE_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.*?)\s*\(([^()]*)\)\s*:").expect("device header regex is valid")
});

const NO_LABEL: &str = "(no label)";

/// Parse one device block starting at its header line.
pub fn parse_device(cursor: &mut LineCursor) -> Result<DeviceUsage> {
    let header = normalize_whitespace(cursor.expect_line("device header")?);
    let (label, device) = parse_device_header(&header)?;

    let columns = cursor.expect_line("device columns")?;
    expect_header!(columns, "device columns", "data buckets fragmented");

    let mut categories = Vec::new();
    for row in cursor.take_block() {
        if let Some(category) = parse_category_row(row)? {
            categories.push(category);
        }
    }

    Ok(DeviceUsage {
        label,
        device,
        categories,
    })
}

/// Split a device header into `(label, device id)`. `(no label)` yields an empty label.
pub fn parse_device_header(line: &str) -> Result<(String, String)> {
    let caps = DEVICE_HEADER
        .captures(line)
        .ok_or_else(|| Error::format("device header", line))?;
    let label = match &caps[1] {
        NO_LABEL => "",
        other => other,
    };
    Ok((label.to_string(), caps[2].trim().to_string()))
}

/// Parse `<category>: <size> <buckets> [<fragmented>]`.
///
/// Returns `None` for the `bucket size:` row printed by some releases.
fn parse_category_row(row: &str) -> Result<Option<DeviceCategoryUsage>> {
    const CONTEXT: &str = "device row";
    let (name, rest) = split_key_value(row).ok_or_else(|| Error::format(CONTEXT, row.trim()))?;
    if name == "bucket size" {
        return Ok(None);
    }
    if name.is_empty() {
        return Err(Error::format(CONTEXT, row.trim()));
    }

    let tokens: Vec<&str> = rest.split_whitespace().collect();
    let values = decode_size_run(&tokens)?;
    let (size, buckets, fragmented) = match values[..] {
        [size, buckets] => (size, buckets, None),
        [size, buckets, fragmented] => (size, buckets, Some(fragmented)),
        _ => return Err(Error::format(CONTEXT, normalize_whitespace(row))),
    };

    Ok(Some(DeviceCategoryUsage {
        data_type: name.to_string(),
        size,
        buckets,
        fragmented,
    }))
}
