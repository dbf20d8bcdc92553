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

//! Table sections of the usage report.
//!
//! Every parser here starts with the cursor on its header line and returns
//! with the cursor on the blank line (or end of input) that closes the table.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{CompressionUsage, PendingMaintenance, ReplicaUsage, TreeClassUsage};
use crate::error::{Error, Result};
use crate::parsing::common::{normalize_whitespace, split_key_value, strip_label_colon};
use crate::parsing::units::{decode_size_run, decode_size_value};
use crate::parsing::LineCursor;

/// `<type>: <required/total> [<durability>] [<devices>] <size>` on a normalized row.
/// Only `reserved` rows may leave out the durability column.
static REPLICA_ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\S+):\s+(\S+)\s+(?:(\S+)\s+)?\[([^\]]*)\]\s*(.+)$")
        .expect("replica row regex is valid")
});

/// Compression algorithms that may be printed glued to the first number.
/// Longest first so that a shorter name never wins a prefix match.
const COMPRESSION_TYPES: [&str; 5] = ["incompressible", "none", "zstd", "gzip", "lz4"];

const PENDING_HEADERS: [&str; 2] = ["Pending rebalance work:", "Pending reconcile:"];

pub fn parse_replicas(cursor: &mut LineCursor) -> Result<Vec<ReplicaUsage>> {
    let header = cursor.expect_line("replicas header")?;
    expect_header!(header, "replicas header", "Data type Required/total Durability Devices");

    cursor
        .take_block()
        .into_iter()
        .map(parse_replica_row)
        .collect()
}

/// Parse one replica row, trying the bracket regex first and the positional
/// layout second.
pub fn parse_replica_row(row: &str) -> Result<ReplicaUsage> {
    let line = normalize_whitespace(row);
    if let Some(caps) = REPLICA_ROW.captures(&line) {
        let data_type = caps[1].to_string();
        let durability = match (data_type.as_str(), caps.get(3)) {
            ("reserved", _) => String::new(),
            (_, Some(durability)) => durability.as_str().to_string(),
            (_, None) => return Err(Error::format("replica row", line)),
        };
        return Ok(ReplicaUsage {
            durability,
            data_type,
            required_total: caps[2].to_string(),
            devices: normalize_whitespace(&caps[4]),
            size: decode_size_value(&caps[5])?,
        });
    }
    parse_replica_row_positional(&line)
}

/// Legacy positional layout: the device set is the run of tokens from the
/// one starting with `[` to the one ending with `]`.
pub fn parse_replica_row_positional(line: &str) -> Result<ReplicaUsage> {
    const CONTEXT: &str = "replica row";
    let fields: Vec<&str> = line.split_whitespace().collect();
    let data_type = strip_label_colon(field_or_bail!(fields, 0, CONTEXT, line)).to_string();
    let required_total = field_or_bail!(fields, 1, CONTEXT, line).to_string();

    let (durability, first_device) = if data_type == "reserved" {
        (String::new(), 2)
    } else {
        (field_or_bail!(fields, 2, CONTEXT, line).to_string(), 3)
    };

    let mut devices = Vec::new();
    let mut idx = first_device;
    loop {
        let token = field_or_bail!(fields, idx, CONTEXT, line);
        let token = if idx == first_device {
            token
                .strip_prefix('[')
                .ok_or_else(|| Error::format(CONTEXT, line))?
        } else {
            token
        };
        idx += 1;
        if let Some(last) = token.strip_suffix(']') {
            if !last.is_empty() {
                devices.push(last);
            }
            break;
        }
        devices.push(token);
    }

    let size = field_or_bail!(fields, idx, CONTEXT, line);
    if fields.len() != idx + 1 {
        return Err(Error::format(CONTEXT, line));
    }
    Ok(ReplicaUsage {
        data_type,
        required_total,
        durability,
        devices: devices.join(" "),
        size: decode_size_value(size)?,
    })
}

pub fn parse_compression(cursor: &mut LineCursor) -> Result<Vec<CompressionUsage>> {
    cursor.expect_line("compression")?;
    let header = cursor.expect_line("compression header")?;
    expect_compression_header(header)?;

    cursor
        .take_block()
        .into_iter()
        .map(parse_compression_row)
        .collect()
}

/// Column header shared by the usage report and `compression_stats`.
pub fn expect_compression_header(line: &str) -> Result<()> {
    expect_header!(
        line,
        "compression header",
        "type compressed uncompressed average extent size",
        "typetype compressed uncompressed average extent size",
    );
    Ok(())
}

/// Parse one compression row.
///
/// Accepted shapes:
/// - `zstd 3629187407872 10558477742080 123627`
/// - `incompressible35909528035328 35909528035328 79440` (type glued to the first value)
/// - `zstd 2.86 TiB 8.15 TiB 123 KiB` or `zstd 2.86TiB 8.15TiB 123KiB`
pub fn parse_compression_row(row: &str) -> Result<CompressionUsage> {
    const CONTEXT: &str = "compression row";
    let tokens: Vec<&str> = row.split_whitespace().collect();
    let first = field_or_bail!(tokens, 0, CONTEXT, row);

    let (compression_type, mut values) = match split_glued_type(first) {
        Some((name, number)) => (name, vec![number]),
        None => (first, Vec::new()),
    };
    values.extend_from_slice(&tokens[1..]);

    match decode_size_run(&values)?.as_slice() {
        [compressed, uncompressed, average_extent_size] => Ok(CompressionUsage {
            compression_type: compression_type.to_string(),
            compressed: *compressed,
            uncompressed: *uncompressed,
            average_extent_size: *average_extent_size,
        }),
        _ => Err(Error::format(CONTEXT, normalize_whitespace(row))),
    }
}

/// Split `incompressible35909528035328` into its algorithm and number.
fn split_glued_type(token: &str) -> Option<(&str, &str)> {
    COMPRESSION_TYPES.iter().find_map(|name| {
        token
            .strip_prefix(name)
            .filter(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
            .map(|rest| (*name, rest))
    })
}

pub fn parse_btree(cursor: &mut LineCursor) -> Result<Vec<TreeClassUsage>> {
    cursor.expect_line("btree usage")?;
    cursor
        .take_block()
        .into_iter()
        .map(|row| {
            let (name, value) =
                split_key_value(row).ok_or_else(|| Error::format("btree row", row.trim()))?;
            if name.is_empty() || value.is_empty() {
                return Err(Error::format("btree row", row.trim()));
            }
            Ok(TreeClassUsage {
                data_type: name.to_string(),
                size: decode_size_value(value)?,
            })
        })
        .collect()
}

pub fn is_pending_header(line: &str) -> bool {
    PENDING_HEADERS.iter().any(|h| line.starts_with(h))
}

/// Parse the pending maintenance section.
///
/// Either a single total, inline or on the next line, or a breakdown table
/// with a `data metadata` column header followed by `compression:` and
/// `target:` rows. The total of a breakdown is the sum of its four cells.
pub fn parse_pending(cursor: &mut LineCursor) -> Result<PendingMaintenance> {
    const CONTEXT: &str = "pending maintenance";
    let header = normalize_whitespace(cursor.expect_line(CONTEXT)?);
    let inline = PENDING_HEADERS
        .iter()
        .find_map(|h| header.strip_prefix(h))
        .map(str::trim)
        .unwrap_or_default();

    let first = if inline.is_empty() {
        normalize_whitespace(cursor.expect_line(CONTEXT)?)
    } else {
        inline.to_string()
    };

    if first != "data metadata" {
        return Ok(PendingMaintenance {
            pending: decode_size_value(&first)?,
            ..Default::default()
        });
    }

    let mut pending = PendingMaintenance::default();
    for row in cursor.take_block() {
        let (name, value) =
            split_key_value(row).ok_or_else(|| Error::format(CONTEXT, row.trim()))?;
        let tokens: Vec<&str> = value.split_whitespace().collect();
        let values = decode_size_run(&tokens)?;
        let [data, metadata] = values[..] else {
            return Err(Error::format(CONTEXT, row.trim()));
        };
        match name {
            "compression" => {
                pending.compression_data = data;
                pending.compression_metadata = metadata;
            }
            "target" => {
                pending.target_data = data;
                pending.target_metadata = metadata;
            }
            _ => return Err(Error::format(CONTEXT, row.trim())),
        }
    }
    pending.pending = pending
        .compression_data
        .saturating_add(pending.compression_metadata)
        .saturating_add(pending.target_data)
        .saturating_add(pending.target_metadata);
    Ok(pending)
}

/// The durability/degraded table is informational and not modeled.
pub fn skip_durability(cursor: &mut LineCursor) {
    cursor.next_line();
    cursor.take_block();
}
