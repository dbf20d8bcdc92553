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

//! Top-level status files of a filesystem instance.
//!
//! Each file is optional. A file that cannot be read leaves its field `None`;
//! a file that is read but does not match its layout fails the whole parse.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::{parse_optional, SysfsRoot};
use crate::error::{Error, Result};
use crate::parsing::common::{
    is_blank, normalize_whitespace, parse_u64, split_key_value, strip_label_colon,
};
use crate::parsing::units::{decode_size_fields, decode_size_value};
use crate::parsing::LineCursor;
use crate::usage::sections::{expect_compression_header, parse_compression_row};
use crate::usage::CompressionUsage;

pub const WRITE_STATS_FILE: &str = "btree_write_stats";
pub const CACHE_SIZE_FILE: &str = "btree_cache_size";
pub const COMPRESSION_STATS_FILE: &str = "compression_stats";
pub const REBALANCE_STATUS_FILE: &str = "rebalance_status";

static SCAN_DATA_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"data type==(\S+)").expect("data type regex is valid"));

/// Compression histogram rows share the usage report's row shape.
pub type CompressionStat = CompressionUsage;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub write_stats: Option<Vec<WriteStat>>,
    pub cache_size: Option<u64>,
    pub compression: Option<Vec<CompressionStat>>,
    pub maintenance: Option<MaintenanceStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteStat {
    pub name: String,
    pub count: u64,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MaintenanceState {
    #[default]
    Idle,
    Scanning,
    Working,
}

impl MaintenanceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaintenanceState::Idle => "idle",
            MaintenanceState::Scanning => "scanning",
            MaintenanceState::Working => "working",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MaintenanceStatus {
    pub state: MaintenanceState,
    pub data_type: Option<String>, // None while idle
    pub keys_moved: u64,
    pub keys_raced: u64,
    pub bytes_seen: u64,
    pub bytes_moved: u64,
    pub bytes_raced: u64,
}

/// Read the four status files of filesystem `uuid`.
pub fn parse_status(root: &SysfsRoot, uuid: &str) -> Result<StatusSnapshot> {
    let dir = root.fs_dir(uuid);
    Ok(StatusSnapshot {
        write_stats: parse_optional(&dir, WRITE_STATS_FILE, parse_write_stats)?,
        cache_size: parse_optional(&dir, CACHE_SIZE_FILE, parse_cache_size)?,
        compression: parse_optional(&dir, COMPRESSION_STATS_FILE, parse_compression_stats)?,
        maintenance: parse_optional(&dir, REBALANCE_STATUS_FILE, parse_maintenance_status)?,
    })
}

/// Parse `btree_write_stats`: an `nr size` header, then `name: nr size` rows.
pub fn parse_write_stats(text: &str) -> Result<Vec<WriteStat>> {
    const CONTEXT: &str = "btree write stats";
    let mut lines = text.lines().filter(|line| !is_blank(line));
    let Some(header) = lines.next() else {
        return Ok(Vec::new());
    };
    let columns: Vec<&str> = header.split_whitespace().collect();
    if columns.len() < 2 || columns[0] != "nr" || columns[1] != "size" {
        return Err(Error::format(CONTEXT, normalize_whitespace(header)));
    }

    lines
        .map(|row| {
            let fields: Vec<&str> = row.split_whitespace().collect();
            if fields.len() < 3 {
                return Err(Error::format(CONTEXT, normalize_whitespace(row)));
            }
            Ok(WriteStat {
                name: strip_label_colon(fields[0]).to_string(),
                count: parse_u64(fields[1])?,
                size: decode_size_fields(&fields[2..])?,
            })
        })
        .collect()
}

/// Parse `btree_cache_size`, e.g. `19.1 GiB` or `19.1GiB`.
pub fn parse_cache_size(text: &str) -> Result<u64> {
    let line = text
        .lines()
        .find(|line| !is_blank(line))
        .ok_or_else(|| Error::format("btree cache size", ""))?;
    decode_size_value(line)
}

/// Parse `compression_stats`.
pub fn parse_compression_stats(text: &str) -> Result<Vec<CompressionStat>> {
    let mut lines = text.lines().filter(|line| !is_blank(line));
    let Some(header) = lines.next() else {
        return Ok(Vec::new());
    };
    expect_compression_header(header)?;
    lines.map(parse_compression_row).collect()
}

/// Parse `rebalance_status`.
///
/// `pending work:` lines may precede the state word. `waiting` and `idle`
/// end the report. `scanning` and `working` are followed by a line carrying
/// `data type==<category>` and then the counters, up to the first blank line.
pub fn parse_maintenance_status(text: &str) -> Result<MaintenanceStatus> {
    const CONTEXT: &str = "rebalance status";
    let mut cursor = LineCursor::new(text);

    let state = loop {
        let line = normalize_whitespace(cursor.expect_line(CONTEXT)?);
        match line.as_str() {
            "" => continue,
            "waiting" | "idle" => return Ok(MaintenanceStatus::default()),
            "scanning" => break MaintenanceState::Scanning,
            "working" => break MaintenanceState::Working,
            other if other.starts_with("pending work:") => continue,
            other => return Err(Error::format(CONTEXT, other)),
        }
    };

    let scan = cursor.expect_line(CONTEXT)?;
    let data_type = SCAN_DATA_TYPE
        .captures(scan)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| Error::format(CONTEXT, scan.trim()))?;

    let mut status = MaintenanceStatus {
        state,
        data_type: Some(data_type),
        ..Default::default()
    };
    for row in cursor.take_block() {
        // Some kernels append the worker's stack trace.
        if row.contains("[<0>]") {
            continue;
        }
        let (key, value) = split_key_value(row).ok_or_else(|| Error::format(CONTEXT, row.trim()))?;
        match key {
            "keys moved" => status.keys_moved = parse_u64(value)?,
            "keys raced" => status.keys_raced = parse_u64(value)?,
            "bytes seen" => status.bytes_seen = decode_size_value(value)?,
            "bytes moved" => status.bytes_moved = decode_size_value(value)?,
            "bytes raced" => status.bytes_raced = decode_size_value(value)?,
            _ => return Err(Error::format(CONTEXT, normalize_whitespace(row))),
        }
    }
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WRITE_STATS: &str = "                   nr        size
initial:           364286    118 KiB
init_next_bset:    369063    24.9 KiB
cache_reclaim:     11667     306 B
journal_reclaim:   6045506   664 B
interior:          254768    998 B
";

    const COMPRESSION_STATS: &str = "typetype          compressed    uncompressed     average extent size
lz4_old                  0 B             0 B                     0 B
gzip                     0 B             0 B                     0 B
lz4                      0 B             0 B                     0 B
zstd                2.86 TiB        8.15 TiB                 123 KiB
incompressible      10.5 TiB        10.5 TiB                82.2 KiB
";

    const SCANNING: &str = "scanning
  rebalance_scan: data type==user pos=extents:1752400415:4096:U32_MAX
    keys moved:  74602530
    keys raced:  0
    bytes seen:  12.0 TiB
    bytes moved: 3.57 TiB
    bytes raced: 0 B

";

    #[test]
    fn test_parse_write_stats() {
        let stats = parse_write_stats(WRITE_STATS).unwrap();
        let expected = [
            ("initial", 364286, 120832),
            ("init_next_bset", 369063, 25497),
            ("cache_reclaim", 11667, 306),
            ("journal_reclaim", 6045506, 664),
            ("interior", 254768, 998),
        ];
        assert_eq!(stats.len(), expected.len());
        for (stat, (name, count, size)) in stats.iter().zip(expected) {
            assert_eq!(stat.name, name);
            assert_eq!(stat.count, count);
            assert_eq!(stat.size, size);
        }
    }

    #[test]
    fn test_write_stats_glued_units() {
        let stats = parse_write_stats("nr size\ninitial: 364286 118KiB\n").unwrap();
        assert_eq!(stats[0].size, 120832);
    }

    #[test]
    fn test_write_stats_bad_header() {
        let err = parse_write_stats("size nr\ninitial: 1 1 B\n").unwrap_err();
        assert!(matches!(err, Error::UnexpectedFormat { .. }));
    }

    #[test]
    fn test_write_stats_empty_file() {
        assert_eq!(parse_write_stats("").unwrap(), Vec::new());
    }

    #[test]
    fn test_parse_cache_size() {
        assert_eq!(parse_cache_size("19.1 GiB\n\t").unwrap(), 20508468838);
        assert_eq!(parse_cache_size("19.1GiB\n").unwrap(), 20508468838);
        assert!(parse_cache_size("\n").unwrap_err().is_malformed());
    }

    #[test]
    fn test_parse_compression_stats() {
        let stats = parse_compression_stats(COMPRESSION_STATS).unwrap();
        let expected = [
            ("lz4_old", 0, 0, 0),
            ("gzip", 0, 0, 0),
            ("lz4", 0, 0, 0),
            ("zstd", 3144603255439, 8961019766374, 125952),
            ("incompressible", 11544872091648, 11544872091648, 84172),
        ];
        assert_eq!(stats.len(), expected.len());
        for (stat, (name, compressed, uncompressed, avg)) in stats.iter().zip(expected) {
            assert_eq!(stat.compression_type, name);
            assert_eq!(stat.compressed, compressed);
            assert_eq!(stat.uncompressed, uncompressed);
            assert_eq!(stat.average_extent_size, avg);
        }
    }

    #[test]
    fn test_compression_stats_bad_header() {
        let err = parse_compression_stats("type compressed\nzstd 1 2 3\n").unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_parse_scanning_status() {
        let status = parse_maintenance_status(SCANNING).unwrap();
        assert_eq!(status.state, MaintenanceState::Scanning);
        assert_eq!(status.data_type.as_deref(), Some("user"));
        assert_eq!(status.keys_moved, 74602530);
        assert_eq!(status.keys_raced, 0);
        assert_eq!(status.bytes_seen, 13194139533312);
        assert_eq!(status.bytes_moved, 3925256511160);
        assert_eq!(status.bytes_raced, 0);
    }

    #[test]
    fn test_working_status_with_stack_trace() {
        let text = "pending work:                  10.7 TiB

working
  rebalance_work: data type==btree pos=extents:1:2:3
    keys moved:  5
    keys raced:  1
    bytes seen:  1.00 MiB
    bytes moved: 512 KiB
    bytes raced: 0 B
  [<0>] bch2_rebalance_thread+0x1f0/0x300 [bcachefs]
  [<0>] kthread+0xe8/0x120
";
        let status = parse_maintenance_status(text).unwrap();
        assert_eq!(status.state, MaintenanceState::Working);
        assert_eq!(status.data_type.as_deref(), Some("btree"));
        assert_eq!(status.keys_moved, 5);
        assert_eq!(status.keys_raced, 1);
        assert_eq!(status.bytes_seen, 1_048_576);
        assert_eq!(status.bytes_moved, 524_288);
    }

    #[test]
    fn test_idle_status() {
        for word in ["waiting", "idle"] {
            let status = parse_maintenance_status(&format!("{word}\n")).unwrap();
            assert_eq!(status, MaintenanceStatus::default());
            assert_eq!(status.state.as_str(), "idle");
        }
    }

    #[test]
    fn test_unknown_status_lines() {
        assert!(parse_maintenance_status("sleeping\n").unwrap_err().is_malformed());
        let text = "scanning\n  scan: data type==user pos=x\n    keys skipped: 1\n";
        assert!(parse_maintenance_status(text).unwrap_err().is_malformed());
        assert!(parse_maintenance_status("").unwrap_err().is_malformed());
    }
}
