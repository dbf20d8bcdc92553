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

//! Parser for the `bcachefs fs usage` report.
//!
//! The report is a sequence of sections separated by blank lines. Each line is
//! whitespace-normalized and dispatched on its prefix; section parsers consume
//! their header and rows from a shared [`LineCursor`]. Any line that is not a
//! known section header starts a device block.

pub mod device;
pub mod sections;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::parsing::common::normalize_whitespace;
use crate::parsing::units::decode_size_value;
use crate::parsing::LineCursor;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageSnapshot {
    pub id: String,         // Filesystem UUID
    pub mount_path: String, // Path the report was taken for
    pub capacity: u64,
    pub used: u64,
    pub online_reserved: u64,
    pub replicas: Vec<ReplicaUsage>,
    pub compression: Vec<CompressionUsage>,
    pub btree: Vec<TreeClassUsage>,
    pub pending: PendingMaintenance,
    pub devices: Vec<DeviceUsage>,
}

/// One row of the `Data type / Required/total / Durability / Devices` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReplicaUsage {
    pub data_type: String,
    pub required_total: String, // e.g. "1/2", kept verbatim
    pub durability: String,     // Empty for the reserved row
    pub devices: String,        // Space-separated device names
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompressionUsage {
    pub compression_type: String,
    pub compressed: u64,
    pub uncompressed: u64,
    pub average_extent_size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TreeClassUsage {
    pub data_type: String,
    pub size: u64,
}

/// Pending background data movement.
///
/// Older reports only print a single total; in that case the breakdown
/// fields stay zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PendingMaintenance {
    pub pending: u64,
    pub compression_data: u64,
    pub compression_metadata: u64,
    pub target_data: u64,
    pub target_metadata: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceUsage {
    pub label: String,  // Empty for "(no label)"
    pub device: String, // e.g. "device 0"
    pub categories: Vec<DeviceCategoryUsage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceCategoryUsage {
    pub data_type: String,
    pub size: u64,
    pub buckets: u64,
    pub fragmented: Option<u64>, // Column is present row by row
}

/// Parse a full usage report taken for `path`.
///
/// The report must carry the `Filesystem:`, `Size:` and `Used:` lines and
/// at least one device block. Everything else is optional.
pub fn parse_fs_usage(path: &str, text: &str) -> Result<UsageSnapshot> {
    let mut snapshot = UsageSnapshot {
        mount_path: path.to_string(),
        ..Default::default()
    };
    let mut seen_id = false;
    let mut seen_capacity = false;
    let mut seen_used = false;

    let mut cursor = LineCursor::new(text);
    while let Some(raw) = cursor.peek() {
        let line = normalize_whitespace(raw);
        if line.is_empty() {
            cursor.next_line();
            continue;
        }

        if let Some(rest) = line.strip_prefix("Filesystem:") {
            snapshot.id = rest
                .split_whitespace()
                .next()
                .ok_or_else(|| Error::format("filesystem id", line.as_str()))?
                .to_string();
            seen_id = true;
            cursor.next_line();
        } else if let Some(rest) = line.strip_prefix("Size:") {
            snapshot.capacity = parse_scalar(rest, "capacity", &line)?;
            seen_capacity = true;
            cursor.next_line();
        } else if let Some(rest) = line.strip_prefix("Used:") {
            snapshot.used = parse_scalar(rest, "used", &line)?;
            seen_used = true;
            cursor.next_line();
        } else if let Some(rest) = line.strip_prefix("Online reserved:") {
            snapshot.online_reserved = parse_scalar(rest, "online reserved", &line)?;
            cursor.next_line();
        } else if line.starts_with("Data type") {
            snapshot.replicas = sections::parse_replicas(&mut cursor)?;
        } else if line.starts_with("Compression:") {
            snapshot.compression = sections::parse_compression(&mut cursor)?;
        } else if line.starts_with("Btree usage:") {
            snapshot.btree = sections::parse_btree(&mut cursor)?;
        } else if sections::is_pending_header(&line) {
            snapshot.pending = sections::parse_pending(&mut cursor)?;
        } else if line.starts_with("Data by durability desired") {
            sections::skip_durability(&mut cursor);
        } else {
            snapshot.devices.push(device::parse_device(&mut cursor)?);
        }
    }

    if !seen_id {
        return Err(Error::format("usage report", "missing 'Filesystem:' line"));
    }
    if !seen_capacity || !seen_used {
        return Err(Error::format("usage report", "missing 'Size:' or 'Used:' line"));
    }
    if snapshot.devices.is_empty() {
        return Err(Error::format("usage report", "no device sections"));
    }
    Ok(snapshot)
}

fn parse_scalar(rest: &str, context: &'static str, line: &str) -> Result<u64> {
    if rest.trim().is_empty() {
        return Err(Error::format(context, line));
    }
    decode_size_value(rest)
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub const HEADER: &str = "\
Filesystem: a9da1e6e-d4e5-4717-a520-408c8af4b084
Size:                 89243210303488
Used:                 69551428518400
Online reserved:            13135872
";

    pub const DURABILITY: &str = "\
Data by durability desired and amount degraded:
          undegraded
1x:    55338970490880
2x:    14201918887936
cached:1720875831296
reserved: 5181931520
";

    pub const REPLICAS: &str = "\
Data type      Required/total  Durability    Devices
reserved:      1/2               [] 5181931520
btree:         1/2             2             [sdd sde]          1551368192
btree:         1/2             2             [nvme1n1 nvme0n1]211112427520
user:          1/1             1             [sdh]           9045660372480
user:          1/2             2             [sdg sdi]        176730659328
cached:        1/1             1             [nvme1n1]        578525953536
";

    pub const COMPRESSION: &str = "\
Compression:
type              compressed    uncompressed     average extent size
zstd           3629187407872  10558477742080                  123627
incompressible35909528035328  35909528035328                   79440
";

    pub const BTREE: &str = "\
Btree usage:
extents:        195974660096
inodes:          57868288000
";

    pub const PENDING: &str = "\
Pending rebalance work:
8216518656
";

    pub const DEVICE: &str = "\
hdd.hdd1 (device 0):             sdd              rw    79%
                                data         buckets    fragmented
  free:                2320309420032         4425639
  sb:                        3149824               7        520192
  bucket size:                524288
";

    /// The sections of the reference report joined in their usual order.
    pub fn report() -> String {
        [HEADER, DURABILITY, REPLICAS, COMPRESSION, BTREE, PENDING, DEVICE].join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn replica(
        data_type: &str,
        required_total: &str,
        durability: &str,
        devices: &str,
        size: u64,
    ) -> ReplicaUsage {
        ReplicaUsage {
            data_type: data_type.to_string(),
            required_total: required_total.to_string(),
            durability: durability.to_string(),
            devices: devices.to_string(),
            size,
        }
    }

    fn expected() -> UsageSnapshot {
        UsageSnapshot {
            id: "a9da1e6e-d4e5-4717-a520-408c8af4b084".to_string(),
            mount_path: "/mnt/pool".to_string(),
            capacity: 89243210303488,
            used: 69551428518400,
            online_reserved: 13135872,
            replicas: vec![
                replica("reserved", "1/2", "", "", 5181931520),
                replica("btree", "1/2", "2", "sdd sde", 1551368192),
                replica("btree", "1/2", "2", "nvme1n1 nvme0n1", 211112427520),
                replica("user", "1/1", "1", "sdh", 9045660372480),
                replica("user", "1/2", "2", "sdg sdi", 176730659328),
                replica("cached", "1/1", "1", "nvme1n1", 578525953536),
            ],
            compression: vec![
                CompressionUsage {
                    compression_type: "zstd".to_string(),
                    compressed: 3629187407872,
                    uncompressed: 10558477742080,
                    average_extent_size: 123627,
                },
                CompressionUsage {
                    compression_type: "incompressible".to_string(),
                    compressed: 35909528035328,
                    uncompressed: 35909528035328,
                    average_extent_size: 79440,
                },
            ],
            btree: vec![
                TreeClassUsage {
                    data_type: "extents".to_string(),
                    size: 195974660096,
                },
                TreeClassUsage {
                    data_type: "inodes".to_string(),
                    size: 57868288000,
                },
            ],
            pending: PendingMaintenance {
                pending: 8216518656,
                ..Default::default()
            },
            devices: vec![DeviceUsage {
                label: "hdd.hdd1".to_string(),
                device: "device 0".to_string(),
                categories: vec![
                    DeviceCategoryUsage {
                        data_type: "free".to_string(),
                        size: 2320309420032,
                        buckets: 4425639,
                        fragmented: None,
                    },
                    DeviceCategoryUsage {
                        data_type: "sb".to_string(),
                        size: 3149824,
                        buckets: 7,
                        fragmented: Some(520192),
                    },
                ],
            }],
        }
    }

    #[test]
    fn test_parse_reference_report() {
        let snapshot = parse_fs_usage("/mnt/pool", &report()).unwrap();
        assert_eq!(snapshot, expected());
    }

    #[test]
    fn test_parse_is_idempotent() {
        let text = report();
        let first = parse_fs_usage("/mnt/pool", &text).unwrap();
        let second = parse_fs_usage("/mnt/pool", &text).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_sections_in_any_order() {
        let orders: [[&str; 7]; 4] = [
            [HEADER, DURABILITY, REPLICAS, COMPRESSION, BTREE, PENDING, DEVICE],
            [HEADER, DEVICE, PENDING, BTREE, COMPRESSION, REPLICAS, DURABILITY],
            [DEVICE, HEADER, COMPRESSION, DURABILITY, PENDING, REPLICAS, BTREE],
            [BTREE, REPLICAS, HEADER, PENDING, DEVICE, DURABILITY, COMPRESSION],
        ];
        for order in orders {
            let text = order.join("\n");
            let snapshot = parse_fs_usage("/mnt/pool", &text).unwrap();
            assert_eq!(snapshot, expected(), "order:\n{text}");
        }
    }

    #[test]
    fn test_optional_sections_may_be_missing() {
        let text = [HEADER, DEVICE].join("\n");
        let snapshot = parse_fs_usage("/mnt/pool", &text).unwrap();
        assert!(snapshot.replicas.is_empty());
        assert!(snapshot.compression.is_empty());
        assert_eq!(snapshot.pending, PendingMaintenance::default());
        assert_eq!(snapshot.devices.len(), 1);
    }

    #[test]
    fn test_human_readable_scalars() {
        let text = format!(
            "Filesystem: 1234\nSize: 81.2 TiB\nUsed: 63.2TiB\nOnline reserved: 12.5 MiB\n\n{DEVICE}"
        );
        let snapshot = parse_fs_usage("/", &text).unwrap();
        assert_eq!(snapshot.capacity, 89_280_344_175_411);
        assert_eq!(snapshot.online_reserved, 13_107_200);
    }

    #[test]
    fn test_missing_filesystem_line_is_malformed() {
        let text = format!("Size: 1\nUsed: 1\n\n{DEVICE}");
        let err = parse_fs_usage("/", &text).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_missing_device_is_malformed() {
        let err = parse_fs_usage("/", HEADER).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_unknown_section_is_malformed() {
        let text = format!("{}\nSomething new:\n  42\n", report());
        let err = parse_fs_usage("/", &text).unwrap_err();
        assert!(matches!(err, Error::UnexpectedFormat { .. }));
    }

    #[test]
    fn test_bad_scalar_is_malformed() {
        let text = format!("Filesystem: x\nSize: lots\nUsed: 1\n\n{DEVICE}");
        assert!(parse_fs_usage("/", &text).unwrap_err().is_malformed());
    }
}
