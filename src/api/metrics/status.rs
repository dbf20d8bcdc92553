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

use super::{FsLabels, MetricBuilder, MetricExporter};
use crate::sysfs::status::{CompressionStat, MaintenanceStatus, StatusSnapshot, WriteStat};

const WRITE_STATS: &str = "bcachefs_sysfs_btree_write_stats";
const CACHE_SIZE: &str = "bcachefs_sysfs_btree_cache_size";
const COMPRESSION_STATS: &str = "bcachefs_sysfs_compression_stats";
const REBALANCE_STATUS: &str = "bcachefs_sysfs_rebalance_status";

/// Metrics from the top-level sysfs status files. Files that were not
/// present produce no samples.
pub struct StatusMetricExporter<'a> {
    fs: FsLabels<'a>,
    status: &'a StatusSnapshot,
}

impl<'a> StatusMetricExporter<'a> {
    pub fn new(fs: FsLabels<'a>, status: &'a StatusSnapshot) -> Self {
        Self { fs, status }
    }

    fn export_write_stats(&self, builder: &mut MetricBuilder, stats: &[WriteStat]) {
        if stats.is_empty() {
            return;
        }
        builder.family(WRITE_STATS, "Btree node writes by reason", "gauge");
        for stat in stats {
            for (data_type, value) in [("nr", stat.count), ("size", stat.size)] {
                let labels = self.fs.with(&[("type", stat.name.as_str()), ("dataType", data_type)]);
                builder.metric(WRITE_STATS, &labels, value);
            }
        }
    }

    fn export_compression(&self, builder: &mut MetricBuilder, stats: &[CompressionStat]) {
        if stats.is_empty() {
            return;
        }
        builder.family(COMPRESSION_STATS, "Compression statistics per compression type", "gauge");
        for stat in stats {
            for (data_type, value) in [
                ("compressed", stat.compressed),
                ("uncompressed", stat.uncompressed),
                ("average extent size", stat.average_extent_size),
            ] {
                let labels = self.fs.with(&[
                    ("compressionType", stat.compression_type.as_str()),
                    ("dataType", data_type),
                ]);
                builder.metric(COMPRESSION_STATS, &labels, value);
            }
        }
    }

    fn export_maintenance(&self, builder: &mut MetricBuilder, status: &MaintenanceStatus) {
        builder.family(REBALANCE_STATUS, "Background data movement progress", "gauge");
        let state = status.state.as_str();
        let data_type = status.data_type.as_deref().unwrap_or("");
        for (item, value) in [
            ("keys moved", status.keys_moved),
            ("keys raced", status.keys_raced),
            ("bytes seen", status.bytes_seen),
            ("bytes moved", status.bytes_moved),
            ("bytes raced", status.bytes_raced),
        ] {
            let labels = self.fs.with(&[("state", state), ("dataType", data_type), ("item", item)]);
            builder.metric(REBALANCE_STATUS, &labels, value);
        }
    }
}

impl<'a> MetricExporter for StatusMetricExporter<'a> {
    fn export_metrics(&self) -> String {
        let mut builder = MetricBuilder::new();

        if let Some(stats) = &self.status.write_stats {
            self.export_write_stats(&mut builder, stats);
        }

        // Always present so dashboards see 0 rather than a gap.
        builder
            .family(CACHE_SIZE, "Btree node cache size in bytes", "gauge")
            .metric(CACHE_SIZE, &self.fs.with(&[]), self.status.cache_size.unwrap_or(0));

        if let Some(stats) = &self.status.compression {
            self.export_compression(&mut builder, stats);
        }

        if let Some(status) = &self.status.maintenance {
            self.export_maintenance(&mut builder, status);
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sysfs::status::MaintenanceState;

    const FS: FsLabels<'static> = FsLabels {
        mountpoint: "/mnt/pool",
        uuid: "1234",
    };

    #[test]
    fn test_absent_files_export_only_cache_size() {
        let status = StatusSnapshot::default();
        let out = StatusMetricExporter::new(FS, &status).export_metrics();
        assert!(out.contains(
            "bcachefs_sysfs_btree_cache_size{mountpoint=\"/mnt/pool\",uuid=\"1234\"} 0\n"
        ));
        assert!(!out.contains("bcachefs_sysfs_btree_write_stats"));
        assert!(!out.contains("bcachefs_sysfs_compression_stats"));
        assert!(!out.contains("bcachefs_sysfs_rebalance_status"));
    }

    #[test]
    fn test_full_status() {
        let status = StatusSnapshot {
            write_stats: Some(vec![WriteStat {
                name: "journal_reclaim".to_string(),
                count: 541080,
                size: 12_582_912,
            }]),
            cache_size: Some(7_654_604_800),
            compression: Some(vec![CompressionStat {
                compression_type: "lz4".to_string(),
                compressed: 10,
                uncompressed: 20,
                average_extent_size: 5,
            }]),
            maintenance: Some(MaintenanceStatus {
                state: MaintenanceState::Working,
                data_type: Some("user".to_string()),
                keys_moved: 3,
                bytes_seen: 4096,
                ..Default::default()
            }),
        };
        let out = StatusMetricExporter::new(FS, &status).export_metrics();

        assert!(out.contains(
            "bcachefs_sysfs_btree_write_stats{mountpoint=\"/mnt/pool\",uuid=\"1234\",type=\"journal_reclaim\",dataType=\"nr\"} 541080\n"
        ));
        assert!(out.contains("type=\"journal_reclaim\",dataType=\"size\"} 12582912\n"));
        assert!(out.contains(
            "bcachefs_sysfs_btree_cache_size{mountpoint=\"/mnt/pool\",uuid=\"1234\"} 7654604800\n"
        ));
        assert!(out.contains("compressionType=\"lz4\",dataType=\"uncompressed\"} 20\n"));
        assert!(out.contains("state=\"working\",dataType=\"user\",item=\"keys moved\"} 3\n"));
        assert!(out.contains("state=\"working\",dataType=\"user\",item=\"bytes raced\"} 0\n"));
    }

    #[test]
    fn test_idle_maintenance_has_empty_data_type() {
        let status = StatusSnapshot {
            maintenance: Some(MaintenanceStatus::default()),
            ..Default::default()
        };
        let out = StatusMetricExporter::new(FS, &status).export_metrics();
        assert!(out.contains("state=\"idle\",dataType=\"\",item=\"bytes seen\"} 0\n"));
    }
}
