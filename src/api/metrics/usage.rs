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
use crate::usage::{DeviceUsage, PendingMaintenance, UsageSnapshot};

const SIZE: &str = "bcachefs_fs_usage_size";
const REPLICAS: &str = "bcachefs_fs_usage_replicas_usage";
const COMPRESSION: &str = "bcachefs_fs_usage_compression";
const BTREE: &str = "bcachefs_fs_usage_btree";
const REBALANCE: &str = "bcachefs_fs_usage_rebalance";
const DEVICE: &str = "bcachefs_fs_usage_device";

/// Metrics from the `bcachefs fs usage` report.
pub struct UsageMetricExporter<'a> {
    usage: &'a UsageSnapshot,
}

impl<'a> UsageMetricExporter<'a> {
    pub fn new(usage: &'a UsageSnapshot) -> Self {
        Self { usage }
    }

    fn export_size(&self, builder: &mut MetricBuilder, fs: &FsLabels) {
        builder.family(SIZE, "Filesystem size in bytes by type", "gauge");
        for (kind, value) in [
            ("capacity", self.usage.capacity),
            ("used", self.usage.used),
            ("online reserved", self.usage.online_reserved),
        ] {
            builder.metric(SIZE, &fs.with(&[("type", kind)]), value);
        }
    }

    fn export_replicas(&self, builder: &mut MetricBuilder, fs: &FsLabels) {
        if self.usage.replicas.is_empty() {
            return;
        }
        builder.family(REPLICAS, "Bytes stored per replica set", "gauge");
        for r in &self.usage.replicas {
            let labels = fs.with(&[
                ("dataType", r.data_type.as_str()),
                ("requiredTotal", r.required_total.as_str()),
                ("durability", r.durability.as_str()),
                ("devices", r.devices.as_str()),
            ]);
            builder.metric(REPLICAS, &labels, r.size);
        }
    }

    fn export_compression(&self, builder: &mut MetricBuilder, fs: &FsLabels) {
        if self.usage.compression.is_empty() {
            return;
        }
        builder.family(COMPRESSION, "Compressed and uncompressed bytes per compression type", "gauge");
        for c in &self.usage.compression {
            for (data_type, value) in [
                ("compressed", c.compressed),
                ("uncompressed", c.uncompressed),
                ("average extent size", c.average_extent_size),
            ] {
                let labels = fs.with(&[("compressionType", c.compression_type.as_str()), ("dataType", data_type)]);
                builder.metric(COMPRESSION, &labels, value);
            }
        }
    }

    fn export_btree(&self, builder: &mut MetricBuilder, fs: &FsLabels) {
        if self.usage.btree.is_empty() {
            return;
        }
        builder.family(BTREE, "Bytes used per btree", "gauge");
        for b in &self.usage.btree {
            builder.metric(BTREE, &fs.with(&[("dataType", b.data_type.as_str())]), b.size);
        }
    }

    fn export_rebalance(&self, builder: &mut MetricBuilder, fs: &FsLabels) {
        let pending = &self.usage.pending;
        builder.family(REBALANCE, "Bytes of pending background data movement", "gauge");
        builder.metric(REBALANCE, &fs.with(&[("dataType", "pending")]), pending.pending);
        if !has_breakdown(pending) {
            return;
        }
        for (data_type, value) in [
            ("compression data", pending.compression_data),
            ("compression metadata", pending.compression_metadata),
            ("target data", pending.target_data),
            ("target metadata", pending.target_metadata),
        ] {
            builder.metric(REBALANCE, &fs.with(&[("dataType", data_type)]), value);
        }
    }

    fn export_device(&self, builder: &mut MetricBuilder, fs: &FsLabels, device: &DeviceUsage) {
        for category in &device.categories {
            let base = [
                ("label", device.label.as_str()),
                ("device", device.device.as_str()),
                ("type", category.data_type.as_str()),
            ];
            let mut samples = vec![("data", category.size), ("buckets", category.buckets)];
            if let Some(fragmented) = category.fragmented {
                samples.push(("fragmented", fragmented));
            }
            for (data_type, value) in samples {
                let mut extra = base.to_vec();
                extra.push(("dataType", data_type));
                builder.metric(DEVICE, &fs.with(&extra), value);
            }
        }
    }
}

fn has_breakdown(pending: &PendingMaintenance) -> bool {
    pending.compression_data != 0
        || pending.compression_metadata != 0
        || pending.target_data != 0
        || pending.target_metadata != 0
}

impl<'a> MetricExporter for UsageMetricExporter<'a> {
    fn export_metrics(&self) -> String {
        let mut builder = MetricBuilder::new();
        let fs = FsLabels::new(self.usage);

        self.export_size(&mut builder, &fs);
        self.export_replicas(&mut builder, &fs);
        self.export_compression(&mut builder, &fs);
        self.export_btree(&mut builder, &fs);
        self.export_rebalance(&mut builder, &fs);

        if !self.usage.devices.is_empty() {
            builder.family(DEVICE, "Per-device usage by data type", "gauge");
            for device in &self.usage.devices {
                self.export_device(&mut builder, &fs, device);
            }
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::{fixtures, parse_fs_usage};

    fn exported() -> String {
        let usage = parse_fs_usage("/mnt/pool", &fixtures::report()).unwrap();
        UsageMetricExporter::new(&usage).export_metrics()
    }

    #[test]
    fn test_size_family() {
        let out = exported();
        assert!(out.contains("# TYPE bcachefs_fs_usage_size gauge\n"));
        assert!(out.contains(
            "bcachefs_fs_usage_size{mountpoint=\"/mnt/pool\",uuid=\"a9da1e6e-d4e5-4717-a520-408c8af4b084\",type=\"capacity\"} 89243210303488\n"
        ));
        assert!(out.contains("type=\"online reserved\"} 13135872\n"));
    }

    #[test]
    fn test_replica_and_compression_samples() {
        let out = exported();
        assert!(out.contains(
            "dataType=\"user\",requiredTotal=\"1/2\",durability=\"2\",devices=\"sdg sdi\"} 176730659328\n"
        ));
        assert!(out.contains("dataType=\"reserved\",requiredTotal=\"1/2\",durability=\"\",devices=\"\"} 5181931520\n"));
        assert!(out.contains("compressionType=\"incompressible\",dataType=\"uncompressed\"} 35909528035328\n"));
        assert!(out.contains("compressionType=\"zstd\",dataType=\"average extent size\"} 123627\n"));
    }

    #[test]
    fn test_device_samples() {
        let out = exported();
        assert!(out.contains(
            "label=\"hdd.hdd1\",device=\"device 0\",type=\"sb\",dataType=\"fragmented\"} 520192\n"
        ));
        assert!(out.contains("type=\"free\",dataType=\"buckets\"} 4425639\n"));
        assert!(!out.contains("type=\"free\",dataType=\"fragmented\""));
    }

    #[test]
    fn test_help_emitted_once_per_family() {
        let out = exported();
        assert_eq!(out.matches("# HELP bcachefs_fs_usage_replicas_usage ").count(), 1);
        assert_eq!(out.matches("# HELP bcachefs_fs_usage_device ").count(), 1);
    }

    #[test]
    fn test_rebalance_breakdown_only_when_reported() {
        let out = exported();
        assert!(out.contains("dataType=\"pending\"} 8216518656\n"));
        assert!(!out.contains("dataType=\"target data\""));

        let usage = UsageSnapshot {
            pending: PendingMaintenance {
                pending: 30,
                compression_data: 10,
                target_metadata: 20,
                ..Default::default()
            },
            ..Default::default()
        };
        let out = UsageMetricExporter::new(&usage).export_metrics();
        assert!(out.contains("dataType=\"compression data\"} 10\n"));
        assert!(out.contains("dataType=\"target metadata\"} 20\n"));
        assert!(!out.contains("bcachefs_fs_usage_device"));
    }
}
