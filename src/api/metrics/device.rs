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

use super::time_stats::histogram_samples;
use super::{FsLabels, MetricBuilder, MetricExporter};
use crate::sysfs::dev::DeviceRecord;

const DEV_STAT: &str = "bcachefs_sysfs_dev_stat";
const IO_DONE: &str = "bcachefs_sysfs_dev_io_done";
// Misspelled family name is what existing dashboards query.
const IO_ERRORS: &str = "bcachefs_sysfs_dev_io_erros";
const IO_LATENCY: &str = "bcachefs_sysfs_dev_io_latency";

/// Per-device sysfs metrics, keyed by the `dev-N` directory name.
pub struct DeviceMetricExporter<'a> {
    fs: FsLabels<'a>,
    devices: &'a BTreeMap<String, DeviceRecord>,
}

impl<'a> DeviceMetricExporter<'a> {
    pub fn new(fs: FsLabels<'a>, devices: &'a BTreeMap<String, DeviceRecord>) -> Self {
        Self { fs, devices }
    }

    fn device_labels<'b>(
        &'b self,
        name: &'b str,
        dev: &'b DeviceRecord,
        extra: &[(&'b str, &'b str)],
    ) -> Vec<(&'b str, &'b str)> {
        let mut labels = vec![
            ("devName", name),
            ("devUuid", dev.uuid.as_str()),
            ("devLabel", dev.label.as_str()),
        ];
        labels.extend_from_slice(extra);
        self.fs.with(&labels)
    }

    fn export_stats(&self, builder: &mut MetricBuilder) {
        builder.family(DEV_STAT, "Device geometry and durability", "gauge");
        for (name, dev) in self.devices {
            for (item, value) in [
                ("bucket_size", dev.bucket_size),
                ("nbuckets", dev.nbuckets),
                ("first_bucket", dev.first_bucket),
                ("durability", dev.durability),
            ] {
                builder.metric(DEV_STAT, &self.device_labels(name, dev, &[("item", item)]), value);
            }
        }
    }

    fn export_io_done(&self, builder: &mut MetricBuilder) {
        builder.family(IO_DONE, "Bytes of completed IO by direction and data type", "gauge");
        for (name, dev) in self.devices {
            for (direction, counters) in [("read", &dev.io_done.read), ("write", &dev.io_done.write)] {
                for (item, value) in counters {
                    let extra = [("direction", direction), ("item", item.as_str())];
                    builder.metric(IO_DONE, &self.device_labels(name, dev, &extra), *value);
                }
            }
        }
    }

    fn export_io_errors(&self, builder: &mut MetricBuilder) {
        builder.family(IO_ERRORS, "IO errors since filesystem creation", "gauge");
        for (name, dev) in self.devices {
            let errors = &dev.io_errors;
            for (item, value) in [
                ("read", errors.read),
                ("write", errors.write),
                ("checksum", errors.checksum),
            ] {
                builder.metric(IO_ERRORS, &self.device_labels(name, dev, &[("item", item)]), value);
            }
        }
    }

    fn export_io_latency(&self, builder: &mut MetricBuilder) {
        builder.family(IO_LATENCY, "IO latency statistics in seconds", "gauge");
        for (name, dev) in self.devices {
            for (direction, hist) in [("read", &dev.latency_read), ("write", &dev.latency_write)] {
                for (data_type, value) in histogram_samples(hist) {
                    let extra = [("direction", direction), ("dataType", data_type)];
                    builder.metric(IO_LATENCY, &self.device_labels(name, dev, &extra), value);
                }
            }
        }
    }
}

impl<'a> MetricExporter for DeviceMetricExporter<'a> {
    fn export_metrics(&self) -> String {
        let mut builder = MetricBuilder::new();
        if self.devices.is_empty() {
            return builder.build();
        }

        self.export_stats(&mut builder);
        self.export_io_done(&mut builder);
        self.export_io_errors(&mut builder);
        self.export_io_latency(&mut builder);

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sysfs::dev::IoErrorCounters;

    fn devices() -> BTreeMap<String, DeviceRecord> {
        let mut dev = DeviceRecord {
            label: "ssd.fast".to_string(),
            uuid: "0fb7c3e2-2ef9-4b84-9a26-7b5ec84dba8b".to_string(),
            bucket_size: 524288,
            first_bucket: 1,
            nbuckets: 3815447,
            durability: 1,
            io_errors: IoErrorCounters {
                read: 0,
                write: 2,
                checksum: 0,
            },
            ..Default::default()
        };
        dev.io_done.read.insert("btree".to_string(), 4096);
        dev.io_done.write.insert("user".to_string(), 8192);
        dev.latency_read.count = 17;

        let mut devices = BTreeMap::new();
        devices.insert("dev-0".to_string(), dev);
        devices
    }

    #[test]
    fn test_device_families() {
        let devices = devices();
        let fs = FsLabels {
            mountpoint: "/mnt/pool",
            uuid: "1234",
        };
        let out = DeviceMetricExporter::new(fs, &devices).export_metrics();

        let prefix = "mountpoint=\"/mnt/pool\",uuid=\"1234\",devName=\"dev-0\",\
                      devUuid=\"0fb7c3e2-2ef9-4b84-9a26-7b5ec84dba8b\",devLabel=\"ssd.fast\"";
        assert!(out.contains(&format!("bcachefs_sysfs_dev_stat{{{prefix},item=\"nbuckets\"}} 3815447\n")));
        assert!(out.contains(&format!(
            "bcachefs_sysfs_dev_io_done{{{prefix},direction=\"read\",item=\"btree\"}} 4096\n"
        )));
        assert!(out.contains(&format!(
            "bcachefs_sysfs_dev_io_done{{{prefix},direction=\"write\",item=\"user\"}} 8192\n"
        )));
        assert!(out.contains(&format!("bcachefs_sysfs_dev_io_erros{{{prefix},item=\"write\"}} 2\n")));
        assert!(out.contains(&format!(
            "bcachefs_sysfs_dev_io_latency{{{prefix},direction=\"read\",dataType=\"count\"}} 17\n"
        )));
        assert_eq!(out.matches("bcachefs_sysfs_dev_io_latency{").count(), 28);
    }

    #[test]
    fn test_no_devices() {
        let devices = BTreeMap::new();
        let fs = FsLabels {
            mountpoint: "/",
            uuid: "x",
        };
        assert!(DeviceMetricExporter::new(fs, &devices).export_metrics().is_empty());
    }
}
