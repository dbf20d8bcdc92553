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

use super::{FsLabels, MetricBuilder, MetricExporter};
use crate::sysfs::counters::CounterRecord;

const COUNTER: &str = "bcachefs_sysfs_counter";

/// Filesystem event counters, since mount and since creation.
pub struct CounterMetricExporter<'a> {
    fs: FsLabels<'a>,
    counters: &'a BTreeMap<String, CounterRecord>,
}

impl<'a> CounterMetricExporter<'a> {
    pub fn new(fs: FsLabels<'a>, counters: &'a BTreeMap<String, CounterRecord>) -> Self {
        Self { fs, counters }
    }
}

impl<'a> MetricExporter for CounterMetricExporter<'a> {
    fn export_metrics(&self) -> String {
        let mut builder = MetricBuilder::new();
        if self.counters.is_empty() {
            return builder.build();
        }

        builder.family(COUNTER, "Filesystem event counters", "gauge");
        for (item, record) in self.counters {
            for (data_type, value) in [
                ("mount", record.since_mount),
                ("creation", record.since_creation),
            ] {
                let labels = self.fs.with(&[("item", item.as_str()), ("dataType", data_type)]);
                builder.metric(COUNTER, &labels, value.as_u64());
            }
        }

        builder.build()
    }
}
