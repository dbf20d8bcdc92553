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
use crate::sysfs::time_stats::IntervalHistogram;

const TIME_STAT: &str = "bcachefs_sysfs_time_stat";

/// Flatten a histogram into `(dataType, value)` samples, in seconds.
///
/// The interval section has no `total`, so it is not exported.
pub(super) fn histogram_samples(hist: &IntervalHistogram) -> [(&'static str, f64); 14] {
    let d = &hist.duration;
    let i = &hist.interval;
    [
        ("count", hist.count as f64),
        ("duration_min", d.min),
        ("duration_max", d.max),
        ("duration_total", d.total),
        ("duration_mean", d.mean),
        ("duration_stddev", d.stddev),
        ("duration_recent_mean", d.recent_mean),
        ("duration_recent_stddev", d.recent_stddev),
        ("interval_min", i.min),
        ("interval_max", i.max),
        ("interval_mean", i.mean),
        ("interval_stddev", i.stddev),
        ("interval_recent_mean", i.recent_mean),
        ("interval_recent_stddev", i.recent_stddev),
    ]
}

pub struct TimeStatsMetricExporter<'a> {
    fs: FsLabels<'a>,
    stats: &'a BTreeMap<String, IntervalHistogram>,
}

impl<'a> TimeStatsMetricExporter<'a> {
    pub fn new(fs: FsLabels<'a>, stats: &'a BTreeMap<String, IntervalHistogram>) -> Self {
        Self { fs, stats }
    }
}

impl<'a> MetricExporter for TimeStatsMetricExporter<'a> {
    fn export_metrics(&self) -> String {
        let mut builder = MetricBuilder::new();
        if self.stats.is_empty() {
            return builder.build();
        }

        builder.family(TIME_STAT, "Event timing statistics in seconds", "gauge");
        for (item, hist) in self.stats {
            for (data_type, value) in histogram_samples(hist) {
                let labels = self.fs.with(&[("item", item.as_str()), ("dataType", data_type)]);
                builder.metric(TIME_STAT, &labels, value);
            }
        }

        builder.build()
    }
}
