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

//! Event-timing reports (`time_stats/*` and per-device `io_latency_stats_*`).
//!
//! ```text
//! count:     484251
//!                        since mount        recent
//! duration of events
//!   min:                       88 us
//!   max:                        2 m
//!   total:                     47 h
//!   mean:                     353 ms         11 ms
//!   stddev:                     2 s           5 ms
//! time between events
//!   min:                       10 ns
//!   max:                        9 m
//!   mean:                     475 ms       1586 ms
//!   stddev:                  1909 ms       1679 us
//! ```
//!
//! All values are converted to seconds.

use std::collections::BTreeMap;

use serde::Serialize;

use super::{parse_dir_entries, SysfsRoot};
use crate::error::{Error, Result};
use crate::parsing::common::{normalize_whitespace, parse_u64};
use crate::parsing::units::decode_duration;
use crate::parsing::LineCursor;

pub const TIME_STATS_DIR: &str = "time_stats";

const CONTEXT: &str = "time stats";
const DURATION_HEADER: &str = "duration of events";
const INTERVAL_HEADER: &str = "time between events";
const COLUMN_HEADER: &str = "since mount recent";

/// Whether a `quantiles` line may appear in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantileMode {
    /// Per-device latency reports carry quantiles; skip them.
    Ignore,
    /// Global reports must not contain quantiles.
    Reject,
}

/// One `duration of events` or `time between events` section, in seconds.
///
/// `total` is only printed for durations and stays zero for intervals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TimeStatItem {
    pub min: f64,
    pub max: f64,
    pub total: f64,
    pub mean: f64,
    pub stddev: f64,
    pub recent_mean: f64,
    pub recent_stddev: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct IntervalHistogram {
    pub count: u64,
    pub duration: TimeStatItem,
    pub interval: TimeStatItem,
}

/// Parse every file of `<uuid>/time_stats`.
pub fn parse_time_stats_dir(
    root: &SysfsRoot,
    uuid: &str,
) -> Result<BTreeMap<String, IntervalHistogram>> {
    parse_dir_entries(&root.fs_dir(uuid).join(TIME_STATS_DIR), |text| {
        parse_time_stat(text, QuantileMode::Reject)
    })
}

pub fn parse_time_stat(text: &str, quantiles: QuantileMode) -> Result<IntervalHistogram> {
    let mut cursor = LineCursor::new(text);
    let mut count = None;
    let mut duration = None;
    let mut interval = None;

    while let Some(raw) = cursor.next_line() {
        let line = normalize_whitespace(raw);
        if line.is_empty() || line == COLUMN_HEADER {
            continue;
        }

        if let Some(rest) = line.strip_prefix("count:") {
            set_once(&mut count, parse_u64(rest)?, &line)?;
        } else if line == DURATION_HEADER {
            let rows = cursor.take_exact(5, CONTEXT)?;
            set_once(&mut duration, parse_item(&rows, true)?, &line)?;
        } else if line == INTERVAL_HEADER {
            let rows = cursor.take_exact(4, CONTEXT)?;
            set_once(&mut interval, parse_item(&rows, false)?, &line)?;
        } else if line.starts_with("quantiles") && quantiles == QuantileMode::Ignore {
            continue;
        } else {
            return Err(Error::format(CONTEXT, line));
        }
    }

    match (count, duration, interval) {
        (Some(count), Some(duration), Some(interval)) => Ok(IntervalHistogram {
            count,
            duration,
            interval,
        }),
        _ => Err(Error::format(CONTEXT, "incomplete report")),
    }
}

/// Each top-level line and section appears at most once.
fn set_once<T>(slot: &mut Option<T>, value: T, line: &str) -> Result<()> {
    if slot.is_some() {
        return Err(Error::format(CONTEXT, line));
    }
    *slot = Some(value);
    Ok(())
}

/// Parse the rows of one section. Each label must appear exactly once.
fn parse_item(rows: &[&str], with_total: bool) -> Result<TimeStatItem> {
    let mut item = TimeStatItem::default();
    let mut seen: Vec<&str> = Vec::with_capacity(rows.len());

    for row in rows {
        let line = normalize_whitespace(row);
        let fields: Vec<&str> = line.split_whitespace().collect();
        let label = fields.first().copied().unwrap_or_default();

        let (value, recent) = match (label, fields.as_slice()) {
            ("min:" | "max:" | "total:", [_, value, unit]) => (decode_duration(value, unit)?, None),
            ("mean:" | "stddev:", [_, value, unit, recent, recent_unit]) => (
                decode_duration(value, unit)?,
                Some(decode_duration(recent, recent_unit)?),
            ),
            _ => return Err(Error::format(CONTEXT, line)),
        };

        match label {
            "min:" => item.min = value,
            "max:" => item.max = value,
            "total:" if with_total => item.total = value,
            "mean:" => {
                item.mean = value;
                item.recent_mean = recent.unwrap_or_default();
            }
            "stddev:" => {
                item.stddev = value;
                item.recent_stddev = recent.unwrap_or_default();
            }
            _ => return Err(Error::format(CONTEXT, line)),
        }

        let label = match label {
            "min:" => "min",
            "max:" => "max",
            "total:" => "total",
            "mean:" => "mean",
            _ => "stddev",
        };
        if seen.contains(&label) {
            return Err(Error::format(CONTEXT, line));
        }
        seen.push(label);
    }
    Ok(item)
}
