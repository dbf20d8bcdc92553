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

//! One poll: run the usage report, then read the sysfs tree of the
//! filesystem it names.
//!
//! The four sysfs readers are independent and run on blocking threads in
//! parallel. Their results are combined only after all of them finished, and
//! any malformed input fails the whole poll.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::common::config::ExporterConfig;
use crate::error::{Error, Result};
use crate::sysfs::counters::{parse_counters, CounterRecord};
use crate::sysfs::dev::{parse_devices, DeviceRecord};
use crate::sysfs::status::{parse_status, StatusSnapshot};
use crate::sysfs::time_stats::{parse_time_stats_dir, IntervalHistogram};
use crate::sysfs::SysfsRoot;
use crate::usage::{parse_fs_usage, UsageSnapshot};
use crate::utils::run_for_stdout;

/// Everything gathered in one poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollSnapshot {
    pub usage: UsageSnapshot,
    pub status: StatusSnapshot,
    pub time_stats: BTreeMap<String, IntervalHistogram>,
    pub devices: BTreeMap<String, DeviceRecord>,
    pub counters: BTreeMap<String, CounterRecord>,
    pub collected_at: DateTime<Utc>,
}

/// The external command producing the usage report.
#[derive(Debug, Clone)]
pub struct UsageCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl UsageCommand {
    /// `<program> fs usage <target_path>`
    pub fn bcachefs(program: impl Into<PathBuf>, target_path: &str, timeout: Duration) -> Self {
        Self::new(
            program,
            vec!["fs".to_string(), "usage".to_string(), target_path.to_string()],
            timeout,
        )
    }

    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn run(&self) -> Result<String> {
        let args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        run_for_stdout(&self.program.to_string_lossy(), &args, self.timeout)
    }
}

#[derive(Debug, Clone)]
pub struct Collector {
    command: UsageCommand,
    target_path: String,
    sysfs: SysfsRoot,
    dump_usage: Option<PathBuf>,
}

impl Collector {
    pub fn new(config: &ExporterConfig) -> Self {
        Self {
            command: UsageCommand::bcachefs(
                &config.bcachefs_bin,
                &config.target_path,
                config.poll_timeout,
            ),
            target_path: config.target_path.clone(),
            sysfs: SysfsRoot::new(&config.sysfs_root),
            dump_usage: config.dump_usage.clone(),
        }
    }

    pub fn with_command(command: UsageCommand, target_path: &str, sysfs: SysfsRoot) -> Self {
        Self {
            command,
            target_path: target_path.to_string(),
            sysfs,
            dump_usage: None,
        }
    }

    /// Also write the raw usage report to `path` on every poll.
    pub fn dump_usage_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.dump_usage = Some(path.into());
        self
    }

    pub async fn poll(&self) -> Result<PollSnapshot> {
        let command = self.command.clone();
        let raw = run_blocking(move || command.run()).await?;
        self.dump(&raw).await;

        let usage = parse_fs_usage(&self.target_path, &raw)?;
        let uuid = usage.id.clone();
        tracing::debug!("Usage report parsed for filesystem {uuid}");

        let (status, time_stats, devices, counters) = {
            let (root, id) = (self.sysfs.clone(), uuid.clone());
            let status = run_blocking(move || parse_status(&root, &id));
            let (root, id) = (self.sysfs.clone(), uuid.clone());
            let time_stats = run_blocking(move || parse_time_stats_dir(&root, &id));
            let (root, id) = (self.sysfs.clone(), uuid.clone());
            let devices = run_blocking(move || parse_devices(&root, &id));
            let (root, id) = (self.sysfs.clone(), uuid.clone());
            let counters = run_blocking(move || parse_counters(&root, &id));
            tokio::join!(status, time_stats, devices, counters)
        };

        Ok(PollSnapshot {
            usage,
            status: status?,
            time_stats: absent_as_empty(time_stats, "time_stats")?,
            devices: devices?,
            counters: absent_as_empty(counters, "counters")?,
            collected_at: Utc::now(),
        })
    }

    async fn dump(&self, raw: &str) {
        let Some(path) = &self.dump_usage else {
            return;
        };
        if let Some(parent) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                tracing::warn!("Failed to create {}: {e}", parent.display());
                return;
            }
        }
        if let Err(e) = tokio::fs::write(path, raw).await {
            tracing::warn!("Failed to dump usage report to {}: {e}", path.display());
        }
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))?
}

/// An unreadable optional directory yields an empty map. Errors from the
/// files inside it are wrapped with the file name and still fail the poll.
fn absent_as_empty<T: Default>(result: Result<T>, what: &str) -> Result<T> {
    match result {
        Err(Error::AbsentInput { path, .. }) => {
            tracing::debug!("{what} not available at {}", path.display());
            Ok(T::default())
        }
        other => other,
    }
}
