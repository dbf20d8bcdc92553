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

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::common::config::AppConfig;

/// Export bcachefs usage and sysfs statistics in Prometheus format.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Mount point of the bcachefs filesystem to report on.
    #[arg(short, long)]
    pub target_path: String,
    /// Address the metrics server listens on.
    #[arg(short, long, default_value = AppConfig::DEFAULT_LISTEN_ADDR)]
    pub listen: SocketAddr,
    /// The interval in seconds between polls.
    #[arg(short, long, default_value_t = AppConfig::DEFAULT_POLL_INTERVAL_SECS)]
    pub interval: u64,
    /// Upper bound in seconds for a single poll; must not exceed the interval.
    #[arg(long, default_value_t = AppConfig::DEFAULT_POLL_TIMEOUT_SECS)]
    pub poll_timeout: u64,
    /// The bcachefs tool, either a path or a name looked up on PATH.
    #[arg(long, default_value = AppConfig::DEFAULT_BCACHEFS_BIN)]
    pub bcachefs_bin: String,
    /// Root of the bcachefs sysfs hierarchy.
    #[arg(long, default_value = AppConfig::DEFAULT_SYSFS_ROOT)]
    pub sysfs_root: PathBuf,
    /// Exit with a non-zero status on the first failed poll instead of keeping stale metrics.
    #[arg(long)]
    pub exit_on_error: bool,
    /// Write the raw output of every usage report to this file.
    #[arg(long)]
    pub dump_usage: Option<PathBuf>,
    /// Log filter used when RUST_LOG is not set (e.g. "debug" or "bcachefs_exporter=trace").
    #[arg(long)]
    pub log_level: Option<String>,
}
