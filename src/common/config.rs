use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Cli;
use crate::error::{Error, Result};
use crate::utils::find_executable;

/// Application configuration constants
pub struct AppConfig;

impl AppConfig {
    // Server
    pub const DEFAULT_LISTEN_ADDR: &'static str = "0.0.0.0:9091";
    pub const METRICS_CONTENT_TYPE: &'static str = "text/plain; version=0.0.4; charset=utf-8";

    // Polling
    pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
    pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 8;

    // Inputs
    pub const DEFAULT_BCACHEFS_BIN: &'static str = "bcachefs";
    pub const DEFAULT_SYSFS_ROOT: &'static str = "/sys/fs/bcachefs";

    // Logging
    pub const DEFAULT_LOG_FILTER: &'static str = "bcachefs_exporter=info,tower_http=info";
}

/// Validated runtime configuration built from the command line.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub target_path: String,
    pub listen: SocketAddr,
    pub interval: Duration,
    pub poll_timeout: Duration,
    pub bcachefs_bin: PathBuf,
    pub sysfs_root: PathBuf,
    pub exit_on_error: bool,
    pub dump_usage: Option<PathBuf>,
    pub log_filter: String,
}

impl ExporterConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        if cli.target_path.trim().is_empty() {
            return Err(Error::Config("target path must not be empty".to_string()));
        }
        if cli.interval == 0 {
            return Err(Error::Config("interval must be at least 1 second".to_string()));
        }
        if cli.poll_timeout == 0 || cli.poll_timeout > cli.interval {
            return Err(Error::Config(format!(
                "poll timeout must be between 1 and the interval ({}s), got {}s",
                cli.interval, cli.poll_timeout
            )));
        }
        let bcachefs_bin = find_executable(&cli.bcachefs_bin).ok_or_else(|| {
            Error::Config(format!("'{}' not found or not executable", cli.bcachefs_bin))
        })?;

        Ok(Self {
            target_path: cli.target_path.clone(),
            listen: cli.listen,
            interval: Duration::from_secs(cli.interval),
            poll_timeout: Duration::from_secs(cli.poll_timeout),
            bcachefs_bin,
            sysfs_root: cli.sysfs_root.clone(),
            exit_on_error: cli.exit_on_error,
            dump_usage: cli.dump_usage.clone(),
            log_filter: cli
                .log_level
                .clone()
                .unwrap_or_else(|| AppConfig::DEFAULT_LOG_FILTER.to_string()),
        })
    }
}
