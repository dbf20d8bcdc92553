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

//! Readers for the per-filesystem sysfs hierarchy (`/sys/fs/bcachefs/<uuid>/`).
//!
//! File access lives here; the submodules expose pure `parse_*` functions over
//! file contents plus thin directory walkers built on [`SysfsRoot`].

pub mod counters;
pub mod dev;
pub mod status;
pub mod time_stats;

use std::fs;
use std::path::{Path, PathBuf};

use crate::common::config::AppConfig;
use crate::error::{Error, Result};

/// Root of the bcachefs sysfs tree. Tests point this at a temporary directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysfsRoot {
    root: PathBuf,
}

impl Default for SysfsRoot {
    fn default() -> Self {
        Self::new(AppConfig::DEFAULT_SYSFS_ROOT)
    }
}

impl SysfsRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Directory of one filesystem instance.
    pub fn fs_dir(&self, uuid: &str) -> PathBuf {
        self.root.join(uuid)
    }
}

/// Read a whole file. Every I/O failure is reported as [`Error::AbsentInput`].
pub fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::AbsentInput {
        path: path.to_path_buf(),
        source,
    })
}

/// Read `dir/name` and parse it, tagging any failure with `name`.
pub fn parse_file<T>(dir: &Path, name: &str, parse: impl FnOnce(&str) -> Result<T>) -> Result<T> {
    let text = read_file(&dir.join(name)).map_err(|e| e.in_file(name))?;
    parse(&text).map_err(|e| e.in_file(name))
}

/// Like [`parse_file`], but a file that cannot be read yields `Ok(None)`.
pub fn parse_optional<T>(
    dir: &Path,
    name: &str,
    parse: impl FnOnce(&str) -> Result<T>,
) -> Result<Option<T>> {
    let path = dir.join(name);
    let text = match read_file(&path) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!("optional sysfs file not available: {e}");
            return Ok(None);
        }
    };
    parse(&text).map(Some).map_err(|e| e.in_file(name))
}

/// List a directory as `(entry name, path)` pairs sorted by name.
pub fn list_dir(path: &Path) -> Result<Vec<(String, PathBuf)>> {
    let absent = |source| Error::AbsentInput {
        path: path.to_path_buf(),
        source,
    };
    let mut entries = Vec::new();
    for entry in fs::read_dir(path).map_err(absent)? {
        let entry = entry.map_err(absent)?;
        let name = entry.file_name().to_string_lossy().into_owned();
        entries.push((name, entry.path()));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

/// Parse every entry of a directory into a name-keyed map.
pub(crate) fn parse_dir_entries<T>(
    dir: &Path,
    parse: impl Fn(&str) -> Result<T>,
) -> Result<std::collections::BTreeMap<String, T>> {
    let mut parsed = std::collections::BTreeMap::new();
    for (name, path) in list_dir(dir)? {
        let text = read_file(&path).map_err(|e| e.in_file(name.as_str()))?;
        let value = parse(&text).map_err(|e| e.in_file(name.as_str()))?;
        parsed.insert(name, value);
    }
    Ok(parsed)
}
