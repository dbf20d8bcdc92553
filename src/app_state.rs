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

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::collector::PollSnapshot;

/// State shared between the poll loop and the HTTP handlers.
///
/// `snapshot` always holds the last *successful* poll; a failed poll only
/// updates the bookkeeping fields, so scrapes keep serving stale data.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub snapshot: Option<PollSnapshot>,
    pub last_success: bool,
    pub last_error: Option<String>,
    pub poll_failures: u64,
    pub consecutive_failures: u32,
    pub last_poll: Option<DateTime<Utc>>,
    pub last_poll_duration: Option<Duration>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_success(&mut self, snapshot: PollSnapshot, elapsed: Duration) {
        self.last_poll = Some(snapshot.collected_at);
        self.snapshot = Some(snapshot);
        self.last_success = true;
        self.last_error = None;
        self.consecutive_failures = 0;
        self.last_poll_duration = Some(elapsed);
    }

    pub fn mark_failure(&mut self, error: String, elapsed: Duration) {
        self.last_success = false;
        self.last_error = Some(error);
        self.poll_failures += 1;
        self.consecutive_failures += 1;
        self.last_poll = Some(Utc::now());
        self.last_poll_duration = Some(elapsed);
    }
}
