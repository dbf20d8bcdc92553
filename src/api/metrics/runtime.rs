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

use crate::app_state::AppState;

use super::MetricExporter;

/// Health of the exporter itself.
pub struct RuntimeMetricExporter<'a> {
    state: &'a AppState,
}

impl<'a> RuntimeMetricExporter<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }
}

impl<'a> MetricExporter for RuntimeMetricExporter<'a> {
    fn export_metrics(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "# HELP bcachefs_exporter_build_info Exporter build information\n\
             # TYPE bcachefs_exporter_build_info gauge\n\
             bcachefs_exporter_build_info{{version=\"{}\"}} 1\n",
            env!("CARGO_PKG_VERSION")
        ));

        output.push_str(&format!(
            "# HELP bcachefs_exporter_last_poll_success Whether the last poll succeeded\n\
             # TYPE bcachefs_exporter_last_poll_success gauge\n\
             bcachefs_exporter_last_poll_success {}\n",
            u8::from(self.state.last_success)
        ));

        output.push_str(&format!(
            "# HELP bcachefs_exporter_poll_failures_total Failed polls since start\n\
             # TYPE bcachefs_exporter_poll_failures_total counter\n\
             bcachefs_exporter_poll_failures_total {}\n",
            self.state.poll_failures
        ));

        output.push_str(&format!(
            "# HELP bcachefs_exporter_consecutive_poll_failures Failed polls since the last success\n\
             # TYPE bcachefs_exporter_consecutive_poll_failures gauge\n\
             bcachefs_exporter_consecutive_poll_failures {}\n",
            self.state.consecutive_failures
        ));

        if let Some(last_poll) = self.state.last_poll {
            output.push_str(&format!(
                "# HELP bcachefs_exporter_last_poll_timestamp_seconds Unix time of the last poll\n\
                 # TYPE bcachefs_exporter_last_poll_timestamp_seconds gauge\n\
                 bcachefs_exporter_last_poll_timestamp_seconds {}\n",
                last_poll.timestamp()
            ));
        }

        if let Some(elapsed) = self.state.last_poll_duration {
            output.push_str(&format!(
                "# HELP bcachefs_exporter_last_poll_duration_seconds Wall time of the last poll\n\
                 # TYPE bcachefs_exporter_last_poll_duration_seconds gauge\n\
                 bcachefs_exporter_last_poll_duration_seconds {}\n",
                elapsed.as_secs_f64()
            ));
        }

        output
    }
}
