use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::api::metrics::counters::CounterMetricExporter;
use crate::api::metrics::device::DeviceMetricExporter;
use crate::api::metrics::runtime::RuntimeMetricExporter;
use crate::api::metrics::status::StatusMetricExporter;
use crate::api::metrics::time_stats::TimeStatsMetricExporter;
use crate::api::metrics::usage::UsageMetricExporter;
use crate::api::metrics::{FsLabels, MetricExporter};
use crate::app_state::AppState;
use crate::collector::PollSnapshot;
use crate::common::config::AppConfig;

pub type SharedState = Arc<RwLock<AppState>>;

/// Render the whole exposition for one state.
///
/// Filesystem families come from the last successful snapshot and are
/// omitted entirely until the first poll succeeds.
pub fn render_metrics(state: &AppState) -> String {
    let mut metrics = String::new();

    if let Some(snapshot) = &state.snapshot {
        metrics.push_str(&render_snapshot(snapshot));
    }
    metrics.push_str(&RuntimeMetricExporter::new(state).export_metrics());

    metrics
}

pub fn render_snapshot(snapshot: &PollSnapshot) -> String {
    let fs = FsLabels::new(&snapshot.usage);
    let exporters: [&dyn MetricExporter; 5] = [
        &UsageMetricExporter::new(&snapshot.usage),
        &StatusMetricExporter::new(fs, &snapshot.status),
        &TimeStatsMetricExporter::new(fs, &snapshot.time_stats),
        &DeviceMetricExporter::new(fs, &snapshot.devices),
        &CounterMetricExporter::new(fs, &snapshot.counters),
    ];

    exporters
        .iter()
        .map(|exporter| exporter.export_metrics())
        .collect()
}

pub async fn metrics_handler(State(state): State<SharedState>) -> Response {
    let state = state.read().await;
    let body = render_metrics(&state);
    (
        [(header::CONTENT_TYPE, AppConfig::METRICS_CONTENT_TYPE)],
        body,
    )
        .into_response()
}

/// 200 when the last poll succeeded, 503 otherwise.
pub async fn health_handler(State(state): State<SharedState>) -> Response {
    let state = state.read().await;
    if state.last_success {
        (StatusCode::OK, "ok\n").into_response()
    } else {
        let reason = state.last_error.as_deref().unwrap_or("no successful poll yet");
        (StatusCode::SERVICE_UNAVAILABLE, format!("{reason}\n")).into_response()
    }
}

/// The last successful snapshot as JSON, for debugging parser output.
pub async fn snapshot_handler(State(state): State<SharedState>) -> Response {
    let state = state.read().await;
    match &state.snapshot {
        Some(snapshot) => Json(snapshot).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "no successful poll yet\n").into_response(),
    }
}
