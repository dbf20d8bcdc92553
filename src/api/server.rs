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

use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::handlers::{health_handler, metrics_handler, snapshot_handler, SharedState};
use crate::app_state::AppState;
use crate::collector::Collector;
use crate::common::config::ExporterConfig;
use crate::error::{Error, Result};

/// Install the global tracing subscriber. `RUST_LOG` wins over `default_filter`.
pub fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(health_handler))
        .route("/snapshot.json", get(snapshot_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Run one poll under the configured timeout and record the outcome.
pub async fn poll_once(collector: &Collector, state: &SharedState, config: &ExporterConfig) -> Result<()> {
    let started = Instant::now();
    let result = match tokio::time::timeout(config.poll_timeout, collector.poll()).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout(config.poll_timeout)),
    };
    let elapsed = started.elapsed();

    let mut state = state.write().await;
    match result {
        Ok(snapshot) => {
            tracing::info!(
                "Parsed {} in {:.3}s ({} devices)",
                snapshot.usage.id,
                elapsed.as_secs_f64(),
                snapshot.devices.len()
            );
            state.mark_success(snapshot, elapsed);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Poll of {} failed: {e}", config.target_path);
            state.mark_failure(e.to_string(), elapsed);
            Err(e)
        }
    }
}

/// Poll forever, strictly one poll at a time.
///
/// Returns only with `exit_on_error`, carrying the first failure.
async fn poll_loop(collector: Collector, state: SharedState, config: ExporterConfig) -> Result<()> {
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        // The first tick completes immediately.
        ticker.tick().await;
        if let Err(e) = poll_once(&collector, &state, &config).await {
            if config.exit_on_error {
                return Err(e);
            }
        }
    }
}

/// Start the poll loop and serve metrics until Ctrl+C, or until a poll fails
/// under `exit_on_error`.
pub async fn run_exporter(config: ExporterConfig) -> Result<()> {
    init_tracing(&config.log_filter);

    tracing::info!(
        "Exporting bcachefs metrics for {} every {}s",
        config.target_path,
        config.interval.as_secs()
    );
    let state = SharedState::new(RwLock::new(AppState::new()));
    let collector = Collector::new(&config);

    let listen = config.listen;
    let poller = poll_loop(collector, state.clone(), config);

    tokio::select! {
        result = poller => result,
        result = run_tcp_listener(router(state), listen) => result,
    }
}

async fn run_tcp_listener(app: Router, addr: SocketAddr) -> Result<()> {
    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind TCP listener on {addr}: {e}");
            return Err(e.into());
        }
    };
    if let Ok(local) = listener.local_addr() {
        tracing::info!("Metrics server listening on {local}");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Metrics server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}
