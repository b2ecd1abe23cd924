//! Probe and scrape endpoints for the watcher
//!
//! Both probes report every watch stage with its current failure streak.
//! Liveness fails once a stage has failed long enough to count as unhealthy,
//! so the kubelet replaces a watcher that can no longer reach the cluster.

use anyhow::Context;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};
use watcher_lib::{ComponentHealth, ComponentStatus, HealthRegistry, WatcherMetrics};

/// State shared by the probe handlers
#[derive(Clone)]
pub struct ApiState {
    pub health: HealthRegistry,
    /// Held so the watcher metric families exist before the first scrape
    pub metrics: WatcherMetrics,
}

impl ApiState {
    pub fn new(health: HealthRegistry, metrics: WatcherMetrics) -> Self {
        Self { health, metrics }
    }
}

/// One watch stage as seen by a probe
#[derive(Debug, Serialize)]
struct StageReport {
    status: ComponentStatus,
    consecutive_failures: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_error: Option<String>,
}

impl From<ComponentHealth> for StageReport {
    fn from(health: ComponentHealth) -> Self {
        Self {
            status: health.status,
            consecutive_failures: health.consecutive_failures,
            last_error: health.message,
        }
    }
}

#[derive(Debug, Serialize)]
struct ProbeBody {
    ok: bool,
    status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    stages: BTreeMap<String, StageReport>,
}

impl IntoResponse for ProbeBody {
    fn into_response(self) -> Response {
        let code = if self.ok {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        (code, Json(self)).into_response()
    }
}

/// Snapshot the registry; `ok` and `reason` are filled in by the probe
async fn probe(health: &HealthRegistry) -> ProbeBody {
    let snapshot = health.health().await;
    ProbeBody {
        ok: snapshot.status.is_operational(),
        status: snapshot.status,
        reason: None,
        stages: snapshot
            .components
            .into_iter()
            .map(|(name, stage)| (name, stage.into()))
            .collect(),
    }
}

async fn liveness(State(state): State<ApiState>) -> ProbeBody {
    let mut body = probe(&state.health).await;
    if !body.ok {
        body.reason = unhealthy_stages(&body);
    }
    body
}

async fn readiness(State(state): State<ApiState>) -> ProbeBody {
    let ready = state.health.readiness().await;
    let mut body = probe(&state.health).await;
    body.ok = ready.ready;
    body.reason = ready.reason;
    body
}

fn unhealthy_stages(body: &ProbeBody) -> Option<String> {
    let names: Vec<&str> = body
        .stages
        .iter()
        .filter(|(_, stage)| stage.status == ComponentStatus::Unhealthy)
        .map(|(name, _)| name.as_str())
        .collect();
    (!names.is_empty()).then(|| format!("failing stages: {}", names.join(", ")))
}

async fn scrape() -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    match encoder.encode(&prometheus::gather(), &mut buffer) {
        Ok(()) => (
            [(header::CONTENT_TYPE, encoder.format_type().to_string())],
            buffer,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/healthz", get(liveness))
        .route("/readyz", get(readiness))
        .route("/metrics", get(scrape))
        .with_state(state)
}

/// Bind `port` on all interfaces and serve until the task is aborted
pub async fn serve(port: u16, state: ApiState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind API port {port}"))?;
    info!(port, "Serving probes and metrics");

    axum::serve(listener, router(state))
        .await
        .context("API server stopped")
}
