//! Probe and metrics endpoint
//!
//! Serves `/healthz`, `/readyz` and `/metrics` (Prometheus text format).

use crate::error::ControllerError;
use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Attempt outcome label values
pub const OUTCOME_SCHEDULED: &str = "scheduled";
pub const OUTCOME_UNSCHEDULABLE: &str = "unschedulable";
pub const OUTCOME_SKIPPED: &str = "skipped";
pub const OUTCOME_ERROR: &str = "error";

/// Scheduling metrics
pub struct Metrics {
    registry: Registry,
    attempts: IntCounterVec,
    hosts_claimed: IntCounter,
    label_patch_failures: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, ControllerError> {
        let registry = Registry::new_custom(Some("sip_scheduler".to_string()), None)?;
        let attempts = IntCounterVec::new(
            Opts::new("attempts_total", "SIPCluster reconciliations by outcome"),
            &["outcome"],
        )?;
        let hosts_claimed = IntCounter::with_opts(Opts::new("hosts_claimed_total", "BareMetalHosts claimed"))?;
        let label_patch_failures = IntCounter::with_opts(Opts::new(
            "label_patch_failures_total",
            "BareMetalHost label writes rejected by the API server",
        ))?;

        registry.register(Box::new(attempts.clone()))?;
        registry.register(Box::new(hosts_claimed.clone()))?;
        registry.register(Box::new(label_patch_failures.clone()))?;

        Ok(Self {
            registry,
            attempts,
            hosts_claimed,
            label_patch_failures,
        })
    }

    pub fn record_attempt(&self, outcome: &str) {
        self.attempts.with_label_values(&[outcome]).inc();
    }

    pub fn record_commit(&self, claimed: usize, failed: usize) {
        self.hosts_claimed.inc_by(claimed as u64);
        self.label_patch_failures.inc_by(failed as u64);
    }

    pub fn attempts(&self, outcome: &str) -> u64 {
        self.attempts.with_label_values(&[outcome]).get()
    }

    /// Encode every metric in the text exposition format
    pub fn render(&self) -> Result<String, ControllerError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("hosts_claimed", &self.hosts_claimed.get())
            .field("label_patch_failures", &self.label_patch_failures.get())
            .finish_non_exhaustive()
    }
}

/// State shared with the probe handlers
#[derive(Debug, Clone)]
pub struct ProbeState {
    pub metrics: Arc<Metrics>,
    pub ready: Arc<AtomicBool>,
}

async fn healthz() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

async fn readyz(State(state): State<ProbeState>) -> (StatusCode, &'static str) {
    if state.ready.load(Ordering::SeqCst) {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}

async fn metrics(State(state): State<ProbeState>) -> impl IntoResponse {
    match state.metrics.render() {
        Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, TextEncoder::new().format_type().to_string())], body),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string())],
            e.to_string(),
        ),
    }
}

pub fn router(state: ProbeState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve the probe endpoints until the listener fails
pub async fn serve(addr: SocketAddr, state: ProbeState) -> Result<(), ControllerError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Probe server listening on {}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}
