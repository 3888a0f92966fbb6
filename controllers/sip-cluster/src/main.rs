//! SIPCluster Controller
//!
//! Schedules unclaimed metal3 `BareMetalHost`s into the control-plane and
//! worker node sets requested by `SIPCluster` resources. Claims are recorded
//! as labels on the hosts; the outcome is reported on the request's Ready
//! condition.

mod backoff;
mod config;
mod controller;
mod error;
mod metrics;
mod reconciler;
mod watcher;

use crate::config::Config;
use crate::error::ControllerError;
use controller::Controller;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("A rustls crypto provider was already installed");
    }

    info!("Starting SIPCluster Controller");

    let config = Config::from_env()?;
    info!("Configuration:");
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Probe address: {}", config.metrics_addr);
    info!("  Unschedulable requeue: {:?}", config.unschedulable_requeue);
    info!(
        "  Error backoff: {}m..{}m",
        config.backoff_min_minutes, config.backoff_max_minutes
    );

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
