//! Main controller implementation.
//!
//! Wires the store client, scheduler and reconciler together, then runs the
//! `SIPCluster` watcher alongside the probe server.

use crate::config::Config;
use crate::error::ControllerError;
use crate::metrics::{self, Metrics, ProbeState};
use crate::reconciler::Reconciler;
use crate::watcher::Watcher;
use bmh_client::BmhClient;
use crds::SIPCluster;
use kube::{Api, Client};
use sip_scheduler::Scheduler;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;
use tracing::info;

/// Main controller for SIPCluster scheduling.
pub struct Controller {
    sip_cluster_watcher: JoinHandle<Result<(), ControllerError>>,
    probe_server: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance and starts its background tasks.
    pub async fn new(config: Config) -> Result<Self, ControllerError> {
        info!("Initializing SIPCluster Controller");

        let kube_client = Client::try_default().await?;

        let store = BmhClient::new(kube_client.clone(), config.namespace.clone());
        let scheduler = Scheduler::new(Arc::new(store));
        let metrics = Arc::new(Metrics::new()?);

        let reconciler = Arc::new(Reconciler::new(
            scheduler,
            metrics.clone(),
            config.unschedulable_requeue,
            config.backoff_min_minutes,
            config.backoff_max_minutes,
        ));

        let sip_cluster_api: Api<SIPCluster> = match config.namespace.as_deref() {
            Some(ns) => Api::namespaced(kube_client, ns),
            None => Api::all(kube_client),
        };

        let watcher = Watcher::new(reconciler, sip_cluster_api);
        let sip_cluster_watcher = tokio::spawn(async move { watcher.watch_sip_clusters().await });

        let ready = Arc::new(AtomicBool::new(false));
        let probe_state = ProbeState {
            metrics,
            ready: ready.clone(),
        };
        let metrics_addr = config.metrics_addr;
        let probe_server = tokio::spawn(async move { metrics::serve(metrics_addr, probe_state).await });
        ready.store(true, Ordering::SeqCst);

        Ok(Self {
            sip_cluster_watcher,
            probe_server,
        })
    }

    /// Runs the controller until either background task exits.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("SIPCluster Controller running");

        tokio::select! {
            result = &mut self.sip_cluster_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("SIPCluster watcher panicked: {}", e)))??;
            }
            result = &mut self.probe_server => {
                result.map_err(|e| ControllerError::Watch(format!("Probe server panicked: {}", e)))??;
            }
        }

        Ok(())
    }
}
