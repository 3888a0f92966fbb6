//! Kubernetes resource watcher.
//!
//! Drives reconciliation of `SIPCluster` resources with
//! `kube_runtime::Controller`, which handles reconnection and requeues.

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crds::{NamespacedName, SIPCluster};
use futures::StreamExt;
use kube::Api;
use kube_runtime::controller::{Action, Config as ControllerConfig};
use kube_runtime::{Controller, watcher};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Watches SIPCluster resources for changes.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    sip_cluster_api: Api<SIPCluster>,
}

async fn reconcile(sip: Arc<SIPCluster>, reconciler: Arc<Reconciler>) -> Result<Action, ControllerError> {
    debug!("Reconciling SIPCluster {:?}", sip.metadata.name);
    reconciler.reconcile_sip_cluster(&sip).await
}

fn error_policy(sip: Arc<SIPCluster>, error: &ControllerError, reconciler: Arc<Reconciler>) -> Action {
    let key = NamespacedName::from_resource(sip.as_ref(), "default")
        .map(|id| id.to_string())
        .unwrap_or_default();
    let (delay, error_count) = reconciler.get_backoff_for_resource(&key);
    error!(
        "Reconciliation error for SIPCluster {} (attempt {}), retrying in {:?}: {}",
        key, error_count, delay, error
    );
    Action::requeue(delay)
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(reconciler: Arc<Reconciler>, sip_cluster_api: Api<SIPCluster>) -> Self {
        Self {
            reconciler,
            sip_cluster_api,
        }
    }

    /// Starts watching SIPCluster resources.
    ///
    /// Debounce batches bursts of events for one request; concurrency bounds
    /// how many attempts run at once.
    pub async fn watch_sip_clusters(&self) -> Result<(), ControllerError> {
        info!("Starting SIPCluster watcher");

        let controller_config = ControllerConfig::default()
            .debounce(Duration::from_secs(5))
            .concurrency(3);

        Controller::new(self.sip_cluster_api.clone(), watcher::Config::default())
            .with_config(controller_config)
            .run(reconcile, error_policy, self.reconciler.clone())
            .for_each(|res| async move {
                match res {
                    Ok((obj, _action)) => debug!("Reconciled SIPCluster {}", obj.name),
                    Err(e) => error!("Controller error for SIPCluster: {}", e),
                }
            })
            .await;

        Err(ControllerError::Watch("SIPCluster controller stream ended".to_string()))
    }
}
