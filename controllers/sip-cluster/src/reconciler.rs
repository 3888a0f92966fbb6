//! Reconciliation logic for SIPCluster resources.
//!
//! Each reconcile runs at most one scheduling attempt and translates its
//! outcome into a requeue decision:
//! - already scheduled for the current generation: skip, await change
//! - scheduled: await change
//! - unschedulable or label writes pending: requeue after a fixed delay
//! - error: handled by the watcher's error policy with per-request backoff

use crate::backoff::FibonacciBackoff;
use crate::error::ControllerError;
use crate::metrics::{Metrics, OUTCOME_ERROR, OUTCOME_SCHEDULED, OUTCOME_SKIPPED, OUTCOME_UNSCHEDULABLE};
use crds::{NamespacedName, SIPCluster};
use kube_runtime::controller::Action;
use sip_scheduler::{Scheduler, SchedulerError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Error backoff for one request
#[derive(Debug, Clone)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
}

impl BackoffState {
    fn new(min_minutes: u64, max_minutes: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_minutes, max_minutes),
            error_count: 0,
        }
    }
}

/// Reconciles SIPCluster resources.
pub struct Reconciler {
    scheduler: Scheduler,
    metrics: Arc<Metrics>,
    unschedulable_requeue: Duration,
    backoff_min_minutes: u64,
    backoff_max_minutes: u64,
    /// Error backoff per request (namespace/name -> BackoffState)
    backoff_states: Mutex<HashMap<String, BackoffState>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("unschedulable_requeue", &self.unschedulable_requeue)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(
        scheduler: Scheduler,
        metrics: Arc<Metrics>,
        unschedulable_requeue: Duration,
        backoff_min_minutes: u64,
        backoff_max_minutes: u64,
    ) -> Self {
        Self {
            scheduler,
            metrics,
            unschedulable_requeue,
            backoff_min_minutes,
            backoff_max_minutes,
            backoff_states: Mutex::new(HashMap::new()),
        }
    }

    /// Reconciles a SIPCluster resource.
    pub async fn reconcile_sip_cluster(&self, sip: &SIPCluster) -> Result<Action, ControllerError> {
        let key = NamespacedName::from_resource(sip, "default")
            .ok_or_else(|| SchedulerError::InvalidRequest("SIPCluster has no name".to_string()))?
            .to_string();

        if sip.is_scheduled() {
            debug!("SIPCluster {} already scheduled for generation {:?}", key, sip.metadata.generation);
            self.metrics.record_attempt(OUTCOME_SKIPPED);
            return Ok(Action::await_change());
        }

        info!("Reconciling SIPCluster {}", key);
        let outcome = match self.scheduler.schedule(sip).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.increment_error(&key);
                self.metrics.record_attempt(OUTCOME_ERROR);
                return Err(e.into());
            }
        };
        self.reset_error(&key);
        self.metrics
            .record_commit(outcome.report.claimed.len(), outcome.report.failed.len());

        for error in &outcome.host_errors {
            warn!("SIPCluster {}: {}", key, error);
        }
        if !outcome.report.is_complete() {
            warn!(
                "SIPCluster {}: {} host label writes were rejected",
                key,
                outcome.report.failed.len()
            );
        }

        if outcome.is_scheduled() {
            self.metrics.record_attempt(OUTCOME_SCHEDULED);
            for host in &outcome.hosts {
                info!(
                    "SIPCluster {}: claimed {} as {} (addresses {:?})",
                    key,
                    host.id,
                    host.role.map(|r| r.as_str()).unwrap_or("-"),
                    host.data.ip_on_interface
                );
            }
            Ok(Action::await_change())
        } else {
            self.metrics.record_attempt(OUTCOME_UNSCHEDULABLE);
            info!(
                "SIPCluster {} unschedulable ({}), retrying in {:?}",
                key,
                outcome.reason(),
                self.unschedulable_requeue
            );
            Ok(Action::requeue(self.unschedulable_requeue))
        }
    }

    /// Next error backoff for a request
    ///
    /// Returns the delay and the number of consecutive errors seen.
    pub fn get_backoff_for_resource(&self, resource_key: &str) -> (Duration, u32) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states
                    .entry(resource_key.to_string())
                    .or_insert_with(|| BackoffState::new(self.backoff_min_minutes, self.backoff_max_minutes));
                (state.backoff.next_delay(), state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, using default backoff", e);
                (Duration::from_secs(self.backoff_min_minutes * 60), 0)
            }
        }
    }

    fn increment_error(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states
                .entry(resource_key.to_string())
                .or_insert_with(|| BackoffState::new(self.backoff_min_minutes, self.backoff_max_minutes))
                .error_count += 1;
        }
    }

    fn reset_error(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            if let Some(state) = states.get_mut(resource_key) {
                state.backoff.reset();
                state.error_count = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bmh_client::MockBmhClient;
    use bmh_client::mock::fixtures::create_sip_cluster;
    use crds::{Condition, NodeRole, ReadyReason, SIPClusterStatus};

    // Load the status the store holds, as the watcher would see it
    fn refresh(mock: &MockBmhClient, sip: &mut SIPCluster) {
        let request = NamespacedName::from_resource(sip, "default").unwrap();
        sip.status = Some(SIPClusterStatus {
            conditions: mock.conditions(&request),
        });
    }

    fn reconciler(mock: &MockBmhClient) -> Reconciler {
        Reconciler::new(
            Scheduler::new(Arc::new(mock.clone())),
            Arc::new(Metrics::new().unwrap()),
            Duration::from_secs(60),
            1,
            10,
        )
    }

    #[tokio::test]
    async fn test_scheduled_request_awaits_change() {
        let mock = MockBmhClient::new();
        mock.add_node(1, "default", NodeRole::Worker, 1);
        let sip = create_sip_cluster("subcluster-1", "default", 0, 1);
        mock.add_request(&sip);
        let reconciler = reconciler(&mock);

        let action = reconciler.reconcile_sip_cluster(&sip).await.unwrap();

        assert_eq!(action, Action::await_change());
        assert_eq!(mock.claimed_hosts().len(), 1);
        assert_eq!(reconciler.metrics.attempts(OUTCOME_SCHEDULED), 1);
    }

    #[tokio::test]
    async fn test_unschedulable_request_requeues() {
        let mock = MockBmhClient::new();
        mock.add_node(1, "default", NodeRole::Worker, 1);
        let sip = create_sip_cluster("subcluster-1", "default", 0, 2);
        mock.add_request(&sip);
        let reconciler = reconciler(&mock);

        let action = reconciler.reconcile_sip_cluster(&sip).await.unwrap();

        assert_eq!(action, Action::requeue(Duration::from_secs(60)));
        assert_eq!(reconciler.metrics.attempts(OUTCOME_UNSCHEDULABLE), 1);
    }

    #[tokio::test]
    async fn test_scheduled_generation_is_skipped() {
        let mock = MockBmhClient::new();
        mock.add_node(1, "default", NodeRole::Worker, 1);
        let mut sip = create_sip_cluster("subcluster-1", "default", 0, 1);
        sip.status = Some(SIPClusterStatus {
            conditions: vec![Condition::ready(true, ReadyReason::Scheduled, "").with_observed_generation(Some(1))],
        });
        let reconciler = reconciler(&mock);

        let action = reconciler.reconcile_sip_cluster(&sip).await.unwrap();

        assert_eq!(action, Action::await_change());
        assert!(mock.claimed_hosts().is_empty());
        assert_eq!(mock.label_patches(), 0);
        assert_eq!(reconciler.metrics.attempts(OUTCOME_SKIPPED), 1);
    }

    #[tokio::test]
    async fn test_errors_grow_backoff_until_success() {
        let mock = MockBmhClient::new();
        mock.add_node(1, "default", NodeRole::Worker, 1);
        mock.fail_listing(true);
        let sip = create_sip_cluster("subcluster-1", "default", 0, 1);
        mock.add_request(&sip);
        let reconciler = reconciler(&mock);
        let key = "default/subcluster-1";

        assert!(reconciler.reconcile_sip_cluster(&sip).await.is_err());
        assert!(reconciler.reconcile_sip_cluster(&sip).await.is_err());
        assert_eq!(reconciler.get_backoff_for_resource(key), (Duration::from_secs(60), 2));
        assert_eq!(reconciler.get_backoff_for_resource(key), (Duration::from_secs(60), 2));
        assert_eq!(reconciler.get_backoff_for_resource(key).0, Duration::from_secs(120));
        assert_eq!(reconciler.metrics.attempts(OUTCOME_ERROR), 2);

        mock.fail_listing(false);
        reconciler.reconcile_sip_cluster(&sip).await.unwrap();
        assert_eq!(reconciler.get_backoff_for_resource(key), (Duration::from_secs(60), 0));
    }

    #[tokio::test]
    async fn test_rejected_claim_is_retried_until_complete() {
        let mock = MockBmhClient::new();
        let first = mock.add_node(1, "default", NodeRole::Worker, 1);
        mock.add_node(2, "default", NodeRole::Worker, 2);
        mock.fail_label_patches_for(first.clone());
        let mut sip = create_sip_cluster("subcluster-1", "default", 0, 2);
        mock.add_request(&sip);
        let reconciler = reconciler(&mock);

        let action = reconciler.reconcile_sip_cluster(&sip).await.unwrap();
        assert_eq!(action, Action::requeue(Duration::from_secs(60)));
        assert_eq!(mock.owned_hosts("subcluster-1").len(), 1);

        refresh(&mock, &mut sip);
        assert!(!sip.is_scheduled());
        mock.allow_label_patches_for(&first);
        let action = reconciler.reconcile_sip_cluster(&sip).await.unwrap();

        assert_eq!(action, Action::await_change());
        assert_eq!(mock.owned_hosts("subcluster-1").len(), 2);
        refresh(&mock, &mut sip);
        assert!(sip.is_scheduled());
    }

    #[tokio::test]
    async fn test_new_generation_reuses_owned_hosts() {
        let mock = MockBmhClient::new();
        for node in 1..=4 {
            mock.add_node(node, "default", NodeRole::Worker, node);
        }
        let mut sip = create_sip_cluster("subcluster-1", "default", 0, 2);
        mock.add_request(&sip);
        let reconciler = reconciler(&mock);

        reconciler.reconcile_sip_cluster(&sip).await.unwrap();
        let before = mock.owned_hosts("subcluster-1");

        refresh(&mock, &mut sip);
        sip.metadata.generation = Some(2);
        let action = reconciler.reconcile_sip_cluster(&sip).await.unwrap();

        assert_eq!(action, Action::await_change());
        assert_eq!(mock.owned_hosts("subcluster-1"), before);
        assert_eq!(mock.claimed_hosts().len(), 2);
        refresh(&mock, &mut sip);
        assert!(sip.is_scheduled());
    }

    #[tokio::test]
    async fn test_unnamed_request_is_rejected() {
        let mock = MockBmhClient::new();
        let mut sip = create_sip_cluster("subcluster-1", "default", 0, 1);
        sip.metadata.name = None;

        let result = reconciler(&mock).reconcile_sip_cluster(&sip).await;
        assert!(matches!(
            result,
            Err(ControllerError::Scheduler(SchedulerError::InvalidRequest(_)))
        ));
    }
}
