//! Scheduling attempt
//!
//! Runs pool build, extrapolation, selection and commit for one request,
//! in sequence.

use crate::commit::{CommitReport, Committer};
use crate::error::SchedulerError;
use crate::extrapolate::Extrapolator;
use crate::host::Host;
use crate::pool::CandidatePool;
use crate::selector::{PlacementDecision, select};
use bmh_client::BmhClientTrait;
use crds::{NamespacedName, ReadyReason, SIPCluster};
use std::sync::Arc;
use tracing::{info, warn};

/// Result of one scheduling attempt
#[derive(Debug)]
pub struct ScheduleOutcome {
    pub decision: PlacementDecision,
    /// Claimed hosts with their resolved connection data
    pub hosts: Vec<Host>,
    pub report: CommitReport,
    /// Per-host failures that excluded hosts from selection
    pub host_errors: Vec<SchedulerError>,
}

impl ScheduleOutcome {
    /// Returns true when a complete decision was chosen and every claim landed
    pub fn is_scheduled(&self) -> bool {
        self.decision.is_scheduled() && self.report.is_settled()
    }

    /// Reason recorded on the Ready condition
    pub fn reason(&self) -> ReadyReason {
        self.report.ready_reason(&self.decision)
    }
}

/// Scheduling engine
#[derive(Clone)]
pub struct Scheduler {
    store: Arc<dyn BmhClientTrait>,
}

impl Scheduler {
    pub fn new(store: Arc<dyn BmhClientTrait>) -> Self {
        Self { store }
    }

    /// Run one scheduling attempt for `request`
    ///
    /// Unschedulable requests are not errors: they yield an outcome whose
    /// decision carries the reason. Errors are store failures that aborted
    /// the attempt, or a failed status write.
    pub async fn schedule(&self, request: &SIPCluster) -> Result<ScheduleOutcome, SchedulerError> {
        let request_id = NamespacedName::from_resource(request, "default")
            .ok_or_else(|| SchedulerError::InvalidRequest("SIPCluster has no name".to_string()))?;
        let store = self.store.as_ref();
        let committer = Committer::new(store, &request_id, request.metadata.generation);

        info!("Scheduling {} (generation {:?})", request_id, request.metadata.generation);
        let mut pool = match CandidatePool::build(store, request).await {
            Ok(pool) => pool,
            Err(SchedulerError::NoCandidates) => {
                warn!("No unclaimed hosts available for {}", request_id);
                committer.commit_no_candidates().await?;
                return Ok(ScheduleOutcome {
                    decision: PlacementDecision::Unschedulable {
                        role: None,
                        reason: ReadyReason::NoCandidates,
                        message: "Every BareMetalHost is already claimed".to_string(),
                    },
                    hosts: Vec::new(),
                    report: CommitReport::default(),
                    host_errors: Vec::new(),
                });
            }
            Err(e) => return Err(e),
        };

        let host_errors = extrapolate(store, &mut pool, request).await?;
        let decision = select(&pool, request);
        if let PlacementDecision::Unschedulable { message, .. } = &decision {
            warn!("Cannot schedule {}: {}", request_id, message);
        }

        let report = committer.commit(&mut pool, &decision).await?;
        let hosts = report
            .claimed
            .iter()
            .filter_map(|id| pool.get(id).cloned())
            .collect();

        Ok(ScheduleOutcome {
            decision,
            hosts,
            report,
            host_errors,
        })
    }
}

/// Resolve credentials and service addresses for every role-eligible host
///
/// Hosts that fail are marked ineligible; their errors are returned.
async fn extrapolate(
    store: &dyn BmhClientTrait,
    pool: &mut CandidatePool,
    request: &SIPCluster,
) -> Result<Vec<SchedulerError>, SchedulerError> {
    let extrapolator = Extrapolator::new(store);
    let interfaces = request.spec.services.node_interfaces();
    let ids: Vec<NamespacedName> = pool.hosts().filter(|h| h.role.is_some()).map(|h| h.id.clone()).collect();

    let mut host_errors = Vec::new();
    for id in ids {
        let Some(host) = pool.get_mut(&id) else {
            continue;
        };
        let mut result = extrapolator.resolve_credentials(host).await;
        if result.is_ok() && !interfaces.is_empty() {
            result = extrapolator.resolve_addresses(host, &interfaces).await;
        }

        match result {
            Ok(()) => {}
            Err(e) if e.is_host_error() => {
                warn!("Excluding host {} from selection: {}", id, e);
                pool.mark_ineligible(&id);
                host_errors.push(e);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(host_errors)
}
