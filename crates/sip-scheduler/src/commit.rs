//! Decision commit
//!
//! Writes a placement decision back to the store. Every host the attempt
//! considered is labeled: selected hosts as claimed by the request, all
//! others as released. Label writes are independent per host; a rejected
//! write is logged and left for the next attempt. The request's Ready
//! condition is written last, and is True only when the labels in the store
//! match the decision for every host the request holds or should hold.

use crate::error::SchedulerError;
use crate::host::HostStatus;
use crate::pool::CandidatePool;
use crate::selector::PlacementDecision;
use bmh_client::{BmhClientTrait, BmhError, LabelPatch};
use crds::labels::{CLAIMED, NODE_ROLE_LABEL, RELEASED, SCHEDULE_CLAIMED_LABEL, SCHEDULE_OWNER_LABEL};
use crds::{Condition, NamespacedName, NodeRole, ReadyReason};
use tracing::{info, warn};

/// Per-host results of a commit
#[derive(Debug, Default)]
pub struct CommitReport {
    pub claimed: Vec<NamespacedName>,
    pub released: Vec<NamespacedName>,
    /// Hosts whose label write was rejected
    pub failed: Vec<(NamespacedName, BmhError)>,
    /// Selected hosts left unclaimed and previously owned hosts left claimed
    pub pending: Vec<NamespacedName>,
}

impl CommitReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Returns true when the request's claims match the decision
    pub fn is_settled(&self) -> bool {
        self.pending.is_empty()
    }

    /// Reason recorded on the Ready condition for `decision`
    pub fn ready_reason(&self, decision: &PlacementDecision) -> ReadyReason {
        if decision.is_scheduled() && !self.is_settled() {
            ReadyReason::LabelWritesPending
        } else {
            decision.reason()
        }
    }
}

/// Applies decisions for one request
pub struct Committer<'a> {
    store: &'a dyn BmhClientTrait,
    request: &'a NamespacedName,
    generation: Option<i64>,
}

impl<'a> Committer<'a> {
    pub fn new(store: &'a dyn BmhClientTrait, request: &'a NamespacedName, generation: Option<i64>) -> Self {
        Self {
            store,
            request,
            generation,
        }
    }

    /// Label every considered host and set the Ready condition
    ///
    /// Hosts claimed successfully are moved to `HostStatus::Scheduled`.
    /// Returns an error only when the status write fails.
    pub async fn commit(
        &self,
        pool: &mut CandidatePool,
        decision: &PlacementDecision,
    ) -> Result<CommitReport, SchedulerError> {
        let mut report = CommitReport::default();

        for id in pool.considered() {
            let selected = decision.role_of(&id);
            let result = match selected {
                Some(role) => {
                    let result = self.store.patch_host_labels(&id, &self.claim_patch(role)).await;
                    if result.is_ok() {
                        if let Some(host) = pool.get_mut(&id) {
                            host.status = HostStatus::Scheduled;
                        }
                        report.claimed.push(id.clone());
                    }
                    result
                }
                None => {
                    let result = self.store.patch_host_labels(&id, &release_patch()).await;
                    if result.is_ok() {
                        report.released.push(id.clone());
                    }
                    result
                }
            };

            if let Err(e) = result {
                warn!("Failed to label host {} for {}: {}", id, self.request, e);
                if selected.is_some() || pool.was_owned(&id) {
                    report.pending.push(id.clone());
                }
                report.failed.push((id, e));
            }
        }

        let condition = match decision {
            PlacementDecision::Scheduled { .. } if !report.is_settled() => Condition::ready(
                false,
                report.ready_reason(decision),
                format!(
                    "Label writes rejected for {} hosts, retrying: {}",
                    report.pending.len(),
                    report
                        .pending
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            ),
            PlacementDecision::Scheduled { .. } => Condition::ready(
                true,
                ReadyReason::Scheduled,
                format!("Scheduled {} hosts", decision.selected_count()),
            ),
            PlacementDecision::Unschedulable { reason, message, .. } => {
                Condition::ready(false, *reason, message.clone())
            }
        };
        self.set_ready(condition).await?;

        info!(
            "Committed {} for {}: {} claimed, {} released, {} failed",
            report.ready_reason(decision),
            self.request,
            report.claimed.len(),
            report.released.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Report an attempt that found no unclaimed hosts
    pub async fn commit_no_candidates(&self) -> Result<(), SchedulerError> {
        self.set_ready(Condition::ready(
            false,
            ReadyReason::NoCandidates,
            "Every BareMetalHost is already claimed",
        ))
        .await
    }

    async fn set_ready(&self, condition: Condition) -> Result<(), SchedulerError> {
        let condition = condition.with_observed_generation(self.generation);
        self.store.patch_request_status(self.request, condition).await?;
        Ok(())
    }

    fn claim_patch(&self, role: NodeRole) -> LabelPatch {
        let mut patch = LabelPatch::new();
        patch.insert(SCHEDULE_CLAIMED_LABEL.to_string(), Some(CLAIMED.to_string()));
        patch.insert(SCHEDULE_OWNER_LABEL.to_string(), Some(self.request.name.clone()));
        patch.insert(NODE_ROLE_LABEL.to_string(), Some(role.as_str().to_string()));
        patch
    }
}

fn release_patch() -> LabelPatch {
    let mut patch = LabelPatch::new();
    patch.insert(SCHEDULE_CLAIMED_LABEL.to_string(), Some(RELEASED.to_string()));
    patch.insert(SCHEDULE_OWNER_LABEL.to_string(), None);
    patch.insert(NODE_ROLE_LABEL.to_string(), None);
    patch
}
