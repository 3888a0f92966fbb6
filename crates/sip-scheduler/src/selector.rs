//! Constraint-aware host selection
//!
//! Greedy placement over the candidate pool. Roles are processed in
//! scheduling order. The pool tags each host with at most one role, so the
//! roles draw from disjoint candidate sets and a host is never selected
//! twice. Within a role at most one host is accepted per server, and under
//! rack anti-affinity at most one per rack. Candidates are visited in
//! identity order, which makes the outcome reproducible.
//!
//! Selection is all-or-nothing: the first role that cannot be filled fails
//! the whole decision.

use crate::pool::CandidatePool;
use crds::{NamespacedName, NodeRole, ReadyReason, SIPCluster, SchedulingPolicy};
use std::collections::{BTreeMap, BTreeSet};

/// Outcome of selection for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementDecision {
    /// Every node set is filled
    Scheduled {
        selected: BTreeMap<NodeRole, Vec<NamespacedName>>,
        /// Hosts considered but not selected
        rejected: Vec<NamespacedName>,
    },
    /// No complete assignment exists
    Unschedulable {
        /// Role that could not be filled (`None` when there were no candidates at all)
        role: Option<NodeRole>,
        reason: ReadyReason,
        message: String,
    },
}

impl PlacementDecision {
    pub fn is_scheduled(&self) -> bool {
        matches!(self, Self::Scheduled { .. })
    }

    /// Role a host was selected for, if any
    pub fn role_of(&self, id: &NamespacedName) -> Option<NodeRole> {
        match self {
            Self::Scheduled { selected, .. } => selected
                .iter()
                .find(|(_, ids)| ids.contains(id))
                .map(|(role, _)| *role),
            Self::Unschedulable { .. } => None,
        }
    }

    /// Total number of selected hosts
    pub fn selected_count(&self) -> usize {
        match self {
            Self::Scheduled { selected, .. } => selected.values().map(Vec::len).sum(),
            Self::Unschedulable { .. } => 0,
        }
    }

    /// Reason written to the Ready condition
    pub fn reason(&self) -> ReadyReason {
        match self {
            Self::Scheduled { .. } => ReadyReason::Scheduled,
            Self::Unschedulable { reason, .. } => *reason,
        }
    }
}

/// Choose hosts for every node set of `request`
pub fn select(pool: &CandidatePool, request: &SIPCluster) -> PlacementDecision {
    let mut taken: BTreeSet<NamespacedName> = BTreeSet::new();
    let mut selected: BTreeMap<NodeRole, Vec<NamespacedName>> = BTreeMap::new();

    for role in NodeRole::ALL {
        let Some(node_set) = request.node_set(role) else {
            continue;
        };
        let required = node_set.count as usize;
        if required == 0 {
            selected.insert(role, Vec::new());
            continue;
        }

        let mut servers = BTreeSet::new();
        let mut racks = BTreeSet::new();
        let mut eligible = 0usize;
        let mut chosen = Vec::new();

        for host in pool.candidates(role) {
            eligible += 1;
            if chosen.len() == required {
                continue;
            }
            if servers.contains(&host.server) {
                continue;
            }
            if node_set.scheduling == SchedulingPolicy::RackAntiAffinity {
                match &host.rack {
                    Some(rack) if !racks.contains(rack) => {
                        racks.insert(rack.clone());
                    }
                    _ => continue,
                }
            }
            servers.insert(host.server.clone());
            chosen.push(host.id.clone());
        }

        if chosen.len() < required {
            let reason = if eligible < required {
                match role {
                    NodeRole::ControlPlane => ReadyReason::InsufficientControlPlaneNodes,
                    NodeRole::Worker => ReadyReason::InsufficientWorkerNodes,
                }
            } else {
                ReadyReason::AffinityConstraintUnsatisfiable
            };
            return PlacementDecision::Unschedulable {
                role: Some(role),
                reason,
                message: format!(
                    "{} requires {} hosts: {} eligible, {} selectable under {:?} placement",
                    role,
                    required,
                    eligible,
                    chosen.len(),
                    node_set.scheduling
                ),
            };
        }

        taken.extend(chosen.iter().cloned());
        selected.insert(role, chosen);
    }

    let rejected = pool
        .considered()
        .into_iter()
        .filter(|id| !taken.contains(id))
        .collect();
    PlacementDecision::Scheduled { selected, rejected }
}
