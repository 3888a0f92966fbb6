//! Candidate pool
//!
//! The working set of one scheduling attempt: every host not claimed by any
//! request, plus the hosts the request itself already holds, keyed by
//! identity. Built fresh per attempt and never cached.

use crate::error::SchedulerError;
use crate::host::{Host, HostStatus};
use bmh_client::BmhClientTrait;
use crds::labels::{is_claimed, is_owned_by};
use crds::{BareMetalHost, NamespacedName, NodeRole, SIPCluster};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Hosts considered by one attempt
#[derive(Debug, Default)]
pub struct CandidatePool {
    hosts: BTreeMap<NamespacedName, Host>,
    // Records that failed admission; released at commit but never selected
    invalid: BTreeSet<NamespacedName>,
    ineligible: BTreeSet<NamespacedName>,
    // Hosts claimed by the request when the attempt started
    owned: BTreeSet<NamespacedName>,
}

impl CandidatePool {
    /// List hosts available to `request` and admit them as candidates
    ///
    /// Available hosts are the unclaimed ones and the ones `request` already
    /// claims, so a rerun re-decides its own hosts instead of claiming a
    /// second set. Each host is tagged with the first role (in scheduling
    /// order) whose node set selects it. Fails with `NoCandidates` when no
    /// host is available.
    pub async fn build(store: &dyn BmhClientTrait, request: &SIPCluster) -> Result<Self, SchedulerError> {
        let owner = request.metadata.name.as_deref().unwrap_or_default();

        let mut records: BTreeMap<NamespacedName, BareMetalHost> = BTreeMap::new();
        let mut owned = BTreeSet::new();
        for bmh in store.list_unclaimed_hosts().await? {
            if is_claimed(bmh.metadata.labels.as_ref()) {
                continue;
            }
            if let Some(id) = NamespacedName::from_resource(&bmh, "default") {
                records.insert(id, bmh);
            }
        }
        for bmh in store.list_owned_hosts(owner).await? {
            if !is_owned_by(bmh.metadata.labels.as_ref(), owner) {
                continue;
            }
            if let Some(id) = NamespacedName::from_resource(&bmh, "default") {
                owned.insert(id.clone());
                records.insert(id, bmh);
            }
        }
        if records.is_empty() {
            return Err(SchedulerError::NoCandidates);
        }

        let mut pool = Self {
            owned,
            ..Self::default()
        };
        for (id, bmh) in records {
            let role = role_for(request, &bmh);
            match Host::new(bmh, role, HostStatus::NotScheduled) {
                Ok(host) => pool.insert(host),
                Err(e) => {
                    warn!("Excluding host from scheduling: {}", e);
                    pool.invalid.insert(id);
                }
            }
        }

        debug!(
            "Built candidate pool: {} hosts, {} invalid, {} already owned by {}",
            pool.hosts.len(),
            pool.invalid.len(),
            pool.owned.len(),
            owner
        );
        Ok(pool)
    }

    /// Add a host, replacing any host with the same identity
    pub fn insert(&mut self, host: Host) {
        self.hosts.insert(host.id.clone(), host);
    }

    /// Returns true when a record for `bmh` is already tracked
    pub fn contains_host(&self, bmh: &BareMetalHost) -> bool {
        self.hosts.values().any(|host| host.is_record(bmh))
    }

    pub fn get(&self, id: &NamespacedName) -> Option<&Host> {
        self.hosts.get(id)
    }

    pub fn get_mut(&mut self, id: &NamespacedName) -> Option<&mut Host> {
        self.hosts.get_mut(id)
    }

    /// Admitted hosts in identity order
    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.values()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Exclude a host from selection for the rest of the attempt
    pub fn mark_ineligible(&mut self, id: &NamespacedName) {
        if self.hosts.contains_key(id) {
            self.ineligible.insert(id.clone());
        }
    }

    pub fn is_eligible(&self, id: &NamespacedName) -> bool {
        self.hosts.contains_key(id) && !self.ineligible.contains(id)
    }

    /// Eligible hosts tagged with `role`, in identity order
    pub fn candidates(&self, role: NodeRole) -> impl Iterator<Item = &Host> {
        self.hosts
            .values()
            .filter(move |host| host.role == Some(role) && !self.ineligible.contains(&host.id))
    }

    /// Every host the attempt considered, admitted or not
    pub fn considered(&self) -> BTreeSet<NamespacedName> {
        self.hosts.keys().chain(self.invalid.iter()).cloned().collect()
    }

    /// Records that failed admission
    pub fn invalid(&self) -> &BTreeSet<NamespacedName> {
        &self.invalid
    }

    /// Returns true when the request held a claim on the host before this attempt
    pub fn was_owned(&self, id: &NamespacedName) -> bool {
        self.owned.contains(id)
    }
}

fn role_for(request: &SIPCluster, bmh: &BareMetalHost) -> Option<NodeRole> {
    NodeRole::ALL.into_iter().find(|role| {
        request
            .node_set(*role)
            .is_some_and(|set| set.selects(*role, bmh.metadata.labels.as_ref()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bmh_client::mock::fixtures::{create_bmh, create_sip_cluster};
    use bmh_client::{LabelPatch, MockBmhClient};
    use crds::labels::{FLAVOR_LABEL, SCHEDULE_CLAIMED_LABEL, SCHEDULE_OWNER_LABEL};

    async fn claim(mock: &MockBmhClient, id: &NamespacedName) {
        claim_for(mock, id, "subcluster-2").await;
    }

    async fn claim_for(mock: &MockBmhClient, id: &NamespacedName, owner: &str) {
        let mut patch = LabelPatch::new();
        patch.insert(SCHEDULE_CLAIMED_LABEL.to_string(), Some("true".to_string()));
        patch.insert(SCHEDULE_OWNER_LABEL.to_string(), Some(owner.to_string()));
        mock.patch_host_labels(id, &patch).await.unwrap();
    }

    #[tokio::test]
    async fn test_build_tags_roles() {
        let mock = MockBmhClient::new();
        let cp = mock.add_node(1, "default", NodeRole::ControlPlane, 1);
        let worker = mock.add_node(2, "default", NodeRole::Worker, 2);
        let sip = create_sip_cluster("subcluster-1", "default", 1, 1);

        let pool = CandidatePool::build(&mock, &sip).await.unwrap();

        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get(&cp).unwrap().role, Some(NodeRole::ControlPlane));
        assert_eq!(pool.get(&worker).unwrap().role, Some(NodeRole::Worker));
        assert_eq!(pool.candidates(NodeRole::Worker).count(), 1);
    }

    #[tokio::test]
    async fn test_build_excludes_claimed_hosts() {
        let mock = MockBmhClient::new();
        let claimed = mock.add_node(1, "default", NodeRole::Worker, 1);
        mock.add_node(2, "default", NodeRole::Worker, 2);
        claim(&mock, &claimed).await;

        let pool = CandidatePool::build(&mock, &create_sip_cluster("subcluster-1", "default", 0, 1))
            .await
            .unwrap();

        assert_eq!(pool.len(), 1);
        assert!(pool.get(&claimed).is_none());
    }

    #[tokio::test]
    async fn test_build_admits_hosts_owned_by_request() {
        let mock = MockBmhClient::new();
        let mine = mock.add_node(1, "default", NodeRole::Worker, 1);
        let theirs = mock.add_node(2, "default", NodeRole::Worker, 2);
        let free = mock.add_node(3, "default", NodeRole::Worker, 3);
        claim_for(&mock, &mine, "subcluster-1").await;
        claim_for(&mock, &theirs, "subcluster-2").await;

        let pool = CandidatePool::build(&mock, &create_sip_cluster("subcluster-1", "default", 0, 1))
            .await
            .unwrap();

        assert_eq!(pool.considered(), BTreeSet::from([mine.clone(), free.clone()]));
        assert!(pool.was_owned(&mine));
        assert!(!pool.was_owned(&free));
        assert!(pool.get(&theirs).is_none());
        assert_eq!(pool.get(&mine).unwrap().role, Some(NodeRole::Worker));
    }

    #[tokio::test]
    async fn test_build_fails_without_candidates() {
        let mock = MockBmhClient::new();
        let only = mock.add_node(1, "default", NodeRole::Worker, 1);
        claim(&mock, &only).await;

        let result = CandidatePool::build(&mock, &create_sip_cluster("subcluster-1", "default", 0, 1)).await;
        assert!(matches!(result, Err(SchedulerError::NoCandidates)));
    }

    #[tokio::test]
    async fn test_build_propagates_list_failure() {
        let mock = MockBmhClient::new();
        mock.add_node(1, "default", NodeRole::Worker, 1);
        mock.fail_listing(true);

        let result = CandidatePool::build(&mock, &create_sip_cluster("subcluster-1", "default", 0, 1)).await;
        assert!(matches!(result, Err(SchedulerError::Store(_))));
    }

    #[tokio::test]
    async fn test_invalid_hosts_are_considered_but_not_admitted() {
        let mock = MockBmhClient::new();
        let mut bmh = create_bmh(1, "default", NodeRole::Worker, 1);
        bmh.spec.network_data = None;
        let invalid = mock.add_host(bmh);
        let valid = mock.add_node(2, "default", NodeRole::Worker, 2);

        let pool = CandidatePool::build(&mock, &create_sip_cluster("subcluster-1", "default", 0, 1))
            .await
            .unwrap();

        assert_eq!(pool.len(), 1);
        assert!(pool.invalid().contains(&invalid));
        assert_eq!(pool.considered(), BTreeSet::from([invalid, valid]));
    }

    #[tokio::test]
    async fn test_contains_host_and_eligibility() {
        let mock = MockBmhClient::new();
        let id = mock.add_node(1, "default", NodeRole::Worker, 1);
        let mut pool = CandidatePool::build(&mock, &create_sip_cluster("subcluster-1", "default", 0, 1))
            .await
            .unwrap();

        assert!(pool.contains_host(&mock.host(&id).unwrap()));
        assert!(!pool.contains_host(&create_bmh(9, "default", NodeRole::Worker, 1)));

        assert!(pool.is_eligible(&id));
        pool.mark_ineligible(&id);
        assert!(!pool.is_eligible(&id));
        assert_eq!(pool.candidates(NodeRole::Worker).count(), 0);
    }

    #[tokio::test]
    async fn test_host_matching_several_roles_takes_first() {
        let mock = MockBmhClient::new();
        let id = mock.add_node(1, "default", NodeRole::ControlPlane, 1);
        let mut sip = create_sip_cluster("subcluster-1", "default", 1, 1);
        if let Some(workers) = sip.spec.nodes.get_mut(&NodeRole::Worker) {
            workers.vm_flavor = Some(FLAVOR_LABEL.to_string());
        }

        let pool = CandidatePool::build(&mock, &sip).await.unwrap();
        assert_eq!(pool.get(&id).unwrap().role, Some(NodeRole::ControlPlane));
        assert_eq!(pool.candidates(NodeRole::ControlPlane).count(), 1);
        assert_eq!(pool.candidates(NodeRole::Worker).count(), 0);
    }

    #[tokio::test]
    async fn test_host_without_matching_role() {
        let mock = MockBmhClient::new();
        let id = mock.add_node(1, "default", NodeRole::ControlPlane, 1);
        let mut sip = create_sip_cluster("subcluster-1", "default", 0, 1);
        sip.spec.nodes.remove(&NodeRole::ControlPlane);

        let pool = CandidatePool::build(&mock, &sip).await.unwrap();
        assert_eq!(pool.get(&id).unwrap().role, None);
        assert_eq!(pool.candidates(NodeRole::ControlPlane).count(), 0);
    }
}
