//! Mock BmhClient for unit testing
//!
//! In-memory implementation of `BmhClientTrait` so the scheduler can be
//! tested without a Kubernetes API server. Besides storing objects it can
//! count Secret reads, reject label writes for chosen hosts, and fail host
//! listing, which lets tests drive the failure paths.
//!
//! - `fixtures.rs` - Builders for hosts, Secrets and `SIPCluster` requests

pub mod fixtures;

use crate::bmh_trait::{BmhClientTrait, LabelPatch, SecretData};
use crate::error::BmhError;
use crds::labels::{is_claimed, is_owned_by};
use crds::{BareMetalHost, CONDITION_TYPE_READY, Condition, NamespacedName, SIPCluster, find_condition, set_condition};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Mock BmhClient for testing
#[derive(Clone, Default)]
pub struct MockBmhClient {
    pub(crate) hosts: Arc<Mutex<BTreeMap<NamespacedName, BareMetalHost>>>,
    pub(crate) secrets: Arc<Mutex<BTreeMap<NamespacedName, SecretData>>>,
    pub(crate) requests: Arc<Mutex<BTreeMap<NamespacedName, Vec<Condition>>>>,
    // Hosts whose label writes are rejected with a conflict
    pub(crate) conflicting: Arc<Mutex<BTreeSet<NamespacedName>>>,
    pub(crate) fail_list: Arc<AtomicBool>,
    pub(crate) secret_reads: Arc<AtomicUsize>,
    pub(crate) label_patches: Arc<AtomicUsize>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockBmhClient {
    /// Create an empty mock store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a host
    pub fn add_host(&self, host: BareMetalHost) -> NamespacedName {
        let key = host_key(&host);
        lock(&self.hosts).insert(key.clone(), host);
        key
    }

    /// Add or replace a Secret
    pub fn add_secret(&self, key: NamespacedName, data: SecretData) {
        lock(&self.secrets).insert(key, data);
    }

    /// Remove a Secret
    pub fn remove_secret(&self, key: &NamespacedName) {
        lock(&self.secrets).remove(key);
    }

    /// Register a scheduling request so its status can be patched
    pub fn add_request(&self, request: &SIPCluster) -> NamespacedName {
        let key = NamespacedName::from_resource(request, "default")
            .unwrap_or_else(|| NamespacedName::new("default", ""));
        let conditions = request.status.as_ref().map(|s| s.conditions.clone()).unwrap_or_default();
        lock(&self.requests).insert(key.clone(), conditions);
        key
    }

    /// Reject label writes on a host with a conflict
    pub fn fail_label_patches_for(&self, host: NamespacedName) {
        lock(&self.conflicting).insert(host);
    }

    /// Accept label writes on a host again
    pub fn allow_label_patches_for(&self, host: &NamespacedName) {
        lock(&self.conflicting).remove(host);
    }

    /// Make host listing fail
    pub fn fail_listing(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// Current state of a host
    pub fn host(&self, key: &NamespacedName) -> Option<BareMetalHost> {
        lock(&self.hosts).get(key).cloned()
    }

    /// Current labels of a host (empty if the host is unknown)
    pub fn labels(&self, key: &NamespacedName) -> BTreeMap<String, String> {
        lock(&self.hosts)
            .get(key)
            .and_then(|h| h.metadata.labels.clone())
            .unwrap_or_default()
    }

    /// Hosts currently labeled as claimed
    pub fn claimed_hosts(&self) -> Vec<NamespacedName> {
        lock(&self.hosts)
            .iter()
            .filter(|(_, h)| is_claimed(h.metadata.labels.as_ref()))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Hosts currently claimed by the named request
    pub fn owned_hosts(&self, owner: &str) -> Vec<NamespacedName> {
        lock(&self.hosts)
            .iter()
            .filter(|(_, h)| is_owned_by(h.metadata.labels.as_ref(), owner))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Conditions recorded on a request
    pub fn conditions(&self, request: &NamespacedName) -> Vec<Condition> {
        lock(&self.requests).get(request).cloned().unwrap_or_default()
    }

    /// Ready condition recorded on a request
    pub fn ready_condition(&self, request: &NamespacedName) -> Option<Condition> {
        find_condition(&self.conditions(request), CONDITION_TYPE_READY).cloned()
    }

    /// Number of `get_secret` calls served so far
    pub fn secret_reads(&self) -> usize {
        self.secret_reads.load(Ordering::SeqCst)
    }

    /// Number of `patch_host_labels` calls served so far
    pub fn label_patches(&self) -> usize {
        self.label_patches.load(Ordering::SeqCst)
    }
}

impl MockBmhClient {
    fn list_where(&self, keep: impl Fn(&BareMetalHost) -> bool) -> Result<Vec<BareMetalHost>, BmhError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(BmhError::Api("BareMetalHost list (503): service unavailable".to_string()));
        }
        Ok(lock(&self.hosts).values().filter(|h| keep(h)).cloned().collect())
    }
}

fn host_key(host: &BareMetalHost) -> NamespacedName {
    NamespacedName::from_resource(host, "default").unwrap_or_else(|| NamespacedName::new("default", ""))
}

#[async_trait::async_trait]
impl BmhClientTrait for MockBmhClient {
    async fn list_unclaimed_hosts(&self) -> Result<Vec<BareMetalHost>, BmhError> {
        self.list_where(|h| !is_claimed(h.metadata.labels.as_ref()))
    }

    async fn list_owned_hosts(&self, owner: &str) -> Result<Vec<BareMetalHost>, BmhError> {
        self.list_where(|h| is_owned_by(h.metadata.labels.as_ref(), owner))
    }

    async fn get_secret(&self, secret: &NamespacedName) -> Result<SecretData, BmhError> {
        self.secret_reads.fetch_add(1, Ordering::SeqCst);
        lock(&self.secrets)
            .get(secret)
            .cloned()
            .ok_or_else(|| BmhError::NotFound(format!("Secret {}", secret)))
    }

    async fn patch_host_labels(&self, host: &NamespacedName, labels: &LabelPatch) -> Result<(), BmhError> {
        self.label_patches.fetch_add(1, Ordering::SeqCst);
        if lock(&self.conflicting).contains(host) {
            return Err(BmhError::Conflict(format!("BareMetalHost {}: object has been modified", host)));
        }

        let mut hosts = lock(&self.hosts);
        let stored = hosts
            .get_mut(host)
            .ok_or_else(|| BmhError::NotFound(format!("BareMetalHost {}", host)))?;
        let current = stored.metadata.labels.get_or_insert_with(BTreeMap::new);
        for (key, value) in labels {
            match value {
                Some(value) => {
                    current.insert(key.clone(), value.clone());
                }
                None => {
                    current.remove(key);
                }
            }
        }
        Ok(())
    }

    async fn patch_request_status(&self, request: &NamespacedName, condition: Condition) -> Result<(), BmhError> {
        let mut requests = lock(&self.requests);
        let conditions = requests
            .get_mut(request)
            .ok_or_else(|| BmhError::NotFound(format!("SIPCluster {}", request)))?;
        set_condition(conditions, condition);
        Ok(())
    }
}
