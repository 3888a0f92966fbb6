//! BmhClient trait for mocking
//!
//! This trait abstracts the resource store so the scheduling engine can be
//! exercised against an in-memory implementation in unit tests.
//! The concrete `BmhClient` implements it on top of the Kubernetes API.

use crate::error::BmhError;
use crds::{BareMetalHost, Condition, NamespacedName};
use std::collections::BTreeMap;

/// Label patch: `Some(value)` sets a label, `None` removes it
pub type LabelPatch = BTreeMap<String, Option<String>>;

/// Secret payload, keyed by data field
pub type SecretData = BTreeMap<String, Vec<u8>>;

/// Store operations consumed by the scheduler
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait BmhClientTrait: Send + Sync {
    /// List every host not labeled as claimed
    async fn list_unclaimed_hosts(&self) -> Result<Vec<BareMetalHost>, BmhError>;

    /// List every host currently claimed by the named request
    async fn list_owned_hosts(&self, owner: &str) -> Result<Vec<BareMetalHost>, BmhError>;

    /// Fetch a Secret's data
    ///
    /// Returns `BmhError::NotFound` when the Secret does not exist.
    async fn get_secret(&self, secret: &NamespacedName) -> Result<SecretData, BmhError>;

    /// Merge labels into a host
    ///
    /// Returns `BmhError::Conflict` when the store rejects the write.
    async fn patch_host_labels(&self, host: &NamespacedName, labels: &LabelPatch) -> Result<(), BmhError>;

    /// Upsert a condition on a `SIPCluster` status
    async fn patch_request_status(&self, request: &NamespacedName, condition: Condition) -> Result<(), BmhError>;
}
