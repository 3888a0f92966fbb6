//! Kubernetes-backed store client
//!
//! Implements `BmhClientTrait` with kube-rs: hosts are metal3
//! `BareMetalHost` objects, credentials and network data are core Secrets,
//! and scheduling requests are `SIPCluster` objects.

use crate::bmh_trait::{BmhClientTrait, LabelPatch, SecretData};
use crate::error::BmhError;
use crds::labels::{owner_selector, unclaimed_selector};
use crds::{BareMetalHost, Condition, NamespacedName, SIPCluster, set_condition};
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::Client;
use tracing::debug;

/// Store client
#[derive(Clone)]
pub struct BmhClient {
    client: Client,
    namespace: Option<String>,
}

impl std::fmt::Debug for BmhClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BmhClient")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl BmhClient {
    /// Create a new store client
    ///
    /// # Arguments
    /// * `client` - Kubernetes client
    /// * `namespace` - Namespace to list hosts from (`None` lists across all namespaces)
    pub fn new(client: Client, namespace: Option<String>) -> Self {
        Self { client, namespace }
    }

    /// Namespace hosts are listed from, if restricted
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    fn host_api(&self) -> Api<BareMetalHost> {
        match self.namespace.as_deref() {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }
}

#[async_trait::async_trait]
impl BmhClientTrait for BmhClient {
    async fn list_unclaimed_hosts(&self) -> Result<Vec<BareMetalHost>, BmhError> {
        let selector = unclaimed_selector();
        let lp = ListParams::default().labels(&selector);
        let hosts = self
            .host_api()
            .list(&lp)
            .await
            .map_err(|e| BmhError::from_kube(e, "BareMetalHost list"))?;

        debug!("Listed {} BareMetalHosts matching {}", hosts.items.len(), selector);
        Ok(hosts.items)
    }

    async fn list_owned_hosts(&self, owner: &str) -> Result<Vec<BareMetalHost>, BmhError> {
        let selector = owner_selector(owner);
        let lp = ListParams::default().labels(&selector);
        let hosts = self
            .host_api()
            .list(&lp)
            .await
            .map_err(|e| BmhError::from_kube(e, "BareMetalHost list"))?;

        debug!("Listed {} BareMetalHosts claimed by {}", hosts.items.len(), owner);
        Ok(hosts.items)
    }

    async fn get_secret(&self, secret: &NamespacedName) -> Result<SecretData, BmhError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &secret.namespace);
        let found = api
            .get(&secret.name)
            .await
            .map_err(|e| BmhError::from_kube(e, &format!("Secret {}", secret)))?;

        debug!("Fetched Secret {}", secret);
        Ok(found
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(key, value)| (key, value.0))
            .collect())
    }

    async fn patch_host_labels(&self, host: &NamespacedName, labels: &LabelPatch) -> Result<(), BmhError> {
        let api: Api<BareMetalHost> = Api::namespaced(self.client.clone(), &host.namespace);
        // JSON merge patch: null values delete the label
        let patch = serde_json::json!({
            "metadata": {
                "labels": labels
            }
        });

        api.patch(&host.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| BmhError::from_kube(e, &format!("BareMetalHost {}", host)))?;

        debug!("Patched labels on BareMetalHost {}", host);
        Ok(())
    }

    async fn patch_request_status(&self, request: &NamespacedName, condition: Condition) -> Result<(), BmhError> {
        let api: Api<SIPCluster> = Api::namespaced(self.client.clone(), &request.namespace);
        let current = api
            .get_status(&request.name)
            .await
            .map_err(|e| BmhError::from_kube(e, &format!("SIPCluster {}", request)))?;

        // Merge patches replace lists wholesale, so send the full condition set
        let mut conditions = current.status.map(|s| s.conditions).unwrap_or_default();
        set_condition(&mut conditions, condition);
        let patch = serde_json::json!({
            "status": {
                "conditions": conditions
            }
        });

        api.patch_status(&request.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| BmhError::from_kube(e, &format!("SIPCluster {}", request)))?;

        debug!("Updated SIPCluster {} conditions", request);
        Ok(())
    }
}
