//! Kubernetes object references used by the scheduler
//!
//! Provides the namespaced identity used as the key for hosts, secrets and
//! scheduling requests, plus the metal3-style secret reference embedded in
//! `BareMetalHost` specs.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespaced identity of a Kubernetes object
///
/// Ordering is namespace first, then name. The scheduler relies on this
/// ordering to iterate candidate hosts deterministically.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub struct NamespacedName {
    /// Namespace of the object
    pub namespace: String,

    /// Name of the object
    pub name: String,
}

impl NamespacedName {
    /// Create a new namespaced name
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Build the identity of an object from its metadata
    ///
    /// Returns `None` when the object has no name. A missing namespace falls
    /// back to `default_namespace`.
    pub fn from_resource<K: kube::Resource>(resource: &K, default_namespace: &str) -> Option<Self> {
        let meta = resource.meta();
        let name = meta.name.as_ref()?;
        let namespace = meta.namespace.as_deref().unwrap_or(default_namespace);
        Some(Self::new(namespace, name.clone()))
    }
}

impl fmt::Display for NamespacedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Reference to a Secret, as used by metal3 (`spec.networkData`)
///
/// The namespace is optional and defaults to the namespace of the
/// referencing resource.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SecretReference {
    /// Name of the Secret
    #[serde(default)]
    pub name: String,

    /// Namespace of the Secret (defaults to same namespace as the referencing resource)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl SecretReference {
    /// Resolve the reference against the namespace of the referencing resource
    ///
    /// Returns `None` when the reference does not name a Secret.
    pub fn resolve(&self, owner_namespace: &str) -> Option<NamespacedName> {
        if self.name.is_empty() {
            return None;
        }
        let namespace = match self.namespace.as_deref() {
            Some(ns) if !ns.is_empty() => ns,
            _ => owner_namespace,
        };
        Some(NamespacedName::new(namespace, self.name.clone()))
    }
}
