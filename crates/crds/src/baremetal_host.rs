//! BareMetalHost (metal3.io)
//!
//! Subset of the metal3 `BareMetalHost` resource read by the scheduler.
//! The CRD itself is owned by the baremetal-operator; unknown fields are
//! ignored on deserialization.

use crate::references::{NamespacedName, SecretReference};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "metal3.io",
    version = "v1alpha1",
    kind = "BareMetalHost",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct BareMetalHostSpec {
    /// Whether the host should be powered on
    #[serde(default)]
    pub online: bool,

    /// BMC connection details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bmc: Option<BmcDetails>,

    /// MAC address of the NIC used to provision the host
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "bootMACAddress")]
    #[schemars(rename = "bootMACAddress")]
    pub boot_mac_address: Option<String>,

    /// Secret holding the host's network data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_data: Option<SecretReference>,
}

/// BMC connection details
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BmcDetails {
    /// BMC URL (e.g. `redfish+https://10.0.0.10/redfish/v1/Systems/1`)
    #[serde(default)]
    pub address: String,

    /// Name of the Secret, in the host's namespace, holding `username` and `password`
    #[serde(default)]
    pub credentials_name: String,

    /// Skip TLS verification when talking to the BMC
    #[serde(default)]
    pub disable_certificate_verification: bool,
}

impl BareMetalHost {
    /// Resolved reference to the network data Secret
    pub fn network_data_ref(&self) -> Option<NamespacedName> {
        let namespace = self.metadata.namespace.as_deref().unwrap_or("default");
        self.spec.network_data.as_ref()?.resolve(namespace)
    }

    /// Resolved reference to the BMC credentials Secret
    pub fn credentials_ref(&self) -> Option<NamespacedName> {
        let namespace = self.metadata.namespace.as_deref().unwrap_or("default");
        self.spec
            .bmc
            .as_ref()
            .filter(|bmc| !bmc.credentials_name.is_empty())
            .map(|bmc| NamespacedName::new(namespace, bmc.credentials_name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserializes_metal3_host() {
        let host: BareMetalHost = serde_json::from_value(serde_json::json!({
            "apiVersion": "metal3.io/v1alpha1",
            "kind": "BareMetalHost",
            "metadata": { "name": "node01", "namespace": "default" },
            "spec": {
                "online": true,
                "bootMACAddress": "52:54:00:00:00:01",
                "bmc": {
                    "address": "redfish+http://10.23.25.1:8000/redfish/v1/Systems/node01",
                    "credentialsName": "node01-bmc-secret"
                },
                "networkData": { "name": "node01-network-data", "namespace": "metal3" },
                "image": { "url": "http://example.com/image.qcow2" }
            }
        }))
        .unwrap();

        assert_eq!(host.spec.boot_mac_address.as_deref(), Some("52:54:00:00:00:01"));
        assert_eq!(host.network_data_ref(), Some(NamespacedName::new("metal3", "node01-network-data")));
        assert_eq!(host.credentials_ref(), Some(NamespacedName::new("default", "node01-bmc-secret")));
    }

    #[test]
    fn test_missing_references() {
        let host = BareMetalHost::new("node02", BareMetalHostSpec::default());
        assert_eq!(host.network_data_ref(), None);
        assert_eq!(host.credentials_ref(), None);
    }
}
