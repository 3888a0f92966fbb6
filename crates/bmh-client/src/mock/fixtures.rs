//! Test fixtures
//!
//! Builders for the objects the scheduler reads. Host `n` is named
//! `node{n:02}`, sits in rack `r{rack:02}` on its own server, and references
//! `node{n:02}-bmc-secret` and `node{n:02}-network-data`.

use super::MockBmhClient;
use crate::bmh_trait::SecretData;
use crds::labels::{FLAVOR_LABEL, RACK_LABEL, SERVER_LABEL};
use crds::{
    BareMetalHost, BareMetalHostSpec, BmcDetails, NamespacedName, NodeRole, NodeSet, SIPCluster, SIPClusterService,
    SIPClusterSpec, SchedulingPolicy, SecretReference,
};
use std::collections::BTreeMap;

/// Address every fixture host reports on `oam-ipv4`
pub const OAM_ADDRESS: &str = "32.68.51.139";

/// BMC username stored in fixture credential Secrets
pub const BMC_USERNAME: &str = "root";

/// BMC password stored in fixture credential Secrets
pub const BMC_PASSWORD: &str = "test";

/// Host name for fixture index `node`
pub fn host_name(node: usize) -> String {
    format!("node{:02}", node)
}

/// Rack label value for fixture rack `rack`
pub fn rack_name(rack: usize) -> String {
    format!("r{:02}", rack)
}

/// Build a host eligible for `role`, located in `rack`
pub fn create_bmh(node: usize, namespace: &str, role: NodeRole, rack: usize) -> BareMetalHost {
    let name = host_name(node);
    let mut host = BareMetalHost::new(
        &name,
        BareMetalHostSpec {
            online: true,
            bmc: Some(BmcDetails {
                address: format!("redfish+http://10.23.25.{}:8000/redfish/v1/Systems/{}", node, name),
                credentials_name: format!("{}-bmc-secret", name),
                disable_certificate_verification: false,
            }),
            boot_mac_address: Some(format!("52:54:00:00:00:{:02x}", node)),
            network_data: Some(SecretReference {
                name: format!("{}-network-data", name),
                namespace: Some(namespace.to_string()),
            }),
        },
    );
    host.metadata.namespace = Some(namespace.to_string());

    let mut labels = BTreeMap::new();
    labels.insert(FLAVOR_LABEL.to_string(), role.as_str().to_string());
    labels.insert(RACK_LABEL.to_string(), rack_name(rack));
    labels.insert(SERVER_LABEL.to_string(), format!("{}s{:02}", rack_name(rack), node));
    host.metadata.labels = Some(labels);
    host
}

/// BMC credential Secret payload
pub fn create_bmc_secret(username: &str, password: &str) -> SecretData {
    let mut data = SecretData::new();
    data.insert("username".to_string(), username.as_bytes().to_vec());
    data.insert("password".to_string(), password.as_bytes().to_vec());
    data
}

/// Network data document in the OpenStack `network_data.json` layout
pub fn network_data_document(oam_address: &str) -> String {
    serde_json::json!({
        "links": [
            { "id": "eno3", "type": "phy", "ethernet_mac_address": "52:54:00:00:00:01", "mtu": 1500 }
        ],
        "networks": [
            {
                "id": "oam-ipv4",
                "type": "ipv4",
                "link": "eno3",
                "ip_address": format!("{}/26", oam_address),
                "routes": [
                    { "network": "0.0.0.0", "netmask": "0.0.0.0", "gateway": "32.68.51.129" }
                ]
            },
            {
                "id": "pxe-ipv4",
                "type": "ipv4",
                "link": "eno3",
                "ip_address": "172.3.3.4",
                "netmask": "255.255.255.128"
            }
        ],
        "services": [
            { "address": "135.188.162.12", "type": "dns" }
        ]
    })
    .to_string()
}

/// Network data Secret payload
pub fn create_network_data_secret(document: &str) -> SecretData {
    let mut data = SecretData::new();
    data.insert("networkData".to_string(), document.as_bytes().to_vec());
    data
}

/// Build a request for `control_planes` control-plane and `workers` worker hosts
pub fn create_sip_cluster(name: &str, namespace: &str, control_planes: u32, workers: u32) -> SIPCluster {
    let mut nodes = BTreeMap::new();
    nodes.insert(
        NodeRole::ControlPlane,
        NodeSet {
            count: control_planes,
            ..Default::default()
        },
    );
    nodes.insert(
        NodeRole::Worker,
        NodeSet {
            count: workers,
            ..Default::default()
        },
    );

    let mut sip = SIPCluster::new(
        name,
        SIPClusterSpec {
            nodes,
            ..Default::default()
        },
    );
    sip.metadata.namespace = Some(namespace.to_string());
    sip.metadata.generation = Some(1);
    sip
}

/// Set the spread policy for one role of a request
pub fn with_policy(mut sip: SIPCluster, role: NodeRole, policy: SchedulingPolicy) -> SIPCluster {
    sip.spec.nodes.entry(role).or_default().scheduling = policy;
    sip
}

/// Load balancer bound to `interface`
pub fn load_balancer(interface: &str) -> SIPClusterService {
    SIPClusterService {
        image: "haproxy:2.6".to_string(),
        node_labels: BTreeMap::new(),
        node_port: 30000,
        node_interface: interface.to_string(),
    }
}

impl MockBmhClient {
    /// Add a fixture host together with its credential and network data Secrets
    pub fn add_node(&self, node: usize, namespace: &str, role: NodeRole, rack: usize) -> NamespacedName {
        let name = host_name(node);
        self.add_secret(
            NamespacedName::new(namespace, format!("{}-bmc-secret", name)),
            create_bmc_secret(BMC_USERNAME, BMC_PASSWORD),
        );
        self.add_secret(
            NamespacedName::new(namespace, format!("{}-network-data", name)),
            create_network_data_secret(&network_data_document(OAM_ADDRESS)),
        );
        self.add_host(create_bmh(node, namespace, role, rack))
    }
}
