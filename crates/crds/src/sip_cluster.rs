//! SIPCluster CRD
//!
//! Requests a sub-cluster: how many bare-metal hosts each node role needs,
//! how they must be spread, and which services will later be deployed on
//! them.

use crate::condition::{CONDITION_TYPE_READY, Condition, find_condition};
use crate::labels::FLAVOR_LABEL;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "dcops.microscaler.io",
    version = "v1alpha1",
    kind = "SIPCluster",
    namespaced,
    status = "SIPClusterStatus",
    shortname = "sip"
)]
#[serde(rename_all = "camelCase")]
pub struct SIPClusterSpec {
    /// Node sets keyed by role
    #[serde(default)]
    pub nodes: BTreeMap<NodeRole, NodeSet>,

    /// Services that will run on the scheduled hosts
    #[serde(default)]
    pub services: SIPClusterServices,
}

/// Logical role a host is scheduled to serve
///
/// Ordering matters: control-plane node sets are scheduled first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum NodeRole {
    /// Control-plane node
    ControlPlane,

    /// Worker node
    Worker,
}

impl NodeRole {
    /// Every role, in scheduling order
    pub const ALL: [NodeRole; 2] = [NodeRole::ControlPlane, NodeRole::Worker];

    /// Role string as used in labels and selectors
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ControlPlane => "control-plane",
            Self::Worker => "worker",
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Placement rule for one node set
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SchedulingPolicy {
    /// Only the server exclusion rule applies
    #[default]
    #[serde(rename = "none")]
    Unconstrained,

    /// At most one host per rack
    RackAntiAffinity,
}

/// Requirements for one role
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeSet {
    /// Label selector (`key=value` or `key`) choosing eligible hosts
    ///
    /// Defaults to `dcops.microscaler.io/flavor=<role>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_flavor: Option<String>,

    /// Spread policy
    #[serde(default)]
    pub scheduling: SchedulingPolicy,

    /// Number of hosts required
    #[serde(default)]
    pub count: u32,
}

impl NodeSet {
    /// Label key and optional value this node set selects on
    pub fn flavor_selector(&self, role: NodeRole) -> (String, Option<String>) {
        match self.vm_flavor.as_deref().map(str::trim) {
            Some(selector) if !selector.is_empty() => match selector.split_once('=') {
                Some((key, value)) => (key.trim().to_string(), Some(value.trim().to_string())),
                None => (selector.to_string(), None),
            },
            _ => (FLAVOR_LABEL.to_string(), Some(role.as_str().to_string())),
        }
    }

    /// Returns true when a host with these labels is eligible for the node set
    pub fn selects(&self, role: NodeRole, labels: Option<&BTreeMap<String, String>>) -> bool {
        let (key, value) = self.flavor_selector(role);
        match (labels.and_then(|l| l.get(&key)), value) {
            (Some(actual), Some(expected)) => *actual == expected,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

/// Services deployed on top of the scheduled hosts
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SIPClusterServices {
    /// Load balancers in front of the sub-cluster
    #[serde(default)]
    pub load_balancer: Vec<SIPClusterService>,

    /// Jump hosts giving operators access to the sub-cluster
    #[serde(default)]
    pub jump_host: Vec<SIPClusterService>,
}

impl SIPClusterServices {
    /// Every declared service
    pub fn iter(&self) -> impl Iterator<Item = &SIPClusterService> {
        self.load_balancer.iter().chain(self.jump_host.iter())
    }

    /// Returns true when no service is declared
    pub fn is_empty(&self) -> bool {
        self.load_balancer.is_empty() && self.jump_host.is_empty()
    }

    /// De-duplicated interfaces whose addresses must be resolved on each host
    pub fn node_interfaces(&self) -> Vec<String> {
        self.iter()
            .map(|svc| svc.node_interface.clone())
            .filter(|iface| !iface.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// A single service definition
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SIPClusterService {
    /// Container image
    pub image: String,

    /// Labels selecting the nodes the service runs on
    #[serde(default)]
    pub node_labels: BTreeMap<String, String>,

    /// Port exposed on the node
    #[serde(default)]
    pub node_port: u16,

    /// Network interface the service binds to (matches a network data `networks[].id`)
    pub node_interface: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct SIPClusterStatus {
    /// Status conditions (Ready)
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl SIPCluster {
    /// Node set for a role, if declared
    pub fn node_set(&self, role: NodeRole) -> Option<&NodeSet> {
        self.spec.nodes.get(&role)
    }

    /// Current Ready condition, if any
    pub fn ready_condition(&self) -> Option<&Condition> {
        self.status
            .as_ref()
            .and_then(|s| find_condition(&s.conditions, CONDITION_TYPE_READY))
    }

    /// Returns true when the request was already scheduled for its current generation
    pub fn is_scheduled(&self) -> bool {
        self.ready_condition().is_some_and(|c| {
            c.is_true() && c.observed_generation == self.metadata.generation
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::ReadyReason;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_default_flavor_selector() {
        let node_set = NodeSet::default();
        let host = labels(&[(FLAVOR_LABEL, "worker")]);

        assert!(node_set.selects(NodeRole::Worker, Some(&host)));
        assert!(!node_set.selects(NodeRole::ControlPlane, Some(&host)));
        assert!(!node_set.selects(NodeRole::Worker, None));
    }

    #[test]
    fn test_custom_flavor_selector() {
        let node_set = NodeSet {
            vm_flavor: Some("airshipit.org/vino-flavor = master".to_string()),
            ..Default::default()
        };
        let host = labels(&[("airshipit.org/vino-flavor", "master")]);

        assert!(node_set.selects(NodeRole::ControlPlane, Some(&host)));
        assert!(!node_set.selects(NodeRole::ControlPlane, Some(&labels(&[("airshipit.org/vino-flavor", "worker")]))));
    }

    #[test]
    fn test_existence_flavor_selector() {
        let node_set = NodeSet {
            vm_flavor: Some("example.com/gpu".to_string()),
            ..Default::default()
        };

        assert!(node_set.selects(NodeRole::Worker, Some(&labels(&[("example.com/gpu", "")]))));
        assert!(!node_set.selects(NodeRole::Worker, Some(&labels(&[]))));
    }

    #[test]
    fn test_node_interfaces_deduplicated() {
        let svc = |iface: &str| SIPClusterService {
            image: "haproxy:latest".to_string(),
            node_interface: iface.to_string(),
            ..Default::default()
        };
        let services = SIPClusterServices {
            load_balancer: vec![svc("oam-ipv4"), svc("pxe-ipv4")],
            jump_host: vec![svc("oam-ipv4")],
        };

        assert_eq!(services.node_interfaces(), vec!["oam-ipv4".to_string(), "pxe-ipv4".to_string()]);
        assert!(!services.is_empty());
        assert!(SIPClusterServices::default().is_empty());
    }

    #[test]
    fn test_spec_deserializes() {
        let spec: SIPClusterSpec = serde_json::from_value(serde_json::json!({
            "nodes": {
                "control-plane": { "count": 3, "scheduling": "rack-anti-affinity" },
                "worker": { "count": 4, "vmFlavor": "dcops.microscaler.io/flavor=worker" }
            },
            "services": {
                "loadBalancer": [
                    { "image": "haproxy:latest", "nodePort": 30000, "nodeInterface": "oam-ipv4" }
                ]
            }
        }))
        .unwrap();

        let cp = &spec.nodes[&NodeRole::ControlPlane];
        assert_eq!(cp.count, 3);
        assert_eq!(cp.scheduling, SchedulingPolicy::RackAntiAffinity);
        assert_eq!(spec.nodes[&NodeRole::Worker].scheduling, SchedulingPolicy::Unconstrained);
        assert_eq!(spec.services.node_interfaces(), vec!["oam-ipv4".to_string()]);
    }

    #[test]
    fn test_is_scheduled_tracks_generation() {
        let mut sip = SIPCluster::new("subcluster-1", SIPClusterSpec {
            nodes: BTreeMap::new(),
            services: SIPClusterServices::default(),
        });
        sip.metadata.generation = Some(2);
        assert!(!sip.is_scheduled());

        sip.status = Some(SIPClusterStatus {
            conditions: vec![
                Condition::ready(true, ReadyReason::Scheduled, "").with_observed_generation(Some(1)),
            ],
        });
        assert!(!sip.is_scheduled());

        sip.status = Some(SIPClusterStatus {
            conditions: vec![
                Condition::ready(true, ReadyReason::Scheduled, "").with_observed_generation(Some(2)),
            ],
        });
        assert!(sip.is_scheduled());
    }
}
