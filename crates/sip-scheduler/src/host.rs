//! Host records
//!
//! A `Host` wraps one `BareMetalHost` for the duration of a scheduling
//! attempt: the role it is considered for, its scheduling status, and the
//! connection data resolved from its Secrets.

use crate::error::SchedulerError;
use crds::labels::{RACK_LABEL, SERVER_LABEL};
use crds::{BareMetalHost, NamespacedName, NodeRole};
use std::collections::BTreeMap;

/// Scheduling status of a host within one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostStatus {
    /// Not (yet) selected
    #[default]
    NotScheduled,
    /// Claimed by a successful commit
    Scheduled,
}

/// Connection data resolved for a host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostData {
    pub bmc_username: String,
    pub bmc_password: String,
    /// Interface name to bound address
    pub ip_on_interface: BTreeMap<String, String>,
}

impl HostData {
    /// Returns true once both BMC credentials are populated
    pub fn has_credentials(&self) -> bool {
        !self.bmc_username.is_empty() && !self.bmc_password.is_empty()
    }
}

/// A candidate host
#[derive(Debug, Clone)]
pub struct Host {
    pub id: NamespacedName,
    pub bmh: BareMetalHost,
    /// Role the host is considered for in this attempt (`None` if no node set selects it)
    pub role: Option<NodeRole>,
    pub status: HostStatus,
    /// Server identifier; hosts without a server label are their own server
    pub server: String,
    pub rack: Option<String>,
    pub network_data: NamespacedName,
    pub data: HostData,
}

impl Host {
    /// Admit a store record as a candidate
    ///
    /// Fails with `InvalidHost` when the record has no name, no network data
    /// reference, or is constructed in any state other than `NotScheduled`.
    pub fn new(bmh: BareMetalHost, role: Option<NodeRole>, status: HostStatus) -> Result<Self, SchedulerError> {
        let id = NamespacedName::from_resource(&bmh, "default").ok_or_else(|| SchedulerError::InvalidHost {
            host: "<unnamed>".to_string(),
            reason: "metadata.name is not set".to_string(),
        })?;

        if status != HostStatus::NotScheduled {
            return Err(SchedulerError::InvalidHost {
                host: id.to_string(),
                reason: format!("hosts are admitted as NotScheduled, got {:?}", status),
            });
        }

        let network_data = bmh.network_data_ref().ok_or_else(|| SchedulerError::InvalidHost {
            host: id.to_string(),
            reason: "spec.networkData does not reference a Secret".to_string(),
        })?;

        let labels = bmh.metadata.labels.as_ref();
        let label = |key: &str| {
            labels
                .and_then(|l| l.get(key))
                .filter(|v| !v.is_empty())
                .cloned()
        };
        let server = label(SERVER_LABEL).unwrap_or_else(|| id.to_string());
        let rack = label(RACK_LABEL);

        Ok(Self {
            id,
            bmh,
            role,
            status,
            server,
            rack,
            network_data,
            data: HostData::default(),
        })
    }

    /// Returns true when `bmh` is the store record this host was built from
    pub fn is_record(&self, bmh: &BareMetalHost) -> bool {
        NamespacedName::from_resource(bmh, "default").is_some_and(|id| id == self.id)
    }
}

impl PartialEq for Host {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Host {}

#[cfg(test)]
mod tests {
    use super::*;
    use bmh_client::mock::fixtures::create_bmh;

    #[test]
    fn test_new_host() {
        let bmh = create_bmh(1, "default", NodeRole::Worker, 3);
        let host = Host::new(bmh.clone(), Some(NodeRole::Worker), HostStatus::NotScheduled).unwrap();

        assert_eq!(host.id, NamespacedName::new("default", "node01"));
        assert_eq!(host.status, HostStatus::NotScheduled);
        assert_eq!(host.rack.as_deref(), Some("r03"));
        assert_eq!(host.server, "r03s01");
        assert_eq!(host.network_data, NamespacedName::new("default", "node01-network-data"));
        assert!(!host.data.has_credentials());
        assert!(host.data.ip_on_interface.is_empty());
        assert!(host.is_record(&bmh));
    }

    #[test]
    fn test_missing_network_data_is_invalid() {
        let mut bmh = create_bmh(1, "default", NodeRole::Worker, 1);
        bmh.spec.network_data = None;

        let err = Host::new(bmh, Some(NodeRole::Worker), HostStatus::NotScheduled).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidHost { .. }));
    }

    #[test]
    fn test_scheduled_initial_state_is_invalid() {
        let bmh = create_bmh(1, "default", NodeRole::Worker, 1);
        assert!(Host::new(bmh, None, HostStatus::Scheduled).is_err());
    }

    #[test]
    fn test_missing_placement_labels() {
        let mut bmh = create_bmh(4, "metal3", NodeRole::ControlPlane, 1);
        bmh.metadata.labels = None;

        let host = Host::new(bmh, None, HostStatus::NotScheduled).unwrap();
        assert_eq!(host.server, "metal3/node04");
        assert_eq!(host.rack, None);
    }

    #[test]
    fn test_identity_by_name() {
        let a = Host::new(create_bmh(1, "default", NodeRole::Worker, 1), None, HostStatus::NotScheduled).unwrap();
        let b = Host::new(create_bmh(1, "default", NodeRole::ControlPlane, 2), None, HostStatus::NotScheduled).unwrap();
        let c = Host::new(create_bmh(2, "default", NodeRole::Worker, 1), None, HostStatus::NotScheduled).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!a.is_record(&c.bmh));
    }
}
