//! Scheduling labels
//!
//! Claim state is stored as labels on the `BareMetalHost` objects themselves,
//! so any actor can read which hosts are taken and by which `SIPCluster`.

use std::collections::BTreeMap;

/// Outcome of the most recent scheduling attempt that considered the host ("true" / "false")
pub const SCHEDULE_CLAIMED_LABEL: &str = "dcops.microscaler.io/schedule-claimed";

/// Name of the `SIPCluster` that claimed the host (present only when claimed)
pub const SCHEDULE_OWNER_LABEL: &str = "dcops.microscaler.io/schedule-owner";

/// Role the host was claimed for (present only when claimed)
pub const NODE_ROLE_LABEL: &str = "dcops.microscaler.io/node-role";

/// Physical server identifier
pub const SERVER_LABEL: &str = "dcops.microscaler.io/server";

/// Rack identifier
pub const RACK_LABEL: &str = "dcops.microscaler.io/rack";

/// Flavor label used by the default node set selector
pub const FLAVOR_LABEL: &str = "dcops.microscaler.io/flavor";

/// Claimed label value for selected hosts
pub const CLAIMED: &str = "true";

/// Claimed label value for considered but rejected hosts
pub const RELEASED: &str = "false";

/// Label selector matching hosts that are not claimed
///
/// `!=` also matches objects that do not carry the label at all.
pub fn unclaimed_selector() -> String {
    format!("{}!={}", SCHEDULE_CLAIMED_LABEL, CLAIMED)
}

/// Label selector matching hosts claimed by the named request
pub fn owner_selector(owner: &str) -> String {
    format!("{}={},{}={}", SCHEDULE_CLAIMED_LABEL, CLAIMED, SCHEDULE_OWNER_LABEL, owner)
}

/// Returns true when the labels record a claim by `owner`
pub fn is_owned_by(labels: Option<&BTreeMap<String, String>>, owner: &str) -> bool {
    is_claimed(labels) && labels.and_then(|l| l.get(SCHEDULE_OWNER_LABEL)).is_some_and(|v| v == owner)
}

/// Returns true when the labels carry the claimed sentinel
pub fn is_claimed(labels: Option<&BTreeMap<String, String>>) -> bool {
    labels
        .and_then(|l| l.get(SCHEDULE_CLAIMED_LABEL))
        .is_some_and(|v| v == CLAIMED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_claimed() {
        let mut labels = BTreeMap::new();
        assert!(!is_claimed(None));
        assert!(!is_claimed(Some(&labels)));

        labels.insert(SCHEDULE_CLAIMED_LABEL.to_string(), RELEASED.to_string());
        assert!(!is_claimed(Some(&labels)));

        labels.insert(SCHEDULE_CLAIMED_LABEL.to_string(), CLAIMED.to_string());
        assert!(is_claimed(Some(&labels)));
    }

    #[test]
    fn test_is_claimed_requires_exact_sentinel() {
        let mut labels = BTreeMap::new();
        labels.insert(SCHEDULE_CLAIMED_LABEL.to_string(), "True".to_string());
        assert!(!is_claimed(Some(&labels)));
    }

    #[test]
    fn test_is_owned_by() {
        let mut labels = BTreeMap::new();
        labels.insert(SCHEDULE_OWNER_LABEL.to_string(), "subcluster-1".to_string());
        // Owner without the claimed sentinel is a stale label
        assert!(!is_owned_by(Some(&labels), "subcluster-1"));

        labels.insert(SCHEDULE_CLAIMED_LABEL.to_string(), CLAIMED.to_string());
        assert!(is_owned_by(Some(&labels), "subcluster-1"));
        assert!(!is_owned_by(Some(&labels), "subcluster-2"));
        assert!(!is_owned_by(None, "subcluster-1"));
    }

    #[test]
    fn test_owner_selector() {
        assert_eq!(
            owner_selector("subcluster-1"),
            "dcops.microscaler.io/schedule-claimed=true,dcops.microscaler.io/schedule-owner=subcluster-1"
        );
    }

    #[test]
    fn test_unclaimed_selector() {
        assert_eq!(unclaimed_selector(), "dcops.microscaler.io/schedule-claimed!=true");
    }
}
