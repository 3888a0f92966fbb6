//! SIP Cluster CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the SIP cluster scheduler,
//! plus the metal3 `BareMetalHost` subset the scheduler reads and the
//! labels it writes back.

pub mod baremetal_host;
pub mod condition;
pub mod labels;
pub mod references;
pub mod sip_cluster;

pub use baremetal_host::*;
pub use condition::*;
pub use references::*;
pub use sip_cluster::*;
