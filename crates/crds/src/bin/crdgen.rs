//! Prints the CRDs owned by this repository as YAML
//!
//! `BareMetalHost` is owned by the metal3 baremetal-operator and is not
//! emitted here.

use crds::SIPCluster;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&SIPCluster::crd())?);
    Ok(())
}
