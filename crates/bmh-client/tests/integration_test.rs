//! Integration tests for the store client
//!
//! These tests require a Kubernetes cluster with the metal3 and SIPCluster
//! CRDs installed. Set KUBECONFIG (or run in-cluster) and BMH_NAMESPACE.

use bmh_client::{BmhClient, BmhClientTrait, BmhError};
use crds::NamespacedName;

async fn client() -> BmhClient {
    let kube = kube::Client::try_default().await.expect("Failed to create Kubernetes client");
    let namespace = std::env::var("BMH_NAMESPACE").unwrap_or_else(|_| "metal3".to_string());
    BmhClient::new(kube, Some(namespace))
}

#[tokio::test]
#[ignore] // Requires running cluster
async fn test_list_unclaimed_hosts() {
    let client = client().await;

    let hosts = client.list_unclaimed_hosts().await.expect("Failed to list hosts");
    println!("Found {} unclaimed hosts", hosts.len());
}

#[tokio::test]
#[ignore]
async fn test_list_owned_hosts() {
    let client = client().await;

    let hosts = client
        .list_owned_hosts("sip-scheduler-unknown-owner")
        .await
        .expect("Failed to list hosts");
    assert!(hosts.is_empty());
}

#[tokio::test]
#[ignore]
async fn test_missing_secret_is_not_found() {
    let client = client().await;
    let namespace = client.namespace().unwrap_or("default").to_string();

    let result = client
        .get_secret(&NamespacedName::new(namespace, "sip-scheduler-does-not-exist"))
        .await;
    assert!(matches!(result, Err(BmhError::NotFound(_))));
}
