//! Bare-metal host store client
//!
//! Read and write access to the objects the SIP scheduler works with:
//! metal3 `BareMetalHost` inventory, the Secrets those hosts reference, and
//! the `SIPCluster` requests whose status the scheduler reports on.
//!
//! # Example
//!
//! ```no_run
//! use bmh_client::{BmhClient, BmhClientTrait};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let kube = kube::Client::try_default().await?;
//! let client = BmhClient::new(kube, Some("metal3".to_string()));
//!
//! // Hosts not claimed by any SIPCluster
//! let hosts = client.list_unclaimed_hosts().await?;
//! println!("{} unclaimed hosts", hosts.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
#[path = "trait.rs"]
pub mod bmh_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use bmh_trait::{BmhClientTrait, LabelPatch, SecretData};
pub use client::BmhClient;
pub use error::BmhError;
#[cfg(feature = "test-util")]
pub use mock::MockBmhClient;
