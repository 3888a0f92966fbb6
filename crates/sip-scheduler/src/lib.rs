//! SIP cluster scheduling engine
//!
//! Allocates unclaimed bare-metal hosts to the node roles a `SIPCluster`
//! requests, subject to server and rack exclusion, and resolves the BMC
//! credentials and interface addresses needed to provision them.
//!
//! One attempt runs four steps in sequence:
//! 1. [`CandidatePool::build`] lists hosts not labeled as claimed
//! 2. [`Extrapolator`] resolves credentials and addresses per host
//! 3. [`select`] picks hosts per role, all-or-nothing
//! 4. [`Committer`] labels every considered host and sets the Ready condition
//!
//! Claim state lives only in host labels; nothing is cached between attempts.
//!
//! # Example
//!
//! ```no_run
//! use bmh_client::BmhClient;
//! use sip_scheduler::Scheduler;
//! use std::sync::Arc;
//!
//! # async fn example(request: crds::SIPCluster) -> Result<(), Box<dyn std::error::Error>> {
//! let kube = kube::Client::try_default().await?;
//! let scheduler = Scheduler::new(Arc::new(BmhClient::new(kube, None)));
//!
//! let outcome = scheduler.schedule(&request).await?;
//! println!("{}: {} hosts", outcome.decision.reason(), outcome.hosts.len());
//! # Ok(())
//! # }
//! ```

pub mod commit;
pub mod error;
pub mod extrapolate;
pub mod host;
pub mod network_data;
pub mod pool;
pub mod scheduler;
pub mod selector;

pub use commit::{CommitReport, Committer};
pub use error::SchedulerError;
pub use extrapolate::Extrapolator;
pub use host::{Host, HostData, HostStatus};
pub use network_data::NetworkData;
pub use pool::CandidatePool;
pub use scheduler::{ScheduleOutcome, Scheduler};
pub use selector::{PlacementDecision, select};
