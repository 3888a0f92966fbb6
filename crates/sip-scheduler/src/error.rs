//! Scheduler error types.

use bmh_client::BmhError;
use thiserror::Error;

/// Errors raised during a scheduling attempt
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Host record cannot be admitted as a candidate
    #[error("Invalid host {host}: {reason}")]
    InvalidHost { host: String, reason: String },

    /// Scheduling request cannot be processed
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Every host is already claimed
    #[error("No candidates: every host is already claimed")]
    NoCandidates,

    /// BMC credential Secret missing or unreadable
    #[error("Credential resolution failed for host {host}: {reason}")]
    CredentialResolution { host: String, reason: String },

    /// BMC credential Secret lacks a username or password
    #[error("Malformed credentials for host {host}: {reason}")]
    MalformedCredential { host: String, reason: String },

    /// Network data Secret missing
    #[error("Network data missing for host {host}: {reason}")]
    NetworkDataMissing { host: String, reason: String },

    /// Network data Secret unparsable or missing the interface
    #[error("Malformed network data for host {host}: {reason}")]
    MalformedNetworkData { host: String, reason: String },

    /// Store rejected a write because of a concurrent modification
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Any other store failure
    #[error("Store error: {0}")]
    Store(BmhError),
}

impl From<BmhError> for SchedulerError {
    fn from(error: BmhError) -> Self {
        match error {
            BmhError::Conflict(message) => Self::Conflict(message),
            other => Self::Store(other),
        }
    }
}

impl SchedulerError {
    /// Returns true for failures scoped to a single host
    ///
    /// These exclude the host from selection; everything else aborts the attempt.
    pub fn is_host_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidHost { .. }
                | Self::CredentialResolution { .. }
                | Self::MalformedCredential { .. }
                | Self::NetworkDataMissing { .. }
                | Self::MalformedNetworkData { .. }
        )
    }
}
