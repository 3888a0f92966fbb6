//! Store client errors

use thiserror::Error;

/// Errors that can occur when talking to the resource store
#[derive(Debug, Error)]
pub enum BmhError {
    /// Kubernetes API error not covered by a more specific variant
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Store rejected the request
    #[error("Store API error: {0}")]
    Api(String),

    /// Write rejected because the object changed concurrently
    #[error("Conflict: {0}")]
    Conflict(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Object returned by the store is unusable (e.g. missing name)
    #[error("Invalid resource: {0}")]
    InvalidResource(String),
}

impl BmhError {
    /// Map a Kubernetes API error, pulling out 404 and 409 responses
    pub fn from_kube(error: kube::Error, what: &str) -> Self {
        match error {
            kube::Error::Api(ref response) if response.code == 404 => Self::NotFound(what.to_string()),
            kube::Error::Api(ref response) if response.code == 409 => {
                Self::Conflict(format!("{}: {}", what, response.message))
            }
            kube::Error::Api(ref response) => {
                Self::Api(format!("{} ({}): {}", what, response.code, response.message))
            }
            other => Self::Kube(other),
        }
    }

    /// Returns true for errors a later attempt can be expected to get past
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}
