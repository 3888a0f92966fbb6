//! Controller-specific error types.

use kube::Error as KubeError;
use sip_scheduler::SchedulerError;
use thiserror::Error;

/// Errors that can occur in the SIPCluster controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Scheduling attempt aborted
    #[error("Scheduling error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Probe server I/O error
    #[error("Probe server error: {0}")]
    Server(#[from] std::io::Error),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
