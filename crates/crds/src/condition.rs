//! Status conditions
//!
//! Kubernetes-style conditions for `SIPCluster` status reporting.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Condition type reporting whether the last scheduling attempt succeeded
pub const CONDITION_TYPE_READY: &str = "Ready";

/// Condition status following Kubernetes conventions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub enum ConditionStatus {
    /// Condition is true
    True,
    /// Condition is false
    False,
    /// Condition status is unknown
    #[default]
    Unknown,
}

impl From<bool> for ConditionStatus {
    fn from(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Reason attached to the Ready condition
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum ReadyReason {
    /// Every node set was fully scheduled
    Scheduled,
    /// Not enough control-plane eligible hosts
    InsufficientControlPlaneNodes,
    /// Not enough worker eligible hosts
    InsufficientWorkerNodes,
    /// Enough eligible hosts exist but server/rack exclusion rules leave too few
    AffinityConstraintUnsatisfiable,
    /// Every host is already claimed
    NoCandidates,
    /// A complete assignment was chosen but some host label writes were rejected
    LabelWritesPending,
}

impl ReadyReason {
    /// Reason string as written to the condition
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "Scheduled",
            Self::InsufficientControlPlaneNodes => "InsufficientControlPlaneNodes",
            Self::InsufficientWorkerNodes => "InsufficientWorkerNodes",
            Self::AffinityConstraintUnsatisfiable => "AffinityConstraintUnsatisfiable",
            Self::NoCandidates => "NoCandidates",
            Self::LabelWritesPending => "LabelWritesPending",
        }
    }
}

impl fmt::Display for ReadyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kubernetes-style condition
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition (e.g., Ready)
    #[serde(rename = "type")]
    pub type_: String,

    /// Status of the condition (True, False, Unknown)
    pub status: ConditionStatus,

    /// Machine-readable reason for the condition
    pub reason: String,

    /// Human-readable message
    #[serde(default)]
    pub message: String,

    /// Last time the condition status changed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,

    /// Generation of the `SIPCluster` the condition was computed for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl Condition {
    /// Create a Ready condition stamped with the current time
    pub fn ready(status: bool, reason: ReadyReason, message: impl Into<String>) -> Self {
        Self {
            type_: CONDITION_TYPE_READY.to_string(),
            status: status.into(),
            reason: reason.as_str().to_string(),
            message: message.into(),
            last_transition_time: Some(Utc::now()),
            observed_generation: None,
        }
    }

    /// Set the generation this condition was computed for
    #[must_use]
    pub fn with_observed_generation(mut self, generation: Option<i64>) -> Self {
        self.observed_generation = generation;
        self
    }

    /// Returns true when the condition status is True
    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }
}

/// Find a condition by type
pub fn find_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

/// Insert or update a condition in place
///
/// Mirrors `meta.SetStatusCondition`: the transition time is only moved when
/// the status value changes.
pub fn set_condition(conditions: &mut Vec<Condition>, mut new: Condition) {
    match conditions.iter_mut().find(|c| c.type_ == new.type_) {
        Some(existing) => {
            if existing.status == new.status {
                new.last_transition_time = existing.last_transition_time.or(new.last_transition_time);
            }
            *existing = new;
        }
        None => conditions.push(new),
    }
}
