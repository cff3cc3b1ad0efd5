//! Run types as reported by the host.

use crate::ids::{NamespaceId, PipelineId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Pending,
    Running,
    Complete,
    #[serde(other)]
    Unknown,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Complete)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[serde(alias = "success")]
    Successful,
    #[serde(alias = "failure")]
    Failed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

/// A run as returned by `get_run`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub namespace_id: NamespaceId,
    pub pipeline_id: PipelineId,
    pub run_id: u64,
    pub state: RunState,
    pub status: RunStatus,
    /// Milliseconds since epoch; zero when the run has not started.
    #[serde(default, alias = "started")]
    pub started_ms: u64,
    /// Milliseconds since epoch; zero when the run has not ended.
    #[serde(default, alias = "ended")]
    pub ended_ms: u64,
}

/// Outcome of a successful `start_run` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedRun {
    pub run_id: u64,
    pub status_code: u16,
    pub body: String,
}

/// Coarse outcome reported back to the event origin once a run finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckConclusion {
    Neutral,
    Success,
    Failure,
    Cancelled,
}

impl CheckConclusion {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckConclusion::Neutral => "neutral",
            CheckConclusion::Success => "success",
            CheckConclusion::Failure => "failure",
            CheckConclusion::Cancelled => "cancelled",
        }
    }
}

impl From<RunStatus> for CheckConclusion {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Successful => CheckConclusion::Success,
            RunStatus::Failed => CheckConclusion::Failure,
            RunStatus::Cancelled => CheckConclusion::Cancelled,
            RunStatus::Unknown => CheckConclusion::Neutral,
        }
    }
}

impl fmt::Display for CheckConclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
