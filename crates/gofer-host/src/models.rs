//! Wire shapes of the host API.

use gofer_core::run::{RunState, RunStatus};
use gofer_core::subscription::SubscriptionRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
pub struct ListSubscriptionsResponse {
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionRecord>,
}

#[derive(Debug, Serialize)]
pub struct StartRunRequest<'a> {
    pub variables: &'a HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct RunEnvelope {
    pub run: RunBody,
}

#[derive(Debug, Deserialize)]
pub struct RunBody {
    pub run_id: u64,
    #[serde(default = "unknown_state")]
    pub state: RunState,
    #[serde(default = "unknown_status")]
    pub status: RunStatus,
    #[serde(default)]
    pub started: u64,
    #[serde(default)]
    pub ended: u64,
}

fn unknown_state() -> RunState {
    RunState::Unknown
}

fn unknown_status() -> RunStatus {
    RunStatus::Unknown
}
