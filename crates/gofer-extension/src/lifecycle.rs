//! Harness state machine.

use serde::Serialize;
use std::fmt;
use tokio::sync::watch;

/// Where the harness process is in its lifetime.
///
/// Transitions only move forward: `Loading -> Restoring -> Serving ->
/// Draining -> Exited`, with `Exited` reachable from any state on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HarnessState {
    Loading,
    Restoring,
    Serving,
    Draining,
    Exited,
}

impl fmt::Display for HarnessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HarnessState::Loading => "loading",
            HarnessState::Restoring => "restoring",
            HarnessState::Serving => "serving",
            HarnessState::Draining => "draining",
            HarnessState::Exited => "exited",
        };
        f.write_str(name)
    }
}

/// Shared, observable harness state.
#[derive(Clone)]
pub struct Lifecycle {
    tx: watch::Sender<HarnessState>,
}

impl Lifecycle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(HarnessState::Loading);
        Self { tx }
    }

    pub fn current(&self) -> HarnessState {
        *self.tx.borrow()
    }

    /// Move to `next`. Backward transitions are ignored.
    pub fn advance(&self, next: HarnessState) -> bool {
        self.tx.send_if_modified(|state| {
            if next > *state {
                tracing::info!(from = %state, to = %next, "Harness state changed");
                *state = next;
                true
            } else {
                false
            }
        })
    }

    pub fn watch(&self) -> watch::Receiver<HarnessState> {
        self.tx.subscribe()
    }

    /// Wait until the harness reaches `state` or a later one.
    pub async fn reached(&self, state: HarnessState) {
        let mut rx = self.watch();
        let _ = rx.wait_for(|current| *current >= state).await;
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
