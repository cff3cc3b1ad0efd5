//! Fakes shared by the GitHub extension tests.
#![allow(dead_code)]

use async_trait::async_trait;
use gofer_core::ids::{NamespaceId, PipelineId, SubscriptionKey};
use gofer_core::ports::{DispatchSink, HostApi, Variables};
use gofer_core::run::{CheckConclusion, Run, RunState, RunStatus, StartedRun};
use gofer_core::subscription::{SubscriptionParams, SubscriptionRecord};
use gofer_core::{Error, Result};
use gofer_extension::{ExtensionContext, ExternalEvent};
use gofer_github::{ChecksReporter, ReportError, sign};
use gofer_registry::Repository;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const WEBHOOK_SECRET: &str = "hook-secret";

pub fn key(id: &str) -> SubscriptionKey {
    SubscriptionKey::parse("default", "build", id).unwrap()
}

pub fn params(repository: &str, event: &str) -> SubscriptionParams {
    [("repository", repository), ("event", event)]
        .into_iter()
        .collect()
}

/// A signed delivery as the host would forward it.
pub fn delivery(event: &str, body: serde_json::Value) -> ExternalEvent {
    let body = serde_json::to_vec(&body).unwrap();
    let signature = sign(WEBHOOK_SECRET, &body).unwrap();
    let headers: HashMap<String, String> = [
        ("X-GitHub-Event".to_string(), event.to_string()),
        ("X-Hub-Signature-256".to_string(), signature),
        ("Content-Type".to_string(), "application/json".to_string()),
    ]
    .into();
    ExternalEvent::new(headers, body)
}

/// Records every firing and answers with a fixed run id.
pub struct RecordingSink {
    pub fired: Mutex<Vec<(SubscriptionKey, Variables)>>,
    pub run_id: u64,
    pub fail_for: Option<String>,
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self {
            fired: Mutex::new(Vec::new()),
            run_id: 7,
            fail_for: None,
        }
    }
}

impl RecordingSink {
    pub fn fired_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .fired
            .lock()
            .unwrap()
            .iter()
            .map(|(key, _)| key.subscription_id.to_string())
            .collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl DispatchSink for RecordingSink {
    async fn fire(&self, key: &SubscriptionKey, variables: Variables) -> Result<StartedRun> {
        self.fired.lock().unwrap().push((key.clone(), variables));
        if self.fail_for.as_deref() == Some(key.subscription_id.as_str()) {
            return Err(Error::Http {
                status_code: 500,
                body: "boom".into(),
            });
        }
        Ok(StartedRun {
            run_id: self.run_id,
            status_code: 201,
            body: String::new(),
        })
    }
}

/// Answers `get_run` from a script; an empty script is a transport error.
#[derive(Default)]
pub struct ScriptedHost {
    pub polls: Mutex<VecDeque<Result<Run>>>,
    pub poll_count: Mutex<usize>,
}

impl ScriptedHost {
    pub fn with_polls(polls: Vec<Result<Run>>) -> Self {
        Self {
            polls: Mutex::new(polls.into()),
            poll_count: Mutex::new(0),
        }
    }

    pub fn poll_count(&self) -> usize {
        *self.poll_count.lock().unwrap()
    }
}

pub fn run(run_id: u64, state: RunState, status: RunStatus) -> Run {
    Run {
        namespace_id: NamespaceId::new("default").unwrap(),
        pipeline_id: PipelineId::new("build").unwrap(),
        run_id,
        state,
        status,
        started_ms: 0,
        ended_ms: 0,
    }
}

#[async_trait]
impl HostApi for ScriptedHost {
    async fn list_subscriptions(&self, _extension_id: &str) -> Result<Vec<SubscriptionRecord>> {
        Ok(vec![])
    }

    async fn start_run(
        &self,
        _namespace_id: &NamespaceId,
        _pipeline_id: &PipelineId,
        _variables: &Variables,
    ) -> Result<StartedRun> {
        Err(Error::Unsupported("start_run".into()))
    }

    async fn get_run(
        &self,
        _namespace_id: &NamespaceId,
        _pipeline_id: &PipelineId,
        _run_id: u64,
    ) -> Result<Run> {
        *self.poll_count.lock().unwrap() += 1;
        self.polls
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Transport("script exhausted".into())))
    }
}

/// Records check run calls.
#[derive(Default)]
pub struct RecordingReporter {
    pub created: Mutex<Vec<(String, String)>>,
    pub completed: Mutex<Vec<(u64, CheckConclusion)>>,
    pub fail_complete: bool,
}

#[async_trait]
impl ChecksReporter for RecordingReporter {
    async fn create_check(
        &self,
        repository: &Repository,
        head_sha: &str,
        _name: &str,
    ) -> std::result::Result<u64, ReportError> {
        self.created
            .lock()
            .unwrap()
            .push((repository.to_string(), head_sha.to_string()));
        Ok(555)
    }

    async fn complete_check(
        &self,
        _repository: &Repository,
        check_id: u64,
        conclusion: CheckConclusion,
        _summary: &str,
    ) -> std::result::Result<(), ReportError> {
        self.completed.lock().unwrap().push((check_id, conclusion));
        if self.fail_complete {
            return Err(ReportError::Http {
                status_code: 403,
                body: "forbidden".into(),
            });
        }
        Ok(())
    }
}

pub fn context(sink: Arc<RecordingSink>, host: Arc<ScriptedHost>) -> ExtensionContext {
    ExtensionContext {
        dispatcher: sink,
        host,
        shutdown: CancellationToken::new(),
    }
}

/// Poll `condition` until it holds or `timeout` passes.
pub async fn wait_for<F>(mut condition: F, timeout: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
