//! Wiremock stand-in for the host API.

use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A `start_run` call the host received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedRunCall {
    pub namespace_id: String,
    pub pipeline_id: String,
    pub variables: HashMap<String, String>,
}

pub struct MockHost {
    server: MockServer,
}

impl MockHost {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Address for `GOFER_EXTENSION_SYSTEM_HOST_ADDRESS`, scheme included.
    pub fn address(&self) -> String {
        self.server.uri()
    }

    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// Serve `records` from `list_subscriptions`.
    pub async fn with_subscriptions(&self, extension_id: &str, records: Vec<Value>) -> &Self {
        Mock::given(method("GET"))
            .and(path(format!("/api/extensions/{}/subscriptions", extension_id)))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "subscriptions": records })),
            )
            .mount(&self.server)
            .await;
        self
    }

    /// Accept `start_run` for a pipeline and answer with `run_id`.
    pub async fn accepting_runs(&self, namespace_id: &str, pipeline_id: &str, run_id: u64) -> &Self {
        self.accepting_runs_after(namespace_id, pipeline_id, run_id, Duration::ZERO)
            .await
    }

    /// Like [`accepting_runs`](Self::accepting_runs) but each answer takes `delay`.
    pub async fn accepting_runs_after(
        &self,
        namespace_id: &str,
        pipeline_id: &str,
        run_id: u64,
        delay: Duration,
    ) -> &Self {
        Mock::given(method("POST"))
            .and(path(runs_path(namespace_id, pipeline_id)))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({ "run": { "run_id": run_id, "state": "pending" } }))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
        self
    }

    /// Answer `get_run` for one run with a fixed state and status.
    pub async fn with_run(
        &self,
        namespace_id: &str,
        pipeline_id: &str,
        run_id: u64,
        state: &str,
        status: &str,
    ) -> &Self {
        Mock::given(method("GET"))
            .and(path(format!("{}/{}", runs_path(namespace_id, pipeline_id), run_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "run": { "run_id": run_id, "state": state, "status": status }
            })))
            .mount(&self.server)
            .await;
        self
    }

    /// Every `start_run` call received so far, in arrival order.
    pub async fn started_runs(&self) -> Vec<StartedRunCall> {
        let requests = self.server.received_requests().await.unwrap_or_default();
        requests
            .iter()
            .filter(|r| r.method.as_str() == "POST")
            .filter_map(|r| {
                let segments: Vec<&str> = r.url.path().split('/').collect();
                let (namespace_id, pipeline_id) = match segments.as_slice() {
                    ["", "api", "namespaces", ns, "pipelines", pl, "runs"] => (*ns, *pl),
                    _ => return None,
                };
                let body: Value = r.body_json().ok()?;
                let variables = serde_json::from_value(body["variables"].clone()).ok()?;
                Some(StartedRunCall {
                    namespace_id: namespace_id.to_string(),
                    pipeline_id: pipeline_id.to_string(),
                    variables,
                })
            })
            .collect()
    }

    /// Number of `get_run` calls received so far.
    pub async fn run_polls(&self) -> usize {
        let requests = self.server.received_requests().await.unwrap_or_default();
        requests
            .iter()
            .filter(|r| r.method.as_str() == "GET" && r.url.path().contains("/runs/"))
            .count()
    }
}

fn runs_path(namespace_id: &str, pipeline_id: &str) -> String {
    format!("/api/namespaces/{}/pipelines/{}/runs", namespace_id, pipeline_id)
}
