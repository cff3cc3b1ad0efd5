//! Test helper functions and utilities.

use crate::mock_host::MockHost;
use gofer_extension::handlers::events::ExternalEventRequest;
use gofer_extension::{Extension, Harness, HarnessError, HarnessState, SystemConfig};
use gofer_host::HostClient;
use reqwest::Client;
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const SECRET: &str = "e2e-secret";
pub const EXTENSION_ID: &str = "e2e";

/// Drain window used by test harnesses.
pub const TEST_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// System config pointing at `host`, listening on an ephemeral port.
pub fn system_config(host: &MockHost, extras: &[(&str, &str)]) -> anyhow::Result<SystemConfig> {
    let mut vars: HashMap<String, String> = [
        ("GOFER_EXTENSION_SYSTEM_ID", EXTENSION_ID),
        ("GOFER_EXTENSION_SYSTEM_SECRET", SECRET),
        ("GOFER_EXTENSION_SYSTEM_USE_TLS", "false"),
        ("GOFER_EXTENSION_SYSTEM_BIND_ADDRESS", "127.0.0.1:0"),
        ("GOFER_EXTENSION_SYSTEM_REQUEST_TIMEOUT_SECS", "5"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    vars.insert(
        "GOFER_EXTENSION_SYSTEM_HOST_ADDRESS".to_string(),
        host.address(),
    );
    for (key, value) in extras {
        vars.insert(format!("GOFER_EXTENSION_SYSTEM_{}", key), value.to_string());
    }
    Ok(SystemConfig::from_source(vars)?)
}

/// A harness serving on loopback.
pub struct TestHarness {
    pub address: SocketAddr,
    pub client: ApiTestClient,
    pub shutdown: CancellationToken,
    pub task: JoinHandle<Result<(), HarnessError>>,
}

/// Start a harness for `extension` against `host` and wait until it serves.
pub async fn start_harness(
    extension: Arc<dyn Extension>,
    host: &MockHost,
    extras: &[(&str, &str)],
) -> anyhow::Result<TestHarness> {
    let config = system_config(host, extras)?;
    let client = HostClient::new(&config.host_client_config())?;
    let harness = Harness::new(config, extension, Arc::new(client))
        .with_signal_handlers(false)
        .with_drain_timeout(TEST_DRAIN_TIMEOUT);

    let lifecycle = harness.lifecycle();
    let shutdown = harness.shutdown_token();
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?;
    let task = tokio::spawn(harness.serve(listener));

    let serving = tokio::time::timeout(
        Duration::from_secs(5),
        lifecycle.reached(HarnessState::Serving),
    )
    .await;
    if serving.is_err() || lifecycle.current() != HarnessState::Serving {
        task.abort();
        anyhow::bail!("harness did not reach Serving");
    }

    Ok(TestHarness {
        address,
        client: ApiTestClient::new(address),
        shutdown,
        task,
    })
}

/// Create an HTTP client for testing.
pub fn test_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .expect("Failed to create test client")
}

/// Lifecycle API client carrying the bearer secret.
pub struct ApiTestClient {
    client: Client,
    base_url: String,
}

impl ApiTestClient {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            client: test_client(),
            base_url: format!("http://{}", addr),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .get(self.url(path))
            .bearer_auth(SECRET)
            .send()
            .await
    }

    pub async fn post<T: serde::Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> reqwest::Result<reqwest::Response> {
        self.client
            .post(self.url(path))
            .bearer_auth(SECRET)
            .json(body)
            .send()
            .await
    }

    /// Register a subscription under `default/build`.
    pub async fn subscribe(
        &self,
        subscription_id: &str,
        params: &[(&str, &str)],
    ) -> reqwest::Result<reqwest::Response> {
        let params: HashMap<&str, &str> = params.iter().copied().collect();
        self.post(
            "/subscribe",
            &json!({
                "namespace_id": "default",
                "pipeline_id": "build",
                "pipeline_subscription_id": subscription_id,
                "pipeline_subscription_params": params,
            }),
        )
        .await
    }

    /// Forward a raw request the way the host does.
    pub async fn external_event(
        &self,
        headers: HashMap<String, String>,
        body: &[u8],
    ) -> reqwest::Result<reqwest::Response> {
        self.post("/external-event", &ExternalEventRequest::new(headers, body))
            .await
    }

    /// Keys from `/debug`, in the order returned.
    pub async fn registered(&self) -> anyhow::Result<Vec<String>> {
        let body: serde_json::Value = self.get("/debug").await?.error_for_status()?.json().await?;
        Ok(serde_json::from_value(body["registered_pipelines"].clone())?)
    }

    pub async fn shutdown(&self) -> reqwest::Result<reqwest::Response> {
        self.client
            .post(self.url("/shutdown"))
            .bearer_auth(SECRET)
            .send()
            .await
    }

    /// Check health endpoint.
    pub async fn health(&self) -> anyhow::Result<bool> {
        let resp = self.client.get(self.url("/health")).send().await?;
        Ok(resp.status().is_success())
    }
}

/// Wait for a condition with timeout.
pub async fn wait_for<F, Fut>(timeout: Duration, interval: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if condition().await {
            return true;
        }
        tokio::time::sleep(interval).await;
    }
    false
}

/// Assert that a future completes within a timeout.
pub async fn assert_completes_within<F, T>(future: F, timeout: Duration) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(timeout, future)
        .await
        .expect("Operation timed out")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wait_for_immediate() {
        let result = wait_for(Duration::from_secs(1), Duration::from_millis(10), || async {
            true
        })
        .await;
        assert!(result);
    }

    #[tokio::test]
    async fn test_wait_for_timeout() {
        let result = wait_for(
            Duration::from_millis(100),
            Duration::from_millis(10),
            || async { false },
        )
        .await;
        assert!(!result);
    }
}
