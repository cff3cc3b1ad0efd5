//! HTTP implementation of [`HostApi`].

use crate::config::{API_VERSION, HostClientConfig};
use crate::models::{ListSubscriptionsResponse, RunEnvelope, StartRunRequest};
use async_trait::async_trait;
use gofer_core::ids::{NamespaceId, PipelineId};
use gofer_core::ports::{HostApi, Variables};
use gofer_core::run::{Run, StartedRun};
use gofer_core::subscription::SubscriptionRecord;
use gofer_core::{Error, Result};
use reqwest::{Client, Method, RequestBuilder, Response};
use tracing::debug;
use url::Url;

/// Authenticated client for the host API.
///
/// Non-2xx responses are never retried here; they surface as
/// [`Error::Http`] and the caller decides what to do.
#[derive(Clone)]
pub struct HostClient {
    client: Client,
    base_url: String,
    token: String,
}

impl HostClient {
    pub fn new(config: &HostClientConfig) -> Result<Self> {
        let base_url = config.base_url();
        Url::parse(&base_url)
            .map_err(|e| Error::Internal(format!("invalid host address '{}': {}", base_url, e)))?;

        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.skip_tls_verify)
            .build()
            .map_err(|e| Error::Internal(format!("could not build host client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            token: config.token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .bearer_auth(&self.token)
            .header("api-version", API_VERSION)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status_code = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Http { status_code, body });
        }

        Ok(response)
    }
}

fn runs_path(namespace_id: &NamespaceId, pipeline_id: &PipelineId) -> String {
    format!(
        "/api/namespaces/{}/pipelines/{}/runs",
        namespace_id, pipeline_id
    )
}

#[async_trait]
impl HostApi for HostClient {
    async fn list_subscriptions(&self, extension_id: &str) -> Result<Vec<SubscriptionRecord>> {
        let path = format!("/api/extensions/{}/subscriptions", extension_id);
        let response = self.send(self.request(Method::GET, &path)).await?;

        let body: ListSubscriptionsResponse = response
            .json()
            .await
            .map_err(|e| Error::Decode(e.to_string()))?;

        debug!(extension_id, count = body.subscriptions.len(), "Listed subscriptions");
        Ok(body.subscriptions)
    }

    async fn start_run(
        &self,
        namespace_id: &NamespaceId,
        pipeline_id: &PipelineId,
        variables: &Variables,
    ) -> Result<StartedRun> {
        let request = self
            .request(Method::POST, &runs_path(namespace_id, pipeline_id))
            .json(&StartRunRequest { variables });
        let response = self.send(request).await?;

        let status_code = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        let envelope: RunEnvelope =
            serde_json::from_str(&body).map_err(|e| Error::Decode(e.to_string()))?;

        Ok(StartedRun {
            run_id: envelope.run.run_id,
            status_code,
            body,
        })
    }

    async fn get_run(
        &self,
        namespace_id: &NamespaceId,
        pipeline_id: &PipelineId,
        run_id: u64,
    ) -> Result<Run> {
        let path = format!("{}/{}", runs_path(namespace_id, pipeline_id), run_id);
        let response = self.send(self.request(Method::GET, &path)).await?;

        let envelope: RunEnvelope = response
            .json()
            .await
            .map_err(|e| Error::Decode(e.to_string()))?;

        Ok(Run {
            namespace_id: namespace_id.clone(),
            pipeline_id: pipeline_id.clone(),
            run_id: envelope.run.run_id,
            state: envelope.run.state,
            status: envelope.run.status,
            started_ms: envelope.run.started,
            ended_ms: envelope.run.ended,
        })
    }
}
