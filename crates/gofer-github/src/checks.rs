//! Check runs published through a GitHub App installation.

use crate::config::AppCredentials;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use gofer_core::run::CheckConclusion;
use gofer_registry::Repository;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

pub const CHECK_NAME: &str = "gofer";

const USER_AGENT: &str = concat!("gofer-ext-github/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

/// Installation tokens are refreshed this long before GitHub expires them.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 300;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("GitHub API unreachable: {0}")]
    Transport(String),

    #[error("GitHub API returned {status_code}: {body}")]
    Http { status_code: u16, body: String },

    #[error("Could not decode GitHub response: {0}")]
    Decode(String),

    #[error("Could not sign app token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid reporter configuration: {0}")]
    Config(String),
}

/// Publishes check runs against a commit.
#[async_trait]
pub trait ChecksReporter: Send + Sync {
    /// Open an `in_progress` check on `head_sha`; returns the check run id.
    async fn create_check(
        &self,
        repository: &Repository,
        head_sha: &str,
        name: &str,
    ) -> Result<u64, ReportError>;

    /// Close the check with its final conclusion.
    async fn complete_check(
        &self,
        repository: &Repository,
        check_id: u64,
        conclusion: CheckConclusion,
        summary: &str,
    ) -> Result<(), ReportError>;
}

#[derive(Debug, Serialize)]
struct AppClaims {
    iat: i64,
    exp: i64,
    iss: String,
}

#[derive(Debug, Deserialize)]
struct InstallationToken {
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct CheckRunCreated {
    id: u64,
}

/// [`ChecksReporter`] backed by the GitHub REST API.
pub struct GithubAppReporter {
    client: Client,
    api_url: String,
    app_id: u64,
    installation_id: u64,
    key: EncodingKey,
    token: Mutex<Option<InstallationToken>>,
}

impl GithubAppReporter {
    pub fn new(
        api_url: &str,
        app: &AppCredentials,
        timeout: Duration,
    ) -> Result<Self, ReportError> {
        let key = EncodingKey::from_rsa_pem(app.private_key_pem.as_bytes())?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ReportError::Config(e.to_string()))?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            app_id: app.app_id,
            installation_id: app.installation_id,
            key,
            token: Mutex::new(None),
        })
    }

    /// Short-lived app JWT. Backdated a minute to absorb clock drift.
    fn app_jwt(&self) -> Result<String, ReportError> {
        let now = Utc::now();
        let claims = AppClaims {
            iat: (now - TimeDelta::seconds(60)).timestamp(),
            exp: (now + TimeDelta::minutes(9)).timestamp(),
            iss: self.app_id.to_string(),
        };
        Ok(encode(&Header::new(Algorithm::RS256), &claims, &self.key)?)
    }

    async fn installation_token(&self) -> Result<String, ReportError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at - TimeDelta::seconds(TOKEN_REFRESH_MARGIN_SECS) > Utc::now() {
                return Ok(token.token.clone());
            }
        }

        let path = format!("/app/installations/{}/access_tokens", self.installation_id);
        let request = self
            .request(Method::POST, &path)
            .bearer_auth(self.app_jwt()?);
        let token: InstallationToken = decode(send(request).await?).await?;
        debug!(
            installation_id = self.installation_id,
            expires_at = %token.expires_at,
            "Refreshed installation token"
        );

        let value = token.token.clone();
        *cached = Some(token);
        Ok(value)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.api_url, path))
            .header("Accept", ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    async fn authorized(&self, method: Method, path: &str) -> Result<RequestBuilder, ReportError> {
        let token = self.installation_token().await?;
        Ok(self.request(method, path).bearer_auth(token))
    }
}

async fn send(request: RequestBuilder) -> Result<Response, ReportError> {
    let response = request
        .send()
        .await
        .map_err(|e| ReportError::Transport(e.to_string()))?;

    if !response.status().is_success() {
        let status_code = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(ReportError::Http { status_code, body });
    }
    Ok(response)
}

async fn decode<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, ReportError> {
    response
        .json()
        .await
        .map_err(|e| ReportError::Decode(e.to_string()))
}

#[async_trait]
impl ChecksReporter for GithubAppReporter {
    async fn create_check(
        &self,
        repository: &Repository,
        head_sha: &str,
        name: &str,
    ) -> Result<u64, ReportError> {
        let path = format!("/repos/{}/check-runs", repository);
        let request = self.authorized(Method::POST, &path).await?.json(&json!({
            "name": name,
            "head_sha": head_sha,
            "status": "in_progress",
            "started_at": Utc::now().to_rfc3339(),
        }));

        let created: CheckRunCreated = decode(send(request).await?).await?;
        debug!(repository = %repository, check_id = created.id, "Created check run");
        Ok(created.id)
    }

    async fn complete_check(
        &self,
        repository: &Repository,
        check_id: u64,
        conclusion: CheckConclusion,
        summary: &str,
    ) -> Result<(), ReportError> {
        let path = format!("/repos/{}/check-runs/{}", repository, check_id);
        let request = self.authorized(Method::PATCH, &path).await?.json(&json!({
            "status": "completed",
            "conclusion": conclusion,
            "completed_at": Utc::now().to_rfc3339(),
            "output": {
                "title": format!("Run {}", conclusion),
                "summary": summary,
            },
        }));

        send(request).await?;
        debug!(repository = %repository, check_id, %conclusion, "Completed check run");
        Ok(())
    }
}
