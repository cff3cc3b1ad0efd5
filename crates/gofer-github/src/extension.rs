//! The GitHub webhook extension.

use crate::checks::{ChecksReporter, GithubAppReporter};
use crate::config::GithubConfig;
use crate::payload::parse_payload;
use crate::report::RunReport;
use crate::signature::{SIGNATURE_HEADER, verify_signature};
use async_trait::async_trait;
use gofer_core::events::WebhookEvent;
use gofer_core::ids::SubscriptionKey;
use gofer_core::subscription::{Subscription, SubscriptionParams};
use gofer_core::{Error, Result};
use gofer_extension::{Extension, ExtensionContext, ExternalEvent};
use gofer_registry::{Repository, WebhookMatch, WebhookRegistry, parse_event_filter};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub const REPOSITORY_PARAM: &str = "repository";
pub const EVENT_PARAM: &str = "event";

/// Headers carrying the event name, in lookup order.
pub const EVENT_HEADERS: [&str; 2] = ["X-GitHub-Event", "X-Event-Type"];

pub const DOCUMENTATION: &str = r#"Starts a pipeline run when GitHub delivers a matching webhook.

Parameters:
  repository  Required. Repository full name, `owner/name`.
  event       Required. `<event>` or `<event>:<action>[,<action>...]`.
              Without actions every action of the event matches.

Examples:
  repository=acme/widgets event=push
  repository=acme/widgets event=pull_request:opened,synchronize
  repository=acme/widgets event=pull_request_with_check:opened

`pull_request_with_check` behaves like `pull_request` and also publishes a
check run on the pull request head with the run's result. It needs the
GitHub App settings (APP_ID, APP_INSTALLATION, APP_KEY).

Runs receive EVENT, ACTION and REPOSITORY plus event-specific variables such
as REF and HEAD_COMMIT_ID for push or PULLREQUEST_HEAD_SHA for pull requests."#;

pub struct GithubExtension {
    registry: WebhookRegistry,
    webhook_secret: String,
    reporter: Option<Arc<dyn ChecksReporter>>,
    poll_interval: Duration,
}

impl GithubExtension {
    /// Build the extension; a GitHub App reporter is created when credentials are set.
    pub fn new(config: &GithubConfig, request_timeout: Duration) -> Result<Self> {
        let reporter = match &config.app {
            Some(app) => {
                let reporter = GithubAppReporter::new(&config.api_url, app, request_timeout)
                    .map_err(|e| Error::Internal(e.to_string()))?;
                Some(Arc::new(reporter) as Arc<dyn ChecksReporter>)
            }
            None => None,
        };

        Ok(Self {
            registry: WebhookRegistry::new(),
            webhook_secret: config.webhook_secret.clone(),
            reporter,
            poll_interval: config.poll_interval,
        })
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ChecksReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn registry(&self) -> &WebhookRegistry {
        &self.registry
    }

    pub fn reports_checks(&self) -> bool {
        self.reporter.is_some()
    }
}

#[async_trait]
impl Extension for GithubExtension {
    fn documentation(&self) -> String {
        DOCUMENTATION.to_string()
    }

    async fn subscribe(&self, key: SubscriptionKey, params: SubscriptionParams) -> Result<()> {
        let repository = Repository::new(params.require(REPOSITORY_PARAM)?)?;
        let filter = parse_event_filter(params.require(EVENT_PARAM)?)?;

        if filter.event.reports_back() && self.reporter.is_none() {
            return Err(Error::InvalidParameter {
                key: EVENT_PARAM.to_string(),
                reason: format!("'{}' needs GitHub App credentials", filter.event),
            });
        }

        debug!(
            subscription_id = %key.subscription_id,
            repository = %repository,
            filter = %filter,
            "Registering webhook subscription"
        );
        self.registry
            .insert(Subscription::new(key, WebhookMatch::new(filter, repository), params))
            .await
    }

    async fn unsubscribe(&self, key: &SubscriptionKey) -> bool {
        self.registry.remove(key).await
    }

    async fn registered(&self) -> Vec<SubscriptionKey> {
        self.registry.keys().await
    }

    /// Nothing to drive; webhooks arrive through `external_event`.
    async fn run(&self, ctx: ExtensionContext) -> Result<()> {
        ctx.shutdown.cancelled().await;
        Ok(())
    }

    async fn external_event(&self, ctx: &ExtensionContext, event: ExternalEvent) -> Result<()> {
        verify_signature(&self.webhook_secret, &event.body, event.header(SIGNATURE_HEADER))?;

        let name = EVENT_HEADERS
            .iter()
            .find_map(|header| event.header(header))
            .ok_or_else(|| Error::InvalidPayload("missing event header".to_string()))?;
        let kind: WebhookEvent = match name.parse() {
            Ok(kind) => kind,
            Err(_) => {
                debug!(event = name, "Ignoring unrecognised webhook event");
                return Ok(());
            }
        };

        let payload = parse_payload(kind, &event.body)?;
        let repository = Repository::new(payload.repository())?;
        let action = payload.action();

        let matches = self.registry.lookup_webhook(kind, &repository, action).await;
        if matches.is_empty() {
            debug!(event = %kind, repository = %repository, action, "No matching subscriptions");
            return Ok(());
        }

        info!(
            event = %kind,
            repository = %repository,
            action,
            matches = matches.len(),
            "Dispatching webhook"
        );

        let variables = payload.metadata(kind);
        for subscription in matches {
            // Failures are logged by the dispatcher; siblings still fire.
            let Ok(started) = ctx
                .dispatcher
                .fire(&subscription.key, variables.clone())
                .await
            else {
                continue;
            };

            if !subscription.matcher.reports_back() {
                continue;
            }
            let (Some(reporter), Some(head_sha)) = (&self.reporter, payload.head_sha()) else {
                continue;
            };

            RunReport {
                host: ctx.host.clone(),
                reporter: reporter.clone(),
                key: subscription.key.clone(),
                repository: repository.clone(),
                head_sha: head_sha.to_string(),
                run_id: started.run_id,
                poll_interval: self.poll_interval,
            }
            .spawn(ctx.shutdown.clone());
        }

        Ok(())
    }
}
