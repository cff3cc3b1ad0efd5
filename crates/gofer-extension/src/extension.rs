//! The contract between the harness and an event source.

use async_trait::async_trait;
use gofer_core::ids::SubscriptionKey;
use gofer_core::ports::{DispatchSink, HostApi};
use gofer_core::subscription::SubscriptionParams;
use gofer_core::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Handles an event source receives from the harness.
#[derive(Clone)]
pub struct ExtensionContext {
    /// Where firings go; failures are already logged by the sink.
    pub dispatcher: Arc<dyn DispatchSink>,
    /// Direct host access for follow-up calls such as run polling.
    pub host: Arc<dyn HostApi>,
    /// Cancelled when the harness starts shutting down.
    pub shutdown: CancellationToken,
}

/// An HTTP request the host forwarded to the extension.
#[derive(Debug, Clone, Default)]
pub struct ExternalEvent {
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl ExternalEvent {
    pub fn new(headers: HashMap<String, String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            headers,
            body: body.into(),
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A pluggable event source.
///
/// The harness owns the HTTP surface and the lifecycle; implementations own
/// their registry and decide when a subscription fires.
#[async_trait]
pub trait Extension: Send + Sync + 'static {
    /// Human-readable description of the subscription parameters.
    fn documentation(&self) -> String;

    /// Validate the parameters and register the subscription.
    ///
    /// Returns [`Error::SubscriptionExists`] when the key is already registered.
    async fn subscribe(&self, key: SubscriptionKey, params: SubscriptionParams) -> Result<()>;

    /// Drop a subscription. Returns whether one was registered.
    async fn unsubscribe(&self, key: &SubscriptionKey) -> bool;

    /// Keys currently registered, sorted.
    async fn registered(&self) -> Vec<SubscriptionKey>;

    /// Producer loop. Returns once `ctx.shutdown` is cancelled.
    async fn run(&self, ctx: ExtensionContext) -> Result<()>;

    /// Handle a forwarded external request.
    async fn external_event(&self, _ctx: &ExtensionContext, _event: ExternalEvent) -> Result<()> {
        Err(Error::Unsupported(
            "this extension does not accept external events".to_string(),
        ))
    }
}
