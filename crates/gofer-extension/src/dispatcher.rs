//! The dispatch sink event sources fire into.

use async_trait::async_trait;
use gofer_core::ids::SubscriptionKey;
use gofer_core::ports::{DispatchSink, HostApi, Variables};
use gofer_core::run::StartedRun;
use gofer_core::{Error, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Starts host runs for firings.
///
/// Each firing is independent: a failure is logged with the subscription key
/// and returned, nothing is retried or queued.
pub struct Dispatcher {
    host: Arc<dyn HostApi>,
    abort: CancellationToken,
}

impl Dispatcher {
    /// `abort` cancels in-flight start requests once the drain window closes.
    pub fn new(host: Arc<dyn HostApi>, abort: CancellationToken) -> Self {
        Self { host, abort }
    }
}

#[async_trait]
impl DispatchSink for Dispatcher {
    async fn fire(&self, key: &SubscriptionKey, variables: Variables) -> Result<StartedRun> {
        let result = tokio::select! {
            _ = self.abort.cancelled() => Err(Error::Cancelled),
            result = self.host.start_run(&key.namespace_id, &key.pipeline_id, &variables) => result,
        };

        match &result {
            Ok(started) => info!(
                namespace_id = %key.namespace_id,
                pipeline_id = %key.pipeline_id,
                subscription_id = %key.subscription_id,
                run_id = started.run_id,
                "Started run"
            ),
            Err(e) => error!(
                namespace_id = %key.namespace_id,
                pipeline_id = %key.pipeline_id,
                subscription_id = %key.subscription_id,
                error = %e,
                "Could not start run"
            ),
        }

        result
    }
}
