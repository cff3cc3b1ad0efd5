//! Port traits.
//!
//! These traits define the interfaces between the extension core and the
//! outside world: the host API it calls, and the sink event sources fire into.

use crate::ids::{NamespaceId, PipelineId, SubscriptionKey};
use crate::run::{Run, StartedRun};
use crate::subscription::SubscriptionRecord;
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Run variables forwarded verbatim to the host.
pub type Variables = HashMap<String, String>;

/// Outbound calls the extension makes to the host.
#[async_trait]
pub trait HostApi: Send + Sync {
    /// List every subscription the host holds for this extension.
    async fn list_subscriptions(&self, extension_id: &str) -> Result<Vec<SubscriptionRecord>>;

    /// Ask the host to start a run.
    async fn start_run(
        &self,
        namespace_id: &NamespaceId,
        pipeline_id: &PipelineId,
        variables: &Variables,
    ) -> Result<StartedRun>;

    /// Fetch the current state of a run.
    async fn get_run(
        &self,
        namespace_id: &NamespaceId,
        pipeline_id: &PipelineId,
        run_id: u64,
    ) -> Result<Run>;
}

/// Where event sources send firings.
///
/// Implementations log failures with the subscription key before returning
/// them; callers only need the error to decide on follow-up work.
#[async_trait]
pub trait DispatchSink: Send + Sync {
    async fn fire(&self, key: &SubscriptionKey, variables: Variables) -> Result<StartedRun>;
}
