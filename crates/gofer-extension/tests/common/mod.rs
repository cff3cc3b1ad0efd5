//! Fakes shared by the harness tests.

#![allow(dead_code)]

use async_trait::async_trait;
use gofer_core::ids::{NamespaceId, PipelineId, SubscriptionKey};
use gofer_core::ports::{HostApi, Variables};
use gofer_core::run::{Run, StartedRun};
use gofer_core::subscription::{SubscriptionParams, SubscriptionRecord};
use gofer_core::{Error, Result};
use gofer_extension::{Extension, ExtensionContext, SystemConfig};
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

pub const SECRET: &str = "test-secret";

pub fn test_config() -> SystemConfig {
    let vars: HashMap<String, String> = [
        ("GOFER_EXTENSION_SYSTEM_ID", "fake"),
        ("GOFER_EXTENSION_SYSTEM_SECRET", SECRET),
        ("GOFER_EXTENSION_SYSTEM_USE_TLS", "false"),
        ("GOFER_EXTENSION_SYSTEM_BIND_ADDRESS", "127.0.0.1:0"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    SystemConfig::from_source(vars).unwrap()
}

/// Extension that requires an `expression` parameter and records keys.
#[derive(Default)]
pub struct FakeExtension {
    pub keys: Mutex<BTreeSet<SubscriptionKey>>,
    pub fail_source: bool,
    pub source_stopped: AtomicBool,
}

#[async_trait]
impl Extension for FakeExtension {
    fn documentation(&self) -> String {
        "Requires `expression`.".to_string()
    }

    async fn subscribe(&self, key: SubscriptionKey, params: SubscriptionParams) -> Result<()> {
        params.require("expression")?;
        let mut keys = self.keys.lock().unwrap();
        if !keys.insert(key.clone()) {
            return Err(Error::SubscriptionExists(key.to_string()));
        }
        Ok(())
    }

    async fn unsubscribe(&self, key: &SubscriptionKey) -> bool {
        self.keys.lock().unwrap().remove(key)
    }

    async fn registered(&self) -> Vec<SubscriptionKey> {
        self.keys.lock().unwrap().iter().cloned().collect()
    }

    async fn run(&self, ctx: ExtensionContext) -> Result<()> {
        if self.fail_source {
            return Err(Error::Internal("source exploded".into()));
        }
        ctx.shutdown.cancelled().await;
        self.source_stopped.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Host that serves a fixed subscription list.
#[derive(Default)]
pub struct FakeHost {
    pub records: Vec<SubscriptionRecord>,
    pub unreachable: bool,
    pub started: Mutex<Vec<(String, Variables)>>,
}

impl FakeHost {
    pub fn with_records(records: Vec<SubscriptionRecord>) -> Self {
        Self {
            records,
            ..Default::default()
        }
    }
}

pub fn record(subscription_id: &str, expression: &str) -> SubscriptionRecord {
    SubscriptionRecord {
        namespace_id: "default".to_string(),
        pipeline_id: "build".to_string(),
        subscription_id: subscription_id.to_string(),
        settings: [("expression".to_string(), expression.to_string())].into(),
    }
}

#[async_trait]
impl HostApi for FakeHost {
    async fn list_subscriptions(&self, _extension_id: &str) -> Result<Vec<SubscriptionRecord>> {
        if self.unreachable {
            return Err(Error::Transport("connection refused".into()));
        }
        Ok(self.records.clone())
    }

    async fn start_run(
        &self,
        namespace_id: &NamespaceId,
        pipeline_id: &PipelineId,
        variables: &Variables,
    ) -> Result<StartedRun> {
        self.started
            .lock()
            .unwrap()
            .push((format!("{}/{}", namespace_id, pipeline_id), variables.clone()));
        Ok(StartedRun {
            run_id: 1,
            status_code: 201,
            body: String::new(),
        })
    }

    async fn get_run(
        &self,
        _namespace_id: &NamespaceId,
        _pipeline_id: &PipelineId,
        _run_id: u64,
    ) -> Result<Run> {
        Err(Error::Unsupported("get_run".into()))
    }
}
