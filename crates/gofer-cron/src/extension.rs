//! The cron extension.

use crate::config::CronConfig;
use crate::predicate::{CronPredicate, EXPRESSION_PARAM};
use crate::ticker::Ticker;
use async_trait::async_trait;
use gofer_core::Result;
use gofer_core::ids::SubscriptionKey;
use gofer_core::subscription::{Subscription, SubscriptionParams};
use gofer_extension::{Extension, ExtensionContext};
use gofer_registry::TimeRegistry;

pub const DOCUMENTATION: &str = r#"Starts a pipeline run whenever the current minute matches a cron expression.

Parameters:
  expression  Required. Five fields, `minute hour day-of-month month day-of-week`,
              optionally followed by a year. Evaluated in UTC.
              Day-of-week runs 1-7 starting on Sunday, or SUN-SAT.

Examples:
  "*/15 * * * *"     every fifteen minutes
  "0 2 * * MON-FRI"  02:00 on weekdays
  "0 0 1 1 * 2030"   midnight on 1 January 2030 only

Runs are started with no variables. A subscription fires at most once per minute."#;

pub struct CronExtension {
    registry: TimeRegistry<CronPredicate>,
    ticker: Ticker,
}

impl CronExtension {
    pub fn new(config: CronConfig) -> Self {
        Self {
            registry: TimeRegistry::new(),
            ticker: Ticker::new(config.tick_interval),
        }
    }

    pub fn with_ticker(mut self, ticker: Ticker) -> Self {
        self.ticker = ticker;
        self
    }

    pub fn registry(&self) -> &TimeRegistry<CronPredicate> {
        &self.registry
    }
}

#[async_trait]
impl Extension for CronExtension {
    fn documentation(&self) -> String {
        DOCUMENTATION.to_string()
    }

    async fn subscribe(&self, key: SubscriptionKey, params: SubscriptionParams) -> Result<()> {
        let predicate = CronPredicate::parse(params.require(EXPRESSION_PARAM)?)?;
        self.registry
            .insert(Subscription::new(key, predicate, params))
            .await
    }

    async fn unsubscribe(&self, key: &SubscriptionKey) -> bool {
        self.registry.remove(key).await
    }

    async fn registered(&self) -> Vec<SubscriptionKey> {
        self.registry.keys().await
    }

    async fn run(&self, ctx: ExtensionContext) -> Result<()> {
        self.ticker.run(&self.registry, &ctx).await;
        Ok(())
    }
}
