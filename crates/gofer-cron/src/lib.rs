//! Cron event source for Gofer.
//!
//! Subscriptions carry a cron expression; once a minute the registry is
//! scanned and every subscription whose expression admits the current minute
//! gets a run.

pub mod config;
pub mod extension;
pub mod predicate;
pub mod ticker;

pub use config::CronConfig;
pub use extension::CronExtension;
pub use predicate::CronPredicate;
pub use ticker::Ticker;
