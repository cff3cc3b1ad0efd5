//! In-memory subscription registries.
//!
//! Two shapes are provided, one per event source family:
//!
//! - [`TimeRegistry`]: a flat map keyed by subscription key, scanned on every tick.
//! - [`WebhookRegistry`]: a two-level index `event -> repository -> subscriptions`,
//!   filtered by action tag on lookup.
//!
//! Neither registry persists anything; extensions rebuild them from the host
//! on boot.

pub mod filter;
pub mod time;
pub mod webhook;

pub use filter::{ANY_ACTION, EventFilter, Repository, parse_event_filter};
pub use time::{TimePredicate, TimeRegistry};
pub use webhook::{WebhookMatch, WebhookRegistry};
