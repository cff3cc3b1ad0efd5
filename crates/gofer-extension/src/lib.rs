//! Gofer extension harness.
//!
//! Loads the system configuration, exposes the lifecycle API the host calls,
//! restores subscriptions on boot, hands firings to the host and shuts down
//! within a bounded drain window. Event sources plug in through
//! [`Extension`].

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod extension;
pub mod handlers;
pub mod lifecycle;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod telemetry;

pub use config::{ConfigError, LogFormat, SystemConfig};
pub use dispatcher::Dispatcher;
pub use error::{ApiError, HarnessError};
pub use extension::{Extension, ExtensionContext, ExternalEvent};
pub use lifecycle::{HarnessState, Lifecycle};
pub use routes::create_router;
pub use server::{DRAIN_TIMEOUT, Harness};
pub use state::AppState;
pub use telemetry::init_logging;
