//! Typed client for the Gofer host API.
//!
//! Covers the handful of calls an extension makes: listing its
//! subscriptions at boot, starting runs, and polling run state.

pub mod client;
pub mod config;
pub mod models;

pub use client::HostClient;
pub use config::HostClientConfig;
