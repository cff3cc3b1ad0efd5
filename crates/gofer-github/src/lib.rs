//! GitHub webhook event source for Gofer.
//!
//! The host forwards GitHub deliveries to the extension's `external-event`
//! endpoint. Each delivery is authenticated with the webhook secret, decoded
//! into a typed payload, matched against the webhook registry, and fired with
//! run variables taken from the payload. Pull request subscriptions can also
//! publish a check run with the run's result.

pub mod checks;
pub mod config;
pub mod extension;
pub mod payload;
pub mod report;
pub mod signature;

pub use checks::{ChecksReporter, GithubAppReporter, ReportError};
pub use config::{AppCredentials, GithubConfig};
pub use extension::GithubExtension;
pub use payload::{WebhookPayload, parse_payload};
pub use report::{ReportOutcome, RunReport};
pub use signature::{sign, verify_signature};
