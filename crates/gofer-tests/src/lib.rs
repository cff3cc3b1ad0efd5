//! End-to-end test infrastructure for Gofer extensions.
//!
//! Runs a real harness on a loopback socket against a wiremock stand-in for
//! the host API.
//!
//! # Usage
//!
//! ```ignore
//! use gofer_tests::{MockHost, start_harness};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let host = MockHost::start().await;
//!     let harness = start_harness(extension, &host, &[]).await.unwrap();
//!     // Drive harness.client, inspect host.started_runs().
//! }
//! ```

pub mod fixtures;
pub mod helpers;
pub mod mock_host;

pub use fixtures::*;
pub use helpers::*;
pub use mock_host::MockHost;

/// Initialize test logging (call once per test binary).
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,gofer_extension=debug,gofer_github=debug")),
        )
        .with_test_writer()
        .try_init();
}
