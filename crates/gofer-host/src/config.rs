//! Configuration for the host client.

use std::time::Duration;

/// Value sent in the `api-version` header on every call.
pub const API_VERSION: &str = "v0";

/// Configuration for talking to the host.
#[derive(Debug, Clone)]
pub struct HostClientConfig {
    /// Host address without scheme, e.g. `localhost:8080`.
    pub host_address: String,
    /// Use `https` when true, `http` otherwise.
    pub use_tls: bool,
    /// Skip verification of the host certificate.
    pub skip_tls_verify: bool,
    /// Bearer credential.
    pub token: String,
    /// Per-call deadline.
    pub timeout: Duration,
}

impl Default for HostClientConfig {
    fn default() -> Self {
        Self {
            host_address: "localhost:8080".to_string(),
            use_tls: true,
            skip_tls_verify: false,
            token: String::new(),
            timeout: Duration::from_secs(15),
        }
    }
}

impl HostClientConfig {
    pub fn new(host_address: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            host_address: host_address.into(),
            token: token.into(),
            ..Default::default()
        }
    }

    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    pub fn with_skip_tls_verify(mut self, skip: bool) -> Self {
        self.skip_tls_verify = skip;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base URL derived from the address and scheme choice.
    ///
    /// An address that already carries a scheme is used as-is.
    pub fn base_url(&self) -> String {
        let address = self.host_address.trim_end_matches('/');
        if address.starts_with("http://") || address.starts_with("https://") {
            return address.to_string();
        }
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{}://{}", scheme, address)
    }
}
