//! Boot-time system configuration.
//!
//! Every extension reads the same set of `GOFER_EXTENSION_SYSTEM_*` variables.
//! Keys the harness does not know about are kept in [`SystemConfig::extras`]
//! for the event source to interpret.

use config::{Config, Environment};
use gofer_host::HostClientConfig;
use rustls::ServerConfig;
use rustls::crypto::aws_lc_rs;
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Prefix shared by every system configuration variable.
pub const ENV_PREFIX: &str = "GOFER_EXTENSION_SYSTEM";

const KEY_ID: &str = "ID";
const KEY_SECRET: &str = "SECRET";
const KEY_LOG_LEVEL: &str = "LOG_LEVEL";
const KEY_LOG_FORMAT: &str = "LOG_FORMAT";
const KEY_USE_TLS: &str = "USE_TLS";
const KEY_TLS_CERT: &str = "TLS_CERT";
const KEY_TLS_KEY: &str = "TLS_KEY";
const KEY_BIND_ADDRESS: &str = "BIND_ADDRESS";
const KEY_HOST_ADDRESS: &str = "HOST_ADDRESS";
const KEY_SKIP_TLS_VERIFY: &str = "SKIP_TLS_VERIFY";
const KEY_REQUEST_TIMEOUT: &str = "REQUEST_TIMEOUT_SECS";

/// One problem with one configuration variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub key: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}: {}", ENV_PREFIX, self.key, self.message)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {}", join_diagnostics(.0))]
    Invalid(Vec<Diagnostic>),

    #[error("Could not read configuration: {0}")]
    Source(#[from] config::ConfigError),
}

impl ConfigError {
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            ConfigError::Invalid(diagnostics) => diagnostics,
            ConfigError::Source(_) => &[],
        }
    }
}

fn join_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format '{}' (expected json or pretty)", other)),
        }
    }
}

/// PEM-encoded certificate chain and private key for the listener.
#[derive(Clone)]
pub struct TlsMaterial {
    pub cert_pem: String,
    pub key_pem: String,
}

impl fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("cert_pem", &format_args!("<{} bytes>", self.cert_pem.len()))
            .field("key_pem", &"<redacted>")
            .finish()
    }
}

impl TlsMaterial {
    /// Build a rustls server config, checking that the key belongs to the certificate.
    pub fn server_config(&self) -> Result<Arc<ServerConfig>, String> {
        let certs = CertificateDer::pem_slice_iter(self.cert_pem.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("could not parse certificate: {}", e))?;
        if certs.is_empty() {
            return Err("no certificate found in PEM input".to_string());
        }

        let key = PrivateKeyDer::from_pem_slice(self.key_pem.as_bytes())
            .map_err(|e| format!("could not parse private key: {}", e))?;

        let config = ServerConfig::builder_with_provider(Arc::new(aws_lc_rs::default_provider()))
            .with_safe_default_protocol_versions()
            .map_err(|e| e.to_string())?
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(|e| format!("certificate and key do not form a usable pair: {}", e))?;

        Ok(Arc::new(config))
    }
}

/// Immutable boot configuration shared by the harness and the event source.
///
/// Serializing this type yields the non-secret portion only.
#[derive(Debug, Clone, Serialize)]
pub struct SystemConfig {
    pub extension_id: String,
    #[serde(skip)]
    pub shared_secret: String,
    pub bind_address: SocketAddr,
    pub host_address: String,
    pub use_tls: bool,
    #[serde(skip)]
    pub tls: Option<TlsMaterial>,
    pub skip_tls_verify: bool,
    pub log_level: String,
    pub log_format: LogFormat,
    pub request_timeout_secs: u64,
    /// Event-source keys, upper-cased, prefix stripped. May hold secrets.
    #[serde(skip)]
    pub extras: BTreeMap<String, String>,
}

impl SystemConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Environment::with_prefix(ENV_PREFIX))
    }

    /// Load from an explicit variable map, as if it were the environment.
    pub fn from_source(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::load(Environment::with_prefix(ENV_PREFIX).source(Some(vars)))
    }

    fn load(source: Environment) -> Result<Self, ConfigError> {
        let raw: HashMap<String, String> = Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?;

        let mut vars: BTreeMap<String, String> = raw
            .into_iter()
            .map(|(k, v)| (k.to_uppercase(), v))
            .collect();

        let mut parser = Parser::default();

        let extension_id = parser.required(&mut vars, KEY_ID);
        let shared_secret = parser.required(&mut vars, KEY_SECRET);
        let log_level = parser.string_or(&mut vars, KEY_LOG_LEVEL, "info");
        let log_format = parser.parsed_or(&mut vars, KEY_LOG_FORMAT, LogFormat::Json);
        let use_tls = parser.bool_or(&mut vars, KEY_USE_TLS, true);
        let skip_tls_verify = parser.bool_or(&mut vars, KEY_SKIP_TLS_VERIFY, false);
        let host_address = parser.string_or(&mut vars, KEY_HOST_ADDRESS, "localhost:8080");
        let bind_address = parser.parsed_or(
            &mut vars,
            KEY_BIND_ADDRESS,
            SocketAddr::from(([0, 0, 0, 0], 8082)),
        );
        let request_timeout_secs = parser.parsed_or(&mut vars, KEY_REQUEST_TIMEOUT, 15u64);
        if request_timeout_secs == 0 {
            parser.fail(KEY_REQUEST_TIMEOUT, "must be greater than zero");
        }

        let cert_pem = non_empty(vars.remove(KEY_TLS_CERT));
        let key_pem = non_empty(vars.remove(KEY_TLS_KEY));
        let tls = if use_tls {
            match (cert_pem, key_pem) {
                (Some(cert_pem), Some(key_pem)) => {
                    let material = TlsMaterial { cert_pem, key_pem };
                    match material.server_config() {
                        Ok(_) => Some(material),
                        Err(message) => {
                            parser.fail(KEY_TLS_CERT, &message);
                            None
                        }
                    }
                }
                (cert, key) => {
                    if cert.is_none() {
                        parser.fail(KEY_TLS_CERT, "required when USE_TLS is true");
                    }
                    if key.is_none() {
                        parser.fail(KEY_TLS_KEY, "required when USE_TLS is true");
                    }
                    None
                }
            }
        } else {
            None
        };

        parser.finish()?;

        Ok(Self {
            extension_id,
            shared_secret,
            bind_address,
            host_address,
            use_tls,
            tls,
            skip_tls_verify,
            log_level,
            log_format,
            request_timeout_secs,
            extras: vars,
        })
    }

    /// Case-insensitive lookup of an event-source key (prefix already stripped).
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extras
            .get(&key.to_uppercase())
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Host client settings derived from this config.
    pub fn host_client_config(&self) -> HostClientConfig {
        HostClientConfig::new(&self.host_address, &self.shared_secret)
            .with_tls(self.use_tls)
            .with_skip_tls_verify(self.skip_tls_verify)
            .with_timeout(self.request_timeout())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Collects one diagnostic per bad field instead of stopping at the first.
#[derive(Default)]
struct Parser {
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    fn fail(&mut self, key: &str, message: &str) {
        self.diagnostics.push(Diagnostic {
            key: key.to_string(),
            message: message.to_string(),
        });
    }

    fn required(&mut self, vars: &mut BTreeMap<String, String>, key: &str) -> String {
        match non_empty(vars.remove(key)) {
            Some(value) => value.trim().to_string(),
            None => {
                self.fail(key, "required");
                String::new()
            }
        }
    }

    fn string_or(&mut self, vars: &mut BTreeMap<String, String>, key: &str, default: &str) -> String {
        non_empty(vars.remove(key))
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| default.to_string())
    }

    fn bool_or(&mut self, vars: &mut BTreeMap<String, String>, key: &str, default: bool) -> bool {
        let Some(value) = non_empty(vars.remove(key)) else {
            return default;
        };
        match value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => {
                self.fail(key, &format!("expected a boolean, got '{}'", value));
                default
            }
        }
    }

    fn parsed_or<T>(&mut self, vars: &mut BTreeMap<String, String>, key: &str, default: T) -> T
    where
        T: std::str::FromStr,
        T::Err: fmt::Display,
    {
        let Some(value) = non_empty(vars.remove(key)) else {
            return default;
        };
        match value.trim().parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                self.fail(key, &format!("could not parse '{}': {}", value, e));
                default
            }
        }
    }

    fn finish(self) -> Result<(), ConfigError> {
        if self.diagnostics.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(self.diagnostics))
        }
    }
}
