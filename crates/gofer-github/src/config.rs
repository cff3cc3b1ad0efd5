//! GitHub extension settings read from the system config extras.

use gofer_extension::SystemConfig;
use gofer_extension::config::{ConfigError, Diagnostic};
use jsonwebtoken::EncodingKey;
use std::fmt;
use std::time::Duration;
use url::Url;

const KEY_WEBHOOK_SECRET: &str = "APP_WEBHOOK_SECRET";
const KEY_APP_ID: &str = "APP_ID";
const KEY_INSTALLATION: &str = "APP_INSTALLATION";
const KEY_PRIVATE_KEY: &str = "APP_KEY";
const KEY_API_URL: &str = "APP_API_URL";

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Cadence of `get_run` polls while a check report is outstanding.
pub const REPORT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// GitHub App identity used to publish check runs.
#[derive(Clone)]
pub struct AppCredentials {
    pub app_id: u64,
    pub installation_id: u64,
    pub private_key_pem: String,
}

impl fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppCredentials")
            .field("app_id", &self.app_id)
            .field("installation_id", &self.installation_id)
            .field("private_key_pem", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct GithubConfig {
    pub webhook_secret: String,
    /// `None` disables check reporting.
    pub app: Option<AppCredentials>,
    pub api_url: String,
    pub poll_interval: Duration,
}

impl fmt::Debug for GithubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubConfig")
            .field("webhook_secret", &"<redacted>")
            .field("app", &self.app)
            .field("api_url", &self.api_url)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl GithubConfig {
    pub fn new(webhook_secret: impl Into<String>) -> Self {
        Self {
            webhook_secret: webhook_secret.into(),
            app: None,
            api_url: DEFAULT_API_URL.to_string(),
            poll_interval: REPORT_POLL_INTERVAL,
        }
    }

    pub fn with_app(mut self, app: AppCredentials) -> Self {
        self.app = Some(app);
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Read the `APP_*` extras. Every bad key is reported, not just the first.
    pub fn from_system(config: &SystemConfig) -> Result<Self, ConfigError> {
        let mut diagnostics = Vec::new();

        let webhook_secret = match config.extra(KEY_WEBHOOK_SECRET) {
            Some(secret) => secret.to_string(),
            None => {
                diagnostics.push(diagnostic(KEY_WEBHOOK_SECRET, "required"));
                String::new()
            }
        };

        let api_url = config
            .extra(KEY_API_URL)
            .unwrap_or(DEFAULT_API_URL)
            .trim_end_matches('/')
            .to_string();
        if let Err(e) = Url::parse(&api_url) {
            diagnostics.push(diagnostic(KEY_API_URL, &format!("invalid URL: {}", e)));
        }

        let app_id = config.extra(KEY_APP_ID);
        let installation = config.extra(KEY_INSTALLATION);
        let private_key = config.extra(KEY_PRIVATE_KEY);

        let app = match (app_id, installation, private_key) {
            (None, None, None) => None,
            (Some(app_id), Some(installation), Some(private_key)) => {
                let app_id = parse_id(KEY_APP_ID, app_id, &mut diagnostics);
                let installation_id = parse_id(KEY_INSTALLATION, installation, &mut diagnostics);
                if let Err(e) = EncodingKey::from_rsa_pem(private_key.as_bytes()) {
                    diagnostics.push(diagnostic(
                        KEY_PRIVATE_KEY,
                        &format!("not an RSA private key: {}", e),
                    ));
                }
                Some(AppCredentials {
                    app_id,
                    installation_id,
                    private_key_pem: private_key.to_string(),
                })
            }
            (app_id, installation, private_key) => {
                for (key, value) in [
                    (KEY_APP_ID, app_id),
                    (KEY_INSTALLATION, installation),
                    (KEY_PRIVATE_KEY, private_key),
                ] {
                    if value.is_none() {
                        diagnostics.push(diagnostic(
                            key,
                            "required when any GitHub App setting is present",
                        ));
                    }
                }
                None
            }
        };

        if !diagnostics.is_empty() {
            return Err(ConfigError::Invalid(diagnostics));
        }

        Ok(Self {
            webhook_secret,
            app,
            api_url,
            poll_interval: REPORT_POLL_INTERVAL,
        })
    }
}

fn parse_id(key: &str, raw: &str, diagnostics: &mut Vec<Diagnostic>) -> u64 {
    raw.trim().parse().unwrap_or_else(|_| {
        diagnostics.push(diagnostic(key, &format!("expected a number, got '{}'", raw)));
        0
    })
}

fn diagnostic(key: &str, message: &str) -> Diagnostic {
    Diagnostic {
        key: key.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const APP_KEY: &str = include_str!("../tests/fixtures/app-key.pem");

    fn system(extras: &[(&str, &str)]) -> SystemConfig {
        let mut vars: HashMap<String, String> = [
            ("GOFER_EXTENSION_SYSTEM_ID", "github"),
            ("GOFER_EXTENSION_SYSTEM_SECRET", "s3cret"),
            ("GOFER_EXTENSION_SYSTEM_USE_TLS", "false"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (key, value) in extras {
            vars.insert(format!("GOFER_EXTENSION_SYSTEM_{}", key), value.to_string());
        }
        SystemConfig::from_source(vars).unwrap()
    }

    fn keys(err: &ConfigError) -> Vec<&str> {
        err.diagnostics().iter().map(|d| d.key.as_str()).collect()
    }

    #[test]
    fn test_webhook_secret_is_required() {
        let err = GithubConfig::from_system(&system(&[])).unwrap_err();
        assert_eq!(keys(&err), vec!["APP_WEBHOOK_SECRET"]);
    }

    #[test]
    fn test_app_is_optional() {
        let config = GithubConfig::from_system(&system(&[("APP_WEBHOOK_SECRET", "hook")])).unwrap();
        assert_eq!(config.webhook_secret, "hook");
        assert!(config.app.is_none());
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.poll_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_full_app_credentials() {
        let config = GithubConfig::from_system(&system(&[
            ("APP_WEBHOOK_SECRET", "hook"),
            ("APP_ID", "1234"),
            ("APP_INSTALLATION", "5678"),
            ("APP_KEY", APP_KEY),
            ("APP_API_URL", "https://github.example.com/api/v3/"),
        ]))
        .unwrap();

        let app = config.app.as_ref().unwrap();
        assert_eq!(app.app_id, 1234);
        assert_eq!(app.installation_id, 5678);
        assert_eq!(config.api_url, "https://github.example.com/api/v3");
        assert!(!format!("{:?}", config).contains("PRIVATE KEY"));
    }

    #[test]
    fn test_partial_app_credentials_rejected() {
        let err = GithubConfig::from_system(&system(&[
            ("APP_WEBHOOK_SECRET", "hook"),
            ("APP_ID", "1234"),
        ]))
        .unwrap_err();
        assert_eq!(keys(&err), vec!["APP_INSTALLATION", "APP_KEY"]);
    }

    #[test]
    fn test_bad_values_each_reported() {
        let err = GithubConfig::from_system(&system(&[
            ("APP_WEBHOOK_SECRET", "hook"),
            ("APP_ID", "one"),
            ("APP_INSTALLATION", "5678"),
            ("APP_KEY", "not a key"),
        ]))
        .unwrap_err();
        assert_eq!(keys(&err), vec!["APP_ID", "APP_KEY"]);
    }
}
