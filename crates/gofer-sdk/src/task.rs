//! Task definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parent outcome a task waits for before it may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredParentStatus {
    /// Start once the parent finishes, whatever its result.
    #[default]
    Any,
    Success,
    Failure,
}

/// Credentials for pulling a private image.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryAuth {
    pub user: String,
    pub pass: String,
}

impl std::fmt::Debug for RegistryAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryAuth")
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .finish()
    }
}

/// A single container step of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<Vec<String>>,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    #[serde(default)]
    pub depends_on: BTreeMap<String, RequiredParentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_auth: Option<RegistryAuth>,
    #[serde(default)]
    pub inject_api_token: bool,
}

impl Task {
    pub fn new(id: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            image: image.into(),
            command: None,
            entrypoint: None,
            variables: BTreeMap::new(),
            depends_on: BTreeMap::new(),
            registry_auth: None,
            inject_api_token: false,
        }
    }

    pub fn command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = Some(command.into_iter().map(Into::into).collect());
        self
    }

    pub fn entrypoint<I, S>(mut self, entrypoint: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entrypoint = Some(entrypoint.into_iter().map(Into::into).collect());
        self
    }

    pub fn variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    pub fn variables<I, K, V>(mut self, variables: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.variables
            .extend(variables.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Wait for `task_id` to finish with `status` before starting.
    pub fn depends_on(mut self, task_id: impl Into<String>, status: RequiredParentStatus) -> Self {
        self.depends_on.insert(task_id.into(), status);
        self
    }

    pub fn registry_auth(mut self, user: impl Into<String>, pass: impl Into<String>) -> Self {
        self.registry_auth = Some(RegistryAuth {
            user: user.into(),
            pass: pass.into(),
        });
        self
    }

    /// Ask the host to inject a Gofer API token into the task's environment.
    pub fn inject_api_token(mut self, inject: bool) -> Self {
        self.inject_api_token = inject;
        self
    }
}
