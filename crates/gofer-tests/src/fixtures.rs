//! Sample subscriptions and webhook deliveries.

use gofer_github::sign;
use serde_json::{Value, json};
use std::collections::HashMap;

pub const WEBHOOK_SECRET: &str = "e2e-webhook-secret";
pub const REPOSITORY: &str = "clintjedwards/experimental";

/// RSA key for a fake GitHub App.
pub const APP_KEY: &str = include_str!("../../gofer-github/tests/fixtures/app-key.pem");

/// A `list_subscriptions` record under `default/build`.
pub fn subscription_record(subscription_id: &str, settings: &[(&str, &str)]) -> Value {
    let settings: HashMap<&str, &str> = settings.iter().copied().collect();
    json!({
        "namespace_id": "default",
        "pipeline_id": "build",
        "subscription_id": subscription_id,
        "settings": settings,
    })
}

/// Headers and body of a webhook delivery signed with [`WEBHOOK_SECRET`].
pub fn signed_delivery(event: &str, body: &Value) -> (HashMap<String, String>, Vec<u8>) {
    let body = serde_json::to_vec(body).unwrap_or_default();
    let signature = sign(WEBHOOK_SECRET, &body).unwrap_or_default();
    let headers = [
        ("X-GitHub-Event".to_string(), event.to_string()),
        ("X-Hub-Signature-256".to_string(), signature),
    ]
    .into();
    (headers, body)
}

pub fn push_event(repository: &str) -> Value {
    json!({
        "ref": "refs/heads/main",
        "repository": { "full_name": repository },
        "head_commit": {
            "id": "1f2e3d4c",
            "author": { "name": "Clint", "email": "clint@example.com", "username": "clintjedwards" },
            "committer": { "name": "Clint", "email": "clint@example.com", "username": "clintjedwards" }
        }
    })
}

pub fn pull_request_event(repository: &str, action: &str, head_sha: &str) -> Value {
    json!({
        "action": action,
        "pull_request": {
            "number": 3,
            "head": { "ref": "feature", "sha": head_sha },
            "base": { "ref": "main", "sha": "0000000" },
            "user": { "login": "octocat" }
        },
        "repository": { "full_name": repository }
    })
}
