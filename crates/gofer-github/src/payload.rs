//! Typed webhook payloads and the run variables derived from them.
//!
//! Only the fields that feed matching or run variables are decoded; GitHub
//! sends far more. Optional fields missing from a payload become empty
//! strings so a given event kind always yields the same set of keys.

use gofer_core::events::WebhookEvent;
use gofer_core::ports::Variables;
use gofer_core::{Error, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryRef {
    pub full_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub id: Option<u64>,
    /// `User`, `Organization` or `Bot`.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitIdentity {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeadCommit {
    pub id: String,
    #[serde(default)]
    pub author: CommitIdentity,
    #[serde(default)]
    pub committer: CommitIdentity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushPayload {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub repository: RepositoryRef,
    /// Absent when a branch is deleted.
    #[serde(default)]
    pub head_commit: Option<HeadCommit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BranchRef {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub sha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub head: BranchRef,
    pub base: BranchRef,
    #[serde(default)]
    pub user: Account,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestPayload {
    pub action: String,
    pub pull_request: PullRequest,
    pub repository: RepositoryRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub target_commitish: String,
    #[serde(default)]
    pub author: Account,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleasePayload {
    pub action: String,
    pub release: Release,
    pub repository: RepositoryRef,
}

/// `create` and `delete` share a shape.
#[derive(Debug, Clone, Deserialize)]
pub struct RefPayload {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub ref_type: String,
    pub repository: RepositoryRef,
}

/// Any other recognised event; only the common envelope is read.
#[derive(Debug, Clone, Deserialize)]
pub struct GenericPayload {
    #[serde(default)]
    pub action: Option<String>,
    pub repository: RepositoryRef,
}

#[derive(Debug, Clone)]
pub enum WebhookPayload {
    Push(PushPayload),
    PullRequest(PullRequestPayload),
    Release(ReleasePayload),
    Ref(RefPayload),
    Generic(GenericPayload),
}

/// Decode `body` as the payload for `event`.
pub fn parse_payload(event: WebhookEvent, body: &[u8]) -> Result<WebhookPayload> {
    fn decode<T: for<'de> Deserialize<'de>>(event: WebhookEvent, body: &[u8]) -> Result<T> {
        serde_json::from_slice(body).map_err(|e| Error::InvalidPayload(format!("{}: {}", event, e)))
    }

    let payload = match event {
        WebhookEvent::Push => WebhookPayload::Push(decode(event, body)?),
        WebhookEvent::PullRequest
        | WebhookEvent::PullRequestWithCheck
        | WebhookEvent::PullRequestTarget => WebhookPayload::PullRequest(decode(event, body)?),
        WebhookEvent::Release => WebhookPayload::Release(decode(event, body)?),
        WebhookEvent::Create | WebhookEvent::Delete => WebhookPayload::Ref(decode(event, body)?),
        _ => WebhookPayload::Generic(decode(event, body)?),
    };
    Ok(payload)
}

impl WebhookPayload {
    /// Repository full name as sent, `owner/name`.
    pub fn repository(&self) -> &str {
        let repository = match self {
            WebhookPayload::Push(p) => &p.repository,
            WebhookPayload::PullRequest(p) => &p.repository,
            WebhookPayload::Release(p) => &p.repository,
            WebhookPayload::Ref(p) => &p.repository,
            WebhookPayload::Generic(p) => &p.repository,
        };
        &repository.full_name
    }

    pub fn action(&self) -> Option<&str> {
        match self {
            WebhookPayload::PullRequest(p) => Some(&p.action),
            WebhookPayload::Release(p) => Some(&p.action),
            WebhookPayload::Generic(p) => p.action.as_deref(),
            WebhookPayload::Push(_) | WebhookPayload::Ref(_) => None,
        }
    }

    /// Commit a check run would be attached to.
    pub fn head_sha(&self) -> Option<&str> {
        match self {
            WebhookPayload::PullRequest(p) => Some(&p.pull_request.head.sha),
            WebhookPayload::Push(p) => p.head_commit.as_ref().map(|c| c.id.as_str()),
            _ => None,
        }
    }

    /// Run variables for a firing of `event`. Keys are upper snake case.
    pub fn metadata(&self, event: WebhookEvent) -> Variables {
        let mut vars = Variables::new();
        let mut put = |key: &str, value: &str| {
            vars.insert(key.to_string(), value.to_string());
        };

        put("EVENT", event.as_str());
        put("ACTION", self.action().unwrap_or_default());
        put("REPOSITORY", self.repository());

        match self {
            WebhookPayload::Push(p) => {
                let commit = p.head_commit.as_ref();
                let author = commit.map(|c| &c.author);
                let committer = commit.map(|c| &c.committer);
                put("REF", &p.git_ref);
                put("HEAD_COMMIT_ID", commit.map(|c| c.id.as_str()).unwrap_or_default());
                put("HEAD_COMMIT_AUTHOR_NAME", field(author, |a| &a.name));
                put("HEAD_COMMIT_AUTHOR_EMAIL", field(author, |a| &a.email));
                put("HEAD_COMMIT_AUTHOR_USERNAME", field(author, |a| &a.username));
                put("HEAD_COMMIT_COMMITTER_NAME", field(committer, |c| &c.name));
                put("HEAD_COMMIT_COMMITTER_EMAIL", field(committer, |c| &c.email));
                put("HEAD_COMMIT_COMMITTER_USERNAME", field(committer, |c| &c.username));
            }
            WebhookPayload::PullRequest(p) => {
                let pr = &p.pull_request;
                put("PULLREQUEST_NUMBER", &pr.number.to_string());
                put("PULLREQUEST_HEAD_REF", &pr.head.git_ref);
                put("PULLREQUEST_HEAD_SHA", &pr.head.sha);
                put("PULLREQUEST_BASE_REF", &pr.base.git_ref);
                put("PULLREQUEST_AUTHOR_LOGIN", &pr.user.login);
                put(
                    "PULLREQUEST_AUTHOR_ID",
                    &pr.user.id.map(|id| id.to_string()).unwrap_or_default(),
                );
                put("PULLREQUEST_AUTHOR_TYPE", pr.user.kind.as_deref().unwrap_or_default());
                put("PULLREQUEST_AUTHOR_URL", pr.user.html_url.as_deref().unwrap_or_default());
            }
            WebhookPayload::Release(p) => {
                let release = &p.release;
                put("RELEASE_TAG_NAME", &release.tag_name);
                put("RELEASE_TARGET_COMMITISH", &release.target_commitish);
                put("RELEASE_AUTHOR_LOGIN", &release.author.login);
                put("RELEASE_CREATED_AT", release.created_at.as_deref().unwrap_or_default());
                put("RELEASE_PUBLISHED_AT", release.published_at.as_deref().unwrap_or_default());
            }
            WebhookPayload::Ref(p) => {
                put("REF", &p.git_ref);
                put("REF_TYPE", &p.ref_type);
            }
            WebhookPayload::Generic(_) => {}
        }

        vars
    }
}

fn field<'a>(
    identity: Option<&'a CommitIdentity>,
    get: impl Fn(&'a CommitIdentity) -> &'a Option<String>,
) -> &'a str {
    identity.and_then(|i| get(i).as_deref()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn body(value: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn test_push_metadata() {
        let payload = parse_payload(
            WebhookEvent::Push,
            &body(json!({
                "ref": "refs/heads/main",
                "repository": { "full_name": "acme/widgets" },
                "head_commit": {
                    "id": "abc123",
                    "author": { "name": "Ada", "email": "ada@example.com", "username": "ada" },
                    "committer": { "name": "GitHub", "email": "noreply@github.com" }
                }
            })),
        )
        .unwrap();

        assert_eq!(payload.repository(), "acme/widgets");
        assert_eq!(payload.action(), None);
        assert_eq!(payload.head_sha(), Some("abc123"));

        let vars = payload.metadata(WebhookEvent::Push);
        assert_eq!(vars["EVENT"], "push");
        assert_eq!(vars["ACTION"], "");
        assert_eq!(vars["REPOSITORY"], "acme/widgets");
        assert_eq!(vars["REF"], "refs/heads/main");
        assert_eq!(vars["HEAD_COMMIT_ID"], "abc123");
        assert_eq!(vars["HEAD_COMMIT_AUTHOR_USERNAME"], "ada");
        assert_eq!(vars["HEAD_COMMIT_COMMITTER_NAME"], "GitHub");
        assert_eq!(vars["HEAD_COMMIT_COMMITTER_USERNAME"], "");
    }

    #[test]
    fn test_push_without_head_commit_keeps_keys() {
        let payload = parse_payload(
            WebhookEvent::Push,
            &body(json!({
                "ref": "refs/heads/gone",
                "repository": { "full_name": "acme/widgets" },
                "head_commit": null
            })),
        )
        .unwrap();

        let vars = payload.metadata(WebhookEvent::Push);
        assert_eq!(vars.len(), 11);
        assert_eq!(vars["HEAD_COMMIT_ID"], "");
    }

    #[test]
    fn test_pull_request_variants_share_shape() {
        let raw = body(json!({
            "action": "opened",
            "pull_request": {
                "number": 42,
                "head": { "ref": "feature", "sha": "deadbeef" },
                "base": { "ref": "main", "sha": "cafef00d" },
                "user": { "login": "octocat" }
            },
            "repository": { "full_name": "acme/widgets" }
        }));

        for event in [
            WebhookEvent::PullRequest,
            WebhookEvent::PullRequestWithCheck,
            WebhookEvent::PullRequestTarget,
        ] {
            let payload = parse_payload(event, &raw).unwrap();
            assert_eq!(payload.action(), Some("opened"));
            assert_eq!(payload.head_sha(), Some("deadbeef"));

            let vars = payload.metadata(event);
            assert_eq!(vars["EVENT"], event.as_str());
            assert_eq!(vars["PULLREQUEST_NUMBER"], "42");
            assert_eq!(vars["PULLREQUEST_HEAD_REF"], "feature");
            assert_eq!(vars["PULLREQUEST_BASE_REF"], "main");
            assert_eq!(vars["PULLREQUEST_AUTHOR_LOGIN"], "octocat");
        }
    }

    #[test]
    fn test_pull_request_author_fields() {
        let raw = |user: serde_json::Value| {
            body(json!({
                "action": "opened",
                "pull_request": {
                    "number": 7,
                    "head": { "ref": "feature", "sha": "deadbeef" },
                    "base": { "ref": "main", "sha": "cafef00d" },
                    "user": user
                },
                "repository": { "full_name": "acme/widgets" }
            }))
        };

        let full = parse_payload(
            WebhookEvent::PullRequest,
            &raw(json!({
                "login": "octocat",
                "id": 583231,
                "type": "User",
                "html_url": "https://github.com/octocat"
            })),
        )
        .unwrap()
        .metadata(WebhookEvent::PullRequest);
        assert_eq!(full["PULLREQUEST_AUTHOR_LOGIN"], "octocat");
        assert_eq!(full["PULLREQUEST_AUTHOR_ID"], "583231");
        assert_eq!(full["PULLREQUEST_AUTHOR_TYPE"], "User");
        assert_eq!(full["PULLREQUEST_AUTHOR_URL"], "https://github.com/octocat");

        let sparse = parse_payload(WebhookEvent::PullRequest, &raw(json!({ "login": "octocat" })))
            .unwrap()
            .metadata(WebhookEvent::PullRequest);
        assert_eq!(sparse.len(), full.len());
        assert_eq!(sparse["PULLREQUEST_AUTHOR_ID"], "");
        assert_eq!(sparse["PULLREQUEST_AUTHOR_TYPE"], "");
        assert_eq!(sparse["PULLREQUEST_AUTHOR_URL"], "");
    }

    #[test]
    fn test_release_metadata() {
        let payload = parse_payload(
            WebhookEvent::Release,
            &body(json!({
                "action": "published",
                "release": {
                    "tag_name": "v1.2.0",
                    "target_commitish": "main",
                    "author": { "login": "octocat" },
                    "created_at": "2024-05-01T12:00:00Z",
                    "published_at": null
                },
                "repository": { "full_name": "acme/widgets" }
            })),
        )
        .unwrap();

        let vars = payload.metadata(WebhookEvent::Release);
        assert_eq!(vars["RELEASE_TAG_NAME"], "v1.2.0");
        assert_eq!(vars["RELEASE_AUTHOR_LOGIN"], "octocat");
        assert_eq!(vars["RELEASE_CREATED_AT"], "2024-05-01T12:00:00Z");
        assert_eq!(vars["RELEASE_PUBLISHED_AT"], "");
    }

    #[test]
    fn test_create_and_generic() {
        let payload = parse_payload(
            WebhookEvent::Create,
            &body(json!({
                "ref": "v2",
                "ref_type": "tag",
                "repository": { "full_name": "acme/widgets" }
            })),
        )
        .unwrap();
        let vars = payload.metadata(WebhookEvent::Create);
        assert_eq!(vars["REF_TYPE"], "tag");

        let payload = parse_payload(
            WebhookEvent::Issues,
            &body(json!({ "action": "labeled", "repository": { "full_name": "acme/widgets" } })),
        )
        .unwrap();
        assert_eq!(payload.action(), Some("labeled"));
        assert_eq!(payload.metadata(WebhookEvent::Issues).len(), 3);
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(matches!(
            parse_payload(WebhookEvent::Push, b"not json"),
            Err(Error::InvalidPayload(_))
        ));
        assert!(matches!(
            parse_payload(WebhookEvent::Watch, &body(json!({ "action": "started" }))),
            Err(Error::InvalidPayload(_))
        ));
    }
}
