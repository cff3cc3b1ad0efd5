//! GitHub deliveries forwarded through the lifecycle API.

use gofer_github::{AppCredentials, GithubConfig, GithubExtension};
use gofer_tests::*;
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn github_harness(host: &MockHost) -> TestHarness {
    let extension =
        GithubExtension::new(&GithubConfig::new(WEBHOOK_SECRET), Duration::from_secs(5)).unwrap();
    start_harness(Arc::new(extension), host, &[]).await.unwrap()
}

#[tokio::test]
async fn test_signed_push_starts_one_run() {
    init_test_logging();
    let host = MockHost::start().await;
    host.with_subscriptions(EXTENSION_ID, vec![]).await;
    host.accepting_runs("default", "build", 11).await;

    let harness = github_harness(&host).await;
    let resp = harness
        .client
        .subscribe("on_push", &[("repository", REPOSITORY), ("event", "push")])
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let (headers, body) = signed_delivery("push", &push_event(REPOSITORY));
    let resp = harness.client.external_event(headers, &body).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let runs = host.started_runs().await;
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].namespace_id, "default");
    assert_eq!(runs[0].pipeline_id, "build");
    assert_eq!(runs[0].variables["EVENT"], "push");
    assert_eq!(runs[0].variables["REPOSITORY"], REPOSITORY);
}

#[tokio::test]
async fn test_push_misses_pull_request_subscription() {
    init_test_logging();
    let host = MockHost::start().await;
    host.with_subscriptions(EXTENSION_ID, vec![]).await;
    host.accepting_runs("default", "build", 11).await;

    let harness = github_harness(&host).await;
    harness
        .client
        .subscribe(
            "on_pr",
            &[("repository", REPOSITORY), ("event", "pull_request:opened")],
        )
        .await
        .unwrap();

    let (headers, body) = signed_delivery("push", &push_event(REPOSITORY));
    let resp = harness.client.external_event(headers, &body).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(host.started_runs().await.is_empty());
}

#[tokio::test]
async fn test_action_is_matched_case_insensitively() {
    init_test_logging();
    let host = MockHost::start().await;
    host.with_subscriptions(EXTENSION_ID, vec![]).await;
    host.accepting_runs("default", "build", 11).await;

    let harness = github_harness(&host).await;
    harness
        .client
        .subscribe(
            "on_create",
            &[("repository", REPOSITORY), ("event", "issues:create")],
        )
        .await
        .unwrap();

    let delivery = json!({ "action": "CREATE", "repository": { "full_name": REPOSITORY } });
    let (headers, body) = signed_delivery("issues", &delivery);
    let resp = harness.client.external_event(headers, &body).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(host.started_runs().await.len(), 1);
}

#[tokio::test]
async fn test_bad_signature_is_a_client_error() {
    init_test_logging();
    let host = MockHost::start().await;
    host.with_subscriptions(EXTENSION_ID, vec![]).await;

    let harness = github_harness(&host).await;
    harness
        .client
        .subscribe("on_push", &[("repository", REPOSITORY), ("event", "push")])
        .await
        .unwrap();

    let (mut headers, body) = signed_delivery("push", &push_event(REPOSITORY));
    headers.insert("X-Hub-Signature-256".to_string(), "sha256=00".to_string());
    let resp = harness.client.external_event(headers, &body).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let error: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(error["message"], "Invalid payload signature");
    assert!(host.started_runs().await.is_empty());
}

#[tokio::test]
async fn test_checked_pull_request_reports_back() {
    init_test_logging();
    let host = MockHost::start().await;
    host.with_subscriptions(EXTENSION_ID, vec![]).await;
    host.accepting_runs("default", "build", 7).await;
    host.with_run("default", "build", 7, "complete", "successful")
        .await;

    let github = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/app/installations/42/access_tokens"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "token": "ghs_e2e",
            "expires_at": "2999-01-01T00:00:00Z",
        })))
        .mount(&github)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/repos/{}/check-runs", REPOSITORY)))
        .and(body_partial_json(json!({ "head_sha": "feedface", "status": "in_progress" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 900 })))
        .expect(1)
        .mount(&github)
        .await;
    Mock::given(method("PATCH"))
        .and(path(format!("/repos/{}/check-runs/900", REPOSITORY)))
        .and(body_partial_json(json!({ "status": "completed", "conclusion": "success" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 900 })))
        .expect(1)
        .mount(&github)
        .await;

    let config = GithubConfig::new(WEBHOOK_SECRET)
        .with_app(AppCredentials {
            app_id: 1,
            installation_id: 42,
            private_key_pem: APP_KEY.to_string(),
        })
        .with_api_url(github.uri())
        .with_poll_interval(Duration::from_millis(50));
    let extension = GithubExtension::new(&config, Duration::from_secs(5)).unwrap();
    let harness = start_harness(Arc::new(extension), &host, &[]).await.unwrap();

    let resp = harness
        .client
        .subscribe(
            "checked",
            &[("repository", REPOSITORY), ("event", "pull_request_with_check")],
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let delivery = pull_request_event(REPOSITORY, "opened", "feedface");
    let (headers, body) = signed_delivery("pull_request", &delivery);
    let resp = harness.client.external_event(headers, &body).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let github_ref = &github;
    let reported = wait_for(Duration::from_secs(5), Duration::from_millis(25), move || async move {
        github_ref
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .any(|r| r.method.as_str() == "PATCH")
    })
    .await;
    assert!(reported);
    assert!(host.run_polls().await >= 1);
    assert_eq!(host.started_runs().await[0].variables["PULLREQUEST_HEAD_SHA"], "feedface");

    harness.shutdown.cancel();
    github.verify().await;
}
