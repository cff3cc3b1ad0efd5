//! Wire form of complete pipeline definitions.

use gofer_sdk::{Pipeline, RequiredParentStatus, SdkError, Task};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn release() -> Pipeline {
    Pipeline::new("release", "Release")
        .description("Build then publish")
        .parallelism(2)
        .task(Task::new("build", "rust:1.85").command(["cargo", "build", "--release"]))
        .task(
            Task::new("publish", "alpine")
                .depends_on("build", RequiredParentStatus::Success)
                .variable("CHANNEL", "stable")
                .inject_api_token(true),
        )
}

#[test]
fn test_json_document_shape() {
    let value: Value = serde_json::from_str(&release().to_json().unwrap()).unwrap();

    assert_eq!(
        value,
        json!({
            "id": "release",
            "name": "Release",
            "description": "Build then publish",
            "parallelism": 2,
            "tasks": [
                {
                    "id": "build",
                    "image": "rust:1.85",
                    "command": ["cargo", "build", "--release"],
                    "variables": {},
                    "depends_on": {},
                    "inject_api_token": false
                },
                {
                    "id": "publish",
                    "image": "alpine",
                    "variables": { "CHANNEL": "stable" },
                    "depends_on": { "build": "success" },
                    "inject_api_token": true
                }
            ]
        })
    );
}

#[test]
fn test_document_reads_back() {
    let json = release().to_json().unwrap();
    let parsed: Pipeline = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, release());
    assert_eq!(parsed.validate().unwrap(), vec!["build", "publish"]);
}

#[test]
fn test_invalid_pipeline_is_never_written() {
    let cyclic = Pipeline::new("loop", "Loop").tasks([
        Task::new("a", "alpine").depends_on("b", RequiredParentStatus::Failure),
        Task::new("b", "alpine").depends_on("a", RequiredParentStatus::Any),
    ]);

    let mut out = Vec::new();
    assert!(matches!(cyclic.write_to(&mut out), Err(SdkError::CycleDetected)));
    assert!(out.is_empty());

    let mut out = Vec::new();
    release().write_to(&mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), release().to_json().unwrap());
}
