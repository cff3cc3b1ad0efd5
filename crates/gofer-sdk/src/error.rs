//! Pipeline definition errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("Invalid id '{value}': {reason}")]
    InvalidId { value: String, reason: String },

    #[error("Pipeline name must not be empty")]
    EmptyName,

    #[error("Pipeline has no tasks")]
    EmptyPipeline,

    #[error("Duplicate task id: {0}")]
    DuplicateTask(String),

    #[error("Task '{0}' has no image")]
    MissingImage(String),

    #[error("Task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency { task: String, dependency: String },

    #[error("Cycle detected in task dependencies")]
    CycleDetected,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Could not write pipeline: {0}")]
    Io(#[from] std::io::Error),
}
