//! Pipeline definitions and their wire form.

use crate::dag;
use crate::error::SdkError;
use crate::task::Task;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// A pipeline as the host registers it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Maximum concurrent runs; 0 leaves it to the host.
    #[serde(default)]
    pub parallelism: u64,
    pub tasks: Vec<Task>,
}

impl Pipeline {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            parallelism: 0,
            tasks: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn parallelism(mut self, parallelism: u64) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn tasks(mut self, tasks: impl IntoIterator<Item = Task>) -> Self {
        self.tasks.extend(tasks);
        self
    }

    /// Task ids in an order that respects every dependency.
    pub fn validate(&self) -> Result<Vec<String>, SdkError> {
        dag::validate(self)
    }

    /// Validated JSON document.
    pub fn to_json(&self) -> Result<String, SdkError> {
        self.validate()?;
        Ok(serde_json::to_string(self)?)
    }

    /// Validate and write the definition to `writer`.
    pub fn write_to(&self, mut writer: impl Write) -> Result<(), SdkError> {
        writer.write_all(self.to_json()?.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Emit the definition on stdout for the host CLI to pick up.
    pub fn finish(&self) -> Result<(), SdkError> {
        self.write_to(std::io::stdout().lock())
    }
}
