//! Pipeline validation over the task dependency graph.

use crate::error::SdkError;
use crate::pipeline::Pipeline;
use gofer_core::validate_id;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

fn check_id(value: &str) -> Result<(), SdkError> {
    validate_id(value).map_err(|e| SdkError::InvalidId {
        value: value.to_string(),
        reason: match e {
            gofer_core::Error::InvalidIdentifier { reason, .. } => reason,
            other => other.to_string(),
        },
    })
}

/// Validate `pipeline` and return its task ids in a runnable order.
///
/// Checks, in order: pipeline id and name, at least one task, task ids are
/// well formed and unique, every task has an image, every dependency names a
/// task of this pipeline, and the dependency graph has no cycle.
pub fn validate(pipeline: &Pipeline) -> Result<Vec<String>, SdkError> {
    check_id(&pipeline.id)?;
    if pipeline.name.trim().is_empty() {
        return Err(SdkError::EmptyName);
    }
    if pipeline.tasks.is_empty() {
        return Err(SdkError::EmptyPipeline);
    }

    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut index: HashMap<&str, NodeIndex> = HashMap::new();

    for task in &pipeline.tasks {
        check_id(&task.id)?;
        if task.image.trim().is_empty() {
            return Err(SdkError::MissingImage(task.id.clone()));
        }
        if index.contains_key(task.id.as_str()) {
            return Err(SdkError::DuplicateTask(task.id.clone()));
        }
        index.insert(&task.id, graph.add_node(&task.id));
    }

    // Edges run parent -> child.
    for task in &pipeline.tasks {
        let child = index[task.id.as_str()];
        for parent in task.depends_on.keys() {
            let parent_idx =
                index
                    .get(parent.as_str())
                    .ok_or_else(|| SdkError::UnknownDependency {
                        task: task.id.clone(),
                        dependency: parent.clone(),
                    })?;
            graph.add_edge(*parent_idx, child, ());
        }
    }

    let order = toposort(&graph, None).map_err(|_| SdkError::CycleDetected)?;
    Ok(order
        .into_iter()
        .filter_map(|idx| graph.node_weight(idx).map(|id| id.to_string()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{RequiredParentStatus, Task};

    fn pipeline(tasks: Vec<Task>) -> Pipeline {
        Pipeline::new("simple", "Simple Pipeline").tasks(tasks)
    }

    #[test]
    fn test_diamond_order() {
        let order = validate(&pipeline(vec![
            Task::new("deploy", "alpine")
                .depends_on("test", RequiredParentStatus::Success)
                .depends_on("lint", RequiredParentStatus::Success),
            Task::new("test", "alpine").depends_on("build", RequiredParentStatus::Success),
            Task::new("lint", "alpine").depends_on("build", RequiredParentStatus::Any),
            Task::new("build", "alpine"),
        ]))
        .unwrap();

        let position = |id: &str| order.iter().position(|t| t == id).unwrap();
        assert_eq!(order.len(), 4);
        assert!(position("build") < position("test"));
        assert!(position("build") < position("lint"));
        assert!(position("test") < position("deploy"));
        assert!(position("lint") < position("deploy"));
    }

    #[test]
    fn test_cycle_detected() {
        let result = validate(&pipeline(vec![
            Task::new("a", "alpine").depends_on("b", RequiredParentStatus::Any),
            Task::new("b", "alpine").depends_on("a", RequiredParentStatus::Any),
        ]));
        assert!(matches!(result, Err(SdkError::CycleDetected)));

        let result = validate(&pipeline(vec![
            Task::new("self", "alpine").depends_on("self", RequiredParentStatus::Any),
        ]));
        assert!(matches!(result, Err(SdkError::CycleDetected)));
    }

    #[test]
    fn test_unknown_dependency() {
        let result = validate(&pipeline(vec![
            Task::new("test", "alpine").depends_on("build", RequiredParentStatus::Success),
        ]));
        match result {
            Err(SdkError::UnknownDependency { task, dependency }) => {
                assert_eq!(task, "test");
                assert_eq!(dependency, "build");
            }
            other => panic!("expected unknown dependency, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_and_malformed_ids() {
        let result = validate(&pipeline(vec![
            Task::new("build", "alpine"),
            Task::new("build", "debian"),
        ]));
        assert!(matches!(result, Err(SdkError::DuplicateTask(id)) if id == "build"));

        let result = validate(&pipeline(vec![Task::new("has space", "alpine")]));
        assert!(matches!(result, Err(SdkError::InvalidId { .. })));

        let result = validate(&Pipeline::new("bad id", "Bad").tasks(vec![Task::new("a", "alpine")]));
        assert!(matches!(result, Err(SdkError::InvalidId { .. })));
    }

    #[test]
    fn test_shape_errors() {
        assert!(matches!(validate(&pipeline(vec![])), Err(SdkError::EmptyPipeline)));
        assert!(matches!(
            validate(&Pipeline::new("simple", " ").tasks(vec![Task::new("a", "alpine")])),
            Err(SdkError::EmptyName)
        ));
        assert!(matches!(
            validate(&pipeline(vec![Task::new("a", "")])),
            Err(SdkError::MissingImage(_))
        ));
    }
}
