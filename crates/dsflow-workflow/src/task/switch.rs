//! Conditional branching task.

use serde_json::{Map, Value, json};

use super::Task;
use crate::{Error, Result};

/// A single branch of a [`SwitchCondition`].
#[derive(Debug, Clone)]
pub struct SwitchBranch {
    task: Task,
    condition: Option<String>,
}

impl SwitchBranch {
    /// Branch taken when `condition` evaluates to true.
    pub fn when(condition: impl Into<String>, task: &Task) -> Self {
        Self {
            task: task.clone(),
            condition: Some(condition.into()),
        }
    }

    /// Branch taken when no other branch matches.
    pub fn otherwise(task: &Task) -> Self {
        Self {
            task: task.clone(),
            condition: None,
        }
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    /// Condition expression, `None` for the default branch.
    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    pub fn is_default(&self) -> bool {
        self.condition.is_none()
    }
}

/// Ordered branches with at most one default.
#[derive(Debug, Clone)]
pub struct SwitchCondition {
    branches: Vec<SwitchBranch>,
}

impl SwitchCondition {
    /// Fails when more than one default branch is given.
    pub fn new(branches: impl IntoIterator<Item = SwitchBranch>) -> Result<Self> {
        let branches: Vec<_> = branches.into_iter().collect();
        if branches.iter().filter(|branch| branch.is_default()).count() > 1 {
            return Err(Error::parameter(
                "switch condition can only have one default branch",
            ));
        }
        Ok(Self { branches })
    }

    pub fn branches(&self) -> &[SwitchBranch] {
        &self.branches
    }

    /// Tasks reachable from this switch, in branch order.
    pub fn branch_tasks(&self) -> Vec<&Task> {
        self.branches.iter().map(SwitchBranch::task).collect()
    }

    /// The `switchResult` object sent to the server.
    ///
    /// `nextNode` is only present when a default branch exists.
    pub fn switch_result(&self) -> Value {
        let depend_task_list: Vec<Value> = self
            .branches
            .iter()
            .filter_map(|branch| {
                branch.condition.as_ref().map(|condition| {
                    json!({
                        "condition": condition,
                        "nextNode": branch.task.code(),
                    })
                })
            })
            .collect();

        let mut result = Map::new();
        result.insert("dependTaskList".to_owned(), Value::Array(depend_task_list));
        if let Some(default) = self.branches.iter().find(|branch| branch.is_default()) {
            result.insert("nextNode".to_owned(), json!(default.task.code()));
        }
        Value::Object(result)
    }
}

/// Routes execution to one of several downstream tasks.
#[derive(Debug, Clone)]
pub struct Switch {
    pub condition: SwitchCondition,
}

impl Switch {
    pub fn new(condition: SwitchCondition) -> Self {
        Self { condition }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::task::Shell;
    use crate::testing::mock_workflow;

    #[tokio::test]
    async fn test_switch_result_layout() {
        let (workflow, _gateway) = mock_workflow("switch");
        let high = Task::builder("high", Shell::new("echo high"))
            .with_workflow(&workflow)
            .build()
            .await
            .expect("task");
        let low = Task::builder("low", Shell::new("echo low"))
            .with_workflow(&workflow)
            .build()
            .await
            .expect("task");

        let condition = SwitchCondition::new([
            SwitchBranch::when("${var} > 1", &high),
            SwitchBranch::otherwise(&low),
        ])
        .expect("condition");

        assert_eq!(
            condition.switch_result(),
            json!({
                "dependTaskList": [{"condition": "${var} > 1", "nextNode": high.code()}],
                "nextNode": low.code(),
            })
        );
        assert_eq!(condition.branch_tasks().len(), 2);
    }

    #[tokio::test]
    async fn test_without_default_has_no_next_node() {
        let (workflow, _gateway) = mock_workflow("switch");
        let task = Task::builder("only", Shell::new("echo"))
            .with_workflow(&workflow)
            .build()
            .await
            .expect("task");

        let condition = SwitchCondition::new([SwitchBranch::when("true", &task)]).expect("condition");
        let result = condition.switch_result();
        assert!(result.get("nextNode").is_none());
    }

    #[tokio::test]
    async fn test_rejects_two_defaults() {
        let (workflow, _gateway) = mock_workflow("switch");
        let task = Task::builder("only", Shell::new("echo"))
            .with_workflow(&workflow)
            .build()
            .await
            .expect("task");

        let error = SwitchCondition::new([
            SwitchBranch::otherwise(&task),
            SwitchBranch::otherwise(&task),
        ])
        .expect_err("two defaults");
        assert_eq!(error.kind(), ErrorKind::Parameter);
    }
}
