//! Task kinds and their kind-specific parameters.

use serde_json::{Map, Value, json};

use super::TRACING_TARGET;
use super::http::Http;
use super::sql::Sql;
use super::switch::Switch;
use crate::resource::SharedPlugin;
use crate::workflow::Workflow;
use crate::{Error, Result};

/// Standard fields of the `taskParams` object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamField {
    LocalParams,
    ResourceList,
    Dependence,
    WaitStartTimeout,
    ConditionResult,
}

impl ParamField {
    /// Fields emitted for every kind unless ignored.
    pub const DEFAULTS: [ParamField; 5] = [
        Self::LocalParams,
        Self::ResourceList,
        Self::Dependence,
        Self::WaitStartTimeout,
        Self::ConditionResult,
    ];

    /// Wire name of this field.
    pub fn name(self) -> &'static str {
        match self {
            Self::LocalParams => "localParams",
            Self::ResourceList => "resourceList",
            Self::Dependence => "dependence",
            Self::WaitStartTimeout => "waitStartTimeout",
            Self::ConditionResult => "conditionResult",
        }
    }
}

/// Runs a shell script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shell {
    /// Script body, or the name of a `.sh`/`.zsh` file.
    pub command: String,
}

impl Shell {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

/// Runs a python script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Python {
    /// Script body, or the name of a `.py` file.
    pub definition: String,
}

impl Python {
    pub fn new(definition: impl Into<String>) -> Self {
        Self {
            definition: definition.into(),
        }
    }
}

/// Runs another workflow of the same project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubWorkflow {
    pub workflow_name: String,
}

impl SubWorkflow {
    pub fn new(workflow_name: impl Into<String>) -> Self {
        Self {
            workflow_name: workflow_name.into(),
        }
    }
}

/// Task type not modeled explicitly, passed through with raw parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Custom {
    pub task_type: String,
    pub params: Map<String, Value>,
}

impl Custom {
    pub fn new(task_type: impl Into<String>) -> Self {
        Self {
            task_type: task_type.into(),
            params: Map::new(),
        }
    }

    /// Adds a raw `taskParams` entry.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }
}

/// Closed set of task kinds.
#[derive(Debug, Clone)]
pub enum TaskKind {
    Shell(Shell),
    Python(Python),
    Http(Http),
    Sql(Sql),
    SubWorkflow(SubWorkflow),
    Switch(Switch),
    Custom(Custom),
}

macro_rules! impl_from_kind {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for TaskKind {
                fn from(kind: $variant) -> Self {
                    Self::$variant(kind)
                }
            }
        )*
    };
}

impl_from_kind!(Shell, Python, Http, Sql, SubWorkflow, Switch, Custom);

impl TaskKind {
    /// Server-side task type.
    pub fn task_type(&self) -> &str {
        match self {
            Self::Shell(_) => "SHELL",
            Self::Python(_) => "PYTHON",
            Self::Http(_) => "HTTP",
            Self::Sql(_) => "SQL",
            Self::SubWorkflow(_) => "SUB_PROCESS",
            Self::Switch(_) => "SWITCH",
            Self::Custom(custom) => &custom.task_type,
        }
    }

    /// Standard `taskParams` fields this kind does not emit.
    pub fn ignored_fields(&self) -> &'static [ParamField] {
        match self {
            Self::Switch(_) => &[ParamField::ConditionResult, ParamField::Dependence],
            _ => &[],
        }
    }

    /// Whether `cpuQuota` and `memoryMax` are emitted.
    pub fn supports_worker_resources(&self) -> bool {
        matches!(self, Self::Shell(_) | Self::Python(_) | Self::Custom(_))
    }

    /// File suffixes accepted as the task body.
    pub fn file_extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Shell(_) => &[".sh", ".zsh"],
            Self::Python(_) => &[".py"],
            Self::Sql(_) => &[".sql"],
            _ => &[],
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            Self::Http(http) => http.validate(),
            _ => Ok(()),
        }
    }

    fn body_mut(&mut self) -> Option<&mut String> {
        match self {
            Self::Shell(shell) => Some(&mut shell.command),
            Self::Python(python) => Some(&mut python.definition),
            Self::Sql(sql) => Some(&mut sql.sql),
            _ => None,
        }
    }

    /// Replaces a file-like body with the file content read by `plugin`.
    ///
    /// A body is file-like when it is a single token ending with one of
    /// [`file_extensions`](Self::file_extensions). A single dotted token with
    /// any other suffix is rejected when a plugin is available.
    pub(crate) async fn resolve_body(&mut self, plugin: Option<&SharedPlugin>) -> Result<()> {
        let extensions = self.file_extensions();
        let Some(body) = self.body_mut() else {
            return Ok(());
        };

        let is_token = !body.is_empty() && !body.contains(char::is_whitespace);
        if is_token && extensions.iter().any(|ext| body.ends_with(ext)) {
            let plugin = plugin.ok_or_else(|| {
                Error::plugin(format!(
                    "task body {body} is a file, but no resource plugin is configured"
                ))
            })?;

            tracing::debug!(target: TRACING_TARGET, path = %body, "Reading task body from plugin");
            *body = plugin.read_file(body.as_str()).await?;
            return Ok(());
        }

        if is_token
            && plugin.is_some()
            && let Some(index) = body.rfind('.')
        {
            return Err(Error::parameter(format!(
                "task does not support files with suffix {}, only supports {}",
                &body[index..],
                extensions.join(", ")
            )));
        }

        Ok(())
    }

    /// Kind-specific `taskParams` entries, in emission order.
    pub(crate) async fn custom_params(
        &self,
        workflow: Option<&Workflow>,
    ) -> Result<Vec<(&'static str, Value)>> {
        let params = match self {
            Self::Shell(shell) => vec![("rawScript", json!(shell.command))],
            Self::Python(python) => vec![("rawScript", json!(python.definition))],
            Self::Http(http) => http.custom_params()?,
            Self::Sql(sql) => {
                let workflow = require_workflow(workflow, "Sql")?;
                sql.custom_params(workflow).await?
            }
            Self::SubWorkflow(sub) => {
                let workflow = require_workflow(workflow, "SubWorkflow")?;
                let info = workflow
                    .gateway()
                    .get_workflow_info(workflow.user(), workflow.project(), &sub.workflow_name)
                    .await?;
                vec![("processDefinitionCode", json!(info.code))]
            }
            Self::Switch(switch) => vec![("switchResult", switch.condition.switch_result())],
            Self::Custom(_) => Vec::new(),
        };

        Ok(params)
    }

    /// Raw parameters of a custom kind, emitted by name.
    pub(crate) fn raw_params(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Custom(custom) => Some(&custom.params),
            _ => None,
        }
    }
}

fn require_workflow<'a>(workflow: Option<&'a Workflow>, kind: &str) -> Result<&'a Workflow> {
    workflow.ok_or_else(|| Error::parameter(format!("a workflow must be provided for task {kind}")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::ErrorKind;
    use crate::resource::ResourcePlugin;
    use crate::task::SwitchCondition;

    #[derive(Debug)]
    struct EchoPlugin;

    #[async_trait]
    impl ResourcePlugin for EchoPlugin {
        async fn read_file(&self, path: &str) -> Result<String> {
            Ok(format!("content of {path}"))
        }
    }

    fn plugin() -> SharedPlugin {
        Arc::new(EchoPlugin)
    }

    #[test]
    fn test_task_types() {
        assert_eq!(TaskKind::from(Shell::new("ls")).task_type(), "SHELL");
        assert_eq!(TaskKind::from(SubWorkflow::new("child")).task_type(), "SUB_PROCESS");
        assert_eq!(TaskKind::from(Custom::new("DATAX")).task_type(), "DATAX");
    }

    #[test]
    fn test_worker_resource_support() {
        assert!(TaskKind::from(Shell::new("ls")).supports_worker_resources());
        assert!(TaskKind::from(Python::new("print(1)")).supports_worker_resources());
        assert!(!TaskKind::from(SubWorkflow::new("child")).supports_worker_resources());
    }

    #[tokio::test]
    async fn test_inline_body_is_kept() {
        let mut kind = TaskKind::from(Shell::new("echo hello"));
        kind.resolve_body(Some(&plugin())).await.expect("inline body");
        assert!(matches!(kind, TaskKind::Shell(ref shell) if shell.command == "echo hello"));
    }

    #[tokio::test]
    async fn test_file_body_is_read_through_plugin() {
        let mut kind = TaskKind::from(Shell::new("scripts/run.sh"));
        kind.resolve_body(Some(&plugin())).await.expect("file body");
        assert!(
            matches!(kind, TaskKind::Shell(ref shell) if shell.command == "content of scripts/run.sh")
        );
    }

    #[tokio::test]
    async fn test_file_body_without_plugin_fails() {
        let mut kind = TaskKind::from(Python::new("main.py"));
        let error = kind.resolve_body(None).await.expect_err("no plugin");
        assert_eq!(error.kind(), ErrorKind::Plugin);
    }

    #[tokio::test]
    async fn test_unsupported_suffix_is_rejected() {
        let mut kind = TaskKind::from(Shell::new("run.py"));
        let error = kind.resolve_body(Some(&plugin())).await.expect_err("wrong suffix");
        assert_eq!(error.kind(), ErrorKind::Parameter);

        let mut kind = TaskKind::from(Shell::new("run.py"));
        kind.resolve_body(None).await.expect("kept without plugin");
    }

    #[tokio::test]
    async fn test_command_mentioning_a_file_is_inline() {
        let mut kind = TaskKind::from(Shell::new("bash run.sh"));
        kind.resolve_body(None).await.expect("inline command");
        assert!(matches!(kind, TaskKind::Shell(ref shell) if shell.command == "bash run.sh"));
    }

    #[test]
    fn test_switch_ignores_condition_fields() {
        let condition = SwitchCondition::new(Vec::new()).expect("empty condition");
        assert_eq!(
            TaskKind::from(Switch::new(condition)).ignored_fields(),
            [ParamField::ConditionResult, ParamField::Dependence]
        );
        assert!(TaskKind::from(Shell::new("ls")).ignored_fields().is_empty());
        assert_eq!(ParamField::DEFAULTS.len(), 5);
        assert_eq!(ParamField::WaitStartTimeout.name(), "waitStartTimeout");
    }
}
