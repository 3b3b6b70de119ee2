use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::{Map, Value};

use super::{
    ConditionResult, TRACING_TARGET, Task, TaskFlag, TaskInner, TaskKind, TaskOptions,
    TaskPriority, TaskState, TimeoutNotifyStrategy,
};
use crate::parameter::{ParamMap, ParamValue, Parameter};
use crate::resource::{ResourceRef, SharedPlugin};
use crate::workflow::Workflow;
use crate::{Error, Result};

/// Builder for [`Task`].
///
/// [`build`](Self::build) resolves the owning workflow (explicit, or the one
/// in scope), reads a file-like body through the resource plugin, assigns
/// the task's code through the gateway and registers the task.
#[derive(Debug)]
#[must_use = "builders do nothing unless built"]
pub struct TaskBuilder {
    name: String,
    kind: TaskKind,
    workflow: Option<Workflow>,
    options: TaskOptions,
    plugin: Option<SharedPlugin>,
    inputs: ParamMap,
    outputs: ParamMap,
    raw_local_params: Vec<Parameter>,
    resources: Vec<ResourceRef>,
}

impl TaskBuilder {
    pub(crate) fn new(name: impl Into<String>, kind: impl Into<TaskKind>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            workflow: None,
            options: TaskOptions::default(),
            plugin: None,
            inputs: ParamMap::new(),
            outputs: ParamMap::new(),
            raw_local_params: Vec::new(),
            resources: Vec::new(),
        }
    }

    /// Registers the task in `workflow` instead of the one in scope.
    pub fn with_workflow(mut self, workflow: &Workflow) -> Self {
        self.workflow = Some(workflow.clone());
        self
    }

    /// Replaces all scheduling options at once.
    pub fn with_options(mut self, options: TaskOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.options.description = Some(description.into());
        self
    }

    pub fn with_flag(mut self, flag: TaskFlag) -> Self {
        self.options.flag = flag;
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.options.priority = priority;
        self
    }

    pub fn with_worker_group(mut self, worker_group: impl Into<String>) -> Self {
        self.options.worker_group = Some(worker_group.into());
        self
    }

    /// Runs the task in the named environment.
    pub fn with_environment(mut self, name: impl Into<String>) -> Self {
        self.options.environment_name = Some(name.into());
        self
    }

    /// Delay before the task starts, in minutes.
    pub fn with_delay_time(mut self, minutes: u32) -> Self {
        self.options.delay_time = minutes;
        self
    }

    /// Retry count and interval in minutes.
    pub fn with_retries(mut self, times: u32, interval: u32) -> Self {
        self.options.fail_retry_times = times;
        self.options.fail_retry_interval = interval;
        self
    }

    /// Sub-minute remainders are rounded up to a whole minute.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn with_timeout_notify_strategy(mut self, strategy: TimeoutNotifyStrategy) -> Self {
        self.options.timeout_notify_strategy = Some(strategy);
        self
    }

    pub fn with_task_group(mut self, id: i64, priority: i32) -> Self {
        self.options.task_group_id = id;
        self.options.task_group_priority = priority;
        self
    }

    pub fn with_cache(mut self, is_cache: bool) -> Self {
        self.options.is_cache = is_cache;
        self
    }

    /// CPU quota in percent, `-1` for unlimited.
    pub fn with_cpu_quota(mut self, cpu_quota: i64) -> Self {
        self.options.cpu_quota = Some(cpu_quota);
        self
    }

    /// Memory limit in MB, `-1` for unlimited.
    pub fn with_memory_max(mut self, memory_max: i64) -> Self {
        self.options.memory_max = Some(memory_max);
        self
    }

    pub fn with_condition_result(mut self, condition_result: ConditionResult) -> Self {
        self.options.condition_result = condition_result;
        self
    }

    pub fn with_dependence(mut self, dependence: Map<String, Value>) -> Self {
        self.options.dependence = dependence;
        self
    }

    pub fn with_wait_start_timeout(mut self, wait_start_timeout: Map<String, Value>) -> Self {
        self.options.wait_start_timeout = wait_start_timeout;
        self
    }

    /// Plugin used for a file-like body, over the workflow's plugin.
    pub fn with_resource_plugin(mut self, plugin: SharedPlugin) -> Self {
        self.plugin = Some(plugin);
        self
    }

    pub fn with_input(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.inputs.insert(name, value);
        self
    }

    pub fn with_output(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.outputs.insert(name, value);
        self
    }

    /// Pre-serialized parameters emitted before inputs and outputs.
    ///
    /// Deprecated: use [`with_input`](Self::with_input) and
    /// [`with_output`](Self::with_output).
    pub fn with_raw_local_params(mut self, params: Vec<Parameter>) -> Self {
        self.raw_local_params = params;
        self
    }

    /// References a resource file by name.
    pub fn with_resource(mut self, resource: impl Into<ResourceRef>) -> Self {
        self.resources.push(resource.into());
        self
    }

    /// Builds and registers the task.
    pub async fn build(self) -> Result<Task> {
        let workflow = match self.workflow {
            Some(workflow) => workflow,
            None => Workflow::current().ok_or_else(|| {
                Error::parameter(format!(
                    "task {} must be created with a workflow or inside a workflow scope",
                    self.name
                ))
            })?,
        };

        let mut kind = self.kind;
        kind.validate()?;

        let plugin = self.plugin.or_else(|| workflow.resource_plugin());
        kind.resolve_body(plugin.as_ref()).await?;

        let gateway = workflow.gateway().clone();
        let identity = gateway
            .get_code_and_version(workflow.project(), workflow.name(), &self.name)
            .await?;

        let task = Task {
            inner: Arc::new(TaskInner {
                name: self.name,
                code: identity.code,
                version: identity.version,
                kind,
                options: self.options,
                resources: self.resources,
                raw_local_params: self.raw_local_params,
                gateway,
                state: RwLock::new(TaskState {
                    inputs: self.inputs,
                    outputs: self.outputs,
                    ..TaskState::default()
                }),
            }),
        };

        if !workflow.add_task(&task) {
            return Err(Error::DuplicateTask {
                name: task.name().to_owned(),
                code: task.code(),
                workflow: workflow.name().to_owned(),
            });
        }

        if let TaskKind::Switch(switch) = task.kind() {
            task.precedes(switch.condition.branch_tasks());
        }

        tracing::debug!(
            target: TRACING_TARGET,
            task = %task.name(),
            task_code = task.code(),
            task_type = %task.task_type(),
            workflow = %workflow.name(),
            "Created task"
        );

        Ok(task)
    }
}
