//! Tasks: schedulable units of work inside a workflow.
//!
//! A [`Task`] is a cheap handle. Cloning it shares the same underlying task,
//! and equality is defined by its remote code. Tasks are created with
//! [`Task::builder`], which assigns the code through the gateway and
//! registers the task in its workflow.

mod builder;
mod http;
mod kind;
mod options;
mod sql;
mod switch;

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use dsflow_gateway::GatewayService;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{Map, Value};

pub use self::builder::TaskBuilder;
pub use self::http::{DEFAULT_HTTP_TIMEOUT_MS, Http, HttpCheckCondition, HttpMethod};
pub use self::kind::{Custom, ParamField, Python, Shell, SubWorkflow, TaskKind};
pub use self::options::{
    ConditionResult, TaskFlag, TaskOptions, TaskPriority, TimeoutFlag, TimeoutNotifyStrategy,
    timeout_minutes,
};
pub use self::sql::{DEFAULT_DISPLAY_ROWS, Sql, SqlType};
pub use self::switch::{Switch, SwitchBranch, SwitchCondition};
use crate::Result;
use crate::parameter::{Direction, ParamMap, ParamValue, Parameter};
use crate::relation::TaskRelation;
use crate::resource::{ResourceRecord, ResourceRef, resolve_resources};
use crate::workflow::{WeakWorkflow, Workflow};

/// Tracing target for task operations.
pub const TRACING_TARGET: &str = "dsflow_workflow::task";

/// Serialized task definition record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    pub code: i64,
    pub name: String,
    pub version: i32,
    pub description: Option<String>,
    pub delay_time: u32,
    pub task_type: String,
    pub task_params: Map<String, Value>,
    pub flag: TaskFlag,
    pub task_priority: TaskPriority,
    pub worker_group: String,
    pub environment_code: Option<i64>,
    pub fail_retry_times: u32,
    pub fail_retry_interval: u32,
    pub timeout_flag: TimeoutFlag,
    pub timeout_notify_strategy: Option<TimeoutNotifyStrategy>,
    pub timeout: u64,
    pub is_cache: TaskFlag,
    pub task_group_id: i64,
    pub task_group_priority: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_quota: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_max: Option<i64>,
}

struct TaskInner {
    name: String,
    code: i64,
    version: i32,
    kind: TaskKind,
    options: TaskOptions,
    resources: Vec<ResourceRef>,
    raw_local_params: Vec<Parameter>,
    gateway: GatewayService,
    state: RwLock<TaskState>,
}

#[derive(Default)]
struct TaskState {
    workflow: Option<WeakWorkflow>,
    upstream: BTreeSet<i64>,
    downstream: BTreeSet<i64>,
    inputs: ParamMap,
    outputs: ParamMap,
}

/// Handle to a task registered in a workflow.
#[derive(Clone)]
pub struct Task {
    inner: Arc<TaskInner>,
}

impl Task {
    /// Starts building a task of the given kind.
    pub fn builder(name: impl Into<String>, kind: impl Into<TaskKind>) -> TaskBuilder {
        TaskBuilder::new(name, kind)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Remote identity of this task.
    pub fn code(&self) -> i64 {
        self.inner.code
    }

    pub fn version(&self) -> i32 {
        self.inner.version
    }

    pub fn kind(&self) -> &TaskKind {
        &self.inner.kind
    }

    pub fn task_type(&self) -> &str {
        self.inner.kind.task_type()
    }

    pub fn options(&self) -> &TaskOptions {
        &self.inner.options
    }

    /// Workflow this task is registered in, if it is still alive.
    pub fn workflow(&self) -> Option<Workflow> {
        self.inner
            .state
            .read()
            .workflow
            .as_ref()
            .and_then(WeakWorkflow::upgrade)
    }

    pub(crate) fn attach(&self, workflow: &Workflow) {
        self.inner.state.write().workflow = Some(workflow.downgrade());
    }

    /// Codes of the tasks this task depends on.
    pub fn upstream_codes(&self) -> BTreeSet<i64> {
        self.inner.state.read().upstream.clone()
    }

    /// Codes of the tasks depending on this task.
    pub fn downstream_codes(&self) -> BTreeSet<i64> {
        self.inner.state.read().downstream.clone()
    }

    /// Upstream tasks found in the owning workflow.
    pub fn upstream(&self) -> Vec<Task> {
        self.lookup(&self.upstream_codes())
    }

    /// Downstream tasks found in the owning workflow.
    pub fn downstream(&self) -> Vec<Task> {
        self.lookup(&self.downstream_codes())
    }

    fn lookup(&self, codes: &BTreeSet<i64>) -> Vec<Task> {
        let Some(workflow) = self.workflow() else {
            return Vec::new();
        };
        codes
            .iter()
            .filter_map(|code| workflow.get_task(*code).ok())
            .collect()
    }

    /// Makes every target depend on this task. Returns `targets` unchanged.
    pub fn precedes<T: TaskTargets>(&self, targets: T) -> T {
        for target in targets.targets() {
            self.link(self, target);
        }
        targets
    }

    /// Makes this task depend on every target. Returns `targets` unchanged.
    pub fn follows<T: TaskTargets>(&self, targets: T) -> T {
        for target in targets.targets() {
            self.link(target, self);
        }
        targets
    }

    /// Records the edge `pre -> post` on both tasks, and in their workflow
    /// when both belong to the same one.
    fn link(&self, pre: &Task, post: &Task) {
        pre.inner.state.write().downstream.insert(post.code());
        post.inner.state.write().upstream.insert(pre.code());

        let Some(workflow) = self.workflow() else {
            tracing::warn!(
                target: TRACING_TARGET,
                pre = pre.code(),
                post = post.code(),
                "Workflow is no longer alive, relation not recorded"
            );
            return;
        };
        if pre.workflow().as_ref() != Some(&workflow) || post.workflow().as_ref() != Some(&workflow)
        {
            tracing::warn!(
                target: TRACING_TARGET,
                pre = pre.code(),
                post = post.code(),
                workflow = %workflow.name(),
                "Tasks belong to different workflows, relation not recorded"
            );
            return;
        }
        let relation = TaskRelation::new(pre.code(), post.code())
            .with_name(format!("{} -> {}", pre.name(), post.name()));
        workflow.insert_relation(relation);

        tracing::trace!(
            target: TRACING_TARGET,
            pre = pre.code(),
            post = post.code(),
            workflow = %workflow.name(),
            "Linked tasks"
        );
    }

    /// Adds or overwrites an input parameter.
    pub fn add_input_parameter(&self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.inner.state.write().inputs.insert(name, value);
    }

    /// Adds or overwrites an output parameter.
    pub fn add_output_parameter(&self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.inner.state.write().outputs.insert(name, value);
    }

    /// Legacy raw parameters, then inputs, then outputs.
    pub fn local_params(&self) -> Result<Vec<Parameter>> {
        let state = self.inner.state.read();
        let mut params = self.inner.raw_local_params.clone();
        params.extend(state.inputs.to_parameters(Direction::In)?);
        params.extend(state.outputs.to_parameters(Direction::Out)?);
        Ok(params)
    }

    pub(crate) fn has_local_params(&self) -> bool {
        let state = self.inner.state.read();
        !self.inner.raw_local_params.is_empty()
            || !state.inputs.is_empty()
            || !state.outputs.is_empty()
    }

    pub fn timeout_flag(&self) -> TimeoutFlag {
        self.inner.options.timeout_flag()
    }

    /// Resource references resolved to full names, deduplicated.
    pub async fn resource_list(&self) -> Result<Vec<ResourceRecord>> {
        let workflow = self.workflow();
        let user = workflow.as_ref().map(|workflow| workflow.user());
        resolve_resources(&self.inner.gateway, user, &self.inner.resources).await
    }

    /// Builds the `taskParams` object.
    pub async fn task_params(&self) -> Result<Map<String, Value>> {
        let kind = &self.inner.kind;
        let options = &self.inner.options;
        let ignored = kind.ignored_fields();
        let mut params = Map::new();

        for field in ParamField::DEFAULTS {
            if ignored.contains(&field) {
                continue;
            }
            let value = match field {
                ParamField::LocalParams => serde_json::to_value(self.local_params()?)?,
                ParamField::ResourceList => serde_json::to_value(self.resource_list().await?)?,
                ParamField::Dependence => Value::Object(options.dependence.clone()),
                ParamField::WaitStartTimeout => Value::Object(options.wait_start_timeout.clone()),
                ParamField::ConditionResult => serde_json::to_value(&options.condition_result)?,
            };
            params.insert(field.name().to_owned(), value);
        }

        let workflow = self.workflow();
        for (name, value) in kind.custom_params(workflow.as_ref()).await? {
            params.insert(name.to_owned(), value);
        }
        if let Some(raw) = kind.raw_params() {
            params.extend(raw.clone());
        }

        Ok(params)
    }

    /// Serializes this task into its definition record.
    pub async fn definition(&self) -> Result<TaskDefinition> {
        let options = &self.inner.options;
        let task_params = self.task_params().await?;

        let environment_code = match options.environment_name.as_deref() {
            Some(name) => Some(self.inner.gateway.query_environment_info(name).await?),
            None => None,
        };

        let worker_group = match options.worker_group.clone() {
            Some(worker_group) => worker_group,
            None => self
                .workflow()
                .map(|workflow| workflow.worker_group().to_owned())
                .unwrap_or_else(|| crate::config::DEFAULT_WORKER_GROUP.to_owned()),
        };

        let worker_limit = |limit: Option<i64>| {
            self.inner
                .kind
                .supports_worker_resources()
                .then(|| limit.unwrap_or(-1))
        };

        Ok(TaskDefinition {
            code: self.code(),
            name: self.name().to_owned(),
            version: self.version(),
            description: options.description.clone(),
            delay_time: options.delay_time,
            task_type: self.task_type().to_owned(),
            task_params,
            flag: options.flag,
            task_priority: options.priority,
            worker_group,
            environment_code,
            fail_retry_times: options.fail_retry_times,
            fail_retry_interval: options.fail_retry_interval,
            timeout_flag: options.timeout_flag(),
            timeout_notify_strategy: options.timeout_notify_strategy,
            timeout: options.timeout_minutes(),
            is_cache: TaskFlag::from(options.is_cache),
            task_group_id: options.task_group_id,
            task_group_priority: options.task_group_priority,
            cpu_quota: worker_limit(options.cpu_quota),
            memory_max: worker_limit(options.memory_max),
        })
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.inner.name)
            .field("code", &self.inner.code)
            .field("version", &self.inner.version)
            .field("task_type", &self.task_type())
            .finish_non_exhaustive()
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.code() == other.code()
    }
}

impl Eq for Task {}

impl Hash for Task {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code().hash(state);
    }
}

/// One or more tasks accepted by [`Task::precedes`] and [`Task::follows`].
pub trait TaskTargets {
    /// Tasks in declaration order.
    fn targets(&self) -> Vec<&Task>;
}

impl TaskTargets for &Task {
    fn targets(&self) -> Vec<&Task> {
        vec![*self]
    }
}

impl TaskTargets for &[Task] {
    fn targets(&self) -> Vec<&Task> {
        self.iter().collect()
    }
}

impl TaskTargets for &Vec<Task> {
    fn targets(&self) -> Vec<&Task> {
        self.iter().collect()
    }
}

impl<const N: usize> TaskTargets for &[Task; N] {
    fn targets(&self) -> Vec<&Task> {
        self.iter().collect()
    }
}

impl TaskTargets for Vec<&Task> {
    fn targets(&self) -> Vec<&Task> {
        self.clone()
    }
}

impl<const N: usize> TaskTargets for [&Task; N] {
    fn targets(&self) -> Vec<&Task> {
        self.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::testing::mock_workflow;

    async fn shell(workflow: &Workflow, name: &str) -> Task {
        Task::builder(name, Shell::new(format!("echo {name}")))
            .with_workflow(workflow)
            .build()
            .await
            .expect("task")
    }

    #[tokio::test]
    async fn test_precedes_links_both_sides() {
        let (workflow, _gateway) = mock_workflow("link");
        let a = shell(&workflow, "a").await;
        let b = shell(&workflow, "b").await;

        let returned = a.precedes(&b);
        assert_eq!(returned, &b);
        a.precedes(&b);

        assert!(a.downstream_codes().contains(&b.code()));
        assert!(b.upstream_codes().contains(&a.code()));
        assert_eq!(workflow.relations().len(), 1);
        assert_eq!(b.upstream(), vec![a.clone()]);
    }

    #[tokio::test]
    async fn test_precedes_across_workflows_skips_relation() {
        let (first, gateway) = mock_workflow("first");
        let second = Workflow::builder("second", gateway.into_service())
            .build()
            .expect("workflow");
        let a = shell(&first, "a").await;
        let b = shell(&second, "b").await;

        a.precedes(&b);

        assert!(a.downstream_codes().contains(&b.code()));
        assert!(b.upstream_codes().contains(&a.code()));
        assert!(first.relations().is_empty());
        assert!(second.relations().is_empty());
    }

    #[tokio::test]
    async fn test_precedes_after_workflow_dropped_keeps_adjacency() {
        let (workflow, _gateway) = mock_workflow("dropped");
        let a = shell(&workflow, "a").await;
        let b = shell(&workflow, "b").await;
        drop(workflow);

        a.precedes(&b);
        assert!(a.downstream_codes().contains(&b.code()));
        assert!(a.workflow().is_none());
    }

    #[tokio::test]
    async fn test_follows_broadcasts_over_lists() {
        let (workflow, _gateway) = mock_workflow("link");
        let a = shell(&workflow, "a").await;
        let b = shell(&workflow, "b").await;
        let c = shell(&workflow, "c").await;

        c.follows([&a, &b]);

        let relations: Vec<_> = workflow
            .relations()
            .iter()
            .map(|relation| (relation.pre_task_code(), relation.post_task_code()))
            .collect();
        assert_eq!(relations, vec![(a.code(), c.code()), (b.code(), c.code())]);
        assert_eq!(c.upstream_codes().len(), 2);
    }

    #[tokio::test]
    async fn test_local_params_order() {
        let (workflow, _gateway) = mock_workflow("params");
        let task = Task::builder("task", Shell::new("echo ${x}"))
            .with_workflow(&workflow)
            .with_raw_local_params(vec![
                Parameter::new("legacy", Direction::In, "v").expect("param"),
            ])
            .with_input("x", 1)
            .build()
            .await
            .expect("task");
        task.add_output_parameter("y", ParamValue::Null);
        task.add_input_parameter("x", 2);

        let params = serde_json::to_value(task.local_params().expect("params")).expect("json");
        assert_eq!(
            params,
            json!([
                {"prop": "legacy", "direct": "IN", "type": "VARCHAR", "value": "v"},
                {"prop": "x", "direct": "IN", "type": "INTEGER", "value": 2},
                {"prop": "y", "direct": "OUT", "type": "VARCHAR", "value": ""},
            ])
        );
    }

    #[tokio::test]
    async fn test_shell_definition() {
        let (workflow, _gateway) = mock_workflow("define");
        let task = Task::builder("task", Shell::new("echo hello"))
            .with_workflow(&workflow)
            .build()
            .await
            .expect("task");

        let definition = serde_json::to_value(task.definition().await.expect("definition"))
            .expect("json");
        assert_eq!(
            definition,
            json!({
                "code": task.code(),
                "name": "task",
                "version": 0,
                "description": null,
                "delayTime": 0,
                "taskType": "SHELL",
                "taskParams": {
                    "localParams": [],
                    "resourceList": [],
                    "dependence": {},
                    "waitStartTimeout": {},
                    "conditionResult": {"successNode": [""], "failedNode": [""]},
                    "rawScript": "echo hello",
                },
                "flag": "YES",
                "taskPriority": "MEDIUM",
                "workerGroup": "default",
                "environmentCode": null,
                "failRetryTimes": 0,
                "failRetryInterval": 1,
                "timeoutFlag": "CLOSE",
                "timeoutNotifyStrategy": null,
                "timeout": 0,
                "isCache": "NO",
                "taskGroupId": 0,
                "taskGroupPriority": 0,
                "cpuQuota": -1,
                "memoryMax": -1,
            })
        );
    }

    #[tokio::test]
    async fn test_definition_resolves_environment_and_timeout() {
        let (workflow, gateway) = mock_workflow("define");
        let gateway = gateway.with_environment("prod", 42);
        let task = Task::builder("task", SubWorkflow::new("child"))
            .with_workflow(&workflow)
            .with_environment("prod")
            .with_timeout(Duration::from_secs(61))
            .with_worker_group("gpu")
            .build()
            .await
            .expect("task");
        let _gateway = gateway.with_workflow(workflow.project(), "child", 77);

        let definition = task.definition().await.expect("definition");
        assert_eq!(definition.environment_code, Some(42));
        assert_eq!(definition.timeout_flag, TimeoutFlag::Open);
        assert_eq!(definition.timeout, 2);
        assert_eq!(definition.worker_group, "gpu");
        assert_eq!(definition.cpu_quota, None);
        assert_eq!(
            definition.task_params.get("processDefinitionCode"),
            Some(&json!(77))
        );
    }

    #[tokio::test]
    async fn test_resource_list_is_resolved() {
        let (workflow, gateway) = mock_workflow("resources");
        let _gateway = gateway.with_resource("a.sh", "/dolphinscheduler/user/resources/a.sh");
        let task = Task::builder("task", Shell::new("ls"))
            .with_workflow(&workflow)
            .with_resource("a.sh")
            .with_resource("a.sh")
            .build()
            .await
            .expect("task");

        let resources = serde_json::to_value(task.resource_list().await.expect("resources"))
            .expect("json");
        assert_eq!(
            resources,
            json!([{"resourceName": "/dolphinscheduler/user/resources/a.sh"}])
        );
    }

    #[tokio::test]
    async fn test_custom_params_are_passed_through() {
        let (workflow, _gateway) = mock_workflow("custom");
        let task = Task::builder(
            "task",
            Custom::new("DATAX").with_param("customConfig", 1).with_param("json", "{}"),
        )
        .with_workflow(&workflow)
        .build()
        .await
        .expect("task");

        let params = task.task_params().await.expect("params");
        assert_eq!(params.get("customConfig"), Some(&json!(1)));
        assert_eq!(params.get("json"), Some(&json!("{}")));
        assert_eq!(task.task_type(), "DATAX");
    }
}
