//! Workflows: named DAGs of tasks with scheduling and ownership metadata.
//!
//! A [`Workflow`] is a cheap handle built with [`Workflow::builder`]. Tasks
//! register themselves on creation and keep a weak back-reference, so
//! dropping every workflow handle releases the whole graph.

mod builder;
mod context;
mod schedule;
mod types;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, Weak};

use dsflow_gateway::{GatewayService, WorkflowDefinition, WorkflowStart};
use parking_lot::RwLock;
use serde_json::{Map, Value, json};

pub use self::builder::WorkflowBuilder;
pub use self::schedule::{
    CRONTAB_FIELDS, SCHEDULE_TIME_FORMAT, Schedule, ScheduleDescriptor, format_schedule_time,
    max_datetime, parse_datetime,
};
pub use self::types::{ExecutionType, ReleaseState, WarningType};
use crate::config::WorkflowDefaults;
use crate::parameter::{DataType, Direction, ParamMap, ParamValue, Parameter};
use crate::relation::TaskRelation;
use crate::resource::{Resource, SharedPlugin};
use crate::task::Task;
use crate::{Error, Result};

/// Tracing target for workflow operations.
pub const TRACING_TARGET: &str = "dsflow_workflow::workflow";

pub(crate) struct WorkflowInner {
    name: String,
    description: Option<String>,
    user: String,
    project: String,
    worker_group: String,
    warning_type: WarningType,
    warning_group_id: i64,
    execution_type: ExecutionType,
    release_state: ReleaseState,
    timeout: u64,
    schedule: Option<Schedule>,
    online_schedule: bool,
    timezone: String,
    resource_plugin: Option<SharedPlugin>,
    resources: Vec<Resource>,
    gateway: GatewayService,
    defaults: WorkflowDefaults,
    state: RwLock<WorkflowState>,
}

#[derive(Default)]
struct WorkflowState {
    tasks: BTreeMap<i64, Task>,
    relations: BTreeSet<TaskRelation>,
    params: ParamMap,
    code: Option<i64>,
}

/// Handle to a workflow.
#[derive(Clone)]
pub struct Workflow {
    inner: Arc<WorkflowInner>,
}

/// Non-owning reference held by tasks.
#[derive(Clone)]
pub(crate) struct WeakWorkflow(Weak<WorkflowInner>);

impl WeakWorkflow {
    pub(crate) fn upgrade(&self) -> Option<Workflow> {
        self.0.upgrade().map(|inner| Workflow { inner })
    }
}

impl Workflow {
    /// Starts building a workflow that talks to `gateway`.
    pub fn builder(name: impl Into<String>, gateway: GatewayService) -> WorkflowBuilder {
        WorkflowBuilder::new(name, gateway)
    }

    pub(crate) fn downgrade(&self) -> WeakWorkflow {
        WeakWorkflow(Arc::downgrade(&self.inner))
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn description(&self) -> Option<&str> {
        self.inner.description.as_deref()
    }

    /// User owning this workflow.
    pub fn user(&self) -> &str {
        &self.inner.user
    }

    pub fn project(&self) -> &str {
        &self.inner.project
    }

    pub fn worker_group(&self) -> &str {
        &self.inner.worker_group
    }

    pub fn warning_type(&self) -> WarningType {
        self.inner.warning_type
    }

    pub fn warning_group_id(&self) -> i64 {
        self.inner.warning_group_id
    }

    pub fn execution_type(&self) -> ExecutionType {
        self.inner.execution_type
    }

    pub fn release_state(&self) -> ReleaseState {
        self.inner.release_state
    }

    /// Timeout in minutes, `0` for none.
    pub fn timeout(&self) -> u64 {
        self.inner.timeout
    }

    pub fn schedule(&self) -> Option<&Schedule> {
        self.inner.schedule.as_ref()
    }

    pub fn online_schedule(&self) -> bool {
        self.inner.online_schedule
    }

    pub fn timezone(&self) -> &str {
        &self.inner.timezone
    }

    pub fn gateway(&self) -> &GatewayService {
        &self.inner.gateway
    }

    pub fn resource_plugin(&self) -> Option<SharedPlugin> {
        self.inner.resource_plugin.clone()
    }

    pub fn resources(&self) -> &[Resource] {
        &self.inner.resources
    }

    /// Code assigned by the last successful submit.
    pub fn code(&self) -> Option<i64> {
        self.inner.state.read().code
    }

    /// Adds or overwrites a global parameter.
    pub fn set_param(&self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.inner.state.write().params.insert(name, value);
    }

    pub fn params(&self) -> ParamMap {
        self.inner.state.read().params.clone()
    }

    /// Global parameters as `IN`/`VARCHAR` records carrying raw values.
    pub fn param_json(&self) -> Vec<Parameter> {
        self.inner
            .state
            .read()
            .params
            .iter()
            .map(|(name, value)| Parameter {
                prop: name.to_owned(),
                direct: Direction::In,
                data_type: DataType::Varchar,
                value: value.to_raw_json(),
            })
            .collect()
    }

    /// Registers `task` and points its back-reference at this workflow.
    ///
    /// A task owned by another live workflow is moved: it is removed from
    /// that workflow together with its relations. Returns `false`, leaving
    /// the existing task in place, when a task with the same code is already
    /// registered.
    pub fn add_task(&self, task: &Task) -> bool {
        if self.inner.state.read().tasks.contains_key(&task.code()) {
            tracing::warn!(
                target: TRACING_TARGET,
                workflow = %self.name(),
                task = %task.name(),
                task_code = task.code(),
                "Task code is already registered, skipping"
            );
            return false;
        }

        if let Some(previous) = task.workflow()
            && previous != *self
        {
            previous.remove_task(task.code());
            tracing::debug!(
                target: TRACING_TARGET,
                from = %previous.name(),
                to = %self.name(),
                task_code = task.code(),
                "Moved task between workflows"
            );
        }

        self.inner
            .state
            .write()
            .tasks
            .insert(task.code(), task.clone());
        task.attach(self);
        true
    }

    /// Drops the task `code` and every relation touching it.
    fn remove_task(&self, code: i64) {
        let mut state = self.inner.state.write();
        state.tasks.remove(&code);
        state.relations.retain(|relation| {
            relation.pre_task_code() != code && relation.post_task_code() != code
        });
    }

    /// All tasks, ordered by code.
    pub fn tasks(&self) -> Vec<Task> {
        self.inner.state.read().tasks.values().cloned().collect()
    }

    pub fn get_task(&self, code: i64) -> Result<Task> {
        self.inner
            .state
            .read()
            .tasks
            .get(&code)
            .cloned()
            .ok_or(Error::TaskNotFound(code))
    }

    /// Every task named `name`; names are not unique.
    pub fn get_tasks_by_name(&self, name: &str) -> Vec<Task> {
        self.inner
            .state
            .read()
            .tasks
            .values()
            .filter(|task| task.name() == name)
            .cloned()
            .collect()
    }

    /// Any one task named `name`.
    pub fn get_one_task_by_name(&self, name: &str) -> Result<Task> {
        self.get_tasks_by_name(name)
            .into_iter()
            .next()
            .ok_or_else(|| Error::TaskNameNotFound(name.to_owned()))
    }

    /// Relations, ordered by `(pre, post)`.
    pub fn relations(&self) -> Vec<TaskRelation> {
        self.inner.state.read().relations.iter().cloned().collect()
    }

    pub(crate) fn insert_relation(&self, relation: TaskRelation) {
        self.inner.state.write().relations.insert(relation);
    }

    /// Adds a root relation for every task without a predecessor.
    ///
    /// Idempotent. Root relations of tasks that gained a real predecessor
    /// since the last call are dropped.
    pub fn synthesize_root_relations(&self) {
        let mut state = self.inner.state.write();
        let WorkflowState {
            tasks, relations, ..
        } = &mut *state;

        let linked: BTreeSet<i64> = relations
            .iter()
            .filter(|relation| !relation.is_root())
            .map(TaskRelation::post_task_code)
            .collect();

        relations.retain(|relation| !relation.is_root() || !linked.contains(&relation.post_task_code()));
        for code in tasks.keys().filter(|code| !linked.contains(code)) {
            relations.insert(TaskRelation::root(*code));
        }
    }

    /// Fails when a switch task has no variable to branch on.
    pub fn validate_before_submit(&self) -> Result<()> {
        let state = self.inner.state.read();
        let has_switch = state.tasks.values().any(|task| task.task_type() == "SWITCH");

        if has_switch
            && state.params.is_empty()
            && state.tasks.values().all(|task| !task.has_local_params())
        {
            return Err(Error::parameter(
                "a global parameter or at least one task local parameter is required when the workflow contains a switch task",
            ));
        }
        Ok(())
    }

    /// Task definitions, or `[{}]` when the workflow is empty.
    pub async fn task_definition_json(&self) -> Result<Value> {
        let tasks = self.tasks();
        if tasks.is_empty() {
            return Ok(json!([{}]));
        }

        let mut definitions = Vec::with_capacity(tasks.len());
        for task in &tasks {
            definitions.push(serde_json::to_value(task.definition().await?)?);
        }
        Ok(Value::Array(definitions))
    }

    /// Relations after root synthesis, or `[{}]` when the workflow is empty.
    pub fn task_relation_json(&self) -> Result<Value> {
        if self.inner.state.read().tasks.is_empty() {
            return Ok(json!([{}]));
        }

        self.synthesize_root_relations();
        let definitions: Vec<_> = self
            .relations()
            .iter()
            .map(TaskRelation::to_definition)
            .collect();
        Ok(serde_json::to_value(definitions)?)
    }

    /// `None` without a schedule.
    pub fn schedule_descriptor(&self) -> Option<ScheduleDescriptor> {
        self.inner
            .schedule
            .as_ref()
            .map(|schedule| schedule.descriptor(&self.inner.timezone))
    }

    /// Arguments of `create_or_update_workflow`.
    pub async fn definition(&self) -> Result<WorkflowDefinition> {
        let task_definition_json = self.task_definition_json().await?;
        let task_relation_json = self.task_relation_json()?;
        let schedule_json = self
            .schedule_descriptor()
            .map(|descriptor| serde_json::to_string(&descriptor))
            .transpose()?;

        Ok(WorkflowDefinition {
            user: self.user().to_owned(),
            project: self.project().to_owned(),
            name: self.name().to_owned(),
            description: self.description().unwrap_or_default().to_owned(),
            global_params: serde_json::to_string(&self.param_json())?,
            warning_type: self.warning_type().to_string(),
            warning_group_id: self.warning_group_id(),
            execution_type: self.execution_type().to_string(),
            timeout: self.timeout(),
            worker_group: self.worker_group().to_owned(),
            release_state: self.release_state().code(),
            task_relation_json: serde_json::to_string(&task_relation_json)?,
            task_definition_json: serde_json::to_string(&task_definition_json)?,
            schedule_json,
            online_schedule: self.online_schedule(),
            other_params_json: None,
        })
    }

    /// Full local description of this workflow.
    pub async fn to_json(&self) -> Result<Value> {
        let mut define = Map::new();
        define.insert("name".to_owned(), json!(self.name()));
        define.insert("description".to_owned(), json!(self.description()));
        define.insert("project".to_owned(), json!(self.project()));
        define.insert("workerGroup".to_owned(), json!(self.worker_group()));
        define.insert("warningType".to_owned(), json!(self.warning_type()));
        define.insert("warningGroupId".to_owned(), json!(self.warning_group_id()));
        define.insert("executionType".to_owned(), json!(self.execution_type()));
        define.insert("timeout".to_owned(), json!(self.timeout()));
        define.insert("releaseState".to_owned(), json!(self.release_state().code()));
        define.insert("param".to_owned(), serde_json::to_value(self.param_json())?);
        define.insert("taskDefinitionJson".to_owned(), self.task_definition_json().await?);
        define.insert("taskRelationJson".to_owned(), self.task_relation_json()?);
        let resources: Vec<_> = self.resources().iter().map(|resource| &resource.name).collect();
        define.insert("resourceList".to_owned(), json!(resources));
        Ok(Value::Object(define))
    }

    async fn ensure_side_models(&self) -> Result<()> {
        let gateway = self.gateway();
        let user = self.inner.defaults.user_definition(self.user());
        gateway.create_user(&user).await?;
        gateway
            .create_or_grant_project(self.user(), self.project(), None)
            .await?;
        Ok(())
    }

    /// Creates or updates this workflow on the server and returns its code.
    ///
    /// Resources are uploaded one by one beforehand; uploads that succeeded
    /// are kept when a later step fails.
    pub async fn submit(&self) -> Result<i64> {
        self.gateway().check_version().await;
        self.ensure_side_models().await?;
        self.validate_before_submit()?;

        for resource in self.resources() {
            resource.create_or_update(self.gateway(), self.user()).await?;
        }

        let definition = self.definition().await?;
        let code = self.gateway().create_or_update_workflow(&definition).await?;
        self.inner.state.write().code = Some(code);

        tracing::info!(
            target: TRACING_TARGET,
            workflow = %self.name(),
            project = %self.project(),
            workflow_code = code,
            tasks = self.inner.state.read().tasks.len(),
            "Submitted workflow"
        );

        Ok(code)
    }

    /// Starts a new instance of the submitted workflow.
    pub async fn start(&self) -> Result<()> {
        let start = WorkflowStart {
            user: self.user().to_owned(),
            project: self.project().to_owned(),
            workflow_name: self.name().to_owned(),
            worker_group: self.worker_group().to_owned(),
            warning_type: self.warning_type().to_string(),
            warning_group_id: self.warning_group_id(),
        };
        self.gateway().exec_workflow_instance(&start).await?;

        tracing::info!(
            target: TRACING_TARGET,
            workflow = %self.name(),
            project = %self.project(),
            "Started workflow instance"
        );
        Ok(())
    }

    /// [`submit`](Self::submit) then [`start`](Self::start).
    pub async fn run(&self) -> Result<i64> {
        let code = self.submit().await?;
        self.start().await?;
        Ok(code)
    }
}

impl fmt::Debug for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("name", &self.inner.name)
            .field("project", &self.inner.project)
            .field("user", &self.inner.user)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Workflow {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Workflow {}
