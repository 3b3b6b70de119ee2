use std::sync::Arc;
use std::time::Duration;

use dsflow_gateway::GatewayService;
use parking_lot::RwLock;

use super::schedule::{Schedule, parse_crontab, parse_datetime};
use super::types::{ExecutionType, ReleaseState, WarningType};
use super::{TRACING_TARGET, Workflow, WorkflowInner, WorkflowState};
use crate::config::WorkflowDefaults;
use crate::parameter::{ParamMap, ParamValue};
use crate::resource::{Resource, SharedPlugin};
use crate::task::timeout_minutes;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy)]
enum Timeout {
    Minutes(i64),
    Duration(Duration),
}

/// Builder for [`Workflow`].
///
/// Unset ownership and scheduling fields fall back to [`WorkflowDefaults`].
#[derive(Debug)]
#[must_use = "builders do nothing unless built"]
pub struct WorkflowBuilder {
    name: String,
    gateway: GatewayService,
    defaults: WorkflowDefaults,
    description: Option<String>,
    user: Option<String>,
    project: Option<String>,
    worker_group: Option<String>,
    warning_type: Option<String>,
    warning_group_id: i64,
    execution_type: Option<String>,
    release_state: Option<String>,
    timeout: Option<Timeout>,
    schedule: Option<String>,
    online_schedule: Option<bool>,
    start_time: Option<String>,
    end_time: Option<String>,
    timezone: Option<String>,
    params: ParamMap,
    resource_plugin: Option<SharedPlugin>,
    resources: Vec<Resource>,
}

impl WorkflowBuilder {
    pub(crate) fn new(name: impl Into<String>, gateway: GatewayService) -> Self {
        Self {
            name: name.into(),
            gateway,
            defaults: WorkflowDefaults::default(),
            description: None,
            user: None,
            project: None,
            worker_group: None,
            warning_type: None,
            warning_group_id: 0,
            execution_type: None,
            release_state: None,
            timeout: None,
            schedule: None,
            online_schedule: None,
            start_time: None,
            end_time: None,
            timezone: None,
            params: ParamMap::new(),
            resource_plugin: None,
            resources: Vec::new(),
        }
    }

    /// Replaces the defaults used for unset fields.
    pub fn with_defaults(mut self, defaults: WorkflowDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_worker_group(mut self, worker_group: impl Into<String>) -> Self {
        self.worker_group = Some(worker_group.into());
        self
    }

    /// One of `FAILURE`, `SUCCESS`, `ALL` or `NONE`, case-insensitive.
    pub fn with_warning_type(mut self, warning_type: impl Into<String>) -> Self {
        self.warning_type = Some(warning_type.into());
        self
    }

    pub fn with_warning_group_id(mut self, warning_group_id: i64) -> Self {
        self.warning_group_id = warning_group_id;
        self
    }

    /// One of `PARALLEL`, `SERIAL_WAIT`, `SERIAL_DISCARD` or
    /// `SERIAL_PRIORITY`, case-insensitive.
    pub fn with_execution_type(mut self, execution_type: impl Into<String>) -> Self {
        self.execution_type = Some(execution_type.into());
        self
    }

    /// `online` or `offline`, case-insensitive.
    pub fn with_release_state(mut self, release_state: impl Into<String>) -> Self {
        self.release_state = Some(release_state.into());
        self
    }

    /// Timeout in minutes. Negative values are rejected on build.
    pub fn with_timeout_minutes(mut self, minutes: i64) -> Self {
        self.timeout = Some(Timeout::Minutes(minutes));
        self
    }

    /// Timeout rounded up to whole minutes.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(Timeout::Duration(timeout));
        self
    }

    /// Seven-field crontab, e.g. `0 0 0 * * ? *`.
    pub fn with_schedule(mut self, crontab: impl Into<String>) -> Self {
        self.schedule = Some(crontab.into());
        self
    }

    /// Overrides whether the schedule goes online with the workflow.
    pub fn with_online_schedule(mut self, online_schedule: bool) -> Self {
        self.online_schedule = Some(online_schedule);
        self
    }

    pub fn with_start_time(mut self, start_time: impl Into<String>) -> Self {
        self.start_time = Some(start_time.into());
        self
    }

    pub fn with_end_time(mut self, end_time: impl Into<String>) -> Self {
        self.end_time = Some(end_time.into());
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    /// Adds a global parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name, value);
        self
    }

    /// Plugin reading file-like task bodies.
    pub fn with_resource_plugin(mut self, plugin: SharedPlugin) -> Self {
        self.resource_plugin = Some(plugin);
        self
    }

    /// Adds a resource uploaded on submit.
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }

    /// Validates every field and creates the workflow.
    pub fn build(self) -> Result<Workflow> {
        let defaults = self.defaults;

        let warning_type =
            WarningType::parse(self.warning_type.as_deref().unwrap_or(&defaults.warning_type))?;
        let execution_type = ExecutionType::parse(
            self.execution_type
                .as_deref()
                .unwrap_or(&defaults.execution_type),
        )?;
        let release_state = ReleaseState::parse(
            self.release_state
                .as_deref()
                .unwrap_or(&defaults.release_state),
        )?;

        let timeout = match self.timeout {
            None => 0,
            Some(Timeout::Minutes(minutes)) => u64::try_from(minutes).map_err(|_| {
                Error::parameter(format!(
                    "workflow timeout must not be negative but got {minutes}"
                ))
            })?,
            Some(Timeout::Duration(duration)) => timeout_minutes(duration),
        };

        let crontab = self
            .schedule
            .as_deref()
            .filter(|crontab| !crontab.trim().is_empty())
            .map(parse_crontab)
            .transpose()?;
        let online_schedule = self.online_schedule.unwrap_or(crontab.is_some());

        let start_time = self.start_time.as_deref().map(parse_datetime).transpose()?;
        let end_time = self.end_time.as_deref().map(parse_datetime).transpose()?;
        let schedule = crontab.map(|crontab| Schedule {
            crontab,
            start_time,
            end_time,
        });

        let workflow = Workflow {
            inner: Arc::new(WorkflowInner {
                name: self.name,
                description: self.description,
                user: self.user.unwrap_or_else(|| defaults.user.clone()),
                project: self.project.unwrap_or_else(|| defaults.project.clone()),
                worker_group: self
                    .worker_group
                    .unwrap_or_else(|| defaults.worker_group.clone()),
                warning_type,
                warning_group_id: self.warning_group_id,
                execution_type,
                release_state,
                timeout,
                schedule,
                online_schedule,
                timezone: self.timezone.unwrap_or_else(|| defaults.time_zone.clone()),
                resource_plugin: self.resource_plugin,
                resources: self.resources,
                gateway: self.gateway,
                state: RwLock::new(WorkflowState {
                    params: self.params,
                    ..WorkflowState::default()
                }),
                defaults,
            }),
        };

        tracing::debug!(
            target: TRACING_TARGET,
            workflow = %workflow.name(),
            project = %workflow.project(),
            user = %workflow.user(),
            "Created workflow"
        );

        Ok(workflow)
    }
}

#[cfg(test)]
mod tests {
    use dsflow_gateway::mock::MockGateway;

    use super::*;
    use crate::ErrorKind;

    fn builder(name: &str) -> WorkflowBuilder {
        Workflow::builder(name, MockGateway::new().into_service())
    }

    #[test]
    fn test_defaults_are_applied() {
        let workflow = builder("etl").build().expect("workflow");
        assert_eq!(workflow.user(), "userPythonGateway");
        assert_eq!(workflow.project(), "project-pydolphin");
        assert_eq!(workflow.worker_group(), "default");
        assert_eq!(workflow.warning_type(), WarningType::None);
        assert_eq!(workflow.execution_type(), ExecutionType::Parallel);
        assert_eq!(workflow.release_state(), ReleaseState::Online);
        assert_eq!(workflow.timeout(), 0);
        assert!(workflow.schedule().is_none());
        assert!(!workflow.online_schedule());
    }

    #[test]
    fn test_enums_are_validated() {
        let error = builder("etl")
            .with_warning_type("loud")
            .build()
            .expect_err("warning type");
        assert_eq!(error.kind(), ErrorKind::Parameter);

        builder("etl")
            .with_execution_type("eventually")
            .build()
            .expect_err("execution type");
        builder("etl")
            .with_release_state("1")
            .build()
            .expect_err("release state");

        let workflow = builder("etl")
            .with_warning_type(" all ")
            .with_execution_type("serial_discard")
            .with_release_state("OFFLINE")
            .build()
            .expect("workflow");
        assert_eq!(workflow.warning_type(), WarningType::All);
        assert_eq!(workflow.execution_type(), ExecutionType::SerialDiscard);
        assert_eq!(workflow.release_state().code(), 0);
    }

    #[test]
    fn test_schedule_controls_online_schedule() {
        let workflow = builder("etl")
            .with_schedule("0 0 0 * * ? *")
            .build()
            .expect("workflow");
        assert!(workflow.online_schedule());

        let workflow = builder("etl")
            .with_schedule("0 0 0 * * ? *")
            .with_online_schedule(false)
            .build()
            .expect("workflow");
        assert!(!workflow.online_schedule());

        builder("etl")
            .with_schedule("0 0 0 * *")
            .build()
            .expect_err("short crontab");
    }

    #[test]
    fn test_timeout_conversion() {
        let workflow = builder("etl")
            .with_timeout(Duration::from_secs(150))
            .build()
            .expect("workflow");
        assert_eq!(workflow.timeout(), 3);

        let workflow = builder("etl")
            .with_timeout_minutes(5)
            .build()
            .expect("workflow");
        assert_eq!(workflow.timeout(), 5);

        builder("etl")
            .with_timeout_minutes(-1)
            .build()
            .expect_err("negative timeout");
    }

    #[test]
    fn test_schedule_times_are_parsed() {
        builder("etl")
            .with_schedule("0 0 0 * * ? *")
            .with_start_time("not a date")
            .build()
            .expect_err("bad start time");

        let workflow = builder("etl")
            .with_schedule("0 0 0 * * ? *")
            .with_start_time("2021-01-01")
            .with_end_time("2021-12-31 23:59:59")
            .with_timezone("UTC")
            .build()
            .expect("workflow");
        let descriptor = workflow.schedule_descriptor().expect("descriptor");
        assert_eq!(descriptor.start_time, "2021-01-01 00:00:00");
        assert_eq!(descriptor.end_time, "2021-12-31 23:59:59");
        assert_eq!(descriptor.timezone_id, "UTC");
    }

    #[test]
    fn test_custom_defaults() {
        let defaults = WorkflowDefaults {
            project: "analytics".to_owned(),
            warning_type: "failure".to_owned(),
            ..WorkflowDefaults::default()
        };
        let workflow = builder("etl")
            .with_defaults(defaults)
            .with_user("alice")
            .build()
            .expect("workflow");

        assert_eq!(workflow.project(), "analytics");
        assert_eq!(workflow.user(), "alice");
        assert_eq!(workflow.warning_type(), WarningType::Failure);
    }
}
