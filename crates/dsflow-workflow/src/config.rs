//! Defaults applied to new workflows and to the bootstrap user.

#[cfg(feature = "config")]
use clap::Args;
use dsflow_gateway::UserDefinition;
use serde::{Deserialize, Serialize};

/// Worker group used when neither the task nor the workflow sets one.
pub const DEFAULT_WORKER_GROUP: &str = "default";

/// Workflow and user defaults, overridable from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct WorkflowDefaults {
    /// User owning submitted workflows
    #[cfg_attr(
        feature = "config",
        arg(long = "workflow-user", env = "DSFLOW_WORKFLOW_USER", default_value = "userPythonGateway")
    )]
    #[serde(default = "default_user")]
    pub user: String,

    /// Project workflows are submitted into
    #[cfg_attr(
        feature = "config",
        arg(long = "workflow-project", env = "DSFLOW_WORKFLOW_PROJECT", default_value = "project-pydolphin")
    )]
    #[serde(default = "default_project")]
    pub project: String,

    /// Worker group running the tasks
    #[cfg_attr(
        feature = "config",
        arg(long = "workflow-worker-group", env = "DSFLOW_WORKFLOW_WORKER_GROUP", default_value = "default")
    )]
    #[serde(default = "default_worker_group")]
    pub worker_group: String,

    /// Release state, `online` or `offline`
    #[cfg_attr(
        feature = "config",
        arg(long = "workflow-release-state", env = "DSFLOW_WORKFLOW_RELEASE_STATE", default_value = "online")
    )]
    #[serde(default = "default_release_state")]
    pub release_state: String,

    /// Time zone of schedules
    #[cfg_attr(
        feature = "config",
        arg(long = "workflow-time-zone", env = "DSFLOW_WORKFLOW_TIME_ZONE", default_value = "Asia/Shanghai")
    )]
    #[serde(default = "default_time_zone")]
    pub time_zone: String,

    /// Warning type: FAILURE, SUCCESS, ALL or NONE
    #[cfg_attr(
        feature = "config",
        arg(long = "workflow-warning-type", env = "DSFLOW_WORKFLOW_WARNING_TYPE", default_value = "NONE")
    )]
    #[serde(default = "default_warning_type")]
    pub warning_type: String,

    /// Execution type: PARALLEL, SERIAL_WAIT, SERIAL_DISCARD or SERIAL_PRIORITY
    #[cfg_attr(
        feature = "config",
        arg(long = "workflow-execution-type", env = "DSFLOW_WORKFLOW_EXECUTION_TYPE", default_value = "parallel")
    )]
    #[serde(default = "default_execution_type")]
    pub execution_type: String,

    /// Password of the bootstrap user
    #[cfg_attr(
        feature = "config",
        arg(long = "user-password", env = "DSFLOW_USER_PASSWORD", default_value = "userPythonGateway")
    )]
    #[serde(default = "default_user")]
    pub user_password: String,

    /// Email of the bootstrap user
    #[cfg_attr(
        feature = "config",
        arg(
            long = "user-email",
            env = "DSFLOW_USER_EMAIL",
            default_value = "userPythonGateway@dolphinscheduler.com"
        )
    )]
    #[serde(default = "default_user_email")]
    pub user_email: String,

    /// Phone of the bootstrap user
    #[cfg_attr(
        feature = "config",
        arg(long = "user-phone", env = "DSFLOW_USER_PHONE", default_value = "11111111111")
    )]
    #[serde(default = "default_user_phone")]
    pub user_phone: String,

    /// Tenant of the bootstrap user
    #[cfg_attr(
        feature = "config",
        arg(long = "user-tenant", env = "DSFLOW_USER_TENANT", default_value = "tenant_pydolphin")
    )]
    #[serde(default = "default_user_tenant")]
    pub user_tenant: String,

    /// Queue of the bootstrap user
    #[cfg_attr(
        feature = "config",
        arg(long = "user-queue", env = "DSFLOW_USER_QUEUE", default_value = "queuePythonGateway")
    )]
    #[serde(default = "default_user_queue")]
    pub user_queue: String,

    /// Whether the bootstrap user is active
    #[cfg_attr(
        feature = "config",
        arg(
            long = "user-active",
            env = "DSFLOW_USER_ACTIVE",
            default_value = "true",
            action = clap::ArgAction::Set
        )
    )]
    #[serde(default = "default_user_active")]
    pub user_active: bool,
}

fn default_user() -> String {
    "userPythonGateway".to_owned()
}

fn default_project() -> String {
    "project-pydolphin".to_owned()
}

fn default_worker_group() -> String {
    DEFAULT_WORKER_GROUP.to_owned()
}

fn default_release_state() -> String {
    "online".to_owned()
}

fn default_time_zone() -> String {
    "Asia/Shanghai".to_owned()
}

fn default_warning_type() -> String {
    "NONE".to_owned()
}

fn default_execution_type() -> String {
    "parallel".to_owned()
}

fn default_user_email() -> String {
    "userPythonGateway@dolphinscheduler.com".to_owned()
}

fn default_user_phone() -> String {
    "11111111111".to_owned()
}

fn default_user_tenant() -> String {
    "tenant_pydolphin".to_owned()
}

fn default_user_queue() -> String {
    "queuePythonGateway".to_owned()
}

fn default_user_active() -> bool {
    true
}

impl Default for WorkflowDefaults {
    fn default() -> Self {
        Self {
            user: default_user(),
            project: default_project(),
            worker_group: default_worker_group(),
            release_state: default_release_state(),
            time_zone: default_time_zone(),
            warning_type: default_warning_type(),
            execution_type: default_execution_type(),
            user_password: default_user(),
            user_email: default_user_email(),
            user_phone: default_user_phone(),
            user_tenant: default_user_tenant(),
            user_queue: default_user_queue(),
            user_active: default_user_active(),
        }
    }
}

impl WorkflowDefaults {
    /// Definition of the user created before the first submission.
    ///
    /// The name is the workflow's user, which may differ from [`Self::user`].
    pub fn user_definition(&self, name: &str) -> UserDefinition {
        UserDefinition {
            name: name.to_owned(),
            password: self.user_password.clone(),
            email: self.user_email.clone(),
            phone: self.user_phone.clone(),
            tenant_code: self.user_tenant.clone(),
            queue: self.user_queue.clone(),
            state: i32::from(self.user_active),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let defaults = WorkflowDefaults::default();
        assert_eq!(defaults.user, "userPythonGateway");
        assert_eq!(defaults.project, "project-pydolphin");
        assert_eq!(defaults.worker_group, "default");
        assert_eq!(defaults.warning_type, "NONE");
        assert_eq!(defaults.execution_type, "parallel");
    }

    #[test]
    fn test_serde_fills_missing_fields() {
        let defaults: WorkflowDefaults =
            serde_json::from_str(r#"{"project": "etl"}"#).expect("decode");
        assert_eq!(defaults.project, "etl");
        assert_eq!(defaults.release_state, "online");
        assert!(defaults.user_active);
    }

    #[test]
    fn test_user_definition() {
        let user = WorkflowDefaults::default().user_definition("deployer");
        assert_eq!(user.name, "deployer");
        assert_eq!(user.tenant_code, "tenant_pydolphin");
        assert_eq!(user.state, 1);
    }
}
