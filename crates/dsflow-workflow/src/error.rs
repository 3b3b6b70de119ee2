//! Workflow model error types.

use strum::{AsRefStr, Display, IntoStaticStr};
use thiserror::Error;

/// Result type for workflow model operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure families surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Invalid, missing or conflicting arguments.
    Parameter,
    /// A task, resource or remote entity does not exist.
    NotFound,
    /// The gateway reported a failure.
    RemoteCall,
    /// A content plugin was required but missing or failed.
    Plugin,
}

/// Errors that can occur while building or submitting a workflow.
#[derive(Debug, Error)]
pub enum Error {
    /// Argument validation failed.
    #[error("invalid parameter: {0}")]
    Parameter(String),

    /// A task with the same code is already registered.
    #[error("task {name} with code {code} is already registered in workflow {workflow}")]
    DuplicateTask {
        /// Name of the rejected task.
        name: String,
        /// Code shared by both tasks.
        code: i64,
        /// Workflow owning the first registration.
        workflow: String,
    },

    /// No task with this code exists in the workflow.
    #[error("task with code {0} not found")]
    TaskNotFound(i64),

    /// No task with this name exists in the workflow.
    #[error("can not find task with name {0}")]
    TaskNameNotFound(String),

    /// Resource content could not be resolved.
    #[error("resource plugin error: {0}")]
    Plugin(String),

    /// Gateway call failed.
    #[error("gateway error: {0}")]
    Gateway(#[from] dsflow_gateway::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Creates a parameter error.
    pub fn parameter(message: impl Into<String>) -> Self {
        Self::Parameter(message.into())
    }

    /// Creates a plugin error.
    pub fn plugin(message: impl Into<String>) -> Self {
        Self::Plugin(message.into())
    }

    /// Returns the failure family of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parameter(_) | Self::DuplicateTask { .. } | Self::Serialization(_) => {
                ErrorKind::Parameter
            }
            Self::TaskNotFound(_) | Self::TaskNameNotFound(_) => ErrorKind::NotFound,
            Self::Plugin(_) => ErrorKind::Plugin,
            Self::Gateway(error) => match error.kind {
                dsflow_gateway::ErrorKind::NotFound => ErrorKind::NotFound,
                dsflow_gateway::ErrorKind::InvalidInput => ErrorKind::Parameter,
                _ => ErrorKind::RemoteCall,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_groups_variants() {
        assert_eq!(Error::parameter("bad").kind(), ErrorKind::Parameter);
        assert_eq!(Error::TaskNotFound(3).kind(), ErrorKind::NotFound);
        assert_eq!(Error::plugin("missing").kind(), ErrorKind::Plugin);

        let duplicate = Error::DuplicateTask {
            name: "a".into(),
            code: 1,
            workflow: "wf".into(),
        };
        assert_eq!(duplicate.kind(), ErrorKind::Parameter);
    }

    #[test]
    fn test_gateway_kinds_are_mapped() {
        let remote = Error::from(dsflow_gateway::Error::remote_call("create_user", "denied"));
        assert_eq!(remote.kind(), ErrorKind::RemoteCall);

        let missing = Error::from(dsflow_gateway::Error::not_found("no such environment"));
        assert_eq!(missing.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_display() {
        let error = Error::TaskNameNotFound("extract".into());
        assert_eq!(error.to_string(), "can not find task with name extract");
        assert_eq!(ErrorKind::RemoteCall.as_ref(), "remote_call");
    }
}
