#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;
mod model;
mod service;
mod version;

#[cfg(feature = "reqwest")]
#[cfg_attr(docsrs, doc(cfg(feature = "reqwest")))]
pub mod http;

#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod mock;

pub use error::{BoxedError, Error, ErrorKind, Result};
pub use model::{
    DatasourceInfo, ResourceInfo, TaskIdentity, UserDefinition, WorkflowDefinition,
    WorkflowInfo, WorkflowStart,
};
pub use service::GatewayService;
pub use version::{SUPPORTED_GATEWAY_VERSION, version_matches};

/// Tracing target for gateway calls.
pub const TRACING_TARGET: &str = "dsflow_gateway::service";

/// Remote procedures exposed by the orchestration server.
///
/// Each call is atomic: it either returns its result or fails with an
/// [`Error`]. Implementations never retry internally.
#[async_trait::async_trait]
pub trait GatewayProvider: Send + Sync {
    /// Returns the version string reported by the gateway.
    async fn gateway_version(&self) -> Result<String>;

    /// Assigns (or looks up) the identity of a task.
    ///
    /// The same `(project, workflow, task)` triple always yields the same
    /// identity; a fresh triple yields a new code with version `0`.
    async fn get_code_and_version(
        &self,
        project: &str,
        workflow: &str,
        task: &str,
    ) -> Result<TaskIdentity>;

    /// Resolves an environment name into its code.
    async fn query_environment_info(&self, name: &str) -> Result<i64>;

    /// Looks up a resource file owned by `user`.
    async fn query_resources_file_info(&self, user: &str, name: &str) -> Result<ResourceInfo>;

    /// Creates or overwrites a resource file.
    async fn create_or_update_resource(
        &self,
        user: &str,
        name: &str,
        content: &str,
    ) -> Result<()>;

    /// Looks up a datasource by name and optional type.
    async fn get_datasource(&self, name: &str, kind: Option<&str>) -> Result<DatasourceInfo>;

    /// Looks up a persisted workflow.
    async fn get_workflow_info(
        &self,
        user: &str,
        project: &str,
        workflow: &str,
    ) -> Result<WorkflowInfo>;

    /// Creates a user unless one with the same name exists.
    async fn create_user(&self, user: &UserDefinition) -> Result<()>;

    /// Creates a project, or grants it to `user` when it exists under another owner.
    async fn create_or_grant_project(
        &self,
        user: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<()>;

    /// Persists a workflow definition and returns its code.
    async fn create_or_update_workflow(&self, definition: &WorkflowDefinition) -> Result<i64>;

    /// Instantiates and runs a persisted workflow.
    async fn exec_workflow_instance(&self, start: &WorkflowStart) -> Result<()>;
}
