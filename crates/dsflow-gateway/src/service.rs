//! Gateway service wrapper with observability.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::{
    DatasourceInfo, GatewayProvider, ResourceInfo, Result, SUPPORTED_GATEWAY_VERSION,
    TRACING_TARGET, TaskIdentity, UserDefinition, WorkflowDefinition, WorkflowInfo,
    WorkflowStart, version_matches,
};

/// Gateway service wrapper with observability.
///
/// This wrapper adds structured logging to any [`GatewayProvider`].
/// The inner provider is wrapped in `Arc` for cheap cloning.
#[derive(Clone)]
pub struct GatewayService {
    inner: Arc<dyn GatewayProvider>,
}

impl fmt::Debug for GatewayService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayService").finish_non_exhaustive()
    }
}

impl GatewayService {
    /// Create a new gateway service wrapper.
    pub fn new<P>(provider: P) -> Self
    where
        P: GatewayProvider + 'static,
    {
        Self {
            inner: Arc::new(provider),
        }
    }

    fn record<T>(method: &'static str, started_at: Instant, result: &Result<T>) {
        let elapsed = started_at.elapsed();
        match result {
            Ok(_) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    method,
                    elapsed_ms = elapsed.as_millis(),
                    "Gateway call succeeded"
                );
            }
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    method,
                    error = %error,
                    elapsed_ms = elapsed.as_millis(),
                    "Gateway call failed"
                );
            }
        }
    }

    /// Returns the version string reported by the gateway.
    pub async fn gateway_version(&self) -> Result<String> {
        let started_at = Instant::now();
        let result = self.inner.gateway_version().await;
        Self::record("gateway_version", started_at, &result);
        result
    }

    /// Checks the remote version against [`SUPPORTED_GATEWAY_VERSION`].
    ///
    /// Never fails: an unreachable gateway or a mismatch only logs a warning.
    pub async fn check_version(&self) -> bool {
        let version = match self.gateway_version().await {
            Ok(version) => version,
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    error = %error,
                    "Unable to query gateway version"
                );
                return false;
            }
        };

        let matched = version_matches(&version);
        if !matched {
            tracing::warn!(
                target: TRACING_TARGET,
                client_version = env!("CARGO_PKG_VERSION"),
                gateway_version = %version,
                supported = SUPPORTED_GATEWAY_VERSION,
                "Gateway version is not supported by this client, calls may fail"
            );
        }

        matched
    }

    /// Assigns (or looks up) the identity of a task.
    pub async fn get_code_and_version(
        &self,
        project: &str,
        workflow: &str,
        task: &str,
    ) -> Result<TaskIdentity> {
        let started_at = Instant::now();

        tracing::trace!(
            target: TRACING_TARGET,
            project,
            workflow,
            task,
            "Requesting task identity"
        );

        let result = self
            .inner
            .get_code_and_version(project, workflow, task)
            .await;
        Self::record("get_code_and_version", started_at, &result);
        result
    }

    /// Resolves an environment name into its code.
    pub async fn query_environment_info(&self, name: &str) -> Result<i64> {
        let started_at = Instant::now();
        let result = self.inner.query_environment_info(name).await;
        Self::record("query_environment_info", started_at, &result);
        result
    }

    /// Looks up a resource file owned by `user`.
    pub async fn query_resources_file_info(&self, user: &str, name: &str) -> Result<ResourceInfo> {
        let started_at = Instant::now();
        let result = self.inner.query_resources_file_info(user, name).await;
        Self::record("query_resources_file_info", started_at, &result);
        result
    }

    /// Creates or overwrites a resource file.
    pub async fn create_or_update_resource(
        &self,
        user: &str,
        name: &str,
        content: &str,
    ) -> Result<()> {
        let started_at = Instant::now();

        tracing::debug!(
            target: TRACING_TARGET,
            user,
            resource = name,
            content_len = content.len(),
            "Uploading resource"
        );

        let result = self
            .inner
            .create_or_update_resource(user, name, content)
            .await;
        Self::record("create_or_update_resource", started_at, &result);
        result
    }

    /// Looks up a datasource by name and optional type.
    pub async fn get_datasource(&self, name: &str, kind: Option<&str>) -> Result<DatasourceInfo> {
        let started_at = Instant::now();
        let result = self.inner.get_datasource(name, kind).await;
        Self::record("get_datasource", started_at, &result);
        result
    }

    /// Looks up a persisted workflow.
    pub async fn get_workflow_info(
        &self,
        user: &str,
        project: &str,
        workflow: &str,
    ) -> Result<WorkflowInfo> {
        let started_at = Instant::now();
        let result = self.inner.get_workflow_info(user, project, workflow).await;
        Self::record("get_workflow_info", started_at, &result);
        result
    }

    /// Creates a user unless one with the same name exists.
    pub async fn create_user(&self, user: &UserDefinition) -> Result<()> {
        let started_at = Instant::now();
        let result = self.inner.create_user(user).await;
        Self::record("create_user", started_at, &result);
        result
    }

    /// Creates a project, or grants it to `user` when owned by someone else.
    pub async fn create_or_grant_project(
        &self,
        user: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<()> {
        let started_at = Instant::now();
        let result = self
            .inner
            .create_or_grant_project(user, name, description)
            .await;
        Self::record("create_or_grant_project", started_at, &result);
        result
    }

    /// Persists a workflow definition and returns its code.
    pub async fn create_or_update_workflow(&self, definition: &WorkflowDefinition) -> Result<i64> {
        let started_at = Instant::now();

        tracing::debug!(
            target: TRACING_TARGET,
            user = %definition.user,
            project = %definition.project,
            workflow = %definition.name,
            release_state = definition.release_state,
            scheduled = definition.schedule_json.is_some(),
            "Submitting workflow"
        );

        let result = self.inner.create_or_update_workflow(definition).await;
        Self::record("create_or_update_workflow", started_at, &result);
        result
    }

    /// Instantiates and runs a persisted workflow.
    pub async fn exec_workflow_instance(&self, start: &WorkflowStart) -> Result<()> {
        let started_at = Instant::now();

        tracing::debug!(
            target: TRACING_TARGET,
            project = %start.project,
            workflow = %start.workflow_name,
            worker_group = %start.worker_group,
            "Starting workflow instance"
        );

        let result = self.inner.exec_workflow_instance(start).await;
        Self::record("exec_workflow_instance", started_at, &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockGateway;

    #[tokio::test]
    async fn test_check_version_accepts_supported() {
        let service = MockGateway::default().with_version("3.2.1").into_service();
        assert!(service.check_version().await);
    }

    #[tokio::test]
    async fn test_check_version_never_fails() {
        let mock = MockGateway::default().with_version("2.0.5");
        let service = mock.clone().into_service();
        assert!(!service.check_version().await);

        let failing = MockGateway::default().fail_on("gateway_version", "gateway down");
        assert!(!failing.into_service().check_version().await);
    }

    #[tokio::test]
    async fn test_service_delegates_to_provider() {
        let mock = MockGateway::default().with_environment("prod", 42);
        let service = mock.clone().into_service();

        let code = service
            .query_environment_info("prod")
            .await
            .expect("environment should resolve");
        assert_eq!(code, 42);
        assert_eq!(mock.calls(), vec!["query_environment_info"]);
    }
}
