//! Reqwest-based gateway client.

use std::sync::Arc;

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::{Envelope, HttpGatewayConfig, TRACING_TARGET};
use crate::{
    DatasourceInfo, Error, ErrorKind, GatewayProvider, GatewayService, ResourceInfo, Result,
    TaskIdentity, UserDefinition, WorkflowDefinition, WorkflowInfo, WorkflowStart,
};

/// Inner client that holds the HTTP client and configuration.
struct HttpGatewayInner {
    http: Client,
    config: HttpGatewayConfig,
}

/// HTTP client for the gateway bridge.
///
/// # Examples
///
/// ```rust,ignore
/// use dsflow_gateway::http::{HttpGateway, HttpGatewayConfig};
///
/// let gateway = HttpGateway::new(HttpGatewayConfig::default())?;
/// let identity = gateway.get_code_and_version("project", "workflow", "task").await?;
/// ```
#[derive(Clone)]
pub struct HttpGateway {
    inner: Arc<HttpGatewayInner>,
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl HttpGateway {
    /// Creates a new gateway client with the given configuration.
    pub fn new(config: HttpGatewayConfig) -> Result<Self> {
        let timeout = config.effective_timeout();
        let user_agent = config.effective_user_agent();

        tracing::debug!(
            target: TRACING_TARGET,
            endpoint = %config.endpoint,
            timeout_ms = timeout.as_millis(),
            "Creating gateway client"
        );

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(&user_agent)
            .build()
            .map_err(|e| {
                Error::from_source(ErrorKind::Configuration, e)
                    .with_message("Failed to create HTTP client")
            })?;

        let inner = HttpGatewayInner { http, config };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Gets the client configuration.
    pub fn config(&self) -> &HttpGatewayConfig {
        &self.inner.config
    }

    /// Converts this client into a [`GatewayService`] for use with dependency injection.
    pub fn into_service(self) -> GatewayService {
        GatewayService::new(self)
    }

    async fn call<A, T>(&self, method: &'static str, arguments: &A) -> Result<T>
    where
        A: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.inner.config.method_url(method)?;

        tracing::trace!(target: TRACING_TARGET, method, url = %url, "Calling gateway");

        let response = self
            .inner
            .http
            .post(url)
            .json(arguments)
            .send()
            .await
            .map_err(|e| transport_error(method, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::remote_call(
                method,
                format!("gateway answered with HTTP {status}"),
            ));
        }

        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| transport_error(method, e))?;

        tracing::trace!(
            target: TRACING_TARGET,
            method,
            status = %envelope.status,
            "Gateway answered"
        );

        envelope.into_result(method)
    }
}

fn transport_error(method: &'static str, error: reqwest::Error) -> Error {
    let kind = if error.is_timeout() {
        ErrorKind::Timeout
    } else if error.is_decode() {
        ErrorKind::Serialization
    } else {
        ErrorKind::NetworkError
    };

    Error::new(kind)
        .with_message(error.to_string())
        .with_context(method)
        .with_source(error)
}

#[async_trait::async_trait]
impl GatewayProvider for HttpGateway {
    async fn gateway_version(&self) -> Result<String> {
        self.call("get_gateway_version", &json!({})).await
    }

    async fn get_code_and_version(
        &self,
        project: &str,
        workflow: &str,
        task: &str,
    ) -> Result<TaskIdentity> {
        let arguments = json!({
            "projectName": project,
            "workflowName": workflow,
            "taskName": task,
        });
        self.call("get_code_and_version", &arguments).await
    }

    async fn query_environment_info(&self, name: &str) -> Result<i64> {
        self.call("query_environment_info", &json!({ "name": name }))
            .await
    }

    async fn query_resources_file_info(&self, user: &str, name: &str) -> Result<ResourceInfo> {
        let arguments = json!({ "userName": user, "name": name });
        self.call("query_resources_file_info", &arguments).await
    }

    async fn create_or_update_resource(
        &self,
        user: &str,
        name: &str,
        content: &str,
    ) -> Result<()> {
        let arguments = json!({ "userName": user, "name": name, "content": content });
        self.call("create_or_update_resource", &arguments).await
    }

    async fn get_datasource(&self, name: &str, kind: Option<&str>) -> Result<DatasourceInfo> {
        let arguments = json!({ "name": name, "type": kind });
        self.call("get_datasource", &arguments).await
    }

    async fn get_workflow_info(
        &self,
        user: &str,
        project: &str,
        workflow: &str,
    ) -> Result<WorkflowInfo> {
        let arguments = json!({
            "userName": user,
            "projectName": project,
            "workflowName": workflow,
        });
        self.call("get_workflow_info", &arguments).await
    }

    async fn create_user(&self, user: &UserDefinition) -> Result<()> {
        self.call("create_user", user).await
    }

    async fn create_or_grant_project(
        &self,
        user: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<()> {
        let arguments = json!({
            "userName": user,
            "name": name,
            "description": description,
        });
        self.call("create_or_grant_project", &arguments).await
    }

    async fn create_or_update_workflow(&self, definition: &WorkflowDefinition) -> Result<i64> {
        self.call("create_or_update_workflow", definition).await
    }

    async fn exec_workflow_instance(&self, start: &WorkflowStart) -> Result<()> {
        self.call("exec_workflow_instance", start).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let gateway = HttpGateway::new(HttpGatewayConfig::default()).expect("client");
        assert_eq!(gateway.config().timeout_secs, 30);
    }

    #[test]
    fn test_debug_hides_http_client() {
        let gateway = HttpGateway::new(HttpGatewayConfig::default()).expect("client");
        let debug = format!("{gateway:?}");
        assert!(debug.starts_with("HttpGateway"));
        assert!(debug.contains("config"));
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_network_error() {
        let config = HttpGatewayConfig::builder()
            .with_endpoint("http://127.0.0.1:9")
            .expect("valid endpoint")
            .with_timeout_secs(2u64)
            .build()
            .expect("valid config");
        let gateway = HttpGateway::new(config).expect("client");

        let error = gateway
            .query_environment_info("prod")
            .await
            .expect_err("nothing listens on the discard port");
        assert!(matches!(
            error.kind,
            ErrorKind::NetworkError | ErrorKind::Timeout
        ));
        assert_eq!(error.context.as_deref(), Some("query_environment_info"));
    }
}
