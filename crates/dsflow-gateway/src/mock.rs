//! In-memory gateway for testing.
//!
//! [`MockGateway`] behaves like a tiny orchestration server: it assigns task
//! and workflow codes idempotently, keeps every submission, and can be primed
//! with environments, resources, datasources and failures.
//!
//! # Feature Flag
//!
//! This module is only available when the `test-utils` feature is enabled:
//!
//! ```toml
//! [dev-dependencies]
//! dsflow-gateway = { version = "...", features = ["test-utils"] }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    DatasourceInfo, Error, GatewayProvider, GatewayService, ResourceInfo, Result, TaskIdentity,
    UserDefinition, WorkflowDefinition, WorkflowInfo, WorkflowStart,
};

/// First code handed out by the mock.
const FIRST_CODE: i64 = 1_000;

/// A resource upload recorded by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedResource {
    pub user: String,
    pub name: String,
    pub content: String,
}

/// A project call recorded by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectGrant {
    pub user: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug)]
struct MockState {
    version: String,
    next_code: i64,
    identities: HashMap<(String, String, String), TaskIdentity>,
    environments: HashMap<String, i64>,
    resources: HashMap<String, String>,
    datasources: HashMap<String, DatasourceInfo>,
    workflows: HashMap<(String, String), WorkflowInfo>,
    failures: HashMap<&'static str, String>,
    calls: Vec<&'static str>,
    uploads: Vec<UploadedResource>,
    users: Vec<UserDefinition>,
    projects: Vec<ProjectGrant>,
    submissions: Vec<WorkflowDefinition>,
    starts: Vec<WorkflowStart>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            version: "3.2.0".to_owned(),
            next_code: FIRST_CODE,
            identities: HashMap::new(),
            environments: HashMap::new(),
            resources: HashMap::new(),
            datasources: HashMap::new(),
            workflows: HashMap::new(),
            failures: HashMap::new(),
            calls: Vec::new(),
            uploads: Vec::new(),
            users: Vec::new(),
            projects: Vec::new(),
            submissions: Vec::new(),
            starts: Vec::new(),
        }
    }
}

impl MockState {
    fn enter(&mut self, method: &'static str) -> Result<()> {
        self.calls.push(method);
        match self.failures.get(method) {
            Some(message) => Err(Error::remote_call(method, message.clone())),
            None => Ok(()),
        }
    }

    fn allocate(&mut self) -> i64 {
        let code = self.next_code;
        self.next_code += 1;
        code
    }
}

/// In-memory [`GatewayProvider`].
///
/// Clones share state, so a test can keep one handle for inspection after
/// turning another into a [`GatewayService`].
#[derive(Debug, Clone, Default)]
pub struct MockGateway {
    state: Arc<Mutex<MockState>>,
}

impl MockGateway {
    /// Creates an empty mock gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts this mock into a [`GatewayService`].
    pub fn into_service(self) -> GatewayService {
        GatewayService::new(self)
    }

    /// Sets the version reported by `gateway_version`.
    #[must_use]
    pub fn with_version(self, version: impl Into<String>) -> Self {
        self.state.lock().version = version.into();
        self
    }

    /// Registers an environment.
    #[must_use]
    pub fn with_environment(self, name: impl Into<String>, code: i64) -> Self {
        self.state.lock().environments.insert(name.into(), code);
        self
    }

    /// Registers a resource file and its full name.
    #[must_use]
    pub fn with_resource(self, name: impl Into<String>, full_name: impl Into<String>) -> Self {
        self.state
            .lock()
            .resources
            .insert(name.into(), full_name.into());
        self
    }

    /// Registers a datasource.
    #[must_use]
    pub fn with_datasource(self, name: impl Into<String>, id: i64, kind: impl Into<String>) -> Self {
        let info = DatasourceInfo {
            id,
            kind: kind.into(),
        };
        self.state.lock().datasources.insert(name.into(), info);
        self
    }

    /// Registers an already persisted workflow.
    #[must_use]
    pub fn with_workflow(self, project: impl Into<String>, name: impl Into<String>, code: i64) -> Self {
        let name = name.into();
        let info = WorkflowInfo {
            code,
            name: name.clone(),
        };
        self.state
            .lock()
            .workflows
            .insert((project.into(), name), info);
        self
    }

    /// Makes every call of `method` fail with a remote-call error.
    #[must_use]
    pub fn fail_on(self, method: &'static str, message: impl Into<String>) -> Self {
        self.state.lock().failures.insert(method, message.into());
        self
    }

    /// Names of the methods called so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().calls.clone()
    }

    /// Resources uploaded so far, in order.
    pub fn uploads(&self) -> Vec<UploadedResource> {
        self.state.lock().uploads.clone()
    }

    /// Users created so far.
    pub fn users(&self) -> Vec<UserDefinition> {
        self.state.lock().users.clone()
    }

    /// Project calls made so far.
    pub fn projects(&self) -> Vec<ProjectGrant> {
        self.state.lock().projects.clone()
    }

    /// Workflow definitions submitted so far.
    pub fn submissions(&self) -> Vec<WorkflowDefinition> {
        self.state.lock().submissions.clone()
    }

    /// Workflow instances started so far.
    pub fn starts(&self) -> Vec<WorkflowStart> {
        self.state.lock().starts.clone()
    }
}

#[async_trait::async_trait]
impl GatewayProvider for MockGateway {
    async fn gateway_version(&self) -> Result<String> {
        let mut state = self.state.lock();
        state.enter("gateway_version")?;
        Ok(state.version.clone())
    }

    async fn get_code_and_version(
        &self,
        project: &str,
        workflow: &str,
        task: &str,
    ) -> Result<TaskIdentity> {
        let mut state = self.state.lock();
        state.enter("get_code_and_version")?;

        let key = (project.to_owned(), workflow.to_owned(), task.to_owned());
        if let Some(identity) = state.identities.get(&key) {
            return Ok(*identity);
        }

        let identity = TaskIdentity::new(state.allocate(), 0);
        state.identities.insert(key, identity);
        Ok(identity)
    }

    async fn query_environment_info(&self, name: &str) -> Result<i64> {
        let mut state = self.state.lock();
        state.enter("query_environment_info")?;
        state
            .environments
            .get(name)
            .copied()
            .ok_or_else(|| Error::not_found(format!("environment {name} does not exist")))
    }

    async fn query_resources_file_info(&self, user: &str, name: &str) -> Result<ResourceInfo> {
        let mut state = self.state.lock();
        state.enter("query_resources_file_info")?;
        state
            .resources
            .get(name)
            .map(|full_name| ResourceInfo {
                full_name: full_name.clone(),
                description: None,
            })
            .ok_or_else(|| {
                Error::not_found(format!("resource {name} does not exist for user {user}"))
            })
    }

    async fn create_or_update_resource(
        &self,
        user: &str,
        name: &str,
        content: &str,
    ) -> Result<()> {
        let mut state = self.state.lock();
        state.enter("create_or_update_resource")?;
        state
            .resources
            .insert(name.to_owned(), format!("/dolphinscheduler/{user}/resources/{name}"));
        state.uploads.push(UploadedResource {
            user: user.to_owned(),
            name: name.to_owned(),
            content: content.to_owned(),
        });
        Ok(())
    }

    async fn get_datasource(&self, name: &str, kind: Option<&str>) -> Result<DatasourceInfo> {
        let mut state = self.state.lock();
        state.enter("get_datasource")?;
        state
            .datasources
            .get(name)
            .filter(|info| kind.is_none_or(|kind| info.kind.eq_ignore_ascii_case(kind)))
            .cloned()
            .ok_or_else(|| Error::not_found(format!("datasource {name} does not exist")))
    }

    async fn get_workflow_info(
        &self,
        _user: &str,
        project: &str,
        workflow: &str,
    ) -> Result<WorkflowInfo> {
        let mut state = self.state.lock();
        state.enter("get_workflow_info")?;
        state
            .workflows
            .get(&(project.to_owned(), workflow.to_owned()))
            .cloned()
            .ok_or_else(|| {
                Error::not_found(format!("workflow {workflow} does not exist in {project}"))
            })
    }

    async fn create_user(&self, user: &UserDefinition) -> Result<()> {
        let mut state = self.state.lock();
        state.enter("create_user")?;
        if !state.users.iter().any(|known| known.name == user.name) {
            state.users.push(user.clone());
        }
        Ok(())
    }

    async fn create_or_grant_project(
        &self,
        user: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        state.enter("create_or_grant_project")?;
        state.projects.push(ProjectGrant {
            user: user.to_owned(),
            name: name.to_owned(),
            description: description.map(str::to_owned),
        });
        Ok(())
    }

    async fn create_or_update_workflow(&self, definition: &WorkflowDefinition) -> Result<i64> {
        let mut state = self.state.lock();
        state.enter("create_or_update_workflow")?;

        let key = (definition.project.clone(), definition.name.clone());
        let code = match state.workflows.get(&key) {
            Some(info) => info.code,
            None => {
                let code = state.allocate();
                let info = WorkflowInfo {
                    code,
                    name: definition.name.clone(),
                };
                state.workflows.insert(key, info);
                code
            }
        };

        state.submissions.push(definition.clone());
        Ok(code)
    }

    async fn exec_workflow_instance(&self, start: &WorkflowStart) -> Result<()> {
        let mut state = self.state.lock();
        state.enter("exec_workflow_instance")?;

        let key = (start.project.clone(), start.workflow_name.clone());
        if !state.workflows.contains_key(&key) {
            return Err(Error::not_found(format!(
                "workflow {} does not exist in {}",
                start.workflow_name, start.project
            )));
        }

        state.starts.push(start.clone());
        Ok(())
    }
}
