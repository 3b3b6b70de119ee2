//! Resource files attached to workflows and tasks.
//!
//! Workflow-level [`Resource`]s carry content that is uploaded before the
//! workflow definition is submitted. Tasks reference resources through
//! [`ResourceRef`], resolved to full names at serialization time.

mod plugin;

use std::collections::BTreeSet;

use dsflow_gateway::GatewayService;
use serde::{Deserialize, Serialize};

pub use plugin::{LocalPlugin, ResourcePlugin, SharedPlugin};

use crate::{Error, Result};

/// Tracing target for resource operations.
pub const TRACING_TARGET: &str = "dsflow_workflow::resource";

/// A resource file created or updated on submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Full name of the resource, including path and suffix.
    pub name: String,
    /// File content.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Resource {
    /// Creates a resource with content.
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: Some(content.into()),
            description: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Uploads this resource under `user`.
    pub async fn create_or_update(&self, gateway: &GatewayService, user: &str) -> Result<()> {
        let content = match self.content.as_deref() {
            Some(content) if !content.is_empty() => content,
            _ => {
                return Err(Error::parameter(format!(
                    "`content` is required when creating or updating resource {}",
                    self.name
                )));
            }
        };

        if user.is_empty() {
            return Err(Error::parameter(format!(
                "`user` is required when creating or updating resource {}",
                self.name
            )));
        }

        tracing::debug!(
            target: TRACING_TARGET,
            resource = %self.name,
            user,
            "Materializing resource"
        );

        gateway
            .create_or_update_resource(user, &self.name, content)
            .await?;
        Ok(())
    }
}

/// Reference from a task to a resource file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceRef {
    /// Resource name, resolved to its full name through the gateway.
    Name(String),
    /// Already resolved record, kept for older definitions.
    ///
    /// Deprecated: pass the resource name and let the gateway resolve it.
    Resolved {
        #[serde(rename = "resourceName")]
        name: String,
    },
}

impl From<&str> for ResourceRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for ResourceRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// Serialized task resource record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceRecord {
    #[serde(rename = "resourceName")]
    pub name: String,
}

/// Resolves and deduplicates task resource references.
///
/// Names are looked up under `user`; records given explicitly are kept as is.
pub async fn resolve_resources(
    gateway: &GatewayService,
    user: Option<&str>,
    references: &[ResourceRef],
) -> Result<Vec<ResourceRecord>> {
    let mut resolved = BTreeSet::new();

    for reference in references {
        let full_name = match reference {
            ResourceRef::Name(name) => {
                let user = user.filter(|user| !user.is_empty()).ok_or_else(|| {
                    Error::parameter(format!(
                        "`user` is required when resolving resource {name}, assign the task to a workflow"
                    ))
                })?;
                gateway
                    .query_resources_file_info(user, name)
                    .await?
                    .full_name
            }
            ResourceRef::Resolved { name } => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    resource = %name,
                    "Resolved resource records are deprecated, pass the resource name instead"
                );
                name.clone()
            }
        };

        resolved.insert(full_name);
    }

    Ok(resolved
        .into_iter()
        .map(|name| ResourceRecord { name })
        .collect())
}

#[cfg(test)]
mod tests {
    use dsflow_gateway::mock::MockGateway;

    use super::*;
    use crate::ErrorKind;

    #[tokio::test]
    async fn test_resolve_deduplicates_by_full_name() {
        let gateway = MockGateway::new()
            .with_resource("a.sh", "/res/a.sh")
            .with_resource("dir/a.sh", "/res/a.sh")
            .into_service();

        let references = vec![
            ResourceRef::from("a.sh"),
            ResourceRef::from("dir/a.sh"),
            ResourceRef::from("a.sh"),
        ];
        let records = resolve_resources(&gateway, Some("admin"), &references)
            .await
            .expect("resolve");

        assert_eq!(
            records,
            vec![ResourceRecord {
                name: "/res/a.sh".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_resolved_records_skip_lookup() {
        let mock = MockGateway::new();
        let gateway = mock.clone().into_service();

        let references = vec![ResourceRef::Resolved {
            name: "/res/legacy.sh".into(),
        }];
        let records = resolve_resources(&gateway, None, &references)
            .await
            .expect("resolve");

        assert_eq!(records[0].name, "/res/legacy.sh");
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_names_require_user() {
        let gateway = MockGateway::new().into_service();
        let error = resolve_resources(&gateway, None, &[ResourceRef::from("a.sh")])
            .await
            .expect_err("no user to resolve under");
        assert_eq!(error.kind(), ErrorKind::Parameter);
    }

    #[tokio::test]
    async fn test_upload_requires_content() {
        let mock = MockGateway::new();
        let gateway = mock.clone().into_service();

        let empty = Resource {
            name: "empty.sh".into(),
            content: None,
            description: None,
        };
        let error = empty
            .create_or_update(&gateway, "admin")
            .await
            .expect_err("content is required");
        assert_eq!(error.kind(), ErrorKind::Parameter);

        Resource::new("run.sh", "echo run")
            .create_or_update(&gateway, "admin")
            .await
            .expect("upload");
        assert_eq!(mock.uploads().len(), 1);
        assert_eq!(mock.uploads()[0].content, "echo run");
    }
}
