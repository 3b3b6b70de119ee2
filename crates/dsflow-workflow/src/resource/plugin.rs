//! Content plugins used to read task bodies from files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::TRACING_TARGET;
use crate::{Error, Result};

/// Shared handle to a resource plugin.
pub type SharedPlugin = Arc<dyn ResourcePlugin>;

/// Reads the content of a file referenced by a task body.
#[async_trait::async_trait]
pub trait ResourcePlugin: Send + Sync + std::fmt::Debug {
    /// Returns the content of `path`, relative to the plugin's root.
    async fn read_file(&self, path: &str) -> Result<String>;
}

/// Reads files from a local directory.
#[derive(Debug, Clone)]
pub struct LocalPlugin {
    prefix: PathBuf,
}

impl LocalPlugin {
    /// Creates a plugin rooted at `prefix`.
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Root directory of this plugin.
    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    /// Converts this plugin into a shared handle.
    pub fn into_shared(self) -> SharedPlugin {
        Arc::new(self)
    }
}

#[async_trait::async_trait]
impl ResourcePlugin for LocalPlugin {
    async fn read_file(&self, path: &str) -> Result<String> {
        let full_path = self.prefix.join(path);

        tracing::debug!(
            target: TRACING_TARGET,
            path = %full_path.display(),
            "Reading local resource"
        );

        match tokio::fs::read_to_string(&full_path).await {
            Ok(content) => Ok(content),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Err(Error::plugin(
                format!("{} is not found", full_path.display()),
            )),
            Err(error) if error.kind() == std::io::ErrorKind::PermissionDenied => {
                Err(Error::plugin(format!(
                    "You don't have permission to access {}",
                    full_path.display()
                )))
            }
            Err(error) => Err(Error::plugin(format!(
                "Failed to read {}: {error}",
                full_path.display()
            ))),
        }
    }
}
