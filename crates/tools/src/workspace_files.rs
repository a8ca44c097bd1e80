//! Sandboxed workspace file access.

use async_trait::async_trait;
use specplan_core::error::ToolError;
use specplan_core::files::FileSource;
use specplan_security::{PathValidationError, Sandbox};

/// Reads files under one workspace root through a [`Sandbox`].
#[derive(Debug, Clone)]
pub struct WorkspaceFiles {
    sandbox: Sandbox,
}

impl WorkspaceFiles {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }
}

#[async_trait]
impl FileSource for WorkspaceFiles {
    async fn read_to_string(&self, path: &str) -> Result<String, ToolError> {
        let resolved = self.sandbox.resolve(path).map_err(|e| match e {
            PathValidationError::CanonicalizeFailed { .. } => ToolError::io(e.to_string()),
            other => ToolError::invalid_args(other.to_string()),
        })?;

        if resolved.is_dir() {
            return Err(ToolError::invalid_args(format!(
                "'{path}' is a directory, not a file"
            )));
        }

        tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    ToolError::not_found(format!("File '{path}' does not exist"))
                }
                std::io::ErrorKind::InvalidData => {
                    ToolError::invalid_args(format!("File '{path}' is not valid UTF-8 text"))
                }
                _ => ToolError::io(format!("Failed to read '{path}': {e}")),
            })
    }
}
