//! File-reading collaborator used by exploration tools.

use async_trait::async_trait;

use crate::error::ToolError;

/// Read-only access to workspace files, keyed by workspace-relative path.
///
/// Implementations decide what is reachable; a rejected or missing path is
/// a [`ToolError`], so the model sees it and can try another path.
#[async_trait]
pub trait FileSource: Send + Sync {
    async fn read_to_string(&self, path: &str) -> Result<String, ToolError>;
}
