//! Tools exposed to the model during a planning run.
//!
//! Exploration tools are read-only: `lookup_rule` reads the rules index,
//! `view_file` reads workspace files through a sandboxed [`FileSource`].
//! `submit_plan` is the terminal tool; its successful result is the plan.
//!
//! [`FileSource`]: specplan_core::files::FileSource

pub mod lookup_rule;
pub mod submit_plan;
pub mod view_file;
pub mod workspace_files;

use std::sync::Arc;

use specplan_core::files::FileSource;
use specplan_core::plan::RulesIndex;
use specplan_core::tool::{ToolRegistry, create_tool_registry};

pub use lookup_rule::{LOOKUP_RULE, lookup_rule_tool};
pub use submit_plan::{SUBMIT_PLAN, submit_plan_tool};
pub use view_file::{VIEW_FILE, view_file_tool};
pub use workspace_files::WorkspaceFiles;

/// Default cap on what `view_file` returns in one call.
pub const DEFAULT_MAX_FILE_BYTES: usize = 64 * 1024;

/// Build the tool set for one planning run.
///
/// The submit tool carries per-run state (the fallback plan id), so a fresh
/// registry is built for every run.
pub fn planning_registry(
    index: Arc<RulesIndex>,
    files: Arc<dyn FileSource>,
    max_file_bytes: usize,
    fallback_plan_id: impl Into<String>,
) -> specplan_core::Result<ToolRegistry> {
    Ok(create_tool_registry([
        lookup_rule_tool(index.clone())?,
        view_file_tool(files, max_file_bytes)?,
        submit_plan_tool(index, fallback_plan_id)?,
    ]))
}
