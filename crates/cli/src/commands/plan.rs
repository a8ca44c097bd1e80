//! `specplan plan`: run the plan orchestrator over files on disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use specplan_agent::{PlanAgent, build_runtime};
use specplan_core::error::AppError;
use specplan_core::validate::{parse_rules_index, parse_specification};
use specplan_security::Sandbox;
use specplan_tools::WorkspaceFiles;
use tracing::info;

use super::{emit, load_config, read_file};

pub struct PlanArgs {
    pub spec: PathBuf,
    pub rules: PathBuf,
    pub root: PathBuf,
    pub out: Option<PathBuf>,
}

pub async fn run(config_path: Option<&Path>, args: PlanArgs) -> specplan_core::Result<()> {
    let config = load_config(config_path)?;
    let spec = parse_specification(&read_file(&args.spec)?)?;
    let rules = parse_rules_index(&read_file(&args.rules)?)?;

    let sandbox = Sandbox::new(&args.root, config.sandbox.forbidden_paths.clone())
        .map_err(|e| AppError::fs(format!("Invalid workspace root: {e}")))?;
    info!(root = %sandbox.root().display(), "Workspace sandbox ready");

    let runtime = Arc::new(build_runtime(&config)?);
    let agent = PlanAgent::from_config(runtime, Arc::new(WorkspaceFiles::new(sandbox)), &config.plan);
    let outcome = agent.run(&spec, &rules).await?;

    let json = serde_json::to_string_pretty(&outcome.plan)?;
    emit(&json, args.out.as_deref())?;

    info!(
        plan_id = %outcome.plan.id,
        tasks = outcome.plan.tasks.len(),
        steps = outcome.steps,
        total_tokens = outcome.usage.total_tokens,
        "Done"
    );
    Ok(())
}
