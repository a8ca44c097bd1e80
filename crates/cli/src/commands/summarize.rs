//! `specplan summarize-rule`, `build-index` and `summarize-code`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use specplan_agent::{CodeSummarizer, RuleSummarizer, build_runtime};
use specplan_config::AppConfig;
use specplan_core::runtime::RuntimeAdapter;

use super::{emit, load_config, read_file};

fn runtime(config: &AppConfig) -> specplan_core::Result<Arc<dyn RuntimeAdapter>> {
    Ok(Arc::new(build_runtime(config)?))
}

fn display(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

pub async fn rule(config_path: Option<&Path>, file: &Path) -> specplan_core::Result<()> {
    let config = load_config(config_path)?;
    let content = read_file(file)?;
    let summarizer = RuleSummarizer::new(runtime(&config)?).with_config(config.summarizer.clone());

    let rule = summarizer
        .summarize_to_reference(&display(file), &content)
        .await?;
    emit(&serde_json::to_string_pretty(&rule)?, None)
}

pub async fn index(
    config_path: Option<&Path>,
    files: &[PathBuf],
    out: Option<&Path>,
) -> specplan_core::Result<()> {
    let config = load_config(config_path)?;
    let inputs = files
        .iter()
        .map(|f| Ok((display(f), read_file(f)?)))
        .collect::<specplan_core::Result<Vec<_>>>()?;

    let summarizer = RuleSummarizer::new(runtime(&config)?).with_config(config.summarizer.clone());
    let index = summarizer.build_index(&inputs).await?;
    emit(&serde_json::to_string_pretty(&index)?, out)
}

pub async fn code(config_path: Option<&Path>, file: &Path) -> specplan_core::Result<()> {
    let config = load_config(config_path)?;
    let content = read_file(file)?;
    let summarizer = CodeSummarizer::new(runtime(&config)?).with_config(config.summarizer.clone());

    let summary = summarizer.summarize(&display(file), &content).await;
    emit(&summary, None)
}
