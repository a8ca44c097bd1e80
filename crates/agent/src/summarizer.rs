//! Single-shot summarizers for rule documents and source files.

use specplan_config::SummarizerConfig;
use specplan_core::error::AppError;
use specplan_core::message::Message;
use specplan_core::plan::{RuleReference, RulesIndex};
use specplan_core::runtime::{GenerateTextRequest, RuntimeAdapter};
use specplan_core::validate::{RuleSummary, parse_rule_summary, truncate_chars};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::prompts;

/// Longest code summary kept.
pub const CODE_SUMMARY_MAX_CHARS: usize = 600;

/// Source text beyond this is cut before it goes into the prompt.
pub const CODE_PROMPT_MAX_CHARS: usize = 12_000;

fn single_shot(system: &str, user: String, config: &SummarizerConfig) -> GenerateTextRequest {
    GenerateTextRequest::new(vec![Message::system(system), Message::user(user)])
        .with_max_steps(1)
        .with_temperature(config.temperature)
        .with_max_tokens(config.max_tokens)
}

/// Derive a rule id from its file path: the lowercased stem, with runs of
/// anything but ASCII letters and digits collapsed to `-`.
pub fn rule_id_from_path(path: &str) -> String {
    let stem = Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let mut id = String::with_capacity(stem.len());
    for c in stem.chars() {
        if c.is_ascii_alphanumeric() {
            id.push(c);
        } else if !id.is_empty() && !id.ends_with('-') {
            id.push('-');
        }
    }
    id.trim_end_matches('-').to_string()
}

/// Summarizes a rule document into a description and tags.
pub struct RuleSummarizer {
    runtime: Arc<dyn RuntimeAdapter>,
    config: SummarizerConfig,
}

impl RuleSummarizer {
    pub fn new(runtime: Arc<dyn RuntimeAdapter>) -> Self {
        Self {
            runtime,
            config: SummarizerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SummarizerConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn summarize(&self, path: &str, content: &str) -> specplan_core::Result<RuleSummary> {
        let request = single_shot(
            prompts::RULE_SUMMARY_SYSTEM,
            prompts::rule_summary_prompt(path, content),
            &self.config,
        );
        let run = self.runtime.generate_text(request).await?;
        let summary = parse_rule_summary(&run.text).map_err(|e| {
            let details = serde_json::json!({ "path": path });
            AppError::validation(format!("Rule summary for {path}: {}", e.message))
                .with_details(details)
        })?;

        debug!(path, tags = summary.tags.len(), "Rule summarized");
        Ok(summary)
    }

    /// Summarize and wrap as an index entry keyed by [`rule_id_from_path`].
    pub async fn summarize_to_reference(
        &self,
        path: &str,
        content: &str,
    ) -> specplan_core::Result<RuleReference> {
        let id = rule_id_from_path(path);
        if id.is_empty() {
            return Err(AppError::validation(format!(
                "Cannot derive a rule id from path '{path}'"
            )));
        }
        let RuleSummary { description, tags } = self.summarize(path, content).await?;
        Ok(RuleReference {
            id,
            description,
            path: path.to_string(),
            tags,
        })
    }

    /// Summarize every `(path, content)` pair, in order. Stops at the first
    /// failure; two files mapping to the same id is a failure too.
    pub async fn build_index(
        &self,
        files: &[(String, String)],
    ) -> specplan_core::Result<RulesIndex> {
        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(files.len());
        for (path, content) in files {
            let rule = self.summarize_to_reference(path, content).await?;
            if !seen.insert(rule.id.clone()) {
                return Err(AppError::validation(format!(
                    "Rule id '{}' derived from '{path}' is already used",
                    rule.id
                )));
            }
            rules.push(rule);
        }
        Ok(RulesIndex::new(rules))
    }
}

/// Produces a short free-text summary of a source file.
///
/// Never fails: any error is logged and yields an empty summary.
pub struct CodeSummarizer {
    runtime: Arc<dyn RuntimeAdapter>,
    config: SummarizerConfig,
}

impl CodeSummarizer {
    pub fn new(runtime: Arc<dyn RuntimeAdapter>) -> Self {
        Self {
            runtime,
            config: SummarizerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SummarizerConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn summarize(&self, path: &str, content: &str) -> String {
        let content = truncate_chars(content, CODE_PROMPT_MAX_CHARS);
        let request = single_shot(
            prompts::CODE_SUMMARY_SYSTEM,
            prompts::code_summary_prompt(path, &content),
            &self.config,
        );

        match self.runtime.generate_text(request).await {
            Ok(run) => truncate_chars(run.text.trim(), CODE_SUMMARY_MAX_CHARS),
            Err(e) => {
                warn!(path, error = %e, "Code summary failed");
                String::new()
            }
        }
    }
}
