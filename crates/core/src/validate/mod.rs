//! Response validation: untrusted model text in, typed domain objects out.
//!
//! Every function here is pure and total. Malformed input of any shape
//! comes back as `AppError { code: VALIDATION_ERROR }`, never as a panic.

mod plan;
mod rule_summary;

pub use plan::{PlanValidation, parse_plan, validate_plan};
pub use rule_summary::{
    RULE_DESCRIPTION_MAX_CHARS, RuleSummary, parse_rule_summary, validate_rule_summary,
};

use std::collections::HashSet;

use crate::error::AppError;
use crate::plan::RulesIndex;
use crate::spec::Specification;

const FENCE: &str = "```";

/// Strip one surrounding Markdown code fence, whatever its info string.
///
/// Text that does not open with a fence comes back trimmed. A missing
/// closing fence (truncated output) is tolerated.
pub fn unwrap_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(after_open) = trimmed.strip_prefix(FENCE) else {
        return trimmed;
    };

    let body = match after_open.find('\n') {
        Some(pos) => &after_open[pos + 1..],
        // Single-line fence: "```{...}```"
        None => after_open,
    };
    let body = body.trim_end();
    body.strip_suffix(FENCE).unwrap_or(body).trim()
}

/// Parse JSON without panicking. `context` names what was being parsed.
pub fn parse_json(text: &str, context: &str) -> crate::Result<serde_json::Value> {
    serde_json::from_str(text).map_err(|e| {
        AppError::validation(format!("Failed to parse {context} as JSON: {e}"))
            .with_details(serde_json::json!({ "context": context }))
    })
}

/// Truncate to at most `max` characters, on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Parse and validate a specification document.
pub fn parse_specification(text: &str) -> crate::Result<Specification> {
    let value = parse_json(unwrap_code_fence(text), "specification")?;
    let spec: Specification = serde_json::from_value(value)
        .map_err(|e| AppError::validation(format!("Invalid specification: {e}")))?;
    spec.validate()?;
    Ok(spec)
}

/// Parse a rules index. Rule ids must be non-empty and unique.
pub fn parse_rules_index(text: &str) -> crate::Result<RulesIndex> {
    let value = parse_json(unwrap_code_fence(text), "rules index")?;
    let index: RulesIndex = serde_json::from_value(value)
        .map_err(|e| AppError::validation(format!("Invalid rules index: {e}")))?;

    let mut seen = HashSet::new();
    for (i, rule) in index.rules.iter().enumerate() {
        if rule.id.trim().is_empty() {
            return Err(AppError::validation(format!(
                "Rule at index {i} must have a non-empty id"
            )));
        }
        if !seen.insert(rule.id.as_str()) {
            return Err(AppError::validation(format!(
                "Rules index contains duplicate rule id '{}'",
                rule.id
            )));
        }
    }
    Ok(index)
}
