use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{parse_json, truncate_chars, unwrap_code_fence};
use crate::error::AppError;

/// Rule descriptions longer than this are cut, not rejected.
pub const RULE_DESCRIPTION_MAX_CHARS: usize = 240;

/// What the rule summarizer extracts from a rule document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSummary {
    pub description: String,
    pub tags: Vec<String>,
}

pub fn validate_rule_summary(value: &Value) -> crate::Result<RuleSummary> {
    let obj = value
        .as_object()
        .ok_or_else(|| AppError::validation("Rule summary must be a JSON object"))?;

    let description = obj
        .get("description")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            AppError::validation("Rule summary description must be a non-empty string")
        })?;

    let tags = obj
        .get("tags")
        .and_then(Value::as_array)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| AppError::validation("Rule summary tags must be a non-empty array"))?;

    let tags = tags
        .iter()
        .enumerate()
        .map(|(i, tag)| {
            tag.as_str()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .ok_or_else(|| {
                    AppError::validation(format!(
                        "Rule summary tag at index {i} must be a non-empty string"
                    ))
                })
        })
        .collect::<crate::Result<Vec<_>>>()?;

    Ok(RuleSummary {
        description: truncate_chars(description, RULE_DESCRIPTION_MAX_CHARS),
        tags,
    })
}

pub fn parse_rule_summary(text: &str) -> crate::Result<RuleSummary> {
    let value = parse_json(unwrap_code_fence(text), "rule summary")?;
    validate_rule_summary(&value)
}
