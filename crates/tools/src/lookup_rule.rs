//! `lookup_rule`: fetch one rule from the caller's rules index by id.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use specplan_core::error::ToolError;
use specplan_core::plan::{RulesIndex, rule_reference_schema};
use specplan_core::tool::{Tool, ToolHandler, make_tool, parse_args};

pub const LOOKUP_RULE: &str = "lookup_rule";

/// How many known ids a NOT_FOUND message lists.
const SUGGESTION_LIMIT: usize = 20;

struct LookupRule {
    index: Arc<RulesIndex>,
}

#[derive(Deserialize)]
struct Args {
    id: String,
}

#[async_trait]
impl ToolHandler for LookupRule {
    async fn handle(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let Args { id } = parse_args(LOOKUP_RULE, args)?;
        let id = id.trim();

        match self.index.get(id) {
            Some(rule) => serde_json::to_value(rule)
                .map_err(|e| ToolError::internal(format!("Failed to encode rule: {e}"))),
            None => {
                let known: Vec<&str> = self
                    .index
                    .rules
                    .iter()
                    .take(SUGGESTION_LIMIT)
                    .map(|r| r.id.as_str())
                    .collect();
                Err(ToolError::not_found(format!(
                    "No rule with id '{id}'. Known ids: {}",
                    known.join(", ")
                ))
                .with_details(serde_json::json!({ "id": id })))
            }
        }
    }
}

/// Build the tool over a shared rules index.
pub fn lookup_rule_tool(index: Arc<RulesIndex>) -> specplan_core::Result<Tool> {
    make_tool(
        LOOKUP_RULE,
        "Look up a rule from the rules index by id. Returns its id, description, path and tags.",
        serde_json::json!({
            "type": "object",
            "properties": {
                "id": {
                    "type": "string",
                    "minLength": 1,
                    "description": "The rule id, exactly as listed in the rules index"
                }
            },
            "required": ["id"],
            "additionalProperties": false
        }),
        Some(rule_reference_schema()),
        LookupRule { index },
    )
}
