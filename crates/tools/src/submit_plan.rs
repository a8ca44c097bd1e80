//! `submit_plan`: the terminal tool of a planning run.
//!
//! Arguments are the whole plan. They pass schema validation first, then
//! the full plan validation (every task has a rule, every rule id resolves
//! in the index). A rejected plan comes back to the model as
//! `INVALID_ARGS` so it can fix the payload and submit again.

use std::sync::Arc;

use async_trait::async_trait;
use specplan_core::error::ToolError;
use specplan_core::plan::{RulesIndex, plan_json_schema};
use specplan_core::tool::{Tool, ToolHandler, make_tool};
use specplan_core::validate::{PlanValidation, validate_plan};
use tracing::debug;

pub const SUBMIT_PLAN: &str = "submit_plan";

struct SubmitPlan {
    index: Arc<RulesIndex>,
    fallback_id: String,
}

#[async_trait]
impl ToolHandler for SubmitPlan {
    async fn handle(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let opts = PlanValidation {
            rules_index: Some(&*self.index),
            fallback_id: Some(self.fallback_id.as_str()),
        };
        let plan = validate_plan(&args, &opts).map_err(|e| {
            ToolError::invalid_args(format!("Plan rejected: {}", e.message))
        })?;

        debug!(plan_id = %plan.id, tasks = plan.tasks.len(), "Plan accepted");

        serde_json::to_value(&plan)
            .map_err(|e| ToolError::internal(format!("Failed to encode plan: {e}")))
    }
}

/// Build the submit tool for one run.
///
/// The returned payload on success is the normalized plan: its id filled in
/// from `fallback_id` when missing, and rule entries replaced by the index
/// copies.
pub fn submit_plan_tool(
    index: Arc<RulesIndex>,
    fallback_id: impl Into<String>,
) -> specplan_core::Result<Tool> {
    let schema = plan_json_schema();
    make_tool(
        SUBMIT_PLAN,
        "Submit the final execution plan. Call exactly once, when exploration is done. \
         Every task must list at least one rule from the rules index.",
        schema.clone(),
        Some(schema),
        SubmitPlan {
            index,
            fallback_id: fallback_id.into(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use specplan_core::error::ToolErrorKind;
    use specplan_core::plan::RuleReference;

    fn tool() -> Tool {
        let index = RulesIndex::new(vec![RuleReference {
            id: "errors".into(),
            description: "Use thiserror".into(),
            path: "rules/errors.md".into(),
            tags: vec!["rust".into()],
        }]);
        submit_plan_tool(Arc::new(index), "plan-00000000000000aa").unwrap()
    }

    fn rule() -> serde_json::Value {
        json!({"id": "errors", "description": "x", "path": "y", "tags": []})
    }

    #[tokio::test]
    async fn valid_plan_is_normalized() {
        let out = tool()
            .call(json!({
                "tasks": [{"id": "t1", "title": "T", "instructions": "I", "rules": [rule()]}]
            }))
            .await
            .unwrap();
        assert_eq!(out["id"], "plan-00000000000000aa");
        assert_eq!(out["tasks"][0]["rules"][0]["path"], "rules/errors.md");
    }

    #[tokio::test]
    async fn empty_rules_rejected_by_schema() {
        let err = tool()
            .call(json!({
                "tasks": [{"id": "t1", "title": "T", "instructions": "I", "rules": []}]
            }))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::InvalidArgs);
        assert!(err.message.starts_with("Invalid arguments for tool 'submit_plan'"));
    }

    #[tokio::test]
    async fn unknown_rule_rejected_by_plan_validation() {
        let err = tool()
            .call(json!({
                "id": "p",
                "tasks": [{"id": "t1", "title": "T", "instructions": "I",
                           "rules": [{"id": "nope", "description": "", "path": "", "tags": []}]}]
            }))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::InvalidArgs);
        assert!(err.message.contains("Rule 'nope' of task at index 0"));
    }

    #[tokio::test]
    async fn empty_tasks_rejected() {
        let err = tool().call(json!({"tasks": []})).await.unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::InvalidArgs);
    }
}
