use std::collections::HashSet;

use serde_json::{Map, Value};

use super::{parse_json, unwrap_code_fence};
use crate::error::AppError;
use crate::plan::{Plan, RuleReference, RulesIndex, Task, TaskKind, TaskScope};

/// Options for turning an untrusted JSON value into a [`Plan`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanValidation<'a> {
    /// When present, every referenced rule id must resolve here, and the
    /// index entry replaces whatever the model sent.
    pub rules_index: Option<&'a RulesIndex>,
    /// Used when the plan has no id or a blank one.
    pub fallback_id: Option<&'a str>,
}

fn invalid(message: String) -> AppError {
    AppError::validation(message)
}

/// Walk `value` field by field and return the first violation, scoped by
/// task and rule index.
pub fn validate_plan(value: &Value, opts: &PlanValidation<'_>) -> crate::Result<Plan> {
    let obj = value
        .as_object()
        .ok_or_else(|| AppError::validation("Plan must be a JSON object"))?;

    let tasks = obj
        .get("tasks")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::validation("Plan must have a tasks array"))?;
    if tasks.is_empty() {
        return Err(AppError::validation("Plan must contain at least one task"));
    }

    let id = match obj.get("id") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.trim()).filter(|s| !s.is_empty()),
        Some(_) => return Err(AppError::validation("Plan id must be a string")),
    };
    let id = id
        .or(opts.fallback_id)
        .ok_or_else(|| AppError::validation("Plan must have a non-empty id"))?
        .to_string();

    let summary = optional_string(obj, "summary", || "Plan summary".into())?;
    let notes = optional_string_array(obj, "notes", || "Plan notes".into())?;

    let mut seen = HashSet::new();
    let mut parsed = Vec::with_capacity(tasks.len());
    for (i, raw) in tasks.iter().enumerate() {
        let task = validate_task(i, raw, opts.rules_index)?;
        if !seen.insert(task.id.clone()) {
            return Err(invalid(format!(
                "Task at index {i} has duplicate id '{}'",
                task.id
            )));
        }
        parsed.push(task);
    }

    Ok(Plan {
        id,
        summary,
        notes,
        tasks: parsed,
    })
}

fn validate_task(i: usize, raw: &Value, index: Option<&RulesIndex>) -> crate::Result<Task> {
    let obj = raw
        .as_object()
        .ok_or_else(|| invalid(format!("Task at index {i} must be an object")))?;

    let field = |name: &str| -> crate::Result<String> {
        obj.get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| invalid(format!("Task at index {i} must have a non-empty {name}")))
    };
    let id = field("id")?;
    let title = field("title")?;
    let instructions = field("instructions")?;

    let kind = match obj.get("kind") {
        None | Some(Value::Null) => None,
        Some(Value::String(k)) => Some(TaskKind::parse(k).ok_or_else(|| {
            invalid(format!(
                "Task at index {i} has invalid kind '{k}' (expected one of: {})",
                TaskKind::ALL.join(", ")
            ))
        })?),
        Some(_) => return Err(invalid(format!("Task at index {i} kind must be a string"))),
    };

    let scope = match obj.get("scope") {
        None | Some(Value::Null) => None,
        Some(Value::Object(scope)) => {
            let label = |f: &str| format!("Task at index {i} scope.{f}");
            Some(TaskScope {
                files: optional_string_array(scope, "files", || label("files"))?,
                include_globs: optional_string_array(scope, "includeGlobs", || {
                    label("includeGlobs")
                })?,
                exclude_globs: optional_string_array(scope, "excludeGlobs", || {
                    label("excludeGlobs")
                })?,
            })
        }
        Some(_) => return Err(invalid(format!("Task at index {i} scope must be an object"))),
    };

    let rules = obj
        .get("rules")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid(format!("Task at index {i} must have a rules array")))?;
    if rules.is_empty() {
        return Err(invalid(format!(
            "Task at index {i} must have at least one rule assigned"
        )));
    }
    let rules = rules
        .iter()
        .enumerate()
        .map(|(j, rule)| validate_rule_reference(i, j, rule, index))
        .collect::<crate::Result<Vec<_>>>()?;

    let acceptance_criteria = optional_string_array(obj, "acceptanceCriteria", || {
        format!("Task at index {i} acceptanceCriteria")
    })?;
    let dependencies = optional_string_array(obj, "dependencies", || {
        format!("Task at index {i} dependencies")
    })?;

    let meta_data = match obj.get("metaData") {
        None | Some(Value::Null) => None,
        Some(Value::Object(m)) => Some(m.clone()),
        Some(_) => {
            return Err(invalid(format!(
                "Task at index {i} metaData must be an object"
            )));
        }
    };

    Ok(Task {
        id,
        title,
        instructions,
        kind,
        scope,
        rules,
        acceptance_criteria,
        dependencies,
        meta_data,
    })
}

fn validate_rule_reference(
    i: usize,
    j: usize,
    raw: &Value,
    index: Option<&RulesIndex>,
) -> crate::Result<RuleReference> {
    let obj = raw.as_object().ok_or_else(|| {
        invalid(format!("Rule at index {j} of task at index {i} must be an object"))
    })?;

    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            invalid(format!(
                "Rule at index {j} of task at index {i} must have a non-empty id"
            ))
        })?;

    if let Some(index) = index {
        return index.get(id).cloned().ok_or_else(|| {
            invalid(format!(
                "Rule '{id}' of task at index {i} is not in the rules index"
            ))
        });
    }

    let text = |name: &str| -> crate::Result<String> {
        obj.get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                invalid(format!(
                    "Rule at index {j} of task at index {i} must have a string {name}"
                ))
            })
    };
    let description = text("description")?;
    let path = text("path")?;
    let tags = optional_string_array(obj, "tags", || {
        format!("Rule at index {j} of task at index {i} tags")
    })?
    .ok_or_else(|| {
        invalid(format!(
            "Rule at index {j} of task at index {i} must have a tags array"
        ))
    })?;

    Ok(RuleReference {
        id: id.to_string(),
        description,
        path,
        tags,
    })
}

fn optional_string(
    obj: &Map<String, Value>,
    key: &str,
    label: impl Fn() -> String,
) -> crate::Result<Option<String>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(invalid(format!("{} must be a string", label()))),
    }
}

fn optional_string_array(
    obj: &Map<String, Value>,
    key: &str,
    label: impl Fn() -> String,
) -> crate::Result<Option<Vec<String>>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| invalid(format!("{} must be an array of strings", label())))
            })
            .collect::<crate::Result<Vec<_>>>()
            .map(Some),
        Some(_) => Err(invalid(format!("{} must be an array of strings", label()))),
    }
}

/// Fence-strip, parse and validate a plan from model text.
pub fn parse_plan(text: &str, opts: &PlanValidation<'_>) -> crate::Result<Plan> {
    let value = parse_json(unwrap_code_fence(text), "plan")?;
    validate_plan(&value, opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;

    fn rule(id: &str) -> Value {
        json!({"id": id, "description": "desc", "path": format!("rules/{id}.md"), "tags": ["t"]})
    }

    fn task(id: &str, rules: Vec<Value>) -> Value {
        json!({"id": id, "title": "Title", "instructions": "Do it", "rules": rules})
    }

    fn index() -> RulesIndex {
        RulesIndex::new(vec![RuleReference {
            id: "r1".into(),
            description: "Canonical description".into(),
            path: "rules/r1.md".into(),
            tags: vec!["errors".into()],
        }])
    }

    #[test]
    fn minimal_plan_validates() {
        let value = json!({"id": "p1", "tasks": [task("t1", vec![rule("r1")])]});
        let plan = validate_plan(&value, &PlanValidation::default()).unwrap();
        assert_eq!(plan.id, "p1");
        assert_eq!(plan.tasks[0].rules[0].id, "r1");
    }

    #[test]
    fn empty_tasks_vs_missing_tasks() {
        let opts = PlanValidation::default();
        let empty = validate_plan(&json!({"id": "p", "tasks": []}), &opts).unwrap_err();
        assert_eq!(empty.message, "Plan must contain at least one task");
        let missing = validate_plan(&json!({"id": "p"}), &opts).unwrap_err();
        assert_eq!(missing.message, "Plan must have a tasks array");
        let wrong = validate_plan(&json!({"id": "p", "tasks": {}}), &opts).unwrap_err();
        assert_eq!(wrong.message, "Plan must have a tasks array");
    }

    #[test]
    fn empty_rules_reported_by_task_index() {
        let value = json!({"id": "p", "tasks": [
            task("t0", vec![rule("r1")]),
            task("t1", vec![rule("r1")]),
            task("t2", vec![]),
        ]});
        let err = validate_plan(&value, &PlanValidation::default()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "Task at index 2 must have at least one rule assigned");
    }

    #[test]
    fn missing_rules_array_rejected() {
        let value = json!({"id": "p", "tasks": [{"id": "t", "title": "T", "instructions": "I"}]});
        let err = validate_plan(&value, &PlanValidation::default()).unwrap_err();
        assert_eq!(err.message, "Task at index 0 must have a rules array");
    }

    #[test]
    fn fallback_id_used_for_blank_or_missing_id() {
        let opts = PlanValidation {
            fallback_id: Some("plan-0123456789abcdef"),
            ..PlanValidation::default()
        };
        let missing = json!({"tasks": [task("t", vec![rule("r1")])]});
        assert_eq!(validate_plan(&missing, &opts).unwrap().id, "plan-0123456789abcdef");
        let blank = json!({"id": "  ", "tasks": [task("t", vec![rule("r1")])]});
        assert_eq!(validate_plan(&blank, &opts).unwrap().id, "plan-0123456789abcdef");
        let given = json!({"id": "mine", "tasks": [task("t", vec![rule("r1")])]});
        assert_eq!(validate_plan(&given, &opts).unwrap().id, "mine");
    }

    #[test]
    fn missing_id_without_fallback_rejected() {
        let value = json!({"tasks": [task("t", vec![rule("r1")])]});
        let err = validate_plan(&value, &PlanValidation::default()).unwrap_err();
        assert_eq!(err.message, "Plan must have a non-empty id");
    }

    #[test]
    fn rule_without_tags_rejected() {
        let value = json!({"id": "p", "tasks": [task("t", vec![
            json!({"id": "r1", "description": "d", "path": "p.md"})
        ])]});
        let err = validate_plan(&value, &PlanValidation::default()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(
            err.message,
            "Rule at index 0 of task at index 0 must have a tags array"
        );
        let schema = crate::plan::plan_json_schema();
        let validator = jsonschema::validator_for(&schema).unwrap();
        assert!(!validator.is_valid(&value));
    }

    #[test]
    fn index_replaces_model_rule_copy() {
        let index = index();
        let opts = PlanValidation {
            rules_index: Some(&index),
            fallback_id: None,
        };
        let value = json!({"id": "p", "tasks": [task("t", vec![
            json!({"id": "r1", "description": "made up", "path": "nowhere", "tags": []})
        ])]});
        let plan = validate_plan(&value, &opts).unwrap();
        assert_eq!(plan.tasks[0].rules[0].description, "Canonical description");
        assert_eq!(plan.tasks[0].rules[0].path, "rules/r1.md");
    }

    #[test]
    fn unknown_rule_id_rejected_with_index() {
        let index = index();
        let opts = PlanValidation {
            rules_index: Some(&index),
            fallback_id: None,
        };
        let value = json!({"id": "p", "tasks": [task("t", vec![json!({"id": "r404"})])]});
        let err = validate_plan(&value, &opts).unwrap_err();
        assert_eq!(err.message, "Rule 'r404' of task at index 0 is not in the rules index");
    }

    #[test]
    fn invalid_kind_and_scope() {
        let mut t = task("t", vec![rule("r1")]);
        t["kind"] = json!("epic");
        let err = validate_plan(&json!({"id": "p", "tasks": [t]}), &PlanValidation::default())
            .unwrap_err();
        assert!(err.message.starts_with("Task at index 0 has invalid kind 'epic'"));

        let mut t = task("t", vec![rule("r1")]);
        t["scope"] = json!({"files": ["a.rs", 3]});
        let err = validate_plan(&json!({"id": "p", "tasks": [t]}), &PlanValidation::default())
            .unwrap_err();
        assert_eq!(err.message, "Task at index 0 scope.files must be an array of strings");
    }

    #[test]
    fn optional_fields_carried_through() {
        let mut t = task("t", vec![rule("r1")]);
        t["kind"] = json!("refactor");
        t["scope"] = json!({"includeGlobs": ["src/**"]});
        t["acceptanceCriteria"] = json!(["builds"]);
        t["dependencies"] = json!([]);
        t["metaData"] = json!({"owner": "core"});
        let value = json!({"id": "p", "summary": "s", "notes": ["n"], "tasks": [t]});
        let plan = validate_plan(&value, &PlanValidation::default()).unwrap();
        let task = &plan.tasks[0];
        assert_eq!(task.kind, Some(TaskKind::Refactor));
        assert_eq!(
            task.scope.as_ref().unwrap().include_globs,
            Some(vec!["src/**".to_string()])
        );
        assert_eq!(task.meta_data.as_ref().unwrap()["owner"], "core");
        assert_eq!(plan.notes, Some(vec!["n".to_string()]));
    }

    #[test]
    fn duplicate_task_ids_rejected() {
        let value = json!({"id": "p", "tasks": [
            task("t", vec![rule("r1")]),
            task("t", vec![rule("r1")]),
        ]});
        let err = validate_plan(&value, &PlanValidation::default()).unwrap_err();
        assert_eq!(err.message, "Task at index 1 has duplicate id 't'");
    }

    #[test]
    fn parse_plan_from_fenced_text() {
        let text = format!(
            "```json\n{}\n```",
            json!({"id": "p", "tasks": [task("t", vec![rule("r1")])]})
        );
        let plan = parse_plan(&text, &PlanValidation::default()).unwrap();
        assert_eq!(plan.tasks.len(), 1);
    }

    #[test]
    fn non_object_rejected() {
        let err = parse_plan("[1, 2]", &PlanValidation::default()).unwrap_err();
        assert_eq!(err.message, "Plan must be a JSON object");
        let err = parse_plan("not json", &PlanValidation::default()).unwrap_err();
        assert!(err.message.contains("Failed to parse plan"));
    }
}
