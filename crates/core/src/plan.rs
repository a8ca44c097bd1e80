//! The plan artifact a planning run produces.

use serde::{Deserialize, Serialize};

/// A rule a task must follow, copied verbatim from the caller's rules index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleReference {
    pub id: String,
    pub description: String,
    pub path: String,
    pub tags: Vec<String>,
}

/// The caller-supplied rules index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RulesIndex {
    #[serde(default)]
    pub rules: Vec<RuleReference>,
}

impl RulesIndex {
    pub fn new(rules: Vec<RuleReference>) -> Self {
        Self { rules }
    }

    /// Look up a rule by id.
    pub fn get(&self, id: &str) -> Option<&RuleReference> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Feature,
    Refactor,
    Bugfix,
    Chore,
    Other,
}

impl TaskKind {
    pub const ALL: [&'static str; 5] = ["feature", "refactor", "bugfix", "chore", "other"];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "feature" => Some(Self::Feature),
            "refactor" => Some(Self::Refactor),
            "bugfix" => Some(Self::Bugfix),
            "chore" => Some(Self::Chore),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Which files a task may touch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskScope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_globs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_globs: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub instructions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TaskKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<TaskScope>,
    /// Never empty in a validated plan.
    pub rules: Vec<RuleReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptance_criteria: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
    #[serde(
        rename = "metaData",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub meta_data: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<String>>,
    /// Never empty in a validated plan.
    pub tasks: Vec<Task>,
}

fn string_array() -> serde_json::Value {
    serde_json::json!({ "type": "array", "items": { "type": "string" } })
}

/// JSON schema for a rule reference.
pub fn rule_reference_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "id": { "type": "string", "minLength": 1 },
            "description": { "type": "string" },
            "path": { "type": "string" },
            "tags": string_array()
        },
        "required": ["id", "description", "path", "tags"]
    })
}

/// JSON schema of the Plan contract, as given to the submit tool.
///
/// `id` is optional here: a deterministic fallback is filled in when the
/// model omits it.
pub fn plan_json_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "id": { "type": "string" },
            "summary": { "type": "string" },
            "notes": string_array(),
            "tasks": {
                "type": "array",
                "minItems": 1,
                "items": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "minLength": 1 },
                        "title": { "type": "string", "minLength": 1 },
                        "instructions": { "type": "string", "minLength": 1 },
                        "kind": { "type": "string", "enum": TaskKind::ALL },
                        "scope": {
                            "type": "object",
                            "properties": {
                                "files": string_array(),
                                "includeGlobs": string_array(),
                                "excludeGlobs": string_array()
                            }
                        },
                        "rules": {
                            "type": "array",
                            "minItems": 1,
                            "items": rule_reference_schema()
                        },
                        "acceptanceCriteria": string_array(),
                        "dependencies": string_array(),
                        "metaData": { "type": "object" }
                    },
                    "required": ["id", "title", "instructions", "rules"]
                }
            }
        },
        "required": ["tasks"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: &str) -> RuleReference {
        RuleReference {
            id: id.into(),
            description: "Use thiserror".into(),
            path: format!("rules/{id}.md"),
            tags: vec!["errors".into()],
        }
    }

    #[test]
    fn task_serializes_camel_case() {
        let task = Task {
            id: "t1".into(),
            title: "Add errors".into(),
            instructions: "Do it".into(),
            kind: Some(TaskKind::Feature),
            scope: Some(TaskScope {
                include_globs: Some(vec!["src/**".into()]),
                ..TaskScope::default()
            }),
            rules: vec![rule("r1")],
            acceptance_criteria: Some(vec!["compiles".into()]),
            dependencies: None,
            meta_data: Some(serde_json::Map::new()),
        };
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["kind"], "feature");
        assert!(json["scope"]["includeGlobs"].is_array());
        assert!(json["acceptanceCriteria"].is_array());
        assert!(json.get("metaData").is_some());
        assert!(json.get("dependencies").is_none());
    }

    #[test]
    fn rules_index_lookup() {
        let index = RulesIndex::new(vec![rule("r1"), rule("r2")]);
        assert_eq!(index.get("r2").unwrap().path, "rules/r2.md");
        assert!(index.get("r3").is_none());
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn plan_schema_rejects_empty_rules() {
        let schema = plan_json_schema();
        let validator = jsonschema::validator_for(&schema).unwrap();
        let ok = serde_json::json!({
            "tasks": [{"id": "t", "title": "T", "instructions": "I", "rules": [rule("r1")]}]
        });
        assert!(validator.is_valid(&ok));
        let bad = serde_json::json!({
            "tasks": [{"id": "t", "title": "T", "instructions": "I", "rules": []}]
        });
        assert!(!validator.is_valid(&bad));
    }

    #[test]
    fn task_kind_parse() {
        assert_eq!(TaskKind::parse("bugfix"), Some(TaskKind::Bugfix));
        assert_eq!(TaskKind::parse("epic"), None);
    }
}
