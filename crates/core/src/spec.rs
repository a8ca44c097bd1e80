//! The specification document a planning run consumes.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub summary: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub goals: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecScope {
    pub include: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specification {
    pub overview: Overview,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motivation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implementation_patterns: Vec<String>,
    pub acceptance_criteria: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edge_cases: Vec<String>,
    pub scope: SpecScope,
}

impl Specification {
    /// Check the invariants the input contract requires.
    pub fn validate(&self) -> crate::Result<()> {
        if self.overview.summary.trim().is_empty() {
            return Err(AppError::validation(
                "Specification overview.summary must be a non-empty string",
            ));
        }
        if self.acceptance_criteria.is_empty() {
            return Err(AppError::validation(
                "Specification must have at least one acceptance criterion",
            ));
        }
        if let Some(i) = self
            .acceptance_criteria
            .iter()
            .position(|c| c.trim().is_empty())
        {
            return Err(AppError::validation(format!(
                "Acceptance criterion at index {i} must be a non-empty string"
            )));
        }
        if self.scope.include.is_empty() {
            return Err(AppError::validation(
                "Specification scope.include must list at least one path",
            ));
        }
        Ok(())
    }

    /// Render the specification as a Markdown block for prompts.
    pub fn to_prompt_markdown(&self) -> String {
        let mut out = format!("## Summary\n{}\n", self.overview.summary.trim());
        push_list(&mut out, "Goals", &self.overview.goals);
        if let Some(motivation) = &self.motivation {
            out.push_str(&format!("\n## Motivation\n{}\n", motivation.trim()));
        }
        push_list(&mut out, "Constraints", &self.constraints);
        push_list(&mut out, "Implementation patterns", &self.implementation_patterns);
        push_list(&mut out, "Acceptance criteria", &self.acceptance_criteria);
        push_list(&mut out, "Edge cases", &self.edge_cases);
        push_list(&mut out, "Scope: include", &self.scope.include);
        push_list(&mut out, "Scope: exclude", &self.scope.exclude);
        out
    }
}

fn push_list(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("\n## {heading}\n"));
    for item in items {
        out.push_str(&format!("- {}\n", item.trim()));
    }
}
