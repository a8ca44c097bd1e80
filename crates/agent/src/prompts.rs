//! Prompt text for the orchestrators.

use specplan_core::plan::RulesIndex;
use specplan_core::spec::Specification;
use specplan_tools::{LOOKUP_RULE, SUBMIT_PLAN, VIEW_FILE};

/// System prompt for a planning run that ends with the submit tool.
pub fn plan_system_prompt() -> String {
    format!(
        "You are a senior engineer turning a specification into an execution plan.\n\
         \n\
         You have read-only exploration tools:\n\
         - `{LOOKUP_RULE}`: fetch a rule from the rules index by id.\n\
         - `{VIEW_FILE}`: read a workspace file (optionally a line range).\n\
         \n\
         And exactly one terminal tool:\n\
         - `{SUBMIT_PLAN}`: submit the finished plan. Call it once, when you are done.\n\
         \n\
         Requirements for the plan:\n\
         - At least one task. Each task has a unique id, a title and concrete instructions.\n\
         - Every task lists at least one rule, referenced by its id from the rules index.\n\
         - Use `dependencies` to name ids of tasks that must finish first.\n\
         - Keep tasks small enough to be done in one sitting.\n\
         \n\
         If `{SUBMIT_PLAN}` returns an error, fix the payload and call it again."
    )
}

/// System prompt when the plan is returned as the final message instead.
pub fn plan_final_text_system_prompt() -> String {
    format!(
        "You are a senior engineer turning a specification into an execution plan.\n\
         \n\
         You may use `{LOOKUP_RULE}` and `{VIEW_FILE}` to explore. When done, reply with \
         the plan as a single JSON object and nothing else: \
         {{\"summary\", \"tasks\": [{{\"id\", \"title\", \"instructions\", \"kind\", \
         \"rules\": [{{\"id\", \"description\", \"path\", \"tags\"}}], \
         \"acceptanceCriteria\", \"dependencies\"}}]}}.\n\
         Every task must list at least one rule id from the rules index."
    )
}

/// Injected once exploration time is up.
pub fn submit_now_prompt() -> String {
    format!(
        "Exploration is over. Call `{SUBMIT_PLAN}` now with the complete plan. \
         Every task must list at least one rule from the rules index."
    )
}

/// The user turn of a planning run: the specification and the rules catalogue.
pub fn plan_user_prompt(spec: &Specification, rules: &RulesIndex) -> String {
    let mut out = String::from("# Specification\n\n");
    out.push_str(&spec.to_prompt_markdown());
    out.push_str("\n# Rules index\n\n");
    for rule in &rules.rules {
        out.push_str(&format!("- `{}`: {}", rule.id, rule.description.trim()));
        if !rule.tags.is_empty() {
            out.push_str(&format!(" [{}]", rule.tags.join(", ")));
        }
        out.push('\n');
    }
    out
}

pub const RULE_SUMMARY_SYSTEM: &str = "You summarize coding rules for an index. \
Reply with a JSON object only: {\"description\": string, \"tags\": string[]}. \
The description is one sentence saying when the rule applies. \
Tags are short lowercase keywords.";

pub fn rule_summary_prompt(path: &str, content: &str) -> String {
    format!("Rule file: {path}\n\n```\n{content}\n```")
}

pub const CODE_SUMMARY_SYSTEM: &str = "You summarize source files for other engineers. \
Reply with two or three plain sentences describing what the file does. No Markdown.";

pub fn code_summary_prompt(path: &str, content: &str) -> String {
    format!("File: {path}\n\n```\n{content}\n```")
}
