//! Orchestration on top of the core contracts.
//!
//! - [`LoopRuntime`] runs the bounded tool-calling loop against a provider.
//! - [`PlanAgent`] turns a specification into a validated plan:
//!   explore with read-only tools, then submit through `submit_plan`.
//! - [`RuleSummarizer`] and [`CodeSummarizer`] are single-shot helpers for
//!   building the rules index and file summaries.

pub mod loop_runner;
pub mod plan_agent;
pub mod prompts;
pub mod summarizer;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use loop_runner::{LoopRuntime, build_runtime};
pub use plan_agent::{PlanAgent, PlanOutcome, PlanState};
pub use summarizer::{
    CODE_SUMMARY_MAX_CHARS, CodeSummarizer, RuleSummarizer, rule_id_from_path,
};
