//! The plan orchestrator.
//!
//! A run starts in `Exploring`: the model may call the read-only tools any
//! number of times. It becomes `Submitted` the moment `submit_plan` returns
//! successfully, which also ends the step loop. If the loop ends any other
//! way the run is `Failed` and surfaces as `LLM_ERROR`.
//!
//! The submitted plan is read back from the returned step trace; nothing is
//! shared between runs, so one agent can serve concurrent runs.

use serde_json::json;
use specplan_config::{PlanConfig, TerminationMode};
use specplan_core::error::AppError;
use specplan_core::files::FileSource;
use specplan_core::fingerprint::plan_id_for;
use specplan_core::message::Message;
use specplan_core::plan::{Plan, RulesIndex};
use specplan_core::provider::{ToolChoice, Usage};
use specplan_core::runtime::{
    GenerateTextRequest, PrepareStep, RunResult, RuntimeAdapter, Step, StepContext, StepOverride,
    ToolDispatch,
};
use specplan_core::spec::Specification;
use specplan_core::validate::{PlanValidation, parse_plan, validate_plan};
use specplan_tools::{DEFAULT_MAX_FILE_BYTES, LOOKUP_RULE, SUBMIT_PLAN, VIEW_FILE};
use std::sync::Arc;
use tracing::{info, warn};

use crate::prompts;

/// Where a planning run stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanState {
    Exploring,
    Submitted,
    Failed,
}

impl PlanState {
    /// State of a run still in progress, derived from the steps so far.
    pub fn of(steps: &[Step]) -> Self {
        let submitted = steps
            .iter()
            .flat_map(|s| s.tool_results.iter())
            .any(|r| r.name == SUBMIT_PLAN && !r.is_error);
        if submitted {
            Self::Submitted
        } else {
            Self::Exploring
        }
    }

    /// State of a finished run. A run that ends while still exploring failed.
    pub fn of_finished(run: &RunResult) -> Self {
        match Self::of(&run.steps) {
            Self::Exploring => Self::Failed,
            state => state,
        }
    }
}

/// A produced plan together with what it cost.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub plan: Plan,
    /// Steps the run took
    pub steps: usize,
    pub usage: Usage,
}

/// Narrows the tool set to `submit_plan` once exploration time is up.
struct SubmitDeadline {
    explore_steps: u32,
    system: String,
}

impl PrepareStep for SubmitDeadline {
    fn prepare(&self, ctx: StepContext<'_>) -> Option<StepOverride> {
        if PlanState::of(ctx.steps) != PlanState::Exploring {
            return None;
        }
        let due = ctx.step_number > self.explore_steps || ctx.step_number == ctx.max_steps;
        due.then(|| StepOverride {
            active_tools: Some(vec![SUBMIT_PLAN.into()]),
            tool_choice: Some(ToolChoice::Tool(SUBMIT_PLAN.into())),
            system: Some(self.system.clone()),
            messages: None,
        })
    }
}

/// Turns a specification and a rules index into a validated [`Plan`].
pub struct PlanAgent {
    runtime: Arc<dyn RuntimeAdapter>,
    files: Arc<dyn FileSource>,
    max_steps: u32,
    explore_steps: u32,
    termination: TerminationMode,
    max_file_bytes: usize,
    temperature: Option<f32>,
    tool_dispatch: ToolDispatch,
}

impl PlanAgent {
    pub fn new(runtime: Arc<dyn RuntimeAdapter>, files: Arc<dyn FileSource>) -> Self {
        let defaults = PlanConfig::default();
        Self {
            runtime,
            files,
            max_steps: defaults.max_steps,
            explore_steps: defaults.explore_steps,
            termination: defaults.termination,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            temperature: None,
            tool_dispatch: ToolDispatch::Sequential,
        }
    }

    pub fn from_config(
        runtime: Arc<dyn RuntimeAdapter>,
        files: Arc<dyn FileSource>,
        config: &PlanConfig,
    ) -> Self {
        Self::new(runtime, files)
            .with_max_steps(config.max_steps)
            .with_explore_steps(config.explore_steps)
            .with_termination(config.termination)
            .with_max_file_bytes(config.max_file_bytes)
    }

    pub fn with_max_steps(mut self, max: u32) -> Self {
        self.max_steps = max;
        self
    }

    /// Steps after which only `submit_plan` is offered.
    pub fn with_explore_steps(mut self, steps: u32) -> Self {
        self.explore_steps = steps;
        self
    }

    pub fn with_termination(mut self, termination: TerminationMode) -> Self {
        self.termination = termination;
        self
    }

    pub fn with_max_file_bytes(mut self, bytes: usize) -> Self {
        self.max_file_bytes = bytes;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_tool_dispatch(mut self, dispatch: ToolDispatch) -> Self {
        self.tool_dispatch = dispatch;
        self
    }

    /// Run one planning conversation.
    ///
    /// The specification is checked before any model call. The plan id
    /// falls back to a hash of the specification when the model omits one.
    pub async fn run(
        &self,
        spec: &Specification,
        rules: &RulesIndex,
    ) -> specplan_core::Result<PlanOutcome> {
        spec.validate()?;
        if rules.is_empty() {
            return Err(AppError::validation(
                "Rules index is empty; every task needs at least one rule",
            ));
        }

        let fallback_id = plan_id_for(spec)?;
        let index = Arc::new(rules.clone());

        info!(
            plan_id = %fallback_id,
            rules = index.len(),
            termination = ?self.termination,
            max_steps = self.max_steps,
            "Planning run started"
        );

        let registry = specplan_tools::planning_registry(
            index.clone(),
            self.files.clone(),
            self.max_file_bytes,
            fallback_id.clone(),
        )?;

        let opts = PlanValidation {
            rules_index: Some(&*index),
            fallback_id: Some(fallback_id.as_str()),
        };

        let user = Message::user(prompts::plan_user_prompt(spec, &index));
        let outcome = match self.termination {
            TerminationMode::SubmitTool => {
                let request = self
                    .base_request(vec![Message::system(prompts::plan_system_prompt()), user])
                    .with_tools(registry.pick(&[LOOKUP_RULE, VIEW_FILE, SUBMIT_PLAN]))
                    .with_prepare_step(Arc::new(SubmitDeadline {
                        explore_steps: self.explore_steps,
                        system: format!(
                            "{}\n\n{}",
                            prompts::plan_system_prompt(),
                            prompts::submit_now_prompt()
                        ),
                    }))
                    .with_stop_on_tools(vec![SUBMIT_PLAN.into()]);

                let run = self.runtime.generate_text(request).await?;
                submitted_plan(&run, &opts)?
            }
            TerminationMode::FinalText => {
                let request = self
                    .base_request(vec![
                        Message::system(prompts::plan_final_text_system_prompt()),
                        user,
                    ])
                    .with_tools(registry.pick(&[LOOKUP_RULE, VIEW_FILE]));

                let run = self.runtime.generate_text(request).await?;
                final_text_plan(&run, &opts)?
            }
        };

        info!(
            plan_id = %outcome.plan.id,
            tasks = outcome.plan.tasks.len(),
            steps = outcome.steps,
            total_tokens = outcome.usage.total_tokens,
            "Plan submitted"
        );
        Ok(outcome)
    }

    fn base_request(&self, messages: Vec<Message>) -> GenerateTextRequest {
        let request = GenerateTextRequest::new(messages)
            .with_max_steps(self.max_steps)
            .with_tool_dispatch(self.tool_dispatch);
        match self.temperature {
            Some(t) => request.with_temperature(t),
            None => request,
        }
    }
}

/// The first successful submission in the trace, or `Failed`.
fn submitted_plan(run: &RunResult, opts: &PlanValidation<'_>) -> specplan_core::Result<PlanOutcome> {
    let Some(submission) = run.successful_results(SUBMIT_PLAN).next() else {
        let rejected = run
            .steps
            .iter()
            .flat_map(|s| s.tool_results.iter())
            .filter(|r| r.name == SUBMIT_PLAN)
            .count();
        warn!(
            state = ?PlanState::of_finished(run),
            steps = run.steps.len(),
            rejected,
            "Run ended without a plan"
        );
        return Err(AppError::llm(format!(
            "Model did not submit a valid plan (steps taken: {})",
            run.steps.len()
        ))
        .with_details(json!({
            "steps": run.steps.len(),
            "rejected_submissions": rejected,
        })));
    };

    Ok(PlanOutcome {
        plan: validate_plan(&submission.output, opts)?,
        steps: run.steps.len(),
        usage: run.usage,
    })
}

fn final_text_plan(run: &RunResult, opts: &PlanValidation<'_>) -> specplan_core::Result<PlanOutcome> {
    if run.text.trim().is_empty() {
        warn!(steps = run.steps.len(), "Run ended without final text");
        return Err(AppError::llm(format!(
            "Model returned no plan text (steps taken: {})",
            run.steps.len()
        ))
        .with_details(json!({ "steps": run.steps.len() })));
    }

    Ok(PlanOutcome {
        plan: parse_plan(&run.text, opts)?,
        steps: run.steps.len(),
        usage: run.usage,
    })
}
