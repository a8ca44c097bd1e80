//! Runtime Adapter: the backend-agnostic contract for running a model
//! conversation.
//!
//! Orchestrators talk only to [`RuntimeAdapter`]. A concrete adapter drives
//! the step loop (model call → tool dispatch → fold results back) and
//! returns the full, append-only step trace so callers can inspect what
//! happened without sharing mutable state with the loop.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::message::Message;
use crate::provider::{FinishReason, ToolChoice, Usage};
use crate::tool::Tool;

/// Upper bound on loop iterations when the caller does not pass one.
pub const DEFAULT_MAX_STEPS: u32 = 8;

/// A tool invocation as recorded in a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call ID (matches the backend's tool_call id)
    pub id: String,

    /// Name of the tool the model invoked
    pub name: String,

    /// Parsed arguments; `Null` when the backend sent unparseable JSON
    pub arguments: serde_json::Value,
}

/// The outcome of one tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    /// The tool that produced it
    pub name: String,

    /// Success payload, or the formatted failure string when `is_error`
    pub output: serde_json::Value,

    /// Whether the call failed
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    /// The text placed into the conversation for this result.
    pub fn to_message_content(&self) -> String {
        match &self.output {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// One iteration of the tool-calling loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// 1-based, monotonically increasing
    pub step_number: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,

    #[serde(default)]
    pub tool_results: Vec<ToolResult>,
}

/// Result of a free-text run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Text of the final step
    pub text: String,

    /// Every step, in order
    pub steps: Vec<Step>,

    /// Usage summed over all steps
    pub usage: Usage,

    /// The conversation as it stood when the loop ended
    pub messages: Vec<Message>,
}

impl RunResult {
    /// Successful results of the named tool, in step order.
    pub fn successful_results<'a>(
        &'a self,
        tool_name: &'a str,
    ) -> impl Iterator<Item = &'a ToolResult> + 'a {
        self.steps
            .iter()
            .flat_map(|s| s.tool_results.iter())
            .filter(move |r| r.name == tool_name && !r.is_error)
    }
}

/// Result of a schema-constrained generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectResult {
    pub object: serde_json::Value,
    pub usage: Usage,
}

/// How tool calls within one step are executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolDispatch {
    /// One call at a time, in model order
    #[default]
    Sequential,
    /// All calls of a step together; results still recorded in model order
    Concurrent,
}

/// What a [`PrepareStep`] hook sees before each step.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    /// The number the upcoming step will carry
    pub step_number: u32,
    /// The step limit for this run
    pub max_steps: u32,
    /// Steps completed so far
    pub steps: &'a [Step],
    /// The conversation as it will be sent unless overridden
    pub messages: &'a [Message],
}

/// Per-step adjustments. Every field applies to the upcoming step only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOverride {
    /// Restrict the active tools to these names (order preserved)
    pub active_tools: Option<Vec<String>>,
    /// Tool-choice policy for this step
    pub tool_choice: Option<ToolChoice>,
    /// Replaces the leading system message for this step
    pub system: Option<String>,
    /// Replaces the message list sent for this step
    pub messages: Option<Vec<Message>>,
}

/// Hook invoked before each step.
pub trait PrepareStep: Send + Sync {
    fn prepare(&self, ctx: StepContext<'_>) -> Option<StepOverride>;
}

impl<F> PrepareStep for F
where
    F: Fn(StepContext<'_>) -> Option<StepOverride> + Send + Sync,
{
    fn prepare(&self, ctx: StepContext<'_>) -> Option<StepOverride> {
        self(ctx)
    }
}

/// Input to [`RuntimeAdapter::generate_text`].
#[derive(Clone, Default)]
pub struct GenerateTextRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<Arc<Tool>>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub max_steps: Option<u32>,
    pub prepare_step: Option<Arc<dyn PrepareStep>>,
    /// Terminal tools: a successful call ends the loop after its step
    pub stop_on_tools: Vec<String>,
    pub tool_dispatch: ToolDispatch,
}

impl GenerateTextRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    pub fn with_tools(mut self, tools: Vec<Arc<Tool>>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn with_prepare_step(mut self, hook: Arc<dyn PrepareStep>) -> Self {
        self.prepare_step = Some(hook);
        self
    }

    pub fn with_stop_on_tools(mut self, names: Vec<String>) -> Self {
        self.stop_on_tools = names;
        self
    }

    pub fn with_tool_dispatch(mut self, dispatch: ToolDispatch) -> Self {
        self.tool_dispatch = dispatch;
        self
    }

    /// The effective step bound: finite, and at least one.
    pub fn effective_max_steps(&self) -> u32 {
        self.max_steps.unwrap_or(DEFAULT_MAX_STEPS).max(1)
    }
}

impl std::fmt::Debug for GenerateTextRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerateTextRequest")
            .field("messages", &self.messages.len())
            .field(
                "tools",
                &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_steps", &self.max_steps)
            .field("prepare_step", &self.prepare_step.is_some())
            .field("stop_on_tools", &self.stop_on_tools)
            .field("tool_dispatch", &self.tool_dispatch)
            .finish()
    }
}

/// Input to [`RuntimeAdapter::generate_object`].
#[derive(Debug, Clone)]
pub struct GenerateObjectRequest {
    pub messages: Vec<Message>,
    pub schema: serde_json::Value,
    /// Name advertised to the backend for the schema
    pub schema_name: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl GenerateObjectRequest {
    pub fn new(messages: Vec<Message>, schema: serde_json::Value) -> Self {
        Self {
            messages,
            schema,
            schema_name: "response".into(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// The backend-agnostic conversation runner.
///
/// Backend failures come back as `AppError { code: LLM_ERROR }`; tool
/// failures never do, they are folded into the conversation instead.
#[async_trait]
pub trait RuntimeAdapter: Send + Sync {
    /// Run the bounded tool-calling loop and return the final text and trace.
    async fn generate_text(&self, request: GenerateTextRequest) -> crate::Result<RunResult>;

    /// Single-shot, schema-constrained generation. No tool loop.
    async fn generate_object(&self, request: GenerateObjectRequest)
    -> crate::Result<ObjectResult>;
}
