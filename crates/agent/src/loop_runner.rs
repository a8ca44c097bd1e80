//! The step loop: a [`RuntimeAdapter`] over any [`Provider`].

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use specplan_config::AppConfig;
use specplan_core::error::{AppError, ToolError};
use specplan_core::message::{Message, MessageToolCall, Role};
use specplan_core::provider::{Provider, ProviderRequest, ResponseSchema, Usage};
use specplan_core::runtime::{
    GenerateObjectRequest, GenerateTextRequest, ObjectResult, RunResult, RuntimeAdapter, Step,
    StepContext, StepOverride, ToolCall, ToolDispatch, ToolResult,
};
use specplan_core::tool::Tool;
use specplan_core::validate::{parse_json, unwrap_code_fence};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Drives a model conversation step by step against one provider.
pub struct LoopRuntime {
    /// The LLM provider to use
    provider: Arc<dyn Provider>,

    /// The model to use
    model: String,

    /// Temperature when the request does not set one
    temperature: f32,

    /// Max tokens when the request does not set one
    max_tokens: Option<u32>,
}

impl LoopRuntime {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: specplan_core::provider::default_temperature(),
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the default max tokens per model response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        request: ProviderRequest,
        step: u32,
    ) -> specplan_core::Result<specplan_core::provider::ProviderResponse> {
        self.provider.complete(request).await.map_err(|e| {
            warn!(
                provider = self.provider.name(),
                step,
                error = %e,
                "Backend request failed"
            );
            AppError::from(e).with_details(serde_json::json!({ "step": step }))
        })
    }
}

/// Build a runtime from configuration: provider, model and sampling defaults.
pub fn build_runtime(config: &AppConfig) -> specplan_core::Result<LoopRuntime> {
    let provider = specplan_providers::build_from_config(config)?;
    Ok(LoopRuntime::new(provider, &config.model)
        .with_temperature(config.temperature)
        .with_max_tokens(config.max_tokens))
}

#[async_trait]
impl RuntimeAdapter for LoopRuntime {
    async fn generate_text(&self, request: GenerateTextRequest) -> specplan_core::Result<RunResult> {
        let max_steps = request.effective_max_steps();
        let mut messages = request.messages.clone();
        let mut steps: Vec<Step> = Vec::new();
        let mut usage = Usage::default();

        info!(
            provider = self.provider.name(),
            model = %self.model,
            tools = request.tools.len(),
            max_steps,
            "Starting run"
        );

        for step_number in 1..=max_steps {
            let overrides = request
                .prepare_step
                .as_ref()
                .and_then(|hook| {
                    hook.prepare(StepContext {
                        step_number,
                        max_steps,
                        steps: &steps,
                        messages: &messages,
                    })
                })
                .unwrap_or_default();

            let StepOverride {
                active_tools,
                tool_choice,
                system,
                messages: replaced,
            } = overrides;

            let tools = match active_tools {
                Some(names) => pick_tools(&request.tools, &names),
                None => request.tools.clone(),
            };

            let mut outgoing = replaced.unwrap_or_else(|| messages.clone());
            if let Some(system) = system {
                replace_system(&mut outgoing, system);
            }

            debug!(
                step = step_number,
                messages = outgoing.len(),
                tools = ?tools.iter().map(|t| t.name()).collect::<Vec<_>>(),
                tool_choice = ?tool_choice,
                "Step"
            );

            let provider_request = ProviderRequest {
                model: self.model.clone(),
                messages: outgoing,
                temperature: request.temperature.unwrap_or(self.temperature),
                max_tokens: request.max_tokens.or(self.max_tokens),
                tools: tools.iter().map(|t| t.definition()).collect(),
                tool_choice,
                response_schema: None,
            };

            let response = self.complete(provider_request, step_number).await?;
            let step_usage = response.usage.unwrap_or_default();
            usage += step_usage;

            let message = response.message;
            let calls: Vec<(ToolCall, Result<Value, ToolError>)> =
                message.tool_calls.iter().map(decode_call).collect();

            let results = match request.tool_dispatch {
                ToolDispatch::Sequential => {
                    let mut results = Vec::with_capacity(calls.len());
                    for (call, args) in &calls {
                        results.push(dispatch(&tools, call, args.clone()).await);
                    }
                    results
                }
                ToolDispatch::Concurrent => {
                    join_all(
                        calls
                            .iter()
                            .map(|(call, args)| dispatch(&tools, call, args.clone())),
                    )
                    .await
                }
            };

            let text = (!message.content.is_empty()).then(|| message.content.clone());
            messages.push(message);
            for result in &results {
                messages.push(
                    Message::tool_result(
                        &result.call_id,
                        &result.name,
                        result.to_message_content(),
                    )
                    .with_error(result.is_error),
                );
            }

            let terminal = results
                .iter()
                .any(|r| !r.is_error && request.stop_on_tools.iter().any(|n| n == &r.name));

            steps.push(Step {
                step_number,
                text,
                finish_reason: response.finish_reason,
                usage: response.usage,
                tool_calls: calls.into_iter().map(|(call, _)| call).collect(),
                tool_results: results,
            });

            if steps.last().is_some_and(|s| s.tool_calls.is_empty()) {
                break;
            }
            if terminal {
                debug!(step = step_number, "Terminal tool succeeded, ending run");
                break;
            }
            if step_number == max_steps {
                warn!(max_steps, "Step limit reached with tool calls pending");
            }
        }

        let text = steps
            .last()
            .and_then(|s| s.text.clone())
            .unwrap_or_default();

        info!(
            steps = steps.len(),
            total_tokens = usage.total_tokens,
            "Run finished"
        );

        Ok(RunResult {
            text,
            steps,
            usage,
            messages,
        })
    }

    async fn generate_object(
        &self,
        request: GenerateObjectRequest,
    ) -> specplan_core::Result<ObjectResult> {
        let validator = jsonschema::validator_for(&request.schema).map_err(|e| {
            AppError::validation(format!(
                "Invalid response schema '{}': {e}",
                request.schema_name
            ))
        })?;

        debug!(
            provider = self.provider.name(),
            schema = %request.schema_name,
            "Requesting structured output"
        );

        let provider_request = ProviderRequest {
            model: self.model.clone(),
            messages: request.messages,
            temperature: request.temperature.unwrap_or(self.temperature),
            max_tokens: request.max_tokens.or(self.max_tokens),
            tools: Vec::new(),
            tool_choice: None,
            response_schema: Some(ResponseSchema {
                name: request.schema_name.clone(),
                schema: request.schema,
            }),
        };

        let response = self.complete(provider_request, 1).await?;
        let context = format!("{} output", request.schema_name);
        let object = parse_json(unwrap_code_fence(&response.message.content), &context)
            .map_err(|e| AppError::llm(e.message))?;

        let issues: Vec<String> = validator.iter_errors(&object).map(|e| e.to_string()).collect();
        if !issues.is_empty() {
            warn!(schema = %request.schema_name, issues = issues.len(), "Structured output rejected");
            return Err(AppError::llm(format!(
                "Model output does not match schema '{}': {}",
                request.schema_name,
                issues.join("; ")
            ))
            .with_details(serde_json::json!({ "issues": issues })));
        }

        Ok(ObjectResult {
            object,
            usage: response.usage.unwrap_or_default(),
        })
    }
}

/// Tools named in `names`, in that order. Unknown names are skipped.
fn pick_tools(tools: &[Arc<Tool>], names: &[String]) -> Vec<Arc<Tool>> {
    names
        .iter()
        .filter_map(|n| tools.iter().find(|t| t.name() == n).cloned())
        .collect()
}

fn replace_system(messages: &mut Vec<Message>, system: String) {
    match messages.first_mut() {
        Some(first) if first.role == Role::System => *first = Message::system(system),
        _ => messages.insert(0, Message::system(system)),
    }
}

/// Parse the raw argument string. Blank arguments mean an empty object.
fn decode_call(tc: &MessageToolCall) -> (ToolCall, Result<Value, ToolError>) {
    let parsed = if tc.arguments.trim().is_empty() {
        Ok(Value::Object(serde_json::Map::new()))
    } else {
        serde_json::from_str::<Value>(&tc.arguments).map_err(|e| {
            ToolError::invalid_args(format!(
                "Arguments for tool '{}' are not valid JSON: {e}",
                tc.name
            ))
        })
    };

    let call = ToolCall {
        id: tc.id.clone(),
        name: tc.name.clone(),
        arguments: parsed.as_ref().cloned().unwrap_or(Value::Null),
    };
    (call, parsed)
}

async fn dispatch(
    tools: &[Arc<Tool>],
    call: &ToolCall,
    args: Result<Value, ToolError>,
) -> ToolResult {
    let start = Instant::now();
    let outcome = match args {
        Err(e) => Err(e),
        Ok(args) => match tools.iter().find(|t| t.name() == call.name) {
            Some(tool) => tool.call(args).await,
            None => Err(ToolError::not_found(format!(
                "Unknown tool '{}'. Available: {}",
                call.name,
                tools.iter().map(|t| t.name()).collect::<Vec<_>>().join(", ")
            ))),
        },
    };
    let duration_ms = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(output) => {
            debug!(tool = %call.name, duration_ms, success = true, "Tool executed");
            ToolResult {
                call_id: call.id.clone(),
                name: call.name.clone(),
                output,
                is_error: false,
            }
        }
        Err(e) => {
            warn!(tool = %call.name, duration_ms, error = %e, "Tool execution failed");
            ToolResult {
                call_id: call.id.clone(),
                name: call.name.clone(),
                output: Value::String(e.to_model_string()),
                is_error: true,
            }
        }
    }
}
