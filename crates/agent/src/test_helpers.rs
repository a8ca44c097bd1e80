//! Shared test doubles for runtime and orchestrator tests.

use async_trait::async_trait;
use specplan_core::error::{ProviderError, ToolError};
use specplan_core::files::FileSource;
use specplan_core::message::{Message, MessageToolCall};
use specplan_core::plan::{RuleReference, RulesIndex};
use specplan_core::provider::{FinishReason, Provider, ProviderRequest, ProviderResponse, Usage};
use specplan_core::runtime::{
    GenerateObjectRequest, GenerateTextRequest, ObjectResult, RunResult, RuntimeAdapter,
};
use specplan_core::spec::{Overview, SpecScope, Specification};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next entry in the queue and records
/// the request it was given. Panics if more calls are made than entries
/// provided.
pub struct SequentialMockProvider {
    responses: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self::scripted(responses.into_iter().map(Ok).collect())
    }

    /// Like `new`, but entries may be backend failures.
    pub fn scripted(script: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider that returns a single text response (no tool calls).
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        requests.push(request);
        let count = requests.len();

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("SequentialMockProvider: no more responses (call #{count})"))
    }
}

fn mock_usage() -> Option<Usage> {
    Some(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    })
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: mock_usage(),
        model: "mock-model".into(),
        finish_reason: Some(FinishReason::Stop),
    }
}

/// Create a response with tool calls and optional thought content.
pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>, thought: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_with_tools(thought, tool_calls),
        usage: mock_usage(),
        model: "mock-model".into(),
        finish_reason: Some(FinishReason::ToolCalls),
    }
}

/// Helper to create a tool call. The id is derived from the tool name.
pub fn make_tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    make_tool_call_with_id(&format!("call_{name}"), name, args)
}

pub fn make_tool_call_with_id(id: &str, name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

/// A runtime that replays canned results without a tool loop.
///
/// Records every request so tests can assert on prompts and options.
#[derive(Default)]
pub struct ScriptedRuntime {
    texts: Mutex<VecDeque<specplan_core::Result<RunResult>>>,
    objects: Mutex<VecDeque<specplan_core::Result<ObjectResult>>>,
    pub text_requests: Mutex<Vec<GenerateTextRequest>>,
    pub object_requests: Mutex<Vec<GenerateObjectRequest>>,
}

impl ScriptedRuntime {
    pub fn with_texts(texts: Vec<specplan_core::Result<RunResult>>) -> Self {
        Self {
            texts: Mutex::new(texts.into()),
            ..Self::default()
        }
    }

    pub fn last_text_request(&self) -> GenerateTextRequest {
        self.text_requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl RuntimeAdapter for ScriptedRuntime {
    async fn generate_text(
        &self,
        request: GenerateTextRequest,
    ) -> specplan_core::Result<RunResult> {
        self.text_requests.lock().unwrap().push(request);
        self.texts
            .lock()
            .unwrap()
            .pop_front()
            .expect("ScriptedRuntime: no more text results")
    }

    async fn generate_object(
        &self,
        request: GenerateObjectRequest,
    ) -> specplan_core::Result<ObjectResult> {
        self.object_requests.lock().unwrap().push(request);
        self.objects
            .lock()
            .unwrap()
            .pop_front()
            .expect("ScriptedRuntime: no more object results")
    }
}

/// A run that ended with plain text and no tool calls.
pub fn text_run(text: &str) -> RunResult {
    RunResult {
        text: text.to_string(),
        steps: vec![specplan_core::runtime::Step {
            step_number: 1,
            text: Some(text.to_string()),
            finish_reason: Some(FinishReason::Stop),
            usage: mock_usage(),
            tool_calls: vec![],
            tool_results: vec![],
        }],
        usage: mock_usage().unwrap_or_default(),
        messages: vec![Message::assistant(text)],
    }
}

/// In-memory file source keyed by workspace-relative path.
#[derive(Default)]
pub struct MemoryFiles {
    files: HashMap<String, String>,
}

impl MemoryFiles {
    pub fn new<const N: usize>(files: [(&str, &str); N]) -> Self {
        Self {
            files: files
                .into_iter()
                .map(|(p, c)| (p.to_string(), c.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl FileSource for MemoryFiles {
    async fn read_to_string(&self, path: &str) -> Result<String, ToolError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| ToolError::not_found(format!("File not found: {path}")))
    }
}

pub fn specification() -> Specification {
    Specification {
        overview: Overview {
            summary: "Replace panics with typed errors".into(),
            goals: vec!["Library code never panics".into()],
        },
        motivation: None,
        constraints: vec!["Keep the public API".into()],
        implementation_patterns: vec![],
        acceptance_criteria: vec!["Every fallible function returns Result".into()],
        edge_cases: vec![],
        scope: SpecScope {
            include: vec!["src/".into()],
            exclude: vec![],
        },
    }
}

pub fn rules_index() -> RulesIndex {
    RulesIndex::new(vec![
        RuleReference {
            id: "errors".into(),
            description: "Use thiserror for library errors".into(),
            path: "rules/errors.md".into(),
            tags: vec!["rust".into(), "errors".into()],
        },
        RuleReference {
            id: "tests".into(),
            description: "Unit tests live next to the code".into(),
            path: "rules/tests.md".into(),
            tags: vec!["testing".into()],
        },
    ])
}

/// A minimal plan payload that passes validation against [`rules_index`].
pub fn plan_payload() -> serde_json::Value {
    serde_json::json!({
        "summary": "Introduce error types",
        "tasks": [{
            "id": "t1",
            "title": "Add error enum",
            "instructions": "Create src/error.rs with a thiserror enum",
            "kind": "refactor",
            "rules": [{"id": "errors", "description": "", "path": "", "tags": []}]
        }]
    })
}
