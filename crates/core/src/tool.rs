//! Tools: named, schema-validated capabilities the model may invoke.
//!
//! A [`Tool`] pairs a declared input contract with a [`ToolHandler`]. Every
//! invocation goes through [`Tool::call`], which validates the raw arguments
//! against the input schema first; a handler never sees arguments that
//! failed validation.
//!
//! A [`ToolRegistry`] holds tools by name and hands out ordered subsets so an
//! orchestrator can expose a curated tool set per run.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;

use crate::error::{AppError, ToolError};
use crate::provider::ToolDefinition;

/// The executable half of a tool.
///
/// Handlers may perform I/O through injected collaborators but report every
/// failure as a [`ToolError`].
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool with arguments that already passed schema validation.
    async fn handle(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError>;
}

/// Adapts an async closure into a [`ToolHandler`].
pub struct FnHandler<F>(F);

/// Wrap an async closure as a handler.
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(serde_json::Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<serde_json::Value, ToolError>> + Send,
{
    FnHandler(f)
}

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(serde_json::Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<serde_json::Value, ToolError>> + Send,
{
    async fn handle(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        (self.0)(args).await
    }
}

/// A named tool with a validated input contract.
pub struct Tool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
    output_schema: Option<serde_json::Value>,
    validator: jsonschema::Validator,
    handler: Arc<dyn ToolHandler>,
}

/// Build a tool. The input schema is compiled once, here.
pub fn make_tool(
    name: impl Into<String>,
    description: impl Into<String>,
    input_schema: serde_json::Value,
    output_schema: Option<serde_json::Value>,
    handler: impl ToolHandler + 'static,
) -> crate::Result<Tool> {
    let name = name.into();
    let validator = jsonschema::validator_for(&input_schema).map_err(|e| {
        AppError::validation(format!("Invalid input schema for tool '{name}': {e}"))
    })?;
    Ok(Tool {
        name,
        description: description.into(),
        input_schema,
        output_schema,
        validator,
        handler: Arc::new(handler),
    })
}

impl Tool {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn input_schema(&self) -> &serde_json::Value {
        &self.input_schema
    }

    pub fn output_schema(&self) -> Option<&serde_json::Value> {
        self.output_schema.as_ref()
    }

    /// Validate `raw_args`, then run the handler.
    ///
    /// On validation failure returns `INVALID_ARGS` naming the tool and
    /// listing every issue; the handler is not invoked.
    pub async fn call(&self, raw_args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let issues: Vec<String> = self
            .validator
            .iter_errors(&raw_args)
            .map(|e| e.to_string())
            .collect();

        if !issues.is_empty() {
            return Err(ToolError::invalid_args(format!(
                "Invalid arguments for tool '{}': {}",
                self.name,
                issues.join("; ")
            ))
            .with_details(serde_json::json!({
                "tool": self.name,
                "issues": issues,
            })));
        }

        self.handler.handle(raw_args).await
    }

    /// Wire-level definition sent to the model.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.input_schema.clone(),
        }
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .field("output_schema", &self.output_schema)
            .finish_non_exhaustive()
    }
}

/// Deserialize validated arguments into a typed struct.
pub fn parse_args<T: DeserializeOwned>(
    tool_name: &str,
    args: serde_json::Value,
) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| {
        ToolError::invalid_args(format!("Invalid arguments for tool '{tool_name}': {e}"))
    })
}

/// A registry of available tools, kept in registration order.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<Tool>>,
}

/// Build a registry from a list of tools.
pub fn create_tool_registry(tools: impl IntoIterator<Item = Tool>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.register(tool);
    }
    registry
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool. Replaces any existing tool with the same name in place.
    pub fn register(&mut self, tool: Tool) {
        self.register_shared(Arc::new(tool));
    }

    pub fn register_shared(&mut self, tool: Arc<Tool>) {
        match self.tools.iter_mut().find(|t| t.name() == tool.name()) {
            Some(slot) => *slot = tool,
            None => self.tools.push(tool),
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    /// Tools matching `names`, in the order of `names`; unknown names are skipped.
    pub fn pick<S: AsRef<str>>(&self, names: &[S]) -> Vec<Arc<Tool>> {
        names.iter().filter_map(|n| self.get(n.as_ref())).collect()
    }

    /// All tools in registration order.
    pub fn all(&self) -> Vec<Arc<Tool>> {
        self.tools.clone()
    }

    /// All tool definitions (for sending to the model).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn text_schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "text": { "type": "string" }
            },
            "required": ["text"],
            "additionalProperties": false
        })
    }

    fn echo_tool(name: &str) -> Tool {
        make_tool(
            name,
            "Echoes back the input",
            text_schema(),
            None,
            handler_fn(|args: serde_json::Value| async move {
                Ok(serde_json::json!({ "echo": args["text"] }))
            }),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn valid_args_reach_handler() {
        let tool = echo_tool("echo");
        let out = tool.call(serde_json::json!({"text": "hello"})).await.unwrap();
        assert_eq!(out["echo"], "hello");
    }

    #[tokio::test]
    async fn invalid_args_never_invoke_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let tool = make_tool(
            "counted",
            "Counts invocations",
            text_schema(),
            None,
            handler_fn(move |_args: serde_json::Value| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(serde_json::Value::Null)
                }
            }),
        )
        .unwrap();

        let err = tool
            .call(serde_json::json!({"text": 42, "extra": true}))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ToolErrorKind::InvalidArgs);
        assert!(err.message.contains("'counted'"));
        let issues = err.details.as_ref().unwrap()["issues"].as_array().unwrap();
        assert_eq!(issues.len(), 2, "every issue is reported: {issues:?}");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn handler_errors_pass_through_verbatim() {
        let tool = make_tool(
            "failing",
            "",
            serde_json::json!({"type": "object"}),
            None,
            handler_fn(|_args: serde_json::Value| async move {
                Err(ToolError::io("disk on fire"))
            }),
        )
        .unwrap();
        let err = tool.call(serde_json::json!({})).await.unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::IoError);
        assert_eq!(err.message, "disk on fire");
    }

    #[test]
    fn invalid_schema_is_rejected() {
        let result = make_tool(
            "broken",
            "",
            serde_json::json!({"type": 12}),
            None,
            handler_fn(|_args: serde_json::Value| async move { Ok(serde_json::Value::Null) }),
        );
        let err = result.unwrap_err();
        assert!(err.message.contains("broken"));
    }

    #[test]
    fn pick_preserves_order_and_skips_missing() {
        let registry = create_tool_registry(vec![echo_tool("a"), echo_tool("b")]);
        let picked = registry.pick(&["b", "missing", "a"]);
        let names: Vec<&str> = picked.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["b", "a"]);

        let picked = registry.pick(&["a", "missing", "b"]);
        let names: Vec<&str> = picked.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn register_replaces_same_name() {
        let mut registry = create_tool_registry(vec![echo_tool("a"), echo_tool("b")]);
        registry.register(echo_tool("a"));
        assert_eq!(registry.names(), vec!["a", "b"]);
        assert!(registry.get("a").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn definitions_carry_schema() {
        let registry = create_tool_registry(vec![echo_tool("echo")]);
        let defs = registry.definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "echo");
        assert_eq!(defs[0].parameters["required"], serde_json::json!(["text"]));
    }

    #[test]
    fn parse_args_reports_tool_name() {
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Args {
            id: String,
        }
        let err = parse_args::<Args>("lookup_rule", serde_json::json!({"id": 3})).unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::InvalidArgs);
        assert!(err.message.contains("lookup_rule"));
    }
}
