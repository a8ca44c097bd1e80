//! # specplan core
//!
//! Domain types, traits, and error definitions for turning a specification
//! into a validated execution plan. Backends, tools and orchestrators live
//! in their own crates and depend inward on this one.
//!
//! ## Design Philosophy
//!
//! Every seam is a trait here ([`Provider`], [`RuntimeAdapter`],
//! [`ToolHandler`], [`FileSource`]). This enables:
//! - Swapping model backends via configuration
//! - Easy testing with scripted providers and runtimes
//! - Pure, panic-free validation of untrusted model output

pub mod error;
pub mod files;
pub mod fingerprint;
pub mod message;
pub mod plan;
pub mod provider;
pub mod runtime;
pub mod spec;
pub mod tool;
pub mod validate;

// Re-export key types at crate root for ergonomics
pub use error::{AppError, ErrorCode, ProviderError, Result, ToolError, ToolErrorKind};
pub use files::FileSource;
pub use message::{Message, MessageToolCall, Role};
pub use plan::{Plan, RuleReference, RulesIndex, Task, TaskKind, TaskScope};
pub use provider::{
    FinishReason, Provider, ProviderRequest, ProviderResponse, ToolChoice, ToolDefinition, Usage,
};
pub use runtime::{
    GenerateObjectRequest, GenerateTextRequest, ObjectResult, PrepareStep, RunResult,
    RuntimeAdapter, Step, StepContext, StepOverride, ToolCall, ToolDispatch, ToolResult,
};
pub use spec::Specification;
pub use tool::{Tool, ToolHandler, ToolRegistry, create_tool_registry, handler_fn, make_tool};
