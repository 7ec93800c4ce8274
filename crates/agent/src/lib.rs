//! Tool-calling conversation loop over the payments API.
//!
//! - [`catalog`] declares every operation the model may call.
//! - [`handlers`] implements one handler per declaration; [`tools`] owns the
//!   registry and the fault-isolating dispatch.
//! - [`conversation`] is the provider-neutral transcript and [`providers`]
//!   translate it for Gemini and OpenAI-compatible APIs.
//! - [`mode`] supplies the per-mode system instructions.
//! - [`runtime`] drives the bounded loop.

pub mod catalog;
pub mod conversation;
pub mod error;
pub mod handlers;
pub mod llm;
pub mod mode;
pub mod providers;
pub mod runtime;
pub mod tools;

pub use catalog::{ToolDefinition, CATALOG};
pub use conversation::{ToolCallRequest, ToolResponse, Turn};
pub use error::{AgentError, LlmError, LlmErrorCategory, ToolError};
pub use handlers::payments_registry;
pub use llm::{GenerateRequest, LlmClient, ModelResponse};
pub use mode::instructions_for;
pub use providers::build_client;
pub use runtime::{
    AgentRuntime, AgentSettings, ChatOutcome, ChatRequest, Termination, FALLBACK_RESPONSE,
    ITERATION_LIMIT_RESPONSE, MAX_ITERATIONS,
};
pub use tools::{CatalogMismatch, Tool, ToolContext, ToolRegistry};
