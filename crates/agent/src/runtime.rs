//! The conversation loop.
//!
//! Each round asks the model for a reply; tool requests are dispatched and
//! their results folded back into the transcript until the model answers in
//! plain text or [`MAX_ITERATIONS`] rounds have run.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use paydesk_core::domain::chat::{ChatMode, HistoryMessage, ToolInvocationResult, ToolOutcome};

use crate::catalog::{ToolDefinition, CATALOG};
use crate::conversation::{initial_transcript, ToolCallRequest, ToolResponse, Turn};
use crate::error::AgentError;
use crate::llm::{GenerateRequest, LlmClient};
use crate::mode::instructions_for;
use crate::tools::{ToolContext, ToolRegistry};

pub const MAX_ITERATIONS: usize = 10;
pub const FALLBACK_RESPONSE: &str = "An error occurred.";
pub const ITERATION_LIMIT_RESPONSE: &str =
    "The request is too complex to finish; please be more specific.";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AgentSettings {
    /// Run the requests of one round concurrently. Result order is unchanged.
    pub parallel_tool_calls: bool,
}

pub struct ChatRequest {
    pub history: Vec<HistoryMessage>,
    pub message: String,
    pub mode: ChatMode,
    pub tools: ToolContext,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    Answered,
    IterationLimit,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatOutcome {
    pub content: String,
    pub tool_results: Vec<ToolInvocationResult>,
    pub rounds: usize,
    pub termination: Termination,
}

pub struct AgentRuntime {
    llm: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
    catalog: &'static [ToolDefinition],
    settings: AgentSettings,
}

impl AgentRuntime {
    pub fn new(llm: Arc<dyn LlmClient>, registry: Arc<ToolRegistry>, settings: AgentSettings) -> Self {
        Self { llm, registry, catalog: CATALOG, settings }
    }

    pub fn llm(&self) -> &dyn LlmClient {
        self.llm.as_ref()
    }

    pub async fn run(&self, request: ChatRequest) -> Result<ChatOutcome, AgentError> {
        if request.message.trim().is_empty() {
            return Err(AgentError::InvalidRequest("message must not be empty".to_string()));
        }

        let instructions = instructions_for(request.mode, &request.tools.default_currency);
        let mut transcript = initial_transcript(&request.history, &request.message);
        let mut tool_results = Vec::new();

        for round in 1..=MAX_ITERATIONS {
            let response = self
                .llm
                .generate(GenerateRequest {
                    instructions: &instructions,
                    transcript: &transcript,
                    tools: self.catalog,
                })
                .await
                .inspect_err(|error| {
                    warn!(
                        event_name = "agent.runtime.provider_failed",
                        provider = self.llm.provider_name(),
                        category = error.category().as_str(),
                        round,
                        error = %error,
                        "llm provider call failed"
                    );
                })?;

            if response.tool_calls.is_empty() {
                let content = if response.text.trim().is_empty() {
                    FALLBACK_RESPONSE.to_string()
                } else {
                    response.text.clone()
                };
                transcript.push(response.into_turn());
                info!(
                    event_name = "agent.runtime.answered",
                    round,
                    tool_results = tool_results.len(),
                    "conversation loop finished"
                );
                return Ok(ChatOutcome {
                    content,
                    tool_results,
                    rounds: round,
                    termination: Termination::Answered,
                });
            }

            let calls = response.tool_calls.clone();
            transcript.push(response.into_turn());
            debug!(
                event_name = "agent.runtime.dispatching",
                round,
                requested = calls.len(),
                "dispatching tool calls"
            );

            let outcomes = self.dispatch(&request.tools, &calls).await;
            let mut responses = Vec::with_capacity(calls.len());
            for (call, outcome) in calls.into_iter().zip(outcomes) {
                responses.push(ToolResponse {
                    call_id: call.id,
                    name: call.name.clone(),
                    result: outcome.to_value(),
                });
                tool_results.push(ToolInvocationResult::new(call.name, call.arguments, outcome));
            }
            transcript.push(Turn::ToolResults(responses));
        }

        warn!(
            event_name = "agent.runtime.iteration_limit",
            rounds = MAX_ITERATIONS,
            tool_results = tool_results.len(),
            "conversation loop hit the iteration ceiling"
        );
        Ok(ChatOutcome {
            content: ITERATION_LIMIT_RESPONSE.to_string(),
            tool_results,
            rounds: MAX_ITERATIONS,
            termination: Termination::IterationLimit,
        })
    }

    /// One outcome per call, in call order.
    async fn dispatch(&self, ctx: &ToolContext, calls: &[ToolCallRequest]) -> Vec<ToolOutcome> {
        if self.settings.parallel_tool_calls {
            return join_all(
                calls.iter().map(|call| self.registry.invoke(ctx, &call.name, &call.arguments)),
            )
            .await;
        }

        let mut outcomes = Vec::with_capacity(calls.len());
        for call in calls {
            outcomes.push(self.registry.invoke(ctx, &call.name, &call.arguments).await);
        }
        outcomes
    }
}
