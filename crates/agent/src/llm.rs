use async_trait::async_trait;
use serde_json::Value;

use crate::catalog::ToolDefinition;
use crate::conversation::{ToolCallRequest, Turn};
use crate::error::LlmError;

/// Everything a provider sees on one round.
#[derive(Clone, Copy, Debug)]
pub struct GenerateRequest<'a> {
    pub instructions: &'a str,
    pub transcript: &'a [Turn],
    pub tools: &'a [ToolDefinition],
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelResponse {
    pub text: String,
    pub tool_calls: Vec<ToolCallRequest>,
    pub raw: Option<Value>,
}

impl ModelResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Self::default() }
    }

    pub fn tool_calls(tool_calls: Vec<ToolCallRequest>) -> Self {
        Self { tool_calls, ..Self::default() }
    }

    pub fn into_turn(self) -> Turn {
        Turn::Model { text: self.text, tool_calls: self.tool_calls, raw: self.raw }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    fn provider_name(&self) -> &'static str;
    fn model(&self) -> &str;
    async fn generate(&self, request: GenerateRequest<'_>) -> Result<ModelResponse, LlmError>;
}
