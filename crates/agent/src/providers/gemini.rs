//! Gemini `generateContent` adapter.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::error_message;
use crate::catalog::ToolDefinition;
use crate::conversation::{ToolCallRequest, Turn};
use crate::error::LlmError;
use crate::llm::{GenerateRequest, LlmClient, ModelResponse};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: SecretString,
}

impl GeminiClient {
    pub fn new(http: Client, base_url: Option<&str>, model: &str, api_key: SecretString) -> Self {
        Self {
            http,
            base_url: base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn provider_name(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerateRequest<'_>) -> Result<ModelResponse, LlmError> {
        let body = build_request(&request);
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            warn!(
                event_name = "agent.llm.gemini.http_error",
                status = status.as_u16(),
                model = %self.model,
                "gemini request failed"
            );
            return Err(LlmError::from_http_status(
                status.as_u16(),
                error_message(&text),
                &self.model,
            ));
        }

        let payload: Value =
            serde_json::from_str(&text).map_err(|error| LlmError::Decode(error.to_string()))?;
        let parsed = parse_response(&payload)?;
        debug!(
            event_name = "agent.llm.gemini.response",
            tool_calls = parsed.tool_calls.len(),
            "gemini response received"
        );
        Ok(parsed)
    }
}

fn function_declarations(tools: &[ToolDefinition]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.parameters_schema(),
            })
        })
        .collect()
}

fn content(turn: &Turn) -> Value {
    match turn {
        Turn::User(text) => json!({"role": "user", "parts": [{"text": text}]}),
        Turn::Model { raw: Some(parts), .. } => json!({"role": "model", "parts": parts}),
        Turn::Model { text, tool_calls, raw: None } => {
            let mut parts = Vec::new();
            if !text.is_empty() {
                parts.push(json!({"text": text}));
            }
            parts.extend(tool_calls.iter().map(|call| {
                json!({"functionCall": {"name": call.name, "args": call.arguments}})
            }));
            json!({"role": "model", "parts": parts})
        }
        Turn::ToolResults(results) => {
            let parts: Vec<Value> = results
                .iter()
                .map(|result| {
                    json!({"functionResponse": {"name": result.name, "response": result.result}})
                })
                .collect();
            json!({"role": "user", "parts": parts})
        }
    }
}

pub(crate) fn build_request(request: &GenerateRequest<'_>) -> Value {
    let mut body = json!({
        "contents": request.transcript.iter().map(content).collect::<Vec<_>>(),
    });
    if !request.instructions.is_empty() {
        body["systemInstruction"] = json!({"parts": [{"text": request.instructions}]});
    }
    if !request.tools.is_empty() {
        body["tools"] = json!([{"functionDeclarations": function_declarations(request.tools)}]);
    }
    body
}

pub(crate) fn parse_response(payload: &Value) -> Result<ModelResponse, LlmError> {
    if let Some(reason) = payload.pointer("/promptFeedback/blockReason").and_then(Value::as_str) {
        return Err(LlmError::ContentBlocked(reason.to_string()));
    }

    let Some(candidate) = payload
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
    else {
        return Err(LlmError::EmptyResponse);
    };

    let finish_reason = candidate.get("finishReason").and_then(Value::as_str);
    let content = candidate.get("content").filter(|content| content.is_object());
    let parts =
        content.and_then(|content| content.get("parts")).and_then(Value::as_array).cloned().unwrap_or_default();

    if parts.is_empty() && matches!(finish_reason, Some("SAFETY" | "PROHIBITED_CONTENT")) {
        return Err(LlmError::ContentBlocked(finish_reason.unwrap_or_default().to_string()));
    }
    // MAX_TOKENS, RECITATION and OTHER can end a candidate without any content.
    if content.is_none() {
        return Err(LlmError::EmptyResponse);
    }

    let mut text = String::new();
    let mut tool_calls = Vec::new();
    for (index, part) in parts.iter().enumerate() {
        if let Some(fragment) = part.get("text").and_then(Value::as_str) {
            text.push_str(fragment);
        }
        if let Some(call) = part.get("functionCall") {
            let name = call.get("name").and_then(Value::as_str).unwrap_or_default();
            let arguments: Map<String, Value> =
                call.get("args").and_then(Value::as_object).cloned().unwrap_or_default();
            let id = call
                .get("id")
                .and_then(Value::as_str)
                .map_or_else(|| format!("call_{index}"), str::to_string);
            tool_calls.push(ToolCallRequest::new(id, name, arguments));
        }
    }

    Ok(ModelResponse { text, tool_calls, raw: Some(Value::Array(parts)) })
}
