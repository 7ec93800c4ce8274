//! OpenAI-compatible Chat Completions adapter.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::error_message;
use crate::conversation::{ToolCallRequest, Turn};
use crate::error::LlmError;
use crate::llm::{GenerateRequest, LlmClient, ModelResponse};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: SecretString,
}

impl OpenAiClient {
    pub fn new(http: Client, base_url: Option<&str>, model: &str, api_key: SecretString) -> Self {
        Self {
            http,
            base_url: base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerateRequest<'_>) -> Result<ModelResponse, LlmError> {
        let body = build_request(&self.model, &request);
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            warn!(
                event_name = "agent.llm.openai.http_error",
                status = status.as_u16(),
                model = %self.model,
                "chat completion request failed"
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
            event_name = "agent.llm.openai.response",
            tool_calls = parsed.tool_calls.len(),
            "chat completion received"
        );
        Ok(parsed)
    }
}

fn push_messages(turn: &Turn, messages: &mut Vec<Value>) {
    match turn {
        Turn::User(text) => messages.push(json!({"role": "user", "content": text})),
        Turn::Model { text, tool_calls, .. } => {
            let content = if text.is_empty() { Value::Null } else { json!(text) };
            let mut message = json!({"role": "assistant", "content": content});
            if !tool_calls.is_empty() {
                message["tool_calls"] = tool_calls
                    .iter()
                    .map(|call| {
                        json!({
                            "id": call.id,
                            "type": "function",
                            "function": {
                                "name": call.name,
                                "arguments": Value::Object(call.arguments.clone()).to_string(),
                            },
                        })
                    })
                    .collect();
            }
            messages.push(message);
        }
        Turn::ToolResults(results) => {
            messages.extend(results.iter().map(|result| {
                json!({
                    "role": "tool",
                    "tool_call_id": result.call_id,
                    "content": result.result.to_string(),
                })
            }));
        }
    }
}

pub(crate) fn build_request(model: &str, request: &GenerateRequest<'_>) -> Value {
    let mut messages = Vec::with_capacity(request.transcript.len() + 1);
    if !request.instructions.is_empty() {
        messages.push(json!({"role": "system", "content": request.instructions}));
    }
    for turn in request.transcript {
        push_messages(turn, &mut messages);
    }

    let mut body = json!({"model": model, "messages": messages});
    if !request.tools.is_empty() {
        body["tools"] = request
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters_schema(),
                    },
                })
            })
            .collect();
    }
    body
}

pub(crate) fn parse_response(payload: &Value) -> Result<ModelResponse, LlmError> {
    let Some(choice) = payload
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
    else {
        return Err(LlmError::EmptyResponse);
    };

    if choice.get("finish_reason").and_then(Value::as_str) == Some("content_filter") {
        return Err(LlmError::ContentBlocked("content_filter".to_string()));
    }

    let Some(message) = choice.get("message").filter(|message| message.is_object()) else {
        return Err(LlmError::EmptyResponse);
    };
    let text = message.get("content").and_then(Value::as_str).unwrap_or_default().to_string();

    let tool_calls = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(|calls| calls.iter().enumerate().map(|(index, call)| tool_call(index, call)).collect())
        .unwrap_or_default();

    Ok(ModelResponse { text, tool_calls, raw: None })
}

fn tool_call(index: usize, call: &Value) -> ToolCallRequest {
    let id = call
        .get("id")
        .and_then(Value::as_str)
        .map_or_else(|| format!("call_{index}"), str::to_string);
    let name = call.pointer("/function/name").and_then(Value::as_str).unwrap_or_default();

    // Arguments arrive as a JSON-encoded string; anything unparseable reaches
    // the handler as an empty map and fails its own validation.
    let arguments = match call.pointer("/function/arguments") {
        Some(Value::String(encoded)) => serde_json::from_str::<Map<String, Value>>(encoded)
            .unwrap_or_else(|error| {
                warn!(
                    event_name = "agent.llm.openai.bad_arguments",
                    tool_name = name,
                    error = %error,
                    "tool call arguments are not a JSON object"
                );
                Map::new()
            }),
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };

    ToolCallRequest::new(id, name, arguments)
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map};

    use super::{build_request, parse_response};
    use crate::conversation::{ToolCallRequest, ToolResponse, Turn};
    use crate::error::LlmError;
    use crate::llm::GenerateRequest;

    #[test]
    fn tool_rounds_round_trip_through_messages() {
        let mut arguments = Map::new();
        arguments.insert("email".to_string(), json!("taro@example.com"));
        let transcript = vec![
            Turn::User("create taro".to_string()),
            Turn::Model {
                text: String::new(),
                tool_calls: vec![ToolCallRequest::new("call_abc", "createCustomer", arguments)],
                raw: None,
            },
            Turn::ToolResults(vec![ToolResponse {
                call_id: "call_abc".to_string(),
                name: "createCustomer".to_string(),
                result: json!({"id": "cus_123"}),
            }]),
        ];

        let body = build_request(
            "gpt-4o-mini",
            &GenerateRequest { instructions: "system text", transcript: &transcript, tools: &[] },
        );

        let messages = body["messages"].as_array().cloned().unwrap_or_default();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0], json!({"role": "system", "content": "system text"}));
        assert_eq!(messages[2]["content"], serde_json::Value::Null);
        assert_eq!(messages[2]["tool_calls"][0]["function"]["arguments"], r#"{"email":"taro@example.com"}"#);
        assert_eq!(
            messages[3],
            json!({"role": "tool", "tool_call_id": "call_abc", "content": r#"{"id":"cus_123"}"#})
        );
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn tool_calls_are_decoded_from_string_arguments() {
        let payload = json!({"choices": [{"message": {"role": "assistant", "content": null,
            "tool_calls": [
                {"id": "call_1", "type": "function", "function": {"name": "getCustomer", "arguments": "{\"customerId\":\"cus_1\"}"}},
                {"id": "call_2", "type": "function", "function": {"name": "listCoupons", "arguments": "not json"}}
            ]}, "finish_reason": "tool_calls"}]});

        let response = parse_response(&payload).expect("parse");

        assert_eq!(response.text, "");
        assert_eq!(response.tool_calls.len(), 2);
        assert_eq!(response.tool_calls[0].arguments.get("customerId"), Some(&json!("cus_1")));
        assert!(response.tool_calls[1].arguments.is_empty());
    }

    #[test]
    fn missing_choices_and_filtered_content_are_errors() {
        assert_eq!(parse_response(&json!({"choices": []})), Err(LlmError::EmptyResponse));

        let filtered = json!({"choices": [{"message": {"content": null}, "finish_reason": "content_filter"}]});
        assert!(matches!(parse_response(&filtered), Err(LlmError::ContentBlocked(_))));
    }

    #[test]
    fn choice_without_message_is_an_empty_response() {
        let truncated = json!({"choices": [{"finish_reason": "length"}]});
        assert_eq!(parse_response(&truncated), Err(LlmError::EmptyResponse));

        let null_content = json!({"choices": [{"message": {"role": "assistant", "content": null}}]});
        let response = parse_response(&null_content).expect("parse");
        assert!(response.text.is_empty());
        assert!(response.tool_calls.is_empty());
    }
}
