use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use paydesk_agent::{AgentError, LlmError, LlmErrorCategory};
use paydesk_core::errors::{ApplicationError, InterfaceError};
use paydesk_db::RepositoryError;

const GEMINI_MODELS: &str = "gemini-2.5-flash, gemini-2.5-flash-lite, gemini-2.5-pro";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub correlation_id: String,
}

/// JSON error response: a user-facing message, an optional remediation hint
/// and the request's correlation id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>, correlation_id: &str) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.into(),
                hint: None,
                correlation_id: correlation_id.to_string(),
            },
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.body.hint = Some(hint.into());
        self
    }

    pub fn unauthorized(correlation_id: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Authentication is required.", correlation_id)
    }

    pub fn bad_request(message: impl Into<String>, correlation_id: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, correlation_id)
    }

    pub fn session_not_found(correlation_id: &str) -> Self {
        ApplicationError::NotFound("chat session".to_string()).into_interface(correlation_id).into()
    }

    pub fn repository(error: RepositoryError, correlation_id: &str) -> Self {
        error!(
            event_name = "server.chat.repository_failed",
            correlation_id,
            error = %error,
            "chat storage operation failed"
        );
        ApplicationError::Persistence(error.to_string()).into_interface(correlation_id).into()
    }

    /// Maps a loop-level failure to an actionable response.
    pub fn agent(error: &AgentError, provider: &str, model: &str, correlation_id: &str) -> Self {
        let llm = match error {
            AgentError::InvalidRequest(message) => {
                return Self::bad_request(message.clone(), correlation_id)
            }
            AgentError::Provider(llm) => llm,
        };
        llm_error(llm, provider, model, correlation_id)
    }
}

fn llm_error(error: &LlmError, provider: &str, model: &str, correlation_id: &str) -> ApiError {
    let gemini = provider == "gemini";
    match error.category() {
        LlmErrorCategory::Authentication => ApiError::new(
            StatusCode::UNAUTHORIZED,
            "The LLM API key is missing or invalid.",
            correlation_id,
        )
        .with_hint(if gemini {
            "Set GEMINI_API_KEY. Keys are issued at https://aistudio.google.com/apikey."
        } else {
            "Set llm.api_key or PAYDESK_LLM_API_KEY to a valid key."
        }),
        LlmErrorCategory::ModelNotFound => {
            let api_error = ApiError::bad_request(
                format!("The model `{model}` was not found."),
                correlation_id,
            );
            if gemini {
                api_error.with_hint(format!("Valid models: {GEMINI_MODELS}."))
            } else {
                api_error.with_hint("Check llm.model against the models your provider offers.")
            }
        }
        LlmErrorCategory::RateLimited => {
            let api_error = ApiError::new(
                StatusCode::TOO_MANY_REQUESTS,
                "The LLM rate limit was reached. Wait a moment and try again.",
                correlation_id,
            );
            if gemini {
                api_error.with_hint("The Gemini free tier allows 15 requests per minute.")
            } else {
                api_error
            }
        }
        LlmErrorCategory::Network => {
            let api_error = ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "Could not reach the LLM provider. Check the network connection.",
                correlation_id,
            );
            if gemini {
                api_error.with_hint("Service status is published at https://status.cloud.google.com/.")
            } else {
                api_error
            }
        }
        LlmErrorCategory::ContentBlocked => ApiError::bad_request(
            "The content was blocked by the provider's safety filter.",
            correlation_id,
        )
        .with_hint("Try phrasing the request differently."),
        LlmErrorCategory::InvalidRequest => ApiError::bad_request(
            "The LLM provider rejected the request.",
            correlation_id,
        ),
        LlmErrorCategory::EmptyResponse | LlmErrorCategory::Upstream => ApiError::new(
            StatusCode::BAD_GATEWAY,
            "The LLM provider returned an unusable response.",
            correlation_id,
        ),
    }
}

impl From<InterfaceError> for ApiError {
    fn from(error: InterfaceError) -> Self {
        let status = match &error {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, error.user_message(), error.correlation_id())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
