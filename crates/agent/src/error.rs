use thiserror::Error;

use paydesk_payments::PaymentsError;

/// Failure of a single operation handler. Rendered into the `{error}` outcome
/// the model sees; never escapes the dispatch boundary.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("missing required argument `{0}`")]
    MissingArgument(String),
    #[error("argument `{name}` must be {expected}")]
    InvalidArgument { name: String, expected: &'static str },
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Payments(#[from] PaymentsError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LlmErrorCategory {
    Authentication,
    RateLimited,
    Network,
    ModelNotFound,
    ContentBlocked,
    EmptyResponse,
    InvalidRequest,
    Upstream,
}

impl LlmErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::RateLimited => "rate_limited",
            Self::Network => "network",
            Self::ModelNotFound => "model_not_found",
            Self::ContentBlocked => "content_blocked",
            Self::EmptyResponse => "empty_response",
            Self::InvalidRequest => "invalid_request",
            Self::Upstream => "upstream",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("llm provider rejected the credentials: {0}")]
    Authentication(String),
    #[error("llm provider rate limit or quota exceeded: {0}")]
    RateLimited(String),
    #[error("could not reach the llm provider: {0}")]
    Network(String),
    #[error("model `{model}` is not available: {message}")]
    ModelNotFound { model: String, message: String },
    #[error("response was blocked by the provider safety filter: {0}")]
    ContentBlocked(String),
    #[error("llm provider returned no usable content")]
    EmptyResponse,
    #[error("llm provider rejected the request: {0}")]
    InvalidRequest(String),
    #[error("llm provider error (status {status}): {message}")]
    Upstream { status: u16, message: String },
    #[error("could not decode llm provider response: {0}")]
    Decode(String),
}

impl LlmError {
    pub fn category(&self) -> LlmErrorCategory {
        match self {
            Self::Authentication(_) => LlmErrorCategory::Authentication,
            Self::RateLimited(_) => LlmErrorCategory::RateLimited,
            Self::Network(_) => LlmErrorCategory::Network,
            Self::ModelNotFound { .. } => LlmErrorCategory::ModelNotFound,
            Self::ContentBlocked(_) => LlmErrorCategory::ContentBlocked,
            Self::EmptyResponse => LlmErrorCategory::EmptyResponse,
            Self::InvalidRequest(_) => LlmErrorCategory::InvalidRequest,
            Self::Upstream { .. } | Self::Decode(_) => LlmErrorCategory::Upstream,
        }
    }

    /// Maps an HTTP failure from a provider onto the error taxonomy.
    pub fn from_http_status(status: u16, message: impl Into<String>, model: &str) -> Self {
        let message = message.into();
        let lower = message.to_ascii_lowercase();
        let mentions_model = lower.contains("model")
            && (lower.contains("not found") || lower.contains("invalid") || lower.contains("does not exist"));

        match status {
            401 | 403 => Self::Authentication(message),
            429 => Self::RateLimited(message),
            400 if lower.contains("api key") => Self::Authentication(message),
            400 | 404 if mentions_model => Self::ModelNotFound { model: model.to_string(), message },
            400 | 422 => Self::InvalidRequest(message),
            _ if lower.contains("quota") => Self::RateLimited(message),
            _ => Self::Upstream { status, message },
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

/// Loop-level failure: no progress could be made on this turn.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Provider(#[from] LlmError),
    #[error("invalid chat request: {0}")]
    InvalidRequest(String),
}
