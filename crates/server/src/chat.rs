//! Chat endpoints.
//!
//! - `POST   /api/chat`                   run one conversation turn
//! - `GET    /api/chat/sessions`          list the actor's sessions
//! - `POST   /api/chat/sessions`          create a session
//! - `GET    /api/chat/sessions/{id}`     session with its messages
//! - `PATCH  /api/chat/sessions/{id}`     rename
//! - `DELETE /api/chat/sessions/{id}`     delete with its messages
//! - `GET    /api/settings/payments-key`  whether a payments key is configured
//!
//! Identity is established upstream; requests carry it in the
//! `x-paydesk-user` and `x-paydesk-organization` headers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, SecondsFormat, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use paydesk_agent::{AgentRuntime, ChatRequest, ToolContext};
use paydesk_core::audit::{AuditContext, AuditRecord, AuditSink};
use paydesk_core::domain::chat::{ChatMode, ToolInvocationResult};
use paydesk_core::domain::session::{title_from_message, ChatMessage, ChatSession, SessionId};
use paydesk_core::errors::ApplicationError;
use paydesk_db::ChatSessionRepository;
use paydesk_payments::{mask_secret, PaymentsConnector};

use crate::error::ApiError;

pub const USER_HEADER: &str = "x-paydesk-user";
pub const ORGANIZATION_HEADER: &str = "x-paydesk-organization";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_MESSAGE_CHARS: usize = 10_000;
const MAX_TITLE_CHARS: usize = 100;

#[derive(Clone)]
pub struct ChatState {
    pub sessions: Arc<dyn ChatSessionRepository>,
    pub audit: Arc<dyn AuditSink>,
    pub runtime: Arc<AgentRuntime>,
    pub payments: Arc<dyn PaymentsConnector>,
    pub payments_key: Option<SecretString>,
    pub dashboard_base_url: String,
    pub default_currency: String,
}

pub fn router(state: ChatState) -> Router {
    Router::new()
        .route("/api/chat", post(send_message))
        .route("/api/chat/sessions", get(list_sessions).post(create_session))
        .route(
            "/api/chat/sessions/{id}",
            get(get_session).patch(rename_session).delete(delete_session),
        )
        .route("/api/settings/payments-key", get(payments_key_status))
        .with_state(state)
}

/// The authenticated caller plus the request's correlation id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub organization_id: String,
    pub correlation_id: String,
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let correlation_id = header(REQUEST_ID_HEADER).unwrap_or_else(|| Uuid::new_v4().to_string());
        match (header(USER_HEADER), header(ORGANIZATION_HEADER)) {
            (Some(user_id), Some(organization_id)) => {
                Ok(Self { user_id, organization_id, correlation_id })
            }
            _ => Err(ApiError::unauthorized(&correlation_id)),
        }
    }
}

fn iso(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_mode(raw: &str, correlation_id: &str) -> Result<ChatMode, ApiError> {
    raw.parse::<ChatMode>()
        .map_err(|error| ApplicationError::from(error).into_interface(correlation_id).into())
}

async fn owned_session(
    state: &ChatState,
    actor: &Actor,
    id: &str,
) -> Result<ChatSession, ApiError> {
    state
        .sessions
        .find_session(&SessionId(id.to_string()))
        .await
        .map_err(|error| ApiError::repository(error, &actor.correlation_id))?
        .filter(|session| session.is_owned_by(&actor.user_id, &actor.organization_id))
        .ok_or_else(|| ApiError::session_not_found(&actor.correlation_id))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageBody {
    pub session_id: String,
    pub message: String,
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub content: String,
    pub tool_results: Vec<ToolInvocationResult>,
}

pub async fn send_message(
    State(state): State<ChatState>,
    actor: Actor,
    Json(body): Json<SendMessageBody>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let correlation_id = actor.correlation_id.as_str();

    let length = body.message.chars().count();
    if body.message.trim().is_empty() || length > MAX_MESSAGE_CHARS {
        return Err(ApiError::bad_request(
            format!("message must be between 1 and {MAX_MESSAGE_CHARS} characters"),
            correlation_id,
        ));
    }
    let requested_mode = body.mode.as_deref().map(|raw| parse_mode(raw, correlation_id)).transpose()?;

    // Any member of the organization may continue one of its sessions.
    let mut session = state
        .sessions
        .find_session(&SessionId(body.session_id.clone()))
        .await
        .map_err(|error| ApiError::repository(error, correlation_id))?
        .filter(|session| session.organization_id == actor.organization_id)
        .ok_or_else(|| ApiError::session_not_found(correlation_id))?;

    let Some(secret_key) = state.payments_key.as_ref() else {
        return Err(ApiError::bad_request("No payments secret key is configured.", correlation_id)
            .with_hint("Set payments.secret_key or PAYDESK_PAYMENTS_SECRET_KEY to a sk_test_ key."));
    };

    let mode = requested_mode.unwrap_or(session.mode);
    let prior = state
        .sessions
        .list_messages(&session.id)
        .await
        .map_err(|error| ApiError::repository(error, correlation_id))?;

    state
        .sessions
        .append_message(ChatMessage::user(session.id.clone(), body.message.clone()))
        .await
        .map_err(|error| ApiError::repository(error, correlation_id))?;

    info!(
        event_name = "server.chat.turn_started",
        correlation_id,
        session_id = %session.id.0,
        mode = mode.as_str(),
        history = prior.len(),
        "running conversation turn"
    );

    let tools = ToolContext::new(
        state.payments.connect(secret_key),
        state.dashboard_base_url.clone(),
        state.default_currency.clone(),
    );
    let outcome = state
        .runtime
        .run(ChatRequest {
            history: prior.iter().map(ChatMessage::to_history).collect(),
            message: body.message.clone(),
            mode,
            tools,
        })
        .await
        .map_err(|error| {
            let llm = state.runtime.llm();
            ApiError::agent(&error, llm.provider_name(), llm.model(), correlation_id)
        })?;

    state
        .sessions
        .append_message(ChatMessage::assistant(
            session.id.clone(),
            outcome.content.clone(),
            outcome.tool_results.clone(),
        ))
        .await
        .map_err(|error| ApiError::repository(error, correlation_id))?;

    let first_message = prior.is_empty() && session.title.is_none();
    if first_message || session.mode != mode {
        if first_message {
            session.title = Some(title_from_message(&body.message));
        }
        session.mode = mode;
        session.updated_at = Utc::now();
        state
            .sessions
            .save_session(session.clone())
            .await
            .map_err(|error| ApiError::repository(error, correlation_id))?;
    }

    let audit_context = AuditContext::new(
        actor.user_id.clone(),
        actor.organization_id.clone(),
        Some(session.id.clone()),
        correlation_id,
    );
    for result in &outcome.tool_results {
        if let Err(error) = state.audit.emit(AuditRecord::for_tool_result(&audit_context, result)).await {
            warn!(
                event_name = "server.chat.audit_failed",
                correlation_id,
                action = %result.name,
                error = %error,
                "failed to record audit entry"
            );
        }
    }

    info!(
        event_name = "server.chat.turn_finished",
        correlation_id,
        session_id = %session.id.0,
        rounds = outcome.rounds,
        tool_results = outcome.tool_results.len(),
        "conversation turn finished"
    );

    Ok(Json(SendMessageResponse { content: outcome.content, tool_results: outcome.tool_results }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionListItem {
    pub id: String,
    pub title: String,
    pub mode: ChatMode,
    pub message_count: u64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct SessionList {
    pub sessions: Vec<SessionListItem>,
}

pub async fn list_sessions(
    State(state): State<ChatState>,
    actor: Actor,
) -> Result<Json<SessionList>, ApiError> {
    let summaries = state
        .sessions
        .list_sessions(&actor.user_id, &actor.organization_id)
        .await
        .map_err(|error| ApiError::repository(error, &actor.correlation_id))?;

    let sessions = summaries
        .into_iter()
        .map(|summary| SessionListItem {
            id: summary.session.id.0.clone(),
            title: summary.session.display_title().to_string(),
            mode: summary.session.mode,
            message_count: summary.message_count,
            created_at: iso(&summary.session.created_at),
            updated_at: iso(&summary.session.updated_at),
        })
        .collect();

    Ok(Json(SessionList { sessions }))
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionBody {
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSession {
    pub id: String,
    pub mode: ChatMode,
    pub created_at: String,
}

/// The body is optional; an empty one creates a simulation session.
pub async fn create_session(
    State(state): State<ChatState>,
    actor: Actor,
    body: Bytes,
) -> Result<Json<CreatedSession>, ApiError> {
    let correlation_id = actor.correlation_id.as_str();
    let request: CreateSessionBody = if body.iter().all(u8::is_ascii_whitespace) {
        CreateSessionBody::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|error| ApiError::bad_request(format!("invalid request body: {error}"), correlation_id))?
    };
    let mode = request.mode.as_deref().map(|raw| parse_mode(raw, correlation_id)).transpose()?;

    let session = ChatSession::new(
        actor.user_id.clone(),
        actor.organization_id.clone(),
        mode.unwrap_or_default(),
    );
    state
        .sessions
        .save_session(session.clone())
        .await
        .map_err(|error| ApiError::repository(error, correlation_id))?;

    info!(
        event_name = "server.chat.session_created",
        correlation_id,
        session_id = %session.id.0,
        mode = session.mode.as_str(),
        "chat session created"
    );

    Ok(Json(CreatedSession {
        id: session.id.0,
        mode: session.mode,
        created_at: iso(&session.created_at),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: String,
    pub role: &'static str,
    pub content: String,
    pub tool_results: Option<Vec<ToolInvocationResult>>,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: String,
    pub title: String,
    pub mode: ChatMode,
    pub created_at: String,
    pub updated_at: String,
    pub messages: Vec<MessageView>,
}

pub async fn get_session(
    State(state): State<ChatState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let session = owned_session(&state, &actor, &id).await?;
    let messages = state
        .sessions
        .list_messages(&session.id)
        .await
        .map_err(|error| ApiError::repository(error, &actor.correlation_id))?;

    Ok(Json(SessionView {
        id: session.id.0.clone(),
        title: session.display_title().to_string(),
        mode: session.mode,
        created_at: iso(&session.created_at),
        updated_at: iso(&session.updated_at),
        messages: messages
            .into_iter()
            .map(|message| MessageView {
                id: message.id.0,
                role: message.role.as_str(),
                content: message.content,
                tool_results: message.tool_results,
                created_at: iso(&message.created_at),
            })
            .collect(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct RenameSessionBody {
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RenamedSession {
    pub id: String,
    pub title: Option<String>,
    pub success: bool,
}

pub async fn rename_session(
    State(state): State<ChatState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(body): Json<RenameSessionBody>,
) -> Result<Json<RenamedSession>, ApiError> {
    let correlation_id = actor.correlation_id.as_str();
    if let Some(title) = &body.title {
        let length = title.chars().count();
        if title.trim().is_empty() || length > MAX_TITLE_CHARS {
            return Err(ApiError::bad_request(
                format!("title must be between 1 and {MAX_TITLE_CHARS} characters"),
                correlation_id,
            ));
        }
    }

    let mut session = owned_session(&state, &actor, &id).await?;
    if let Some(title) = body.title {
        session.title = Some(title);
        session.updated_at = Utc::now();
        state
            .sessions
            .save_session(session.clone())
            .await
            .map_err(|error| ApiError::repository(error, correlation_id))?;
    }

    Ok(Json(RenamedSession { id: session.id.0, title: session.title, success: true }))
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub success: bool,
}

pub async fn delete_session(
    State(state): State<ChatState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    let session = owned_session(&state, &actor, &id).await?;
    let deleted = state
        .sessions
        .delete_session(&session.id)
        .await
        .map_err(|error| ApiError::repository(error, &actor.correlation_id))?;

    info!(
        event_name = "server.chat.session_deleted",
        correlation_id = %actor.correlation_id,
        session_id = %session.id.0,
        deleted,
        "chat session deleted"
    );

    Ok(Json(Deleted { success: deleted }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentsKeyStatus {
    pub has_key: bool,
    pub key_preview: Option<String>,
}

pub async fn payments_key_status(
    State(state): State<ChatState>,
    _actor: Actor,
) -> Json<PaymentsKeyStatus> {
    Json(PaymentsKeyStatus {
        has_key: state.payments_key.is_some(),
        key_preview: state.payments_key.as_ref().map(mask_secret),
    })
}
