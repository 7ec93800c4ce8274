use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use paydesk_core::domain::session::{ChatMessage, ChatSession, SessionId, SessionSummary};

pub mod audit_log;
pub mod chat_session;
pub mod memory;

pub use audit_log::SqlAuditLog;
pub use chat_session::SqlChatSessionRepository;
pub use memory::InMemoryChatSessionRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("chat session `{0}` does not exist")]
    UnknownSession(String),
}

/// Storage for chat sessions and their ordered message history.
///
/// Ownership is not enforced here; callers compare the session's user and
/// organization against the requesting actor before exposing anything.
#[async_trait]
pub trait ChatSessionRepository: Send + Sync {
    async fn save_session(&self, session: ChatSession) -> Result<(), RepositoryError>;

    async fn find_session(&self, id: &SessionId) -> Result<Option<ChatSession>, RepositoryError>;

    /// Sessions for one actor, most recently updated first.
    async fn list_sessions(
        &self,
        user_id: &str,
        organization_id: &str,
    ) -> Result<Vec<SessionSummary>, RepositoryError>;

    /// Returns `false` when nothing was deleted. Messages go with the session.
    async fn delete_session(&self, id: &SessionId) -> Result<bool, RepositoryError>;

    /// Appends to the session history and bumps the session's `updated_at`.
    async fn append_message(&self, message: ChatMessage) -> Result<(), RepositoryError>;

    /// Messages in the order they were appended.
    async fn list_messages(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<ChatMessage>, RepositoryError>;
}

pub(crate) fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("{column}: {error}")))
}
