use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::chat::{ChatMode, ChatRole, HistoryMessage, ToolInvocationResult};

pub const DEFAULT_SESSION_TITLE: &str = "New chat";
const TITLE_PREVIEW_CHARS: usize = 30;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: SessionId,
    pub user_id: String,
    pub organization_id: String,
    pub title: Option<String>,
    pub mode: ChatMode,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(
        user_id: impl Into<String>,
        organization_id: impl Into<String>,
        mode: ChatMode,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::generate(),
            user_id: user_id.into(),
            organization_id: organization_id.into(),
            title: None,
            mode,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_SESSION_TITLE)
    }

    pub fn is_owned_by(&self, user_id: &str, organization_id: &str) -> bool {
        self.user_id == user_id && self.organization_id == organization_id
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub session_id: SessionId,
    pub role: ChatRole,
    pub content: String,
    pub tool_results: Option<Vec<ToolInvocationResult>>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(session_id: SessionId, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            session_id,
            role: ChatRole::User,
            content: content.into(),
            tool_results: None,
            created_at: Utc::now(),
        }
    }

    /// Empty result lists are stored as `None`.
    pub fn assistant(
        session_id: SessionId,
        content: impl Into<String>,
        tool_results: Vec<ToolInvocationResult>,
    ) -> Self {
        Self {
            id: MessageId::generate(),
            session_id,
            role: ChatRole::Assistant,
            content: content.into(),
            tool_results: (!tool_results.is_empty()).then_some(tool_results),
            created_at: Utc::now(),
        }
    }

    pub fn to_history(&self) -> HistoryMessage {
        HistoryMessage { role: self.role, content: self.content.clone() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session: ChatSession,
    pub message_count: u64,
}

/// Title for a session derived from its first user message.
pub fn title_from_message(message: &str) -> String {
    if message.chars().count() > TITLE_PREVIEW_CHARS {
        let preview: String = message.chars().take(TITLE_PREVIEW_CHARS).collect();
        format!("{preview}...")
    } else {
        message.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{title_from_message, ChatMessage, ChatSession, SessionId, DEFAULT_SESSION_TITLE};
    use crate::domain::chat::ChatMode;

    #[test]
    fn short_messages_become_the_title_verbatim() {
        assert_eq!(title_from_message("list customers"), "list customers");
    }

    #[test]
    fn long_messages_are_truncated_on_char_boundaries() {
        let message = "顧客を作成してください。メールアドレスは taro@example.com です";
        let title = title_from_message(message);

        assert!(title.ends_with("..."));
        assert_eq!(title.chars().count(), 33);
    }

    #[test]
    fn untitled_session_uses_default_title() {
        let session = ChatSession::new("user-1", "org-1", ChatMode::Simulation);

        assert_eq!(session.display_title(), DEFAULT_SESSION_TITLE);
        assert!(session.is_owned_by("user-1", "org-1"));
        assert!(!session.is_owned_by("user-1", "org-2"));
    }

    #[test]
    fn assistant_message_without_tool_results_stores_none() {
        let message = ChatMessage::assistant(SessionId("S-1".to_string()), "done", Vec::new());

        assert!(message.tool_results.is_none());
        assert_eq!(message.to_history().content, "done");
    }
}
