use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use paydesk_core::domain::session::{ChatMessage, ChatSession, SessionId, SessionSummary};

use super::{ChatSessionRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryChatSessionRepository {
    sessions: RwLock<HashMap<String, ChatSession>>,
    messages: RwLock<HashMap<String, Vec<ChatMessage>>>,
}

#[async_trait::async_trait]
impl ChatSessionRepository for InMemoryChatSessionRepository {
    async fn save_session(&self, session: ChatSession) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id.0.clone(), session);
        Ok(())
    }

    async fn find_session(&self, id: &SessionId) -> Result<Option<ChatSession>, RepositoryError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&id.0).cloned())
    }

    async fn list_sessions(
        &self,
        user_id: &str,
        organization_id: &str,
    ) -> Result<Vec<SessionSummary>, RepositoryError> {
        let sessions = self.sessions.read().await;
        let messages = self.messages.read().await;

        let mut summaries: Vec<SessionSummary> = sessions
            .values()
            .filter(|session| session.is_owned_by(user_id, organization_id))
            .map(|session| SessionSummary {
                session: session.clone(),
                message_count: messages.get(&session.id.0).map_or(0, |list| list.len() as u64),
            })
            .collect();
        summaries.sort_by(|a, b| b.session.updated_at.cmp(&a.session.updated_at));
        Ok(summaries)
    }

    async fn delete_session(&self, id: &SessionId) -> Result<bool, RepositoryError> {
        let removed = self.sessions.write().await.remove(&id.0).is_some();
        self.messages.write().await.remove(&id.0);
        Ok(removed)
    }

    async fn append_message(&self, message: ChatMessage) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(&message.session_id.0) else {
            return Err(RepositoryError::UnknownSession(message.session_id.0));
        };
        session.updated_at = Utc::now();

        let mut messages = self.messages.write().await;
        messages.entry(message.session_id.0.clone()).or_default().push(message);
        Ok(())
    }

    async fn list_messages(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let messages = self.messages.read().await;
        Ok(messages.get(&session_id.0).cloned().unwrap_or_default())
    }
}
