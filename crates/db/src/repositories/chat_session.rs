use chrono::Utc;
use sqlx::Row;

use paydesk_core::domain::chat::{ChatMode, ChatRole, ToolInvocationResult};
use paydesk_core::domain::session::{
    ChatMessage, ChatSession, MessageId, SessionId, SessionSummary,
};

use super::{format_timestamp, parse_timestamp, ChatSessionRepository, RepositoryError};
use crate::DbPool;

pub struct SqlChatSessionRepository {
    pool: DbPool,
}

impl SqlChatSessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode<T>(result: Result<T, sqlx::Error>) -> Result<T, RepositoryError> {
    result.map_err(|error| RepositoryError::Decode(error.to_string()))
}

fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> Result<ChatSession, RepositoryError> {
    let id: String = decode(row.try_get("id"))?;
    let user_id: String = decode(row.try_get("user_id"))?;
    let organization_id: String = decode(row.try_get("organization_id"))?;
    let title: Option<String> = decode(row.try_get("title"))?;
    let mode: String = decode(row.try_get("mode"))?;
    let created_at: String = decode(row.try_get("created_at"))?;
    let updated_at: String = decode(row.try_get("updated_at"))?;

    Ok(ChatSession {
        id: SessionId(id),
        user_id,
        organization_id,
        title,
        mode: mode
            .parse::<ChatMode>()
            .map_err(|error| RepositoryError::Decode(error.to_string()))?,
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<ChatMessage, RepositoryError> {
    let id: String = decode(row.try_get("id"))?;
    let session_id: String = decode(row.try_get("session_id"))?;
    let role: String = decode(row.try_get("role"))?;
    let content: String = decode(row.try_get("content"))?;
    let tool_results_json: Option<String> = decode(row.try_get("tool_results_json"))?;
    let created_at: String = decode(row.try_get("created_at"))?;

    let tool_results = tool_results_json
        .map(|raw| serde_json::from_str::<Vec<ToolInvocationResult>>(&raw))
        .transpose()
        .map_err(|error| RepositoryError::Decode(format!("tool_results_json: {error}")))?;

    Ok(ChatMessage {
        id: MessageId(id),
        session_id: SessionId(session_id),
        role: role.parse::<ChatRole>().map_err(|error| RepositoryError::Decode(error.to_string()))?,
        content,
        tool_results,
        created_at: parse_timestamp("created_at", &created_at)?,
    })
}

#[async_trait::async_trait]
impl ChatSessionRepository for SqlChatSessionRepository {
    async fn save_session(&self, session: ChatSession) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO chat_session (id, user_id, organization_id, title, mode, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 mode = excluded.mode,
                 updated_at = excluded.updated_at",
        )
        .bind(&session.id.0)
        .bind(&session.user_id)
        .bind(&session.organization_id)
        .bind(&session.title)
        .bind(session.mode.as_str())
        .bind(format_timestamp(&session.created_at))
        .bind(format_timestamp(&session.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_session(&self, id: &SessionId) -> Result<Option<ChatSession>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, user_id, organization_id, title, mode, created_at, updated_at
             FROM chat_session WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_session).transpose()
    }

    async fn list_sessions(
        &self,
        user_id: &str,
        organization_id: &str,
    ) -> Result<Vec<SessionSummary>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT s.id, s.user_id, s.organization_id, s.title, s.mode, s.created_at, s.updated_at,
                    (SELECT COUNT(*) FROM chat_message m WHERE m.session_id = s.id) AS message_count
             FROM chat_session s
             WHERE s.user_id = ? AND s.organization_id = ?
             ORDER BY s.updated_at DESC, s.rowid DESC",
        )
        .bind(user_id)
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let message_count: i64 = decode(row.try_get("message_count"))?;
                Ok(SessionSummary {
                    session: row_to_session(row)?,
                    message_count: u64::try_from(message_count).unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn delete_session(&self, id: &SessionId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM chat_session WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn append_message(&self, message: ChatMessage) -> Result<(), RepositoryError> {
        let tool_results_json = message
            .tool_results
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;

        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query("UPDATE chat_session SET updated_at = ? WHERE id = ?")
            .bind(format_timestamp(&Utc::now()))
            .bind(&message.session_id.0)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Err(RepositoryError::UnknownSession(message.session_id.0));
        }

        sqlx::query(
            "INSERT INTO chat_message (id, session_id, role, content, tool_results_json, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&message.id.0)
        .bind(&message.session_id.0)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(&tool_results_json)
        .bind(format_timestamp(&message.created_at))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_messages(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, session_id, role, content, tool_results_json, created_at
             FROM chat_message WHERE session_id = ?
             ORDER BY created_at ASC, rowid ASC",
        )
        .bind(&session_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_message).collect()
    }
}
