use async_trait::async_trait;
use sqlx::Row;

use paydesk_core::audit::{AuditOutcome, AuditRecord, AuditSink, AuditSinkError};
use paydesk_core::domain::chat::ResourceType;
use paydesk_core::domain::session::SessionId;

use super::{format_timestamp, parse_timestamp, RepositoryError};
use crate::DbPool;

/// Append-only audit trail of tool executions, one row per invocation.
///
/// Rows reference sessions by id only, so they outlive session deletion.
#[derive(Clone)]
pub struct SqlAuditLog {
    pool: DbPool,
}

impl SqlAuditLog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn append(&self, record: &AuditRecord) -> Result<(), RepositoryError> {
        let input_json = serde_json::to_string(&record.input)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;
        let output_json = serde_json::to_string(&record.output)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;

        sqlx::query(
            "INSERT INTO audit_log (event_id, actor, organization_id, session_id, correlation_id,
                                    action, resource_type, input_json, output_json, outcome,
                                    occurred_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.event_id)
        .bind(&record.actor)
        .bind(&record.organization_id)
        .bind(record.session_id.as_ref().map(|id| id.0.as_str()))
        .bind(&record.correlation_id)
        .bind(&record.action)
        .bind(record.resource_type.as_str())
        .bind(input_json)
        .bind(output_json)
        .bind(record.outcome.as_str())
        .bind(format_timestamp(&record.occurred_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_for_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<AuditRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT event_id, actor, organization_id, session_id, correlation_id, action,
                    resource_type, input_json, output_json, outcome, occurred_at
             FROM audit_log WHERE session_id = ?
             ORDER BY occurred_at ASC, rowid ASC",
        )
        .bind(&session_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }

    pub async fn list_recent(
        &self,
        organization_id: &str,
        limit: u32,
    ) -> Result<Vec<AuditRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT event_id, actor, organization_id, session_id, correlation_id, action,
                    resource_type, input_json, output_json, outcome, occurred_at
             FROM audit_log WHERE organization_id = ?
             ORDER BY occurred_at DESC, rowid DESC
             LIMIT ?",
        )
        .bind(organization_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<AuditRecord, RepositoryError> {
    let text = |column: &str| -> Result<String, RepositoryError> {
        row.try_get::<String, _>(column).map_err(|error| RepositoryError::Decode(error.to_string()))
    };
    let json = |column: &str| -> Result<serde_json::Value, RepositoryError> {
        serde_json::from_str(&text(column)?)
            .map_err(|error| RepositoryError::Decode(format!("{column}: {error}")))
    };

    let session_id: Option<String> =
        row.try_get("session_id").map_err(|error| RepositoryError::Decode(error.to_string()))?;
    let outcome = match text("outcome")?.as_str() {
        "success" => AuditOutcome::Success,
        _ => AuditOutcome::Failed,
    };

    Ok(AuditRecord {
        event_id: text("event_id")?,
        actor: text("actor")?,
        organization_id: text("organization_id")?,
        session_id: session_id.map(SessionId),
        correlation_id: text("correlation_id")?,
        action: text("action")?,
        resource_type: ResourceType::from_stored(&text("resource_type")?),
        input: json("input_json")?,
        output: json("output_json")?,
        outcome,
        occurred_at: parse_timestamp("occurred_at", &text("occurred_at")?)?,
    })
}

#[async_trait]
impl AuditSink for SqlAuditLog {
    async fn emit(&self, record: AuditRecord) -> Result<(), AuditSinkError> {
        self.append(&record).await.map_err(|error| AuditSinkError(error.to_string()))
    }
}
