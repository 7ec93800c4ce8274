use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::chat::{ResourceType, ToolInvocationResult};
use crate::domain::session::SessionId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Failed,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

/// Who triggered a loop execution and where; shared by every record the
/// execution produces.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditContext {
    pub actor: String,
    pub organization_id: String,
    pub session_id: Option<SessionId>,
    pub correlation_id: String,
}

impl AuditContext {
    pub fn new(
        actor: impl Into<String>,
        organization_id: impl Into<String>,
        session_id: Option<SessionId>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            actor: actor.into(),
            organization_id: organization_id.into(),
            session_id,
            correlation_id: correlation_id.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub event_id: String,
    pub actor: String,
    pub organization_id: String,
    pub session_id: Option<SessionId>,
    pub correlation_id: String,
    pub action: String,
    pub resource_type: ResourceType,
    pub input: Value,
    pub output: Value,
    pub outcome: AuditOutcome,
    pub occurred_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn for_tool_result(context: &AuditContext, result: &ToolInvocationResult) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            actor: context.actor.clone(),
            organization_id: context.organization_id.clone(),
            session_id: context.session_id.clone(),
            correlation_id: context.correlation_id.clone(),
            action: result.name.clone(),
            resource_type: result.resource_type(),
            input: Value::Object(result.arguments.clone()),
            output: result.outcome.to_value(),
            outcome: if result.succeeded() { AuditOutcome::Success } else { AuditOutcome::Failed },
            occurred_at: Utc::now(),
        }
    }

    pub fn success(&self) -> bool {
        self.outcome == AuditOutcome::Success
    }
}

#[derive(Debug, thiserror::Error)]
#[error("audit sink failure: {0}")]
pub struct AuditSinkError(pub String);

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn emit(&self, record: AuditRecord) -> Result<(), AuditSinkError>;
}

#[derive(Clone, Default)]
pub struct InMemoryAuditSink {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl InMemoryAuditSink {
    pub fn records(&self) -> Vec<AuditRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn emit(&self, record: AuditRecord) -> Result<(), AuditSinkError> {
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map};

    use crate::{
        audit::{AuditContext, AuditOutcome, AuditRecord, AuditSink, InMemoryAuditSink},
        domain::chat::{ResourceType, ToolInvocationResult, ToolOutcome},
        domain::session::SessionId,
    };

    fn context() -> AuditContext {
        AuditContext::new("user-1", "org-1", Some(SessionId("S-1".to_owned())), "req-123")
    }

    #[tokio::test]
    async fn in_memory_sink_records_tool_results_unobscured() {
        let mut arguments = Map::new();
        arguments.insert("email".to_owned(), json!("taro@example.com"));
        let result = ToolInvocationResult::new(
            "createCustomer",
            arguments,
            ToolOutcome::success(json!({"id": "cus_123"})),
        );

        let sink = InMemoryAuditSink::default();
        sink.emit(AuditRecord::for_tool_result(&context(), &result)).await.expect("emit");

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, "createCustomer");
        assert_eq!(records[0].resource_type, ResourceType::Customer);
        assert_eq!(records[0].input, json!({"email": "taro@example.com"}));
        assert_eq!(records[0].output, json!({"id": "cus_123"}));
        assert_eq!(records[0].correlation_id, "req-123");
        assert!(records[0].success());
    }

    #[test]
    fn error_outcomes_are_recorded_as_failed() {
        let result = ToolInvocationResult::new(
            "deleteCoupon",
            Map::new(),
            ToolOutcome::error("No such coupon: 'SUMMER'"),
        );

        let record = AuditRecord::for_tool_result(&context(), &result);

        assert_eq!(record.outcome, AuditOutcome::Failed);
        assert_eq!(record.output, json!({"error": "No such coupon: 'SUMMER'"}));
    }
}
