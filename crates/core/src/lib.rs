pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;

pub use audit::{AuditContext, AuditOutcome, AuditRecord, AuditSink, InMemoryAuditSink};
pub use domain::chat::{
    ChatMode, ChatRole, HistoryMessage, ResourceType, ToolInvocationResult, ToolOutcome,
};
pub use domain::session::{ChatMessage, ChatSession, MessageId, SessionId, SessionSummary};
pub use errors::{ApplicationError, DomainError, InterfaceError};
