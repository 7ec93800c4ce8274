use std::sync::Arc;

use axum::Router;
use paydesk_agent::{
    build_client, payments_registry, AgentRuntime, AgentSettings, CatalogMismatch, LlmError,
    CATALOG,
};
use paydesk_core::config::{AppConfig, ConfigError, LoadOptions};
use paydesk_db::{connect_with_settings, migrations, DbPool, SqlAuditLog, SqlChatSessionRepository};
use paydesk_payments::{PaymentsError, StripeConnector};
use thiserror::Error;
use tracing::info;

use crate::chat::{self, ChatState};
use crate::health::{self, HealthState};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub chat: ChatState,
    pub health: HealthState,
}

impl Application {
    pub fn router(&self) -> Router {
        Router::new()
            .merge(health::router(self.health.clone()))
            .merge(chat::router(self.chat.clone()))
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("llm client setup failed: {0}")]
    Llm(#[from] LlmError),
    #[error("payments client setup failed: {0}")]
    Payments(#[from] PaymentsError),
    #[error(transparent)]
    Catalog(#[from] CatalogMismatch),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let registry = payments_registry();
    registry.ensure_matches(CATALOG)?;
    let llm = build_client(&config.llm)?;
    let runtime = AgentRuntime::new(
        llm,
        Arc::new(registry),
        AgentSettings { parallel_tool_calls: config.agent.parallel_tool_calls },
    );
    let payments = StripeConnector::new((&config.payments).into())?;
    info!(
        event_name = "system.bootstrap.agent_ready",
        correlation_id = "bootstrap",
        llm_provider = config.llm.provider.as_str(),
        llm_model = %config.llm.model,
        tools = CATALOG.len(),
        payments_key_configured = config.payments.secret_key.is_some(),
        "agent runtime initialized"
    );

    let chat = ChatState {
        sessions: Arc::new(SqlChatSessionRepository::new(db_pool.clone())),
        audit: Arc::new(SqlAuditLog::new(db_pool.clone())),
        runtime: Arc::new(runtime),
        payments: Arc::new(payments),
        payments_key: config.payments.secret_key.clone(),
        dashboard_base_url: config.payments.dashboard_base_url.clone(),
        default_currency: config.agent.default_currency.clone(),
    };
    let health = HealthState {
        db_pool: db_pool.clone(),
        llm_provider: config.llm.provider.as_str(),
        llm_model: config.llm.model.clone(),
        payments_key_configured: config.payments.secret_key.is_some(),
    };

    Ok(Application { config, db_pool, chat, health })
}
