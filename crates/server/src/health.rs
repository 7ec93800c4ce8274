use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{SecondsFormat, Utc};
use paydesk_db::DbPool;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    pub db_pool: DbPool,
    pub llm_provider: &'static str,
    pub llm_model: String,
    pub payments_key_configured: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: HealthCheck,
    pub llm: HealthCheck,
    pub payments: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

/// Ready only when the database answers. A missing payments key degrades the
/// report but chat sessions stay browsable, so it does not fail the probe.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let payments = if state.payments_key_configured {
        HealthCheck { status: "ready", detail: "payments secret key configured".to_string() }
    } else {
        HealthCheck { status: "degraded", detail: "payments secret key missing".to_string() }
    };
    let ready = database.status == "ready";
    let all_ready = ready && payments.status == "ready";

    let payload = HealthResponse {
        status: if all_ready { "ready" } else { "degraded" },
        database,
        llm: HealthCheck {
            status: "ready",
            detail: format!("{} ({})", state.llm_provider, state.llm_model),
        },
        payments,
        checked_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};
    use paydesk_db::{connect_with_settings, DbPool};

    use crate::health::{health, HealthState};

    fn state(db_pool: DbPool, payments_key_configured: bool) -> HealthState {
        HealthState {
            db_pool,
            llm_provider: "gemini",
            llm_model: "gemini-2.5-flash".to_string(),
            payments_key_configured,
        }
    }

    #[tokio::test]
    async fn health_returns_ready_when_database_is_reachable() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");

        let (status, Json(payload)) = health(State(state(pool.clone(), true))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.database.status, "ready");
        assert_eq!(payload.llm.detail, "gemini (gemini-2.5-flash)");

        pool.close().await;
    }

    #[tokio::test]
    async fn missing_payments_key_degrades_without_failing_the_probe() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");

        let (status, Json(payload)) = health(State(state(pool.clone(), false))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.payments.status, "degraded");

        pool.close().await;
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_when_database_is_unavailable() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");
        pool.close().await;

        let (status, Json(payload)) = health(State(state(pool, true))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.database.status, "degraded");
    }
}
