use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

/// Number of migrations that have not yet been applied to `pool`.
pub async fn pending_count(pool: &DbPool) -> Result<usize, sqlx::Error> {
    let applied_table = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;

    if applied_table == 0 {
        return Ok(MIGRATOR.iter().count());
    }

    let applied: Vec<i64> =
        sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?;

    Ok(MIGRATOR.iter().filter(|migration| !applied.contains(&migration.version)).count())
}

#[cfg(test)]
mod tests {
    use super::{pending_count, run_pending};
    use crate::{connect_with_settings, migrations::MIGRATOR};

    const MANAGED_SCHEMA_OBJECTS: &[&str] = &[
        "chat_session",
        "chat_message",
        "audit_log",
        "idx_chat_session_actor",
        "idx_chat_message_session",
        "idx_audit_log_organization",
        "idx_audit_log_session",
    ];

    async fn schema_object_count(pool: &crate::DbPool, name: &str) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sqlite_master WHERE name = ?")
            .bind(name)
            .fetch_one(pool)
            .await
            .expect("query sqlite_master")
    }

    #[tokio::test]
    async fn migrations_create_baseline_tables() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        assert_eq!(pending_count(&pool).await.expect("pending"), MIGRATOR.iter().count());

        run_pending(&pool).await.expect("run migrations");

        for object in MANAGED_SCHEMA_OBJECTS {
            assert_eq!(schema_object_count(&pool, object).await, 1, "missing {object}");
        }
        assert_eq!(pending_count(&pool).await.expect("pending"), 0);
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");

        run_pending(&pool).await.expect("first run");
        run_pending(&pool).await.expect("second run");

        assert_eq!(schema_object_count(&pool, "chat_session").await, 1);
    }
}
