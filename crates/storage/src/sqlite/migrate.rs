use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use super::SqliteInitError;

struct Step {
    version: i64,
    sql: &'static str,
}

/// Schema history, oldest first. Steps are never edited once released.
const STEPS: &[Step] = &[Step {
    version: 1,
    sql: r"
        CREATE TABLE IF NOT EXISTS kv_entries (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
    ",
}];

/// Latest schema version known to this build.
pub const SCHEMA_VERSION: i64 = 1;

/// Applies every step newer than the recorded version, each in its own
/// transaction.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
        ",
    )
    .execute(pool)
    .await?;

    let applied: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_migrations")
        .fetch_one(pool)
        .await?;
    let applied = applied.unwrap_or(0);

    for step in STEPS.iter().filter(|step| step.version > applied) {
        let mut tx = pool.begin().await?;
        sqlx::query(step.sql).execute(&mut *tx).await?;
        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)")
            .bind(step.version)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        debug!(version = step.version, "applied schema migration");
    }

    Ok(())
}
