use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;

use vendo_core::config::DatabaseConfig;

pub type DbPool = sqlx::SqlitePool;

/// Opens the SQLite pool described by the application config. Per-connection
/// pragmas: WAL journaling so concurrent conversations can read while one
/// writes, foreign keys for the order tables, and a busy timeout so two
/// turns landing together wait instead of failing fast.
pub async fn connect(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .acquire_timeout(Duration::from_secs(config.timeout_secs.max(1)))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(&config.url)
        .await
}
