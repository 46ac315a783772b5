use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};
use vendo_db::DbPool;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ComponentHealth {
    pub ready: bool,
    pub detail: String,
}

/// Readiness of the two things a turn cannot be served without: the database
/// and the migrated context store that holds carts and pending checkouts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: ComponentHealth,
    pub context_store: ComponentHealth,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool })
}

pub async fn spawn(bind_address: &str, port: u16, db_pool: DbPool) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(db_pool)).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let context_store = context_store_check(&state.db_pool).await;
    let ready = database.ready && context_store.ready;

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        database,
        context_store,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> ComponentHealth {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => ComponentHealth { ready: true, detail: "reachable".to_string() },
        Err(error) => ComponentHealth { ready: false, detail: format!("query failed: {error}") },
    }
}

/// Probes the table behind the context store. A miss here means migrations
/// have not run, so conversations would lose carts and pending checkouts.
async fn context_store_check(pool: &DbPool) -> ComponentHealth {
    match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM conversation_contexts")
        .fetch_one(pool)
        .await
    {
        Ok(count) => ComponentHealth {
            ready: true,
            detail: format!("{count} stored conversation contexts"),
        },
        Err(error) => ComponentHealth {
            ready: false,
            detail: format!("context table unavailable: {error}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};
    use vendo_core::config::DatabaseConfig;
    use vendo_db::{connect, migrations, DbPool};

    use crate::health::{health, HealthState};

    async fn pool() -> DbPool {
        connect(&DatabaseConfig {
            url: "sqlite::memory:?cache=shared".to_string(),
            max_connections: 1,
            timeout_secs: 5,
        })
        .await
        .expect("pool should connect")
    }

    #[tokio::test]
    async fn migrated_database_reports_ready() {
        let pool = pool().await;
        migrations::run_pending(&pool).await.expect("migrate");

        let (status, Json(payload)) = health(State(HealthState { db_pool: pool.clone() })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert!(payload.database.ready);
        assert!(payload.context_store.ready);
        assert!(payload.context_store.detail.contains("0 stored"));

        pool.close().await;
    }

    #[tokio::test]
    async fn unmigrated_database_degrades_on_the_context_store_check() {
        let pool = pool().await;

        let (status, Json(payload)) = health(State(HealthState { db_pool: pool.clone() })).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert!(payload.database.ready);
        assert!(!payload.context_store.ready);

        pool.close().await;
    }

    #[tokio::test]
    async fn unreachable_database_degrades_both_checks() {
        let pool = pool().await;
        pool.close().await;

        let (status, Json(payload)) = health(State(HealthState { db_pool: pool })).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!payload.database.ready);
        assert!(!payload.context_store.ready);
    }
}
