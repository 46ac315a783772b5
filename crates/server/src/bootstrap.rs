use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use vendo_agent::{IntentClassifier, Orchestrator};
use vendo_core::config::{AppConfig, ConfigError, LoadOptions};
use vendo_db::repositories::{
    SqlCatalogRepository, SqlContextStore, SqlCustomerRepository, SqlOrderRepository,
};
use vendo_db::{connect, migrations, DbPool};

use crate::classifier::OpenAiClassifier;
use crate::notify::LoggingNotificationDispatcher;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub orchestrator: Arc<Orchestrator>,
    pub classifier: Arc<dyn IntentClassifier>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("http client construction failed: {0}")]
    HttpClient(#[source] reqwest::Error),
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

    let db_pool =
        connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
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

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(SqlContextStore::new(db_pool.clone())),
        Arc::new(SqlCatalogRepository::new(db_pool.clone())),
        Arc::new(SqlCustomerRepository::new(db_pool.clone())),
        Arc::new(SqlOrderRepository::new(db_pool.clone())),
        Arc::new(LoggingNotificationDispatcher::default()),
    ));

    let classifier: Arc<dyn IntentClassifier> =
        Arc::new(OpenAiClassifier::from_config(&config.llm).map_err(BootstrapError::HttpClient)?);

    Ok(Application { config, db_pool, orchestrator, classifier })
}
