use std::sync::Arc;
use std::time::Duration;

use switchboard_core::config::{AppConfig, ConfigError, CorrelationBackend, LoadOptions};
use switchboard_core::kv::ExpiringKvStore;
use switchboard_db::{connect_with_settings, migrations, DbPool, InMemoryKvStore, SqlKvStore};
use switchboard_slack::{
    spawn_purge_task, CorrelationStore, Dispatcher, HandlerRegistry, PingCommandHandler,
    TracingErrorReporter,
};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub dispatcher: Dispatcher,
    pub db_pool: Option<DbPool>,
    pub purge_task: JoinHandle<()>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        correlation_backend = ?config.correlation.backend,
        "starting application bootstrap"
    );

    let (kv, db_pool) = correlation_backend(&config).await?;
    let correlation = CorrelationStore::new(kv);

    let registry = default_registry();
    let summary = registry.summary();
    info!(
        event_name = "system.bootstrap.handlers_registered",
        correlation_id = "bootstrap",
        start_handlers = summary.start_handlers,
        complete_handlers = summary.complete_handlers,
        command_handlers = summary.command_handlers,
        "handler registry built"
    );

    let purge_task = spawn_purge_task(
        correlation.clone(),
        Duration::from_secs(config.correlation.purge_interval_secs),
    );
    let dispatcher =
        Dispatcher::new(Arc::new(registry), correlation, Arc::new(TracingErrorReporter));

    Ok(Application { config, dispatcher, db_pool, purge_task })
}

/// Handlers shipped with the server binary. Applications embedding the
/// engine build their own registry the same way.
pub fn default_registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register_command("/ping", PingCommandHandler);
    registry
}

async fn correlation_backend(
    config: &AppConfig,
) -> Result<(Arc<dyn ExpiringKvStore>, Option<DbPool>), BootstrapError> {
    match config.correlation.backend {
        CorrelationBackend::Memory => Ok((Arc::new(InMemoryKvStore::new()), None)),
        CorrelationBackend::Sqlite => {
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

            Ok((Arc::new(SqlKvStore::new(db_pool.clone())), Some(db_pool)))
        }
    }
}
