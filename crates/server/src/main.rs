mod bootstrap;
mod health;
mod routes;

use std::time::Duration;

use anyhow::Result;
use switchboard_core::config::{AppConfig, LoadOptions};
use tokio::sync::oneshot;

fn init_logging(config: &AppConfig) {
    use switchboard_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let verification_token = app.config.verification_token();
    if verification_token.is_none() {
        tracing::warn!(
            event_name = "system.server.verification_disabled",
            correlation_id = "bootstrap",
            "slack.verification_token is unset; inbound requests are not verified"
        );
    }

    let router = routes::router(routes::SlackState::new(app.dispatcher.clone(), verification_token))
        .merge(health::router(app.dispatcher.correlation().clone()));

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        correlation_backend = app.dispatcher.correlation().backend_name(),
        "switchboard-server listening"
    );

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    tokio::select! {
        result = &mut server => {
            app.purge_task.abort();
            result??;
            return Ok(());
        }
        signal = tokio::signal::ctrl_c() => signal?,
    }

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        graceful_shutdown_secs = app.config.server.graceful_shutdown_secs,
        "switchboard-server stopping"
    );
    let _ = shutdown_tx.send(());
    app.purge_task.abort();

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    match tokio::time::timeout(grace, &mut server).await {
        Ok(result) => result??,
        Err(_) => {
            tracing::warn!(
                event_name = "system.server.shutdown_timeout",
                correlation_id = "shutdown",
                "in-flight requests did not drain in time; aborting"
            );
            server.abort();
        }
    }
    if let Some(pool) = app.db_pool {
        pool.close().await;
    }

    Ok(())
}
