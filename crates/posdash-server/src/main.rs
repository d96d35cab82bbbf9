mod api;
mod frontend;
mod insights;
mod middleware;

use std::sync::Arc;

use posdash_core::AppConfig;
use posdash_databricks::{ClaudeClient, GenieClient};
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(posdash_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(env = %config.env, static_root = %config.static_root.display(), "starting");

    let pool = connect_database(&config).await;
    let genie = build_genie_client(&config);
    let claude = build_claude_client(&config);

    let app = build_app(AppState {
        pool: pool.clone(),
        config: Arc::clone(&config),
        genie,
        claude,
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = pool {
        pool.close().await;
        tracing::info!("database pool closed");
    }
    Ok(())
}

/// Connects the pool if a database is configured. A failed connection is
/// logged and the service keeps running on sample data.
async fn connect_database(config: &AppConfig) -> Option<PgPool> {
    let Some(db) = config.database.as_ref() else {
        tracing::warn!("no database configured, serving sample data");
        return None;
    };

    let pool = match posdash_db::connect_pool_from_config(db).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(error = %e, "database unavailable, serving sample data");
            return None;
        }
    };

    if db.run_migrations {
        match posdash_db::run_migrations(&pool).await {
            Ok(applied) => tracing::info!(applied, "migrations applied"),
            Err(e) => tracing::error!(error = %e, "migrations failed"),
        }
    }
    Some(pool)
}

fn build_genie_client(config: &AppConfig) -> Option<Arc<GenieClient>> {
    let genie = config.genie.as_ref()?;
    match GenieClient::new(
        &genie.instance_url,
        &genie.space_id,
        &genie.token,
        config.http_timeout_secs,
    ) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            tracing::warn!(error = %e, "genie client disabled");
            None
        }
    }
}

fn build_claude_client(config: &AppConfig) -> Option<Arc<ClaudeClient>> {
    let endpoint = config.claude_endpoint.as_deref()?;
    match ClaudeClient::new(endpoint, config.http_timeout_secs) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            tracing::warn!(error = %e, "claude client disabled");
            None
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
