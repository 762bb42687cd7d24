//! Keel Server — Application entry point.

mod config;
mod error;

use keel_db::{DbError, DbManager};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::error::ServerError;

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).json().init();

    tracing::info!("Starting Keel server...");

    let config = ServerConfig::from_env()?;
    tracing::info!(
        permissions_enabled = config.authz.permissions_enabled,
        max_group_depth = config.authz.max_group_depth,
        admin_role = %config.authz.admin_role,
        "Loaded permission configuration"
    );

    let db = DbManager::connect(&config.db).await.map_err(DbError::from)?;
    keel_db::run_migrations(db.client()).await?;

    tracing::info!("Keel server ready");
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }

    tracing::info!("Keel server stopped.");
    Ok(())
}
