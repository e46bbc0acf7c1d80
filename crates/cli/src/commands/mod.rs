//! CLI subcommand implementations.

pub mod admin;
pub mod migrate;
pub mod order;

use instashop_server::config;
use sqlx::PgPool;

/// Connect with the server's database URL settings.
async fn connect() -> Result<PgPool, CommandError> {
    let database_url = config::database_url_from_env()?;
    tracing::info!("Connecting to database...");
    Ok(instashop_server::db::create_pool(&database_url).await?)
}

/// Errors shared by every command.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Account(#[from] instashop_server::services::AccountError),

    #[error(transparent)]
    Service(#[from] instashop_server::services::ServiceError),
}
