//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! instashop migrate
//! ```
//!
//! # Environment Variables
//!
//! - `INSTASHOP_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! Migration files live in `crates/server/migrations/`.

use super::{CommandError, connect};

/// Run the server's database migrations.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    pool.close().await;
    tracing::info!("Migrations complete!");
    Ok(())
}
