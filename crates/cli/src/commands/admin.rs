//! Admin account commands.
//!
//! # Usage
//!
//! ```bash
//! instashop admin create -u alice -e alice@example.com -p 'correct horse battery'
//! ```
//!
//! The account is created unverified, like any registration. Its
//! verification code is logged rather than emailed.

use std::sync::Arc;

use instashop_core::UserId;
use instashop_server::config;
use instashop_server::db::PgStore;
use instashop_server::services::{AccountService, LogNotifier, NotificationDispatcher};

use super::{CommandError, connect};

/// Create an administrator account.
///
/// # Returns
///
/// The ID of the created user.
pub async fn create(username: &str, email: &str, password: &str) -> Result<UserId, CommandError> {
    let code_ttl = config::verification_code_ttl_from_env()?;
    let pool = connect().await?;
    let store = PgStore::new(pool.clone());
    let notifications = NotificationDispatcher::new(Arc::new(LogNotifier));

    let created = AccountService::new(&store, &notifications, code_ttl)
        .register_admin(username, email, password)
        .await;

    notifications.close_and_wait().await;
    pool.close().await;

    let user = created?;
    tracing::info!(
        "Admin user created successfully! ID: {}, Username: {}, Email: {}",
        user.id,
        user.username,
        user.email
    );
    tracing::info!("Verify the email with the logged code before logging in.");

    Ok(user.id)
}
