//! Administrative order commands.
//!
//! # Usage
//!
//! ```bash
//! instashop order set-status --order 12 --owner 7 --status approved
//! ```

use instashop_core::{OrderId, UserId};
use instashop_server::db::PgStore;
use instashop_server::services::OrderService;

use super::{CommandError, connect};

/// Set an order's status after checking it belongs to `owner`.
pub async fn set_status(order: i32, owner: i32, status: &str) -> Result<(), CommandError> {
    let pool = connect().await?;
    let store = PgStore::new(pool.clone());

    let updated = OrderService::new(&store)
        .update_order_status(UserId::new(owner), OrderId::new(order), status)
        .await;
    pool.close().await;

    let header = updated?;
    tracing::info!(
        "Order {} is now {} (owner {})",
        header.id,
        header.status,
        header.user_id
    );
    Ok(())
}
