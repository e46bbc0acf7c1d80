//! Orders and their product memberships.

use chrono::{DateTime, Utc};
use serde::Serialize;

use instashop_core::{OrderId, OrderStatus, UserId};

use super::Product;

/// The `order` row without its memberships.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderHeader {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An order with its product set populated, ordered by product id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub products: Vec<Product>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Attach a product set to a header.
    #[must_use]
    pub fn from_parts(header: OrderHeader, mut products: Vec<Product>) -> Self {
        products.sort_by_key(|p| p.id);
        Self {
            id: header.id,
            user_id: header.user_id,
            products,
            status: header.status,
            created_at: header.created_at,
            updated_at: header.updated_at,
        }
    }
}
