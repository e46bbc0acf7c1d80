//! Product listings.

use chrono::{DateTime, Utc};
use serde::Serialize;

use instashop_core::{Price, ProductId, ProductStatus, UserId};

/// A product owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub user_id: UserId,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to insert a product. New products are always pending.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub user_id: UserId,
    pub name: String,
    pub description: String,
    pub price: Price,
}
