//! Persistence gateway for Instashop.
//!
//! # Database: `instashop` schema
//!
//! ## Tables
//!
//! - `user` - Accounts, password hashes, verification codes
//! - `product` - Listings owned by a user
//! - `order` - Order headers owned by a user
//! - `order_product` - Order membership (composite key, no attributes)
//!
//! # Implementations
//!
//! - [`PgStore`] - `PostgreSQL` via sqlx, units of work wrap a transaction
//! - [`MemoryStore`] - in-process tables for tests and local runs
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p instashop-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use instashop_core::{Email, OrderId, OrderStatus, ProductId, UserId};

use crate::models::{NewProduct, NewUser, Order, OrderHeader, Product, User, VerificationCode};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Unique constraint violation (e.g., duplicate email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Foreign key violation (e.g., order references a missing product).
    #[error("foreign key violation: {0}")]
    ForeignKey(String),
}

impl RepositoryError {
    /// Classify a driver error raised by a write.
    #[must_use]
    pub fn from_write(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            let constraint = db_err.constraint().unwrap_or("unknown").to_owned();
            if db_err.is_unique_violation() {
                return Self::Conflict(constraint);
            }
            if db_err.is_foreign_key_violation() {
                return Self::ForeignKey(constraint);
            }
        }
        Self::Database(err)
    }
}

/// Account persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert an unverified user.
    ///
    /// Returns `Conflict` if the username or email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError>;

    /// Find a user by (normalized) email.
    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Replace the outstanding verification code. Returns `NotFound` if the
    /// user does not exist.
    async fn set_verification_code(
        &self,
        id: UserId,
        code: &VerificationCode,
    ) -> Result<(), RepositoryError>;

    /// Mark the user verified and clear the code, only if `code` is still the
    /// outstanding one. Returns whether a row changed.
    async fn consume_verification_code(
        &self,
        id: UserId,
        code: &str,
    ) -> Result<bool, RepositoryError>;
}

/// Catalog persistence.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Insert a pending product.
    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError>;

    /// Fetch a product by id, optionally scoped to an owner.
    async fn product(
        &self,
        id: ProductId,
        owner: Option<UserId>,
    ) -> Result<Option<Product>, RepositoryError>;

    /// All products owned by `owner`, in id order.
    async fn products_by_owner(&self, owner: UserId) -> Result<Vec<Product>, RepositoryError>;

    /// Persist `name` and `price` of an existing product.
    ///
    /// Returns the stored entity with its refreshed `updated_at`.
    async fn save_product(&self, product: &Product) -> Result<Product, RepositoryError>;

    /// Delete the product only if id, owner and `pending` status all match.
    /// Returns the number of rows removed.
    async fn delete_pending_product(
        &self,
        id: ProductId,
        owner: UserId,
    ) -> Result<u64, RepositoryError>;
}

/// Order persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Open a unit of work for a multi-row order write.
    async fn begin(&self) -> Result<Box<dyn OrderUnitOfWork>, RepositoryError>;

    /// Fetch an order header by id.
    async fn order_header(&self, id: OrderId) -> Result<Option<OrderHeader>, RepositoryError>;

    /// All orders owned by `owner` with products populated, in id order.
    async fn orders_by_owner(&self, owner: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// Single-row status write. Returns `NotFound` if the order is gone.
    async fn set_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<OrderHeader, RepositoryError>;
}

/// A transactional scope for writing one order and its memberships.
///
/// Writes are invisible to other readers until [`commit`](Self::commit).
/// Dropping the unit of work without committing rolls it back.
#[async_trait]
pub trait OrderUnitOfWork: Send {
    /// Insert a pending order header owned by `owner`.
    async fn insert_order(&mut self, owner: UserId) -> Result<OrderHeader, RepositoryError>;

    /// Append one product to the order's membership set.
    ///
    /// Returns `ForeignKey` if the product does not exist.
    async fn append_product(
        &mut self,
        order: OrderId,
        product: ProductId,
    ) -> Result<(), RepositoryError>;

    /// Read back the order with its products, as seen inside this unit.
    async fn load_order(&mut self, id: OrderId) -> Result<Order, RepositoryError>;

    /// Make every write in this unit visible.
    async fn commit(self: Box<Self>) -> Result<(), RepositoryError>;

    /// Discard every write in this unit.
    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError>;
}

/// The full gateway handed to services through `AppState`.
#[async_trait]
pub trait Store: UserStore + ProductStore + OrderStore {
    /// Cheap connectivity probe for readiness checks.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
