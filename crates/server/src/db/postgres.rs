//! `PostgreSQL` implementation of the persistence gateway.
//!
//! Queries are checked at runtime (`query_as` + `FromRow`) so the crate
//! builds without a live database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use instashop_core::{
    Email, OrderId, OrderStatus, Price, ProductId, ProductStatus, Role, UserId, Username,
};

use super::{OrderStore, OrderUnitOfWork, ProductStore, RepositoryError, Store, UserStore};
use crate::models::{NewProduct, NewUser, Order, OrderHeader, Product, User, VerificationCode};

const USER_COLUMNS: &str = "id, username, email, password_hash, role, email_verified, \
                            verification_code, code_expires_at, created_at, updated_at";
const PRODUCT_COLUMNS: &str =
    "id, user_id, name, description, price, status, created_at, updated_at";
const ORDER_COLUMNS: &str = "id, user_id, status, created_at, updated_at";

/// Gateway backed by a `PgPool`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool, for shutdown.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// =============================================================================
// Row types
// =============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    username: String,
    email: String,
    password_hash: String,
    role: Role,
    email_verified: bool,
    verification_code: Option<String>,
    code_expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let username = Username::parse(&row.username).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid username in database: {e}"))
        })?;
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let verification = match (row.verification_code, row.code_expires_at) {
            (Some(code), Some(expires_at)) => Some(VerificationCode { code, expires_at }),
            (None, None) => None,
            _ => {
                return Err(RepositoryError::DataCorruption(format!(
                    "user {} has a verification code without an expiry",
                    row.id
                )));
            }
        };

        Ok(Self {
            id: row.id,
            username,
            email,
            password_hash: row.password_hash,
            role: row.role,
            email_verified: row.email_verified,
            verification,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    user_id: UserId,
    name: String,
    description: String,
    price: Price,
    status: ProductStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            description: row.description,
            price: row.price,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MemberRow {
    order_id: OrderId,
    #[sqlx(flatten)]
    product: ProductRow,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for OrderHeader {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Load memberships for a batch of orders and attach them.
async fn attach_products<'e, E>(
    executor: E,
    headers: Vec<OrderHeader>,
) -> Result<Vec<Order>, RepositoryError>
where
    E: sqlx::PgExecutor<'e>,
{
    let ids: Vec<i32> = headers.iter().map(|h| h.id.as_i32()).collect();
    let rows: Vec<MemberRow> = sqlx::query_as(
        r"
        SELECT op.order_id, p.id, p.user_id, p.name, p.description, p.price, p.status,
               p.created_at, p.updated_at
        FROM instashop.order_product op
        JOIN instashop.product p ON p.id = op.product_id
        WHERE op.order_id = ANY($1)
        ORDER BY op.order_id, p.id
        ",
    )
    .bind(&ids)
    .fetch_all(executor)
    .await?;

    let mut members: HashMap<OrderId, Vec<Product>> = HashMap::new();
    for row in rows {
        members
            .entry(row.order_id)
            .or_default()
            .push(row.product.into());
    }

    Ok(headers
        .into_iter()
        .map(|header| {
            let products = members.remove(&header.id).unwrap_or_default();
            Order::from_parts(header, products)
        })
        .collect())
}

// =============================================================================
// Users
// =============================================================================

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let row: UserRow = sqlx::query_as(&format!(
            r"
            INSERT INTO instashop.user
                (username, email, password_hash, role, verification_code, code_expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(user.username.as_str())
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(&user.verification.code)
        .bind(user.verification.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from_write)?;

        row.try_into()
    }

    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM instashop.user WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn set_verification_code(
        &self,
        id: UserId,
        code: &VerificationCode,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE instashop.user
            SET verification_code = $2, code_expires_at = $3, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&code.code)
        .bind(code.expires_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn consume_verification_code(
        &self,
        id: UserId,
        code: &str,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE instashop.user
            SET email_verified = TRUE, verification_code = NULL, code_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1 AND verification_code = $2 AND email_verified = FALSE
            ",
        )
        .bind(id)
        .bind(code)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Products
// =============================================================================

#[async_trait]
impl ProductStore for PgStore {
    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let row: ProductRow = sqlx::query_as(&format!(
            r"
            INSERT INTO instashop.product (user_id, name, description, price)
            VALUES ($1, $2, $3, $4)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(product.user_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from_write)?;

        Ok(row.into())
    }

    async fn product(
        &self,
        id: ProductId,
        owner: Option<UserId>,
    ) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            r"
            SELECT {PRODUCT_COLUMNS} FROM instashop.product
            WHERE id = $1 AND ($2::INTEGER IS NULL OR user_id = $2)
            "
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn products_by_owner(&self, owner: UserId) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM instashop.product WHERE user_id = $1 ORDER BY id"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn save_product(&self, product: &Product) -> Result<Product, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            r"
            UPDATE instashop.product
            SET name = $2, price = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(product.id)
        .bind(&product.name)
        .bind(product.price)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from_write)?;

        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }

    async fn delete_pending_product(
        &self,
        id: ProductId,
        owner: UserId,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM instashop.product
            WHERE id = $1 AND user_id = $2 AND status = 'pending'
            ",
        )
        .bind(id)
        .bind(owner)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from_write)?;

        Ok(result.rows_affected())
    }
}

// =============================================================================
// Orders
// =============================================================================

#[async_trait]
impl OrderStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn OrderUnitOfWork>, RepositoryError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn order_header(&self, id: OrderId) -> Result<Option<OrderHeader>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            r#"SELECT {ORDER_COLUMNS} FROM instashop."order" WHERE id = $1"#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn orders_by_owner(&self, owner: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            r#"SELECT {ORDER_COLUMNS} FROM instashop."order" WHERE user_id = $1 ORDER BY id"#
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        let headers = rows.into_iter().map(Into::into).collect();
        attach_products(&self.pool, headers).await
    }

    async fn set_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<OrderHeader, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            r#"
            UPDATE instashop."order"
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Unit of work over one `PostgreSQL` transaction.
///
/// sqlx rolls the transaction back when it is dropped uncommitted.
struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl OrderUnitOfWork for PgUnitOfWork {
    async fn insert_order(&mut self, owner: UserId) -> Result<OrderHeader, RepositoryError> {
        let row: OrderRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO instashop."order" (user_id)
            VALUES ($1)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(owner)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(RepositoryError::from_write)?;

        Ok(row.into())
    }

    async fn append_product(
        &mut self,
        order: OrderId,
        product: ProductId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO instashop.order_product (order_id, product_id) VALUES ($1, $2)")
            .bind(order)
            .bind(product)
            .execute(&mut *self.tx)
            .await
            .map_err(RepositoryError::from_write)?;
        Ok(())
    }

    async fn load_order(&mut self, id: OrderId) -> Result<Order, RepositoryError> {
        let row: OrderRow = sqlx::query_as(&format!(
            r#"SELECT {ORDER_COLUMNS} FROM instashop."order" WHERE id = $1"#
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let mut orders = attach_products(&mut *self.tx, vec![row.into()]).await?;
        orders.pop().ok_or(RepositoryError::NotFound)
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
