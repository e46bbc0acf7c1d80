//! In-process implementation of the persistence gateway.
//!
//! Mirrors the `PostgreSQL` constraints that matter to the services (unique
//! username/email, membership foreign keys, composite membership key) so
//! service and HTTP tests run without a database. Owner references to the
//! `user` table are not checked. A unit of work stages its writes and
//! applies them under one write lock on commit; dropping it discards them.
//!
//! Fault injection hooks let tests fail the k-th membership append or slow
//! every append down.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use instashop_core::{Email, OrderId, OrderStatus, ProductId, ProductStatus, UserId};

use super::{OrderStore, OrderUnitOfWork, ProductStore, RepositoryError, Store, UserStore};
use crate::models::{NewProduct, NewUser, Order, OrderHeader, Product, User, VerificationCode};

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, OrderHeader>,
    memberships: BTreeSet<(OrderId, ProductId)>,
}

impl Tables {
    fn order_with_products(&self, header: OrderHeader) -> Order {
        let products = self
            .memberships
            .range((header.id, ProductId::new(i32::MIN))..=(header.id, ProductId::new(i32::MAX)))
            .filter_map(|(_, product_id)| self.products.get(product_id).cloned())
            .collect();
        Order::from_parts(header, products)
    }
}

#[derive(Default)]
struct Inner {
    tables: RwLock<Tables>,
    // Sequences are never rolled back, matching SERIAL columns.
    next_user: AtomicI32,
    next_product: AtomicI32,
    next_order: AtomicI32,
    fail_append_at: AtomicUsize,
    append_delay_ms: AtomicU64,
}

impl Inner {
    fn next_id(counter: &AtomicI32) -> i32 {
        counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Gateway backed by in-process tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `k`-th membership append of every later unit of work fail
    /// with a database error (1-based). `0` disables the fault.
    pub fn fail_append_at(&self, k: usize) {
        self.inner.fail_append_at.store(k, Ordering::SeqCst);
    }

    /// Sleep for `delay` before every membership append.
    pub fn set_append_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.inner.append_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Number of committed order rows.
    pub async fn order_count(&self) -> usize {
        self.inner.tables.read().await.orders.len()
    }

    /// Number of committed membership rows.
    pub async fn membership_count(&self) -> usize {
        self.inner.tables.read().await.memberships.len()
    }

    /// Set a product's review status. Review is an out-of-band process.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn set_product_status(
        &self,
        id: ProductId,
        status: ProductStatus,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.inner.tables.write().await;
        let product = tables.products.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        product.status = status;
        product.updated_at = Utc::now();
        Ok(())
    }
}

// =============================================================================
// Users
// =============================================================================

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.inner.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(RepositoryError::Conflict("user_username_key".to_owned()));
        }
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict("user_email_key".to_owned()));
        }

        let now = Utc::now();
        let created = User {
            id: UserId::new(Inner::next_id(&self.inner.next_user)),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            email_verified: false,
            verification: Some(user.verification),
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let tables = self.inner.tables.read().await;
        Ok(tables.users.values().find(|u| &u.email == email).cloned())
    }

    async fn set_verification_code(
        &self,
        id: UserId,
        code: &VerificationCode,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.inner.tables.write().await;
        let user = tables.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        user.verification = Some(code.clone());
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn consume_verification_code(
        &self,
        id: UserId,
        code: &str,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.inner.tables.write().await;
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(false);
        };
        let matches = user.verification.as_ref().is_some_and(|v| v.code == code);
        if user.email_verified || !matches {
            return Ok(false);
        }
        user.email_verified = true;
        user.verification = None;
        user.updated_at = Utc::now();
        Ok(true)
    }
}

// =============================================================================
// Products
// =============================================================================

#[async_trait]
impl ProductStore for MemoryStore {
    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let mut tables = self.inner.tables.write().await;
        let now = Utc::now();
        let created = Product {
            id: ProductId::new(Inner::next_id(&self.inner.next_product)),
            user_id: product.user_id,
            name: product.name,
            description: product.description,
            price: product.price,
            status: ProductStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        tables.products.insert(created.id, created.clone());
        Ok(created)
    }

    async fn product(
        &self,
        id: ProductId,
        owner: Option<UserId>,
    ) -> Result<Option<Product>, RepositoryError> {
        let tables = self.inner.tables.read().await;
        Ok(tables
            .products
            .get(&id)
            .filter(|p| owner.is_none_or(|owner| p.user_id == owner))
            .cloned())
    }

    async fn products_by_owner(&self, owner: UserId) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.inner.tables.read().await;
        Ok(tables
            .products
            .values()
            .filter(|p| p.user_id == owner)
            .cloned()
            .collect())
    }

    async fn save_product(&self, product: &Product) -> Result<Product, RepositoryError> {
        let mut tables = self.inner.tables.write().await;
        let stored = tables
            .products
            .get_mut(&product.id)
            .ok_or(RepositoryError::NotFound)?;
        stored.name.clone_from(&product.name);
        stored.price = product.price;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete_pending_product(
        &self,
        id: ProductId,
        owner: UserId,
    ) -> Result<u64, RepositoryError> {
        let mut tables = self.inner.tables.write().await;
        let matches = tables
            .products
            .get(&id)
            .is_some_and(|p| p.user_id == owner && p.status == ProductStatus::Pending);
        if !matches {
            return Ok(0);
        }
        if tables.memberships.iter().any(|(_, product)| *product == id) {
            return Err(RepositoryError::ForeignKey(
                "order_product_product_id_fkey".to_owned(),
            ));
        }
        tables.products.remove(&id);
        Ok(1)
    }
}

// =============================================================================
// Orders
// =============================================================================

#[async_trait]
impl OrderStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn OrderUnitOfWork>, RepositoryError> {
        Ok(Box::new(MemoryUnitOfWork {
            inner: Arc::clone(&self.inner),
            orders: Vec::new(),
            memberships: Vec::new(),
            appends: 0,
        }))
    }

    async fn order_header(&self, id: OrderId) -> Result<Option<OrderHeader>, RepositoryError> {
        let tables = self.inner.tables.read().await;
        Ok(tables.orders.get(&id).cloned())
    }

    async fn orders_by_owner(&self, owner: UserId) -> Result<Vec<Order>, RepositoryError> {
        let tables = self.inner.tables.read().await;
        Ok(tables
            .orders
            .values()
            .filter(|o| o.user_id == owner)
            .map(|header| tables.order_with_products(header.clone()))
            .collect())
    }

    async fn set_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<OrderHeader, RepositoryError> {
        let mut tables = self.inner.tables.write().await;
        let order = tables.orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        order.status = status;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// Staged order writes, applied on commit.
struct MemoryUnitOfWork {
    inner: Arc<Inner>,
    orders: Vec<OrderHeader>,
    memberships: Vec<(OrderId, ProductId)>,
    appends: usize,
}

impl MemoryUnitOfWork {
    fn staged_order(&self, id: OrderId) -> Option<&OrderHeader> {
        self.orders.iter().find(|o| o.id == id)
    }
}

#[async_trait]
impl OrderUnitOfWork for MemoryUnitOfWork {
    async fn insert_order(&mut self, owner: UserId) -> Result<OrderHeader, RepositoryError> {
        let now = Utc::now();
        let header = OrderHeader {
            id: OrderId::new(Inner::next_id(&self.inner.next_order)),
            user_id: owner,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.orders.push(header.clone());
        Ok(header)
    }

    async fn append_product(
        &mut self,
        order: OrderId,
        product: ProductId,
    ) -> Result<(), RepositoryError> {
        let delay = self.inner.append_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        self.appends += 1;
        if self.inner.fail_append_at.load(Ordering::SeqCst) == self.appends {
            return Err(RepositoryError::Database(sqlx::Error::Protocol(format!(
                "injected failure on membership append {}",
                self.appends
            ))));
        }

        if self.staged_order(order).is_none()
            && !self.inner.tables.read().await.orders.contains_key(&order)
        {
            return Err(RepositoryError::ForeignKey(
                "order_product_order_id_fkey".to_owned(),
            ));
        }
        if !self.inner.tables.read().await.products.contains_key(&product) {
            return Err(RepositoryError::ForeignKey(
                "order_product_product_id_fkey".to_owned(),
            ));
        }
        if self.memberships.contains(&(order, product)) {
            return Err(RepositoryError::Conflict("order_product_pkey".to_owned()));
        }

        self.memberships.push((order, product));
        Ok(())
    }

    async fn load_order(&mut self, id: OrderId) -> Result<Order, RepositoryError> {
        let header = self.staged_order(id).cloned().ok_or(RepositoryError::NotFound)?;
        let tables = self.inner.tables.read().await;
        let products = self
            .memberships
            .iter()
            .filter(|(order, _)| *order == id)
            .filter_map(|(_, product)| tables.products.get(product).cloned())
            .collect();
        Ok(Order::from_parts(header, products))
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        let Self {
            inner,
            orders,
            memberships,
            ..
        } = *self;
        let mut tables = inner.tables.write().await;
        // Products may have been deleted since the append; nothing is applied then.
        if memberships
            .iter()
            .any(|(_, product)| !tables.products.contains_key(product))
        {
            return Err(RepositoryError::ForeignKey(
                "order_product_product_id_fkey".to_owned(),
            ));
        }
        for header in orders {
            tables.orders.insert(header.id, header);
        }
        tables.memberships.extend(memberships);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError> {
        Ok(())
    }
}
