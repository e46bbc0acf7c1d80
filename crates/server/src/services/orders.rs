//! Order workflow: placement, listing, cancellation and status changes.
//!
//! Placement writes the order header and one membership row per product in a
//! single unit of work. Any failure rolls the whole unit back, so a partial
//! order is never visible.

use std::collections::HashSet;

use serde::Deserialize;

use instashop_core::{Action, OrderId, OrderStatus, ProductId, UserId};

use super::{Identity, ServiceError};
use crate::db::{OrderUnitOfWork, RepositoryError, Store};
use crate::models::{Order, OrderHeader};

/// A product reference inside an order payload. Other fields are ignored.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ProductRef {
    pub id: ProductId,
}

/// Input for placing an order.
///
/// The owner is always the caller; any `user_id` in the payload is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaceOrder {
    #[serde(default)]
    pub products: Vec<ProductRef>,
}

impl PlaceOrder {
    /// Build a payload from bare product ids.
    #[must_use]
    pub fn of(ids: impl IntoIterator<Item = ProductId>) -> Self {
        Self {
            products: ids.into_iter().map(|id| ProductRef { id }).collect(),
        }
    }

    fn product_ids(&self) -> Result<Vec<ProductId>, ServiceError> {
        if self.products.is_empty() {
            return Err(ServiceError::Validation(
                "order must contain at least one product".to_owned(),
            ));
        }

        let mut seen = HashSet::with_capacity(self.products.len());
        for product in &self.products {
            if !seen.insert(product.id) {
                return Err(ServiceError::Validation(format!(
                    "product {} appears more than once",
                    product.id
                )));
            }
        }

        Ok(self.products.iter().map(|p| p.id).collect())
    }
}

/// Order service.
pub struct OrderService<'a> {
    store: &'a dyn Store,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Place a pending order for the caller.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for an empty or duplicated product
    /// list (before any write) and `Repository` with the unmodified store
    /// error if any write fails; in that case nothing is persisted.
    pub async fn place_order(
        &self,
        caller: &Identity,
        input: PlaceOrder,
    ) -> Result<Order, ServiceError> {
        caller.authorize(Action::PlaceOrder)?;
        let product_ids = input.product_ids()?;

        let mut uow = self.store.begin().await?;
        let outcome = write_order(uow.as_mut(), caller.user_id, &product_ids).await;
        match outcome {
            Ok(order) => {
                uow.commit().await?;
                tracing::info!(
                    order_id = %order.id,
                    user_id = %caller.user_id,
                    products = order.products.len(),
                    "Order placed"
                );
                Ok(order)
            }
            Err(err) => {
                if let Err(rollback_err) = uow.rollback().await {
                    tracing::warn!(error = %rollback_err, "Order rollback failed");
                }
                tracing::warn!(user_id = %caller.user_id, error = %err, "Order placement rolled back");
                Err(err.into())
            }
        }
    }

    /// The caller's orders with products populated.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` for roles outside user/editor.
    pub async fn list_orders(&self, caller: &Identity) -> Result<Vec<Order>, ServiceError> {
        caller.authorize(Action::ListOrders)?;

        Ok(self.store.orders_by_owner(caller.user_id).await?)
    }

    /// Cancel one of the caller's pending orders.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the order is absent, `Forbidden` if
    /// the caller does not own it, and `BusinessRule` unless it is pending.
    pub async fn cancel_order(&self, caller: &Identity, id: OrderId) -> Result<(), ServiceError> {
        caller.authorize(Action::CancelOrder)?;

        let order = self.owned_order(caller.user_id, id, "cancel").await?;
        if order.status != OrderStatus::Pending {
            return Err(ServiceError::BusinessRule(
                "only pending orders can be canceled",
            ));
        }

        self.store
            .set_order_status(id, OrderStatus::Canceled)
            .await?;

        tracing::info!(order_id = %id, user_id = %caller.user_id, "Order canceled");
        Ok(())
    }

    /// Administrative status change, checked for ownership only.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for an unknown status, `NotFound` if
    /// the order is absent, and `Forbidden` if `owner` does not own it.
    pub async fn update_order_status(
        &self,
        owner: UserId,
        id: OrderId,
        status: &str,
    ) -> Result<OrderHeader, ServiceError> {
        let status = status
            .parse::<OrderStatus>()
            .map_err(|e| ServiceError::Validation(e.to_string()))?;

        self.owned_order(owner, id, "update").await?;
        let updated = self.store.set_order_status(id, status).await?;

        tracing::info!(order_id = %id, %status, "Order status updated");
        Ok(updated)
    }

    async fn owned_order(
        &self,
        owner: UserId,
        id: OrderId,
        verb: &str,
    ) -> Result<OrderHeader, ServiceError> {
        let order = self
            .store
            .order_header(id)
            .await?
            .ok_or(ServiceError::NotFound("order"))?;

        if order.user_id != owner {
            return Err(ServiceError::Forbidden(format!(
                "you do not have permission to {verb} this order"
            )));
        }
        Ok(order)
    }
}

/// The writes of one placement, run inside `uow`.
async fn write_order(
    uow: &mut dyn OrderUnitOfWork,
    owner: UserId,
    product_ids: &[ProductId],
) -> Result<Order, RepositoryError> {
    let header = uow.insert_order(owner).await?;
    for product_id in product_ids {
        uow.append_product(header.id, *product_id).await?;
    }
    uow.load_order(header.id).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use instashop_core::Price;

    use super::*;
    use crate::db::{MemoryStore, ProductStore};
    use crate::models::{NewProduct, Product};

    fn caller(id: i32, role: &str) -> Identity {
        Identity {
            user_id: UserId::new(id),
            role: role.to_owned(),
        }
    }

    async fn seed_products(store: &MemoryStore, n: usize) -> Vec<Product> {
        let mut products = Vec::with_capacity(n);
        for i in 0..n {
            products.push(
                store
                    .create_product(NewProduct {
                        user_id: UserId::new(42),
                        name: format!("Widget {i}"),
                        description: "A widget".to_owned(),
                        price: Price::new("9.99".parse().unwrap()).unwrap(),
                    })
                    .await
                    .unwrap(),
            );
        }
        products
    }

    #[tokio::test]
    async fn test_place_order_populates_products() {
        let store = MemoryStore::new();
        let products = seed_products(&store, 3).await;
        let svc = OrderService::new(&store);

        let before = Utc::now();
        let order = svc
            .place_order(&caller(7, "user"), PlaceOrder::of(products.iter().map(|p| p.id)))
            .await
            .unwrap();

        assert_eq!(order.user_id, UserId::new(7));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.products, products);
        assert!(order.created_at >= before);
        assert_eq!(store.membership_count().await, 3);
    }

    #[tokio::test]
    async fn test_empty_order_is_rejected_before_any_write() {
        let store = MemoryStore::new();
        let svc = OrderService::new(&store);

        let err = svc
            .place_order(&caller(7, "user"), PlaceOrder::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_products_are_rejected() {
        let store = MemoryStore::new();
        let products = seed_products(&store, 1).await;
        let svc = OrderService::new(&store);

        let err = svc
            .place_order(
                &caller(7, "user"),
                PlaceOrder::of([products[0].id, products[0].id]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_failure_on_each_append_leaves_nothing() {
        const N: usize = 4;
        for k in 1..=N {
            let store = MemoryStore::new();
            let products = seed_products(&store, N).await;
            store.fail_append_at(k);

            let err = OrderService::new(&store)
                .place_order(&caller(7, "user"), PlaceOrder::of(products.iter().map(|p| p.id)))
                .await
                .unwrap_err();

            assert!(
                matches!(err, ServiceError::Repository(RepositoryError::Database(_))),
                "k={k}: {err}"
            );
            assert_eq!(store.order_count().await, 0, "k={k}");
            assert_eq!(store.membership_count().await, 0, "k={k}");
        }
    }

    #[tokio::test]
    async fn test_unknown_product_is_foreign_key_error() {
        let store = MemoryStore::new();
        let svc = OrderService::new(&store);

        let err = svc
            .place_order(&caller(7, "user"), PlaceOrder::of([ProductId::new(404)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Repository(RepositoryError::ForeignKey(_))
        ));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_admin_cannot_place_orders() {
        let store = MemoryStore::new();
        let products = seed_products(&store, 1).await;

        let err = OrderService::new(&store)
            .place_order(&caller(1, "admin"), PlaceOrder::of([products[0].id]))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_cancel_is_owner_only_and_once() {
        let store = MemoryStore::new();
        let products = seed_products(&store, 1).await;
        let svc = OrderService::new(&store);
        let owner = caller(7, "user");
        let order = svc
            .place_order(&owner, PlaceOrder::of([products[0].id]))
            .await
            .unwrap();

        assert!(matches!(
            svc.cancel_order(&caller(8, "editor"), order.id).await,
            Err(ServiceError::Forbidden(_))
        ));

        svc.cancel_order(&owner, order.id).await.unwrap();
        let orders = svc.list_orders(&owner).await.unwrap();
        assert_eq!(orders[0].status, OrderStatus::Canceled);

        let err = svc.cancel_order(&owner, order.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::BusinessRule(_)));
        assert_eq!(err.to_string(), "only pending orders can be canceled");

        assert!(matches!(
            svc.cancel_order(&caller(8, "editor"), order.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            svc.cancel_order(&owner, OrderId::new(999)).await,
            Err(ServiceError::NotFound("order"))
        ));
    }

    #[tokio::test]
    async fn test_update_order_status_validates_and_checks_owner() {
        let store = MemoryStore::new();
        let products = seed_products(&store, 1).await;
        let svc = OrderService::new(&store);
        let order = svc
            .place_order(&caller(7, "user"), PlaceOrder::of([products[0].id]))
            .await
            .unwrap();

        assert!(matches!(
            svc.update_order_status(UserId::new(7), order.id, "shipped").await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            svc.update_order_status(UserId::new(8), order.id, "approved").await,
            Err(ServiceError::Forbidden(_))
        ));

        let updated = svc
            .update_order_status(UserId::new(7), order.id, "approved")
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Approved);
    }
}
