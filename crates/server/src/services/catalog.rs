//! Catalog service: products owned by admins and editors.
//!
//! Every operation consults the authorization table before touching the store.

use serde::Deserialize;

use instashop_core::{Action, Price, ProductId};

use super::{Identity, ServiceError};
use crate::config::PolicyConfig;
use crate::db::Store;
use crate::models::{NewProduct, Product};

/// Input for creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProduct {
    pub name: String,
    pub description: String,
    pub price: Price,
}

/// Fields an update may overwrite.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProduct {
    pub name: String,
    pub price: Price,
}

/// Catalog service.
pub struct CatalogService<'a> {
    store: &'a dyn Store,
    policy: PolicyConfig,
}

impl<'a> CatalogService<'a> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(store: &'a dyn Store, policy: PolicyConfig) -> Self {
        Self { store, policy }
    }

    /// Create a pending product owned by the caller.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` for roles outside admin/editor and
    /// `Validation` for an empty name or description or a zero price.
    pub async fn create(
        &self,
        caller: &Identity,
        input: CreateProduct,
    ) -> Result<Product, ServiceError> {
        caller.authorize(Action::CreateProduct)?;

        let name = require_text("name", &input.name)?;
        let description = require_text("description", &input.description)?;
        require_positive(input.price)?;

        let product = self
            .store
            .create_product(NewProduct {
                user_id: caller.user_id,
                name,
                description,
                price: input.price,
            })
            .await?;

        tracing::info!(product_id = %product.id, user_id = %caller.user_id, "Product created");
        Ok(product)
    }

    /// Fetch one of the caller's products.
    ///
    /// A product owned by someone else is reported as not found.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if no product with this id belongs to the caller.
    pub async fn get(&self, caller: &Identity, id: ProductId) -> Result<Product, ServiceError> {
        caller.authorize(Action::GetProduct)?;

        self.store
            .product(id, Some(caller.user_id))
            .await?
            .ok_or(ServiceError::NotFound("product"))
    }

    /// All of the caller's products, in creation order.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` for roles outside admin/editor.
    pub async fn list(&self, caller: &Identity) -> Result<Vec<Product>, ServiceError> {
        caller.authorize(Action::ListProductsByOwner)?;

        Ok(self.store.products_by_owner(caller.user_id).await?)
    }

    /// Overwrite a product's name and price.
    ///
    /// Ownership is only enforced when `PolicyConfig::strict_product_update` is set.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for an empty name or zero price, and
    /// `NotFound` if the product does not exist (or is not the caller's under
    /// the strict policy).
    pub async fn update(
        &self,
        caller: &Identity,
        id: ProductId,
        patch: UpdateProduct,
    ) -> Result<Product, ServiceError> {
        caller.authorize(Action::UpdateProduct)?;

        let name = require_text("name", &patch.name)?;
        require_positive(patch.price)?;

        let owner = self
            .policy
            .strict_product_update
            .then_some(caller.user_id);
        let mut product = self
            .store
            .product(id, owner)
            .await?
            .ok_or(ServiceError::NotFound("product"))?;

        product.name = name;
        product.price = patch.price;

        let saved = self.store.save_product(&product).await?;
        tracing::info!(product_id = %saved.id, user_id = %caller.user_id, "Product updated");
        Ok(saved)
    }

    /// Delete one of the caller's products while it is still pending.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NoMatchingPendingProduct` when id, owner and
    /// pending status do not all match.
    pub async fn delete_pending(&self, caller: &Identity, id: ProductId) -> Result<(), ServiceError> {
        caller.authorize(Action::DeletePendingProduct)?;

        let deleted = self
            .store
            .delete_pending_product(id, caller.user_id)
            .await?;
        if deleted == 0 {
            return Err(ServiceError::NoMatchingPendingProduct);
        }

        tracing::info!(product_id = %id, user_id = %caller.user_id, "Product deleted");
        Ok(())
    }
}

fn require_text(field: &str, value: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_owned())
}

fn require_positive(price: Price) -> Result<(), ServiceError> {
    if price.is_zero() {
        return Err(ServiceError::Validation(
            "price must be greater than zero".to_owned(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use instashop_core::{ProductStatus, UserId};

    use super::*;
    use crate::db::MemoryStore;

    fn caller(id: i32, role: &str) -> Identity {
        Identity {
            user_id: UserId::new(id),
            role: role.to_owned(),
        }
    }

    fn price(s: &str) -> Price {
        Price::new(s.parse().unwrap()).unwrap()
    }

    fn widget() -> CreateProduct {
        CreateProduct {
            name: "Widget".to_owned(),
            description: "A widget".to_owned(),
            price: price("9.99"),
        }
    }

    #[tokio::test]
    async fn test_create_sets_owner_and_pending_status() {
        let store = MemoryStore::new();
        let svc = CatalogService::new(&store, PolicyConfig::default());

        let product = svc.create(&caller(42, "editor"), widget()).await.unwrap();
        assert_eq!(product.user_id, UserId::new(42));
        assert_eq!(product.status, ProductStatus::Pending);
        assert_eq!(product.price, price("9.99"));
    }

    #[tokio::test]
    async fn test_create_validates_before_writing() {
        let store = MemoryStore::new();
        let svc = CatalogService::new(&store, PolicyConfig::default());
        let admin = caller(1, "admin");

        let mut input = widget();
        input.name = "  ".to_owned();
        assert!(matches!(svc.create(&admin, input).await, Err(ServiceError::Validation(_))));

        let mut input = widget();
        input.description = String::new();
        assert!(matches!(svc.create(&admin, input).await, Err(ServiceError::Validation(_))));

        let mut input = widget();
        input.price = Price::zero();
        assert!(matches!(svc.create(&admin, input).await, Err(ServiceError::Validation(_))));

        assert!(svc.list(&admin).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shopper_role_is_forbidden() {
        let store = MemoryStore::new();
        let svc = CatalogService::new(&store, PolicyConfig::default());

        let err = svc.create(&caller(7, "user"), widget()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_get_hides_other_owners_products() {
        let store = MemoryStore::new();
        let svc = CatalogService::new(&store, PolicyConfig::default());
        let product = svc.create(&caller(42, "admin"), widget()).await.unwrap();

        assert_eq!(svc.get(&caller(42, "admin"), product.id).await.unwrap(), product);
        assert!(matches!(
            svc.get(&caller(43, "admin"), product.id).await,
            Err(ServiceError::NotFound("product"))
        ));
    }

    #[tokio::test]
    async fn test_list_returns_only_own_products_in_order() {
        let store = MemoryStore::new();
        let svc = CatalogService::new(&store, PolicyConfig::default());
        let first = svc.create(&caller(1, "admin"), widget()).await.unwrap();
        svc.create(&caller(2, "admin"), widget()).await.unwrap();
        let third = svc.create(&caller(1, "admin"), widget()).await.unwrap();

        let ids: Vec<_> = svc
            .list(&caller(1, "admin"))
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![first.id, third.id]);
    }

    #[tokio::test]
    async fn test_update_overwrites_name_and_price_only() {
        let store = MemoryStore::new();
        let svc = CatalogService::new(&store, PolicyConfig::default());
        let product = svc.create(&caller(42, "admin"), widget()).await.unwrap();

        let updated = svc
            .update(
                &caller(99, "editor"),
                product.id,
                UpdateProduct {
                    name: "Gadget".to_owned(),
                    price: price("12.50"),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Gadget");
        assert_eq!(updated.price, price("12.50"));
        assert_eq!(updated.description, "A widget");
        assert_eq!(updated.user_id, UserId::new(42));
    }

    #[tokio::test]
    async fn test_strict_update_scopes_by_owner() {
        let store = MemoryStore::new();
        let svc = CatalogService::new(
            &store,
            PolicyConfig {
                strict_product_update: true,
            },
        );
        let product = svc.create(&caller(42, "admin"), widget()).await.unwrap();
        let patch = UpdateProduct {
            name: "Gadget".to_owned(),
            price: price("1.00"),
        };

        assert!(matches!(
            svc.update(&caller(99, "editor"), product.id, patch.clone()).await,
            Err(ServiceError::NotFound("product"))
        ));
        assert!(svc.update(&caller(42, "admin"), product.id, patch).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_pending_matches_id_owner_and_status() {
        let store = MemoryStore::new();
        let svc = CatalogService::new(&store, PolicyConfig::default());
        let owner = caller(42, "admin");
        let product = svc.create(&owner, widget()).await.unwrap();

        assert!(matches!(
            svc.delete_pending(&caller(43, "admin"), product.id).await,
            Err(ServiceError::NoMatchingPendingProduct)
        ));

        store
            .set_product_status(product.id, ProductStatus::Approved)
            .await
            .unwrap();
        assert!(matches!(
            svc.delete_pending(&owner, product.id).await,
            Err(ServiceError::NoMatchingPendingProduct)
        ));

        store
            .set_product_status(product.id, ProductStatus::Pending)
            .await
            .unwrap();
        svc.delete_pending(&owner, product.id).await.unwrap();
        assert!(matches!(
            svc.get(&owner, product.id).await,
            Err(ServiceError::NotFound("product"))
        ));
    }
}
