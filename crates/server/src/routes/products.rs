//! Product route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tracing::instrument;

use instashop_core::ProductId;

use super::accounts::MessageResponse;
use super::extract::{ApiJson, ApiPath};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::Product;
use crate::services::{CreateProduct, UpdateProduct};
use crate::state::AppState;

/// Body for a created product.
#[derive(Debug, Serialize)]
pub struct CreatedProductResponse {
    pub message: &'static str,
    pub product: Product,
}

/// Body for a single product.
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub product: Product,
}

/// Body for a product list.
#[derive(Debug, Serialize)]
pub struct ProductsResponse {
    pub products: Vec<Product>,
}

/// Create a product owned by the caller.
#[instrument(skip(state, identity), fields(user_id = %identity.user_id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    ApiJson(input): ApiJson<CreateProduct>,
) -> Result<(StatusCode, Json<CreatedProductResponse>)> {
    let product = state.catalog().create(&identity, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedProductResponse {
            message: "Product created successfully",
            product,
        }),
    ))
}

/// List the caller's products.
#[instrument(skip(state, identity), fields(user_id = %identity.user_id))]
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
) -> Result<Json<ProductsResponse>> {
    let products = state.catalog().list(&identity).await?;
    Ok(Json(ProductsResponse { products }))
}

/// Fetch one of the caller's products.
#[instrument(skip(state, identity), fields(user_id = %identity.user_id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<Json<ProductResponse>> {
    let product = state.catalog().get(&identity, product_id).await?;
    Ok(Json(ProductResponse { product }))
}

/// Overwrite a product's name and price.
#[instrument(skip(state, identity), fields(user_id = %identity.user_id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    ApiPath(product_id): ApiPath<ProductId>,
    ApiJson(patch): ApiJson<UpdateProduct>,
) -> Result<Json<ProductResponse>> {
    let product = state.catalog().update(&identity, product_id, patch).await?;
    Ok(Json(ProductResponse { product }))
}

/// Delete one of the caller's pending products.
#[instrument(skip(state, identity), fields(user_id = %identity.user_id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<Json<MessageResponse>> {
    state.catalog().delete_pending(&identity, product_id).await?;

    Ok(Json(MessageResponse {
        message: "Product deleted successfully",
    }))
}
