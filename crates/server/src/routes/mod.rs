//! HTTP route handlers for the Instashop API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                        - Liveness check
//! GET  /health/ready                  - Readiness check (database ping)
//!
//! # Accounts
//! POST /v1/auth/users/create          - Register a shopper
//! POST /v1/auth/verify-email          - Verify email with one-time code
//! POST /v1/auth/send-email            - Re-send verification code
//! POST /v1/auth/login                 - Exchange credentials for a bearer token
//!
//! # Products (bearer token, admin or editor)
//! POST   /v1/products                 - Create product
//! GET    /v1/products                 - List own products
//! GET    /v1/products/{product_id}    - Show own product
//! PATCH  /v1/products/{product_id}    - Update name and price
//! DELETE /v1/products/{product_id}    - Delete own pending product
//!
//! # Orders (bearer token)
//! POST /v1/orders                     - Place order
//! GET  /v1/orders                     - List own orders
//! POST /v1/orders/{order_id}/cancel   - Cancel own pending order
//! ```

pub mod accounts;
pub mod extract;
pub mod orders;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the account routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/users/create", post(accounts::register))
        .route("/verify-email", post(accounts::verify_email))
        .route("/send-email", post(accounts::send_email))
        .route("/login", post(accounts::login))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(products::create).get(products::list))
        .route(
            "/{product_id}",
            get(products::show)
                .patch(products::update)
                .delete(products::delete),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::place).get(orders::list))
        .route("/{order_id}/cancel", post(orders::cancel))
}

/// Create all versioned API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/v1/auth", auth_routes())
        .nest("/v1/products", product_routes())
        .nest("/v1/orders", order_routes())
}
