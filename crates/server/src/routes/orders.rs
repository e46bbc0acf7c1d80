//! Order route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tracing::instrument;

use instashop_core::OrderId;

use super::accounts::MessageResponse;
use super::extract::{ApiJson, ApiPath};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::Order;
use crate::services::PlaceOrder;
use crate::state::AppState;

/// Body for a placed order.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub order: Order,
}

/// Body for an order list.
#[derive(Debug, Serialize)]
pub struct OrdersResponse {
    pub orders: Vec<Order>,
}

/// Place an order for the caller.
#[instrument(skip(state, identity, input), fields(user_id = %identity.user_id))]
pub async fn place(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    ApiJson(input): ApiJson<PlaceOrder>,
) -> Result<(StatusCode, Json<OrderResponse>)> {
    let order = state.orders().place_order(&identity, input).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse { order })))
}

/// List the caller's orders.
#[instrument(skip(state, identity), fields(user_id = %identity.user_id))]
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
) -> Result<Json<OrdersResponse>> {
    let orders = state.orders().list_orders(&identity).await?;
    Ok(Json(OrdersResponse { orders }))
}

/// Cancel one of the caller's pending orders.
#[instrument(skip(state, identity), fields(user_id = %identity.user_id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    ApiPath(order_id): ApiPath<OrderId>,
) -> Result<Json<MessageResponse>> {
    state.orders().cancel_order(&identity, order_id).await?;

    Ok(Json(MessageResponse {
        message: "Order canceled successfully",
    }))
}
