//! The operator's working cart. One cart per running server, guarded by the mutex in
//! [`AppState`].

use super::common::{created_response, no_content_response, success_response};
use crate::{
    errors::ServiceError,
    models::{CartLine, OrderCart},
    AppState,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: i32,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

/// Exactly one of `quantity` (absolute) or `delta` (relative).
#[derive(Debug, Deserialize)]
pub struct ChangeQuantityRequest {
    pub quantity: Option<i32>,
    pub delta: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct CartView<'a> {
    pub lines: &'a [CartLine],
    pub total: Decimal,
}

impl<'a> From<&'a OrderCart> for CartView<'a> {
    fn from(cart: &'a OrderCart) -> Self {
        Self {
            lines: cart.lines(),
            total: cart.total(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QuantityView {
    pub product_id: i32,
    pub quantity: i32,
}

pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(view_cart).delete(clear_cart))
        .route("/items", post(add_item))
        .route("/items/:product_id", put(change_quantity).delete(remove_item))
        .route("/commit", post(commit_cart))
}

async fn view_cart(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let cart = state.cart.lock().await;
    Ok(success_response(CartView::from(&*cart)))
}

async fn clear_cart(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    state.cart.lock().await.clear();
    Ok(no_content_response())
}

async fn add_item(
    State(state): State<AppState>,
    Json(payload): Json<AddItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let mut cart = state.cart.lock().await;
    let line = state
        .orders
        .add_to_cart(&mut cart, payload.product_id, payload.quantity)
        .await?;
    Ok(created_response(line))
}

async fn change_quantity(
    State(state): State<AppState>,
    Path(product_id): Path<i32>,
    Json(payload): Json<ChangeQuantityRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let mut cart = state.cart.lock().await;
    let quantity = match (payload.quantity, payload.delta) {
        (Some(quantity), None) => {
            state
                .orders
                .set_line(&mut *cart, product_id, quantity)
                .await?
        }
        (None, Some(delta)) => {
            state
                .orders
                .adjust_line(&mut *cart, product_id, delta)
                .await?
        }
        _ => {
            return Err(ServiceError::ValidationError(
                "Provide either quantity or delta".to_string(),
            ))
        }
    };
    Ok(success_response(QuantityView {
        product_id,
        quantity,
    }))
}

async fn remove_item(
    State(state): State<AppState>,
    Path(product_id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let mut cart = state.cart.lock().await;
    state.orders.remove_from_cart(&mut cart, product_id)?;
    Ok(no_content_response())
}

async fn commit_cart(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let mut cart = state.cart.lock().await;
    let receipt = state.orders.commit(&mut cart).await?;
    Ok(created_response(receipt))
}
