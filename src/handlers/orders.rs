use super::common::{no_content_response, pdf_response, success_response, text_response};
use crate::{errors::ServiceError, AppState};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct LineQuantity {
    pub product_id: i32,
    pub quantity: i32,
}

/// New absolute quantities for lines of a committed order. Lines not listed keep theirs.
#[derive(Debug, Deserialize)]
pub struct EditOrderRequest {
    pub lines: Vec<LineQuantity>,
}

#[derive(Debug, Serialize)]
pub struct EditOutcome {
    pub order_id: i32,
    pub lines_written: usize,
}

pub fn orders_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route(
            "/:id",
            get(get_order).put(edit_order).delete(delete_order),
        )
        .route("/:id/summary", get(order_summary_text))
        .route("/:id/summary.pdf", get(order_summary_pdf))
}

async fn list_orders(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let orders = state.orders.list_orders().await?;
    Ok(success_response(orders))
}

async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let view = state.orders.order_details(id).await?;
    Ok(success_response(view))
}

/// Applies every requested quantity against live stock before writing anything.
async fn edit_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<EditOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let mut edit = state.orders.load_edit(id).await?;
    for line in &payload.lines {
        state
            .orders
            .set_line(&mut edit, line.product_id, line.quantity)
            .await?;
    }
    let lines_written = state.orders.save_edit(&edit).await?;
    Ok(success_response(EditOutcome {
        order_id: id,
        lines_written,
    }))
}

async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    state.orders.delete_order(id).await?;
    Ok(no_content_response())
}

async fn order_summary_text(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let summary = state.reports.order_summary(id).await?;
    Ok(text_response(
        summary.render_text(&state.config.currency_symbol),
    ))
}

async fn order_summary_pdf(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let summary = state.reports.order_summary(id).await?;
    Ok(pdf_response(
        &format!("order-{}.pdf", id),
        summary.render_pdf(&state.config.currency_symbol)?,
    ))
}
