use super::common::{pdf_response, success_response};
use crate::{errors::ServiceError, export, export::pdf, AppState};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SalesQuery {
    /// Defaults to today (UTC).
    pub date: Option<NaiveDate>,
}

pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/stock", get(stock_levels))
        .route("/stock.pdf", get(stock_levels_pdf))
        .route("/sales", get(sales))
        .route("/assignments", get(assignment_pairs))
        .route("/categories", get(products_per_category))
        .route("/orders", get(order_line_counts))
}

async fn stock_levels(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.reports.stock_levels().await?))
}

async fn stock_levels_pdf(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let levels = state.reports.stock_levels().await?;
    let text = export::render_stock_report(&levels);
    Ok(pdf_response("stock.pdf", pdf::render_text_pdf(&text)?))
}

async fn sales(
    State(state): State<AppState>,
    Query(query): Query<SalesQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    Ok(success_response(state.reports.sales_on(date).await?))
}

async fn assignment_pairs(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.reports.assignment_pairs().await?))
}

async fn products_per_category(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.reports.products_per_category().await?))
}

async fn order_line_counts(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.reports.order_line_counts().await?))
}
