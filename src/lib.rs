//! stockroom
//!
//! Inventory and order bookkeeping for a single store: a two-level category taxonomy,
//! products with images and stock, an order cart that withdraws stock on commit, edits of
//! committed orders, and printable reports.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod export;
pub mod handlers;
pub mod migrator;
pub mod models;
pub mod repositories;
pub mod services;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::AppConfig,
    db::DbPool,
    models::OrderCart,
    services::{CatalogService, OrderService, OrderSettings, ProductService, ReportService},
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: Arc<AppConfig>,
    pub catalog: CatalogService,
    pub products: ProductService,
    pub orders: OrderService,
    pub reports: ReportService,
    /// The operator's cart between requests.
    pub cart: Arc<Mutex<OrderCart>>,
}

impl AppState {
    pub fn new(db: Arc<DbPool>, config: Arc<AppConfig>) -> Self {
        Self {
            catalog: CatalogService::new(db.clone()),
            products: ProductService::new(db.clone(), config.max_image_bytes),
            orders: OrderService::new(db.clone(), OrderSettings::from(&*config)),
            reports: ReportService::new(db.clone()),
            cart: Arc::new(Mutex::new(OrderCart::new())),
            db,
            config,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Every route under `/api/v1`.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/categories", handlers::categories::categories_routes())
        .nest("/products", handlers::products::products_routes())
        .nest("/cart", handlers::cart::cart_routes())
        .nest("/orders", handlers::orders::orders_routes())
        .nest("/reports", handlers::reports::report_routes())
}

/// Full application router with request tracing and CORS.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_v1_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match db::check_connection(&state.db).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "up", "database": "up" })),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded", "database": "down" })),
        ),
    }
}
