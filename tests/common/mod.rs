#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    Router,
};
use rust_decimal::Decimal;
use sea_orm::EntityTrait;
use serde_json::Value;
use stockroom::{
    config::AppConfig,
    db::{self, DbPool},
    entities::product,
    models::AssignmentSelector,
    services::{
        products::NewProduct, CatalogService, OrderService, OrderSettings, ProductService,
        ReportService,
    },
    AppState,
};
use tower::ServiceExt;

/// Application state over a fresh in-memory SQLite database with the schema applied.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::new(
        "sqlite::memory:".to_string(),
        "127.0.0.1".to_string(),
        18_080,
        "test".to_string(),
    );
    // one connection, otherwise every connection sees its own empty database
    cfg.db_max_connections = 1;
    cfg.db_min_connections = 1;
    cfg
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_settings(settings: OrderSettings) -> Self {
        let mut cfg = test_config();
        cfg.revalidate_stock_on_commit = settings.revalidate_stock_on_commit;
        cfg.restock_on_order_delete = settings.restock_on_order_delete;
        Self::with_config(cfg).await
    }

    pub async fn with_config(cfg: AppConfig) -> Self {
        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to open in-memory database");
        db::run_migrations(&pool)
            .await
            .expect("failed to apply migrations");

        let state = AppState::new(Arc::new(pool), Arc::new(cfg));
        let router = stockroom::app(state.clone());
        Self { router, state }
    }

    pub fn db(&self) -> &DbPool {
        &self.state.db
    }

    pub fn catalog(&self) -> &CatalogService {
        &self.state.catalog
    }

    pub fn products(&self) -> &ProductService {
        &self.state.products
    }

    pub fn orders(&self) -> &OrderService {
        &self.state.orders
    }

    pub fn reports(&self) -> &ReportService {
        &self.state.reports
    }

    /// Creates the assignment when missing and a product under it.
    pub async fn seed_product(
        &self,
        name: &str,
        category: &str,
        parent: &str,
        amount: i32,
        price: Decimal,
    ) -> product::Model {
        let selector = AssignmentSelector::names(category, parent);
        if selector.resolve(self.db()).await.is_err() {
            self.catalog()
                .add_assignment(category, parent)
                .await
                .expect("failed to seed assignment");
        }

        self.products()
            .create_product(NewProduct {
                name: name.to_string(),
                description: format!("{} description", name),
                amount,
                price,
                image: vec![0x89, 0x50, 0x4e, 0x47],
                assignment: selector,
            })
            .await
            .expect("failed to seed product")
    }

    pub async fn stock_of(&self, product_id: i32) -> i32 {
        product::Entity::find_by_id(product_id)
            .one(self.db())
            .await
            .expect("stock query failed")
            .expect("product missing")
            .amount
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

pub async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body")
        .to_vec()
}

pub async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("parse response body")
}
