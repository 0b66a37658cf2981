use super::common::{created_response, decode_image, no_content_response, success_response};
use crate::{
    errors::ServiceError,
    models::AssignmentSelector,
    services::products::{NewProduct, ProductUpdate},
    AppState,
};
use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub amount: i32,
    pub price: Decimal,
    pub image_base64: String,
    pub assignment: AssignmentSelector,
}

impl CreateProductRequest {
    fn into_input(self) -> Result<NewProduct, ServiceError> {
        Ok(NewProduct {
            image: decode_image("image_base64", &self.image_base64)?,
            name: self.name,
            description: self.description,
            amount: self.amount,
            price: self.price,
            assignment: self.assignment,
        })
    }
}

/// Without `image_base64` the stored image is kept.
#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: String,
    pub description: String,
    pub amount: i32,
    pub price: Decimal,
    #[serde(default)]
    pub image_base64: Option<String>,
    pub assignment: AssignmentSelector,
}

impl UpdateProductRequest {
    fn into_input(self) -> Result<ProductUpdate, ServiceError> {
        let image = self
            .image_base64
            .as_deref()
            .map(|encoded| decode_image("image_base64", encoded))
            .transpose()?;
        Ok(ProductUpdate {
            name: self.name,
            description: self.description,
            amount: self.amount,
            price: self.price,
            image,
            assignment: self.assignment,
        })
    }
}

pub fn products_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/:id/image", get(product_image))
}

async fn list_products(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let rows = state.products.list_products().await?;
    Ok(success_response(rows))
}

async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state
        .products
        .create_product(payload.into_input()?)
        .await?;
    let detail = state.products.get_product(created.id).await?;
    Ok(created_response(detail))
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let detail = state.products.get_product(id).await?;
    Ok(success_response(detail))
}

async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .products
        .update_product(id, payload.into_input()?)
        .await?;
    let detail = state.products.get_product(id).await?;
    Ok(success_response(detail))
}

async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    state.products.delete_product(id).await?;
    Ok(no_content_response())
}

async fn product_image(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let bytes = state.products.product_image(id).await?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes))
}
