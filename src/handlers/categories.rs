use super::common::{created_response, success_response};
use crate::{errors::ServiceError, AppState};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AddAssignmentRequest {
    pub category: String,
    pub parent: String,
}

/// Either side may be omitted or blank to keep the current name.
#[derive(Debug, Default, Deserialize)]
pub struct RenameAssignmentRequest {
    pub category: Option<String>,
    pub parent: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignmentNames {
    pub category: String,
    pub parent: String,
}

pub fn categories_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(list_assignments)
                .post(add_assignment)
                .delete(delete_assignment),
        )
        .route("/:id", get(open_edit).put(rename_assignment))
}

async fn list_assignments(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let rows = state.catalog.list_assignments().await?;
    Ok(success_response(rows))
}

async fn add_assignment(
    State(state): State<AppState>,
    Json(payload): Json<AddAssignmentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let row = state
        .catalog
        .add_assignment(&payload.category, &payload.parent)
        .await?;
    Ok(created_response(row))
}

async fn open_edit(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let edit = state.catalog.open_edit(id).await?;
    Ok(success_response(edit))
}

async fn rename_assignment(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<RenameAssignmentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let edit = state.catalog.open_edit(id).await?;
    let row = state
        .catalog
        .rename_assignment(
            &edit,
            payload.category.as_deref(),
            payload.parent.as_deref(),
        )
        .await?;
    Ok(success_response(row))
}

/// `DELETE /categories?category=..&parent=..`
async fn delete_assignment(
    State(state): State<AppState>,
    Query(names): Query<AssignmentNames>,
) -> Result<impl IntoResponse, ServiceError> {
    let removal = state
        .catalog
        .delete_assignment(&names.category, &names.parent)
        .await?;
    Ok(success_response(removal))
}
