// src/handlers/catalog.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::common::ListParams,
    repository::DynRepository,
    services::category::with_descendants,
};

/// Lists every category with the ids of its descendants.
pub async fn list_categories(State(repo): State<DynRepository>) -> Result<impl IntoResponse, AppError> {
    let categories = repo.list_categories().await?;
    Ok(Json(with_descendants(categories)))
}

/// Lists courses page by page, optionally filtered by a keyword.
pub async fn list_courses(
    State(repo): State<DynRepository>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(repo.list_courses(&params).await?))
}

/// Retrieves a single course by ID.
pub async fn get_course(
    State(repo): State<DynRepository>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let course = repo
        .get_course(id)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;

    Ok(Json(course))
}
