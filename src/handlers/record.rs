// src/handlers/record.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::{common::ListParams, test_record::RecordDetail},
    repository::{DynRepository, Repository},
    services::record::reconstruct,
    utils::jwt::AuthUser,
};

/// Loads a record and replays it against the current catalog.
///
/// Only the owner or an admin may see it.
pub async fn load_record_detail(
    repo: &dyn Repository,
    viewer: &AuthUser,
    id: i64,
) -> Result<RecordDetail, AppError> {
    let record = repo
        .get_test_record(id)
        .await?
        .ok_or(AppError::NotFound("Test record not found".to_string()))?;

    if record.user_id != viewer.id && !viewer.is_admin() {
        return Err(AppError::Forbidden("Not your test record".to_string()));
    }

    let catalog = repo.find_quizzes_by_ids(&record.quiz_ids).await?;
    reconstruct(&record, &catalog)
}

/// Lists the caller's own records, newest first.
pub async fn list_my_records(
    State(repo): State<DynRepository>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(repo.list_test_records(Some(user.id), &params).await?))
}

/// Replays one record. Owners and admins only.
pub async fn get_record(
    State(repo): State<DynRepository>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let detail = load_record_detail(repo.as_ref(), &user, id).await?;
    Ok(Json(detail))
}

/// Lists every user's records with a title keyword filter.
/// Admin only.
pub async fn list_all_records(
    State(repo): State<DynRepository>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(repo.list_test_records(None, &params).await?))
}
