// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        category::{CreateCategoryRequest, UpdateCategoryRequest},
        common::ListParams,
        course::CourseRequest,
        quiz::{CreateQuizRequest, UpdateQuizRequest},
    },
    repository::DynRepository,
    services::category::would_cycle,
    utils::html::{clean_html, clean_opt},
};

/// Creates a category, optionally under a parent.
/// Admin only.
pub async fn create_category(
    State(repo): State<DynRepository>,
    Json(mut payload): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    payload.name = clean_html(&payload.name);
    clean_opt(&mut payload.remark);

    let id = repo.create_category(&payload).await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Replaces a category's name, parent and remark.
/// Admin only. Rejects moves that would make a category its own ancestor.
pub async fn update_category(
    State(repo): State<DynRepository>,
    Path(id): Path<i64>,
    Json(mut payload): Json<UpdateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    payload.name = clean_html(&payload.name);
    clean_opt(&mut payload.remark);

    if let Some(parent_id) = payload.parent_id {
        let categories = repo.list_categories().await?;
        if would_cycle(&categories, id, parent_id) {
            return Err(AppError::BadRequest(
                "A category cannot be moved under itself or its descendants".to_string(),
            ));
        }
    }

    repo.update_category(id, &payload).await?;
    Ok(StatusCode::OK)
}

/// Deletes a category and its subtree.
/// Admin only. Courses in the subtree are kept without a category.
pub async fn delete_category(
    State(repo): State<DynRepository>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    repo.delete_category(id).await?;
    tracing::info!("Deleted category {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Creates a new course.
/// Admin only.
pub async fn create_course(
    State(repo): State<DynRepository>,
    Json(mut payload): Json<CourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    payload.title = clean_html(&payload.title);
    clean_opt(&mut payload.description);

    let id = repo.create_course(&payload).await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Replaces a course.
/// Admin only.
pub async fn update_course(
    State(repo): State<DynRepository>,
    Path(id): Path<i64>,
    Json(mut payload): Json<CourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    payload.title = clean_html(&payload.title);
    clean_opt(&mut payload.description);

    repo.update_course(id, &payload).await?;
    Ok(StatusCode::OK)
}

/// Deletes a course and every quiz in it.
/// Admin only.
pub async fn delete_course(
    State(repo): State<DynRepository>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    repo.delete_course(id).await?;
    tracing::info!("Deleted course {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Lists quizzes with their options and answer key.
/// Admin only.
pub async fn list_quizzes(
    State(repo): State<DynRepository>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(repo.list_quizzes(&params).await?))
}

/// Retrieves one quiz with its options and answer key.
/// Admin only.
pub async fn get_quiz(
    State(repo): State<DynRepository>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = repo
        .get_quiz(id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    Ok(Json(quiz))
}

/// Creates a quiz and its answer options in one transaction.
/// Admin only.
pub async fn create_quiz(
    State(repo): State<DynRepository>,
    Json(mut payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    payload.check_options().map_err(AppError::BadRequest)?;

    payload.title = clean_html(&payload.title);
    clean_opt(&mut payload.chapter);
    clean_opt(&mut payload.remark);
    for option in &mut payload.options {
        option.content = clean_html(&option.content);
    }

    let id = repo.create_quiz(&payload).await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Updates a quiz. Options with an id are edited, options without one are added.
/// A `null` chapter or remark clears it.
/// Admin only. The whole change is rolled back if the answer key ends up invalid.
pub async fn update_quiz(
    State(repo): State<DynRepository>,
    Path(id): Path<i64>,
    Json(mut payload): Json<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if let Some(title) = payload.title.as_mut() {
        *title = clean_html(title);
    }
    for field in [&mut payload.chapter, &mut payload.remark].into_iter().flatten() {
        clean_opt(field);
    }
    for option in payload.options.iter_mut().flatten() {
        option.content = clean_html(&option.content);
    }

    repo.update_quiz(id, &payload).await?;
    Ok(StatusCode::OK)
}

/// Deletes a quiz and its options. Test records keep their copy of the ids.
/// Admin only.
pub async fn delete_quiz(
    State(repo): State<DynRepository>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    repo.delete_quiz(id).await?;
    tracing::info!("Deleted quiz {}", id);
    Ok(StatusCode::NO_CONTENT)
}
