// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::test_record::{SubmitTestRequest, SubmitTestResponse},
    repository::{DynRepository, Repository},
    services::{
        presenter::{ChapterTab, group_into_tabs, present},
        record::build_record,
        scoring::{grade, validate_submission},
    },
    utils::{html::clean_html, jwt::CurrentUser},
};

/// Query parameters for presenting an attempt.
#[derive(Debug, Default, Deserialize)]
pub struct PresentParams {
    /// Restrict the attempt to one chapter.
    pub chapter: Option<String>,
    /// Include the answer key. Admin only.
    #[serde(default)]
    pub with_answers: bool,
}

/// A freshly shuffled attempt, grouped by chapter.
#[derive(Debug, Serialize, Deserialize)]
pub struct AttemptResponse {
    pub course_id: i64,
    pub course_title: String,
    pub tabs: Vec<ChapterTab>,
}

/// Presents every quiz of a course in a new random order.
///
/// Each call reshuffles; nothing is cached. Correctness flags are only
/// included for admins who ask for them.
pub async fn present_course(
    State(repo): State<DynRepository>,
    Extension(current): Extension<CurrentUser>,
    Path(course_id): Path<i64>,
    Query(params): Query<PresentParams>,
) -> Result<impl IntoResponse, AppError> {
    if params.with_answers && !current.is_admin() {
        return Err(AppError::Forbidden(
            "Only administrators may view correct answers".to_string(),
        ));
    }

    let course = repo
        .get_course(course_id)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;

    let mut quizzes = repo.find_quizzes_by_course(course_id).await?;
    if let Some(chapter) = params.chapter.as_deref() {
        quizzes.retain(|q| q.quiz.chapter.as_deref() == Some(chapter));
    }

    let views = {
        let mut rng = rand::rng();
        present(quizzes, params.with_answers, &mut rng)
    };

    Ok(Json(AttemptResponse {
        course_id: course.id,
        course_title: course.title,
        tabs: group_into_tabs(views),
    }))
}

/// Grades a submission and, for a known user, stores it as a test record.
///
/// Validation runs on the raw payload before any read; the title is sanitized after.
/// The catalog is read once for all quizzes. An attempt in which no quiz could be
/// graded is not stored.
pub async fn score(
    repo: &dyn Repository,
    mut req: SubmitTestRequest,
    user_id: Option<i64>,
) -> Result<SubmitTestResponse, AppError> {
    validate_submission(&req)?;
    req.title = clean_html(&req.title);

    let ids: Vec<i64> = req.quizzes.iter().map(|q| q.quiz_id).collect();
    let catalog = repo.find_quizzes_by_ids(&ids).await?;
    let graded = grade(&req, &catalog);

    if graded.results.len() < req.quizzes.len() {
        tracing::warn!(
            "{} submitted quizzes no longer exist and were skipped",
            req.quizzes.len() - graded.results.len()
        );
    }

    let record_id = match user_id {
        Some(_) if graded.results.is_empty() => {
            tracing::warn!("Nothing left to grade, test record not stored");
            None
        }
        Some(user_id) => {
            let record = build_record(&req, &graded.graded_ids(), graded.ratio, user_id);
            let id = repo.insert_test_record(&record).await?;
            tracing::info!(
                "Saved test record {} for user {} ({}/{})",
                id,
                user_id,
                graded.ratio.0,
                graded.ratio.1
            );
            Some(id)
        }
        None => None,
    };

    Ok(SubmitTestResponse {
        results: graded.results,
        correct_ratio: graded.ratio,
        record_id,
    })
}

/// Submits an attempt. Anonymous callers get their score without a record.
pub async fn submit_test(
    State(repo): State<DynRepository>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<SubmitTestRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = score(repo.as_ref(), req, current.id()).await?;
    Ok(Json(response))
}
