// src/repository/mod.rs

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        category::{Category, CreateCategoryRequest, UpdateCategoryRequest},
        common::{ListParams, Page},
        course::{Course, CourseRequest},
        quiz::{CreateQuizRequest, QuizListItem, QuizWithOptions, UpdateQuizRequest},
        test_record::{NewTestRecord, TestRecord, TestRecordSummary},
        user::User,
    },
};

pub mod postgres;

pub use postgres::PgRepository;

/// Shared handle stored in the application state.
pub type DynRepository = Arc<dyn Repository>;

/// Every query the handlers need.
///
/// Quiz reads return options in catalog order (ascending id).
/// Mutations report a missing row as `AppError::NotFound`.
#[async_trait]
pub trait Repository: Send + Sync {
    // Users
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    /// Fails with `Conflict` when the username is taken.
    async fn create_user(&self, username: &str, password_hash: &str, role: &str) -> Result<User, AppError>;

    // Categories
    async fn list_categories(&self) -> Result<Vec<Category>, AppError>;
    async fn create_category(&self, req: &CreateCategoryRequest) -> Result<i64, AppError>;
    async fn update_category(&self, id: i64, req: &UpdateCategoryRequest) -> Result<(), AppError>;
    /// Deletes the subtree; courses under it lose their category.
    async fn delete_category(&self, id: i64) -> Result<(), AppError>;

    // Courses
    async fn list_courses(&self, params: &ListParams) -> Result<Page<Course>, AppError>;
    async fn get_course(&self, id: i64) -> Result<Option<Course>, AppError>;
    async fn create_course(&self, req: &CourseRequest) -> Result<i64, AppError>;
    async fn update_course(&self, id: i64, req: &CourseRequest) -> Result<(), AppError>;
    /// Deletes the course together with its quizzes and their options.
    async fn delete_course(&self, id: i64) -> Result<(), AppError>;

    // Quizzes
    async fn list_quizzes(&self, params: &ListParams) -> Result<Page<QuizListItem>, AppError>;
    async fn get_quiz(&self, id: i64) -> Result<Option<QuizWithOptions>, AppError>;
    async fn find_quizzes_by_course(&self, course_id: i64) -> Result<Vec<QuizWithOptions>, AppError>;
    /// One snapshot for the whole id set. Unknown ids are silently absent.
    async fn find_quizzes_by_ids(&self, ids: &[i64]) -> Result<Vec<QuizWithOptions>, AppError>;
    /// Inserts the quiz and its options atomically.
    async fn create_quiz(&self, req: &CreateQuizRequest) -> Result<i64, AppError>;
    /// Updates fields and upserts options atomically, re-checking the correct-option rule.
    async fn update_quiz(&self, id: i64, req: &UpdateQuizRequest) -> Result<(), AppError>;
    async fn delete_quiz(&self, id: i64) -> Result<(), AppError>;

    // Test records
    async fn insert_test_record(&self, record: &NewTestRecord) -> Result<i64, AppError>;
    async fn get_test_record(&self, id: i64) -> Result<Option<TestRecord>, AppError>;
    /// Newest first. `user_id` restricts to one owner; the keyword matches titles.
    async fn list_test_records(
        &self,
        user_id: Option<i64>,
        params: &ListParams,
    ) -> Result<Page<TestRecordSummary>, AppError>;
}
