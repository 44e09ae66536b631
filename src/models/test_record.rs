// src/models/test_record.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::Validate;

use crate::models::quiz::QuizType;

/// One selection: the chosen option id and its index in the order the user saw.
/// Serialized as a two-element array `[option_id, position]`.
pub type AnsweredTuple = (i64, u32);

/// Represents the 'test_records' table in the database.
///
/// `quiz_ids`, `answer_options_ids` and `answered_ids` are parallel lists:
/// entry `i` of each describes the same quiz.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TestRecord {
    pub id: i64,
    pub user_id: i64,
    pub title: String,

    /// Quiz ids in presentation order.
    pub quiz_ids: Vec<i64>,

    /// Per quiz, option ids in presentation order.
    pub answer_options_ids: Json<Vec<Vec<i64>>>,

    /// Per quiz, the user's selections.
    pub answered_ids: Json<Vec<Vec<AnsweredTuple>>>,

    /// `[correct_count, total_count]`.
    pub correct_ratio: Json<(i64, i64)>,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Row ready to be inserted. Built by `services::record::build_record`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTestRecord {
    pub user_id: i64,
    pub title: String,
    pub quiz_ids: Vec<i64>,
    pub answer_options_ids: Vec<Vec<i64>>,
    pub answered_ids: Vec<Vec<AnsweredTuple>>,
    pub correct_ratio: (i64, i64),
}

/// List view of a record, without the parallel lists.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TestRecordSummary {
    pub id: i64,
    pub user_id: i64,
    pub username: Option<String>,
    pub title: String,
    pub correct_ratio: Json<(i64, i64)>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// One quiz of a submitted attempt.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuizSubmission {
    pub quiz_id: i64,

    /// Option ids in the order they were shown.
    pub shown_option_ids: Vec<i64>,

    /// Missing or empty when the user skipped the quiz.
    #[serde(default)]
    pub answered: Option<Vec<AnsweredTuple>>,
}

/// DTO for submitting a quiz attempt.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct SubmitTestRequest {
    /// Derived by the client from course title and chapter.
    #[validate(length(min = 1, max = 100))]
    pub title: String,

    #[validate(length(min = 1, message = "At least one quiz must be submitted"))]
    pub quizzes: Vec<QuizSubmission>,
}

/// Per-quiz outcome returned after submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizResult {
    pub quiz_id: i64,
    pub correct_option_ids: Vec<i64>,
    pub is_correct: bool,
}

/// Response of the submit endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitTestResponse {
    pub results: Vec<QuizResult>,
    pub correct_ratio: (i64, i64),
    /// Present only for authenticated submissions.
    pub record_id: Option<i64>,
}

/// Option as shown in a reconstructed record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOption {
    pub id: i64,
    pub content: String,
    pub is_correct: bool,
}

/// Quiz as shown in a reconstructed record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordQuiz {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub quiz_type: QuizType,
    pub answer_options: Vec<RecordOption>,
    pub answered_ids: Vec<i64>,
}

/// Full replay of an attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordDetail {
    pub id: i64,
    pub title: String,
    pub correct_ratio: (i64, i64),
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub quizzes: Vec<RecordQuiz>,
}
