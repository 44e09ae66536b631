// src/models/quiz.rs

use serde::{Deserialize, Deserializer, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Quiz kind. Mapped onto the Postgres enum `quiz_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "quiz_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum QuizType {
    Single,
    Multiple,
    Judgement,
}

impl QuizType {
    /// Single-choice and true/false questions take at most one answer.
    pub fn is_single_answer(self) -> bool {
        matches!(self, QuizType::Single | QuizType::Judgement)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QuizType::Single => "single",
            QuizType::Multiple => "multiple",
            QuizType::Judgement => "judgement",
        }
    }
}

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,

    /// The question text.
    pub title: String,

    pub course_id: i64,

    /// Chapter label used to group quizzes into tabs.
    pub chapter: Option<String>,

    /// Mapped from the database column 'type' since `type` is a reserved keyword in Rust.
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub quiz_type: QuizType,

    pub remark: Option<String>,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'answer_options' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: i64,
    pub quiz_id: i64,
    pub content: String,
    pub is_correct: bool,
}

/// A quiz joined with its options in catalog order (ascending option id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizWithOptions {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub answer_options: Vec<AnswerOption>,
}

impl QuizWithOptions {
    /// Ids of the options flagged as correct, in catalog order.
    pub fn correct_option_ids(&self) -> Vec<i64> {
        self.answer_options
            .iter()
            .filter(|o| o.is_correct)
            .map(|o| o.id)
            .collect()
    }
}

/// Row used by the admin list, carrying the owning course title.
#[derive(Debug, Clone, Serialize)]
pub struct QuizListItem {
    #[serde(flatten)]
    pub quiz: QuizWithOptions,
    pub course_title: Option<String>,
}

/// Checks the per-type correct-option invariant.
///
/// `single`/`judgement` need exactly one correct option, `multiple` at least one.
pub fn check_correct_options(quiz_type: QuizType, flags: &[bool]) -> Result<(), String> {
    if flags.is_empty() {
        return Err("A quiz needs at least one answer option".to_string());
    }
    let correct = flags.iter().filter(|c| **c).count();
    match quiz_type {
        QuizType::Single | QuizType::Judgement if correct != 1 => Err(format!(
            "A {} quiz must have exactly one correct option, got {}",
            quiz_type.as_str(),
            correct
        )),
        QuizType::Multiple if correct == 0 => {
            Err("A multiple quiz must have at least one correct option".to_string())
        }
        _ => Ok(()),
    }
}

/// DTO for an answer option on quiz creation.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AnswerOptionInput {
    #[validate(length(min = 1, max = 1000))]
    pub content: String,
    pub is_correct: bool,
}

/// DTO for creating a quiz together with its options.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 2000))]
    pub title: String,
    pub course_id: i64,
    #[serde(rename = "type")]
    pub quiz_type: QuizType,
    #[validate(length(max = 100))]
    pub chapter: Option<String>,
    #[validate(length(max = 2000))]
    pub remark: Option<String>,
    #[validate(length(min = 1, max = 26), nested)]
    pub options: Vec<AnswerOptionInput>,
}

impl CreateQuizRequest {
    pub fn check_options(&self) -> Result<(), String> {
        let flags: Vec<bool> = self.options.iter().map(|o| o.is_correct).collect();
        check_correct_options(self.quiz_type, &flags)
    }
}

/// DTO for an option on quiz update. Options without an id are inserted.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpsertAnswerOption {
    pub id: Option<i64>,
    #[validate(length(min = 1, max = 1000))]
    pub content: String,
    pub is_correct: bool,
}

/// Keeps an explicit `null` apart from a missing field.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn check_clearable_length(
    value: &Option<Option<String>>,
    max: usize,
    code: &'static str,
) -> Result<(), validator::ValidationError> {
    match value {
        Some(Some(text)) if text.chars().count() > max => {
            Err(validator::ValidationError::new(code))
        }
        _ => Ok(()),
    }
}

fn validate_clearable_fields(req: &UpdateQuizRequest) -> Result<(), validator::ValidationError> {
    check_clearable_length(&req.chapter, 100, "chapter_too_long")?;
    check_clearable_length(&req.remark, 2000, "remark_too_long")
}

/// DTO for updating a quiz. Fields are optional.
///
/// `chapter` and `remark` distinguish a missing field (keep) from `null` (clear).
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "validate_clearable_fields"))]
pub struct UpdateQuizRequest {
    #[validate(length(min = 1, max = 2000))]
    pub title: Option<String>,
    pub course_id: Option<i64>,
    #[serde(rename = "type")]
    pub quiz_type: Option<QuizType>,
    #[serde(default, deserialize_with = "double_option")]
    pub chapter: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub remark: Option<Option<String>>,
    #[validate(nested)]
    pub options: Option<Vec<UpsertAnswerOption>>,
}
