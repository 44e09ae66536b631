// src/services/record.rs

use std::collections::{HashMap, HashSet};

use crate::{
    error::AppError,
    models::{
        quiz::QuizWithOptions,
        test_record::{NewTestRecord, RecordDetail, RecordOption, RecordQuiz, SubmitTestRequest, TestRecord},
    },
};

/// Turns a graded submission into the parallel lists that get stored.
///
/// Only quizzes in `graded` are kept, so every stored quiz id was scored.
/// Shown order and answered tuples are copied verbatim.
pub fn build_record(
    req: &SubmitTestRequest,
    graded: &HashSet<i64>,
    ratio: (i64, i64),
    user_id: i64,
) -> NewTestRecord {
    let kept = req.quizzes.iter().filter(|q| graded.contains(&q.quiz_id));

    let mut quiz_ids = Vec::new();
    let mut answer_options_ids = Vec::new();
    let mut answered_ids = Vec::new();
    for quiz in kept {
        quiz_ids.push(quiz.quiz_id);
        answer_options_ids.push(quiz.shown_option_ids.clone());
        answered_ids.push(quiz.answered.clone().unwrap_or_default());
    }

    NewTestRecord {
        user_id,
        title: req.title.clone(),
        quiz_ids,
        answer_options_ids,
        answered_ids,
        correct_ratio: ratio,
    }
}

/// Replays a stored attempt against the current catalog.
///
/// Options come back in the stored presentation order with their current content.
/// Options added after the attempt are left out. A quiz that no longer exists
/// makes the whole reconstruction fail with `NotFound`.
pub fn reconstruct(record: &TestRecord, catalog: &[QuizWithOptions]) -> Result<RecordDetail, AppError> {
    let by_id: HashMap<i64, &QuizWithOptions> =
        catalog.iter().map(|q| (q.quiz.id, q)).collect();

    let orders = &record.answer_options_ids.0;
    let answered = &record.answered_ids.0;
    if orders.len() != record.quiz_ids.len() || answered.len() != record.quiz_ids.len() {
        return Err(AppError::InternalServerError(format!(
            "Test record {} has misaligned quiz lists",
            record.id
        )));
    }

    let mut quizzes = Vec::with_capacity(record.quiz_ids.len());
    for ((quiz_id, shown), picks) in record.quiz_ids.iter().zip(orders).zip(answered) {
        let quiz = by_id.get(quiz_id).ok_or_else(|| {
            AppError::NotFound(format!(
                "Quiz {} referenced by test record {} no longer exists",
                quiz_id, record.id
            ))
        })?;

        let options: HashMap<i64, _> = quiz.answer_options.iter().map(|o| (o.id, o)).collect();
        let answer_options = shown
            .iter()
            .filter_map(|id| options.get(id))
            .map(|o| RecordOption {
                id: o.id,
                content: o.content.clone(),
                is_correct: o.is_correct,
            })
            .collect();

        quizzes.push(RecordQuiz {
            id: quiz.quiz.id,
            title: quiz.quiz.title.clone(),
            quiz_type: quiz.quiz.quiz_type,
            answer_options,
            answered_ids: picks.iter().map(|(id, _)| *id).collect(),
        });
    }

    Ok(RecordDetail {
        id: record.id,
        title: record.title.clone(),
        correct_ratio: record.correct_ratio.0,
        created_at: record.created_at,
        quizzes,
    })
}
