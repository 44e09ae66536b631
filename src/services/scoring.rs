// src/services/scoring.rs

use std::collections::{HashMap, HashSet};

use validator::Validate;

use crate::{
    error::AppError,
    models::{
        quiz::QuizWithOptions,
        test_record::{QuizResult, QuizSubmission, SubmitTestRequest},
    },
};

/// Result of grading a whole submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graded {
    /// One entry per submitted quiz that still exists, in submission order.
    pub results: Vec<QuizResult>,
    /// `(correct_count, total_count)`.
    pub ratio: (i64, i64),
}

impl Graded {
    /// Quiz ids that were actually graded.
    pub fn graded_ids(&self) -> HashSet<i64> {
        self.results.iter().map(|r| r.quiz_id).collect()
    }
}

/// Shape checks done before any catalog read.
pub fn validate_submission(req: &SubmitTestRequest) -> Result<(), AppError> {
    req.validate()?;

    let mut seen_quizzes = HashSet::new();
    for quiz in &req.quizzes {
        if !seen_quizzes.insert(quiz.quiz_id) {
            return Err(AppError::BadRequest(format!(
                "Quiz {} is submitted more than once",
                quiz.quiz_id
            )));
        }

        if quiz.shown_option_ids.is_empty() {
            return Err(AppError::BadRequest(format!(
                "Quiz {} has no shown options",
                quiz.quiz_id
            )));
        }

        let shown: HashSet<i64> = quiz.shown_option_ids.iter().copied().collect();
        if shown.len() != quiz.shown_option_ids.len() {
            return Err(AppError::BadRequest(format!(
                "Quiz {} lists a shown option twice",
                quiz.quiz_id
            )));
        }

        let mut chosen = HashSet::new();
        for (option_id, _) in quiz.answered.iter().flatten() {
            if !shown.contains(option_id) {
                return Err(AppError::BadRequest(format!(
                    "Option {} was not shown for quiz {}",
                    option_id, quiz.quiz_id
                )));
            }
            if !chosen.insert(*option_id) {
                return Err(AppError::BadRequest(format!(
                    "Option {} is answered twice for quiz {}",
                    option_id, quiz.quiz_id
                )));
            }
        }
    }

    Ok(())
}

/// A quiz is correct when the chosen set equals the correct set exactly.
/// Positions play no part in the comparison.
pub fn is_exact_match(submission: &QuizSubmission, correct: &[i64]) -> bool {
    let chosen: HashSet<i64> = match &submission.answered {
        Some(answered) if !answered.is_empty() => answered.iter().map(|(id, _)| *id).collect(),
        _ => return false,
    };
    let correct: HashSet<i64> = correct.iter().copied().collect();
    chosen == correct
}

/// Grades a submission against a catalog snapshot.
///
/// Submitted quizzes missing from `catalog` count toward neither total nor correct.
pub fn grade(req: &SubmitTestRequest, catalog: &[QuizWithOptions]) -> Graded {
    let by_id: HashMap<i64, &QuizWithOptions> =
        catalog.iter().map(|q| (q.quiz.id, q)).collect();

    let results: Vec<QuizResult> = req
        .quizzes
        .iter()
        .filter_map(|submission| {
            let quiz = by_id.get(&submission.quiz_id)?;
            let correct_option_ids = quiz.correct_option_ids();
            let is_correct = is_exact_match(submission, &correct_option_ids);
            Some(QuizResult {
                quiz_id: submission.quiz_id,
                correct_option_ids,
                is_correct,
            })
        })
        .collect();

    let correct = results.iter().filter(|r| r.is_correct).count() as i64;
    let total = results.len() as i64;

    Graded {
        results,
        ratio: (correct, total),
    }
}
