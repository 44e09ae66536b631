// src/services/collector.rs

use std::collections::HashMap;

use crate::{
    error::AppError,
    models::test_record::{AnsweredTuple, QuizSubmission, SubmitTestRequest},
    services::presenter::QuizView,
};

/// In-progress selections of one attempt, keyed by quiz id.
///
/// Owned by whoever drives the attempt and passed to the submit step.
/// Each selection keeps the position the option had in the presented order.
#[derive(Debug, Clone, Default)]
pub struct AnswerSheet {
    selections: HashMap<i64, Vec<AnsweredTuple>>,
}

impl AnswerSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a click on an option.
    ///
    /// Single-answer quizzes replace the previous choice; `multiple` toggles the option.
    pub fn choose(&mut self, view: &QuizView, option_id: i64) -> Result<(), AppError> {
        let position = view.position_of(option_id).ok_or_else(|| {
            AppError::BadRequest(format!(
                "Option {} is not part of quiz {}",
                option_id, view.id
            ))
        })?;

        let entry = self.selections.entry(view.id).or_default();
        if view.quiz_type.is_single_answer() {
            entry.clear();
            entry.push((option_id, position));
        } else if let Some(idx) = entry.iter().position(|(id, _)| *id == option_id) {
            entry.remove(idx);
        } else {
            entry.push((option_id, position));
        }
        Ok(())
    }

    pub fn answered(&self, quiz_id: i64) -> &[AnsweredTuple] {
        self.selections
            .get(&quiz_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Drops every selection. The caller presents a new shuffle afterwards.
    pub fn reset(&mut self) {
        self.selections.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.selections.values().all(Vec::is_empty)
    }

    /// Builds the submit payload in presentation order.
    pub fn to_submission(&self, title: &str, views: &[QuizView]) -> SubmitTestRequest {
        let quizzes = views
            .iter()
            .map(|view| {
                let answered = self.answered(view.id);
                QuizSubmission {
                    quiz_id: view.id,
                    shown_option_ids: view.shown_option_ids(),
                    answered: (!answered.is_empty()).then(|| answered.to_vec()),
                }
            })
            .collect();

        SubmitTestRequest {
            title: title.to_string(),
            quizzes,
        }
    }
}
