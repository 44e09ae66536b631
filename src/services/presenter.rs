// src/services/presenter.rs

use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use crate::models::quiz::{QuizType, QuizWithOptions};

/// Option as presented for an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionView {
    pub id: i64,
    pub content: String,
    /// Only filled for privileged review. Never serialized when absent.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub is_correct: Option<bool>,
}

/// Quiz as presented for an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizView {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub quiz_type: QuizType,
    pub chapter: Option<String>,
    pub remark: Option<String>,
    pub options: Vec<OptionView>,
}

impl QuizView {
    /// Option ids in presentation order.
    pub fn shown_option_ids(&self) -> Vec<i64> {
        self.options.iter().map(|o| o.id).collect()
    }

    /// Index of an option within the presented order.
    pub fn position_of(&self, option_id: i64) -> Option<u32> {
        self.options
            .iter()
            .position(|o| o.id == option_id)
            .map(|p| p as u32)
    }
}

/// Quizzes sharing one chapter label, in presentation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterTab {
    pub chapter: Option<String>,
    pub quizzes: Vec<QuizView>,
}

/// The one place where presentation order is randomized.
pub fn shuffle<T, R>(items: &mut [T], rng: &mut R)
where
    R: Rng + ?Sized,
{
    items.shuffle(rng);
}

/// Builds a fresh attempt: quiz order and each quiz's option order are shuffled.
///
/// `is_correct` is carried over only when `include_correctness` is set.
pub fn present<R>(quizzes: Vec<QuizWithOptions>, include_correctness: bool, rng: &mut R) -> Vec<QuizView>
where
    R: Rng + ?Sized,
{
    let mut views: Vec<QuizView> = quizzes
        .into_iter()
        .map(|q| {
            let mut options: Vec<OptionView> = q
                .answer_options
                .into_iter()
                .map(|o| OptionView {
                    id: o.id,
                    content: o.content,
                    is_correct: include_correctness.then_some(o.is_correct),
                })
                .collect();
            shuffle(&mut options, &mut *rng);

            QuizView {
                id: q.quiz.id,
                title: q.quiz.title,
                quiz_type: q.quiz.quiz_type,
                chapter: q.quiz.chapter,
                remark: q.quiz.remark,
                options,
            }
        })
        .collect();

    shuffle(&mut views, rng);
    views
}

/// Groups views into chapter tabs, keeping the order in which chapters first appear.
pub fn group_into_tabs(views: Vec<QuizView>) -> Vec<ChapterTab> {
    let mut tabs: Vec<ChapterTab> = Vec::new();
    for view in views {
        match tabs.iter_mut().find(|t| t.chapter == view.chapter) {
            Some(tab) => tab.quizzes.push(view),
            None => tabs.push(ChapterTab {
                chapter: view.chapter.clone(),
                quizzes: vec![view],
            }),
        }
    }
    tabs
}
