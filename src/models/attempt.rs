// src/models/attempt.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{id::RecordId, student::Student};

/// One student's graded, once-only submission for a quiz.
/// Never mutated after it is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub quiz: RecordId,
    /// Same as `total_correct`; kept as its own field for reporting.
    pub score: u32,
    pub total_correct: u32,
    pub total_questions: u32,
    /// Rounded percentage, 0..=100.
    pub percentage_score: u32,
    /// Index-aligned with the quiz's questions at grading time.
    pub answers: Vec<Answer>,
    pub completed_at: DateTime<Utc>,
}

/// Graded answer to a single question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_index: usize,
    /// Frozen copy of the prompt, so results stay readable after quiz edits.
    pub question_text: String,
    pub correct: bool,
    #[serde(flatten)]
    pub detail: AnswerDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnswerDetail {
    #[serde(rename_all = "camelCase")]
    MultipleChoice {
        /// `None` when the submitted value was missing or not a number.
        answer_index: Option<i64>,
        /// `None` when the index does not name an option.
        selected_text: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ShortAnswer {
        answer_text: String,
        correct_answer: String,
    },
    #[serde(rename_all = "camelCase")]
    Matching {
        /// Left index -> right index, as submitted.
        matches: BTreeMap<String, String>,
        correct_pairs: usize,
        total_pairs: usize,
        /// Fraction in 0..=1.
        percentage_correct: f64,
    },
}

/// An attempt joined with the student who made it.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentAttempt {
    pub student: Student,
    pub attempt: Attempt,
}
