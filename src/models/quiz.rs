// src/models/quiz.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{
    id::RecordId,
    question::{PublicQuestion, Question},
};

/// A teacher-owned, ordered collection of graded questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: RecordId,
    pub title: String,
    pub description: Option<String>,
    pub questions: Vec<Question>,
    /// Owning teacher id.
    pub created_by: i64,
    /// Gates visibility to students.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Quiz {
    pub fn new(teacher_id: i64, payload: QuizPayload) -> Self {
        Quiz {
            id: RecordId::generate(),
            title: payload.title,
            description: payload.description.filter(|d| !d.is_empty()),
            questions: payload.questions,
            created_by: teacher_id,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

/// DTO for creating or editing a quiz. Editing replaces all three fields.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QuizPayload {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title length must be between 1 and 200 chars"
    ))]
    pub title: String,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    /// Each question is shape-checked while deserializing.
    #[validate(length(max = 200, message = "A quiz can hold at most 200 questions"))]
    pub questions: Vec<Question>,
}

/// Row in the active quiz listing.
#[derive(Debug, Clone, Serialize)]
pub struct QuizSummary {
    pub id: RecordId,
    pub title: String,
    pub description: Option<String>,
}

impl From<&Quiz> for QuizSummary {
    fn from(quiz: &Quiz) -> Self {
        QuizSummary {
            id: quiz.id.clone(),
            title: quiz.title.clone(),
            description: quiz.description.clone(),
        }
    }
}

/// DTO for students taking a quiz (answer keys removed).
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuiz {
    pub id: RecordId,
    pub title: String,
    pub description: Option<String>,
    pub questions: Vec<PublicQuestion>,
}

impl From<&Quiz> for PublicQuiz {
    fn from(quiz: &Quiz) -> Self {
        PublicQuiz {
            id: quiz.id.clone(),
            title: quiz.title.clone(),
            description: quiz.description.clone(),
            questions: quiz
                .questions
                .iter()
                .enumerate()
                .map(|(i, q)| PublicQuestion::from_question(i, q))
                .collect(),
        }
    }
}
