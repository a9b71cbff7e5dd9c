// src/models/question.rs

use serde::{Deserialize, Serialize};

/// Question type tag as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Legacy questions carry no tag and are treated as multiple choice.
    #[default]
    MultipleChoice,
    ShortAnswer,
    Matching,
}

/// Whether one side of a matching pair is text or an uploaded image path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairSide {
    #[default]
    Text,
    Image,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingPair {
    pub left: String,
    pub right: String,
    #[serde(default)]
    pub left_type: PairSide,
    #[serde(default)]
    pub right_type: PairSide,
}

/// A single quiz question.
///
/// Stored inside the quiz as JSON; the position in the quiz's question list is
/// its identity in answer records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawQuestion")]
pub struct Question {
    pub text: String,
    pub image: Option<String>,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

/// The variant-specific part of a question. Only the fields of the active
/// variant exist, so the answer key can never disagree with the tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    #[serde(rename_all = "camelCase")]
    MultipleChoice {
        options: Vec<String>,
        correct_option_index: usize,
    },
    #[serde(rename_all = "camelCase")]
    ShortAnswer { short_answer: String },
    #[serde(rename_all = "camelCase")]
    Matching { matching_pairs: Vec<MatchingPair> },
}

/// Flat wire shape accepted from clients and from storage.
/// Fields that do not belong to `type` are accepted and dropped.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
    #[serde(rename = "type", default)]
    question_type: Option<QuestionType>,
    text: String,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    correct_option_index: Option<i64>,
    #[serde(default)]
    short_answer: Option<String>,
    #[serde(default)]
    matching_pairs: Vec<MatchingPair>,
}

impl TryFrom<RawQuestion> for Question {
    type Error = String;

    fn try_from(raw: RawQuestion) -> Result<Self, Self::Error> {
        if raw.text.trim().is_empty() {
            return Err("question text is required".to_string());
        }

        let kind = match raw.question_type.unwrap_or_default() {
            QuestionType::MultipleChoice => {
                if raw.options.is_empty() {
                    return Err("multiple choice question needs at least one option".to_string());
                }
                let index = raw.correct_option_index.unwrap_or(0);
                let correct_option_index = usize::try_from(index)
                    .ok()
                    .filter(|i| *i < raw.options.len())
                    .ok_or_else(|| {
                        format!(
                            "correctOptionIndex {index} is out of range for {} options",
                            raw.options.len()
                        )
                    })?;
                QuestionKind::MultipleChoice {
                    options: raw.options,
                    correct_option_index,
                }
            }
            QuestionType::ShortAnswer => QuestionKind::ShortAnswer {
                short_answer: raw.short_answer.unwrap_or_default(),
            },
            QuestionType::Matching => {
                if raw.matching_pairs.is_empty() {
                    return Err("matching question needs at least one pair".to_string());
                }
                QuestionKind::Matching {
                    matching_pairs: raw.matching_pairs,
                }
            }
        };

        Ok(Question {
            text: raw.text,
            image: raw.image.filter(|path| !path.is_empty()),
            kind,
        })
    }
}

/// One side of a matching pair as shown to students.
#[derive(Debug, Clone, Serialize)]
pub struct PairItem {
    pub index: usize,
    pub content: String,
    #[serde(rename = "type")]
    pub side: PairSide,
}

/// DTO for sending a question to students (no answer key).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub index: usize,
    pub text: String,
    pub image: Option<String>,
    #[serde(flatten)]
    pub kind: PublicQuestionKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PublicQuestionKind {
    MultipleChoice {
        options: Vec<String>,
    },
    ShortAnswer,
    #[serde(rename_all = "camelCase")]
    Matching {
        left_items: Vec<PairItem>,
        right_items: Vec<PairItem>,
    },
}

impl PublicQuestion {
    pub fn from_question(index: usize, question: &Question) -> Self {
        let kind = match &question.kind {
            QuestionKind::MultipleChoice { options, .. } => PublicQuestionKind::MultipleChoice {
                options: options.clone(),
            },
            QuestionKind::ShortAnswer { .. } => PublicQuestionKind::ShortAnswer,
            QuestionKind::Matching { matching_pairs } => PublicQuestionKind::Matching {
                left_items: matching_pairs
                    .iter()
                    .enumerate()
                    .map(|(i, p)| PairItem {
                        index: i,
                        content: p.left.clone(),
                        side: p.left_type,
                    })
                    .collect(),
                right_items: matching_pairs
                    .iter()
                    .enumerate()
                    .map(|(i, p)| PairItem {
                        index: i,
                        content: p.right.clone(),
                        side: p.right_type,
                    })
                    .collect(),
            },
        };

        PublicQuestion {
            index,
            text: question.text.clone(),
            image: question.image.clone(),
            kind,
        }
    }
}
