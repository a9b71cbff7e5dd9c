// src/grading.rs

//! Grading of a raw student submission against a quiz's question list.
//!
//! Everything here is pure: the caller checks the single-attempt rule and
//! persists the resulting [`Attempt`].

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::models::{
    attempt::{Answer, AnswerDetail, Attempt},
    id::RecordId,
    question::{MatchingPair, Question, QuestionKind},
};

/// Raw form submission: `question_{index}` -> submitted value.
pub type Submission = HashMap<String, String>;

/// Form key carrying the answer for the question at `index`.
pub fn answer_key(index: usize) -> String {
    format!("question_{index}")
}

/// Outcome of evaluating one question.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub correct: bool,
    pub detail: AnswerDetail,
}

/// Evaluates a single answer. Never fails: bad input is graded incorrect.
pub fn evaluate(question: &Question, raw: Option<&str>) -> Evaluation {
    match &question.kind {
        QuestionKind::MultipleChoice {
            options,
            correct_option_index,
        } => evaluate_multiple_choice(options, *correct_option_index, raw),
        QuestionKind::ShortAnswer { short_answer } => evaluate_short_answer(short_answer, raw),
        QuestionKind::Matching { matching_pairs } => evaluate_matching(matching_pairs, raw),
    }
}

fn evaluate_multiple_choice(options: &[String], correct_index: usize, raw: Option<&str>) -> Evaluation {
    let answer_index = raw.and_then(|value| value.trim().parse::<i64>().ok());

    let selected_text = answer_index
        .and_then(|i| usize::try_from(i).ok())
        .and_then(|i| options.get(i))
        .cloned();

    let correct = answer_index.is_some_and(|i| i == correct_index as i64);

    Evaluation {
        correct,
        detail: AnswerDetail::MultipleChoice {
            answer_index,
            selected_text,
        },
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

fn evaluate_short_answer(expected: &str, raw: Option<&str>) -> Evaluation {
    let answer_text = raw.unwrap_or_default().to_string();
    let correct = normalize(&answer_text) == normalize(expected);

    Evaluation {
        correct,
        detail: AnswerDetail::ShortAnswer {
            answer_text,
            correct_answer: expected.to_string(),
        },
    }
}

/// Pairs are position-aligned: left `i` belongs with right `i`, so a match is
/// correct when the student mapped position `i` to position `i`.
fn evaluate_matching(pairs: &[MatchingPair], raw: Option<&str>) -> Evaluation {
    let matches: BTreeMap<String, String> = raw
        .and_then(|json| serde_json::from_str(json).ok())
        .unwrap_or_default();

    let total_pairs = pairs.len();
    let correct_positions: HashSet<usize> = matches
        .iter()
        .filter(|(left, right)| left == right)
        .filter_map(|(left, _)| left.parse::<usize>().ok())
        .filter(|position| *position < total_pairs)
        .collect();
    let correct_pairs = correct_positions.len();

    let percentage_correct = if total_pairs > 0 {
        correct_pairs as f64 / total_pairs as f64
    } else {
        0.0
    };

    Evaluation {
        correct: correct_pairs == total_pairs,
        detail: AnswerDetail::Matching {
            matches,
            correct_pairs,
            total_pairs,
            percentage_correct,
        },
    }
}

/// `round(correct / total * 100)` with halves rounded up; 0 when `total` is 0.
///
/// Takes `u64` so pooled sums over many attempts use the same rounding.
pub fn percentage(correct: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((200 * correct + total) / (2 * total)) as u32
}

/// Grades a whole submission in question order.
pub fn grade(
    quiz_id: &RecordId,
    questions: &[Question],
    submission: &Submission,
    completed_at: DateTime<Utc>,
) -> Attempt {
    let answers: Vec<Answer> = questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let raw = submission.get(&answer_key(index)).map(String::as_str);
            let Evaluation { correct, detail } = evaluate(question, raw);
            Answer {
                question_index: index,
                question_text: question.text.clone(),
                correct,
                detail,
            }
        })
        .collect();

    let total_correct = answers.iter().filter(|a| a.correct).count() as u32;
    let total_questions = questions.len() as u32;

    Attempt {
        quiz: quiz_id.clone(),
        score: total_correct,
        total_correct,
        total_questions,
        percentage_score: percentage(u64::from(total_correct), u64::from(total_questions)),
        answers,
        completed_at,
    }
}
