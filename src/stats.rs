// src/stats.rs

//! Aggregation over the recorded attempts of one quiz.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    config::{CLASS_GRADES, CLASS_LETTERS},
    grading::percentage,
    models::{
        attempt::{Attempt, StudentAttempt},
        question::Question,
        quiz::Quiz,
    },
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionStat {
    pub question_text: String,
    pub correct: usize,
    pub total: usize,
    /// 0..=100
    pub percentage_correct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizStats {
    pub total_attempts: usize,
    /// Mean of raw correct counts, not a percentage.
    pub average_score: f64,
    pub question_stats: Vec<QuestionStat>,
}

/// Per-question pass rates plus the mean raw score.
pub fn quiz_stats<'a>(
    questions: &[Question],
    attempts: impl IntoIterator<Item = &'a Attempt>,
) -> QuizStats {
    let attempts: Vec<&Attempt> = attempts.into_iter().collect();
    let total_attempts = attempts.len();

    let average_score = if total_attempts > 0 {
        attempts.iter().map(|a| f64::from(a.score)).sum::<f64>() / total_attempts as f64
    } else {
        0.0
    };

    let question_stats = questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let answered = attempts.iter().filter_map(|a| a.answers.get(index));
            let (total, correct) = answered.fold((0, 0), |(total, correct), answer| {
                (total + 1, correct + usize::from(answer.correct))
            });
            let percentage_correct = if total > 0 {
                correct as f64 / total as f64 * 100.0
            } else {
                0.0
            };
            QuestionStat {
                question_text: question.text.clone(),
                correct,
                total,
                percentage_correct,
            }
        })
        .collect();

    QuizStats {
        total_attempts,
        average_score,
        question_stats,
    }
}

/// Canonical class labels offered in the teacher's filter: `1A` .. `5K`.
pub fn class_list() -> Vec<String> {
    CLASS_GRADES
        .flat_map(|grade| CLASS_LETTERS.map(move |letter| format!("{grade}{letter}")))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRow {
    pub student_id: i64,
    pub student_name: String,
    pub class_name: String,
    pub score: u32,
    pub total_questions: u32,
    pub percentage_score: u32,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_attempts: usize,
    /// Mean of raw correct counts.
    pub average_score: f64,
    /// Pooled percentage: all correct answers over all questions answered.
    pub average_percentage: u32,
    pub highest_score: u32,
    pub lowest_score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassBucket {
    pub class_name: String,
    pub attempts: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizReport {
    pub summary: ReportSummary,
    pub results: Vec<ResultRow>,
    /// Classes with at least one attempt, sorted.
    pub class_names: Vec<String>,
    /// Every canonical class (possibly empty) followed by any other class seen.
    pub classes: Vec<ClassBucket>,
}

/// Teacher-facing rollup. `class_filter` narrows `results` only; the summary
/// and class buckets always cover every attempt.
pub fn quiz_report(quiz: &Quiz, entries: &[StudentAttempt], class_filter: Option<&str>) -> QuizReport {
    let total_attempts = entries.len();

    let (sum_correct, sum_questions) = entries.iter().fold((0u64, 0u64), |(c, t), e| {
        (
            c + u64::from(e.attempt.total_correct),
            t + u64::from(e.attempt.total_questions),
        )
    });

    let average_score = if total_attempts > 0 {
        entries.iter().map(|e| f64::from(e.attempt.score)).sum::<f64>() / total_attempts as f64
    } else {
        0.0
    };

    let percentages = entries.iter().map(|e| e.attempt.percentage_score);
    let summary = ReportSummary {
        total_attempts,
        average_score,
        average_percentage: percentage(sum_correct, sum_questions),
        highest_score: percentages.clone().max().unwrap_or(0),
        lowest_score: percentages.min().unwrap_or(0),
    };

    let mut results: Vec<ResultRow> = entries
        .iter()
        .filter(|e| class_filter.is_none_or(|class| e.student.class_name == class))
        .map(|e| ResultRow {
            student_id: e.student.id,
            student_name: e.student.name.clone(),
            class_name: e.student.class_name.clone(),
            score: e.attempt.total_correct,
            total_questions: match e.attempt.total_questions {
                0 => quiz.questions.len() as u32,
                n => n,
            },
            percentage_score: e.attempt.percentage_score,
            completed_at: e.attempt.completed_at,
        })
        .collect();

    results.sort_by(|a, b| {
        a.class_name
            .cmp(&b.class_name)
            .then(b.percentage_score.cmp(&a.percentage_score))
    });

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for e in entries {
        *counts.entry(e.student.class_name.as_str()).or_default() += 1;
    }

    let class_names: Vec<String> = counts
        .keys()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect();

    let canonical = class_list();
    let extras: Vec<String> = class_names
        .iter()
        .filter(|name| !canonical.contains(*name))
        .cloned()
        .collect();

    let classes = canonical
        .into_iter()
        .chain(extras)
        .map(|class_name| ClassBucket {
            attempts: counts.get(class_name.as_str()).copied().unwrap_or(0),
            class_name,
        })
        .collect();

    QuizReport {
        summary,
        results,
        class_names,
        classes,
    }
}
