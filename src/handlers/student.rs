// src/handlers/student.rs

use std::sync::Arc;

use axum::{
    Extension, Form, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde_json::json;

use crate::{
    error::AppError,
    grading::{Submission, grade},
    models::{
        id::RecordId,
        quiz::{PublicQuiz, QuizSummary},
    },
    store::Store,
    utils::jwt::Claims,
};

fn quiz_url(id: &RecordId) -> String {
    format!("/api/student/quizzes/{id}")
}

fn result_url(id: &RecordId) -> String {
    format!("/api/student/quizzes/{id}/result")
}

/// Active quizzes plus the ids this student already attempted.
pub async fn list_quizzes(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;

    let quizzes: Vec<QuizSummary> = store
        .list_active_quizzes()
        .await?
        .iter()
        .map(QuizSummary::from)
        .collect();
    let attempted = store.attempted_quiz_ids(student_id).await?;

    Ok(Json(json!({
        "quizzes": quizzes,
        "attemptedQuizIds": attempted,
        "studentName": claims.name,
        "studentClass": claims.class_name
    })))
}

/// Answer-free quiz for taking. Redirects to the result if already attempted.
pub async fn take_quiz(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = RecordId::parse(&id)?;
    let student_id = claims.user_id()?;

    let quiz = store
        .find_quiz(&id)
        .await?
        .filter(|quiz| quiz.is_active)
        .ok_or_else(|| AppError::NotFound("Quiz not found or not active".to_string()))?;

    if store.find_attempt(student_id, &id).await?.is_some() {
        return Ok(Redirect::to(&result_url(&id)).into_response());
    }

    Ok(Json(PublicQuiz::from(&quiz)).into_response())
}

/// Grades and stores the one allowed attempt.
///
/// Returns 201 with the attempt. A repeated submission, including one that
/// loses a race with a concurrent submit, is redirected to the stored result.
pub async fn submit_quiz(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Form(submission): Form<Submission>,
) -> Result<Response, AppError> {
    let id = RecordId::parse(&id)?;
    let student_id = claims.user_id()?;

    let student = store
        .find_student(student_id)
        .await?
        .ok_or_else(|| AppError::AuthError("Please register before taking a quiz".to_string()))?;

    let quiz = store
        .find_quiz(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;

    if store.find_attempt(student.id, &id).await?.is_some() {
        return Ok(Redirect::to(&result_url(&id)).into_response());
    }

    let attempt = grade(&quiz.id, &quiz.questions, &submission, Utc::now());

    if !store.insert_attempt(student.id, &attempt).await? {
        tracing::warn!(
            "Duplicate submission for quiz {} by student {}",
            id,
            student.id
        );
        return Ok(Redirect::to(&result_url(&id)).into_response());
    }

    tracing::info!(
        "Student {} ({}) scored {}/{} on quiz {}",
        student.name,
        student.class_name,
        attempt.total_correct,
        attempt.total_questions,
        id
    );

    Ok((StatusCode::CREATED, Json(attempt)).into_response())
}

/// The student's stored attempt. Redirects to the quiz if there is none yet.
pub async fn get_result(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = RecordId::parse(&id)?;
    let student_id = claims.user_id()?;

    let quiz = store
        .find_quiz(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;

    let Some(attempt) = store.find_attempt(student_id, &id).await? else {
        return Ok(Redirect::to(&quiz_url(&id)).into_response());
    };

    Ok(Json(json!({
        "quiz": QuizSummary::from(&quiz),
        "attempt": attempt,
        "studentName": claims.name,
        "studentClass": claims.class_name
    }))
    .into_response())
}
