// src/handlers/quiz.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::{Value, json};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        id::RecordId,
        quiz::{PublicQuiz, Quiz, QuizPayload, QuizSummary},
    },
    store::Store,
    utils::{html::sanitize_quiz, jwt::Claims},
};

/// Question shapes are checked while decoding, so a bad question surfaces
/// as 400 with a readable message rather than the extractor's rejection.
/// Length and emptiness rules apply to the sanitized text that gets stored.
fn parse_payload(body: Value) -> Result<QuizPayload, AppError> {
    let payload = sanitize_quiz(serde_json::from_value(body)?);

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    if payload.title.trim().is_empty() {
        return Err(AppError::BadRequest("Quiz title is required".to_string()));
    }
    if let Some(index) = payload.questions.iter().position(|q| q.text.trim().is_empty()) {
        return Err(AppError::BadRequest(format!(
            "Question {} needs text",
            index + 1
        )));
    }
    Ok(payload)
}

fn not_found() -> AppError {
    AppError::NotFound("Quiz not found".to_string())
}

/// Active quizzes, newest first.
pub async fn list_active_quizzes(
    State(store): State<Arc<dyn Store>>,
) -> Result<Json<Vec<QuizSummary>>, AppError> {
    let quizzes = store.list_active_quizzes().await?;
    Ok(Json(quizzes.iter().map(QuizSummary::from).collect()))
}

/// Answer-free view of an active quiz. Inactive quizzes read as missing.
pub async fn get_public_quiz(
    State(store): State<Arc<dyn Store>>,
    Path(id): Path<String>,
) -> Result<Json<PublicQuiz>, AppError> {
    let id = RecordId::parse(&id)?;

    let quiz = store
        .find_quiz(&id)
        .await?
        .filter(|quiz| quiz.is_active)
        .ok_or_else(not_found)?;

    Ok(Json(PublicQuiz::from(&quiz)))
}

/// Quizzes owned by the authenticated teacher, newest first.
pub async fn list_teacher_quizzes(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Quiz>>, AppError> {
    let quizzes = store.list_teacher_quizzes(claims.user_id()?).await?;
    Ok(Json(quizzes))
}

/// Creates an active quiz owned by the caller. Returns 201 with the new id.
pub async fn create_quiz(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let payload = parse_payload(body)?;
    let quiz = Quiz::new(claims.user_id()?, payload);

    store.insert_quiz(&quiz).await?;
    tracing::info!(
        "Teacher {} created quiz {} with {} questions",
        claims.sub,
        quiz.id,
        quiz.questions.len()
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "id": quiz.id })),
    ))
}

/// Full quiz, answer keys included, for its owner.
pub async fn get_teacher_quiz(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<Quiz>, AppError> {
    let id = RecordId::parse(&id)?;

    let quiz = store
        .find_owned_quiz(&id, claims.user_id()?)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(quiz))
}

/// Replaces title, description and questions. Existing attempts keep their
/// recorded answers.
pub async fn update_quiz(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let id = RecordId::parse(&id)?;
    let payload = parse_payload(body)?;

    if !store.update_quiz(&id, claims.user_id()?, &payload).await? {
        return Err(not_found());
    }

    tracing::info!("Teacher {} updated quiz {}", claims.sub, id);
    Ok(Json(json!({ "success": true, "id": id })))
}

/// Deletes the quiz and every attempt recorded against it.
pub async fn delete_quiz(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = RecordId::parse(&id)?;

    if !store.delete_quiz(&id, claims.user_id()?).await? {
        return Err(not_found());
    }

    tracing::info!("Teacher {} deleted quiz {}", claims.sub, id);
    Ok(StatusCode::NO_CONTENT)
}

/// Flips whether students can see the quiz.
pub async fn toggle_status(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = RecordId::parse(&id)?;

    let is_active = store
        .toggle_quiz_active(&id, claims.user_id()?)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(json!({ "success": true, "isActive": is_active })))
}
