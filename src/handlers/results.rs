// src/handlers/results.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::{
    config::Config,
    error::AppError,
    export::{ExportFile, ExportScope, export_filename, export_rows, write_csv},
    models::{
        id::RecordId,
        quiz::{Quiz, QuizSummary},
    },
    stats::{QuizStats, quiz_report, quiz_stats},
    store::Store,
    utils::jwt::Claims,
};

#[derive(Debug, Deserialize)]
pub struct ResultsParams {
    /// Restricts the result rows to one class. Empty means all.
    pub class: Option<String>,
}

async fn owned_quiz(store: &dyn Store, claims: &Claims, raw_id: &str) -> Result<Quiz, AppError> {
    let id = RecordId::parse(raw_id)?;
    store
        .find_owned_quiz(&id, claims.user_id()?)
        .await?
        .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))
}

/// Per-question pass rates for a quiz the caller owns.
pub async fn get_quiz_stats(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<QuizStats>, AppError> {
    let quiz = owned_quiz(store.as_ref(), &claims, &id).await?;
    let entries = store.list_quiz_attempts(&quiz.id, None).await?;

    Ok(Json(quiz_stats(
        &quiz.questions,
        entries.iter().map(|entry| &entry.attempt),
    )))
}

/// Summary, per-student rows and class buckets.
pub async fn get_quiz_results(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Query(params): Query<ResultsParams>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = owned_quiz(store.as_ref(), &claims, &id).await?;
    let entries = store.list_quiz_attempts(&quiz.id, None).await?;

    let class_filter = params.class.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let report = quiz_report(&quiz, &entries, class_filter);

    Ok(Json(json!({
        "quiz": QuizSummary::from(&quiz),
        "selectedClass": class_filter,
        "report": report
    })))
}

/// CSV of every attempt, with a class column.
pub async fn export_all(
    State(store): State<Arc<dyn Store>>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    export(store.as_ref(), &config, &claims, &id, ExportScope::AllStudents).await
}

/// CSV of one class's attempts.
pub async fn export_class(
    State(store): State<Arc<dyn Store>>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path((id, class_name)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let class_name = class_name.trim();
    if class_name.is_empty() || class_name.chars().count() > 20 {
        return Err(AppError::BadRequest("Invalid class name".to_string()));
    }
    export(store.as_ref(), &config, &claims, &id, ExportScope::Class(class_name)).await
}

async fn export(
    store: &dyn Store,
    config: &Config,
    claims: &Claims,
    raw_id: &str,
    scope: ExportScope<'_>,
) -> Result<Response, AppError> {
    let quiz = owned_quiz(store, claims, raw_id).await?;

    let class_filter = match scope {
        ExportScope::AllStudents => None,
        ExportScope::Class(class_name) => Some(class_name),
    };
    let entries = store.list_quiz_attempts(&quiz.id, class_filter).await?;

    let rows = export_rows(&quiz, &entries, config.export_offset());
    let csv = write_csv(scope, &rows)?;

    let file_name = export_filename(&quiz.title, scope, Utc::now());
    let file = ExportFile::create(&config.export_dir, file_name, &csv).await?;
    let disposition = format!("attachment; filename=\"{}\"", file.name());

    tracing::info!(
        "Exporting {} result rows for quiz {} as {}",
        rows.len(),
        quiz.id,
        file.name()
    );

    let body = file.into_body().await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
