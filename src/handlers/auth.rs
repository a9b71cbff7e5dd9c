// src/handlers/auth.rs

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::{
        student::RegisterStudentRequest,
        teacher::{LoginRequest, RegisterTeacherRequest},
    },
    store::Store,
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Role, sign_jwt},
    },
};

/// Registers the teacher account.
///
/// Only allowed while no teacher exists; afterwards returns 409 Conflict.
/// Returns 201 Created and the teacher object (excluding password).
pub async fn register_teacher(
    State(store): State<Arc<dyn Store>>,
    Json(payload): Json<RegisterTeacherRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;
    let teacher = store
        .create_first_teacher(&payload.username, &hashed_password, &payload.full_name)
        .await?
        .ok_or(AppError::Conflict(
            "A teacher account already exists. Please log in.".to_string(),
        ))?;

    tracing::info!("Registered teacher {}", teacher.username);

    Ok((StatusCode::CREATED, Json(teacher)))
}

/// Authenticates a teacher and returns a JWT token.
pub async fn login_teacher(
    State(store): State<Arc<dyn Store>>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let teacher = store
        .find_teacher_by_username(&payload.username)
        .await?
        .ok_or(AppError::AuthError("Account does not exist".to_string()))?;

    if !verify_password(&payload.password, &teacher.password)? {
        return Err(AppError::AuthError("Incorrect password".to_string()));
    }

    let token = sign_jwt(
        teacher.id,
        Role::Teacher,
        &teacher.full_name,
        None,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "teacher": teacher
    })))
}

/// Registers a student, or resumes the existing one with the same name and class.
pub async fn register_student(
    State(store): State<Arc<dyn Store>>,
    State(config): State<Config>,
    Json(mut payload): Json<RegisterStudentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.name = payload.name.trim().to_string();
    payload.class_name = payload.class_name.trim().to_string();

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let student = store
        .find_or_create_student(&payload.name, &payload.class_name)
        .await?;

    let token = sign_jwt(
        student.id,
        Role::Student,
        &student.name,
        Some(&student.class_name),
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "student": student
    })))
}
