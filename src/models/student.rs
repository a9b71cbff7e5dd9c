// src/models/student.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A student, identified by the (name, class) pair they registered with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub class_name: String,
    pub created_at: DateTime<Utc>,
}

/// DTO for student registration. Registering again with the same pair resumes the student.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterStudentRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Please enter your name and class to continue."
    ))]
    pub name: String,
    #[validate(length(
        min = 1,
        max = 20,
        message = "Please enter your name and class to continue."
    ))]
    pub class_name: String,
}
