// src/store/mod.rs

//! Persistence for teachers, quizzes, students and attempts.
//!
//! Handlers only see the [`Store`] trait. `PgStore` backs production,
//! `MemoryStore` backs tests and database-less runs.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        attempt::{Attempt, StudentAttempt},
        id::RecordId,
        quiz::{Quiz, QuizPayload},
        student::Student,
        teacher::Teacher,
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    /// Creates the teacher only while no teacher exists, atomically with that
    /// check. Returns `None` when an account is already registered.
    async fn create_first_teacher(
        &self,
        username: &str,
        password_hash: &str,
        full_name: &str,
    ) -> Result<Option<Teacher>, AppError>;

    /// Fails with `Conflict` when the username is taken.
    async fn create_teacher(
        &self,
        username: &str,
        password_hash: &str,
        full_name: &str,
    ) -> Result<Teacher, AppError>;

    async fn find_teacher_by_username(&self, username: &str) -> Result<Option<Teacher>, AppError>;

    async fn insert_quiz(&self, quiz: &Quiz) -> Result<(), AppError>;

    async fn find_quiz(&self, id: &RecordId) -> Result<Option<Quiz>, AppError>;

    /// Like `find_quiz`, but only returns quizzes owned by `teacher_id`.
    async fn find_owned_quiz(&self, id: &RecordId, teacher_id: i64) -> Result<Option<Quiz>, AppError>;

    /// Newest first.
    async fn list_teacher_quizzes(&self, teacher_id: i64) -> Result<Vec<Quiz>, AppError>;

    /// Newest first.
    async fn list_active_quizzes(&self) -> Result<Vec<Quiz>, AppError>;

    /// Replaces title, description and questions. Returns `false` if no owned quiz matched.
    async fn update_quiz(
        &self,
        id: &RecordId,
        teacher_id: i64,
        payload: &QuizPayload,
    ) -> Result<bool, AppError>;

    /// Flips `is_active` and returns the new value, or `None` if no owned quiz matched.
    async fn toggle_quiz_active(&self, id: &RecordId, teacher_id: i64) -> Result<Option<bool>, AppError>;

    /// Deletes the quiz together with its attempts.
    async fn delete_quiz(&self, id: &RecordId, teacher_id: i64) -> Result<bool, AppError>;

    async fn find_or_create_student(&self, name: &str, class_name: &str) -> Result<Student, AppError>;

    async fn find_student(&self, id: i64) -> Result<Option<Student>, AppError>;

    async fn attempted_quiz_ids(&self, student_id: i64) -> Result<Vec<RecordId>, AppError>;

    async fn find_attempt(&self, student_id: i64, quiz_id: &RecordId) -> Result<Option<Attempt>, AppError>;

    /// Stores the attempt unless one already exists for (student, quiz).
    /// Returns `false` when an earlier attempt won.
    async fn insert_attempt(&self, student_id: i64, attempt: &Attempt) -> Result<bool, AppError>;

    /// Attempts for a quiz in completion order, optionally restricted to one class.
    async fn list_quiz_attempts(
        &self,
        quiz_id: &RecordId,
        class_name: Option<&str>,
    ) -> Result<Vec<StudentAttempt>, AppError>;
}
