// src/store/memory.rs

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    error::AppError,
    models::{
        attempt::{Attempt, StudentAttempt},
        id::RecordId,
        quiz::{Quiz, QuizPayload},
        student::Student,
        teacher::Teacher,
    },
    store::Store,
};

#[derive(Default)]
struct Tables {
    teachers: Vec<Teacher>,
    quizzes: Vec<Quiz>,
    students: Vec<Student>,
    /// (student id, attempt), in insertion order.
    attempts: Vec<(i64, Attempt)>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn insert_teacher(
        &mut self,
        username: &str,
        password_hash: &str,
        full_name: &str,
    ) -> Result<Teacher, AppError> {
        if self.teachers.iter().any(|t| t.username == username) {
            return Err(AppError::Conflict(format!("Username '{}' already exists", username)));
        }
        let teacher = Teacher {
            id: self.next_id(),
            username: username.to_string(),
            password: password_hash.to_string(),
            full_name: full_name.to_string(),
            created_at: Utc::now(),
        };
        self.teachers.push(teacher.clone());
        Ok(teacher)
    }
}

/// Newest first, matching `ORDER BY created_at DESC`.
fn newest_first<'a>(quizzes: impl Iterator<Item = &'a Quiz>) -> Vec<Quiz> {
    let mut quizzes: Vec<Quiz> = quizzes.cloned().collect();
    quizzes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    quizzes
}

/// In-process store. All state is lost on shutdown.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_first_teacher(
        &self,
        username: &str,
        password_hash: &str,
        full_name: &str,
    ) -> Result<Option<Teacher>, AppError> {
        let mut tables = self.tables.write().await;
        if !tables.teachers.is_empty() {
            return Ok(None);
        }
        tables
            .insert_teacher(username, password_hash, full_name)
            .map(Some)
    }

    async fn create_teacher(
        &self,
        username: &str,
        password_hash: &str,
        full_name: &str,
    ) -> Result<Teacher, AppError> {
        self.tables
            .write()
            .await
            .insert_teacher(username, password_hash, full_name)
    }

    async fn find_teacher_by_username(&self, username: &str) -> Result<Option<Teacher>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.teachers.iter().find(|t| t.username == username).cloned())
    }

    async fn insert_quiz(&self, quiz: &Quiz) -> Result<(), AppError> {
        self.tables.write().await.quizzes.push(quiz.clone());
        Ok(())
    }

    async fn find_quiz(&self, id: &RecordId) -> Result<Option<Quiz>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.quizzes.iter().find(|q| &q.id == id).cloned())
    }

    async fn find_owned_quiz(&self, id: &RecordId, teacher_id: i64) -> Result<Option<Quiz>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .quizzes
            .iter()
            .find(|q| &q.id == id && q.created_by == teacher_id)
            .cloned())
    }

    async fn list_teacher_quizzes(&self, teacher_id: i64) -> Result<Vec<Quiz>, AppError> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables.quizzes.iter().filter(|q| q.created_by == teacher_id),
        ))
    }

    async fn list_active_quizzes(&self) -> Result<Vec<Quiz>, AppError> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.quizzes.iter().filter(|q| q.is_active)))
    }

    async fn update_quiz(
        &self,
        id: &RecordId,
        teacher_id: i64,
        payload: &QuizPayload,
    ) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        let Some(quiz) = tables
            .quizzes
            .iter_mut()
            .find(|q| &q.id == id && q.created_by == teacher_id)
        else {
            return Ok(false);
        };
        quiz.title = payload.title.clone();
        quiz.description = payload.description.clone().filter(|d| !d.is_empty());
        quiz.questions = payload.questions.clone();
        Ok(true)
    }

    async fn toggle_quiz_active(&self, id: &RecordId, teacher_id: i64) -> Result<Option<bool>, AppError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .quizzes
            .iter_mut()
            .find(|q| &q.id == id && q.created_by == teacher_id)
            .map(|quiz| {
                quiz.is_active = !quiz.is_active;
                quiz.is_active
            }))
    }

    async fn delete_quiz(&self, id: &RecordId, teacher_id: i64) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        let before = tables.quizzes.len();
        tables
            .quizzes
            .retain(|q| !(&q.id == id && q.created_by == teacher_id));
        let deleted = tables.quizzes.len() != before;
        if deleted {
            tables.attempts.retain(|(_, a)| &a.quiz != id);
        }
        Ok(deleted)
    }

    async fn find_or_create_student(&self, name: &str, class_name: &str) -> Result<Student, AppError> {
        let mut tables = self.tables.write().await;
        if let Some(student) = tables
            .students
            .iter()
            .find(|s| s.name == name && s.class_name == class_name)
        {
            return Ok(student.clone());
        }
        let student = Student {
            id: tables.next_id(),
            name: name.to_string(),
            class_name: class_name.to_string(),
            created_at: Utc::now(),
        };
        tables.students.push(student.clone());
        Ok(student)
    }

    async fn find_student(&self, id: i64) -> Result<Option<Student>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.students.iter().find(|s| s.id == id).cloned())
    }

    async fn attempted_quiz_ids(&self, student_id: i64) -> Result<Vec<RecordId>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .attempts
            .iter()
            .filter(|(owner, _)| *owner == student_id)
            .map(|(_, a)| a.quiz.clone())
            .collect())
    }

    async fn find_attempt(&self, student_id: i64, quiz_id: &RecordId) -> Result<Option<Attempt>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .attempts
            .iter()
            .find(|(owner, a)| *owner == student_id && &a.quiz == quiz_id)
            .map(|(_, a)| a.clone()))
    }

    async fn insert_attempt(&self, student_id: i64, attempt: &Attempt) -> Result<bool, AppError> {
        // Check and insert under one write lock so duplicates cannot interleave.
        let mut tables = self.tables.write().await;
        if tables
            .attempts
            .iter()
            .any(|(owner, a)| *owner == student_id && a.quiz == attempt.quiz)
        {
            return Ok(false);
        }
        tables.attempts.push((student_id, attempt.clone()));
        Ok(true)
    }

    async fn list_quiz_attempts(
        &self,
        quiz_id: &RecordId,
        class_name: Option<&str>,
    ) -> Result<Vec<StudentAttempt>, AppError> {
        let tables = self.tables.read().await;
        let mut entries: Vec<StudentAttempt> = tables
            .attempts
            .iter()
            .filter(|(_, a)| &a.quiz == quiz_id)
            .filter_map(|(owner, a)| {
                let student = tables.students.iter().find(|s| s.id == *owner)?;
                Some(StudentAttempt {
                    student: student.clone(),
                    attempt: a.clone(),
                })
            })
            .filter(|e| class_name.is_none_or(|class| e.student.class_name == class))
            .collect();
        entries.sort_by_key(|e| e.attempt.completed_at);
        Ok(entries)
    }
}
