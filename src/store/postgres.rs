// src/store/postgres.rs

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, postgres::PgPoolOptions, types::Json};

use crate::{
    error::AppError,
    models::{
        attempt::{Answer, Attempt, StudentAttempt},
        id::RecordId,
        question::Question,
        quiz::{Quiz, QuizPayload},
        student::Student,
        teacher::Teacher,
    },
    store::Store,
};

const CONNECT_RETRIES: u32 = 5;

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct TeacherRow {
    id: i64,
    username: String,
    password: String,
    full_name: String,
    created_at: DateTime<Utc>,
}

impl From<TeacherRow> for Teacher {
    fn from(row: TeacherRow) -> Self {
        Teacher {
            id: row.id,
            username: row.username,
            password: row.password,
            full_name: row.full_name,
            created_at: row.created_at,
        }
    }
}

const INSERT_TEACHER: &str = r#"
    INSERT INTO teachers (username, password, full_name)
    VALUES ($1, $2, $3)
    RETURNING id, username, password, full_name, created_at
"#;

/// Helper struct for reading the 'quizzes' table.
#[derive(sqlx::FromRow)]
struct QuizRow {
    id: String,
    title: String,
    description: Option<String>,
    questions: Json<Vec<Question>>,
    created_by: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<QuizRow> for Quiz {
    type Error = AppError;

    fn try_from(row: QuizRow) -> Result<Self, Self::Error> {
        Ok(Quiz {
            id: stored_id(&row.id)?,
            title: row.title,
            description: row.description,
            questions: row.questions.0,
            created_by: row.created_by,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AttemptRow {
    quiz_id: String,
    score: i32,
    total_correct: i32,
    total_questions: i32,
    percentage_score: i32,
    answers: Json<Vec<Answer>>,
    completed_at: DateTime<Utc>,
}

impl TryFrom<AttemptRow> for Attempt {
    type Error = AppError;

    fn try_from(row: AttemptRow) -> Result<Self, Self::Error> {
        Ok(Attempt {
            quiz: stored_id(&row.quiz_id)?,
            score: count(row.score),
            total_correct: count(row.total_correct),
            total_questions: count(row.total_questions),
            percentage_score: count(row.percentage_score),
            answers: row.answers.0,
            completed_at: row.completed_at,
        })
    }
}

/// An attempt joined with its student.
#[derive(sqlx::FromRow)]
struct StudentAttemptRow {
    student_id: i64,
    name: String,
    class_name: String,
    student_created_at: DateTime<Utc>,
    #[sqlx(flatten)]
    attempt: AttemptRow,
}

const QUIZ_COLUMNS: &str =
    "id, title, description, questions, created_by, is_active, created_at";

const ATTEMPT_COLUMNS: &str = "a.quiz_id, a.score, a.total_correct, a.total_questions, \
     a.percentage_score, a.answers, a.completed_at";

fn stored_id(raw: &str) -> Result<RecordId, AppError> {
    RecordId::parse(raw)
        .map_err(|_| AppError::InternalServerError(format!("Corrupt record id in database: {raw:?}")))
}

fn count(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

fn teacher_insert_error(username: &str) -> impl Fn(sqlx::Error) -> AppError + '_ {
    move |e| {
        if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
            AppError::Conflict(format!("Username '{}' already exists", username))
        } else {
            tracing::error!("Failed to create teacher: {:?}", e);
            AppError::from(e)
        }
    }
}

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| {
        tracing::error!("{}: {:?}", context, e);
        AppError::InternalServerError(e.to_string())
    }
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects with a few retries, giving the database time to come up.
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let mut retry_count = 0;
        let pool = loop {
            match PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(3))
                .connect(database_url)
                .await
            {
                Ok(pool) => break pool,
                Err(e) => {
                    retry_count += 1;
                    if retry_count > CONNECT_RETRIES {
                        return Err(AppError::InternalServerError(format!(
                            "Failed to connect to database after {} retries: {}",
                            CONNECT_RETRIES, e
                        )));
                    }
                    tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        };
        Ok(Self::new(pool))
    }

    /// Applies the embedded migrations.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_first_teacher(
        &self,
        username: &str,
        password_hash: &str,
        full_name: &str,
    ) -> Result<Option<Teacher>, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to start transaction"))?;

        // Blocks concurrent first registrations until this one commits.
        sqlx::query("LOCK TABLE teachers IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to lock teachers"))?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM teachers")
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("Failed to count teachers"))?;
        if existing > 0 {
            return Ok(None);
        }

        let teacher = sqlx::query_as::<_, TeacherRow>(INSERT_TEACHER)
            .bind(username)
            .bind(password_hash)
            .bind(full_name)
            .fetch_one(&mut *tx)
            .await
            .map_err(teacher_insert_error(username))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit teacher"))?;
        Ok(Some(teacher.into()))
    }

    async fn create_teacher(
        &self,
        username: &str,
        password_hash: &str,
        full_name: &str,
    ) -> Result<Teacher, AppError> {
        sqlx::query_as::<_, TeacherRow>(INSERT_TEACHER)
            .bind(username)
            .bind(password_hash)
            .bind(full_name)
            .fetch_one(&self.pool)
            .await
            .map(Teacher::from)
            .map_err(teacher_insert_error(username))
    }

    async fn find_teacher_by_username(&self, username: &str) -> Result<Option<Teacher>, AppError> {
        let row = sqlx::query_as::<_, TeacherRow>(
            "SELECT id, username, password, full_name, created_at FROM teachers WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to look up teacher"))?;

        Ok(row.map(Teacher::from))
    }

    async fn insert_quiz(&self, quiz: &Quiz) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO quizzes (id, title, description, questions, created_by, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(quiz.id.as_str())
        .bind(&quiz.title)
        .bind(&quiz.description)
        .bind(Json(&quiz.questions))
        .bind(quiz.created_by)
        .bind(quiz.is_active)
        .bind(quiz.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to insert quiz"))?;
        Ok(())
    }

    async fn find_quiz(&self, id: &RecordId) -> Result<Option<Quiz>, AppError> {
        sqlx::query_as::<_, QuizRow>(&format!("SELECT {QUIZ_COLUMNS} FROM quizzes WHERE id = $1"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to fetch quiz"))?
            .map(Quiz::try_from)
            .transpose()
    }

    async fn find_owned_quiz(&self, id: &RecordId, teacher_id: i64) -> Result<Option<Quiz>, AppError> {
        sqlx::query_as::<_, QuizRow>(&format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE id = $1 AND created_by = $2"
        ))
        .bind(id.as_str())
        .bind(teacher_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch owned quiz"))?
        .map(Quiz::try_from)
        .transpose()
    }

    async fn list_teacher_quizzes(&self, teacher_id: i64) -> Result<Vec<Quiz>, AppError> {
        sqlx::query_as::<_, QuizRow>(&format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE created_by = $1 ORDER BY created_at DESC"
        ))
        .bind(teacher_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list teacher quizzes"))?
        .into_iter()
        .map(Quiz::try_from)
        .collect()
    }

    async fn list_active_quizzes(&self) -> Result<Vec<Quiz>, AppError> {
        sqlx::query_as::<_, QuizRow>(&format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE is_active ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list active quizzes"))?
        .into_iter()
        .map(Quiz::try_from)
        .collect()
    }

    async fn update_quiz(
        &self,
        id: &RecordId,
        teacher_id: i64,
        payload: &QuizPayload,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE quizzes
            SET title = $1, description = NULLIF($2, ''), questions = $3
            WHERE id = $4 AND created_by = $5
            "#,
        )
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(Json(&payload.questions))
        .bind(id.as_str())
        .bind(teacher_id)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to update quiz"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn toggle_quiz_active(&self, id: &RecordId, teacher_id: i64) -> Result<Option<bool>, AppError> {
        sqlx::query_scalar(
            r#"
            UPDATE quizzes SET is_active = NOT is_active
            WHERE id = $1 AND created_by = $2
            RETURNING is_active
            "#,
        )
        .bind(id.as_str())
        .bind(teacher_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to toggle quiz status"))
    }

    async fn delete_quiz(&self, id: &RecordId, teacher_id: i64) -> Result<bool, AppError> {
        // Attempts go with the quiz via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM quizzes WHERE id = $1 AND created_by = $2")
            .bind(id.as_str())
            .bind(teacher_id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete quiz"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_or_create_student(&self, name: &str, class_name: &str) -> Result<Student, AppError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let (id, name, class_name, created_at) =
            sqlx::query_as::<_, (i64, String, String, DateTime<Utc>)>(
                r#"
                INSERT INTO students (name, class_name)
                VALUES ($1, $2)
                ON CONFLICT (name, class_name) DO UPDATE SET name = EXCLUDED.name
                RETURNING id, name, class_name, created_at
                "#,
            )
            .bind(name)
            .bind(class_name)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to register student"))?;

        Ok(Student {
            id,
            name,
            class_name,
            created_at,
        })
    }

    async fn find_student(&self, id: i64) -> Result<Option<Student>, AppError> {
        let row = sqlx::query_as::<_, (i64, String, String, DateTime<Utc>)>(
            "SELECT id, name, class_name, created_at FROM students WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch student"))?;

        Ok(row.map(|(id, name, class_name, created_at)| Student {
            id,
            name,
            class_name,
            created_at,
        }))
    }

    async fn attempted_quiz_ids(&self, student_id: i64) -> Result<Vec<RecordId>, AppError> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT quiz_id FROM attempts WHERE student_id = $1 ORDER BY completed_at",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list attempted quizzes"))?;

        ids.iter().map(|id| stored_id(id)).collect()
    }

    async fn find_attempt(&self, student_id: i64, quiz_id: &RecordId) -> Result<Option<Attempt>, AppError> {
        sqlx::query_as::<_, AttemptRow>(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM attempts a WHERE a.student_id = $1 AND a.quiz_id = $2"
        ))
        .bind(student_id)
        .bind(quiz_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch attempt"))?
        .map(Attempt::try_from)
        .transpose()
    }

    async fn insert_attempt(&self, student_id: i64, attempt: &Attempt) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO attempts
                (student_id, quiz_id, score, total_correct, total_questions,
                 percentage_score, answers, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (student_id, quiz_id) DO NOTHING
            "#,
        )
        .bind(student_id)
        .bind(attempt.quiz.as_str())
        .bind(attempt.score as i32)
        .bind(attempt.total_correct as i32)
        .bind(attempt.total_questions as i32)
        .bind(attempt.percentage_score as i32)
        .bind(Json(&attempt.answers))
        .bind(attempt.completed_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to insert attempt"))?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_quiz_attempts(
        &self,
        quiz_id: &RecordId,
        class_name: Option<&str>,
    ) -> Result<Vec<StudentAttempt>, AppError> {
        let rows = sqlx::query_as::<_, StudentAttemptRow>(&format!(
            r#"
            SELECT
                s.id AS student_id, s.name, s.class_name, s.created_at AS student_created_at,
                {ATTEMPT_COLUMNS}
            FROM attempts a
            JOIN students s ON s.id = a.student_id
            WHERE a.quiz_id = $1 AND ($2::TEXT IS NULL OR s.class_name = $2)
            ORDER BY a.completed_at, a.id
            "#
        ))
        .bind(quiz_id.as_str())
        .bind(class_name)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list quiz attempts"))?;

        rows.into_iter()
            .map(|row| {
                Ok(StudentAttempt {
                    student: Student {
                        id: row.student_id,
                        name: row.name,
                        class_name: row.class_name,
                        created_at: row.student_created_at,
                    },
                    attempt: Attempt::try_from(row.attempt)?,
                })
            })
            .collect()
    }
}
