// src/export.rs

//! CSV export of quiz results.
//!
//! Exports are written to a scratch file in the export directory and streamed
//! back. [`ExportFile`] removes the file when dropped, and the response body
//! owns it, so the file disappears whether the download finishes, fails or is
//! aborted by the client.

use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use axum::body::Body;
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use futures::StreamExt;
use regex::Regex;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::{
    error::AppError,
    grading::percentage,
    models::{attempt::StudentAttempt, quiz::Quiz},
};

static UNSAFE_FILE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]").expect("static regex"));

/// Which students an export covers. The class column is dropped for a single class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportScope<'a> {
    AllStudents,
    Class(&'a str),
}

/// One CSV line.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub ordinal: usize,
    pub name: String,
    pub class_name: String,
    /// `correct/total`
    pub score: String,
    /// `NN%`
    pub percentage: String,
    pub correct: u32,
    pub wrong: u32,
    pub completed_at: String,
}

/// Formats a completion time as `HH:MM:SS D/M/YYYY` in the given offset.
pub fn format_completed_at(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format("%H:%M:%S %-d/%-m/%Y").to_string()
}

/// Projects attempts to CSV rows, keeping their order.
pub fn export_rows(quiz: &Quiz, entries: &[StudentAttempt], offset: FixedOffset) -> Vec<ExportRow> {
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let attempt = &entry.attempt;
            let correct = attempt.total_correct;
            let total = match attempt.total_questions {
                0 => quiz.questions.len() as u32,
                n => n,
            };
            let percentage_score = match attempt.percentage_score {
                0 => percentage(u64::from(correct), u64::from(total)),
                p => p,
            };

            ExportRow {
                ordinal: i + 1,
                name: entry.student.name.clone(),
                class_name: entry.student.class_name.clone(),
                score: format!("{correct}/{total}"),
                percentage: format!("{percentage_score}%"),
                correct,
                wrong: total.saturating_sub(correct),
                completed_at: format_completed_at(attempt.completed_at, offset),
            }
        })
        .collect()
}

/// Encodes rows as UTF-8 CSV with a header line.
pub fn write_csv(scope: ExportScope<'_>, rows: &[ExportRow]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    match scope {
        ExportScope::AllStudents => writer.write_record([
            "No.", "Full Name", "Class", "Score", "Percentage", "Correct", "Wrong", "Completed At",
        ])?,
        ExportScope::Class(_) => writer.write_record([
            "No.", "Full Name", "Score", "Percentage", "Correct", "Wrong", "Completed At",
        ])?,
    }

    for row in rows {
        let ordinal = row.ordinal.to_string();
        let correct = row.correct.to_string();
        let wrong = row.wrong.to_string();
        let mut record = vec![ordinal.as_str(), row.name.as_str()];
        if scope == ExportScope::AllStudents {
            record.push(&row.class_name);
        }
        record.extend([
            row.score.as_str(),
            row.percentage.as_str(),
            correct.as_str(),
            wrong.as_str(),
            row.completed_at.as_str(),
        ]);
        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::InternalServerError(e.to_string()))
}

fn file_component(raw: &str) -> String {
    UNSAFE_FILE_CHARS.replace_all(raw, "-").into_owned()
}

/// `results[-{class}]-{title}-{timestamp}-{random}.csv`, safe for any title or class.
pub fn export_filename(quiz_title: &str, scope: ExportScope<'_>, now: DateTime<Utc>) -> String {
    let timestamp = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    let suffix = &Uuid::new_v4().simple().to_string()[..8];
    let title = file_component(quiz_title);

    match scope {
        ExportScope::AllStudents => format!("results-{title}-{timestamp}-{suffix}.csv"),
        ExportScope::Class(class) => {
            format!("results-{}-{title}-{timestamp}-{suffix}.csv", file_component(class))
        }
    }
}

/// A file in the export directory that is deleted when this guard is dropped.
#[derive(Debug)]
pub struct ExportFile {
    path: PathBuf,
    name: String,
}

impl ExportFile {
    /// Writes `contents` to `dir/name`. A failed write leaves nothing behind.
    pub async fn create(dir: &Path, name: String, contents: &[u8]) -> Result<Self, AppError> {
        tokio::fs::create_dir_all(dir).await?;
        let file = ExportFile {
            path: dir.join(&name),
            name,
        };
        tokio::fs::write(&file.path, contents).await?;
        Ok(file)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Streams the file; the guard travels with the body and fires when it is dropped.
    pub async fn into_body(self) -> Result<Body, AppError> {
        let file = tokio::fs::File::open(&self.path).await?;
        let guard = self;
        let stream = ReaderStream::new(file).map(move |chunk| {
            let _guard = &guard;
            chunk
        });
        Ok(Body::from_stream(stream))
    }
}

impl Drop for ExportFile {
    // A single unlink, done inline: the guard can drop outside any runtime.
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Removed export file {}", self.name),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::error!("Error deleting export file {}: {:?}", self.name, e),
        }
    }
}
