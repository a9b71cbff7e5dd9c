// src/config.rs

use std::{env, path::PathBuf};

use chrono::{FixedOffset, Offset, Utc};
use dotenvy::dotenv;

/// Upload size ceiling for question images (5 MB).
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Grades offered in the class filter (1 through 5).
pub const CLASS_GRADES: std::ops::RangeInclusive<u8> = 1..=5;

/// Class letters offered in the class filter (A through K).
pub const CLASS_LETTERS: std::ops::RangeInclusive<char> = 'A'..='K';

#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string. When unset the in-memory store is used.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub export_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// Fixed UTC offset used for timestamps in CSV exports.
    pub export_utc_offset_hours: i32,
    pub teacher_username: Option<String>,
    pub teacher_password: Option<String>,
    pub teacher_full_name: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2 * 60 * 60);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let upload_dir = env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("public/uploads"));

        let export_dir = env::var("EXPORT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("exports"));

        let export_utc_offset_hours = env::var("EXPORT_UTC_OFFSET_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|h: &i32| (-23..=23).contains(h))
            .unwrap_or(7);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            port,
            upload_dir,
            export_dir,
            max_upload_bytes: MAX_UPLOAD_BYTES,
            export_utc_offset_hours,
            teacher_username: env::var("TEACHER_USERNAME").ok(),
            teacher_password: env::var("TEACHER_PASSWORD").ok(),
            teacher_full_name: env::var("TEACHER_FULL_NAME").ok(),
        }
    }

    /// Offset applied to completion times in CSV exports.
    pub fn export_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.export_utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }
}
