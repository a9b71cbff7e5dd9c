// src/models/id.rs

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Length of a quiz identifier in hexadecimal characters.
pub const RECORD_ID_LEN: usize = 24;

/// A 24-character lowercase hexadecimal identifier.
///
/// Layout: 4 bytes of creation time (seconds, big-endian) followed by 8 random bytes,
/// so ids sort roughly by creation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

impl RecordId {
    pub fn generate() -> Self {
        let seconds = Utc::now().timestamp() as u32;
        let random = Uuid::new_v4();
        let tail: String = random.as_bytes()[..8]
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();
        RecordId(format!("{seconds:08x}{tail}"))
    }

    /// Validates an id taken from a path segment or a stored row.
    ///
    /// Rejects empty input, the literal `undefined`, wrong lengths and non-hex characters.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        if raw.is_empty()
            || raw == "undefined"
            || raw.len() != RECORD_ID_LEN
            || !raw.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(AppError::BadRequest("Invalid quiz id".to_string()));
        }
        Ok(RecordId(raw.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RecordId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RecordId::parse(&value).map_err(|_| format!("invalid record id: {value:?}"))
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}
