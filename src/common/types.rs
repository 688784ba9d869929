use std::fmt;

use chrono::{DateTime, Local, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ChatError, Result};

/// Display name used when the sender leaves the username blank.
pub const DEFAULT_USERNAME: &str = "Anonymous";
pub const MAX_USERNAME_CHARS: usize = 20;
pub const MAX_CONTENT_CHARS: usize = 500;

/// A chat message as stored by the backend and shown in the list.
///
/// Messages are immutable once created; the only way one leaves the list
/// is a delete event carrying its `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Build a fresh message stamped with the current time.
    ///
    /// The timestamp is truncated to milliseconds, the precision the
    /// database keeps, so a stored row compares equal to what was inserted.
    pub fn new(username: &str, content: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username: display_name(username),
            content: content.to_string(),
            created_at: Utc::now().trunc_subsecs(3),
        }
    }

    /// Local wall-clock time, e.g. `3:07 PM`.
    pub fn time_label(&self) -> String {
        self.created_at
            .with_timezone(&Local)
            .format("%-I:%M %p")
            .to_string()
    }
}

impl fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.username, self.content)
    }
}

/// Normalize a user-supplied name: trimmed, capped at
/// [`MAX_USERNAME_CHARS`], and [`DEFAULT_USERNAME`] when nothing is left.
pub fn display_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return DEFAULT_USERNAME.to_string();
    }
    trimmed.chars().take(MAX_USERNAME_CHARS).collect()
}

/// Reject blank content and content over [`MAX_CONTENT_CHARS`].
pub fn validate_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(ChatError::Validation("message is empty".to_string()));
    }
    let length = content.chars().count();
    if length > MAX_CONTENT_CHARS {
        return Err(ChatError::Validation(format!(
            "message is {length} characters, limit is {MAX_CONTENT_CHARS}"
        )));
    }
    Ok(())
}
