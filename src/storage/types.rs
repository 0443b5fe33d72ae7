use chrono::{DateTime, Utc};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process holds the database lock
    #[error("Another instance of bufferlinks appears to be running. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Map a sqlx error, recognizing SQLite lock conditions
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_message(&err.to_string()) {
            return DatabaseError::InstanceLocked;
        }
        DatabaseError::Other(err)
    }
}

/// SQLITE_BUSY (5), SQLITE_LOCKED (6) and SQLITE_CANTOPEN (14) messages
pub(crate) fn is_lock_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("sqlite_busy")
        || message.contains("sqlite_locked")
        || message.contains("unable to open database file")
}

// ============================================================================
// Persisted State
// ============================================================================

/// Persisted operator state for an article, keyed by the article URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleState {
    pub url: String,
    /// `None` when the stored timestamp is zero.
    pub dismissed_at: Option<DateTime<Utc>>,
}

impl ArticleState {
    pub fn is_dismissed(&self) -> bool {
        self.dismissed_at.is_some()
    }
}

/// Persisted operator state for a link, keyed by the link URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkState {
    pub url: String,
    /// Article the link was queued from, when known.
    pub article_url: Option<String>,
    pub queued_at: DateTime<Utc>,
}

/// Row type for `article_state` (timestamps in Unix milliseconds)
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ArticleStateRow {
    pub url: String,
    pub dismissed_at: i64,
}

impl ArticleStateRow {
    pub(crate) fn into_state(self) -> ArticleState {
        let dismissed_at = if self.dismissed_at == 0 {
            None
        } else {
            DateTime::from_timestamp_millis(self.dismissed_at)
        };
        ArticleState {
            url: self.url,
            dismissed_at,
        }
    }
}

/// Row type for `link_state` (timestamps in Unix milliseconds)
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct LinkStateRow {
    pub url: String,
    pub article_url: Option<String>,
    pub queued_at: i64,
}

impl LinkStateRow {
    pub(crate) fn into_state(self) -> LinkState {
        LinkState {
            url: self.url,
            article_url: self.article_url,
            queued_at: DateTime::from_timestamp_millis(self.queued_at).unwrap_or_default(),
        }
    }
}
