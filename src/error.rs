//! Error types for the reminder core
//!
//! Only environment failures are errors here: unreadable or unwritable
//! files, title formats that fail to compile, collaborator handoffs that
//! fail. Per-event conditions (an unresolvable client name, a contact
//! without a usable number, a malformed log line) are reminder statuses or
//! skipped lines, never errors — one bad event must not abort a refresh.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReminderError {
    #[error("failed to access {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid title format: {0}")]
    Pattern(String),

    #[error("message gateway error: {0}")]
    Gateway(String),

    #[error("collaborator error: {0}")]
    Source(String),
}

impl ReminderError {
    pub(crate) fn persistence(path: &Path, source: std::io::Error) -> Self {
        ReminderError::Persistence {
            path: path.to_path_buf(),
            source,
        }
    }
}
