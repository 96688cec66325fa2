use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("unknown session id '{id}'")]
    UnknownSession { id: String },

    #[error("unknown message id '{message_id}' in session '{session_id}'")]
    UnknownMessage {
        session_id: String,
        message_id: String,
    },

    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse session history at {path}: {source}")]
    JsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize session history for {path}: {source}")]
    JsonSerialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(
        "session '{session_id}' in {path} has invalid RFC3339 timestamp in field '{field}': {value}"
    )]
    InvalidTimestamp {
        path: PathBuf,
        session_id: String,
        field: &'static str,
        value: String,
    },

    #[error("failed to format current UTC timestamp as RFC3339: {0}")]
    ClockFormat(#[source] time::error::Format),
}

impl SessionStoreError {
    #[must_use]
    pub fn unknown_session(id: impl Into<String>) -> Self {
        Self::UnknownSession { id: id.into() }
    }

    #[must_use]
    pub fn unknown_message(session_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self::UnknownMessage {
            session_id: session_id.into(),
            message_id: message_id.into(),
        }
    }

    #[must_use]
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn json_parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::JsonParse {
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn json_serialize(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::JsonSerialize {
            path: path.into(),
            source,
        }
    }
}
