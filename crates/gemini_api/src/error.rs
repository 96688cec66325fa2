use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Error as JsonError;

#[derive(Debug)]
pub enum GeminiApiError {
    MissingApiKey,
    InvalidBaseUrl(String),
    Request(reqwest::Error),
    Status(StatusCode, String),
    StreamFailed { message: String },
    Serde(JsonError),
    Cancelled,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    #[serde(rename = "error")]
    pub value: Option<ErrorPayloadFields>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayloadFields {
    pub message: Option<String>,
    pub status: Option<String>,
}

impl fmt::Display for GeminiApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingApiKey => write!(f, "API key is required"),
            Self::InvalidBaseUrl(value) => write!(f, "invalid base URL: {value}"),
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status(status, message) => write!(f, "HTTP {status} {message}"),
            Self::StreamFailed { message } => write!(f, "stream failed: {message}"),
            Self::Serde(error) => write!(f, "serialization error: {error}"),
            Self::Cancelled => write!(f, "request was cancelled"),
        }
    }
}

impl std::error::Error for GeminiApiError {}

impl From<reqwest::Error> for GeminiApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

impl From<JsonError> for GeminiApiError {
    fn from(error: JsonError) -> Self {
        Self::Serde(error)
    }
}

/// Extracts a human-readable message from an HTTP error response body.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(ErrorPayload { value: Some(error) }) = serde_json::from_str::<ErrorPayload>(body) {
        if let Some(message) = error.message.filter(|message| !message.is_empty()) {
            return match error.status.filter(|status| !status.is_empty()) {
                Some(api_status) => format!("{message} ({api_status})"),
                None => message,
            };
        }
    }

    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}
