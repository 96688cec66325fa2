use serde::{Deserialize, Serialize};

/// Stream event emitted by the SSE parser after normalization.
///
/// A single SSE frame can yield both a `TextDelta` and a `Finished` event:
/// the final chunk of a response usually carries its last text parts and the
/// finish reason together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeminiStreamEvent {
    TextDelta { text: String },
    Finished { finish_reason: String },
    StreamError { message: String },
}
