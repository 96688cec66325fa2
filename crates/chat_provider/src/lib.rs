//! Minimal provider-agnostic contract for streaming one model answer.
//!
//! This crate defines only the shared stream lifecycle and conversation
//! history types. It excludes provider transport details, marker parsing,
//! and session bookkeeping.

use std::fmt;
use std::sync::{atomic::AtomicBool, Arc};

use serde::{Deserialize, Serialize};

/// Identifier for one provider stream.
pub type StreamId = u64;

/// Shared cancellation flag for a stream.
pub type CancelSignal = Arc<AtomicBool>;

/// Generation mode selected by the user for one exchange.
///
/// The mode governs provider configuration and which marker grammar the
/// service is expected to emit: `Pro` may emit progress and structure
/// markers, `Fast` emits prose only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatMode {
    Fast,
    Pro,
}

impl ChatMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "FAST",
            Self::Pro => "PRO",
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Author of one message. Closed two-variant enum so state derivation can be
/// checked exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

/// One prior conversation turn submitted to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: Role,
    pub text: String,
}

/// Input required to start one provider stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub stream_id: StreamId,
    /// Latest user text, not yet part of `history`.
    pub message: String,
    pub mode: ChatMode,
    /// Ordered prior turns, oldest first.
    pub history: Vec<HistoryTurn>,
}

/// Provider-emitted lifecycle event for a stream.
///
/// `Chunk` text is opaque UTF-8; the concatenation of all chunks so far
/// equals the answer's current raw content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Started { stream_id: StreamId },
    Chunk { stream_id: StreamId, text: String },
    Finished { stream_id: StreamId },
    Failed { stream_id: StreamId, error: String },
}

impl StreamEvent {
    /// Returns the stream identifier associated with this event.
    #[must_use]
    pub fn stream_id(&self) -> StreamId {
        match self {
            Self::Started { stream_id }
            | Self::Chunk { stream_id, .. }
            | Self::Finished { stream_id }
            | Self::Failed { stream_id, .. } => *stream_id,
        }
    }

    /// Returns true when this event terminates the stream lifecycle.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished { .. } | Self::Failed { .. })
    }
}

/// Error returned while constructing/configuring a provider before any
/// stream starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInitError {
    message: String,
}

impl ProviderInitError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProviderInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProviderInitError {}

impl From<String> for ProviderInitError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ProviderInitError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Immutable metadata describing a stream provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub provider_id: String,
    /// Model selected for [`ChatMode::Pro`] requests.
    pub pro_model_id: String,
    /// Model selected for [`ChatMode::Fast`] requests.
    pub fast_model_id: String,
}

/// Provider interface for executing one stream request.
pub trait ChatStreamProvider: Send + Sync + 'static {
    /// Returns provider/model identity metadata.
    fn profile(&self) -> ProviderProfile;

    /// Executes a stream request and emits lifecycle events in provider
    /// order: `Started`, zero or more `Chunk`s, then exactly one terminal
    /// event. The emit callback is serial from the caller's perspective.
    fn stream(
        &self,
        req: StreamRequest,
        cancel: CancelSignal,
        emit: &mut dyn FnMut(StreamEvent),
    ) -> Result<(), String>;
}
