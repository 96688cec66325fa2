//! Transport-only Gemini API client primitives.
//!
//! This crate owns request building and SSE response parsing for the
//! `streamGenerateContent` endpoint only. It intentionally contains no
//! marker-grammar knowledge, no session bookkeeping, and no runtime UI
//! coupling; fragment text is opaque UTF-8 to this layer.
//!
//! No automatic retry happens here: a transport fault terminates the stream
//! and a fresh caller-initiated request is the only retry path.

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod payload;
pub mod sse;
pub mod url;

pub use client::{CancellationSignal, GeminiApiClient, StreamOutcome};
pub use config::GeminiApiConfig;
pub use error::GeminiApiError;
pub use events::GeminiStreamEvent;
pub use payload::{Content, GenerateContentRequest, GenerationConfig, Part, ThinkingConfig};
pub use sse::SseStreamParser;
pub use url::{stream_url, DEFAULT_GEMINI_BASE_URL};
