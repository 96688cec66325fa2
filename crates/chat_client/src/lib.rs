//! Terminal streaming chat client.
//!
//! ## Provider bootstrap
//!
//! `chat_client` selects its stream provider at startup:
//!
//! - `CHAT_CLIENT_PROVIDER=mock` for the deterministic local script
//! - `CHAT_CLIENT_PROVIDER=gemini-api` (the default) for Gemini transport,
//!   which requires `GEMINI_API_KEY` (and honors `GEMINI_BASE_URL`)
//!
//! ## State machine contract
//!
//! At most one stream is in flight process-wide. Sends and regenerations are
//! rejected with a notice while the gate is closed; a transport failure
//! substitutes a fixed fallback answer and reopens the gate. The session
//! list is persisted wholesale to `.chat/chat_history_v1.json` under the
//! current working directory after every mutation.

pub mod app;
pub mod commands;
pub mod render;
pub mod runtime;
