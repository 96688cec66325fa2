//! Authoritative in-memory model of all chat sessions and messages, plus the
//! persisted JSON layout.
//!
//! The store is synchronous and single-writer: the orchestrator is the only
//! caller that mutates it, and fragments are applied strictly in transport
//! order. Operations referencing an unknown session or message id return an
//! error and leave the store untouched — such calls cannot occur when the
//! orchestrator is used correctly.

mod error;
mod paths;
mod persist;
mod schema;
mod store;

pub use error::SessionStoreError;
pub use paths::{history_file, history_root, HISTORY_FILE_NAME};
pub use persist::{load_sessions, save_sessions};
pub use schema::{ChatSession, Message};
pub use store::{ExchangeIds, SessionStore};
