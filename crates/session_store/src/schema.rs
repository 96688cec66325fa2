use chat_provider::{ChatMode, Role};
use serde::{Deserialize, Serialize};

/// One persisted chat session. The persisted list is ordered newest-first
/// (new sessions insert at the front) and is the sole source of truth on
/// restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatSession {
    pub id: String,
    /// Empty until the first exchange derives a title (or the user renames).
    pub title: String,
    /// Insertion order, never reordered.
    pub messages: Vec<Message>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "lastModified")]
    pub last_modified: String,
}

/// One persisted message. `content` is append-only while its stream is
/// active and wholesale-replaceable on regenerate or transport failure;
/// everything derivable (steps, structure, clean prose) is recomputed at
/// read time and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: String,
    pub mode: ChatMode,
}
