use chat_provider::{ChatMode, HistoryTurn, Role};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::SessionStoreError;
use crate::schema::{ChatSession, Message};

/// Maximum title length derived from the first user message of a session.
const DERIVED_TITLE_MAX_CHARS: usize = 40;

/// Identifiers of the message pair created by one send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeIds {
    pub user_id: String,
    pub model_id: String,
}

/// In-memory session list plus the active-session selection.
///
/// Sessions are ordered newest-first; messages within a session keep
/// insertion order and are never reordered or individually deleted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionStore {
    sessions: Vec<ChatSession>,
    active_session_id: Option<String>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a previously persisted session list; the front
    /// session (most recent) becomes active.
    #[must_use]
    pub fn from_sessions(sessions: Vec<ChatSession>) -> Self {
        let active_session_id = sessions.first().map(|session| session.id.clone());
        Self {
            sessions,
            active_session_id,
        }
    }

    #[must_use]
    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    #[must_use]
    pub fn active_session_id(&self) -> Option<&str> {
        self.active_session_id.as_deref()
    }

    #[must_use]
    pub fn active_session(&self) -> Option<&ChatSession> {
        let active_id = self.active_session_id.as_deref()?;
        self.sessions.iter().find(|session| session.id == active_id)
    }

    #[must_use]
    pub fn session(&self, session_id: &str) -> Option<&ChatSession> {
        self.sessions.iter().find(|session| session.id == session_id)
    }

    /// Makes an existing session the active one.
    pub fn select_session(&mut self, session_id: &str) -> Result<(), SessionStoreError> {
        if self.session(session_id).is_none() {
            return Err(SessionStoreError::unknown_session(session_id));
        }

        self.active_session_id = Some(session_id.to_string());
        Ok(())
    }

    /// Inserts an empty session at the front of the list and makes it
    /// active. Returns the new session id.
    pub fn create_session(&mut self) -> Result<String, SessionStoreError> {
        let now = now_rfc3339()?;
        let id = Uuid::new_v4().to_string();

        self.sessions.insert(
            0,
            ChatSession {
                id: id.clone(),
                title: String::new(),
                messages: Vec::new(),
                created_at: now.clone(),
                last_modified: now,
            },
        );
        self.active_session_id = Some(id.clone());

        Ok(id)
    }

    /// Removes a session. When the active session is deleted, the new front
    /// of the remaining list becomes active (or none when the list is
    /// empty). The caller is responsible for obtaining user confirmation
    /// before invoking this.
    pub fn delete_session(&mut self, session_id: &str) -> Result<(), SessionStoreError> {
        let index = self
            .sessions
            .iter()
            .position(|session| session.id == session_id)
            .ok_or_else(|| SessionStoreError::unknown_session(session_id))?;

        self.sessions.remove(index);

        if self.active_session_id.as_deref() == Some(session_id) {
            self.active_session_id = self.sessions.first().map(|session| session.id.clone());
        }

        Ok(())
    }

    /// Sets the title unconditionally; no uniqueness constraint.
    pub fn rename_session(
        &mut self,
        session_id: &str,
        title: impl Into<String>,
    ) -> Result<(), SessionStoreError> {
        let session = self.session_mut(session_id)?;
        session.title = title.into();
        Ok(())
    }

    /// Appends a user message with `user_text` and an empty model
    /// placeholder, both timestamped now. Derives the session title from the
    /// user text when the session has none yet.
    pub fn append_exchange(
        &mut self,
        session_id: &str,
        user_text: &str,
        mode: ChatMode,
    ) -> Result<ExchangeIds, SessionStoreError> {
        let now = now_rfc3339()?;
        let session = self.session_mut(session_id)?;

        let user_id = Uuid::new_v4().to_string();
        let model_id = Uuid::new_v4().to_string();

        session.messages.push(Message {
            id: user_id.clone(),
            role: Role::User,
            content: user_text.to_string(),
            timestamp: now.clone(),
            mode,
        });
        session.messages.push(Message {
            id: model_id.clone(),
            role: Role::Model,
            content: String::new(),
            timestamp: now.clone(),
            mode,
        });

        if session.title.is_empty() {
            session.title = derive_title(user_text);
        }
        session.last_modified = now;

        Ok(ExchangeIds { user_id, model_id })
    }

    /// Concatenates `text` onto the target message's content. Fragments must
    /// arrive in transport order; no dedup or reordering happens here.
    pub fn append_fragment(
        &mut self,
        session_id: &str,
        message_id: &str,
        text: &str,
    ) -> Result<(), SessionStoreError> {
        let message = self.message_mut(session_id, message_id)?;
        message.content.push_str(text);
        Ok(())
    }

    /// Wholesale content overwrite, used by regenerate-reset and the
    /// transport-failure fallback.
    pub fn replace_content(
        &mut self,
        session_id: &str,
        message_id: &str,
        text: &str,
    ) -> Result<(), SessionStoreError> {
        let message = self.message_mut(session_id, message_id)?;
        message.content = text.to_string();
        Ok(())
    }

    /// Returns (role, text) pairs for every message strictly before
    /// `upto_index`, for submission to the transport.
    pub fn history(
        &self,
        session_id: &str,
        upto_index: usize,
    ) -> Result<Vec<HistoryTurn>, SessionStoreError> {
        let session = self
            .session(session_id)
            .ok_or_else(|| SessionStoreError::unknown_session(session_id))?;

        Ok(session
            .messages
            .iter()
            .take(upto_index)
            .map(|message| HistoryTurn {
                role: message.role,
                text: message.content.clone(),
            })
            .collect())
    }

    fn session_mut(&mut self, session_id: &str) -> Result<&mut ChatSession, SessionStoreError> {
        self.sessions
            .iter_mut()
            .find(|session| session.id == session_id)
            .ok_or_else(|| SessionStoreError::unknown_session(session_id))
    }

    fn message_mut(
        &mut self,
        session_id: &str,
        message_id: &str,
    ) -> Result<&mut Message, SessionStoreError> {
        let session = self.session_mut(session_id)?;
        session
            .messages
            .iter_mut()
            .find(|message| message.id == message_id)
            .ok_or_else(|| SessionStoreError::unknown_message(session_id, message_id))
    }
}

fn derive_title(user_text: &str) -> String {
    let mut title: String = user_text.chars().take(DERIVED_TITLE_MAX_CHARS).collect();
    if user_text.chars().count() > DERIVED_TITLE_MAX_CHARS {
        title.push_str("...");
    }
    title
}

fn now_rfc3339() -> Result<String, SessionStoreError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(SessionStoreError::ClockFormat)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_session() -> (SessionStore, String) {
        let mut store = SessionStore::new();
        let id = store.create_session().expect("session is created");
        (store, id)
    }

    #[test]
    fn create_session_inserts_at_front_and_activates() {
        let mut store = SessionStore::new();

        let first = store.create_session().expect("first session");
        let second = store.create_session().expect("second session");

        assert_eq!(store.sessions().len(), 2);
        assert_eq!(store.sessions()[0].id, second);
        assert_eq!(store.sessions()[1].id, first);
        assert_eq!(store.active_session_id(), Some(second.as_str()));
        assert_ne!(first, second, "identifiers are never reused");
    }

    #[test]
    fn append_exchange_creates_contiguous_user_then_model_pair() {
        let (mut store, id) = store_with_session();

        let pair = store
            .append_exchange(&id, "প্রথম প্রশ্ন", ChatMode::Pro)
            .expect("exchange appended");

        let session = store.session(&id).expect("session exists");
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].id, pair.user_id);
        assert_eq!(session.messages[0].role, Role::User);
        assert_eq!(session.messages[0].content, "প্রথম প্রশ্ন");
        assert_eq!(session.messages[1].id, pair.model_id);
        assert_eq!(session.messages[1].role, Role::Model);
        assert_eq!(session.messages[1].content, "");
        assert_eq!(session.messages[1].mode, ChatMode::Pro);
    }

    #[test]
    fn first_exchange_derives_title_capped_at_forty_chars() {
        let (mut store, id) = store_with_session();
        let long_text = "x".repeat(50);

        store
            .append_exchange(&id, &long_text, ChatMode::Fast)
            .expect("exchange appended");

        let title = &store.session(&id).expect("session exists").title;
        assert_eq!(title, &format!("{}...", "x".repeat(40)));

        // Title derivation happens only while the title is empty.
        store
            .append_exchange(&id, "second message", ChatMode::Fast)
            .expect("exchange appended");
        assert_eq!(
            store.session(&id).expect("session exists").title,
            format!("{}...", "x".repeat(40))
        );
    }

    #[test]
    fn rename_overwrites_title_unconditionally() {
        let (mut store, id) = store_with_session();

        store.rename_session(&id, "নতুন নাম").expect("rename works");

        assert_eq!(store.session(&id).expect("session exists").title, "নতুন নাম");
    }

    #[test]
    fn append_fragment_concatenates_in_arrival_order() {
        let (mut store, id) = store_with_session();
        let pair = store
            .append_exchange(&id, "hi", ChatMode::Fast)
            .expect("exchange appended");

        store.append_fragment(&id, &pair.model_id, "He").expect("fragment one");
        store.append_fragment(&id, &pair.model_id, "llo").expect("fragment two");

        let session = store.session(&id).expect("session exists");
        assert_eq!(session.messages[1].content, "Hello");
    }

    #[test]
    fn replace_content_overwrites_wholesale() {
        let (mut store, id) = store_with_session();
        let pair = store
            .append_exchange(&id, "hi", ChatMode::Fast)
            .expect("exchange appended");
        store.append_fragment(&id, &pair.model_id, "old answer").expect("fragment");

        store.replace_content(&id, &pair.model_id, "").expect("content replaced");

        assert_eq!(store.session(&id).expect("session exists").messages[1].content, "");
    }

    #[test]
    fn history_returns_turns_strictly_before_the_index() {
        let (mut store, id) = store_with_session();
        let first = store
            .append_exchange(&id, "one", ChatMode::Fast)
            .expect("first exchange");
        store
            .append_fragment(&id, &first.model_id, "answer one")
            .expect("fragment");
        store
            .append_exchange(&id, "two", ChatMode::Fast)
            .expect("second exchange");

        let history = store.history(&id, 2).expect("history builds");

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].text, "one");
        assert_eq!(history[1].role, Role::Model);
        assert_eq!(history[1].text, "answer one");
    }

    #[test]
    fn deleting_the_active_session_activates_the_new_front() {
        let mut store = SessionStore::new();
        let first = store.create_session().expect("first session");
        let second = store.create_session().expect("second session");

        store.delete_session(&second).expect("active session deleted");

        assert_eq!(store.active_session_id(), Some(first.as_str()));

        store.delete_session(&first).expect("last session deleted");
        assert!(store.is_empty());
        assert_eq!(store.active_session_id(), None);
    }

    #[test]
    fn deleting_a_non_active_session_keeps_the_active_selection() {
        let mut store = SessionStore::new();
        let first = store.create_session().expect("first session");
        let second = store.create_session().expect("second session");

        store.delete_session(&first).expect("inactive session deleted");

        assert_eq!(store.active_session_id(), Some(second.as_str()));
    }

    #[test]
    fn unknown_ids_fail_without_corrupting_state() {
        let (mut store, id) = store_with_session();
        store
            .append_exchange(&id, "hi", ChatMode::Fast)
            .expect("exchange appended");
        let before = store.clone();

        assert!(matches!(
            store.delete_session("missing"),
            Err(SessionStoreError::UnknownSession { .. })
        ));
        assert!(matches!(
            store.append_fragment(&id, "missing", "text"),
            Err(SessionStoreError::UnknownMessage { .. })
        ));
        assert!(matches!(
            store.history("missing", 0),
            Err(SessionStoreError::UnknownSession { .. })
        ));

        assert_eq!(store, before);
    }

    #[test]
    fn timestamps_are_rfc3339() {
        let (store, id) = store_with_session();
        let session = store.session(&id).expect("session exists");

        assert!(OffsetDateTime::parse(&session.created_at, &Rfc3339).is_ok());
        assert!(OffsetDateTime::parse(&session.last_modified, &Rfc3339).is_ok());
    }
}
