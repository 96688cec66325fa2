use chat_provider::{ChatMode, HistoryTurn, Role, StreamId};
use session_store::{ChatSession, SessionStore};

use crate::commands::{parse_slash_command, SlashCommand};

/// Fixed answer text substituted when a stream fails mid-flight.
pub const FALLBACK_ANSWER: &str =
    "দুঃখিত, তথ্য সংগ্রহ করতে সমস্যা হয়েছে। দয়া করে আবার চেষ্টা করুন।";

const HELP_TEXT: &str = "Commands: /new, /sessions, /select <n>, /rename <title>, \
/delete, /mode <fast|pro>, /regenerate, /help, /quit";
const NOTICE_STREAM_ACTIVE: &str = "Stream already in progress.";

/// Orchestrator lifecycle. `Failed` records the last fault but leaves the
/// gate open: the next send or regenerate is the retry path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    Sending { stream_id: StreamId },
    Streaming { stream_id: StreamId },
    Failed { error: String },
}

/// Where fragments of the active stream land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTarget {
    pub stream_id: StreamId,
    pub session_id: String,
    pub model_message_id: String,
}

/// Host capabilities the orchestrator depends on. Implemented by the
/// threaded stream controller in production and by spies in tests.
pub trait HostOps {
    fn start_stream(
        &mut self,
        message: String,
        mode: ChatMode,
        history: Vec<HistoryTurn>,
    ) -> Result<StreamId, String>;
    /// Asks the user to confirm a session deletion. Declining is a no-op.
    fn confirm_delete(&mut self, title: &str) -> bool;
    fn persist_sessions(&mut self, sessions: &[ChatSession]);
    fn request_render(&mut self);
    fn request_stop(&mut self);
}

/// Session/message state machine driving sends, streams, regeneration and
/// deletion over the shared store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct App {
    store: SessionStore,
    mode: ChatMode,
    state: OrchestratorState,
    target: Option<StreamTarget>,
    notices: Vec<String>,
    pub should_exit: bool,
}

impl Default for App {
    fn default() -> Self {
        Self::new(SessionStore::new())
    }
}

impl App {
    #[must_use]
    pub fn new(store: SessionStore) -> Self {
        Self {
            store,
            mode: ChatMode::Fast,
            state: OrchestratorState::Idle,
            target: None,
            notices: Vec::new(),
            should_exit: false,
        }
    }

    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    #[must_use]
    pub fn state(&self) -> &OrchestratorState {
        &self.state
    }

    #[must_use]
    pub fn chat_mode(&self) -> ChatMode {
        self.mode
    }

    /// Message currently receiving fragments, when a stream is in flight.
    #[must_use]
    pub fn streaming_message_id(&self) -> Option<&str> {
        self.target
            .as_ref()
            .map(|target| target.model_message_id.as_str())
    }

    /// Drains accumulated user-facing notices.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    /// True when a new stream may start. `Failed` keeps the gate open so the
    /// user can retry immediately.
    #[must_use]
    pub fn gate_open(&self) -> bool {
        matches!(
            self.state,
            OrchestratorState::Idle | OrchestratorState::Failed { .. }
        )
    }

    pub fn on_submit(&mut self, input: &str, host: &mut dyn HostOps) {
        let text = input.trim();
        if text.is_empty() {
            host.request_render();
            return;
        }

        if let Some(command) = parse_slash_command(text) {
            self.on_command(command, host);
            return;
        }

        self.send(text, host);
    }

    fn on_command(&mut self, command: SlashCommand, host: &mut dyn HostOps) {
        match command {
            SlashCommand::New => self.new_chat(host),
            SlashCommand::Sessions => self.list_sessions(),
            SlashCommand::Select(index) => self.select_session_by_index(index),
            SlashCommand::Rename(title) => self.rename_active(&title, host),
            SlashCommand::Delete => self.delete_active(host),
            SlashCommand::Mode(mode) => {
                self.mode = mode;
                self.push_notice(format!("Mode set to {mode}"));
            }
            SlashCommand::Regenerate => {
                self.regenerate(host);
                return;
            }
            SlashCommand::Help => self.push_notice(HELP_TEXT.to_string()),
            SlashCommand::Quit => {
                self.on_quit(host);
                return;
            }
            SlashCommand::Unknown(command) => {
                self.push_notice(format!("Unknown command: {command}"));
            }
        }

        host.request_render();
    }

    /// Starts a new exchange in the active session (creating one when
    /// needed). Rejected with a notice while a stream is in flight.
    pub fn send(&mut self, text: &str, host: &mut dyn HostOps) {
        if !self.gate_open() {
            self.push_notice(NOTICE_STREAM_ACTIVE.to_string());
            host.request_render();
            return;
        }

        let session_id = match self.store.active_session_id() {
            Some(id) => id.to_string(),
            None => match self.store.create_session() {
                Ok(id) => id,
                Err(error) => {
                    log::error!("failed to create session: {error}");
                    self.push_notice(format!("Failed to create session: {error}"));
                    host.request_render();
                    return;
                }
            },
        };

        let exchange = match self.store.append_exchange(&session_id, text, self.mode) {
            Ok(exchange) => exchange,
            Err(error) => {
                log::error!("failed to append exchange: {error}");
                self.push_notice(format!("Failed to record message: {error}"));
                host.request_render();
                return;
            }
        };

        // History excludes the just-appended user/model pair.
        let history = self.history_before_last_pair(&session_id);
        host.persist_sessions(self.store.sessions());

        self.start_stream(&session_id, &exchange.model_id, text.to_string(), history, host);
        host.request_render();
    }

    /// Re-runs the last exchange of the active session, reusing the trailing
    /// model message in place.
    pub fn regenerate(&mut self, host: &mut dyn HostOps) {
        if !self.gate_open() {
            self.push_notice(NOTICE_STREAM_ACTIVE.to_string());
            host.request_render();
            return;
        }

        let Some((session_id, user_index, user_text, model_id)) = self.last_exchange() else {
            self.push_notice("Nothing to regenerate.".to_string());
            host.request_render();
            return;
        };

        if let Err(error) = self.store.replace_content(&session_id, &model_id, "") {
            log::error!("failed to reset answer for regenerate: {error}");
            self.push_notice(format!("Failed to regenerate: {error}"));
            host.request_render();
            return;
        }

        let history = self
            .store
            .history(&session_id, user_index)
            .unwrap_or_default();
        host.persist_sessions(self.store.sessions());

        self.start_stream(&session_id, &model_id, user_text, history, host);
        host.request_render();
    }

    fn start_stream(
        &mut self,
        session_id: &str,
        model_message_id: &str,
        message: String,
        history: Vec<HistoryTurn>,
        host: &mut dyn HostOps,
    ) {
        match host.start_stream(message, self.mode, history) {
            Ok(stream_id) => {
                self.state = OrchestratorState::Sending { stream_id };
                self.target = Some(StreamTarget {
                    stream_id,
                    session_id: session_id.to_string(),
                    model_message_id: model_message_id.to_string(),
                });
            }
            Err(error) => {
                log::warn!("failed to start stream: {error}");
                self.fail_target(session_id, model_message_id, &error, host);
            }
        }
    }

    fn history_before_last_pair(&self, session_id: &str) -> Vec<HistoryTurn> {
        let message_count = self
            .store
            .session(session_id)
            .map(|session| session.messages.len())
            .unwrap_or(0);

        self.store
            .history(session_id, message_count.saturating_sub(2))
            .unwrap_or_default()
    }

    /// Last user message of the active session plus its trailing model
    /// answer: `(session_id, user_index, user_text, model_message_id)`.
    fn last_exchange(&self) -> Option<(String, usize, String, String)> {
        let session = self.store.active_session()?;
        let user_index = session
            .messages
            .iter()
            .rposition(|message| message.role == Role::User)?;
        let model = session.messages.get(user_index + 1)?;
        if model.role != Role::Model {
            return None;
        }

        Some((
            session.id.clone(),
            user_index,
            session.messages[user_index].content.clone(),
            model.id.clone(),
        ))
    }

    pub fn new_chat(&mut self, host: &mut dyn HostOps) {
        match self.store.create_session() {
            Ok(_) => host.persist_sessions(self.store.sessions()),
            Err(error) => {
                log::error!("failed to create session: {error}");
                self.push_notice(format!("Failed to create session: {error}"));
            }
        }
    }

    fn list_sessions(&mut self) {
        if self.store.is_empty() {
            self.push_notice("No sessions yet. Type a message to start one.".to_string());
            return;
        }

        let active_id = self.store.active_session_id().map(str::to_string);
        let lines: Vec<String> = self
            .store
            .sessions()
            .iter()
            .enumerate()
            .map(|(index, session)| {
                let marker = if Some(&session.id) == active_id.as_ref() {
                    "*"
                } else {
                    " "
                };
                let title = if session.title.is_empty() {
                    "(untitled)"
                } else {
                    session.title.as_str()
                };
                format!("{marker} {}. {title}", index + 1)
            })
            .collect();
        self.push_notice(lines.join("\n"));
    }

    fn select_session_by_index(&mut self, index: usize) {
        let Some(session_id) = self
            .store
            .sessions()
            .get(index - 1)
            .map(|session| session.id.clone())
        else {
            self.push_notice(format!("No session at index {index}."));
            return;
        };

        if let Err(error) = self.store.select_session(&session_id) {
            self.push_notice(format!("Failed to select session: {error}"));
        }
    }

    fn rename_active(&mut self, title: &str, host: &mut dyn HostOps) {
        let Some(session_id) = self.store.active_session_id().map(str::to_string) else {
            self.push_notice("No active session to rename.".to_string());
            return;
        };

        match self.store.rename_session(&session_id, title) {
            Ok(()) => host.persist_sessions(self.store.sessions()),
            Err(error) => self.push_notice(format!("Failed to rename session: {error}")),
        }
    }

    /// Deletes the active session after host-side confirmation. Rejected
    /// while a stream is in flight: the stream targets a message inside it.
    pub fn delete_active(&mut self, host: &mut dyn HostOps) {
        if !self.gate_open() {
            self.push_notice(NOTICE_STREAM_ACTIVE.to_string());
            return;
        }

        let Some(session) = self.store.active_session() else {
            self.push_notice("No active session to delete.".to_string());
            return;
        };
        let session_id = session.id.clone();
        let title = if session.title.is_empty() {
            "(untitled)".to_string()
        } else {
            session.title.clone()
        };

        if !host.confirm_delete(&title) {
            self.push_notice("Deletion cancelled.".to_string());
            return;
        }

        match self.store.delete_session(&session_id) {
            Ok(()) => {
                host.persist_sessions(self.store.sessions());
                self.push_notice(format!("Deleted session '{title}'."));
            }
            Err(error) => self.push_notice(format!("Failed to delete session: {error}")),
        }
    }

    pub fn on_quit(&mut self, host: &mut dyn HostOps) {
        self.should_exit = true;
        host.request_stop();
        host.request_render();
    }

    pub fn on_stream_started(&mut self, stream_id: StreamId) {
        if !self.is_current_stream(stream_id) {
            return;
        }

        if matches!(self.state, OrchestratorState::Sending { stream_id: pending } if pending == stream_id)
        {
            self.state = OrchestratorState::Streaming { stream_id };
        }
    }

    pub fn on_stream_chunk(&mut self, stream_id: StreamId, text: &str) {
        let Some(target) = self.target.as_ref().filter(|target| target.stream_id == stream_id)
        else {
            return;
        };
        let session_id = target.session_id.clone();
        let model_message_id = target.model_message_id.clone();

        if let Err(error) = self
            .store
            .append_fragment(&session_id, &model_message_id, text)
        {
            log::error!("failed to apply stream fragment: {error}");
        }
    }

    pub fn on_stream_finished(&mut self, stream_id: StreamId, host: &mut dyn HostOps) {
        if !self.is_current_stream(stream_id) {
            return;
        }

        self.target = None;
        self.state = OrchestratorState::Idle;
        host.persist_sessions(self.store.sessions());
    }

    pub fn on_stream_failed(&mut self, stream_id: StreamId, error: &str, host: &mut dyn HostOps) {
        if !self.is_current_stream(stream_id) {
            return;
        }

        let Some(target) = self.target.take() else {
            return;
        };
        log::warn!("stream {stream_id} failed: {error}");
        self.fail_target(&target.session_id, &target.model_message_id, error, host);
    }

    fn fail_target(
        &mut self,
        session_id: &str,
        model_message_id: &str,
        error: &str,
        host: &mut dyn HostOps,
    ) {
        if let Err(store_error) =
            self.store
                .replace_content(session_id, model_message_id, FALLBACK_ANSWER)
        {
            log::error!("failed to write fallback answer: {store_error}");
        }

        self.target = None;
        self.state = OrchestratorState::Failed {
            error: error.to_string(),
        };
        host.persist_sessions(self.store.sessions());
    }

    fn is_current_stream(&self, stream_id: StreamId) -> bool {
        self.target
            .as_ref()
            .is_some_and(|target| target.stream_id == stream_id)
    }

    fn push_notice(&mut self, notice: String) {
        self.notices.push(notice);
    }
}
