use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use chat_provider::{
    CancelSignal, ChatMode, ChatStreamProvider, HistoryTurn, StreamEvent, StreamId, StreamRequest,
};
use session_store::{save_sessions, ChatSession};

use crate::app::{App, HostOps};

/// Stdin-or-test collaborator answering deletion confirmation prompts.
pub type DeleteConfirmer = Box<dyn FnMut(&str) -> bool + Send>;

struct ActiveStream {
    stream_id: StreamId,
    cancel: CancelSignal,
    join_handle: Option<JoinHandle<()>>,
}

/// Bridges the provider's worker thread and the single-threaded `App`.
///
/// Worker threads never touch the store directly: they enqueue `StreamEvent`s
/// and the driving loop applies them in order via
/// [`StreamController::flush_pending_events`].
pub struct StreamController {
    app: Arc<Mutex<App>>,
    provider: Arc<dyn ChatStreamProvider>,
    pending_events: Arc<Mutex<VecDeque<StreamEvent>>>,
    next_stream_id: AtomicU64,
    active_stream: Mutex<Option<ActiveStream>>,
    history_path: PathBuf,
    confirm_delete: Mutex<DeleteConfirmer>,
    render_requested: AtomicBool,
    stop_requested: AtomicBool,
}

impl StreamController {
    pub fn new(
        app: Arc<Mutex<App>>,
        provider: Arc<dyn ChatStreamProvider>,
        history_path: PathBuf,
        confirm_delete: DeleteConfirmer,
    ) -> Arc<Self> {
        Arc::new(Self {
            app,
            provider,
            pending_events: Arc::new(Mutex::new(VecDeque::new())),
            next_stream_id: AtomicU64::new(1),
            active_stream: Mutex::new(None),
            history_path,
            confirm_delete: Mutex::new(confirm_delete),
            render_requested: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
        })
    }

    fn start_stream_internal(
        self: &Arc<Self>,
        message: String,
        mode: ChatMode,
        history: Vec<HistoryTurn>,
    ) -> Result<StreamId, String> {
        let mut active_stream = self.lock_active_stream();
        if active_stream.is_some() {
            return Err("Stream already active".to_string());
        }

        let stream_id = self.next_stream_id.fetch_add(1, Ordering::SeqCst);
        let cancel = CancelSignal::default();
        let request = StreamRequest {
            stream_id,
            message,
            mode,
            history,
        };
        let join_handle = self.spawn_worker(request, Arc::clone(&cancel))?;

        *active_stream = Some(ActiveStream {
            stream_id,
            cancel,
            join_handle: Some(join_handle),
        });

        Ok(stream_id)
    }

    fn spawn_worker(
        self: &Arc<Self>,
        request: StreamRequest,
        cancel: CancelSignal,
    ) -> Result<JoinHandle<()>, String> {
        let stream_id = request.stream_id;
        let controller = Arc::clone(self);
        thread::Builder::new()
            .name(format!("chat-stream-{stream_id}"))
            .spawn(move || controller.stream_worker(request, cancel))
            .map_err(|error| format!("Failed to spawn stream worker: {error}"))
    }

    fn stream_worker(self: Arc<Self>, request: StreamRequest, cancel: CancelSignal) {
        let stream_id = request.stream_id;

        let terminal_emitted = Arc::new(AtomicBool::new(false));
        let terminal_emitted_for_emit = Arc::clone(&terminal_emitted);
        let controller = Arc::clone(&self);
        let provider = Arc::clone(&self.provider);

        let mut emit = move |event: StreamEvent| {
            if event.is_terminal() {
                terminal_emitted_for_emit.store(true, Ordering::SeqCst);
            }

            controller.enqueue_event(event);
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            provider.stream(request, Arc::clone(&cancel), &mut emit)
        }));

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(error)) => emit(StreamEvent::Failed { stream_id, error }),
            Err(_) => emit(StreamEvent::Failed {
                stream_id,
                error: "Stream provider panicked".to_string(),
            }),
        }

        if !terminal_emitted.load(Ordering::SeqCst) && self.is_active_stream_id(stream_id) {
            emit(StreamEvent::Failed {
                stream_id,
                error: "Stream provider exited without terminal event".to_string(),
            });
        }
    }

    fn enqueue_event(&self, event: StreamEvent) {
        let mut queue = lock_unpoisoned(&self.pending_events);
        queue.push_back(event);
    }

    /// Applies queued stream events to the app in arrival order. Returns the
    /// number of events applied; schedules a render when any were.
    pub fn flush_pending_events(self: &Arc<Self>) -> usize {
        let mut applied = 0usize;

        loop {
            let event = {
                let mut pending_events = lock_unpoisoned(&self.pending_events);
                pending_events.pop_front()
            };

            match event {
                Some(event) => {
                    self.apply_event(event);
                    applied += 1;
                }
                None => break,
            }
        }

        if applied > 0 {
            self.render_requested.store(true, Ordering::SeqCst);
        }

        applied
    }

    /// True while a worker thread is streaming.
    pub fn has_active_stream(&self) -> bool {
        self.lock_active_stream().is_some()
    }

    /// Takes the pending render request, if any.
    pub fn take_render_request(&self) -> bool {
        self.render_requested.swap(false, Ordering::SeqCst)
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// Requests cancellation of the in-flight stream, if any.
    pub fn cancel_active_stream(&self) {
        let active_stream = self.lock_active_stream();
        if let Some(active) = active_stream.as_ref() {
            active.cancel.store(true, Ordering::SeqCst);
        }
    }

    fn apply_event(self: &Arc<Self>, event: StreamEvent) {
        let stream_id = event.stream_id();
        let terminal = event.is_terminal();

        {
            let mut host = Arc::clone(self);
            let mut app = lock_unpoisoned(&self.app);
            match event {
                StreamEvent::Started { stream_id } => app.on_stream_started(stream_id),
                StreamEvent::Chunk { stream_id, text } => app.on_stream_chunk(stream_id, &text),
                StreamEvent::Finished { stream_id } => {
                    app.on_stream_finished(stream_id, &mut host);
                }
                StreamEvent::Failed { stream_id, error } => {
                    app.on_stream_failed(stream_id, &error, &mut host);
                }
            }
        }

        if terminal {
            self.clear_active_stream_if_matching(stream_id);
        }
    }

    fn clear_active_stream_if_matching(&self, stream_id: StreamId) {
        let mut active_stream = self.lock_active_stream();
        let matches = active_stream.as_ref().map(|active| active.stream_id) == Some(stream_id);
        if !matches {
            return;
        }

        let mut completed = match active_stream.take() {
            Some(completed) => completed,
            None => return,
        };

        if let Some(join_handle) = completed.join_handle.take() {
            let is_current_thread = join_handle.thread().id() == thread::current().id();
            if !is_current_thread && join_handle.is_finished() {
                let _ = join_handle.join();
            }
        }
    }

    fn is_active_stream_id(&self, stream_id: StreamId) -> bool {
        self.lock_active_stream()
            .as_ref()
            .map(|active| active.stream_id)
            == Some(stream_id)
    }

    fn lock_active_stream(&self) -> MutexGuard<'_, Option<ActiveStream>> {
        lock_unpoisoned(&self.active_stream)
    }
}

impl HostOps for Arc<StreamController> {
    fn start_stream(
        &mut self,
        message: String,
        mode: ChatMode,
        history: Vec<HistoryTurn>,
    ) -> Result<StreamId, String> {
        self.start_stream_internal(message, mode, history)
    }

    fn confirm_delete(&mut self, title: &str) -> bool {
        let mut confirm = lock_unpoisoned(&self.confirm_delete);
        (*confirm)(title)
    }

    fn persist_sessions(&mut self, sessions: &[ChatSession]) {
        if let Err(error) = save_sessions(&self.history_path, sessions) {
            log::error!("failed to persist sessions: {error}");
        }
    }

    fn request_render(&mut self) {
        self.render_requested.store(true, Ordering::SeqCst);
    }

    fn request_stop(&mut self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }
}

pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
