use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use chat_client::app::{App, FALLBACK_ANSWER, OrchestratorState};
use chat_client::runtime::StreamController;
use chat_provider::Role;
use chat_provider_mock::MockChatProvider;
use session_store::{history_file, load_sessions, SessionStore};
use stream_markup::parse_message;
use tempfile::TempDir;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

fn controller_with_provider(
    provider: MockChatProvider,
    dir: &TempDir,
) -> (Arc<Mutex<App>>, Arc<StreamController>) {
    let app = Arc::new(Mutex::new(App::new(SessionStore::new())));
    let controller = StreamController::new(
        Arc::clone(&app),
        Arc::new(provider),
        history_file(dir.path()),
        Box::new(|_title| true),
    );
    (app, controller)
}

fn drain_until_idle(app: &Arc<Mutex<App>>, controller: &Arc<StreamController>) {
    let deadline = Instant::now() + DRAIN_TIMEOUT;

    loop {
        controller.flush_pending_events();

        let settled = {
            let app = lock_unpoisoned(app);
            !matches!(
                app.state(),
                OrchestratorState::Sending { .. } | OrchestratorState::Streaming { .. }
            )
        };
        if settled && !controller.has_active_stream() {
            return;
        }

        assert!(
            Instant::now() < deadline,
            "stream did not settle within the drain timeout"
        );
        thread::yield_now();
    }
}

fn submit(app: &Arc<Mutex<App>>, controller: &Arc<StreamController>, input: &str) {
    let mut host = Arc::clone(controller);
    let mut app = lock_unpoisoned(app);
    app.on_submit(input, &mut host);
}

#[test]
fn mock_stream_lands_fragments_in_the_model_message() {
    let dir = TempDir::new().expect("temp dir");
    let (app, controller) = controller_with_provider(
        MockChatProvider::new(vec!["hello ".to_string(), "world".to_string()]).without_delays(),
        &dir,
    );

    submit(&app, &controller, "question");
    drain_until_idle(&app, &controller);

    let app = lock_unpoisoned(&app);
    assert_eq!(*app.state(), OrchestratorState::Idle);
    let session = app.store().active_session().expect("session exists");
    assert_eq!(session.messages[1].content, "hello world");
}

#[test]
fn default_mock_script_parses_into_steps_and_structure() {
    let dir = TempDir::new().expect("temp dir");
    let (app, controller) =
        controller_with_provider(MockChatProvider::default().without_delays(), &dir);

    submit(&app, &controller, "প্রশ্ন");
    drain_until_idle(&app, &controller);

    let app = lock_unpoisoned(&app);
    let session = app.store().active_session().expect("session exists");
    let parsed = parse_message(&session.messages[1].content, false);

    let names: Vec<&str> = parsed.steps.iter().map(|step| step.name.as_str()).collect();
    assert_eq!(names, vec!["PLANNING", "RESEARCH", "FINAL ANSWER"]);
    assert!(parsed.steps.iter().all(|step| step.done));

    let structure = parsed.structure.expect("structure decodes after finish");
    assert_eq!(structure.title, "আরও কিছু তথ্য প্রয়োজন");
    assert_eq!(structure.categories.len(), 1);
    assert!(!parsed.prose.contains("[STEP:"));
}

#[test]
fn transport_failure_leaves_the_fallback_answer_and_persists_it() {
    let dir = TempDir::new().expect("temp dir");
    let (app, controller) = controller_with_provider(
        MockChatProvider::failing_after(vec!["partial ".to_string()], "injected fault")
            .without_delays(),
        &dir,
    );

    submit(&app, &controller, "doomed question");
    drain_until_idle(&app, &controller);

    {
        let app = lock_unpoisoned(&app);
        let session = app.store().active_session().expect("session exists");
        assert_eq!(session.messages[1].content, FALLBACK_ANSWER);
        assert!(matches!(
            app.state(),
            OrchestratorState::Failed { error } if error == "injected fault"
        ));
    }

    let persisted = load_sessions(&history_file(dir.path())).expect("history loads");
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].messages[1].content, FALLBACK_ANSWER);
    assert_eq!(persisted[0].messages[1].role, Role::Model);
}

#[test]
fn finished_stream_persists_the_full_exchange() {
    let dir = TempDir::new().expect("temp dir");
    let (app, controller) = controller_with_provider(
        MockChatProvider::new(vec!["সম্পূর্ণ উত্তর".to_string()]).without_delays(),
        &dir,
    );

    submit(&app, &controller, "প্রশ্ন");
    drain_until_idle(&app, &controller);

    let persisted = load_sessions(&history_file(dir.path())).expect("history loads");
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].messages[0].content, "প্রশ্ন");
    assert_eq!(persisted[0].messages[1].content, "সম্পূর্ণ উত্তর");
}

#[test]
fn deleting_the_last_session_clears_persisted_state() {
    let dir = TempDir::new().expect("temp dir");
    let (app, controller) = controller_with_provider(
        MockChatProvider::new(vec!["উত্তর".to_string()]).without_delays(),
        &dir,
    );

    submit(&app, &controller, "প্রশ্ন");
    drain_until_idle(&app, &controller);
    assert!(history_file(dir.path()).exists());

    submit(&app, &controller, "/delete");

    assert!(lock_unpoisoned(&app).store().is_empty());
    assert!(
        !history_file(dir.path()).exists(),
        "empty session list removes the history file"
    );
}

#[test]
fn second_stream_can_start_after_the_first_settles() {
    let dir = TempDir::new().expect("temp dir");
    let (app, controller) = controller_with_provider(
        MockChatProvider::new(vec!["উত্তর".to_string()]).without_delays(),
        &dir,
    );

    submit(&app, &controller, "এক");
    drain_until_idle(&app, &controller);
    submit(&app, &controller, "দুই");
    drain_until_idle(&app, &controller);

    let app = lock_unpoisoned(&app);
    let session = app.store().active_session().expect("session exists");
    assert_eq!(session.messages.len(), 4);
    assert_eq!(session.messages[2].content, "দুই");
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
