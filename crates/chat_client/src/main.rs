use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chat_client::app::App;
use chat_client::render::format_session;
use chat_client::runtime::StreamController;
use chat_provider::ChatStreamProvider;
use chat_provider_gemini_api::GeminiProvider;
use chat_provider_mock::MockChatProvider;
use session_store::{history_file, load_sessions, SessionStore};

const PROVIDER_ENV_VAR: &str = "CHAT_CLIENT_PROVIDER";
const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(25);

fn main() -> io::Result<()> {
    env_logger::init();

    let cwd = std::env::current_dir()?;
    let history_path = history_file(&cwd);
    let sessions = load_sessions(&history_path).map_err(io::Error::other)?;
    let store = SessionStore::from_sessions(sessions);

    let provider = provider_from_env().map_err(io::Error::other)?;
    let profile = provider.profile();
    println!(
        "chat_client — provider {} (pro: {}, fast: {})",
        profile.provider_id, profile.pro_model_id, profile.fast_model_id
    );
    println!("Type a message, or /help for commands.");

    let app = Arc::new(Mutex::new(App::new(store)));
    let host = StreamController::new(
        Arc::clone(&app),
        provider,
        history_path,
        Box::new(confirm_on_stdin),
    );

    loop {
        render(&app, &host);

        print!("\n{}> ", lock_unpoisoned(&app).chat_mode());
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        {
            let mut app = lock_unpoisoned(&app);
            let mut submit_host = Arc::clone(&host);
            app.on_submit(&line, &mut submit_host);
        }

        // Stay in a polling loop until the stream reaches a terminal event.
        while host.has_active_stream() {
            host.flush_pending_events();
            if host.take_render_request() {
                render_transcript(&app);
            }
            thread::sleep(EVENT_POLL_INTERVAL);
        }
        host.flush_pending_events();

        if host.stop_requested() || lock_unpoisoned(&app).should_exit {
            break;
        }
    }

    host.cancel_active_stream();
    Ok(())
}

fn render(app: &Arc<Mutex<App>>, host: &Arc<StreamController>) {
    host.take_render_request();
    render_transcript(app);
}

fn render_transcript(app: &Arc<Mutex<App>>) {
    let mut app = lock_unpoisoned(app);

    for notice in app.take_notices() {
        println!("* {notice}");
    }

    let streaming_id = app.streaming_message_id().map(str::to_string);
    if let Some(session) = app.store().active_session() {
        print!("{}", format_session(session, streaming_id.as_deref()));
    }
}

fn provider_from_env() -> Result<Arc<dyn ChatStreamProvider>, String> {
    let selection = std::env::var(PROVIDER_ENV_VAR).unwrap_or_else(|_| "gemini-api".to_string());

    match selection.trim() {
        "mock" => Ok(Arc::new(MockChatProvider::default())),
        "gemini-api" | "" => {
            let provider = GeminiProvider::from_env().map_err(|error| error.to_string())?;
            Ok(Arc::new(provider))
        }
        other => Err(format!(
            "Unknown {PROVIDER_ENV_VAR} value '{other}' (expected 'mock' or 'gemini-api')"
        )),
    }
}

fn confirm_on_stdin(title: &str) -> bool {
    print!("Delete session '{title}'? [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    if io::stdin().read_line(&mut answer).is_err() {
        return false;
    }

    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
