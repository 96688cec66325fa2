use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::SessionStoreError;
use crate::schema::ChatSession;

/// Loads the persisted session list. An absent file means zero sessions; a
/// present but unreadable or invalid file is an error.
pub fn load_sessions(path: &Path) -> Result<Vec<ChatSession>, SessionStoreError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(source) if source.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => return Err(SessionStoreError::io("reading session history", path, source)),
    };

    let sessions: Vec<ChatSession> =
        serde_json::from_str(&raw).map_err(|source| SessionStoreError::json_parse(path, source))?;
    validate_sessions(path, &sessions)?;

    Ok(sessions)
}

/// Persists the whole session list, overwriting any previous state. An empty
/// list removes the file: deleting the last session clears persisted state.
pub fn save_sessions(path: &Path, sessions: &[ChatSession]) -> Result<(), SessionStoreError> {
    if sessions.is_empty() {
        return match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(source) if source.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionStoreError::io(
                "removing empty session history",
                path,
                source,
            )),
        };
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| {
            SessionStoreError::io("creating session history directory", parent, source)
        })?;
    }

    let json = serde_json::to_string(sessions)
        .map_err(|source| SessionStoreError::json_serialize(path, source))?;
    fs::write(path, json)
        .map_err(|source| SessionStoreError::io("writing session history", path, source))
}

fn validate_sessions(path: &Path, sessions: &[ChatSession]) -> Result<(), SessionStoreError> {
    for session in sessions {
        validate_rfc3339(path, &session.id, "createdAt", &session.created_at)?;
        validate_rfc3339(path, &session.id, "lastModified", &session.last_modified)?;
        for message in &session.messages {
            validate_rfc3339(path, &session.id, "timestamp", &message.timestamp)?;
        }
    }

    Ok(())
}

fn validate_rfc3339(
    path: &Path,
    session_id: &str,
    field: &'static str,
    value: &str,
) -> Result<(), SessionStoreError> {
    if OffsetDateTime::parse(value, &Rfc3339).is_err() {
        return Err(SessionStoreError::InvalidTimestamp {
            path: path.to_path_buf(),
            session_id: session_id.to_string(),
            field,
            value: value.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chat_provider::ChatMode;
    use tempfile::TempDir;

    use super::*;
    use crate::paths::history_file;
    use crate::store::SessionStore;

    fn populated_store() -> SessionStore {
        let mut store = SessionStore::new();
        let id = store.create_session().expect("session created");
        store
            .append_exchange(&id, "persisted question", ChatMode::Fast)
            .expect("exchange appended");
        store
    }

    #[test]
    fn absent_file_means_zero_sessions() {
        let dir = TempDir::new().expect("temp dir");

        let sessions = load_sessions(&history_file(dir.path())).expect("load succeeds");

        assert!(sessions.is_empty());
    }

    #[test]
    fn save_then_load_round_trips_the_session_list() {
        let dir = TempDir::new().expect("temp dir");
        let path = history_file(dir.path());
        let store = populated_store();

        save_sessions(&path, store.sessions()).expect("save succeeds");
        let loaded = load_sessions(&path).expect("load succeeds");

        assert_eq!(loaded, store.sessions());

        let restored = SessionStore::from_sessions(loaded);
        assert_eq!(restored.active_session_id(), store.active_session_id());
    }

    #[test]
    fn saving_an_empty_list_removes_the_file() {
        let dir = TempDir::new().expect("temp dir");
        let path = history_file(dir.path());
        let store = populated_store();
        save_sessions(&path, store.sessions()).expect("save succeeds");
        assert!(path.exists());

        save_sessions(&path, &[]).expect("empty save succeeds");

        assert!(!path.exists());
        // Removing twice is fine: the file is already gone.
        save_sessions(&path, &[]).expect("repeat empty save succeeds");
    }

    #[test]
    fn malformed_history_is_a_parse_error() {
        let dir = TempDir::new().expect("temp dir");
        let path = history_file(dir.path());
        fs::create_dir_all(path.parent().expect("parent exists")).expect("mkdir");
        fs::write(&path, "not json").expect("write");

        assert!(matches!(
            load_sessions(&path),
            Err(SessionStoreError::JsonParse { .. })
        ));
    }

    #[test]
    fn invalid_timestamps_are_rejected_on_load() {
        let dir = TempDir::new().expect("temp dir");
        let path = history_file(dir.path());
        fs::create_dir_all(path.parent().expect("parent exists")).expect("mkdir");
        fs::write(
            &path,
            r#"[{"id":"s","title":"","messages":[],"createdAt":"yesterday","lastModified":"2026-08-27T10:00:00Z"}]"#,
        )
        .expect("write");

        assert!(matches!(
            load_sessions(&path),
            Err(SessionStoreError::InvalidTimestamp { field: "createdAt", .. })
        ));
    }
}
