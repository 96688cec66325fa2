use std::path::{Path, PathBuf};

/// File name of the persisted session list (layout version 1).
pub const HISTORY_FILE_NAME: &str = "chat_history_v1.json";

pub const HISTORY_DIR: &str = ".chat";

#[must_use]
pub fn history_root(base: &Path) -> PathBuf {
    base.join(HISTORY_DIR)
}

#[must_use]
pub fn history_file(base: &Path) -> PathBuf {
    history_root(base).join(HISTORY_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_file_lives_under_the_history_root() {
        let base = Path::new("/home/user");

        assert_eq!(
            history_file(base),
            Path::new("/home/user/.chat/chat_history_v1.json")
        );
    }
}
