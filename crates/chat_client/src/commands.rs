use chat_provider::ChatMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    New,
    Sessions,
    Select(usize),
    Rename(String),
    Delete,
    Mode(ChatMode),
    Regenerate,
    Help,
    Quit,
    Unknown(String),
}

pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let mut words = trimmed.split_whitespace();
    let command = words.next().unwrap_or(trimmed);
    let rest = trimmed[command.len()..].trim();

    let parsed = match command {
        "/new" => SlashCommand::New,
        "/sessions" => SlashCommand::Sessions,
        "/select" => match rest.parse::<usize>() {
            Ok(index) if index >= 1 => SlashCommand::Select(index),
            _ => SlashCommand::Unknown(trimmed.to_string()),
        },
        "/rename" if !rest.is_empty() => SlashCommand::Rename(rest.to_string()),
        "/delete" => SlashCommand::Delete,
        "/mode" => match rest.to_ascii_lowercase().as_str() {
            "fast" => SlashCommand::Mode(ChatMode::Fast),
            "pro" => SlashCommand::Mode(ChatMode::Pro),
            _ => SlashCommand::Unknown(trimmed.to_string()),
        },
        "/regenerate" => SlashCommand::Regenerate,
        "/help" => SlashCommand::Help,
        "/quit" => SlashCommand::Quit,
        _ => SlashCommand::Unknown(command.to_string()),
    };

    Some(parsed)
}
