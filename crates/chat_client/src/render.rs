//! Plain-text presentation of a session transcript.
//!
//! Rendering is presentation-only: it re-derives the parsed view of every
//! model message from its raw content on each call and stores nothing.

use chat_provider::Role;
use session_store::{ChatSession, Message};
use stream_markup::{parse_message, InteractiveStructure};

/// Formats one session for a line-oriented terminal.
#[must_use]
pub fn format_session(session: &ChatSession, streaming_message_id: Option<&str>) -> String {
    let mut out = String::new();

    let title = if session.title.is_empty() {
        "(untitled)"
    } else {
        session.title.as_str()
    };
    out.push_str(&format!("=== {title} ===\n"));

    for message in &session.messages {
        let streaming = streaming_message_id == Some(message.id.as_str());
        out.push_str(&format_message(message, streaming));
    }

    out
}

/// Formats one message; model content is run through the marker parser.
#[must_use]
pub fn format_message(message: &Message, streaming: bool) -> String {
    match message.role {
        Role::User => format!("\n> {}\n", message.content),
        Role::Model => format_model_message(message, streaming),
    }
}

fn format_model_message(message: &Message, streaming: bool) -> String {
    let parsed = parse_message(&message.content, streaming);
    let mut out = String::new();

    for step in &parsed.steps {
        let marker = if step.done { "[x]" } else { "[~]" };
        out.push_str(&format!("{marker} {}\n", step.name));
    }

    if !parsed.prose.is_empty() {
        out.push_str(&parsed.prose);
        out.push('\n');
    }

    if let Some(structure) = &parsed.structure {
        out.push_str(&format_structure(structure));
    }

    if streaming && parsed.is_empty() {
        out.push_str("...\n");
    }

    out
}

fn format_structure(structure: &InteractiveStructure) -> String {
    let mut out = String::new();
    out.push_str(&format!("\n{}\n", structure.title));

    for category in &structure.categories {
        out.push_str(&format!("- {}\n", category.name));
        for option in &category.options {
            out.push_str(&format!("    * {option}\n"));
        }
        if category.allow_other {
            out.push_str("    * (other)\n");
        }
    }

    out
}
