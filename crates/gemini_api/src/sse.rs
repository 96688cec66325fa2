use serde_json::Value;

use crate::events::GeminiStreamEvent;

/// Incremental parser for SSE text streams.
///
/// The Gemini endpoint emits one `data:` JSON payload per frame, frames
/// separated by a blank line. Bytes may arrive split at arbitrary
/// boundaries; incomplete frames stay buffered until their terminator
/// arrives.
#[derive(Debug, Default)]
pub struct SseStreamParser {
    buffer: String,
}

impl SseStreamParser {
    /// Feed arbitrary bytes into the parser and drain complete events.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<GeminiStreamEvent> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));
        let mut events = Vec::new();

        while let Some(split) = self.buffer.find("\n\n") {
            let frame = self.buffer[..split].to_string();
            self.buffer.drain(0..split + 2);

            if let Some(payload) = extract_data_payload(&frame) {
                if payload.is_empty() {
                    continue;
                }

                if let Ok(value) = serde_json::from_str::<Value>(&payload) {
                    events.extend(map_frame(&value));
                }
            }
        }

        events
    }

    /// Parse a complete SSE payload string in one shot.
    pub fn parse_frames(input: &str) -> Vec<GeminiStreamEvent> {
        let mut parser = Self::default();
        parser.feed(input.as_bytes())
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.trim().is_empty()
    }
}

fn extract_data_payload(frame: &str) -> Option<String> {
    let data_lines: Vec<&str> = frame
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .collect();

    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}

fn map_frame(value: &Value) -> Vec<GeminiStreamEvent> {
    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(|message| message.as_str())
            .unwrap_or("unknown stream error");
        return vec![GeminiStreamEvent::StreamError {
            message: message.to_string(),
        }];
    }

    let mut events = Vec::new();
    let Some(candidate) = value
        .get("candidates")
        .and_then(|candidates| candidates.as_array())
        .and_then(|candidates| candidates.first())
    else {
        return events;
    };

    let text = candidate
        .get("content")
        .and_then(|content| content.get("parts"))
        .and_then(|parts| parts.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(|text| text.as_str()))
                .collect::<String>()
        })
        .unwrap_or_default();
    if !text.is_empty() {
        events.push(GeminiStreamEvent::TextDelta { text });
    }

    if let Some(finish_reason) = candidate
        .get("finishReason")
        .and_then(|reason| reason.as_str())
    {
        events.push(GeminiStreamEvent::Finished {
            finish_reason: finish_reason.to_string(),
        });
    }

    events
}
