//! Deterministic mock implementation of the shared `chat_provider` contract.
//!
//! This crate contains no transport logic and is intended for local
//! development and contract-level integration testing. The default script
//! exercises the full inline marker grammar: progress markers, the
//! completion sentinel, and a structured clarification payload.

use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use chat_provider::{
    CancelSignal, ChatStreamProvider, ProviderProfile, StreamEvent, StreamRequest,
};

/// Stable provider identifier used for explicit startup selection.
pub const MOCK_PROVIDER_ID: &str = "mock";

/// Deterministic mock provider used by `chat_client` tests and local runs.
#[derive(Debug)]
pub struct MockChatProvider {
    chunks: Vec<String>,
    failure: Option<String>,
    token_delay: Duration,
}

impl MockChatProvider {
    /// Creates a mock provider streaming caller-provided chunks.
    #[must_use]
    pub fn new(chunks: Vec<String>) -> Self {
        Self {
            chunks,
            failure: None,
            token_delay: Duration::from_millis(Self::TOKEN_DELAY_MS),
        }
    }

    /// Creates a mock provider that streams its chunks, then fails with the
    /// given error instead of finishing.
    #[must_use]
    pub fn failing_after(chunks: Vec<String>, error: impl Into<String>) -> Self {
        Self {
            chunks,
            failure: Some(error.into()),
            token_delay: Duration::from_millis(Self::TOKEN_DELAY_MS),
        }
    }

    /// Disables inter-token pacing. Used by tests that drain synchronously.
    #[must_use]
    pub fn without_delays(mut self) -> Self {
        self.token_delay = Duration::ZERO;
        self
    }

    const RUN_DELAY_MS: u64 = 200;
    const TOKEN_DELAY_MS: u64 = 50;

    fn pace(&self) {
        if !self.token_delay.is_zero() {
            thread::sleep(self.token_delay);
        }
    }
}

impl Default for MockChatProvider {
    fn default() -> Self {
        Self::new(vec![
            "[STEP: PLANNING]\n".to_string(),
            "প্রশ্নটি বিশ্লেষণ করা হচ্ছে। ধাপ সম্পন্ন\n".to_string(),
            "[STEP: RESEARCH]\n".to_string(),
            "প্রাসঙ্গিক তথ্য সংগ্রহ করা হচ্ছে। ধাপ সম্পন্ন\n".to_string(),
            "[STEP: FINAL ANSWER]\n".to_string(),
            "এটি একটি ডেমো উত্তর। মূল বক্তব্য সংক্ষেপে উপস্থাপন করা হলো।\n".to_string(),
            "[INTERACTIVE_STRUCTURE: {\n".to_string(),
            "  \"title\": \"আরও কিছু তথ্য প্রয়োজন\",\n".to_string(),
            "  \"categories\": [\n".to_string(),
            "    {\"id\": \"scope\", \"name\": \"কাজের পরিধি কী?\", \"options\": [\"ছোট\", \"মাঝারি\", \"বড়\"], \"allowOther\": true}\n".to_string(),
            "  ]\n".to_string(),
            "}]".to_string(),
        ])
    }
}

impl ChatStreamProvider for MockChatProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: MOCK_PROVIDER_ID.to_string(),
            pro_model_id: "mock-pro".to_string(),
            fast_model_id: "mock-fast".to_string(),
        }
    }

    fn stream(
        &self,
        req: StreamRequest,
        cancel: CancelSignal,
        emit: &mut dyn FnMut(StreamEvent),
    ) -> Result<(), String> {
        let stream_id = req.stream_id;
        let _ = req.message;
        let _ = req.history;

        emit(StreamEvent::Started { stream_id });
        if !self.token_delay.is_zero() {
            thread::sleep(Duration::from_millis(Self::RUN_DELAY_MS));
        }

        for chunk in &self.chunks {
            if cancel.load(Ordering::SeqCst) {
                emit(StreamEvent::Finished { stream_id });
                return Ok(());
            }

            let mut pending_token = String::new();
            for ch in chunk.chars() {
                pending_token.push(ch);

                if matches!(ch, ' ' | '\n') {
                    emit(StreamEvent::Chunk {
                        stream_id,
                        text: std::mem::take(&mut pending_token),
                    });
                    self.pace();
                }
            }

            if !pending_token.is_empty() {
                if cancel.load(Ordering::SeqCst) {
                    emit(StreamEvent::Finished { stream_id });
                    return Ok(());
                }

                emit(StreamEvent::Chunk {
                    stream_id,
                    text: pending_token,
                });
                self.pace();
            }
        }

        match &self.failure {
            Some(error) if !cancel.load(Ordering::SeqCst) => emit(StreamEvent::Failed {
                stream_id,
                error: error.clone(),
            }),
            _ => emit(StreamEvent::Finished { stream_id }),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    use chat_provider::ChatMode;

    use super::*;

    fn collect_events(provider: &MockChatProvider, cancel: CancelSignal) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        provider
            .stream(
                StreamRequest {
                    stream_id: 7,
                    message: "test".to_string(),
                    mode: ChatMode::Pro,
                    history: Vec::new(),
                },
                cancel,
                &mut |event| events.push(event),
            )
            .expect("mock stream should succeed");
        events
    }

    fn concatenated_text(events: &[StreamEvent]) -> String {
        events
            .iter()
            .filter_map(|event| match event {
                StreamEvent::Chunk { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn profile_exposes_explicit_mock_provider_identity() {
        let profile = MockChatProvider::new(Vec::new()).profile();

        assert_eq!(profile.provider_id, MOCK_PROVIDER_ID);
        assert_eq!(profile.pro_model_id, "mock-pro");
        assert_eq!(profile.fast_model_id, "mock-fast");
    }

    #[test]
    fn stream_emits_started_chunks_and_finished() {
        let provider = MockChatProvider::new(vec!["one two".to_string()]).without_delays();
        let cancel = Arc::new(AtomicBool::new(false));

        let events = collect_events(&provider, cancel);

        assert!(matches!(
            events.first(),
            Some(StreamEvent::Started { stream_id: 7 })
        ));
        assert!(matches!(
            events.last(),
            Some(StreamEvent::Finished { stream_id: 7 })
        ));
        assert_eq!(concatenated_text(&events), "one two");
    }

    #[test]
    fn default_script_reassembles_to_marker_laden_answer() {
        let provider = MockChatProvider::default().without_delays();
        let cancel = Arc::new(AtomicBool::new(false));

        let events = collect_events(&provider, cancel);
        let content = concatenated_text(&events);

        assert!(content.contains("[STEP: PLANNING]"));
        assert!(content.contains("ধাপ সম্পন্ন"));
        assert!(content.contains("[INTERACTIVE_STRUCTURE: {"));
        assert!(content.trim_end().ends_with("}]"));
    }

    #[test]
    fn stream_finishes_early_when_cancel_is_set() {
        let provider = MockChatProvider::new(vec!["ignored".to_string()]).without_delays();
        let cancel = Arc::new(AtomicBool::new(true));

        let events = collect_events(&provider, cancel);

        assert_eq!(
            events,
            vec![
                StreamEvent::Started { stream_id: 7 },
                StreamEvent::Finished { stream_id: 7 },
            ]
        );
    }

    #[test]
    fn failing_provider_streams_chunks_then_fails() {
        let provider =
            MockChatProvider::failing_after(vec!["partial ".to_string()], "injected transport fault")
                .without_delays();
        let cancel = Arc::new(AtomicBool::new(false));

        let events = collect_events(&provider, cancel);

        assert!(events
            .iter()
            .any(|event| matches!(event, StreamEvent::Chunk { text, .. } if !text.is_empty())));
        assert!(matches!(
            events.last(),
            Some(StreamEvent::Failed { stream_id: 7, error }) if error == "injected transport fault"
        ));
    }
}
