use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;

use crate::config::GeminiApiConfig;
use crate::error::{parse_error_message, GeminiApiError};
use crate::events::GeminiStreamEvent;
use crate::payload::GenerateContentRequest;
use crate::sse::SseStreamParser;
use crate::url::stream_url;

/// Optional cancellation signal shared across request and stream loops.
pub type CancellationSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug)]
pub struct GeminiApiClient {
    http: Client,
    config: GeminiApiConfig,
}

/// Result of a completed stream: the finish reason from the final frame,
/// when the endpoint sent one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamOutcome {
    pub finish_reason: Option<String>,
}

impl GeminiApiClient {
    pub fn new(config: GeminiApiConfig) -> Result<Self, GeminiApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(GeminiApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &GeminiApiConfig {
        &self.config
    }

    pub fn endpoint_for(&self, model: &str) -> Result<String, GeminiApiError> {
        if self.config.api_key.trim().is_empty() {
            return Err(GeminiApiError::MissingApiKey);
        }
        if !self.config.base_url.trim_start().starts_with("http") {
            return Err(GeminiApiError::InvalidBaseUrl(
                self.config.base_url.clone(),
            ));
        }
        Ok(stream_url(&self.config.base_url, model, &self.config.api_key))
    }

    /// Stream one `streamGenerateContent` call, invoking `on_event` for each
    /// normalized event as it is parsed off the wire.
    ///
    /// A `StreamError` frame or transport fault terminates the stream with an
    /// error; there is no retry at this layer. Cancellation is polled between
    /// chunks and surfaces as [`GeminiApiError::Cancelled`].
    pub async fn stream_with_handler<F>(
        &self,
        model: &str,
        request: &GenerateContentRequest,
        cancellation: Option<&CancellationSignal>,
        mut on_event: F,
    ) -> Result<StreamOutcome, GeminiApiError>
    where
        F: FnMut(GeminiStreamEvent),
    {
        let endpoint = self.endpoint_for(model)?;

        if is_cancelled(cancellation) {
            return Err(GeminiApiError::Cancelled);
        }

        let response = self.http.post(endpoint).json(request).send();
        let response = await_or_cancel(response, cancellation)
            .await?
            .map_err(GeminiApiError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = await_or_cancel(response.text(), cancellation)
                .await?
                .unwrap_or_default();
            return Err(GeminiApiError::Status(
                status,
                parse_error_message(status, &body),
            ));
        }

        let mut bytes = response.bytes_stream();
        let mut parser = SseStreamParser::default();
        let mut outcome = StreamOutcome::default();

        loop {
            let Some(chunk) = await_or_cancel(bytes.next(), cancellation).await? else {
                break;
            };
            if is_cancelled(cancellation) {
                return Err(GeminiApiError::Cancelled);
            }
            let chunk = chunk.map_err(GeminiApiError::from)?;
            for event in parser.feed(&chunk) {
                process_stream_event(event, &mut outcome, &mut on_event)?;
            }
        }

        if is_cancelled(cancellation) {
            return Err(GeminiApiError::Cancelled);
        }

        Ok(outcome)
    }

    /// Stream one call and collect every event into a vector.
    pub async fn stream(
        &self,
        model: &str,
        request: &GenerateContentRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<(Vec<GeminiStreamEvent>, StreamOutcome), GeminiApiError> {
        let mut events = Vec::new();
        let outcome = self
            .stream_with_handler(model, request, cancellation, |event| {
                events.push(event);
            })
            .await?;

        Ok((events, outcome))
    }
}

fn process_stream_event<F>(
    event: GeminiStreamEvent,
    outcome: &mut StreamOutcome,
    on_event: &mut F,
) -> Result<(), GeminiApiError>
where
    F: FnMut(GeminiStreamEvent),
{
    if let GeminiStreamEvent::StreamError { message } = &event {
        return Err(GeminiApiError::StreamFailed {
            message: message.clone(),
        });
    }

    if let GeminiStreamEvent::Finished { finish_reason } = &event {
        outcome.finish_reason = Some(finish_reason.clone());
    }

    on_event(event);
    Ok(())
}

fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, GeminiApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(GeminiApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(GeminiApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}
