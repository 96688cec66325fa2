//! Gemini API-backed implementation of the shared `chat_provider` contract.
//!
//! This adapter translates `gemini_api` stream semantics into the
//! deterministic `StreamEvent` lifecycle expected by `chat_client`, and owns
//! the per-mode model map, system instructions, and generation settings.

use std::env;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chat_provider::{
    CancelSignal, ChatMode, ChatStreamProvider, ProviderInitError, ProviderProfile, Role,
    StreamEvent, StreamRequest,
};
use gemini_api::{
    Content, GeminiApiClient, GeminiApiConfig, GeminiApiError, GeminiStreamEvent,
    GenerateContentRequest, GenerationConfig, StreamOutcome,
};

pub mod prompts;

/// Stable provider identifier used by `chat_client` startup selection.
pub const GEMINI_API_PROVIDER_ID: &str = "gemini-api";

/// Model serving [`chat_provider::ChatMode::Pro`] requests.
pub const PRO_MODEL_ID: &str = "gemini-3-pro-preview";
/// Model serving [`chat_provider::ChatMode::Fast`] requests.
pub const FAST_MODEL_ID: &str = "gemini-3-flash-preview";

/// Environment variable holding the API key for [`GeminiProvider::from_env`].
pub const API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";
/// Optional environment variable overriding the transport base URL.
pub const BASE_URL_ENV_VAR: &str = "GEMINI_BASE_URL";

const PRO_TEMPERATURE: f64 = 0.7;
const FAST_TEMPERATURE: f64 = 0.2;
const PRO_THINKING_BUDGET: u32 = 24576;

/// Runtime configuration for the Gemini API provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiProviderConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
}

impl GeminiProviderConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn into_api_config(self) -> GeminiApiConfig {
        let mut config = GeminiApiConfig::new(self.api_key);

        if let Some(base_url) = self.base_url {
            config = config.with_base_url(base_url);
        }

        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }

        config
    }
}

trait StreamClient: Send + Sync {
    fn stream(
        &self,
        model: &str,
        request: &GenerateContentRequest,
        cancel: &CancelSignal,
        on_text: &mut dyn FnMut(String),
    ) -> Result<StreamOutcome, GeminiApiError>;
}

#[derive(Debug)]
struct DefaultStreamClient {
    client: GeminiApiClient,
}

impl StreamClient for DefaultStreamClient {
    fn stream(
        &self,
        model: &str,
        request: &GenerateContentRequest,
        cancel: &CancelSignal,
        on_text: &mut dyn FnMut(String),
    ) -> Result<StreamOutcome, GeminiApiError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| GeminiApiError::StreamFailed {
                message: format!("failed to initialize tokio runtime: {error}"),
            })?;

        runtime.block_on(self.client.stream_with_handler(
            model,
            request,
            Some(cancel),
            |event| {
                if let GeminiStreamEvent::TextDelta { text } = event {
                    on_text(text);
                }
            },
        ))
    }
}

/// `ChatStreamProvider` adapter backed by `gemini_api` transport primitives.
pub struct GeminiProvider {
    stream_client: Arc<dyn StreamClient>,
}

impl GeminiProvider {
    /// Creates a provider using real Gemini API transport.
    pub fn new(config: GeminiProviderConfig) -> Result<Self, ProviderInitError> {
        let stream_client = Arc::new(DefaultStreamClient {
            client: GeminiApiClient::new(config.into_api_config()).map_err(map_init_error)?,
        });

        Ok(Self { stream_client })
    }

    /// Creates a provider from `GEMINI_API_KEY` (and optional
    /// `GEMINI_BASE_URL`) environment variables.
    pub fn from_env() -> Result<Self, ProviderInitError> {
        let api_key = env::var(API_KEY_ENV_VAR)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                ProviderInitError::new(format!("{API_KEY_ENV_VAR} environment variable is not set"))
            })?;

        let mut config = GeminiProviderConfig::new(api_key);
        if let Ok(base_url) = env::var(BASE_URL_ENV_VAR) {
            if !base_url.trim().is_empty() {
                config = config.with_base_url(base_url.trim().to_string());
            }
        }

        Self::new(config)
    }

    #[cfg(test)]
    fn with_stream_client_for_tests(stream_client: Arc<dyn StreamClient>) -> Self {
        Self { stream_client }
    }
}

impl ChatStreamProvider for GeminiProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: GEMINI_API_PROVIDER_ID.to_string(),
            pro_model_id: PRO_MODEL_ID.to_string(),
            fast_model_id: FAST_MODEL_ID.to_string(),
        }
    }

    fn stream(
        &self,
        req: StreamRequest,
        cancel: CancelSignal,
        emit: &mut dyn FnMut(StreamEvent),
    ) -> Result<(), String> {
        let stream_id = req.stream_id;

        emit(StreamEvent::Started { stream_id });

        if cancel.load(Ordering::Acquire) {
            emit(StreamEvent::Finished { stream_id });
            return Ok(());
        }

        let model = model_for_mode(req.mode);
        let request = build_request(&req);

        let mut forward_chunk = |text: String| {
            if !text.is_empty() {
                emit(StreamEvent::Chunk {
                    stream_id,
                    text,
                });
            }
        };

        match self
            .stream_client
            .stream(model, &request, &cancel, &mut forward_chunk)
        {
            Ok(outcome) => {
                log::debug!(
                    "gemini stream {stream_id} finished (reason: {})",
                    outcome.finish_reason.as_deref().unwrap_or("none")
                );
                emit(StreamEvent::Finished { stream_id });
            }
            // Cancellation keeps the partial answer; it is not a fault.
            Err(GeminiApiError::Cancelled) => emit(StreamEvent::Finished { stream_id }),
            Err(error) => {
                log::warn!("gemini stream {stream_id} failed: {error}");
                emit(StreamEvent::Failed {
                    stream_id,
                    error: format!("Gemini API request failed: {error}"),
                });
            }
        }

        Ok(())
    }
}

fn model_for_mode(mode: ChatMode) -> &'static str {
    match mode {
        ChatMode::Pro => PRO_MODEL_ID,
        ChatMode::Fast => FAST_MODEL_ID,
    }
}

fn build_request(req: &StreamRequest) -> GenerateContentRequest {
    let mut contents: Vec<Content> = req
        .history
        .iter()
        .map(|turn| match turn.role {
            Role::User => Content::user(turn.text.clone()),
            Role::Model => Content::model(turn.text.clone()),
        })
        .collect();
    contents.push(Content::user(req.message.clone()));

    let generation_config = match req.mode {
        ChatMode::Pro => GenerationConfig::default()
            .with_temperature(PRO_TEMPERATURE)
            .with_thinking_budget(PRO_THINKING_BUDGET),
        ChatMode::Fast => GenerationConfig::default().with_temperature(FAST_TEMPERATURE),
    };

    GenerateContentRequest::new(contents)
        .with_system_instruction(prompts::system_instruction(req.mode))
        .with_generation_config(generation_config)
}

fn map_init_error(error: GeminiApiError) -> ProviderInitError {
    ProviderInitError::new(format!("Failed to initialize gemini-api provider: {error}"))
}
