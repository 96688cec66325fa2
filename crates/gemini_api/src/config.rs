use std::time::Duration;

use crate::url::DEFAULT_GEMINI_BASE_URL;

/// Transport configuration for Gemini API requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiApiConfig {
    /// API key appended to the request URL.
    pub api_key: String,
    /// Base URL for generative-language endpoints.
    pub base_url: String,
    /// Optional request timeout.
    pub timeout: Option<Duration>,
}

impl Default for GeminiApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout: None,
        }
    }
}

impl GeminiApiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
