/// Default base URL for Gemini transport requests.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Builds the SSE streaming endpoint for one model.
///
/// Rules:
/// 1) an empty base falls back to [`DEFAULT_GEMINI_BASE_URL`]
/// 2) trailing slashes on the base are ignored
/// 3) the path is `models/{model}:streamGenerateContent` with `alt=sse` and
///    the API key as query parameters
pub fn stream_url(base: &str, model: &str, api_key: &str) -> String {
    let base = if base.trim().is_empty() {
        DEFAULT_GEMINI_BASE_URL
    } else {
        base.trim()
    };
    let trimmed = base.trim_end_matches('/');

    format!("{trimmed}/models/{model}:streamGenerateContent?alt=sse&key={api_key}")
}
