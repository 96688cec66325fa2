use gemini_api::{stream_url, DEFAULT_GEMINI_BASE_URL};

#[test]
fn stream_url_builds_sse_endpoint_for_model() {
    assert_eq!(
        stream_url(DEFAULT_GEMINI_BASE_URL, "gemini-3-pro-preview", "k123"),
        "https://generativelanguage.googleapis.com/v1beta/models/gemini-3-pro-preview:streamGenerateContent?alt=sse&key=k123"
    );
}

#[test]
fn stream_url_trims_trailing_slashes() {
    assert_eq!(
        stream_url("https://example.test/v1beta///", "m", "k"),
        "https://example.test/v1beta/models/m:streamGenerateContent?alt=sse&key=k"
    );
}

#[test]
fn stream_url_falls_back_to_default_base_when_empty() {
    let url = stream_url("   ", "gemini-3-flash-preview", "k");
    assert!(url.starts_with(DEFAULT_GEMINI_BASE_URL));
    assert!(url.contains("models/gemini-3-flash-preview:streamGenerateContent"));
}
