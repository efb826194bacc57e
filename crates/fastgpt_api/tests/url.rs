use fastgpt_api::normalize_chat_url;
use fastgpt_api::url::DEFAULT_FASTGPT_BASE_URL;

#[test]
fn empty_input_falls_back_to_default_base() {
    assert_eq!(
        normalize_chat_url(""),
        format!("{DEFAULT_FASTGPT_BASE_URL}/v1/chat/completions/stream")
    );
}

#[test]
fn bare_base_url_gains_full_endpoint_path() {
    assert_eq!(
        normalize_chat_url("https://example.com/api/"),
        "https://example.com/api/v1/chat/completions/stream"
    );
}

#[test]
fn completions_path_gains_stream_suffix() {
    assert_eq!(
        normalize_chat_url("https://example.com/api/v1/chat/completions"),
        "https://example.com/api/v1/chat/completions/stream"
    );
}

#[test]
fn full_stream_endpoint_is_left_unchanged() {
    assert_eq!(
        normalize_chat_url("https://example.com/api/v1/chat/completions/stream/"),
        "https://example.com/api/v1/chat/completions/stream"
    );
}
