/// Default base URL for chat transport requests.
pub const DEFAULT_FASTGPT_BASE_URL: &str = "http://localhost:8080/api";

/// Normalize a base URL to the streaming chat-completions endpoint.
///
/// Normalization rules:
/// 1) keep `/v1/chat/completions/stream` unchanged
/// 2) append `/stream` when the path ends in `/v1/chat/completions`
/// 3) append `/v1/chat/completions/stream` otherwise
pub fn normalize_chat_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_FASTGPT_BASE_URL
    } else {
        input.trim()
    };

    let trimmed = base.trim_end_matches('/');
    if trimmed.ends_with("/v1/chat/completions/stream") {
        return trimmed.to_string();
    }
    if trimmed.ends_with("/v1/chat/completions") {
        return format!("{trimmed}/stream");
    }
    format!("{trimmed}/v1/chat/completions/stream")
}
