use std::time::Duration;

use fastgpt_api::retry::{is_retryable_http_error, retry_delay, BASE_DELAY_MS};

#[test]
fn retryable_statuses_are_recognized() {
    for status in [408, 429, 500, 502, 503, 504] {
        assert!(is_retryable_http_error(status, ""), "status {status}");
    }
    assert!(!is_retryable_http_error(400, "bad request"));
    assert!(!is_retryable_http_error(401, "unauthorized"));
}

#[test]
fn transient_error_text_is_retryable_regardless_of_status() {
    assert!(is_retryable_http_error(400, "rate limit exceeded"));
    assert!(is_retryable_http_error(400, "upstream Service Unavailable"));
    assert!(is_retryable_http_error(400, "connection reset by peer"));
    assert!(!is_retryable_http_error(400, "invalid app id"));
}

#[test]
fn backoff_is_exponential_from_base_delay() {
    assert_eq!(retry_delay(0), Duration::from_millis(BASE_DELAY_MS));
    assert_eq!(retry_delay(1), Duration::from_millis(BASE_DELAY_MS * 2));
    assert_eq!(retry_delay(2), Duration::from_millis(BASE_DELAY_MS * 4));
}
