use fastgpt_api::error::parse_error_message;
use reqwest::StatusCode;

#[test]
fn proxy_error_string_is_extracted() {
    let message = parse_error_message(StatusCode::BAD_REQUEST, r#"{"error":"应用不存在或已禁用"}"#);
    assert_eq!(message, "应用不存在或已禁用");
}

#[test]
fn openai_style_error_object_is_extracted() {
    let message = parse_error_message(
        StatusCode::TOO_MANY_REQUESTS,
        r#"{"error":{"message":"rate limit exceeded","code":"429"}}"#,
    );
    assert_eq!(message, "rate limit exceeded");
}

#[test]
fn envelope_msg_field_is_extracted() {
    let message = parse_error_message(
        StatusCode::INTERNAL_SERVER_ERROR,
        r#"{"code":500001,"msg":"FastGPT API 调用失败"}"#,
    );
    assert_eq!(message, "FastGPT API 调用失败");
}

#[test]
fn unparsable_body_is_returned_verbatim() {
    let message = parse_error_message(StatusCode::BAD_GATEWAY, "<html>nope</html>");
    assert_eq!(message, "<html>nope</html>");
}

#[test]
fn empty_body_falls_back_to_status_reason() {
    let message = parse_error_message(StatusCode::NOT_FOUND, "");
    assert_eq!(message, "Not Found");
}
