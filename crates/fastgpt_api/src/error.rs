use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Error as JsonError;

#[derive(Debug)]
pub enum FastgptApiError {
    MissingAppId,
    InvalidBaseUrl(String),
    Request(reqwest::Error),
    Status(StatusCode, String),
    Serde(JsonError),
    RetryExhausted {
        status: Option<StatusCode>,
        last_error: Option<String>,
    },
    StreamFailed {
        message: String,
    },
    Cancelled,
    Unknown(String),
}

impl fmt::Display for FastgptApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingAppId => write!(f, "fastgpt app id is required"),
            Self::InvalidBaseUrl(value) => write!(f, "invalid base URL: {value}"),
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status(status, message) => write!(f, "HTTP {status} {message}"),
            Self::Serde(error) => write!(f, "serialization error: {error}"),
            Self::RetryExhausted { status, last_error } => {
                let status = status
                    .map(|status| status.as_u16().to_string())
                    .unwrap_or_else(|| "n/a".to_owned());
                write!(
                    f,
                    "retry exhausted after max attempts (status: {status}, last_error: {last_error:?})"
                )
            }
            Self::StreamFailed { message } => write!(f, "stream failed: {message}"),
            Self::Cancelled => write!(f, "request was cancelled"),
            Self::Unknown(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for FastgptApiError {}

impl From<reqwest::Error> for FastgptApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

impl From<JsonError> for FastgptApiError {
    fn from(error: JsonError) -> Self {
        Self::Serde(error)
    }
}

/// Error body shapes seen from the proxy. The proxy reports either a bare
/// `{"error":"..."}` string, an OpenAI-style `{"error":{"message":...}}`
/// object, or a `{"code":...,"msg":"..."}` envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    #[serde(default)]
    error: Option<ErrorField>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorField {
    Text(String),
    Object { message: Option<String> },
}

impl ErrorPayload {
    fn into_message(self) -> Option<String> {
        let explicit = match self.error {
            Some(ErrorField::Text(text)) => non_empty(text),
            Some(ErrorField::Object { message }) => message.and_then(non_empty),
            None => None,
        };

        explicit
            .or_else(|| self.msg.and_then(non_empty))
            .or_else(|| self.message.and_then(non_empty))
    }
}

pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ErrorPayload>(body) {
        if let Some(message) = payload.into_message() {
            return message;
        }
    }

    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
