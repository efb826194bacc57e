use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode};

use crate::config::FastgptApiConfig;
use crate::error::{parse_error_message, FastgptApiError};
use crate::payload::ChatCompletionRequest;
use crate::retry::{is_retryable_http_error, retry_delay, MAX_RETRIES};
use crate::url::normalize_chat_url;

/// Optional cancellation signal shared across request and stream loops.
pub type CancellationSignal = Arc<AtomicBool>;

/// Raw response body chunks, ready for incremental decoding.
pub type ChatByteStream = BoxStream<'static, Result<Bytes, FastgptApiError>>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug)]
pub struct FastgptApiClient {
    http: Client,
    config: FastgptApiConfig,
}

impl FastgptApiClient {
    pub fn new(config: FastgptApiConfig) -> Result<Self, FastgptApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(FastgptApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &FastgptApiConfig {
        &self.config
    }

    pub fn normalized_endpoint(&self) -> String {
        normalize_chat_url(&self.config.base_url)
    }

    pub fn build_headers(&self) -> Result<HeaderMap, FastgptApiError> {
        let mut headers = HeaderMap::new();

        let token = self.config.bearer_token.trim();
        if !token.is_empty() {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                FastgptApiError::InvalidBaseUrl("invalid bearer token header value".to_string())
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        if let Some(user_agent) = self.config.user_agent.as_deref() {
            headers.insert(
                USER_AGENT,
                HeaderValue::from_str(user_agent).map_err(|_| {
                    FastgptApiError::InvalidBaseUrl("invalid user agent header value".to_string())
                })?,
            );
        }

        for (key, value) in &self.config.extra_headers {
            headers.insert(
                HeaderName::from_bytes(key.as_bytes()).map_err(|_| {
                    FastgptApiError::InvalidBaseUrl(format!("invalid header key: {key}"))
                })?,
                HeaderValue::from_str(value).map_err(|_| {
                    FastgptApiError::InvalidBaseUrl(format!("invalid header value for {key}"))
                })?,
            );
        }

        Ok(headers)
    }

    pub fn build_request(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<reqwest::RequestBuilder, FastgptApiError> {
        if request.fastgpt_app_id.trim().is_empty() {
            return Err(FastgptApiError::MissingAppId);
        }

        let headers = self.build_headers()?;
        let payload = self.request_with_transport_defaults(request);
        Ok(self
            .http
            .post(self.normalized_endpoint())
            .headers(headers)
            .json(&payload))
    }

    fn request_with_transport_defaults(
        &self,
        request: &ChatCompletionRequest,
    ) -> ChatCompletionRequest {
        let mut payload = request.clone();
        payload.stream = true;
        if payload.share_id.is_empty() {
            if let Some(share_id) = self.config.share_id.as_deref() {
                payload.share_id = share_id.to_string();
            }
        }
        if payload.out_link_uid.is_empty() {
            if let Some(out_link_uid) = self.config.out_link_uid.as_deref() {
                payload.out_link_uid = out_link_uid.to_string();
            }
        }
        payload
    }

    pub async fn send_with_retry(
        &self,
        request: &ChatCompletionRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Response, FastgptApiError> {
        let mut last_status: Option<StatusCode> = None;
        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if is_cancelled(cancellation) {
                return Err(FastgptApiError::Cancelled);
            }

            let response = self.build_request(request)?.send();
            let response = await_or_cancel(response, cancellation)
                .await?
                .map_err(FastgptApiError::from);

            match response {
                Ok(response) => {
                    if response.status().is_success() {
                        return Ok(response);
                    }

                    let status = response.status();
                    last_status = Some(status);
                    let body = await_or_cancel(response.text(), cancellation)
                        .await?
                        .unwrap_or_else(|_| {
                            status
                                .canonical_reason()
                                .unwrap_or("request failed")
                                .to_string()
                        });
                    let message = parse_error_message(status, &body);
                    last_error = Some(message.clone());

                    if attempt < MAX_RETRIES && is_retryable_http_error(status.as_u16(), &body) {
                        await_or_cancel(tokio::time::sleep(retry_delay(attempt)), cancellation)
                            .await?;
                        continue;
                    }

                    return Err(FastgptApiError::Status(status, message));
                }
                Err(error) => {
                    last_error = Some(error.to_string());
                    if attempt < MAX_RETRIES {
                        await_or_cancel(tokio::time::sleep(retry_delay(attempt)), cancellation)
                            .await?;
                        continue;
                    }
                    return Err(FastgptApiError::RetryExhausted {
                        status: last_status,
                        last_error,
                    });
                }
            }
        }

        Err(FastgptApiError::RetryExhausted {
            status: last_status,
            last_error,
        })
    }

    /// Open the streaming endpoint and hand back raw response-body chunks.
    ///
    /// Decoding is left to the caller so conversation-level concerns (stale
    /// stream discard, per-chunk sequencing) stay outside this crate.
    pub async fn chat_stream(
        &self,
        request: &ChatCompletionRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<ChatByteStream, FastgptApiError> {
        let response = self.send_with_retry(request, cancellation).await?;
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(FastgptApiError::from));
        Ok(stream.boxed())
    }

}

fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, FastgptApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(FastgptApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(FastgptApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}
