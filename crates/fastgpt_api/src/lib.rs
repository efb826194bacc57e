//! Transport-only FastGPT chat-completion client primitives.
//!
//! This crate owns request building, URL normalization, HTTP retry policy,
//! and incremental decoding of the line-framed streaming response for the
//! FastGPT proxy endpoints only. It intentionally contains no conversation
//! state and no rendering coupling; the consuming engine owns both.
//!
//! The proxy forwards upstream SSE payloads line-by-line and occasionally
//! re-wraps them as `{"data":"<json-string>"}`, so [`DeltaFrameDecoder`]
//! handles one level of double-JSON-encoding transparently.

pub mod client;
pub mod config;
pub mod decoder;
pub mod error;
pub mod events;
pub mod payload;
pub mod retry;
pub mod url;

pub use client::{ChatByteStream, FastgptApiClient};
pub use config::FastgptApiConfig;
pub use decoder::DeltaFrameDecoder;
pub use error::FastgptApiError;
pub use events::DeltaEvent;
pub use payload::{ChatCompletionRequest, ChatMessage, ChatRole};
pub use url::normalize_chat_url;
