//! Byte-stream transport seam between the engine and any wire client.

use std::error::Error as StdError;
use std::fmt;

use bytes::Bytes;
use fastgpt_api::ChatCompletionRequest;
use futures_util::stream::BoxStream;

/// Failure while opening or reading a completion stream.
#[derive(Debug)]
pub struct TransportError {
    message: String,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl TransportError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for TransportError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|err| err as &(dyn StdError + 'static))
    }
}

/// Raw bytes as they arrive off the wire, before frame decoding.
pub type ByteChunkStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Anything that can turn a completion request into a byte stream.
///
/// The production implementation wraps the HTTP client; tests substitute
/// scripted chunk sequences.
#[async_trait::async_trait]
pub trait StreamTransport: Send + Sync {
    async fn stream_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ByteChunkStream, TransportError>;
}
