use fastgpt_api::{ChatCompletionRequest, FastgptApiClient, FastgptApiConfig, FastgptApiError};
use futures_util::StreamExt;

use crate::transport::{ByteChunkStream, StreamTransport, TransportError};

/// Production transport over the streaming proxy endpoint.
#[derive(Debug)]
pub struct FastgptTransport {
    client: FastgptApiClient,
}

impl FastgptTransport {
    pub fn new(config: FastgptApiConfig) -> Result<Self, TransportError> {
        let client = FastgptApiClient::new(config).map_err(wire_error)?;
        Ok(Self { client })
    }

    #[must_use]
    pub fn client(&self) -> &FastgptApiClient {
        &self.client
    }
}

#[async_trait::async_trait]
impl StreamTransport for FastgptTransport {
    async fn stream_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ByteChunkStream, TransportError> {
        let bytes = self
            .client
            .chat_stream(&request, None)
            .await
            .map_err(wire_error)?;
        Ok(bytes.map(|chunk| chunk.map_err(wire_error)).boxed())
    }
}

fn wire_error(error: FastgptApiError) -> TransportError {
    TransportError::with_source(error.to_string(), error)
}
