//! HTTP backend for the code generation service

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;

use crate::error::{CodegenError, Result};
use crate::session::continuation::ContinuationRequest;
use crate::types::identifiers::GenerationId;

use super::{ChunkSource, GenerationBackend, ReadChunk};

/// Default base URL of the generation service
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/gemini";

/// Backend talking to the generation service over HTTP
///
/// - `GET {base}/code-generation/{id}` streams a generation
/// - `POST {base}/code-generation/{id}/continue` with `{"message": ...}` continues it
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a backend for `base_url`
    ///
    /// # Errors
    /// Returns `CodegenError::InvalidConfig` if the URL is empty or the client cannot be built
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(CodegenError::invalid_config("API base URL must not be empty"));
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("kodegen-figma-codegen/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CodegenError::invalid_config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    /// Base URL requests are sent to
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn generation_url(&self, generation_id: &GenerationId) -> String {
        format!("{}/code-generation/{}", self.base_url, generation_id)
    }

    async fn stream_from(response: reqwest::Response) -> Result<HttpStream> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CodegenError::http(status.as_u16(), body));
        }
        Ok(HttpStream {
            inner: response.bytes_stream().boxed(),
        })
    }
}

impl GenerationBackend for HttpBackend {
    type Stream = HttpStream;

    async fn open_generation(&self, generation_id: &GenerationId) -> Result<HttpStream> {
        let url = self.generation_url(generation_id);
        log::debug!("GET {url}");

        let response = self
            .client
            .get(&url)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| CodegenError::transport(format!("Failed to fetch generation: {e}")))?;

        Self::stream_from(response).await
    }

    async fn continue_generation(
        &self,
        generation_id: &GenerationId,
        request: &ContinuationRequest,
    ) -> Result<HttpStream> {
        let url = format!("{}/continue", self.generation_url(generation_id));
        log::debug!("POST {url}");

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "message": request.to_message() }))
            .send()
            .await
            .map_err(|e| CodegenError::transport(format!("Failed to continue generation: {e}")))?;

        Self::stream_from(response).await
    }
}

/// Response body of one HTTP round
pub struct HttpStream {
    inner: BoxStream<'static, reqwest::Result<Bytes>>,
}

impl std::fmt::Debug for HttpStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStream").finish_non_exhaustive()
    }
}

impl ChunkSource for HttpStream {
    async fn read(&mut self) -> Result<ReadChunk> {
        match self.inner.next().await {
            Some(Ok(bytes)) => Ok(ReadChunk::data(bytes)),
            Some(Err(e)) => Err(CodegenError::transport(format!("Stream read failed: {e}"))),
            None => Ok(ReadChunk::end()),
        }
    }
}
