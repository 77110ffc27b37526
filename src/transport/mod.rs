//! Transport layer between the engine and the code generation backend
//!
//! This module provides the byte-stream and backend abstractions plus their
//! implementations: an HTTP backend with the `http` feature, and a scripted
//! in-memory backend for tests with the `testing` feature.

#[cfg(feature = "http")]
pub mod http;
#[cfg(any(test, feature = "testing"))]
pub mod memory;

use bytes::Bytes;

use crate::error::Result;
use crate::session::continuation::ContinuationRequest;
use crate::types::identifiers::GenerationId;

/// One read from a byte stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadChunk {
    /// Bytes received (may be empty)
    pub bytes: Bytes,
    /// Whether the stream has ended
    pub done: bool,
}

impl ReadChunk {
    /// A chunk carrying data, with more to follow
    pub fn data(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            done: false,
        }
    }

    /// The end-of-stream marker
    #[must_use]
    pub fn end() -> Self {
        Self {
            bytes: Bytes::new(),
            done: true,
        }
    }
}

/// Byte stream produced by the backend for one round
pub trait ChunkSource: Send {
    /// Read the next chunk
    ///
    /// # Errors
    /// Returns a transport error if the underlying read fails
    fn read(&mut self) -> impl std::future::Future<Output = Result<ReadChunk>> + Send;
}

/// Backend that runs the generation and streams its output
///
/// Both calls target the same backend job, identified by its `GenerationId`.
pub trait GenerationBackend: Send + Sync {
    /// Stream type returned for each round
    type Stream: ChunkSource;

    /// Open the stream of an existing generation
    ///
    /// # Errors
    /// Returns a transport error if the request is rejected
    fn open_generation(
        &self,
        generation_id: &GenerationId,
    ) -> impl std::future::Future<Output = Result<Self::Stream>> + Send;

    /// Ask the backend to continue a truncated generation
    ///
    /// # Errors
    /// Returns a transport error if the request is rejected
    fn continue_generation(
        &self,
        generation_id: &GenerationId,
        request: &ContinuationRequest,
    ) -> impl std::future::Future<Output = Result<Self::Stream>> + Send;
}

#[cfg(feature = "http")]
pub use http::{HttpBackend, HttpStream};
#[cfg(any(test, feature = "testing"))]
pub use memory::{BackendCall, ScriptedBackend, ScriptedChunk, ScriptedRound, ScriptedStream};
