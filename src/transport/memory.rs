//! In-memory scripted backend
//!
//! Replays predetermined rounds of chunks, optionally failing requests or
//! reads, and records every call it receives. Only built for tests and with
//! the `testing` feature.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::error::{CodegenError, Result};
use crate::session::continuation::ContinuationRequest;
use crate::types::identifiers::GenerationId;

use super::{ChunkSource, GenerationBackend, ReadChunk};

/// One scripted step of a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedChunk {
    /// Deliver these bytes
    Data(Bytes),
    /// Fail the read with a transport error
    Error(String),
    /// Never deliver anything again
    Stall,
}

/// What the backend answers to one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedRound {
    /// Reject the request with a transport error
    Reject(String),
    /// Stream these chunks, then end
    Stream(Vec<ScriptedChunk>),
}

impl ScriptedRound {
    /// Stream the given text chunks verbatim
    pub fn chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Stream(
            chunks
                .into_iter()
                .map(|c| ScriptedChunk::Data(Bytes::copy_from_slice(c.as_ref().as_bytes())))
                .collect(),
        )
    }

    /// Stream `payload` split every `size` bytes, ignoring UTF-8 boundaries
    #[must_use]
    pub fn split(payload: &str, size: usize) -> Self {
        Self::Stream(
            payload
                .as_bytes()
                .chunks(size.max(1))
                .map(|c| ScriptedChunk::Data(Bytes::copy_from_slice(c)))
                .collect(),
        )
    }

    /// Append a final step to a streaming round
    #[must_use]
    pub fn then(self, chunk: ScriptedChunk) -> Self {
        match self {
            Self::Stream(mut chunks) => {
                chunks.push(chunk);
                Self::Stream(chunks)
            }
            reject => reject,
        }
    }
}

/// A request the scripted backend received
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    /// `open_generation`
    Open(GenerationId),
    /// `continue_generation`
    Continue(GenerationId, ContinuationRequest),
}

#[derive(Debug, Default)]
struct ScriptState {
    rounds: VecDeque<ScriptedRound>,
    fallback: Option<ScriptedRound>,
    calls: Vec<BackendCall>,
}

/// Backend replaying scripted rounds in request order
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedBackend {
    /// Create a backend answering requests with `rounds`, in order
    pub fn new(rounds: impl IntoIterator<Item = ScriptedRound>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptState {
                rounds: rounds.into_iter().collect(),
                ..ScriptState::default()
            })),
        }
    }

    /// Answer every request past the script with `round`
    #[must_use]
    pub fn with_fallback(self, round: ScriptedRound) -> Self {
        self.state.lock().fallback = Some(round);
        self
    }

    /// Requests received so far
    #[must_use]
    pub fn calls(&self) -> Vec<BackendCall> {
        self.state.lock().calls.clone()
    }

    /// Continuation requests received so far
    #[must_use]
    pub fn continuation_requests(&self) -> Vec<ContinuationRequest> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::Continue(_, request) => Some(request.clone()),
                BackendCall::Open(_) => None,
            })
            .collect()
    }

    fn answer(&self, call: BackendCall) -> Result<ScriptedStream> {
        let mut state = self.state.lock();
        state.calls.push(call);

        let round = match state.rounds.pop_front() {
            Some(round) => round,
            None => state
                .fallback
                .clone()
                .ok_or_else(|| CodegenError::transport("scripted backend has no round left"))?,
        };

        match round {
            ScriptedRound::Reject(message) => Err(CodegenError::transport(message)),
            ScriptedRound::Stream(chunks) => Ok(ScriptedStream::new(chunks)),
        }
    }
}

impl GenerationBackend for ScriptedBackend {
    type Stream = ScriptedStream;

    async fn open_generation(&self, generation_id: &GenerationId) -> Result<ScriptedStream> {
        self.answer(BackendCall::Open(generation_id.clone()))
    }

    async fn continue_generation(
        &self,
        generation_id: &GenerationId,
        request: &ContinuationRequest,
    ) -> Result<ScriptedStream> {
        self.answer(BackendCall::Continue(generation_id.clone(), request.clone()))
    }
}

/// Stream replaying scripted chunks
#[derive(Debug)]
pub struct ScriptedStream {
    chunks: VecDeque<ScriptedChunk>,
}

impl ScriptedStream {
    /// Create a stream over `chunks`
    #[must_use]
    pub fn new(chunks: Vec<ScriptedChunk>) -> Self {
        Self {
            chunks: chunks.into(),
        }
    }
}

impl ChunkSource for ScriptedStream {
    async fn read(&mut self) -> Result<ReadChunk> {
        match self.chunks.pop_front() {
            None => Ok(ReadChunk::end()),
            Some(ScriptedChunk::Data(bytes)) => Ok(ReadChunk {
                bytes,
                done: self.chunks.is_empty(),
            }),
            Some(ScriptedChunk::Error(message)) => Err(CodegenError::transport(message)),
            Some(ScriptedChunk::Stall) => {
                std::future::pending::<()>().await;
                Ok(ReadChunk::end())
            }
        }
    }
}
