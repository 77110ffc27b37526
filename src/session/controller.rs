//! Continuation controller
//!
//! Drives a [`GenerationSession`] through its rounds: opens the initial
//! stream, consumes it, asks the tracker whether the generation is complete
//! and, if not, requests a continuation. Transport failures re-issue the
//! current round up to `max_retries` times; incomplete rounds are continued
//! up to `max_attempts` times.

use crate::error::{CodegenError, Result};
use crate::materializer::Materializer;
use crate::transport::GenerationBackend;

use super::tracker::StreamEnd;
use super::{GenerationSession, SessionReport};

/// Controller lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerState {
    /// Not started
    #[default]
    Idle,
    /// A round is being read
    Streaming,
    /// The last round fell short and a continuation is being requested
    NeedsContinuation,
    /// The generation completed
    Complete,
    /// The session ended with an error
    Failed,
}

/// Runs sessions against a backend, writing through a materializer
#[derive(Debug)]
pub struct ContinuationController<B, M> {
    backend: B,
    materializer: M,
    state: ControllerState,
}

impl<B, M> ContinuationController<B, M>
where
    B: GenerationBackend,
    M: Materializer,
{
    /// Create a controller
    pub const fn new(backend: B, materializer: M) -> Self {
        Self {
            backend,
            materializer,
            state: ControllerState::Idle,
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> ControllerState {
        self.state
    }

    /// Backend in use
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Materializer in use
    #[must_use]
    pub const fn materializer(&self) -> &M {
        &self.materializer
    }

    /// Run `session` until it completes or a ceiling is reached
    ///
    /// # Errors
    /// - `CodegenError::MaxAttemptsExceeded` when continuation rounds or
    ///   transport retries run out with work outstanding
    /// - `CodegenError::Aborted` when the session is cancelled
    /// - `CodegenError::Filesystem` and `CodegenError::BufferOverflow` as fatal errors
    pub async fn run(&mut self, session: &mut GenerationSession) -> Result<SessionReport> {
        let result = self.drive(session).await;

        self.state = match &result {
            Ok(_) => ControllerState::Complete,
            Err(e) => {
                log::error!("[{}] Generation failed: {e}", session.session_id());
                ControllerState::Failed
            }
        };
        result
    }

    async fn drive(&mut self, session: &mut GenerationSession) -> Result<SessionReport> {
        loop {
            self.state = ControllerState::Streaming;
            let end = self.stream_round(session).await?;

            match session.check_complete(end) {
                Ok(()) => {
                    let report = session.report();
                    log::info!("[{}] {report}", session.session_id());
                    return Ok(report);
                }
                Err(CodegenError::IncompleteContent { outstanding, .. }) => {
                    if session.attempt_count() >= session.options().max_attempts {
                        return Err(session.max_attempts_exceeded(None));
                    }
                    self.state = ControllerState::NeedsContinuation;
                    log::info!(
                        "[{}] Round {} incomplete ({} outstanding), requesting continuation",
                        session.session_id(),
                        session.attempt_count(),
                        outstanding.len()
                    );
                    session.next_attempt();
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Run the current round, re-issuing it on transport failures
    async fn stream_round(&self, session: &mut GenerationSession) -> Result<StreamEnd> {
        loop {
            let error = match self.try_round(session).await {
                Ok(end) => return Ok(end),
                Err(e) if e.is_retryable() => e,
                Err(e) => return Err(e),
            };

            if session.retry_count() >= session.options().max_retries {
                return Err(session.max_attempts_exceeded(Some(error.to_string())));
            }

            let retry = session.record_retry(&error);
            log::warn!(
                "[{}] Transport failure in round {} (retry {}/{}): {error}",
                session.session_id(),
                session.attempt_count(),
                retry,
                session.options().max_retries
            );

            let delay = session.options().retry_delay;
            tokio::select! {
                biased;
                () = session.cancellation_token().cancelled() => return Err(session.aborted()),
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn try_round(&self, session: &mut GenerationSession) -> Result<StreamEnd> {
        session.begin_round();
        let mut stream = self.open_round(session).await?;
        session.consume(&mut stream, &self.materializer).await
    }

    /// Initial request for round 0, a continuation request afterwards
    async fn open_round(&self, session: &GenerationSession) -> Result<B::Stream> {
        let request = async {
            if session.attempt_count() == 0 {
                self.backend.open_generation(session.generation_id()).await
            } else {
                let continuation = session.continuation_request();
                log::debug!(
                    "[{}] Continuation request: {} completed, {} outstanding, partial: {}",
                    session.session_id(),
                    continuation.completed_files.len(),
                    continuation.outstanding_files.len(),
                    continuation.pending_partial.is_some()
                );
                self.backend
                    .continue_generation(session.generation_id(), &continuation)
                    .await
            }
        };

        tokio::select! {
            biased;
            () = session.cancellation_token().cancelled() => Err(session.aborted()),
            stream = request => stream,
        }
    }
}
