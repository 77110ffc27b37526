//! Generation sessions
//!
//! A [`GenerationSession`] owns every piece of mutable parse state for one
//! generation: the chunk decoder, the record extractor and its buffer, the
//! completed-file set, the dangling partial and the completion tracker. It
//! survives across continuation rounds; only the buffer is reset between
//! them.
//!
//! - [`continuation`] - Requests sent to resume a truncated generation
//! - [`tracker`] - End-of-round completeness decisions
//! - [`controller`] - The retry and continuation loop driving a session

pub mod continuation;
pub mod controller;
pub mod tracker;

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{CodegenError, Result};
use crate::materializer::Materializer;
use crate::stream::{ChunkDecoder, Extracted, RecordExtractor};
use crate::transport::{ChunkSource, ReadChunk};
use crate::types::events::SessionEvent;
use crate::types::identifiers::{GenerationId, SessionId};
use crate::types::manifest::Manifest;
use crate::types::options::SessionOptions;
use crate::types::record::{FileRecord, MalformedRecord, PendingPartial, normalize_path};

pub use continuation::ContinuationRequest;
pub use controller::{ContinuationController, ControllerState};
pub use tracker::{Completion, CompletionTracker, IncompleteReason, StreamEnd, TrackerState};

// ============================================================================
// Generation Session
// ============================================================================

/// State of one generation across all of its rounds
#[derive(Debug)]
pub struct GenerationSession {
    session_id: SessionId,
    generation_id: GenerationId,
    options: SessionOptions,
    decoder: ChunkDecoder,
    extractor: RecordExtractor,
    completed_files: BTreeSet<String>,
    pending_partial: Option<PendingPartial>,
    tracker: CompletionTracker,
    attempt_count: u32,
    retry_count: u32,
    total_retries: u32,
    malformed: Vec<MalformedRecord>,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
    cancel: CancellationToken,
    started_at: DateTime<Utc>,
}

impl GenerationSession {
    /// Create a session for `generation_id`
    pub fn new(generation_id: impl Into<GenerationId>, options: SessionOptions) -> Self {
        let extractor = RecordExtractor::new(
            options.wire_format,
            options.schema.clone(),
            options.max_buffer_size,
        );

        Self {
            session_id: SessionId::generate(),
            generation_id: generation_id.into(),
            options,
            decoder: ChunkDecoder::new(),
            extractor,
            completed_files: BTreeSet::new(),
            pending_partial: None,
            tracker: CompletionTracker::new(),
            attempt_count: 0,
            retry_count: 0,
            total_retries: 0,
            malformed: Vec::new(),
            events: None,
            cancel: CancellationToken::new(),
            started_at: Utc::now(),
        }
    }

    /// Declare the files the generation must produce
    ///
    /// # Errors
    /// Returns `CodegenError::InvalidConfig` if an entry is not a valid relative path
    pub fn with_manifest(mut self, manifest: &Manifest) -> Result<Self> {
        self.tracker.require(manifest.normalized()?);
        Ok(self)
    }

    /// Send progress events to `events`
    #[must_use]
    pub fn with_events(mut self, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Abort the session when `token` is cancelled
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Session identifier
    #[must_use]
    pub const fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Backend generation identifier
    #[must_use]
    pub const fn generation_id(&self) -> &GenerationId {
        &self.generation_id
    }

    /// Session options
    #[must_use]
    pub const fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Paths materialized so far
    #[must_use]
    pub const fn completed_files(&self) -> &BTreeSet<String> {
        &self.completed_files
    }

    /// Record the last round stopped inside, if any
    #[must_use]
    pub const fn pending_partial(&self) -> Option<&PendingPartial> {
        self.pending_partial.as_ref()
    }

    /// Candidates rejected so far
    #[must_use]
    pub fn malformed(&self) -> &[MalformedRecord] {
        &self.malformed
    }

    /// Required files not yet materialized (empty without a manifest)
    #[must_use]
    pub fn outstanding_files(&self) -> Vec<String> {
        self.tracker.outstanding(&self.completed_files)
    }

    /// Completion tracker state
    #[must_use]
    pub const fn tracker_state(&self) -> TrackerState {
        self.tracker.state()
    }

    /// Continuation rounds performed
    #[must_use]
    pub const fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// Transport retries performed in the current round
    #[must_use]
    pub const fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Token that aborts this session
    #[must_use]
    pub const fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    // ------------------------------------------------------------------------
    // Round lifecycle
    // ------------------------------------------------------------------------

    /// Prepare decoder and extractor for a new stream
    ///
    /// The buffer starts empty, seeded with the dangling partial when there is one.
    pub fn begin_round(&mut self) {
        self.decoder = ChunkDecoder::new();
        match self.pending_partial.clone() {
            Some(partial) => self.extractor.resume(partial),
            None => self.extractor.reset(),
        }

        log::info!(
            "[{}] Starting round {} for generation {}",
            self.session_id,
            self.attempt_count,
            self.generation_id
        );
        self.emit(SessionEvent::RoundStarted {
            round: self.attempt_count,
        });
    }

    /// Read `stream` to its end, materializing every completed record
    ///
    /// # Errors
    /// Returns transport errors from the stream, `CodegenError::Filesystem` on
    /// write failures, `CodegenError::BufferOverflow` and `CodegenError::Aborted`
    pub async fn consume<S, M>(&mut self, stream: &mut S, materializer: &M) -> Result<StreamEnd>
    where
        S: ChunkSource,
        M: Materializer,
    {
        let end = match self.read_round(stream, materializer).await {
            Ok(end) => end,
            Err(e) => {
                if e.is_retryable() {
                    // A retried round resumes from wherever this one stopped
                    self.refresh_partial();
                }
                return Err(e);
            }
        };
        self.refresh_partial();

        if let Some(partial) = &self.pending_partial {
            log::info!(
                "[{}] Stream stopped inside '{}' after {} byte(s) of content",
                self.session_id,
                partial.file_name.as_deref().unwrap_or("<unnamed>"),
                partial.raw_content.len()
            );
            self.emit(SessionEvent::PartialCaptured {
                file_name: partial.file_name.clone(),
                bytes: partial.raw_content.len(),
            });
        }

        log::info!(
            "[{}] Round {} ended ({:?}), {} file(s) completed",
            self.session_id,
            self.attempt_count,
            end,
            self.completed_files.len()
        );
        self.emit(SessionEvent::RoundEnded {
            round: self.attempt_count,
            completed: self.completed_files.len(),
        });

        Ok(end)
    }

    /// Judge completeness after a round
    ///
    /// # Errors
    /// Returns `CodegenError::IncompleteContent` when another round is needed
    pub fn check_complete(&mut self, end: StreamEnd) -> Result<()> {
        let dangling = self.pending_partial.is_some();
        self.tracker
            .evaluate(&self.completed_files, end, dangling)
            .into_result(&self.completed_files)
    }

    /// Request describing what the backend should continue with
    #[must_use]
    pub fn continuation_request(&self) -> ContinuationRequest {
        ContinuationRequest {
            completed_files: self.completed_files.iter().cloned().collect(),
            outstanding_files: self.outstanding_files(),
            pending_partial: self.pending_partial.clone(),
        }
    }

    /// Move to the next continuation round
    pub fn next_attempt(&mut self) -> u32 {
        self.attempt_count += 1;
        self.retry_count = 0;
        self.attempt_count
    }

    /// Count a transport retry in the current round
    pub fn record_retry(&mut self, error: &CodegenError) -> u32 {
        self.retry_count += 1;
        self.total_retries += 1;
        self.emit(SessionEvent::TransportRetry {
            retry: self.retry_count,
            error: error.to_string(),
        });
        self.retry_count
    }

    /// Summary of the session so far
    #[must_use]
    pub fn report(&self) -> SessionReport {
        SessionReport {
            session_id: self.session_id.clone(),
            generation_id: self.generation_id.clone(),
            completed_files: self.completed_files.iter().cloned().collect(),
            outstanding_files: self.outstanding_files(),
            rounds: self.attempt_count + 1,
            retries: self.total_retries,
            malformed: self.malformed.len(),
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }

    /// Error for a cancelled session
    #[must_use]
    pub fn aborted(&self) -> CodegenError {
        CodegenError::Aborted {
            completed: self.completed_files.len(),
        }
    }

    /// Error for an exhausted continuation or retry ceiling
    #[must_use]
    pub fn max_attempts_exceeded(&self, last_error: Option<String>) -> CodegenError {
        CodegenError::MaxAttemptsExceeded {
            attempts: self.attempt_count,
            retries: self.retry_count,
            completed: self.completed_files.len(),
            outstanding: self.outstanding_files(),
            malformed: self.malformed.len(),
            last_error,
        }
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    /// Next read, or `None` once the idle timeout expires
    async fn next_chunk<S: ChunkSource>(&self, stream: &mut S) -> Result<Option<ReadChunk>> {
        let read = async {
            match self.options.idle_timeout {
                Some(limit) => tokio::time::timeout(limit, stream.read())
                    .await
                    .ok()
                    .transpose(),
                None => stream.read().await.map(Some),
            }
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(self.aborted()),
            chunk = read => chunk,
        }
    }

    /// Feed every chunk of `stream` through decoder and extractor
    async fn read_round<S, M>(&mut self, stream: &mut S, materializer: &M) -> Result<StreamEnd>
    where
        S: ChunkSource,
        M: Materializer,
    {
        let end = loop {
            let Some(chunk) = self.next_chunk(stream).await? else {
                log::warn!(
                    "[{}] No data received within the idle timeout, treating stream as stalled",
                    self.session_id
                );
                break StreamEnd::Stalled;
            };

            if !chunk.bytes.is_empty() {
                log::debug!("[{}] Received chunk of {} bytes", self.session_id, chunk.bytes.len());
                let text = self.decoder.decode(&chunk.bytes);
                self.push_text(&text, materializer).await?;
            }

            if chunk.done {
                break StreamEnd::Natural;
            }
        };

        let tail = self.decoder.finish();
        self.push_text(&tail, materializer).await?;

        let flushed = self.extractor.finish();
        self.apply(flushed, materializer).await?;
        Ok(end)
    }

    async fn push_text<M: Materializer>(&mut self, text: &str, materializer: &M) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let batch = self.extractor.push(text)?;
        self.apply(batch, materializer).await
    }

    /// Materialize one extraction pass
    async fn apply<M: Materializer>(&mut self, batch: Vec<Extracted>, materializer: &M) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        if self.cancel.is_cancelled() {
            return Err(self.aborted());
        }

        let mut records: Vec<FileRecord> = Vec::new();
        for item in batch {
            match item {
                Extracted::Record(record) => {
                    let seen = self.completed_files.contains(&record.path)
                        || records.iter().any(|r| r.path == record.path);
                    if seen {
                        log::debug!("[{}] Skipping already written file: {}", self.session_id, record.path);
                        self.emit(SessionEvent::FileSkipped { path: record.path });
                    } else {
                        records.push(record);
                    }
                }
                Extracted::Manifest(manifest) => self.merge_manifest(&manifest),
                Extracted::Malformed(record) => {
                    log::warn!("[{}] Malformed record: {}", self.session_id, record.reason);
                    self.emit(SessionEvent::MalformedRecord {
                        reason: record.reason.clone(),
                    });
                    self.malformed.push(record);
                }
            }
        }

        if records.is_empty() {
            return Ok(());
        }

        futures::future::try_join_all(
            records
                .iter()
                .map(|record| materializer.write(&record.path, &record.content)),
        )
        .await
        .inspect_err(|e| log::error!("[{}] Failed to write files: {e}", self.session_id))?;

        for record in records {
            log::info!(
                "[{}] Completed {} ({} bytes)",
                self.session_id,
                record.path,
                record.content.len()
            );
            self.emit(SessionEvent::FileCompleted {
                path: record.path.clone(),
                bytes: record.content.len(),
            });
            self.completed_files.insert(record.path);
        }

        Ok(())
    }

    fn merge_manifest(&mut self, manifest: &Manifest) {
        let mut files = Vec::with_capacity(manifest.remaining_files.len());
        for file in &manifest.remaining_files {
            match normalize_path(file) {
                Ok(path) => files.push(path),
                Err(e) => log::warn!("[{}] Ignoring manifest entry: {e}", self.session_id),
            }
        }
        log::info!("[{}] Stream declared {} required file(s)", self.session_id, files.len());
        self.tracker.require(files);
    }

    /// Track the record the stream stopped inside
    ///
    /// Runs once per round; the open record is only materialized as a
    /// [`PendingPartial`] here, never per chunk.
    fn refresh_partial(&mut self) {
        if self
            .pending_partial
            .as_ref()
            .and_then(PendingPartial::normalized_path)
            .is_some_and(|path| self.completed_files.contains(&path))
        {
            self.pending_partial = None;
        }

        let resolved = self.extractor.take_seed_resolved();
        match self.extractor.dangling() {
            Some(partial) => {
                let done = partial
                    .normalized_path()
                    .is_some_and(|path| self.completed_files.contains(&path));
                self.pending_partial = (!done).then_some(partial);
            }
            None => {
                let unnamed = self
                    .pending_partial
                    .as_ref()
                    .is_some_and(|partial| partial.file_name.is_none());
                if resolved || unnamed {
                    self.pending_partial = None;
                }
            }
        }
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            // A dropped receiver only means nobody is watching
            let _ = events.send(event);
        }
    }
}

// ============================================================================
// Session Report
// ============================================================================

/// Outcome of a completed session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    /// Session identifier
    pub session_id: SessionId,
    /// Backend generation identifier
    pub generation_id: GenerationId,
    /// Paths written, sorted
    pub completed_files: Vec<String>,
    /// Required paths never produced (empty on success)
    pub outstanding_files: Vec<String>,
    /// Stream rounds, including the initial one
    pub rounds: u32,
    /// Transport retries across all rounds
    pub retries: u32,
    /// Candidates rejected as malformed
    pub malformed: usize,
    /// When the session was created
    pub started_at: DateTime<Utc>,
    /// When the report was taken
    pub finished_at: DateTime<Utc>,
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed = self.finished_at - self.started_at;
        write!(
            f,
            "Generation {}: {} file(s) written in {} round(s), {} outstanding, {} malformed ({} ms)",
            self.generation_id,
            self.completed_files.len(),
            self.rounds,
            self.outstanding_files.len(),
            self.malformed,
            elapsed.num_milliseconds()
        )
    }
}
