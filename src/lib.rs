//! # Figma design-to-code stream engine
//!
//! Consumes the streamed response of a design-to-code generation backend,
//! extracts `(file name, content)` records as soon as they complete, writes
//! them to disk exactly once and, when the backend truncates its output,
//! asks it to continue from the cut until every expected file exists.
//!
//! ## Quick Start
//!
//! The simplest way to use this crate is with the [`generate()`] function:
//!
//! ```no_run
//! # #[cfg(feature = "http")]
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use kodegen_figma_codegen::{generate, HttpBackend, SessionOptions};
//!
//! let backend = HttpBackend::new("http://localhost:8080/gemini")?;
//! let options = SessionOptions::builder()
//!     .output_root("generated")
//!     .build()?;
//!
//! let report = generate(backend, "8d1c5e2a", options, None).await?;
//! log::info!("{report}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Sessions, Events and Cancellation
//!
//! For progress events, cancellation or an in-memory file view, drive a
//! [`GenerationSession`] with a [`ContinuationController`]:
//!
//! ```no_run
//! # #[cfg(feature = "testing")]
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! # use kodegen_figma_codegen::*;
//! let backend = ScriptedBackend::new([ScriptedRound::chunks([
//!     r#"[{"fileName":"src/a.ts","#,
//!     r#""fileContent":"export const a = 1;"}]"#,
//! ])]);
//! let explorer = MemoryMaterializer::new();
//! let (events_tx, mut events_rx) = tokio::sync::mpsc::unbounded_channel();
//!
//! let mut session = GenerationSession::new("gen-1", SessionOptions::default())
//!     .with_manifest(&Manifest::new(["src/a.ts"]))?
//!     .with_events(events_tx);
//!
//! let mut controller = ContinuationController::new(backend, explorer.clone());
//! let report = controller.run(&mut session).await?;
//!
//! while let Ok(event) = events_rx.try_recv() {
//!     log::debug!("{event:?}");
//! }
//! assert_eq!(explorer.get("src/a.ts").as_deref(), Some("export const a = 1;"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Wire Formats
//!
//! - A JSON array of `{"fileName": ..., "fileContent": ...}` objects, optionally
//!   inside a markdown fence. The legacy `aFileName` key is selected with
//!   [`WireSchema::legacy()`].
//! - Tag-delimited blocks: `<FileName=src/a.ts>...</FileName>`.
//!
//! The shape is detected from the first structural marker unless forced with
//! [`WireFormat`].
//!
//! ## Architecture
//!
//! - [`stream`]: Chunk decoding and incremental record extraction
//! - [`materializer`]: Writing completed files to disk or memory
//! - [`session`]: Session state, completion tracking and continuation
//! - [`transport`]: Backend and byte-stream abstractions
//! - [`types`]: Records, manifests, identifiers, options and events
//! - [`error`]: Error types and handling
//!
//! ## Feature Flags
//!
//! - `http` - Enables the HTTP backend (requires `reqwest`) and the
//!   `kodegen-figma-codegen` command-line tool
//! - `testing` - Exposes the scripted in-memory backend used by the test suite
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, CodegenError>`](Result):
//!
//! ```no_run
//! # use kodegen_figma_codegen::*;
//! # async fn example(backend: impl GenerationBackend) {
//! match generate(backend, "gen-1", SessionOptions::default(), None).await {
//!     Ok(report) => log::info!("{report}"),
//!     Err(CodegenError::MaxAttemptsExceeded { completed, outstanding, .. }) => {
//!         log::error!("{completed} files written, {} outstanding", outstanding.len());
//!     }
//!     Err(e) => log::error!("Error: {e}"),
//! }
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod generate;
pub mod materializer;
pub mod session;
pub mod stream;
pub mod transport;
pub mod types;

// Re-export commonly used types for external API
pub use error::{CodegenError, Result};
pub use generate::generate;
pub use materializer::{FsMaterializer, Materializer, MemoryMaterializer};
pub use session::{
    Completion, CompletionTracker, ContinuationController, ContinuationRequest, ControllerState,
    GenerationSession, IncompleteReason, SessionReport, StreamEnd, TrackerState,
};
pub use stream::{ChunkDecoder, Extracted, RecordExtractor, WireFormat, WireSchema};
#[cfg(feature = "http")]
pub use transport::{HttpBackend, HttpStream};
pub use transport::{ChunkSource, GenerationBackend, ReadChunk};
#[cfg(any(test, feature = "testing"))]
pub use transport::{BackendCall, ScriptedBackend, ScriptedChunk, ScriptedRound, ScriptedStream};

// Re-export type submodules for flat public API
pub use types::events::SessionEvent;
pub use types::identifiers::{GenerationId, SessionId};
pub use types::manifest::Manifest;
pub use types::options::{SessionOptions, SessionOptionsBuilder};
pub use types::record::{FileRecord, MalformedRecord, PendingPartial, RecordShape};

/// Version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
