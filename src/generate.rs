//! One-call generation to disk
//!
//! Runs a full session against a backend and writes every file under
//! `options.output_root`. Use [`GenerationSession`] and
//! [`ContinuationController`] directly for events, cancellation or a custom
//! materializer.

use crate::error::Result;
use crate::materializer::FsMaterializer;
use crate::session::{ContinuationController, GenerationSession, SessionReport};
use crate::transport::GenerationBackend;
use crate::types::identifiers::GenerationId;
use crate::types::manifest::Manifest;
use crate::types::options::SessionOptions;

/// Stream a generation to disk, continuing it until it is complete
///
/// # Arguments
/// * `backend` - Backend serving the generation
/// * `generation_id` - Backend job to stream
/// * `options` - Session options; files land under `output_root`
/// * `manifest` - Files the generation must produce, when known
///
/// # Errors
/// Returns `CodegenError::MaxAttemptsExceeded` if the generation is still
/// incomplete after the last continuation round, or any fatal session error
///
/// # Example
/// ```no_run
/// # use kodegen_figma_codegen::{generate, GenerationBackend, SessionOptions};
/// # async fn example(backend: impl GenerationBackend) -> Result<(), Box<dyn std::error::Error>> {
/// let options = SessionOptions::builder().output_root("out").build()?;
///
/// let report = generate(backend, "gen-1", options, None).await?;
/// log::info!("{report}");
/// # Ok(())
/// # }
/// ```
pub async fn generate<B: GenerationBackend>(
    backend: B,
    generation_id: impl Into<GenerationId>,
    options: SessionOptions,
    manifest: Option<&Manifest>,
) -> Result<SessionReport> {
    let materializer = FsMaterializer::new(options.output_root.clone());

    let mut session = GenerationSession::new(generation_id, options);
    if let Some(manifest) = manifest {
        session = session.with_manifest(manifest)?;
    }

    ContinuationController::new(backend, materializer)
        .run(&mut session)
        .await
}
