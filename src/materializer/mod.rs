//! File materialization
//!
//! A [`Materializer`] receives each completed record exactly once. The session
//! decides membership in its completed set before calling it, so
//! implementations only write.
//!
//! - [`FsMaterializer`] writes under an output root on disk
//! - [`MemoryMaterializer`] keeps an in-memory explorer view

mod fs;
mod memory;

pub use fs::FsMaterializer;
pub use memory::MemoryMaterializer;

use crate::error::Result;

/// Destination for completed files
pub trait Materializer: Send + Sync {
    /// Write `content` for the normalized `path`
    ///
    /// # Errors
    /// Returns `CodegenError::Filesystem` if the write fails
    fn write(&self, path: &str, content: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}
