//! Materializer writing files under an output root

use std::path::{Path, PathBuf};

use crate::error::{CodegenError, Result};

use super::Materializer;

/// Writes records to disk relative to a root directory
#[derive(Debug, Clone)]
pub struct FsMaterializer {
    root: PathBuf,
}

impl FsMaterializer {
    /// Create a materializer rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Output root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// On-disk location of a normalized path, with OS-native separators
    #[must_use]
    pub fn target(&self, path: &str) -> PathBuf {
        path.split('/')
            .fold(self.root.clone(), |target, segment| target.join(segment))
    }
}

impl Materializer for FsMaterializer {
    async fn write(&self, path: &str, content: &str) -> Result<()> {
        let target = self.target(path);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CodegenError::filesystem(path, e))?;
        }

        tokio::fs::write(&target, content)
            .await
            .map_err(|e| CodegenError::filesystem(path, e))?;

        log::info!("File written successfully: {}", target.display());
        Ok(())
    }
}
