//! In-memory materializer backing file explorers

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;

use super::Materializer;

#[derive(Debug, Default)]
struct ExplorerState {
    files: BTreeMap<String, String>,
    writes: HashMap<String, usize>,
}

/// Keeps generated files in memory, sorted by path
///
/// Cloning shares the same view, so an explorer can read while a session writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryMaterializer {
    state: Arc<Mutex<ExplorerState>>,
}

impl MemoryMaterializer {
    /// Create an empty view
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all files
    #[must_use]
    pub fn files(&self) -> BTreeMap<String, String> {
        self.state.lock().files.clone()
    }

    /// Content of one file
    #[must_use]
    pub fn get(&self, path: &str) -> Option<String> {
        self.state.lock().files.get(path).cloned()
    }

    /// How many times `path` was written
    #[must_use]
    pub fn write_count(&self, path: &str) -> usize {
        self.state.lock().writes.get(path).copied().unwrap_or(0)
    }

    /// Total number of writes across all paths
    #[must_use]
    pub fn total_writes(&self) -> usize {
        self.state.lock().writes.values().sum()
    }
}

impl Materializer for MemoryMaterializer {
    async fn write(&self, path: &str, content: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.files.insert(path.to_string(), content.to_string());
        *state.writes.entry(path.to_string()).or_default() += 1;
        Ok(())
    }
}
