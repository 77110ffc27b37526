//! Manifest of files the backend declared it intends to produce

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CodegenError, Result};

use super::record::normalize_path;

/// Requirements object exposing the files a generation still has to produce
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Paths still to be generated, as spelled by the backend
    pub remaining_files: Vec<String>,
}

impl Manifest {
    /// Create a manifest from a list of paths
    pub fn new<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            remaining_files: files.into_iter().map(Into::into).collect(),
        }
    }

    /// Load a manifest from a JSON file (`{"remainingFiles": [...]}`)
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is not a valid manifest
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Required paths, normalized the same way record paths are
    ///
    /// # Errors
    /// Returns `CodegenError::InvalidConfig` if an entry is not a valid relative path
    pub fn normalized(&self) -> Result<BTreeSet<String>> {
        self.remaining_files
            .iter()
            .map(|file| {
                normalize_path(file).map_err(|_| {
                    CodegenError::invalid_config(format!("manifest entry '{file}' is not a valid path"))
                })
            })
            .collect()
    }
}
