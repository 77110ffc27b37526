//! Completion tracking
//!
//! Decides, at the end of each stream round, whether the generation is done.
//! With a manifest the answer is exact. Without one the tracker falls back to
//! requiring at least one file, a natural end of stream and no record left
//! open.

use std::collections::BTreeSet;

use crate::error::{CodegenError, Result};

/// Tracker lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerState {
    /// More content may still arrive
    #[default]
    InProgress,
    /// The generation has been judged complete
    Complete,
}

/// How a stream round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The backend closed the stream
    Natural,
    /// No data arrived within the idle timeout
    Stalled,
}

/// Why a round did not complete the generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncompleteReason {
    /// The manifest lists files that were not produced
    MissingFiles,
    /// No manifest, and no file was produced
    NoFilesProduced,
    /// The stream stopped inside a record
    DanglingPartial,
    /// The stream stopped sending data
    StreamStalled,
}

/// Verdict of one evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// All expected files are materialized
    Complete,
    /// Another round is needed
    Incomplete {
        /// Files still missing (empty without a manifest)
        outstanding: Vec<String>,
        /// Why the round fell short
        reason: IncompleteReason,
    },
}

impl Completion {
    /// Whether the verdict is `Complete`
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Map the verdict to a result
    ///
    /// # Errors
    /// Returns `CodegenError::IncompleteContent` for an incomplete verdict
    pub fn into_result(self, completed: &BTreeSet<String>) -> Result<()> {
        match self {
            Self::Complete => Ok(()),
            Self::Incomplete { outstanding, .. } => Err(CodegenError::IncompleteContent {
                completed: completed.iter().cloned().collect(),
                outstanding,
            }),
        }
    }
}

/// Tracks required files and judges completeness
#[derive(Debug, Clone, Default)]
pub struct CompletionTracker {
    required: Option<BTreeSet<String>>,
    state: TrackerState,
}

impl CompletionTracker {
    /// Create a tracker with no manifest
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add required files; repeated manifests merge by union
    pub fn require(&mut self, files: impl IntoIterator<Item = String>) {
        self.required.get_or_insert_with(BTreeSet::new).extend(files);
    }

    /// Required files, when a manifest is known
    #[must_use]
    pub const fn required(&self) -> Option<&BTreeSet<String>> {
        self.required.as_ref()
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> TrackerState {
        self.state
    }

    /// Required files not yet in `completed`
    #[must_use]
    pub fn outstanding(&self, completed: &BTreeSet<String>) -> Vec<String> {
        self.required
            .as_ref()
            .map(|required| required.difference(completed).cloned().collect())
            .unwrap_or_default()
    }

    /// Judge completeness at the end of a round
    pub fn evaluate(
        &mut self,
        completed: &BTreeSet<String>,
        end: StreamEnd,
        dangling: bool,
    ) -> Completion {
        let verdict = match &self.required {
            Some(_) => {
                let outstanding = self.outstanding(completed);
                if outstanding.is_empty() {
                    Completion::Complete
                } else {
                    Completion::Incomplete {
                        outstanding,
                        reason: IncompleteReason::MissingFiles,
                    }
                }
            }
            None => {
                let reason = if completed.is_empty() {
                    Some(IncompleteReason::NoFilesProduced)
                } else if end == StreamEnd::Stalled {
                    Some(IncompleteReason::StreamStalled)
                } else if dangling {
                    Some(IncompleteReason::DanglingPartial)
                } else {
                    None
                };
                reason.map_or(Completion::Complete, |reason| Completion::Incomplete {
                    outstanding: Vec::new(),
                    reason,
                })
            }
        };

        if verdict.is_complete() {
            self.state = TrackerState::Complete;
        }
        verdict
    }
}

