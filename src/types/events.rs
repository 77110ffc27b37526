//! Progress notifications emitted while a session runs

use serde::Serialize;

/// Progress event for explorers and progress displays
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A new stream round began (0 is the initial request)
    RoundStarted {
        /// Continuation round number
        round: u32,
    },
    /// A file was materialized
    FileCompleted {
        /// Normalized path
        path: String,
        /// Content length in bytes
        bytes: usize,
    },
    /// A record repeated an already completed path and was dropped
    FileSkipped {
        /// Normalized path
        path: String,
    },
    /// The stream stopped inside a record
    PartialCaptured {
        /// File name of the dangling record, if seen
        file_name: Option<String>,
        /// Bytes of raw content captured
        bytes: usize,
    },
    /// A candidate record was rejected
    MalformedRecord {
        /// Rejection reason
        reason: String,
    },
    /// A transport failure is being retried
    TransportRetry {
        /// Retry number within the round
        retry: u32,
        /// Error that triggered the retry
        error: String,
    },
    /// A stream round finished
    RoundEnded {
        /// Continuation round number
        round: u32,
        /// Files completed so far in the session
        completed: usize,
    },
}
