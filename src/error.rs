//! Error types for the design-to-code stream engine

use thiserror::Error;

/// Main error type for the design-to-code stream engine
#[derive(Error, Debug)]
pub enum CodegenError {
    /// The stream read failed or the backend rejected the request
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success HTTP status
    #[error("HTTP error (status {status}): {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Stream ended but the generation is not complete yet
    #[error(
        "Incomplete content: {} file(s) written, {} outstanding",
        completed.len(),
        outstanding.len()
    )]
    IncompleteContent {
        /// Files written so far
        completed: Vec<String>,
        /// Files still missing (empty when no manifest is known)
        outstanding: Vec<String>,
    },

    /// A record path would resolve outside the output root
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Writing a file or creating its directory failed
    #[error("Filesystem error for '{path}': {source}")]
    Filesystem {
        /// Normalized path of the file being written
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Continuation or retry ceiling reached with work outstanding
    #[error(
        "Max attempts exceeded after {attempts} continuation round(s) and {retries} retry(ies): \
         {completed} file(s) written, {} outstanding, {malformed} malformed",
        outstanding.len()
    )]
    MaxAttemptsExceeded {
        /// Continuation rounds performed
        attempts: u32,
        /// Transport retries performed in the last round
        retries: u32,
        /// Number of files written
        completed: usize,
        /// Files still missing
        outstanding: Vec<String>,
        /// Candidates that could not be parsed across all rounds
        malformed: usize,
        /// Last transport error, if the retry ceiling was the cause
        last_error: Option<String>,
    },

    /// The caller cancelled the session
    #[error("Session aborted: {completed} file(s) written before cancellation")]
    Aborted {
        /// Number of files written before the abort
        completed: usize,
    },

    /// Unconsumed stream data grew past the configured limit
    #[error("Stream buffer exceeded maximum size of {0} bytes")]
    BufferOverflow(usize),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON encode/decode error
    #[error("JSON decode error: {0}")]
    JsonDecode(#[from] serde_json::Error),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for stream engine operations
pub type Result<T> = std::result::Result<T, CodegenError>;

impl CodegenError {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an HTTP status error
    pub fn http(status: u16, msg: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: msg.into(),
        }
    }

    /// Create an invalid path error
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Create a filesystem error
    pub fn filesystem(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Whether a fresh request for the same round may succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Http { .. })
    }
}
