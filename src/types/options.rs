//! Session options and configuration
//!
//! This module contains the configuration for a generation session,
//! including a builder pattern for easy configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{CodegenError, Result};
use crate::stream::format::{WireFormat, WireSchema};

/// Default number of continuation rounds after the initial request
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default number of transport retries within one round
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default delay between transport retries
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Default maximum size of unconsumed stream data (8MB)
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 8 * 1024 * 1024;

// ============================================================================
// Session Options
// ============================================================================

/// Main options for a generation session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Directory generated files are written under
    pub output_root: PathBuf,
    /// Expected wire shape of the stream
    pub wire_format: WireFormat,
    /// Object keys carrying the file name and content
    pub schema: WireSchema,
    /// Maximum continuation rounds after the initial request
    pub max_attempts: u32,
    /// Maximum transport retries within a single round
    pub max_retries: u32,
    /// Delay between transport retries
    pub retry_delay: Duration,
    /// Treat a stream as stalled after this long without data
    pub idle_timeout: Option<Duration>,
    /// Maximum size of unconsumed stream data
    pub max_buffer_size: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("."),
            wire_format: WireFormat::Auto,
            schema: WireSchema::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            idle_timeout: None,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
        }
    }
}

impl SessionOptions {
    /// Create a new builder for `SessionOptions`
    #[must_use]
    pub fn builder() -> SessionOptionsBuilder {
        SessionOptionsBuilder::default()
    }
}

// ============================================================================
// Builder for SessionOptions
// ============================================================================

/// Builder for `SessionOptions`
#[derive(Debug, Default)]
pub struct SessionOptionsBuilder {
    options: SessionOptions,
}

impl SessionOptionsBuilder {
    /// Set the output root directory
    #[must_use]
    pub fn output_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.output_root = path.into();
        self
    }

    /// Set the expected wire format
    #[must_use]
    pub const fn wire_format(mut self, format: WireFormat) -> Self {
        self.options.wire_format = format;
        self
    }

    /// Set the object keys for file name and content
    #[must_use]
    pub fn schema(mut self, schema: WireSchema) -> Self {
        self.options.schema = schema;
        self
    }

    /// Set the continuation round ceiling
    #[must_use]
    pub const fn max_attempts(mut self, attempts: u32) -> Self {
        self.options.max_attempts = attempts;
        self
    }

    /// Set the per-round transport retry ceiling
    #[must_use]
    pub const fn max_retries(mut self, retries: u32) -> Self {
        self.options.max_retries = retries;
        self
    }

    /// Set the delay between transport retries
    #[must_use]
    pub const fn retry_delay(mut self, delay: Duration) -> Self {
        self.options.retry_delay = delay;
        self
    }

    /// Set the idle-read timeout
    #[must_use]
    pub const fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.options.idle_timeout = Some(timeout);
        self
    }

    /// Set the maximum size of unconsumed stream data
    #[must_use]
    pub const fn max_buffer_size(mut self, size: usize) -> Self {
        self.options.max_buffer_size = size;
        self
    }

    /// Build the options
    ///
    /// # Errors
    /// Returns `CodegenError::InvalidConfig` for an empty or ambiguous schema,
    /// a zero buffer limit, or a zero idle timeout
    pub fn build(self) -> Result<SessionOptions> {
        let options = self.options;

        if options.schema.name_key.is_empty() || options.schema.content_key.is_empty() {
            return Err(CodegenError::invalid_config("schema keys must not be empty"));
        }
        if options.schema.name_key == options.schema.content_key {
            return Err(CodegenError::invalid_config(
                "schema name and content keys must differ",
            ));
        }
        if options.max_buffer_size == 0 {
            return Err(CodegenError::invalid_config("max_buffer_size must be positive"));
        }
        if options.idle_timeout.is_some_and(|t| t.is_zero()) {
            return Err(CodegenError::invalid_config("idle_timeout must be positive"));
        }

        Ok(options)
    }
}
