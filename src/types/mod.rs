//! Type definitions for the design-to-code stream engine
//!
//! This module contains the type definitions shared across the engine,
//! organized into logical submodules:
//!
//! - [`identifiers`] - Type-safe ID wrappers (`SessionId`, `GenerationId`)
//! - [`record`] - File records, dangling partials and path normalization
//! - [`manifest`] - Declared list of files a generation should produce
//! - [`events`] - Progress events emitted while a session runs
//! - [`options`] - Session configuration

pub mod events;
pub mod identifiers;
pub mod manifest;
pub mod options;
pub mod record;

// Re-export commonly used types
pub use events::SessionEvent;
pub use identifiers::{GenerationId, SessionId};
pub use manifest::Manifest;
pub use options::{SessionOptions, SessionOptionsBuilder};
pub use record::{
    FileRecord, MalformedRecord, PendingPartial, RecordShape, decode_json_prefix, normalize_path,
};
