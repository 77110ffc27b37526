//! Stream decoding and record extraction
//!
//! - [`decoder`] - UTF-8 decoding that survives split multi-byte sequences
//! - [`format`] - Wire formats, key schemas and shape detection
//! - [`scanner`] - Quote/escape/depth aware JSON object scanning
//! - [`tags`] - Tag-delimited block scanning
//! - [`extractor`] - The record extractor combining all of the above

pub mod decoder;
pub mod extractor;
pub mod format;
pub mod scanner;
pub mod tags;

pub use decoder::ChunkDecoder;
pub use extractor::{Extracted, RecordExtractor};
pub use format::{WireFormat, WireSchema};
