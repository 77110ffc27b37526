//! Extracted file records and the dangling fragments left between rounds

use serde::{Deserialize, Serialize};

use crate::error::{CodegenError, Result};

/// A completed `(path, content)` pair extracted from the stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Normalized relative path (`/`-separated, no leading slash)
    pub path: String,
    /// Fully decoded file content
    pub content: String,
}

impl FileRecord {
    /// Build a record from a raw producer path, normalizing it
    ///
    /// # Errors
    /// Returns `CodegenError::InvalidPath` if the path is empty or climbs out of the root
    pub fn new(raw_path: &str, content: impl Into<String>) -> Result<Self> {
        Ok(Self {
            path: normalize_path(raw_path)?,
            content: content.into(),
        })
    }
}

/// Normalize a producer path into the key used for dedup and on disk
///
/// Backslashes become `/`, leading slashes and `.`/empty segments are dropped.
/// `src//a.ts`, `/src/a.ts`, `./src/a.ts` and `src\a.ts` all map to `src/a.ts`.
///
/// # Errors
/// Returns `CodegenError::InvalidPath` for empty paths and any `..` segment
pub fn normalize_path(raw: &str) -> Result<String> {
    let unified = raw.trim().replace('\\', "/");
    let mut segments = Vec::new();

    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(CodegenError::invalid_path(raw)),
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return Err(CodegenError::invalid_path(raw));
    }

    Ok(segments.join("/"))
}

/// Wire shape a fragment or record was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordShape {
    /// `{"fileName": ..., "fileContent": ...}` objects
    Json,
    /// `<FileName=path>content</FileName>` blocks
    Tagged,
}

/// Content of a record whose closing delimiter has not been seen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingPartial {
    /// File name as emitted by the producer, when it was seen in full
    pub file_name: Option<String>,
    /// Raw wire text of the cut content (still JSON-escaped for the JSON shape)
    pub raw_content: String,
    /// Verbatim wire text of the whole open record, from its opening delimiter
    pub raw_record: String,
    /// Shape the fragment came from
    pub shape: RecordShape,
}

impl PendingPartial {
    /// Decoded text of the dangling content
    ///
    /// A trailing escape sequence that was cut mid-way is dropped.
    #[must_use]
    pub fn decoded_content(&self) -> String {
        match self.shape {
            RecordShape::Json => decode_json_prefix(&self.raw_content),
            RecordShape::Tagged => self.raw_content.clone(),
        }
    }

    /// Normalized path of the dangling file, if its name is known and valid
    #[must_use]
    pub fn normalized_path(&self) -> Option<String> {
        self.file_name
            .as_deref()
            .and_then(|name| normalize_path(name).ok())
    }
}

/// A candidate record that could not be parsed under the configured schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MalformedRecord {
    /// Why the candidate was rejected
    pub reason: String,
    /// File name, if one could be read from the candidate
    pub file_name: Option<String>,
    /// Raw candidate text
    pub raw: String,
}

/// Decode the body of a JSON string literal that may be cut short
///
/// Handles the standard escapes and `\uXXXX` including surrogate pairs.
/// Decoding stops at a truncated escape instead of failing.
#[must_use]
pub fn decode_json_prefix(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        let Some(escape) = chars.next() else {
            break;
        };

        match escape {
            '"' => out.push('"'),
            '\\' => out.push('\\'),
            '/' => out.push('/'),
            'b' => out.push('\u{0008}'),
            'f' => out.push('\u{000C}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'u' => {
                let Some(high) = read_hex4(&mut chars) else {
                    break;
                };
                if (0xD800..0xDC00).contains(&high) {
                    // Surrogate pair: expect `\uDC00..\uDFFF` next
                    if chars.next() != Some('\\') || chars.next() != Some('u') {
                        break;
                    }
                    let Some(low) = read_hex4(&mut chars) else {
                        break;
                    };
                    let code = 0x10000 + ((high - 0xD800) << 10) + (low.wrapping_sub(0xDC00) & 0x3FF);
                    out.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
                } else {
                    out.push(char::from_u32(high).unwrap_or('\u{FFFD}'));
                }
            }
            other => out.push(other),
        }
    }

    out
}

fn read_hex4(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<u32> {
    let mut value = 0u32;
    for _ in 0..4 {
        let digit = chars.next()?.to_digit(16)?;
        value = value * 16 + digit;
    }
    Some(value)
}
