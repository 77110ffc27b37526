//! Wire shapes and shape detection

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CodegenError;
use crate::types::record::RecordShape;

/// Opening marker of a tag-delimited record
pub const TAG_OPEN: &str = "<FileName=";

/// Closing marker of a tag-delimited record
pub const TAG_CLOSE: &str = "</FileName>";

const FENCE: &str = "```";

/// Wire format the producer is expected to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// Detect the shape from the first structural marker
    #[default]
    Auto,
    /// JSON array of objects (optionally fenced)
    JsonArray,
    /// `<FileName=path>content</FileName>` blocks
    Tagged,
}

impl WireFormat {
    /// Shape fixed by this format, if it is not auto-detected
    #[must_use]
    pub const fn forced_shape(self) -> Option<RecordShape> {
        match self {
            Self::Auto => None,
            Self::JsonArray => Some(RecordShape::Json),
            Self::Tagged => Some(RecordShape::Tagged),
        }
    }
}

impl FromStr for WireFormat {
    type Err = CodegenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "json" | "json_array" | "json-array" => Ok(Self::JsonArray),
            "tagged" | "tag" | "tags" => Ok(Self::Tagged),
            other => Err(CodegenError::invalid_config(format!(
                "unknown wire format '{other}' (expected auto, json or tagged)"
            ))),
        }
    }
}

/// Object keys that carry a record's file name and content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireSchema {
    /// Key holding the file path
    pub name_key: String,
    /// Key holding the file content
    pub content_key: String,
}

impl WireSchema {
    /// Create a schema with custom keys
    pub fn new(name_key: impl Into<String>, content_key: impl Into<String>) -> Self {
        Self {
            name_key: name_key.into(),
            content_key: content_key.into(),
        }
    }

    /// Schema used by older backends (`aFileName` / `fileContent`)
    #[must_use]
    pub fn legacy() -> Self {
        Self::new("aFileName", "fileContent")
    }
}

impl Default for WireSchema {
    fn default() -> Self {
        Self::new("fileName", "fileContent")
    }
}

/// Detect the record shape from the first structural marker in `text`
///
/// Returns `None` while no marker has been seen yet.
#[must_use]
pub fn detect_shape(text: &str) -> Option<RecordShape> {
    let json_at = text.find(['[', '{']);
    let tag_at = text.find(TAG_OPEN);

    match (json_at, tag_at) {
        (Some(j), Some(t)) if t < j => Some(RecordShape::Tagged),
        (Some(_), _) => Some(RecordShape::Json),
        (None, Some(_)) => Some(RecordShape::Tagged),
        (None, None) => None,
    }
}

/// Whether a continuation stream restarts with a fresh payload
///
/// `shape` is the shape of the record being resumed. A lead counts as fresh
/// only when it opens with something that cannot be the raw continuation of
/// that record: `<FileName=` for tagged records, `{"` or `[{"` (or
/// `<FileName=`) for JSON records, optionally behind a fence line such as
/// `` ```json ``. Returns `Some(false)` when it continues raw text and `None`
/// while there is not enough text to tell.
#[must_use]
pub fn starts_fresh_payload(lead: &str, shape: RecordShape) -> Option<bool> {
    let trimmed = lead.trim_start();
    if trimmed.is_empty() || FENCE.starts_with(trimmed) {
        return None;
    }

    let body = match trimmed.strip_prefix(FENCE) {
        Some(rest) => {
            let info_end = rest.find(|c: char| {
                !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.'))
            })?;
            let after = &rest[info_end..];
            if after == "\r" {
                return None;
            }
            if !(after.starts_with('\n') || after.starts_with("\r\n")) {
                // Backticks inside the cut content, not a fence line
                return Some(false);
            }
            after.trim_start()
        }
        None => trimmed,
    };
    if body.is_empty() {
        return None;
    }

    match shape {
        RecordShape::Tagged => opens_with(body, TAG_OPEN),
        RecordShape::Json if body.starts_with('<') => opens_with(body, TAG_OPEN),
        RecordShape::Json => opens_json_payload(body),
    }
}

fn opens_with(text: &str, marker: &str) -> Option<bool> {
    if text.starts_with(marker) {
        Some(true)
    } else if marker.starts_with(text) {
        None
    } else {
        Some(false)
    }
}

/// `{"` or `[{"`, whitespace allowed in between
///
/// A raw `"` cannot appear inside a cut JSON string, so these never continue one.
fn opens_json_payload(text: &str) -> Option<bool> {
    let mut chars = text.chars().filter(|c| !c.is_whitespace());
    let expected: &[char] = match chars.next()? {
        '[' => &['{', '"'],
        '{' => &['"'],
        _ => return Some(false),
    };
    for &want in expected {
        if chars.next()? != want {
            return Some(false);
        }
    }
    Some(true)
}

/// Length of the longest suffix of `text` that is a proper prefix of `marker`
#[must_use]
pub fn partial_marker_suffix(text: &str, marker: &str) -> usize {
    let max = marker.len().saturating_sub(1).min(text.len());
    (1..=max)
        .rev()
        .find(|&n| text.is_char_boundary(text.len() - n) && marker.starts_with(&text[text.len() - n..]))
        .unwrap_or(0)
}
