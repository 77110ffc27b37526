//! Quote, escape and depth aware scanning of JSON objects in a growing buffer

use std::ops::Range;

/// Incremental scanner for top-level `{...}` objects
///
/// Tracks brace/bracket depth, string state and backslash-escape state byte by
/// byte and remembers where it stopped, so appended data is never rescanned.
/// Text outside objects (array brackets, commas, fences, prose) is skipped.
#[derive(Debug, Default, Clone)]
pub struct JsonObjectScanner {
    pos: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
    start: Option<usize>,
}

impl JsonObjectScanner {
    /// Create a new scanner
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan forward and return the byte range of the next complete object
    pub fn next_object(&mut self, buffer: &str) -> Option<Range<usize>> {
        let bytes = buffer.as_bytes();

        while self.pos < bytes.len() {
            let i = self.pos;
            let b = bytes[i];
            self.pos += 1;

            if self.depth == 0 {
                if b == b'{' {
                    self.start = Some(i);
                    self.depth = 1;
                }
                continue;
            }

            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if b == b'\\' {
                    self.escaped = true;
                } else if b == b'"' {
                    self.in_string = false;
                }
                continue;
            }

            match b {
                b'"' => self.in_string = true,
                b'{' | b'[' => self.depth += 1,
                b'}' | b']' => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        let start = self.start.take().unwrap_or(i);
                        return Some(start..i + 1);
                    }
                }
                _ => {}
            }
        }

        None
    }

    /// Start offset of the object currently open, if any
    #[must_use]
    pub const fn open_start(&self) -> Option<usize> {
        self.start
    }

    /// Offset up to which the buffer has been scanned
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Adjust offsets after `n` leading bytes were drained from the buffer
    pub fn shift(&mut self, n: usize) {
        self.pos = self.pos.saturating_sub(n);
        self.start = self.start.map(|s| s.saturating_sub(n));
    }

    /// Forget all state
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A string-valued field found at the top level of a (possibly cut) object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialField {
    /// Decoded key
    pub key: String,
    /// Raw, still escaped, string body
    pub raw_value: String,
    /// Whether the closing quote was seen
    pub closed: bool,
}

#[derive(Debug)]
enum FieldState {
    Key,
    Colon(String),
    Value(String),
    Other,
}

/// Collect top-level string fields of an object that may be truncated
///
/// `object` starts at its opening `{`. Nested values are skipped; scanning
/// stops at the first unterminated string, which is returned with `closed`
/// set to false.
#[must_use]
pub fn partial_string_fields(object: &str) -> Vec<PartialField> {
    let bytes = object.as_bytes();
    let mut fields = Vec::new();
    let mut depth = 0usize;
    let mut state = FieldState::Key;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];

        if b == b'"' {
            let (end, closed) = string_end(bytes, i + 1);
            let body = &object[i + 1..end];

            if depth == 1 {
                state = match std::mem::replace(&mut state, FieldState::Other) {
                    FieldState::Key if closed => {
                        FieldState::Colon(crate::types::record::decode_json_prefix(body))
                    }
                    FieldState::Value(key) => {
                        fields.push(PartialField {
                            key,
                            raw_value: body.to_string(),
                            closed,
                        });
                        FieldState::Other
                    }
                    _ => FieldState::Other,
                };
            }

            if !closed {
                break;
            }
            i = end + 1;
            continue;
        }

        match b {
            b'{' | b'[' => {
                depth += 1;
                if depth == 2 && matches!(state, FieldState::Value(_)) {
                    state = FieldState::Other;
                }
            }
            b'}' | b']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    break;
                }
            }
            b':' if depth == 1 => {
                if let FieldState::Colon(key) = std::mem::replace(&mut state, FieldState::Other) {
                    state = FieldState::Value(key);
                }
            }
            b',' if depth == 1 => state = FieldState::Key,
            b if b.is_ascii_whitespace() => {}
            _ if depth == 1 => state = FieldState::Other,
            _ => {}
        }

        i += 1;
    }

    fields
}

/// Index of the closing quote of a string body starting at `from`
///
/// Returns `(bytes.len(), false)` when the string is unterminated.
fn string_end(bytes: &[u8], from: usize) -> (usize, bool) {
    let mut escaped = false;
    for (offset, &b) in bytes[from.min(bytes.len())..].iter().enumerate() {
        if escaped {
            escaped = false;
        } else if b == b'\\' {
            escaped = true;
        } else if b == b'"' {
            return (from + offset, true);
        }
    }
    (bytes.len(), false)
}
