//! Scanning of `<FileName=path>content</FileName>` blocks

use super::format::{TAG_CLOSE, TAG_OPEN, partial_marker_suffix};

/// An opening tag whose closing tag has not been seen yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenTag {
    /// Offset of `<FileName=`
    pub tag_start: usize,
    /// Path text between `=` and `>`, quotes stripped
    pub name: String,
    /// Offset of the first content byte
    pub content_start: usize,
}

/// A complete tagged block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedBlock {
    /// Path text from the opening tag
    pub name: String,
    /// Verbatim content between the tags
    pub content: String,
    /// Offset just past `</FileName>`
    pub end: usize,
}

/// What the scanner is waiting for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagProgress {
    /// No opening tag in the buffer; everything before `keep_from` is noise
    Idle {
        /// First offset that may still start a tag
        keep_from: usize,
    },
    /// `<FileName=` seen at this offset, `>` not yet
    OpeningTag(usize),
    /// Inside a block
    Open(OpenTag),
}

/// Incremental scanner for tag-delimited records
#[derive(Debug, Default, Clone)]
pub struct TagScanner {
    open: Option<OpenTag>,
    search_from: usize,
}

impl TagScanner {
    /// Create a new scanner
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the next complete block, if the buffer holds one
    pub fn next_block(&mut self, buffer: &str) -> Option<TaggedBlock> {
        if self.open.is_none() {
            let tag_start = buffer.find(TAG_OPEN)?;
            let name_start = tag_start + TAG_OPEN.len();
            let gt = buffer[name_start..].find('>')? + name_start;
            let name = buffer[name_start..gt]
                .trim()
                .trim_matches(|c| c == '"' || c == '\'')
                .to_string();

            self.open = Some(OpenTag {
                tag_start,
                name,
                content_start: gt + 1,
            });
            self.search_from = gt + 1;
        }

        let open = self.open.as_ref()?;
        match buffer[self.search_from..].find(TAG_CLOSE) {
            Some(rel) => {
                let close = self.search_from + rel;
                let block = TaggedBlock {
                    name: open.name.clone(),
                    content: buffer[open.content_start..close].to_string(),
                    end: close + TAG_CLOSE.len(),
                };
                self.open = None;
                self.search_from = 0;
                Some(block)
            }
            None => {
                // Only the tail could still grow into a closing tag
                let mut from = buffer.len().saturating_sub(TAG_CLOSE.len() - 1);
                while !buffer.is_char_boundary(from) {
                    from -= 1;
                }
                self.search_from = from.max(open.content_start);
                None
            }
        }
    }

    /// Describe the unconsumed state of `buffer` after the last `next_block`
    #[must_use]
    pub fn progress(&self, buffer: &str) -> TagProgress {
        if let Some(open) = &self.open {
            return TagProgress::Open(open.clone());
        }
        match buffer.find(TAG_OPEN) {
            Some(at) => TagProgress::OpeningTag(at),
            None => TagProgress::Idle {
                keep_from: buffer.len() - partial_marker_suffix(buffer, TAG_OPEN),
            },
        }
    }

    /// Adjust offsets after `n` leading bytes were drained from the buffer
    pub fn shift(&mut self, n: usize) {
        self.search_from = self.search_from.saturating_sub(n);
        if let Some(open) = &mut self.open {
            open.tag_start = open.tag_start.saturating_sub(n);
            open.content_start = open.content_start.saturating_sub(n);
        }
    }

    /// Forget all state
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
