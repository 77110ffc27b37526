//! Record extraction from the accumulated stream buffer
//!
//! The extractor owns the not-yet-consumed text of the current round. Every
//! [`push`](RecordExtractor::push) appends decoded text, emits each record
//! whose closing delimiter has arrived and trims the buffer past it, leaving
//! only the unconsumed remainder (at most one open record plus noise).

use serde_json::{Map, Value};

use crate::error::{CodegenError, Result};
use crate::types::manifest::Manifest;
use crate::types::record::{FileRecord, MalformedRecord, PendingPartial, RecordShape};

use super::format::{TAG_CLOSE, WireFormat, WireSchema, detect_shape, partial_marker_suffix, starts_fresh_payload};
use super::scanner::{JsonObjectScanner, partial_string_fields};
use super::tags::{TagProgress, TagScanner};

/// Key of an in-stream requirements object
const REQUIREMENTS_KEY: &str = "requirements";

/// Key listing the files a requirements object declares
const REMAINING_FILES_KEY: &str = "remainingFiles";

/// One unit produced by the extractor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    /// A complete record
    Record(FileRecord),
    /// A requirements object declaring the files to expect
    Manifest(Manifest),
    /// A candidate that cannot be parsed under the configured schema
    Malformed(MalformedRecord),
}

/// Incremental extractor for every supported wire shape
#[derive(Debug)]
pub struct RecordExtractor {
    format: WireFormat,
    schema: WireSchema,
    shape: Option<RecordShape>,
    buffer: String,
    json: JsonObjectScanner,
    tags: TagScanner,
    max_buffer_size: usize,
    /// Partial to resume from, until the new stream shows whether it continues it
    resume_seed: Option<PendingPartial>,
    /// Text received while deciding between resumption and a fresh payload
    lead: String,
    /// Partial the current round resumed, until its record closes
    seeded: Option<PendingPartial>,
    seed_resolved: bool,
    /// Resumed partial whose completed record failed to parse
    failed_seed: Option<PendingPartial>,
}

impl RecordExtractor {
    /// Create an extractor for the given format and schema
    #[must_use]
    pub fn new(format: WireFormat, schema: WireSchema, max_buffer_size: usize) -> Self {
        Self {
            format,
            schema,
            shape: format.forced_shape(),
            buffer: String::new(),
            json: JsonObjectScanner::new(),
            tags: TagScanner::new(),
            max_buffer_size,
            resume_seed: None,
            lead: String::new(),
            seeded: None,
            seed_resolved: false,
            failed_seed: None,
        }
    }

    /// Append decoded text and return everything that completed
    ///
    /// # Errors
    /// Returns `CodegenError::BufferOverflow` when unconsumed text exceeds the limit
    pub fn push(&mut self, text: &str) -> Result<Vec<Extracted>> {
        if let Some(shape) = self.resume_seed.as_ref().map(|seed| seed.shape) {
            self.lead.push_str(text);
            match starts_fresh_payload(&self.lead, shape) {
                None => return self.check_size(Vec::new(), self.lead.len()),
                Some(fresh) => self.apply_resume(fresh),
            }
        } else {
            self.buffer.push_str(text);
        }

        let extracted = self.extract();
        self.check_size(extracted, self.buffer.len())
    }

    /// Flush at end of stream
    ///
    /// A record left open is reported as malformed; it stays available through
    /// [`dangling`](Self::dangling) for a continuation round.
    pub fn finish(&mut self) -> Vec<Extracted> {
        let mut extracted = Vec::new();

        if self.resume_seed.is_some() {
            if self.lead.trim().is_empty() {
                // Nothing arrived; the cut record is still the same
                return extracted;
            }
            self.apply_resume(false);
            extracted = self.extract();
        }

        match self.shape {
            None if !self.buffer.trim().is_empty() => {
                extracted.push(Extracted::Malformed(MalformedRecord {
                    reason: "stream contained no recognizable records".to_string(),
                    file_name: None,
                    raw: self.buffer.clone(),
                }));
            }
            Some(_) => {
                if let Some(partial) = self.open_record() {
                    extracted.push(Extracted::Malformed(MalformedRecord {
                        reason: "stream ended inside an unterminated record".to_string(),
                        file_name: partial.file_name.clone(),
                        raw: partial.raw_record,
                    }));
                }
            }
            None => {}
        }

        extracted
    }

    /// The record the stream stopped inside, if any
    ///
    /// Builds the partial from the buffer on every call, so it is meant for
    /// the end of a round rather than for every chunk. A resumed record that
    /// closed but failed to parse is still dangling when nothing else is open.
    #[must_use]
    pub fn dangling(&self) -> Option<PendingPartial> {
        if let Some(seed) = &self.resume_seed {
            // Undecided resumption: the previous cut is still the open record
            return Some(seed.clone());
        }

        self.open_record().or_else(|| self.failed_seed.clone())
    }

    fn open_record(&self) -> Option<PendingPartial> {
        match self.shape? {
            RecordShape::Json => {
                let start = self.json.open_start()?;
                let raw_record = &self.buffer[start..];
                let fields = partial_string_fields(raw_record);

                let file_name = fields
                    .iter()
                    .find(|f| f.key == self.schema.name_key && f.closed)
                    .map(|f| crate::types::record::decode_json_prefix(&f.raw_value));
                let raw_content = fields
                    .iter()
                    .find(|f| f.key == self.schema.content_key)
                    .map(|f| f.raw_value.clone())
                    .unwrap_or_default();

                Some(PendingPartial {
                    file_name,
                    raw_content,
                    raw_record: raw_record.to_string(),
                    shape: RecordShape::Json,
                })
            }
            RecordShape::Tagged => match self.tags.progress(&self.buffer) {
                TagProgress::Idle { .. } => None,
                TagProgress::OpeningTag(at) => Some(PendingPartial {
                    file_name: None,
                    raw_content: String::new(),
                    raw_record: self.buffer[at..].to_string(),
                    shape: RecordShape::Tagged,
                }),
                TagProgress::Open(open) => {
                    let content = &self.buffer[open.content_start..];
                    let keep = content.len() - partial_marker_suffix(content, TAG_CLOSE);
                    Some(PendingPartial {
                        file_name: Some(open.name),
                        raw_content: content[..keep].to_string(),
                        raw_record: self.buffer[open.tag_start..].to_string(),
                        shape: RecordShape::Tagged,
                    })
                }
            },
        }
    }

    /// Start a new round that may continue `partial` where it was cut
    pub fn resume(&mut self, partial: PendingPartial) {
        self.reset();
        self.resume_seed = Some(partial);
    }

    /// Drop all buffered state for a fresh round
    pub fn reset(&mut self) {
        self.shape = self.format.forced_shape();
        self.buffer.clear();
        self.json.reset();
        self.tags.reset();
        self.resume_seed = None;
        self.lead.clear();
        self.seeded = None;
        self.seed_resolved = false;
        self.failed_seed = None;
    }

    /// Whether the resumed record has completed since the last call
    pub fn take_seed_resolved(&mut self) -> bool {
        std::mem::take(&mut self.seed_resolved)
    }

    /// Unconsumed text of the current round
    #[must_use]
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// Shape in use, once known
    #[must_use]
    pub const fn shape(&self) -> Option<RecordShape> {
        self.shape
    }

    fn apply_resume(&mut self, fresh: bool) {
        let Some(seed) = self.resume_seed.take() else {
            return;
        };
        let lead = std::mem::take(&mut self.lead);

        if fresh {
            log::debug!("Continuation restarted with a fresh payload");
            self.buffer = lead;
        } else {
            log::debug!(
                "Continuation resumes '{}' after {} byte(s)",
                seed.file_name.as_deref().unwrap_or("<unnamed>"),
                seed.raw_content.len()
            );
            self.shape = Some(seed.shape);
            self.buffer.clone_from(&seed.raw_record);
            self.buffer.push_str(&lead);
            self.seeded = Some(seed);
        }
    }

    fn extract(&mut self) -> Vec<Extracted> {
        if self.shape.is_none() {
            self.shape = detect_shape(&self.buffer);
        }

        match self.shape {
            Some(RecordShape::Json) => self.extract_json(),
            Some(RecordShape::Tagged) => self.extract_tagged(),
            None => Vec::new(),
        }
    }

    fn extract_json(&mut self) -> Vec<Extracted> {
        let mut extracted = Vec::new();

        while let Some(range) = self.json.next_object(&self.buffer) {
            let candidate = &self.buffer[range];
            log::debug!("Extracted candidate object ({} bytes)", candidate.len());
            let item = parse_object(candidate, &self.schema);
            self.mark_closed(&item);
            extracted.push(item);
        }

        let drain_to = self.json.open_start().unwrap_or(self.json.position());
        self.buffer.drain(..drain_to);
        self.json.shift(drain_to);

        extracted
    }

    fn extract_tagged(&mut self) -> Vec<Extracted> {
        let mut extracted = Vec::new();

        while let Some(block) = self.tags.next_block(&self.buffer) {
            let item = match FileRecord::new(&block.name, block.content) {
                Ok(record) => Extracted::Record(record),
                Err(e) => Extracted::Malformed(MalformedRecord {
                    reason: e.to_string(),
                    file_name: Some(block.name),
                    raw: self.buffer[..block.end].to_string(),
                }),
            };
            self.buffer.drain(..block.end);
            self.mark_closed(&item);
            extracted.push(item);
        }

        let drain_to = match self.tags.progress(&self.buffer) {
            TagProgress::Idle { keep_from } => keep_from,
            TagProgress::OpeningTag(at) => at,
            TagProgress::Open(open) => open.tag_start,
        };
        self.buffer.drain(..drain_to);
        self.tags.shift(drain_to);

        extracted
    }

    /// Settle the resumed record once the first candidate of the round closes
    fn mark_closed(&mut self, item: &Extracted) {
        let Some(seed) = self.seeded.take() else {
            return;
        };
        match item {
            Extracted::Record(_) => self.seed_resolved = true,
            _ => {
                log::warn!(
                    "Resumed record '{}' closed but could not be parsed, keeping it pending",
                    seed.file_name.as_deref().unwrap_or("<unnamed>")
                );
                self.failed_seed = Some(seed);
            }
        }
    }

    fn check_size(&self, extracted: Vec<Extracted>, buffered: usize) -> Result<Vec<Extracted>> {
        if buffered > self.max_buffer_size {
            return Err(CodegenError::BufferOverflow(self.max_buffer_size));
        }
        Ok(extracted)
    }
}

/// Parse one balanced object under `schema`
fn parse_object(candidate: &str, schema: &WireSchema) -> Extracted {
    let malformed = |reason: String, file_name: Option<String>| {
        Extracted::Malformed(MalformedRecord {
            reason,
            file_name,
            raw: candidate.to_string(),
        })
    };

    let map = match serde_json::from_str::<Map<String, Value>>(candidate) {
        Ok(map) => map,
        Err(e) => return malformed(format!("invalid JSON object: {e}"), None),
    };

    if let Some(manifest) = manifest_from(&map) {
        return Extracted::Manifest(manifest);
    }

    let name = map.get(&schema.name_key).and_then(Value::as_str);
    let content = map.get(&schema.content_key).and_then(Value::as_str);

    match (name, content) {
        (Some(name), Some(content)) => match FileRecord::new(name, content) {
            Ok(record) => Extracted::Record(record),
            Err(e) => malformed(e.to_string(), Some(name.to_string())),
        },
        (None, _) => malformed(
            format!("missing string field '{}'", schema.name_key),
            None,
        ),
        (Some(name), None) => malformed(
            format!("missing string field '{}'", schema.content_key),
            Some(name.to_string()),
        ),
    }
}

/// Read `{"requirements": {"remainingFiles": [...]}}` or `{"remainingFiles": [...]}`
fn manifest_from(map: &Map<String, Value>) -> Option<Manifest> {
    let holder = match map.get(REQUIREMENTS_KEY) {
        Some(Value::Object(inner)) => inner,
        _ => map,
    };
    let files = holder.get(REMAINING_FILES_KEY)?.as_array()?;
    Some(Manifest::new(
        files.iter().filter_map(Value::as_str).map(str::to_string),
    ))
}
