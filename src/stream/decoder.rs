//! Incremental UTF-8 decoding of transport chunks

/// UTF-8 decoder that carries split multi-byte sequences across chunks
///
/// Invalid sequences decode to U+FFFD; an incomplete trailing sequence is held
/// back until the next chunk completes it.
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    pending: Vec<u8>,
}

impl ChunkDecoder {
    /// Create a new decoder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let mut data = std::mem::take(&mut self.pending);
        data.extend_from_slice(bytes);

        let mut out = String::with_capacity(data.len());
        let mut input = data.as_slice();

        loop {
            match std::str::from_utf8(input) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, rest) = input.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));

                    match e.error_len() {
                        Some(len) => {
                            out.push('\u{FFFD}');
                            input = &rest[len..];
                        }
                        None => {
                            // Sequence continues in the next chunk
                            self.pending = rest.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Flush bytes left over at end of stream
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let rest = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&rest).into_owned()
    }

    /// Number of bytes held back waiting for the rest of a sequence
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
