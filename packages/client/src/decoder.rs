//! Incremental UTF-8 decoding of inbound socket chunks.

use crate::error::DecodeError;

/// Longest prefix of a UTF-8 sequence that can be incomplete.
const MAX_PENDING_BYTES: usize = 3;

/// Text decoded from one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedChunk {
    pub text: String,
    /// Set when invalid sequences were replaced with U+FFFD
    pub malformed: Option<DecodeError>,
}

/// Decodes a byte stream chunk by chunk.
///
/// Invalid sequences are replaced with U+FFFD. An incomplete sequence at the
/// end of a chunk is held back until the next chunk completes it.
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    pending: Vec<u8>,
}

impl ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk.
    pub fn decode(&mut self, chunk: &[u8]) -> DecodedChunk {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut text = String::with_capacity(bytes.len());
        let mut malformed = 0;
        let mut rest = bytes.as_slice();

        while !rest.is_empty() {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    rest = &[];
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    text.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            malformed += 1;
                            rest = &after[len..];
                        }
                        None if after.len() <= MAX_PENDING_BYTES => {
                            self.pending = after.to_vec();
                            rest = &[];
                        }
                        None => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            malformed += 1;
                            rest = &[];
                        }
                    }
                }
            }
        }

        DecodedChunk {
            text,
            malformed: (malformed > 0).then_some(DecodeError { malformed }),
        }
    }

    /// Flush at end of stream; a held-back partial sequence becomes U+FFFD.
    pub fn finish(&mut self) -> DecodedChunk {
        if self.pending.is_empty() {
            return DecodedChunk {
                text: String::new(),
                malformed: None,
            };
        }
        self.pending.clear();
        DecodedChunk {
            text: char::REPLACEMENT_CHARACTER.to_string(),
            malformed: Some(DecodeError { malformed: 1 }),
        }
    }

    /// Number of bytes held back waiting for the rest of a sequence.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
