// Copyright 2026 The SlipShark Project
// SPDX-License-Identifier: Apache-2.0

use super::types::StreamError;

/// Incremental UTF-8 decoder for chunked byte streams.
///
/// A chunk that ends in the middle of a multi-byte character has its
/// trailing bytes held back until the next chunk completes them. Invalid
/// sequences are errors, never replacement characters.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
    consumed: usize,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one chunk, returning every character it completes.
    pub fn decode(&mut self, chunk: &[u8]) -> Result<String, StreamError> {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let complete = match std::str::from_utf8(&bytes) {
            Ok(_) => bytes.len(),
            // error_len() == None: the input ends inside a sequence.
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(e) => {
                return Err(StreamError::InvalidUtf8 {
                    offset: self.consumed + e.valid_up_to(),
                })
            }
        };

        self.pending = bytes.split_off(complete);
        self.consumed += complete;

        String::from_utf8(bytes).map_err(|e| StreamError::InvalidUtf8 {
            offset: self.consumed - complete + e.utf8_error().valid_up_to(),
        })
    }

    /// Signal end of input. Fails if a partial character is still held.
    pub fn finish(&mut self) -> Result<(), StreamError> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            let pending = self.pending.len();
            self.pending.clear();
            Err(StreamError::TruncatedUtf8 { pending })
        }
    }

    /// Number of bytes held back waiting for the rest of a character.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_passes_straight_through() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"hello").unwrap(), "hello");
        assert_eq!(decoder.pending_len(), 0);
        decoder.finish().unwrap();
    }

    #[test]
    fn split_multibyte_character_is_held_until_complete() {
        // "é" is 0xC3 0xA9
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(&[b'c', b'a', b'f', 0xC3]).unwrap(), "caf");
        assert_eq!(decoder.pending_len(), 1);
        assert_eq!(decoder.decode(&[0xA9, b'!']).unwrap(), "é!");
        decoder.finish().unwrap();
    }

    #[test]
    fn four_byte_character_split_across_three_chunks() {
        let bytes = "🦈".as_bytes();
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(&bytes[..1]).unwrap(), "");
        assert_eq!(decoder.decode(&bytes[1..3]).unwrap(), "");
        assert_eq!(decoder.decode(&bytes[3..]).unwrap(), "🦈");
    }

    #[test]
    fn invalid_sequence_reports_absolute_offset() {
        let mut decoder = Utf8StreamDecoder::new();
        decoder.decode(b"abc").unwrap();
        let err = decoder.decode(&[b'd', 0xFF, b'e']).unwrap_err();
        assert_eq!(err, StreamError::InvalidUtf8 { offset: 4 });
    }

    #[test]
    fn finish_with_partial_character_fails() {
        let mut decoder = Utf8StreamDecoder::new();
        decoder.decode(&[0xE2, 0x82]).unwrap();
        assert_eq!(
            decoder.finish().unwrap_err(),
            StreamError::TruncatedUtf8 { pending: 2 }
        );
    }
}
