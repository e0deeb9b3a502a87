//! Newline-delimited record framing
//!
//! Splits a byte stream arriving at arbitrary chunk boundaries into complete
//! lines. Splitting happens on raw bytes, so a multi-byte character cut in
//! half by the network still decodes once its line is complete.

use crate::error::{OllamaError, Result};
use crate::http::ByteStream;
use futures::stream::{self, BoxStream, StreamExt};
use tracing::debug;

/// Incremental line splitter over raw byte chunks
#[derive(Debug, Default)]
pub struct LineDecoder {
    /// Unconsumed bytes
    buffer: Vec<u8>,
    /// Prefix of `buffer` already known to contain no line break
    scanned: usize,
}

impl LineDecoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of bytes
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Extract the next complete line, without its line break
    ///
    /// Returns `None` when the buffer holds no complete line yet.
    pub fn next_line(&mut self) -> Option<Result<String>> {
        let offset = self.buffer[self.scanned..]
            .iter()
            .position(|b| *b == b'\n');

        let Some(offset) = offset else {
            self.scanned = self.buffer.len();
            return None;
        };

        let end = self.scanned + offset;
        let mut line: Vec<u8> = self.buffer.drain(..=end).collect();
        line.pop();
        self.scanned = 0;

        Some(String::from_utf8(line).map_err(|e| {
            OllamaError::Decode(format!(
                "invalid UTF-8 at byte {} of record",
                e.utf8_error().valid_up_to()
            ))
        }))
    }

    /// Drain every complete line currently buffered
    pub fn decode(&mut self, chunk: &[u8]) -> Result<Vec<String>> {
        self.push(chunk);
        let mut lines = Vec::new();
        while let Some(line) = self.next_line() {
            lines.push(line?);
        }
        Ok(lines)
    }

    /// Number of buffered bytes not yet emitted
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Signal end of input, discarding any unterminated trailing content
    ///
    /// Returns the number of bytes discarded.
    pub fn finish(&mut self) -> usize {
        let discarded = self.buffer.len();
        self.buffer.clear();
        self.scanned = 0;
        discarded
    }
}

struct LineState {
    source: ByteStream,
    decoder: LineDecoder,
    finished: bool,
}

/// Turn a byte stream into a stream of complete lines
///
/// The first error (transport failure or bad encoding) ends the stream. When
/// the stream ends, the byte source is dropped with it.
pub fn lines(source: ByteStream) -> BoxStream<'static, Result<String>> {
    let state = LineState {
        source,
        decoder: LineDecoder::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if state.finished {
                return None;
            }

            if let Some(line) = state.decoder.next_line() {
                if line.is_err() {
                    state.finished = true;
                }
                return Some((line, state));
            }

            match state.source.next().await {
                Some(Ok(bytes)) => state.decoder.push(&bytes),
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(OllamaError::Transport(e)), state));
                }
                None => {
                    let discarded = state.decoder.finish();
                    if discarded > 0 {
                        debug!("Discarding {} bytes of unterminated trailing record", discarded);
                    }
                    return None;
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use bytes::Bytes;
    use proptest::prelude::*;

    fn source(chunks: Vec<&'static [u8]>) -> ByteStream {
        stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from_static(c)))).boxed()
    }

    #[test]
    fn test_splits_complete_lines() {
        let mut decoder = LineDecoder::new();
        let lines = decoder.decode(b"{\"a\":1}\n{\"a\":2}\n").unwrap();
        assert_eq!(lines, vec!["{\"a\":1}", "{\"a\":2}"]);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_buffers_partial_line_across_chunks() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.decode(b"{\"resp").unwrap().is_empty());
        assert!(decoder.decode(b"onse\":").unwrap().is_empty());
        assert_eq!(decoder.decode(b"\"hi\"}\n{").unwrap(), vec!["{\"response\":\"hi\"}"]);
        assert_eq!(decoder.buffered(), 1);
    }

    #[test]
    fn test_trailing_partial_is_discarded() {
        let items = tokio_test::block_on(
            lines(source(vec![&b"{\"a\":1}\n{\"a\":2"[..]])).collect::<Vec<_>>(),
        );
        let items: Vec<String> = items.into_iter().map(|l| l.unwrap()).collect();
        assert_eq!(items, vec!["{\"a\":1}"]);
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        // "é" is 0xC3 0xA9
        let items = tokio_test::block_on(
            lines(source(vec![&b"caf\xC3"[..], &b"\xA9\n"[..]])).collect::<Vec<_>>(),
        );
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap(), "café");
    }

    #[test]
    fn test_invalid_utf8_is_decode_error() {
        let mut decoder = LineDecoder::new();
        decoder.push(b"\xFF\xFE\n");
        assert!(matches!(decoder.next_line(), Some(Err(OllamaError::Decode(_)))));
    }

    #[test]
    fn test_transport_error_ends_lines() {
        let failing: ByteStream = stream::iter(vec![
            Ok(Bytes::from_static(b"one\ntw")),
            Err(TransportError::Body("reset".to_string())),
            Ok(Bytes::from_static(b"o\n")),
        ])
        .boxed();

        let items = tokio_test::block_on(lines(failing).collect::<Vec<_>>());
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "one");
        assert!(matches!(items[1], Err(OllamaError::Transport(_))));
    }

    proptest! {
        #[test]
        fn prop_framing_independent_of_chunk_boundaries(
            records in proptest::collection::vec("[a-zA-Z0-9 {}:,\"é]{0,24}", 1..8),
            cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..12),
        ) {
            let payload: Vec<u8> = records
                .iter()
                .flat_map(|r| r.bytes().chain(std::iter::once(b'\n')))
                .collect();

            let mut boundaries: Vec<usize> = cuts.iter().map(|i| i.index(payload.len() + 1)).collect();
            boundaries.push(0);
            boundaries.push(payload.len());
            boundaries.sort_unstable();
            boundaries.dedup();

            let mut decoder = LineDecoder::new();
            let mut emitted = Vec::new();
            for window in boundaries.windows(2) {
                emitted.extend(decoder.decode(&payload[window[0]..window[1]]).unwrap());
            }

            prop_assert_eq!(emitted, records);
            prop_assert_eq!(decoder.buffered(), 0);
        }
    }
}
