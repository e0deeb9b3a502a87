//! Streaming responses
//!
//! A streamed exchange flows through three stages:
//! - [`decoder`] splits raw bytes into newline-terminated lines
//! - [`record`] types each line as a generation or chat record
//! - [`ResponseStream`] hands the records to the caller one pull at a time
//!
//! The stream is single-pass. It ends after the terminal (`done`) record, on
//! the first error, or when the caller drops it; in every case the underlying
//! connection is released.

pub mod accumulate;
pub mod decoder;
pub mod record;

pub use accumulate::{ChatAccumulator, GenerateAccumulator};
pub use decoder::{lines, LineDecoder};
pub use record::{parse_body, parse_record, StreamRecord};

use crate::error::{OllamaError, Result, TransportError};
use crate::http::ByteStream;
use crate::protocol::{ChatResponse, GenerateResponse};
use futures::stream::{BoxStream, FusedStream, Stream, StreamExt};
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::debug;

/// Lazy, single-pass sequence of typed records from one exchange
pub struct ResponseStream<T> {
    /// Line source; `None` once the stream has terminated
    lines: Option<BoxStream<'static, Result<String>>>,
    /// Records yielded so far
    yielded: usize,
    _record: PhantomData<fn() -> T>,
}

impl<T: StreamRecord> ResponseStream<T> {
    /// Build a record stream over a raw response body
    pub fn new(source: ByteStream) -> Self {
        Self::from_lines(lines(source))
    }

    /// Build a record stream over already framed lines
    pub fn from_lines(lines: BoxStream<'static, Result<String>>) -> Self {
        Self {
            lines: Some(lines),
            yielded: 0,
            _record: PhantomData,
        }
    }

    /// Number of records delivered so far
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    /// Release the connection and stop yielding
    fn terminate(&mut self) {
        if self.lines.take().is_some() {
            debug!("{} stream closed after {} records", T::KIND, self.yielded);
        }
    }
}

impl<T: StreamRecord> Stream for ResponseStream<T> {
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            let Some(lines) = this.lines.as_mut() else {
                return Poll::Ready(None);
            };

            let line = match lines.poll_next_unpin(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(line) => line,
            };

            match line {
                Some(Ok(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match parse_record::<T>(&line) {
                        Ok(record) => {
                            this.yielded += 1;
                            if record.is_done() {
                                this.terminate();
                            }
                            return Poll::Ready(Some(Ok(record)));
                        }
                        Err(e) => {
                            this.terminate();
                            return Poll::Ready(Some(Err(e)));
                        }
                    }
                }
                Some(Err(e)) => {
                    this.terminate();
                    return Poll::Ready(Some(Err(e)));
                }
                None => {
                    this.terminate();
                    return Poll::Ready(Some(Err(OllamaError::Transport(
                        TransportError::ClosedBeforeDone,
                    ))));
                }
            }
        }
    }
}

impl<T: StreamRecord> FusedStream for ResponseStream<T> {
    fn is_terminated(&self) -> bool {
        self.lines.is_none()
    }
}

impl<T> std::fmt::Debug for ResponseStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseStream")
            .field("open", &self.lines.is_some())
            .field("yielded", &self.yielded)
            .finish()
    }
}

impl ResponseStream<ChatResponse> {
    /// Consume the stream and fold it into one complete chat response
    pub async fn accumulate(mut self) -> Result<ChatResponse> {
        let mut acc = ChatAccumulator::new();
        while let Some(chunk) = self.next().await {
            acc.push(chunk?);
        }
        acc.finish()
            .ok_or(OllamaError::Transport(TransportError::ClosedBeforeDone))
    }
}

impl ResponseStream<GenerateResponse> {
    /// Consume the stream and fold it into one complete generation response
    pub async fn accumulate(mut self) -> Result<GenerateResponse> {
        let mut acc = GenerateAccumulator::new();
        while let Some(chunk) = self.next().await {
            acc.push(chunk?);
        }
        acc.finish()
            .ok_or(OllamaError::Transport(TransportError::ClosedBeforeDone))
    }
}
