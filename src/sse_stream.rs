//! Server-sent event framing over a chunked byte stream.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::{Buf, BytesMut};
use futures_util::{Stream, StreamExt};
use memchr::memchr;

use crate::Error;

/// Upper bound on a single unterminated frame.
const MAX_FRAME_BYTES: usize = 1 << 20;

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

impl SseFrame {
    pub fn data(data: impl Into<String>) -> Self {
        Self {
            event: None,
            data: data.into(),
        }
    }

    /// The OpenAI-style end-of-stream sentinel.
    pub fn is_done(&self) -> bool {
        self.data.trim() == "[DONE]"
    }
}

/// Accumulates field lines until a blank line dispatches the frame.
#[derive(Debug, Default)]
struct FrameBuilder {
    event: Option<String>,
    data: Option<String>,
}

impl FrameBuilder {
    fn feed_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => match &mut self.data {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.data = Some(value.to_string()),
            },
            // id and retry carry nothing the transports use
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        let data = self.data.take()?;
        Some(SseFrame { event, data })
    }
}

/// Parses a byte stream into [`SseFrame`]s, tolerating frames and UTF-8
/// sequences split across chunks and both `\n` and `\r\n` line endings.
pub struct SseStream<S> {
    inner: Option<S>,
    buffer: BytesMut,
    builder: FrameBuilder,
    ready: VecDeque<SseFrame>,
}

impl<S> SseStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner: Some(inner),
            buffer: BytesMut::new(),
            builder: FrameBuilder::default(),
            ready: VecDeque::new(),
        }
    }

    fn drain_lines(&mut self) -> Result<(), Error> {
        while let Some(newline) = memchr(b'\n', &self.buffer) {
            let mut line = self.buffer.split_to(newline + 1);
            line.truncate(newline);
            if line.last() == Some(&b'\r') {
                line.truncate(newline - 1);
            }
            let line = std::str::from_utf8(&line)
                .map_err(|e| Error::streaming(format!("Invalid UTF-8 in event stream: {e}")))?;
            if let Some(frame) = self.builder.feed_line(line) {
                self.ready.push_back(frame);
            }
        }
        Ok(())
    }

    /// Treat whatever is left as a final line and dispatch it.
    fn drain_tail(&mut self) {
        if !self.buffer.is_empty() {
            let tail = self.buffer.split();
            match std::str::from_utf8(&tail) {
                Ok(line) => {
                    if let Some(frame) = self.builder.feed_line(line.trim_end()) {
                        self.ready.push_back(frame);
                    }
                }
                Err(_) => tracing::warn!(bytes = tail.len(), "discarding undecodable stream tail"),
            }
        }
        if let Some(frame) = self.builder.dispatch() {
            self.ready.push_back(frame);
        }
    }
}

impl<S, B, E> Stream for SseStream<S>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: Buf,
    E: std::fmt::Display,
{
    type Item = Result<SseFrame, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(frame) = self.ready.pop_front() {
                return Poll::Ready(Some(Ok(frame)));
            }
            let Some(inner) = self.inner.as_mut() else {
                return Poll::Ready(None);
            };

            match ready!(inner.poll_next_unpin(cx)) {
                Some(Ok(mut chunk)) => {
                    while chunk.has_remaining() {
                        let part = chunk.chunk();
                        let len = part.len();
                        self.buffer.extend_from_slice(part);
                        chunk.advance(len);
                    }
                    if let Err(e) = self.drain_lines() {
                        self.inner = None;
                        return Poll::Ready(Some(Err(e)));
                    }
                    if self.buffer.len() > MAX_FRAME_BYTES {
                        self.inner = None;
                        self.buffer.clear();
                        return Poll::Ready(Some(Err(Error::streaming(
                            "Event stream line exceeded maximum size",
                        ))));
                    }
                }
                Some(Err(e)) => {
                    self.inner = None;
                    return Poll::Ready(Some(Err(Error::streaming(format!(
                        "Event stream read failed: {e}"
                    )))));
                }
                None => {
                    self.inner = None;
                    self.drain_tail();
                }
            }
        }
    }
}

/// Adds [`sse_frames`](SseStreamExt::sse_frames) to byte streams.
pub trait SseStreamExt: Stream + Sized {
    fn sse_frames(self) -> SseStream<Self> {
        SseStream::new(self)
    }
}

impl<S: Stream> SseStreamExt for S {}
