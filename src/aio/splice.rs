//! Concatenates a sequence of payloads into one output stream.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;

use crate::error::{AsarError, Result};
use crate::stream::ByteStream;

/// Where an entry's bytes come from.
pub enum PayloadSource {
    Buffer(Bytes),
    Stream(ByteStream),
}

impl std::fmt::Debug for PayloadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadSource::Buffer(buf) => f.debug_tuple("Buffer").field(&buf.len()).finish(),
            PayloadSource::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Bytes> for PayloadSource {
    fn from(buf: Bytes) -> Self {
        PayloadSource::Buffer(buf)
    }
}

impl From<Vec<u8>> for PayloadSource {
    fn from(buf: Vec<u8>) -> Self {
        PayloadSource::Buffer(buf.into())
    }
}

impl From<&'static [u8]> for PayloadSource {
    fn from(buf: &'static [u8]) -> Self {
        PayloadSource::Buffer(Bytes::from_static(buf))
    }
}

impl From<ByteStream> for PayloadSource {
    fn from(stream: ByteStream) -> Self {
        PayloadSource::Stream(stream)
    }
}

/// A payload and the number of bytes it must produce.
#[derive(Debug)]
pub struct SpliceEntry {
    size: u64,
    source: PayloadSource,
}

impl SpliceEntry {
    pub fn new(size: u64, source: impl Into<PayloadSource>) -> SpliceEntry {
        SpliceEntry {
            size,
            source: source.into(),
        }
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Emits every entry's declared bytes, in order, as one stream.
///
/// Sources are only polled when the splicer itself is polled, so a slow
/// consumer holds back every producer. A stream source that has nothing ready
/// suspends the splicer without skipping ahead.
///
/// Each entry must produce exactly its declared size: a stream that yields
/// more is a [`PayloadOverrun`](AsarError::PayloadOverrun), one that ends
/// early is a [`PayloadTruncated`](AsarError::PayloadTruncated). A stream
/// that has produced its declared size is polled once more, on the next pull,
/// and must report end-of-data before the following entry starts. Buffers
/// longer than their declared size are cut to it. The first error ends the
/// stream.
#[derive(Debug)]
pub struct StreamSplicer {
    entries: VecDeque<SpliceEntry>,
    /// Index of the front entry among all entries passed to `new`.
    entry: usize,
    entry_emitted: u64,
    bytes_emitted: u64,
    total_len: u64,
    done: bool,
}

impl StreamSplicer {
    pub fn new<I: IntoIterator<Item = SpliceEntry>>(entries: I) -> StreamSplicer {
        let entries: VecDeque<SpliceEntry> = entries.into_iter().collect();
        let total_len = entries.iter().map(SpliceEntry::size).sum();
        StreamSplicer {
            entries,
            entry: 0,
            entry_emitted: 0,
            bytes_emitted: 0,
            total_len,
            done: false,
        }
    }

    /// Sum of every entry's declared size.
    #[inline]
    pub fn total_len(&self) -> u64 {
        self.total_len
    }

    #[inline]
    pub fn bytes_emitted(&self) -> u64 {
        self.bytes_emitted
    }

    fn advance(&mut self) {
        self.entries.pop_front();
        self.entry += 1;
        self.entry_emitted = 0;
    }

    fn fail(&mut self, err: AsarError) -> Poll<Option<Result<Bytes>>> {
        tracing::debug!(entry = self.entry, error = %err, "splice failed");
        self.done = true;
        self.entries.clear();
        Poll::Ready(Some(Err(err)))
    }

    fn emit(&mut self, chunk: Bytes) -> Poll<Option<Result<Bytes>>> {
        self.entry_emitted += chunk.len() as u64;
        self.bytes_emitted += chunk.len() as u64;
        Poll::Ready(Some(Ok(chunk)))
    }
}

impl Stream for StreamSplicer {
    type Item = Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if this.done {
                return Poll::Ready(None);
            }
            let Some(front) = this.entries.front_mut() else {
                tracing::debug!(bytes = this.bytes_emitted, "splice finished");
                this.done = true;
                return Poll::Ready(None);
            };

            let size = front.size;
            let remaining = size - this.entry_emitted;

            match &mut front.source {
                PayloadSource::Buffer(_) if remaining == 0 => {
                    this.advance();
                    continue;
                }
                // All declared bytes are out; the source must now end.
                PayloadSource::Stream(stream) if remaining == 0 => {
                    match stream.as_mut().poll_next(cx) {
                        Poll::Pending => return Poll::Pending,
                        Poll::Ready(None) => {
                            this.advance();
                            continue;
                        }
                        Poll::Ready(Some(Ok(chunk))) if chunk.is_empty() => continue,
                        Poll::Ready(Some(Ok(_))) => {
                            return this.fail(AsarError::PayloadOverrun {
                                entry: this.entry,
                                declared: size,
                            })
                        }
                        Poll::Ready(Some(Err(e))) => return this.fail(AsarError::Io(e)),
                    }
                }
                PayloadSource::Buffer(buf) => {
                    if (buf.len() as u64) < size {
                        let received = buf.len() as u64;
                        return this.fail(AsarError::PayloadTruncated {
                            entry: this.entry,
                            declared: size,
                            received,
                        });
                    }
                    let chunk = buf.split_to(size as usize);
                    let ready = this.emit(chunk);
                    this.advance();
                    return ready;
                }
                PayloadSource::Stream(stream) => match stream.as_mut().poll_next(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(Some(Ok(chunk))) => {
                        let len = chunk.len() as u64;
                        if len > remaining {
                            return this.fail(AsarError::PayloadOverrun {
                                entry: this.entry,
                                declared: size,
                            });
                        }
                        if len == 0 {
                            continue;
                        }
                        return this.emit(chunk);
                    }
                    Poll::Ready(Some(Err(e))) => return this.fail(AsarError::Io(e)),
                    Poll::Ready(None) => {
                        let received = this.entry_emitted;
                        return this.fail(AsarError::PayloadTruncated {
                            entry: this.entry,
                            declared: size,
                            received,
                        });
                    }
                },
            }
        }
    }
}
