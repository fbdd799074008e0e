use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::Stream;

use super::{RangeData, RangeSource, SourceShape};
use crate::error::AsarError;

/// Streams a window of a buffer-backed source by issuing one range request
/// per chunk.
///
/// Each poll asks the source for `min(chunk_size, remaining)` bytes at the
/// cursor, so no request ever reaches past the end of the window. Requests
/// are only made when the consumer polls.
pub struct ChunkStream {
    source: Arc<dyn RangeSource>,
    cursor: u64,
    end: u64,
    chunk_size: u64,
    pending: Option<(u64, BoxFuture<'static, io::Result<RangeData>>)>,
    done: bool,
}

impl ChunkStream {
    pub fn new(source: Arc<dyn RangeSource>, offset: u64, length: u64, chunk_size: usize) -> Self {
        Self {
            source,
            cursor: offset,
            end: offset.saturating_add(length),
            chunk_size: chunk_size.max(1) as u64,
            pending: None,
            done: false,
        }
    }

    /// Bytes of the window not yet yielded.
    pub fn remaining(&self) -> u64 {
        self.end - self.cursor
    }

    fn fail(&mut self, err: io::Error) -> Poll<Option<io::Result<Bytes>>> {
        self.done = true;
        self.pending = None;
        Poll::Ready(Some(Err(err)))
    }
}

impl Stream for ChunkStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.done {
            return Poll::Ready(None);
        }

        if this.pending.is_none() {
            if this.cursor >= this.end {
                this.done = true;
                return Poll::Ready(None);
            }
            let want = this.chunk_size.min(this.end - this.cursor);
            let source = this.source.clone();
            let cursor = this.cursor;
            this.pending = Some((
                want,
                Box::pin(async move { source.read_range(cursor, want).await }),
            ));
        }

        let Some((want, fut)) = this.pending.as_mut() else {
            return Poll::Ready(None);
        };
        let want = *want;
        let result = ready!(fut.as_mut().poll(cx));
        this.pending = None;

        match result {
            Ok(RangeData::Buffer(buf)) if buf.len() as u64 == want => {
                this.cursor += want;
                Poll::Ready(Some(Ok(buf)))
            }
            Ok(RangeData::Buffer(buf)) => this.fail(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "range source returned {} of {} requested bytes",
                    buf.len(),
                    want
                ),
            )),
            Ok(RangeData::Stream(_)) => this.fail(
                AsarError::InconsistentSource {
                    expected: SourceShape::BufferBacked.as_str(),
                    found: SourceShape::StreamBacked.as_str(),
                }
                .into(),
            ),
            Err(e) => this.fail(e),
        }
    }
}
