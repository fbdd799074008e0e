//! Byte stream helpers shared by range sources and the writer.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, ReadBuf};

/// Most `collect` will reserve up front; past this the buffer grows with
/// the data actually received.
const MAX_PREALLOC: u64 = 16 * crate::DEFAULT_CHUNK_SIZE as u64;

/// A boxed stream of byte chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

pin_project! {
    /// Turns an [`AsyncRead`] into a stream of chunks, yielding exactly
    /// `limit` bytes.
    ///
    /// Running out of input before `limit` is an `UnexpectedEof` error.
    pub struct ReaderStream<R> {
        #[pin]
        inner: R,
        remaining: u64,
        buf: Vec<u8>,
    }
}

impl<R> ReaderStream<R> {
    pub fn new(inner: R, limit: u64, chunk_size: usize) -> Self {
        let capacity = chunk_size.max(1).min(usize::try_from(limit).unwrap_or(usize::MAX));
        Self {
            inner,
            remaining: limit,
            buf: vec![0; capacity],
        }
    }

    /// Bytes still to be yielded.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl<R: AsyncRead + Send + 'static> ReaderStream<R> {
    pub fn boxed(self) -> ByteStream {
        Box::pin(self)
    }
}

impl<R: AsyncRead> Stream for ReaderStream<R> {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if *this.remaining == 0 {
            return Poll::Ready(None);
        }

        let want = (*this.remaining).min(this.buf.len() as u64) as usize;
        let mut read_buf = ReadBuf::new(&mut this.buf[..want]);
        match this.inner.poll_read(cx, &mut read_buf) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Err(e)) => {
                *this.remaining = 0;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(Ok(())) => {
                let filled = read_buf.filled();
                if filled.is_empty() {
                    let missing = *this.remaining;
                    *this.remaining = 0;
                    return Poll::Ready(Some(Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("input ended {} bytes early", missing),
                    ))));
                }
                *this.remaining -= filled.len() as u64;
                Poll::Ready(Some(Ok(Bytes::copy_from_slice(filled))))
            }
        }
    }
}

/// Drain a stream into one contiguous buffer.
///
/// `size_hint` only sizes the initial allocation; it is not trusted.
pub(crate) async fn collect(mut stream: ByteStream, size_hint: u64) -> io::Result<Bytes> {
    let first = match stream.try_next().await? {
        Some(chunk) => chunk,
        None => return Ok(Bytes::new()),
    };
    let second = match stream.try_next().await? {
        Some(chunk) => chunk,
        None => return Ok(first),
    };

    let capacity = size_hint.min(MAX_PREALLOC) as usize;
    let mut out = Vec::with_capacity(capacity);
    out.extend_from_slice(&first);
    out.extend_from_slice(&second);
    while let Some(chunk) = stream.try_next().await? {
        out.extend_from_slice(&chunk);
    }
    Ok(out.into())
}
