//! Range sources: capabilities that return the bytes of an `(offset, length)`
//! window of an archive.
//!
//! A source may answer with an already materialized buffer or with a stream
//! that yields the window's bytes. [`AsarReader`](crate::AsarReader) works with
//! either, and learns which one it is dealing with on the first call.

use std::future::Future;
use std::io;

use async_trait::async_trait;
use bytes::Bytes;

pub use crate::stream::ByteStream;

mod chunk;
mod file;
#[cfg(feature = "http")]
mod http;
mod location;
mod shape;

pub use chunk::ChunkStream;
pub use file::FileSource;
#[cfg(feature = "http")]
pub use http::HttpSource;
pub use location::ArchiveLocation;
pub use shape::SourceShape;
pub(crate) use shape::ShapeCell;

/// The answer to a range request.
pub enum RangeData {
    Buffer(Bytes),
    Stream(ByteStream),
}

impl RangeData {
    pub fn shape(&self) -> SourceShape {
        match self {
            RangeData::Buffer(_) => SourceShape::BufferBacked,
            RangeData::Stream(_) => SourceShape::StreamBacked,
        }
    }
}

impl std::fmt::Debug for RangeData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RangeData::Buffer(buf) => f.debug_tuple("Buffer").field(&buf.len()).finish(),
            RangeData::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Provides the bytes in `[offset, offset + length)` of an archive.
///
/// A source must answer every call with the same representation: always
/// buffers or always streams. Either way it must produce exactly `length`
/// bytes.
#[async_trait]
pub trait RangeSource: Send + Sync {
    async fn read_range(&self, offset: u64, length: u64) -> io::Result<RangeData>;
}

/// A buffer-backed source over bytes already in memory.
#[derive(Debug, Clone)]
pub struct MemorySource(Bytes);

impl MemorySource {
    pub fn new(data: impl Into<Bytes>) -> MemorySource {
        MemorySource(data.into())
    }
}

#[async_trait]
impl RangeSource for MemorySource {
    async fn read_range(&self, offset: u64, length: u64) -> io::Result<RangeData> {
        let end = offset.checked_add(length);
        match end {
            Some(end) if end <= self.0.len() as u64 => Ok(RangeData::Buffer(
                self.0.slice(offset as usize..end as usize),
            )),
            _ => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "range {}+{} is outside of {} bytes",
                    offset,
                    length,
                    self.0.len()
                ),
            )),
        }
    }
}

/// A source backed by an async closure. See [`from_fn`].
pub struct FnSource<F>(F);

/// Wrap a closure `(offset, length) -> Future<Output = io::Result<RangeData>>`
/// as a [`RangeSource`].
pub fn from_fn<F, Fut>(f: F) -> FnSource<F>
where
    F: Fn(u64, u64) -> Fut + Send + Sync,
    Fut: Future<Output = io::Result<RangeData>> + Send,
{
    FnSource(f)
}

#[async_trait]
impl<F, Fut> RangeSource for FnSource<F>
where
    F: Fn(u64, u64) -> Fut + Send + Sync,
    Fut: Future<Output = io::Result<RangeData>> + Send,
{
    async fn read_range(&self, offset: u64, length: u64) -> io::Result<RangeData> {
        (self.0)(offset, length).await
    }
}
