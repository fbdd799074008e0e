use bytes::Bytes;
use futures::TryStreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use super::splice::{PayloadSource, SpliceEntry, StreamSplicer};
use crate::core::{DirectoryNode, FileAttributes, IndexBuilder};
use crate::error::Result;
use crate::path::{AsarPath, IntoAsarPathError};
use crate::stream::ReaderStream;
use crate::DEFAULT_CHUNK_SIZE;

/// Builds an asar archive from named byte sources.
///
/// This is a frontend over the sans-IO [`IndexBuilder`]: the builder assigns
/// offsets, and the writer keeps each file's source in the same order so
/// that [`into_stream`](AsarWriter::into_stream) can splice them after the
/// header.
///
/// ```ignore
/// let mut writer = AsarWriter::new();
/// writer.add_bytes("a.txt", "hello", FileAttributes::default())?;
/// writer.add_reader("dir/b.bin", file, len, FileAttributes::executable())?;
/// let written = writer.write_to(&mut out).await?;
/// ```
#[derive(Debug, Default)]
pub struct AsarWriter {
    core: IndexBuilder,
    entries: Vec<SpliceEntry>,
}

impl AsarWriter {
    pub fn new() -> AsarWriter {
        AsarWriter::default()
    }

    /// Create a directory, and any missing parents.
    pub fn mkdir<P>(&mut self, path: P) -> Result<()>
    where
        P: TryInto<AsarPath, Error = IntoAsarPathError>,
    {
        self.core.mkdir(&path.try_into()?)
    }

    /// Add a file whose `size` bytes will come from `source`.
    ///
    /// Offsets are assigned in call order. The source is not read until the
    /// archive stream is polled.
    pub fn add_file<P>(
        &mut self,
        path: P,
        source: impl Into<PayloadSource>,
        size: u64,
        attributes: FileAttributes,
    ) -> Result<()>
    where
        P: TryInto<AsarPath, Error = IntoAsarPathError>,
    {
        let path = path.try_into()?;
        self.core.insert_file(&path, size, attributes)?;
        self.entries.push(SpliceEntry::new(size, source));
        Ok(())
    }

    /// Add a file from an in-memory buffer.
    pub fn add_bytes<P>(
        &mut self,
        path: P,
        data: impl Into<Bytes>,
        attributes: FileAttributes,
    ) -> Result<()>
    where
        P: TryInto<AsarPath, Error = IntoAsarPathError>,
    {
        let data = data.into();
        let size = data.len() as u64;
        self.add_file(path, data, size, attributes)
    }

    /// Add a file read from `reader`, which must yield exactly `size` bytes.
    pub fn add_reader<P, R>(
        &mut self,
        path: P,
        reader: R,
        size: u64,
        attributes: FileAttributes,
    ) -> Result<()>
    where
        P: TryInto<AsarPath, Error = IntoAsarPathError>,
        R: AsyncRead + Send + 'static,
    {
        let stream = ReaderStream::new(reader, size, DEFAULT_CHUNK_SIZE).boxed();
        self.add_file(path, stream, size, attributes)
    }

    /// The index built so far.
    pub fn index(&self) -> &DirectoryNode {
        self.core.root()
    }

    /// Length of the payload region built so far.
    pub fn content_len(&self) -> u64 {
        self.core.content_offset()
    }

    pub fn encode_header(&self) -> Result<Vec<u8>> {
        self.core.encode_header()
    }

    /// Consume the writer, returning a stream of the complete archive.
    pub fn into_stream(self) -> Result<StreamSplicer> {
        let header = Bytes::from(self.core.encode_header()?);
        tracing::debug!(
            header_len = header.len(),
            content_len = self.core.content_offset(),
            files = self.entries.len(),
            "producing archive"
        );

        let head = SpliceEntry::new(header.len() as u64, header);
        Ok(StreamSplicer::new(
            std::iter::once(head).chain(self.entries),
        ))
    }

    /// Write the complete archive to `writer`, returning the bytes written.
    pub async fn write_to<W: AsyncWrite + Unpin>(self, writer: &mut W) -> Result<u64> {
        let mut stream = self.into_stream()?;
        while let Some(chunk) = stream.try_next().await? {
            writer.write_all(&chunk).await?;
        }
        writer.flush().await?;
        Ok(stream.bytes_emitted())
    }
}
