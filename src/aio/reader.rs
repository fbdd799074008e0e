use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::OnceCell;

use crate::core::{header, ArchiveIndex, FileNode, IndexNode};
use crate::error::{AsarError, Result};
use crate::source::{
    ArchiveLocation, ByteStream, ChunkStream, RangeData, RangeSource, ShapeCell, SourceShape,
};
use crate::DEFAULT_CHUNK_SIZE;

/// Options for reading archives.
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Largest window requested per call when streaming from a
    /// buffer-backed source, and the read size of file sources.
    pub chunk_size: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ReaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

/// Async reader for asar archives.
///
/// The archive is reached only through a [`RangeSource`], so nothing beyond
/// the header and the files actually read is ever fetched. The index is
/// fetched once and cached; after that every lookup is synchronous and the
/// reader can be shared freely between tasks.
pub struct AsarReader {
    source: Arc<dyn RangeSource>,
    shape: ShapeCell,
    index: OnceCell<ArchiveIndex>,
    options: ReaderOptions,
}

impl std::fmt::Debug for AsarReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsarReader")
            .field("shape", &self.shape.get())
            .field("index", &self.index.get())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl AsarReader {
    pub fn new<S: RangeSource + 'static>(source: S) -> AsarReader {
        AsarReader::with_options(Arc::new(source), ReaderOptions::default())
    }

    pub fn with_options(source: Arc<dyn RangeSource>, options: ReaderOptions) -> AsarReader {
        AsarReader {
            source,
            shape: ShapeCell::default(),
            index: OnceCell::new(),
            options,
        }
    }

    /// Open the archive at `location` (a path, or a `file:`, `http:` or
    /// `https:` URL) and fetch its index.
    pub async fn open(location: &str) -> Result<AsarReader> {
        AsarReader::open_location(ArchiveLocation::parse(location)?, ReaderOptions::default())
            .await
    }

    pub async fn open_location(
        location: ArchiveLocation,
        options: ReaderOptions,
    ) -> Result<AsarReader> {
        tracing::debug!(?location, "opening archive");
        let source = location.into_source(&options)?;
        let reader = AsarReader::with_options(source, options);
        reader.fetch_index().await?;
        Ok(reader)
    }

    /// The representation the source has been seen to answer with.
    pub fn source_shape(&self) -> SourceShape {
        self.shape.get()
    }

    /// Fetch, decode and cache the index. Later calls return the cached index.
    pub async fn fetch_index(&self) -> Result<&ArchiveIndex> {
        self.index
            .get_or_try_init(|| async {
                let prefix = self.read_window(0, header::PREFIX_SIZE).await?;
                let outer_len = header::decode_prefix(&prefix)?;
                let pickle = self
                    .read_window(header::PREFIX_SIZE, outer_len as u64)
                    .await?;
                let index = header::decode_index(outer_len, &pickle)?;
                tracing::debug!(
                    header_len = outer_len,
                    data_offset = index.data_offset(),
                    "fetched archive index"
                );
                Ok::<_, AsarError>(index)
            })
            .await
    }

    /// The cached index, if [`fetch_index`](Self::fetch_index) has completed.
    pub fn index(&self) -> Result<&ArchiveIndex> {
        self.index.get().ok_or(AsarError::IndexNotLoaded)
    }

    pub fn get_file_index(&self, path: &str) -> Result<&IndexNode> {
        self.index()?.get(path)
    }

    pub fn is_folder(&self, path: &str) -> Result<bool> {
        self.index()?.is_folder(path)
    }

    pub fn readdir(&self, path: &str) -> Result<Vec<String>> {
        self.index()?.readdir(path)
    }

    /// Read the whole of the file at `path`.
    pub async fn read_file(&self, path: &str) -> Result<Bytes> {
        let (offset, length) = self.locate(path).await?;
        let buf = self.read_window(offset, length).await?;
        if buf.len() as u64 != length {
            return Err(AsarError::corrupt(format!(
                "read {} bytes of '{}' but the index declares {}",
                buf.len(),
                path,
                length
            )));
        }
        Ok(buf)
    }

    /// Stream the file at `path`.
    ///
    /// Stream-backed sources hand their stream straight through; buffer-backed
    /// sources are read in bounded chunks as the stream is polled.
    pub async fn create_read_stream(&self, path: &str) -> Result<ByteStream> {
        let (offset, length) = self.locate(path).await?;
        match self.shape.get() {
            SourceShape::StreamBacked => {
                let data = self.source.read_range(offset, length).await?;
                self.shape.observe(&data)?;
                Ok(match data {
                    RangeData::Stream(stream) => stream,
                    RangeData::Buffer(buf) => {
                        futures::stream::once(async move { Ok::<_, std::io::Error>(buf) }).boxed()
                    }
                })
            }
            SourceShape::BufferBacked | SourceShape::Unknown => Ok(ChunkStream::new(
                self.source.clone(),
                offset,
                length,
                self.options.chunk_size,
            )
            .boxed()),
        }
    }

    async fn locate(&self, path: &str) -> Result<(u64, u64)> {
        let index = self.fetch_index().await?;
        let file: &FileNode = index.file(path)?;
        index.file_location(file)
    }

    /// Read a window as one buffer, draining the source's stream if it has one.
    async fn read_window(&self, offset: u64, length: u64) -> Result<Bytes> {
        let data = self.source.read_range(offset, length).await?;
        self.shape.observe(&data)?;
        match data {
            RangeData::Buffer(buf) => Ok(buf),
            RangeData::Stream(stream) => Ok(crate::stream::collect(stream, length).await?),
        }
    }
}
