use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::AsyncSeekExt;

use super::{RangeData, RangeSource};
use crate::stream::ReaderStream;
use crate::DEFAULT_CHUNK_SIZE;

/// Stream-backed source reading ranges of a local file.
///
/// Every request opens the file afresh, so the source holds no descriptor
/// between reads.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    chunk_size: usize,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> FileSource {
        FileSource {
            path: path.as_ref().to_path_buf(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RangeSource for FileSource {
    async fn read_range(&self, offset: u64, length: u64) -> io::Result<RangeData> {
        let mut file = File::open(&self.path).await?;
        file.seek(SeekFrom::Start(offset)).await?;
        Ok(RangeData::Stream(
            ReaderStream::new(file, length, self.chunk_size).boxed(),
        ))
    }
}
