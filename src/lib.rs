//! Streaming reader and writer for the asar archive format.
//!
//! An asar archive is a JSON index of a directory tree, framed by a small
//! length-prefixed header, followed by the concatenated bytes of every file.
//!
//! Use [AsarReader][AsarReader] to read archives through any
//! [RangeSource][source::RangeSource], and [AsarWriter][AsarWriter] to
//! produce them as a stream.

/// Largest chunk requested or yielded at once when streaming file contents.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

pub mod aio;
pub mod core;
pub mod error;
pub mod path;
#[cfg(feature = "reader")]
pub mod source;
pub mod stream;

#[cfg(feature = "reader")]
pub use aio::{AsarReader, ReaderOptions};
#[cfg(feature = "writer")]
pub use aio::{AsarWriter, PayloadSource, SpliceEntry, StreamSplicer};
pub use self::core::{ArchiveIndex, DirectoryNode, FileAttributes, FileNode, IndexNode};
pub use error::{AsarError, ErrorKind, Result};
pub use path::AsarPath;
#[cfg(feature = "reader")]
pub use source::{ArchiveLocation, MemorySource, RangeData, RangeSource, SourceShape};
pub use stream::ByteStream;
