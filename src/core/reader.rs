//! Sans-IO view of a decoded archive index.

use super::node::{resolve, DirectoryNode, FileNode, IndexNode};
use crate::error::{AsarError, Result};
use crate::path::AsarPath;

/// A decoded index together with the position of the payload region.
///
/// Frontends read the header bytes, decode them with
/// [`decode_index`](super::header::decode_index), and then use this type for
/// every lookup without further I/O.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveIndex {
    root: IndexNode,
    data_offset: u64,
}

impl ArchiveIndex {
    pub fn new(root: DirectoryNode, data_offset: u64) -> ArchiveIndex {
        ArchiveIndex {
            root: IndexNode::Directory(root),
            data_offset,
        }
    }

    /// The root directory.
    #[inline]
    pub fn root(&self) -> &IndexNode {
        &self.root
    }

    /// Byte position in the archive where the payload region begins.
    #[inline]
    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    pub fn get(&self, path: &str) -> Result<&IndexNode> {
        resolve(&self.root, &AsarPath::parse(path))
    }

    pub fn is_folder(&self, path: &str) -> Result<bool> {
        Ok(self.get(path)?.is_directory())
    }

    /// Names of the children of the directory at `path`, sorted.
    pub fn readdir(&self, path: &str) -> Result<Vec<String>> {
        match self.get(path)? {
            IndexNode::Directory(dir) => Ok(dir.names().map(str::to_string).collect()),
            IndexNode::File(_) => Err(AsarError::NotADirectory {
                path: path.to_string(),
                syscall: "scandir",
            }),
        }
    }

    /// Resolve `path` to a file, refusing directories.
    pub fn file(&self, path: &str) -> Result<&FileNode> {
        match self.get(path)? {
            IndexNode::File(file) => Ok(file),
            IndexNode::Directory(_) => Err(AsarError::IsADirectory {
                path: path.to_string(),
            }),
        }
    }

    /// Absolute `(offset, length)` of a file's bytes within the archive.
    pub fn file_location(&self, file: &FileNode) -> Result<(u64, u64)> {
        let offset = self
            .data_offset
            .checked_add(file.offset())
            .ok_or_else(|| AsarError::corrupt("file offset overflows"))?;
        Ok((offset, file.size()))
    }
}
