//! Sans-IO index builder.
//!
//! `IndexBuilder` owns the directory tree of an archive being written and
//! assigns every file its position in the payload region. It performs no
//! I/O; the async [`AsarWriter`](crate::AsarWriter) pairs each assigned
//! file with the source of its bytes.

use super::header;
use super::node::{DirectoryNode, FileAttributes, FileNode, IndexNode};
use crate::error::{AsarError, Result};
use crate::path::{AsarPath, IntoAsarPathError};

#[derive(Debug, Clone, Default)]
pub struct IndexBuilder {
    root: DirectoryNode,
    /// Next free byte in the payload region.
    content_offset: u64,
}

impl IndexBuilder {
    pub fn new() -> IndexBuilder {
        IndexBuilder::default()
    }

    #[inline]
    pub fn root(&self) -> &DirectoryNode {
        &self.root
    }

    /// Total length of the payload region assigned so far.
    #[inline]
    pub fn content_offset(&self) -> u64 {
        self.content_offset
    }

    /// Create `path` and any missing parents. Existing directories are left alone.
    pub fn mkdir(&mut self, path: &AsarPath) -> Result<()> {
        tracing::trace!("mkdir: {}", path);
        self.mkdir_inner(path).map(|_| ())
    }

    fn mkdir_inner(&mut self, path: &AsarPath) -> Result<&mut DirectoryNode> {
        let mut cwd = &mut self.root;
        for (i, step) in path.iter().enumerate() {
            if !cwd.contains(step) {
                cwd.insert(step.to_string(), DirectoryNode::new().into());
            }
            cwd = match cwd.get_mut(step) {
                Some(IndexNode::Directory(dir)) => dir,
                _ => {
                    let prefix = AsarPath::from_segments(&path.segments()[..=i])?;
                    return Err(AsarError::CannotCreateInsideFile {
                        path: prefix.to_string(),
                    });
                }
            };
        }
        Ok(cwd)
    }

    /// Register a file of `size` bytes at `path`, assigning it the next free
    /// offset. Parent directories are created as needed.
    pub fn insert_file(
        &mut self,
        path: &AsarPath,
        size: u64,
        attributes: FileAttributes,
    ) -> Result<FileNode> {
        let name = path.file_name().ok_or(IntoAsarPathError::EmptyPath)?;
        let parent = path.parent().unwrap_or_default();

        let offset = self.content_offset;
        let next_offset = offset
            .checked_add(size)
            .ok_or_else(|| AsarError::corrupt("payload region overflows u64"))?;

        let dir = self.mkdir_inner(&parent)?;
        if dir.contains(name) {
            return Err(AsarError::AlreadyExists {
                path: path.to_string(),
            });
        }

        let file = FileNode::new(offset, size, attributes.without_reserved());
        dir.insert(name.to_string(), file.clone().into());
        self.content_offset = next_offset;

        tracing::trace!(offset, size, "inserted file: {}", path);
        Ok(file)
    }

    /// Encode the current tree as a header.
    pub fn encode_header(&self) -> Result<Vec<u8>> {
        header::encode(&self.root)
    }

    pub fn into_root(self) -> DirectoryNode {
        self.root
    }
}
