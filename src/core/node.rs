//! The directory tree stored in an archive's header.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{AsarError, Result};
use crate::path::{AsarPath, PATH_SEP};

/// A node of the archive index: either a directory or a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexNode {
    Directory(DirectoryNode),
    File(FileNode),
}

impl IndexNode {
    #[inline(always)]
    pub fn is_directory(&self) -> bool {
        matches!(self, IndexNode::Directory(_))
    }

    #[inline(always)]
    pub fn is_file(&self) -> bool {
        matches!(self, IndexNode::File(_))
    }

    #[inline(always)]
    pub fn as_directory(&self) -> Option<&DirectoryNode> {
        match self {
            IndexNode::Directory(dir) => Some(dir),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn as_file(&self) -> Option<&FileNode> {
        match self {
            IndexNode::File(file) => Some(file),
            _ => None,
        }
    }
}

impl From<DirectoryNode> for IndexNode {
    fn from(dir: DirectoryNode) -> Self {
        IndexNode::Directory(dir)
    }
}

impl From<FileNode> for IndexNode {
    fn from(file: FileNode) -> Self {
        IndexNode::File(file)
    }
}

/// A directory and its children, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectoryNode {
    files: BTreeMap<String, IndexNode>,
}

impl DirectoryNode {
    pub fn new() -> DirectoryNode {
        DirectoryNode::default()
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&IndexNode> {
        self.files.get(name)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    /// Child names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &IndexNode)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut IndexNode> {
        self.files.get_mut(name)
    }

    pub(crate) fn insert(&mut self, name: String, node: IndexNode) {
        self.files.insert(name, node);
    }

    /// Check that every name in the tree is a single, non-empty segment.
    pub(crate) fn validate_names(&self) -> Result<()> {
        for (name, node) in self.entries() {
            if name.is_empty() || name.contains(PATH_SEP) {
                return Err(AsarError::corrupt(format!(
                    "invalid entry name in index: {:?}",
                    name
                )));
            }
            if let IndexNode::Directory(dir) = node {
                dir.validate_names()?;
            }
        }
        Ok(())
    }
}

/// Record keys that cannot be carried as extra attributes.
const RESERVED_KEYS: [&str; 3] = ["offset", "size", "files"];

/// Attributes stored alongside a file's location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<bool>,
    /// Any other attribute found in the record, carried through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl FileAttributes {
    pub fn executable() -> FileAttributes {
        FileAttributes {
            executable: Some(true),
            ..Default::default()
        }
    }

    /// Drop any extra attribute whose key the record itself uses. The file's
    /// own `offset` and `size` always win, and `files` would make the record
    /// read back as a directory.
    pub(crate) fn without_reserved(mut self) -> FileAttributes {
        for key in RESERVED_KEYS {
            if self.extra.remove(key).is_some() {
                tracing::debug!(key, "dropped reserved file attribute");
            }
        }
        self
    }
}

/// A file's location in the payload region.
///
/// `offset` is relative to the start of the payload region, not the archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileNode {
    #[serde(with = "offset_string")]
    offset: u64,
    size: u64,
    #[serde(flatten)]
    attributes: FileAttributes,
}

impl FileNode {
    pub(crate) fn new(offset: u64, size: u64, attributes: FileAttributes) -> FileNode {
        FileNode {
            offset,
            size,
            attributes,
        }
    }

    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[inline]
    pub fn attributes(&self) -> &FileAttributes {
        &self.attributes
    }

    #[inline]
    pub fn is_executable(&self) -> bool {
        self.attributes.executable.unwrap_or(false)
    }
}

/// Walk `path` from `root`, returning the node it names.
///
/// The empty path resolves to `root` itself.
pub fn resolve<'a>(root: &'a IndexNode, path: &AsarPath) -> Result<&'a IndexNode> {
    tracing::trace!("resolve query: {}", path);
    let mut node = root;
    for segment in path.iter() {
        let dir = match node {
            IndexNode::Directory(dir) => dir,
            IndexNode::File(_) => {
                return Err(AsarError::NotADirectory {
                    path: path.to_string(),
                    syscall: "scandir",
                })
            }
        };
        node = dir.get(segment).ok_or_else(|| AsarError::NotFound {
            path: path.to_string(),
            syscall: "open",
        })?;
    }
    Ok(node)
}

mod offset_string {
    use std::fmt;

    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(offset: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(offset)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        deserializer.deserialize_any(OffsetVisitor)
    }

    struct OffsetVisitor;

    impl<'de> Visitor<'de> for OffsetVisitor {
        type Value = u64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative integer or a decimal string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
            u64::try_from(v).map_err(|_| E::custom(format!("negative offset: {}", v)))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
            v.parse()
                .map_err(|_| E::custom(format!("invalid offset: {:?}", v)))
        }
    }
}
