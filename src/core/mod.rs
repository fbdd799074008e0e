//! Sans-IO core for asar archive reading and writing.
//!
//! Everything in this module works on byte slices and owned trees without
//! performing any I/O. The async frontends in [`crate::aio`] drive the I/O.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Frontends (aio)                        │
//! │  - AsarReader  (range sources)          │
//! │  - AsarWriter  (stream splicer)         │
//! ├─────────────────────────────────────────┤
//! │  Sans-IO Core (this module)             │
//! │  - header codec                         │
//! │  - ArchiveIndex / IndexBuilder          │
//! └─────────────────────────────────────────┘
//! ```

pub mod header;
pub mod node;
mod reader;
mod writer;

pub use node::{resolve, DirectoryNode, FileAttributes, FileNode, IndexNode};
pub use reader::ArchiveIndex;
pub use writer::IndexBuilder;
