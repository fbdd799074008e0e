//! Async (tokio) frontends for reading and writing asar archives.

#[cfg(feature = "reader")]
mod reader;
#[cfg(feature = "writer")]
mod splice;
#[cfg(all(test, feature = "reader", feature = "writer"))]
mod tests;
#[cfg(feature = "writer")]
mod writer;

#[cfg(feature = "reader")]
pub use reader::{AsarReader, ReaderOptions};
#[cfg(feature = "writer")]
pub use splice::{PayloadSource, SpliceEntry, StreamSplicer};
#[cfg(feature = "writer")]
pub use writer::AsarWriter;
