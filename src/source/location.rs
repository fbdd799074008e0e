use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use url::Url;

use super::{FileSource, RangeSource};
use crate::aio::ReaderOptions;
use crate::error::{AsarError, Result};

/// Where an archive lives: a caller-supplied source, a local path, or a URL.
#[derive(Clone)]
pub enum ArchiveLocation {
    Source(Arc<dyn RangeSource>),
    Path(PathBuf),
    Url(Url),
}

impl std::fmt::Debug for ArchiveLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArchiveLocation::Source(_) => f.write_str("Source(..)"),
            ArchiveLocation::Path(path) => f.debug_tuple("Path").field(path).finish(),
            ArchiveLocation::Url(url) => f.debug_tuple("Url").field(&url.as_str()).finish(),
        }
    }
}

/// `<letters>://<something>`
fn has_scheme(s: &str) -> bool {
    match s.find("://") {
        Some(i) if i > 0 && s.len() > i + 3 => s[..i].chars().all(|c| c.is_ascii_alphabetic()),
        _ => false,
    }
}

impl ArchiveLocation {
    /// Classify a string as a URL or a filesystem path.
    ///
    /// `file://` URLs become paths; `http://` and `https://` stay URLs; any
    /// other scheme is rejected. Relative paths are resolved against the
    /// current directory.
    pub fn parse(location: &str) -> Result<ArchiveLocation> {
        if !has_scheme(location) {
            let path = Path::new(location);
            let path = if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()?.join(path)
            };
            return Ok(ArchiveLocation::Path(path));
        }

        let url = Url::parse(location)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        match url.scheme() {
            "file" => url.to_file_path().map(ArchiveLocation::Path).map_err(|_| {
                AsarError::from(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("not a local file URL: {}", url),
                ))
            }),
            "http" | "https" => Ok(ArchiveLocation::Url(url)),
            other => Err(AsarError::UnsupportedProtocol(other.to_string())),
        }
    }

    /// Build the range source for this location.
    pub fn into_source(self, options: &ReaderOptions) -> Result<Arc<dyn RangeSource>> {
        match self {
            ArchiveLocation::Source(source) => Ok(source),
            ArchiveLocation::Path(path) => {
                Ok(Arc::new(FileSource::new(path).with_chunk_size(options.chunk_size)))
            }
            #[cfg(feature = "http")]
            ArchiveLocation::Url(url) => Ok(Arc::new(super::HttpSource::new(url)?)),
            #[cfg(not(feature = "http"))]
            ArchiveLocation::Url(url) => Err(AsarError::UnsupportedProtocol(url.scheme().to_string())),
        }
    }
}

impl From<PathBuf> for ArchiveLocation {
    fn from(path: PathBuf) -> Self {
        ArchiveLocation::Path(path)
    }
}

impl From<&Path> for ArchiveLocation {
    fn from(path: &Path) -> Self {
        ArchiveLocation::Path(path.to_path_buf())
    }
}

impl From<Url> for ArchiveLocation {
    fn from(url: Url) -> Self {
        ArchiveLocation::Url(url)
    }
}

impl From<Arc<dyn RangeSource>> for ArchiveLocation {
    fn from(source: Arc<dyn RangeSource>) -> Self {
        ArchiveLocation::Source(source)
    }
}

impl TryFrom<&str> for ArchiveLocation {
    type Error = AsarError;

    fn try_from(location: &str) -> Result<Self> {
        ArchiveLocation::parse(location)
    }
}
