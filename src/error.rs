//! Errors raised while reading or writing asar archives.
//!
//! Every [`AsarError`] maps onto an [`ErrorKind`] tag, and the
//! filesystem-shaped kinds also carry a POSIX-like code so callers can adapt
//! them to `std::fs`-style call sites.

use std::io;

use crate::path::IntoAsarPathError;

pub type Result<T> = std::result::Result<T, AsarError>;

/// Coarse classification of an [`AsarError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    NotADirectory,
    IsADirectory,
    PathInvalid,
    AlreadyExists,
    CannotCreateInsideFile,
    CorruptArchive,
    Protocol,
    IndexNotLoaded,
    Io,
}

#[derive(Debug, thiserror::Error)]
pub enum AsarError {
    #[error("ENOENT: no such file or directory, {syscall} '{path}'")]
    NotFound { path: String, syscall: &'static str },

    #[error("ENOTDIR: not a directory, {syscall} '{path}'")]
    NotADirectory { path: String, syscall: &'static str },

    #[error("EISDIR: illegal operation on a directory, read '{path}'")]
    IsADirectory { path: String },

    #[error("Invalid archive path")]
    PathInvalid(#[from] IntoAsarPathError),

    #[error("File exists and overwriting files is unsupported. Path: '{path}'")]
    AlreadyExists { path: String },

    #[error("Cannot create directory inside a file. Path: '{path}'")]
    CannotCreateInsideFile { path: String },

    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),

    #[error("Corrupt archive: index is not valid JSON")]
    CorruptIndex(#[source] serde_json::Error),

    #[error("Payload {entry} produced more than its declared {declared} bytes")]
    PayloadOverrun { entry: usize, declared: u64 },

    #[error("Payload {entry} ended after {received} of its declared {declared} bytes")]
    PayloadTruncated {
        entry: usize,
        declared: u64,
        received: u64,
    },

    #[error("Unrecognized protocol: '{0}'")]
    UnsupportedProtocol(String),

    #[error("Range source returned a {found} after previously returning a {expected}")]
    InconsistentSource {
        expected: &'static str,
        found: &'static str,
    },

    #[error("The index has not been fetched")]
    IndexNotLoaded,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl AsarError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AsarError::NotFound { .. } => ErrorKind::NotFound,
            AsarError::NotADirectory { .. } => ErrorKind::NotADirectory,
            AsarError::IsADirectory { .. } => ErrorKind::IsADirectory,
            AsarError::PathInvalid(_) => ErrorKind::PathInvalid,
            AsarError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            AsarError::CannotCreateInsideFile { .. } => ErrorKind::CannotCreateInsideFile,
            AsarError::CorruptArchive(_)
            | AsarError::CorruptIndex(_)
            | AsarError::PayloadOverrun { .. }
            | AsarError::PayloadTruncated { .. } => ErrorKind::CorruptArchive,
            AsarError::UnsupportedProtocol(_) | AsarError::InconsistentSource { .. } => {
                ErrorKind::Protocol
            }
            AsarError::IndexNotLoaded => ErrorKind::IndexNotLoaded,
            AsarError::Io(_) => ErrorKind::Io,
        }
    }

    /// POSIX error code name, for the kinds that have one.
    pub fn code(&self) -> Option<&'static str> {
        match self.kind() {
            ErrorKind::NotFound => Some("ENOENT"),
            ErrorKind::NotADirectory | ErrorKind::CannotCreateInsideFile => Some("ENOTDIR"),
            ErrorKind::IsADirectory => Some("EISDIR"),
            ErrorKind::AlreadyExists => Some("EEXIST"),
            ErrorKind::PathInvalid => Some("EINVAL"),
            _ => None,
        }
    }

    /// Negative POSIX errno, matching the convention of Node-style fs errors.
    pub fn errno(&self) -> Option<i32> {
        match self.kind() {
            ErrorKind::NotFound => Some(-2),
            ErrorKind::NotADirectory | ErrorKind::CannotCreateInsideFile => Some(-20),
            ErrorKind::IsADirectory => Some(-21),
            ErrorKind::AlreadyExists => Some(-17),
            ErrorKind::PathInvalid => Some(-22),
            _ => None,
        }
    }

    /// The filesystem operation the error is attributed to.
    pub fn syscall(&self) -> Option<&'static str> {
        match self {
            AsarError::NotFound { syscall, .. } | AsarError::NotADirectory { syscall, .. } => {
                Some(syscall)
            }
            AsarError::IsADirectory { .. } => Some("read"),
            AsarError::AlreadyExists { .. } => Some("open"),
            AsarError::CannotCreateInsideFile { .. } => Some("mkdir"),
            _ => None,
        }
    }

    pub(crate) fn corrupt(reason: impl Into<String>) -> AsarError {
        AsarError::CorruptArchive(reason.into())
    }
}

impl From<AsarError> for io::Error {
    fn from(err: AsarError) -> Self {
        let kind = match err.kind() {
            ErrorKind::NotFound => io::ErrorKind::NotFound,
            ErrorKind::AlreadyExists => io::ErrorKind::AlreadyExists,
            ErrorKind::PathInvalid => io::ErrorKind::InvalidInput,
            ErrorKind::CorruptArchive => io::ErrorKind::InvalidData,
            ErrorKind::Protocol => io::ErrorKind::Unsupported,
            ErrorKind::Io => match err {
                AsarError::Io(inner) => return inner,
                _ => io::ErrorKind::Other,
            },
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posix_codes() {
        let err = AsarError::NotFound {
            path: "a/b".into(),
            syscall: "open",
        };
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.code(), Some("ENOENT"));
        assert_eq!(err.errno(), Some(-2));
        assert_eq!(err.syscall(), Some("open"));
        assert_eq!(
            err.to_string(),
            "ENOENT: no such file or directory, open 'a/b'"
        );

        let err = AsarError::IsADirectory { path: "dir".into() };
        assert_eq!(err.code(), Some("EISDIR"));
        assert_eq!(err.errno(), Some(-21));
    }

    #[test]
    fn io_conversion_keeps_inner_error() {
        let err = AsarError::Io(io::Error::new(io::ErrorKind::TimedOut, "slow"));
        let io_err: io::Error = err.into();
        assert_eq!(io_err.kind(), io::ErrorKind::TimedOut);

        let io_err: io::Error = AsarError::corrupt("bad").into();
        assert_eq!(io_err.kind(), io::ErrorKind::InvalidData);
    }
}
