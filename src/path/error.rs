use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntoAsarPathError {
    ContainsSeparator(String),
    EmptySegment,
    EmptyPath,
}

impl std::error::Error for IntoAsarPathError {}

impl fmt::Display for IntoAsarPathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntoAsarPathError::ContainsSeparator(segment) => {
                write!(f, "{}: {:?}", self.as_str(), segment)
            }
            _ => write!(f, "{}", self.as_str()),
        }
    }
}

impl IntoAsarPathError {
    pub fn as_str(&self) -> &str {
        match self {
            IntoAsarPathError::ContainsSeparator(_) => "path segment cannot contain '/'",
            IntoAsarPathError::EmptySegment => "path segment cannot be empty",
            IntoAsarPathError::EmptyPath => "no path provided",
        }
    }

    pub fn as_io_error(&self) -> std::io::Error {
        use std::io::{Error, ErrorKind};
        Error::new(ErrorKind::InvalidInput, self.to_string())
    }
}

impl From<IntoAsarPathError> for std::io::Error {
    fn from(err: IntoAsarPathError) -> Self {
        err.as_io_error()
    }
}
