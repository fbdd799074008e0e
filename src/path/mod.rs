use std::fmt;

mod error;

pub use self::error::IntoAsarPathError;

/// The separator used between segments of an archive path.
pub const PATH_SEP: char = '/';

/// A parsed path inside an asar archive.
///
/// An `AsarPath` is a list of segments, none of which is empty or contains
/// [`PATH_SEP`]. The empty path names the archive root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AsarPath(Vec<String>);

impl AsarPath {
    /// The root of the archive.
    pub fn root() -> AsarPath {
        AsarPath(Vec::new())
    }

    /// Split a `/`-separated string into segments.
    ///
    /// Leading, trailing and repeated separators are ignored, so `"/a//b/"`
    /// parses the same as `"a/b"`.
    pub fn parse(path: &str) -> AsarPath {
        AsarPath(
            path.split(PATH_SEP)
                .filter(|x| !x.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Build a path from explicit segments, rejecting any segment that is
    /// empty or contains the separator.
    pub fn from_segments<I, S>(segments: I) -> Result<AsarPath, IntoAsarPathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out = vec![];
        for segment in segments {
            let segment = segment.into();
            if segment.is_empty() {
                return Err(IntoAsarPathError::EmptySegment);
            }
            if segment.contains(PATH_SEP) {
                return Err(IntoAsarPathError::ContainsSeparator(segment));
            }
            out.push(segment);
        }
        Ok(AsarPath(out))
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// The final segment, or `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Everything but the final segment, or `None` for the root.
    pub fn parent(&self) -> Option<AsarPath> {
        self.0
            .split_last()
            .map(|(_, parent)| AsarPath(parent.to_vec()))
    }

    pub fn join(&self, segment: &str) -> Result<AsarPath, IntoAsarPathError> {
        let tail = AsarPath::from_segments([segment])?;
        let mut out = self.0.clone();
        out.extend(tail.0);
        Ok(AsarPath(out))
    }
}

impl fmt::Display for AsarPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut iter = self.0.iter();
        if let Some(v) = iter.next() {
            write!(f, "{}", v)?;
        }
        for v in iter {
            write!(f, "{}{}", PATH_SEP, v)?;
        }
        Ok(())
    }
}

impl TryFrom<&str> for AsarPath {
    type Error = IntoAsarPathError;

    fn try_from(path: &str) -> Result<Self, Self::Error> {
        Ok(AsarPath::parse(path))
    }
}

impl TryFrom<&String> for AsarPath {
    type Error = IntoAsarPathError;

    fn try_from(path: &String) -> Result<Self, Self::Error> {
        Ok(AsarPath::parse(path))
    }
}

impl TryFrom<String> for AsarPath {
    type Error = IntoAsarPathError;

    fn try_from(path: String) -> Result<Self, Self::Error> {
        Ok(AsarPath::parse(&path))
    }
}

impl TryFrom<&[&str]> for AsarPath {
    type Error = IntoAsarPathError;

    fn try_from(segments: &[&str]) -> Result<Self, Self::Error> {
        AsarPath::from_segments(segments.iter().copied())
    }
}

impl<const N: usize> TryFrom<[&str; N]> for AsarPath {
    type Error = IntoAsarPathError;

    fn try_from(segments: [&str; N]) -> Result<Self, Self::Error> {
        AsarPath::from_segments(segments)
    }
}

impl TryFrom<Vec<String>> for AsarPath {
    type Error = IntoAsarPathError;

    fn try_from(segments: Vec<String>) -> Result<Self, Self::Error> {
        AsarPath::from_segments(segments)
    }
}

impl TryFrom<&AsarPath> for AsarPath {
    type Error = IntoAsarPathError;

    fn try_from(path: &AsarPath) -> Result<Self, Self::Error> {
        Ok(path.clone())
    }
}
