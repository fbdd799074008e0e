use std::sync::OnceLock;

use crate::error::{AsarError, Result};

use super::RangeData;

/// Which representation a range source answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceShape {
    /// No successful call has been observed yet.
    Unknown,
    BufferBacked,
    StreamBacked,
}

impl SourceShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceShape::Unknown => "unknown",
            SourceShape::BufferBacked => "buffer",
            SourceShape::StreamBacked => "stream",
        }
    }
}

/// One-shot `Unknown -> BufferBacked | StreamBacked` transition.
///
/// The first observed answer fixes the shape; any later answer of the other
/// shape is an error.
#[derive(Debug, Default)]
pub(crate) struct ShapeCell(OnceLock<SourceShape>);

impl ShapeCell {
    pub(crate) fn get(&self) -> SourceShape {
        self.0.get().copied().unwrap_or(SourceShape::Unknown)
    }

    pub(crate) fn observe(&self, data: &RangeData) -> Result<SourceShape> {
        let found = data.shape();
        let fixed = *self.0.get_or_init(|| {
            tracing::debug!(shape = found.as_str(), "classified range source");
            found
        });

        if fixed != found {
            tracing::warn!(
                expected = fixed.as_str(),
                found = found.as_str(),
                "range source changed representation"
            );
            return Err(AsarError::InconsistentSource {
                expected: fixed.as_str(),
                found: found.as_str(),
            });
        }
        Ok(fixed)
    }
}
