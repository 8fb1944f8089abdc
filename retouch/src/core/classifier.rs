//! Recognition of git's "will be normalized on next touch" diagnostic.
//!
//! Git does not document the wording of this warning, so matching is kept
//! behind [`LineClassifier`] and anchored only on a fixed marker phrase plus
//! the quote-delimited path.

/// Marker emitted by git when a file is reported changed only because a
/// content filter will rewrite it, e.g.
/// `warning: in the working copy of 'a.txt', LF will be replaced by CRLF the next time Git touches it`.
pub const GIT_RENORMALIZE_MARKER: &str = "the next time Git touches it";

/// Decides whether a reported line is a false positive and extracts its path.
pub trait LineClassifier {
    /// Return the candidate path embedded in `line`, or `None` if the line is
    /// not a recognized false positive.
    fn candidate<'a>(&self, line: &'a str) -> Option<&'a str>;
}

/// Substring classifier keyed on a marker phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerClassifier {
    marker: String,
}

impl MarkerClassifier {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }
}

impl Default for MarkerClassifier {
    fn default() -> Self {
        Self::new(GIT_RENORMALIZE_MARKER)
    }
}

impl LineClassifier for MarkerClassifier {
    fn candidate<'a>(&self, line: &'a str) -> Option<&'a str> {
        if !line.contains(self.marker.as_str()) {
            return None;
        }
        quoted_path(line)
    }
}

/// Text strictly between the first and second `'` of `line`, verbatim.
fn quoted_path(line: &str) -> Option<&str> {
    let (_, rest) = line.split_once('\'')?;
    let (path, _) = rest.split_once('\'')?;
    Some(path)
}
