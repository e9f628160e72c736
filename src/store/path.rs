//! Tree paths.
//!
//! A [`TreePath`] addresses a subtree of the ledger: an ordered list of key
//! segments, printed `a/b/c`. Segments are non-empty and contain no `/`
//! and none of `# $ [ ]`.

use std::fmt;

use crate::error::LedgerError;

const FORBIDDEN: &[char] = &['#', '$', '[', ']'];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TreePath {
    segments: Vec<String>,
}

impl TreePath {
    /// The tree root (no segments).
    pub fn root() -> Self {
        Self { segments: Vec::new() }
    }

    /// Builds a path from trusted segments (normalized keys, provider ids,
    /// minted push keys). Callers holding arbitrary strings go through
    /// [`TreePath::parse`] instead.
    pub(crate) fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses a `a/b/c` path string, validating every segment.
    pub fn parse(raw: &str) -> Result<Self, LedgerError> {
        if raw.is_empty() {
            return Ok(Self::root());
        }
        let mut segments = Vec::new();
        for segment in raw.split('/') {
            if segment.is_empty() {
                return Err(LedgerError::InvalidRequest(format!(
                    "empty path segment in '{raw}'"
                )));
            }
            if segment.contains(FORBIDDEN) {
                return Err(LedgerError::InvalidRequest(format!(
                    "path segment '{segment}' contains a forbidden character"
                )));
            }
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    /// The path one level down at `segment`.
    pub fn child(&self, segment: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment, if any.
    pub fn leaf(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// True when `prefix` is an ancestor of (or equal to) this path.
    pub fn starts_with(&self, prefix: &TreePath) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}
