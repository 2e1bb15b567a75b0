//! Path-aware glob patterns.
//!
//! A [`GlobPath`] matches component by component, so `*` never crosses a
//! `/`. A `**` segment matches zero or more whole components:
//!
//! - `resources/*.skp` matches `resources/desk.skp` but not `resources/x/desk.skp`
//! - `resources/**/*.skp` matches both
//!
//! The leading run of literal components is the pattern's static prefix;
//! walks start there instead of at the current directory.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::glob::{Wildcard, contains_glob};

/// Errors when parsing glob patterns.
#[derive(Debug, Clone, Error)]
pub enum PatternError {
    #[error("empty pattern")]
    Empty,
}

/// One `/`-separated piece of a path pattern.
#[derive(Debug, Clone)]
enum PathSegment {
    /// Component without metacharacters: `resources`, `desk.skp`
    Literal(String),
    /// Component with wildcards: `*.skp`
    Pattern(Wildcard),
    /// `**`: zero or more components
    Globstar,
}

/// A path pattern with globstar support.
///
/// ```
/// use fanout_glob::GlobPath;
/// use std::path::Path;
///
/// let pattern = GlobPath::new("skps/**/*.skp").unwrap();
/// assert!(pattern.matches(Path::new("skps/desk.skp")));
/// assert!(pattern.matches(Path::new("skps/top25/desk.skp")));
/// assert!(!pattern.matches(Path::new("images/desk.skp")));
/// ```
#[derive(Debug, Clone)]
pub struct GlobPath {
    segments: Vec<PathSegment>,
    anchored: bool,
}

impl GlobPath {
    /// Parse a pattern. A leading `/` anchors it at the filesystem root.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }

        let (body, anchored) = match pattern.strip_prefix('/') {
            Some(rest) => (rest, true),
            None => (pattern, false),
        };

        let mut segments = Vec::new();
        for part in body.split('/').filter(|p| !p.is_empty()) {
            if part == "**" {
                if !matches!(segments.last(), Some(PathSegment::Globstar)) {
                    segments.push(PathSegment::Globstar);
                }
            } else if contains_glob(part) {
                segments.push(PathSegment::Pattern(Wildcard::new(part)));
            } else {
                segments.push(PathSegment::Literal(part.to_string()));
            }
        }

        Ok(Self { segments, anchored })
    }

    /// Check a relative path against the pattern.
    pub fn matches(&self, path: &Path) -> bool {
        let components: Vec<&str> = path
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect();
        match_segments(&self.segments, &components)
    }

    /// Number of components every match has, or `None` with a globstar.
    pub fn fixed_depth(&self) -> Option<usize> {
        let globstar = self
            .segments
            .iter()
            .any(|s| matches!(s, PathSegment::Globstar));
        (!globstar).then_some(self.segments.len())
    }

    /// Split into the leading literal directories and the remaining pattern.
    ///
    /// The prefix is rooted at `/` for anchored patterns. The remainder is
    /// `None` when every segment is literal.
    ///
    /// ```
    /// use fanout_glob::GlobPath;
    /// use std::path::PathBuf;
    ///
    /// let (prefix, rest) = GlobPath::new("skps/top25/*.skp").unwrap().split_static_prefix();
    /// assert_eq!(prefix, PathBuf::from("skps/top25"));
    /// assert!(rest.is_some());
    /// ```
    pub fn split_static_prefix(&self) -> (PathBuf, Option<GlobPath>) {
        let mut prefix = if self.anchored {
            PathBuf::from("/")
        } else {
            PathBuf::new()
        };

        let literal_count = self
            .segments
            .iter()
            .take_while(|s| matches!(s, PathSegment::Literal(_)))
            .count();
        for segment in &self.segments[..literal_count] {
            if let PathSegment::Literal(name) = segment {
                prefix.push(name);
            }
        }

        let rest = &self.segments[literal_count..];
        let remainder = (!rest.is_empty()).then(|| GlobPath {
            segments: rest.to_vec(),
            anchored: false,
        });

        (prefix, remainder)
    }
}

/// Segment matching with backtracking over globstars.
fn match_segments(segments: &[PathSegment], components: &[&str]) -> bool {
    let Some((first, rest)) = segments.split_first() else {
        return components.is_empty();
    };

    match first {
        PathSegment::Globstar => {
            (0..=components.len()).any(|skip| match_segments(rest, &components[skip..]))
        }
        PathSegment::Literal(lit) => components
            .split_first()
            .is_some_and(|(c, tail)| *c == lit.as_str() && match_segments(rest, tail)),
        PathSegment::Pattern(wildcard) => components
            .split_first()
            .is_some_and(|(c, tail)| wildcard.matches(c) && match_segments(rest, tail)),
    }
}
