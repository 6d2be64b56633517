//! Destination-relative paths

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Ordered path segments plus a file/directory flag
///
/// Segments are kept lexically normalized: separators split, `.` dropped and
/// `..` pops the previous segment, never climbing above the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RelativePath {
    segments: Vec<String>,
    is_file: bool,
}

impl RelativePath {
    /// Create from segments
    pub fn new<I, S>(is_file: bool, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: normalize(Vec::new(), segments),
            is_file,
        }
    }

    /// Empty directory path, the root of a destination
    pub fn root() -> Self {
        Self::new(false, Vec::<String>::new())
    }

    /// Parse a `/`-separated path; empty segments are dropped
    pub fn parse(is_file: bool, path: &str) -> Self {
        Self::new(is_file, [path])
    }

    /// Append segments; the result takes the given file flag
    pub fn append<I, S>(&self, is_file: bool, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: normalize(self.segments.clone(), segments),
            is_file,
        }
    }

    /// Append another relative path
    pub fn append_path(&self, other: &RelativePath) -> Self {
        self.append(other.is_file, other.segments.iter().cloned())
    }

    /// Replace the final segment
    pub fn replace_last_name(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self {
            segments: normalize(segments, [name]),
            is_file: self.is_file,
        }
    }

    /// Final segment, if any
    pub fn last_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Segments in order
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether the path names a file
    pub fn is_file(&self) -> bool {
        self.is_file
    }

    /// Path joined with `/`
    pub fn path_string(&self) -> String {
        self.segments.join("/")
    }

    /// Platform path
    pub fn to_path_buf(&self) -> PathBuf {
        self.segments.iter().collect()
    }
}

fn normalize<I, S>(mut base: Vec<String>, segments: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    for segment in segments {
        let segment: String = segment.into();
        for part in segment.split(['/', '\\']) {
            match part {
                "" | "." => {}
                ".." => {
                    base.pop();
                }
                _ => base.push(part.to_string()),
            }
        }
    }
    base
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path_string())
    }
}
