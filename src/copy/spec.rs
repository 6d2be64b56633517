//! Per-specification copy defaults

use crate::copy::{DuplicatesStrategy, RelativePath};
use crate::error::{CopySpecError, Result};
use crate::filter::FilteringCharset;

/// Defaults a copy detail inherits from its specification
pub trait CopySpecResolver: Send + Sync {
    /// Destination prefix prepended to every source path
    fn dest_path(&self) -> RelativePath;

    /// Strategy applied when two elements share a destination
    fn duplicates_strategy(&self) -> DuplicatesStrategy;

    /// Whether the strategy was left at its default
    fn is_default_duplicates_strategy(&self) -> bool;

    /// Whether empty directories are copied
    fn include_empty_dirs(&self) -> bool;

    /// Mode applied to directories, if configured
    fn dir_mode(&self) -> Option<u32>;

    /// Mode applied to files, if configured
    fn file_mode(&self) -> Option<u32>;

    /// Charset used by text filters
    fn filtering_charset(&self) -> FilteringCharset;
}

/// Concrete copy specification
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopySpec {
    into: RelativePath,
    duplicates: Option<DuplicatesStrategy>,
    include_empty_dirs: bool,
    dir_mode: Option<u32>,
    file_mode: Option<u32>,
    charset: FilteringCharset,
}

impl CopySpec {
    /// Specification with no prefix and no mode overrides
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy everything under a `/`-separated destination prefix
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.into = RelativePath::parse(false, prefix);
        self
    }

    /// Set the duplicate strategy
    pub fn with_duplicates(mut self, strategy: DuplicatesStrategy) -> Self {
        self.duplicates = Some(strategy);
        self
    }

    /// Copy empty directories as well
    pub fn with_include_empty_dirs(mut self, include: bool) -> Self {
        self.include_empty_dirs = include;
        self
    }

    /// Mode for copied files
    pub fn with_file_mode(mut self, mode: u32) -> Result<Self> {
        self.file_mode = Some(check_mode(mode)?);
        Ok(self)
    }

    /// Mode for copied directories
    pub fn with_dir_mode(mut self, mode: u32) -> Result<Self> {
        self.dir_mode = Some(check_mode(mode)?);
        Ok(self)
    }

    /// Charset for text filters
    pub fn with_charset(mut self, charset: FilteringCharset) -> Self {
        self.charset = charset;
        self
    }
}

fn check_mode(mode: u32) -> Result<u32> {
    if mode > 0o777 {
        return Err(CopySpecError::invalid_input(format!(
            "mode {:o} is outside 000..777",
            mode
        )));
    }
    Ok(mode)
}

impl CopySpecResolver for CopySpec {
    fn dest_path(&self) -> RelativePath {
        self.into.clone()
    }

    fn duplicates_strategy(&self) -> DuplicatesStrategy {
        self.duplicates.unwrap_or_default()
    }

    fn is_default_duplicates_strategy(&self) -> bool {
        matches!(self.duplicates, None | Some(DuplicatesStrategy::Inherit))
    }

    fn include_empty_dirs(&self) -> bool {
        self.include_empty_dirs
    }

    fn dir_mode(&self) -> Option<u32> {
        self.dir_mode
    }

    fn file_mode(&self) -> Option<u32> {
        self.file_mode
    }

    fn filtering_charset(&self) -> FilteringCharset {
        self.charset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let spec = CopySpec::new();
        assert_eq!(spec.dest_path(), RelativePath::root());
        assert_eq!(spec.duplicates_strategy(), DuplicatesStrategy::Inherit);
        assert!(spec.is_default_duplicates_strategy());
        assert_eq!(spec.file_mode(), None);
        assert_eq!(spec.filtering_charset(), FilteringCharset::Utf8);
    }

    #[test]
    fn test_builder() {
        let spec = CopySpec::new()
            .with_prefix("lib/conf")
            .with_duplicates(DuplicatesStrategy::Exclude)
            .with_file_mode(0o600)
            .unwrap();
        assert_eq!(spec.dest_path().path_string(), "lib/conf");
        assert!(!spec.is_default_duplicates_strategy());
        assert_eq!(spec.file_mode(), Some(0o600));
    }

    #[test]
    fn test_mode_out_of_range() {
        assert!(matches!(
            CopySpec::new().with_dir_mode(0o1000),
            Err(CopySpecError::InvalidInput(_))
        ));
    }
}
