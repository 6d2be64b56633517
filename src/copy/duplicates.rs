//! Duplicate destination handling

use crate::copy::CopyDetail;
use crate::error::{CopySpecError, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

/// What to do when two elements map to the same destination path
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatesStrategy {
    /// Copy every duplicate; the last one wins on disk
    Include,
    /// Keep the first element and skip the rest
    Exclude,
    /// Copy duplicates and log a warning
    Warn,
    /// Fail the whole copy
    Fail,
    /// Defer to the enclosing specification
    #[default]
    Inherit,
}

/// Outcome of a duplicate check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateDecision {
    /// Copy the element
    Copy,
    /// Leave the element out
    Skip,
}

/// Tracks visited destination paths across one copy
#[derive(Debug, Default)]
pub struct DuplicateHandler {
    visited: HashSet<String>,
}

impl DuplicateHandler {
    /// Create an empty handler
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `detail` and decide whether it is copied
    pub fn check(&mut self, detail: &CopyDetail) -> Result<DuplicateDecision> {
        if detail.is_directory() {
            return Ok(DuplicateDecision::Copy);
        }

        let path = detail.relative_path().path_string();
        if self.visited.insert(path.clone()) {
            return Ok(DuplicateDecision::Copy);
        }

        if detail.is_default_duplicates_strategy() {
            return Err(CopySpecError::DuplicateEntry {
                path,
                reason: "a duplicates strategy must be set to decide how to handle it, \
                         e.g. --duplicates exclude"
                    .to_string(),
            });
        }

        match detail.duplicates_strategy() {
            DuplicatesStrategy::Exclude => {
                debug!("Skipping duplicate {}", path);
                Ok(DuplicateDecision::Skip)
            }
            DuplicatesStrategy::Fail => Err(CopySpecError::DuplicateEntry {
                path,
                reason: "the duplicates strategy is 'fail'".to_string(),
            }),
            DuplicatesStrategy::Warn => {
                warn!("Encountered duplicate path \"{}\" during copy operation", path);
                Ok(DuplicateDecision::Copy)
            }
            DuplicatesStrategy::Include | DuplicatesStrategy::Inherit => {
                Ok(DuplicateDecision::Copy)
            }
        }
    }

    /// Number of distinct file destinations seen so far
    pub fn visited(&self) -> usize {
        self.visited.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::copy::testing::MemoryElement;
    use crate::copy::{CopySpec, Platform};
    use std::sync::Arc;

    fn detail(path: &str, spec: &Arc<CopySpec>) -> CopyDetail {
        CopyDetail::new(
            Box::new(MemoryElement::file(path, b"")),
            spec.clone(),
            Platform::default(),
        )
    }

    #[test]
    fn test_unique_paths_are_copied() {
        let spec = Arc::new(CopySpec::new());
        let mut handler = DuplicateHandler::new();
        assert_eq!(handler.check(&detail("a", &spec)).unwrap(), DuplicateDecision::Copy);
        assert_eq!(handler.check(&detail("b", &spec)).unwrap(), DuplicateDecision::Copy);
        assert_eq!(handler.visited(), 2);
    }

    #[test]
    fn test_default_strategy_fails_on_duplicate() {
        let spec = Arc::new(CopySpec::new());
        let mut handler = DuplicateHandler::new();
        handler.check(&detail("a", &spec)).unwrap();
        let err = handler.check(&detail("a", &spec)).unwrap_err();
        assert!(matches!(err, CopySpecError::DuplicateEntry { ref path, .. } if path == "a"));
        assert!(err.to_string().contains("duplicates strategy"));
    }

    #[test]
    fn test_exclude_skips_duplicate() {
        let spec = Arc::new(CopySpec::new().with_duplicates(DuplicatesStrategy::Exclude));
        let mut handler = DuplicateHandler::new();
        assert_eq!(handler.check(&detail("a", &spec)).unwrap(), DuplicateDecision::Copy);
        assert_eq!(handler.check(&detail("a", &spec)).unwrap(), DuplicateDecision::Skip);
    }

    #[test]
    fn test_per_detail_strategy() {
        let spec = Arc::new(CopySpec::new());
        let mut handler = DuplicateHandler::new();
        handler.check(&detail("a", &spec)).unwrap();

        let mut warn = detail("a", &spec);
        warn.set_duplicates_strategy(DuplicatesStrategy::Warn);
        assert_eq!(handler.check(&warn).unwrap(), DuplicateDecision::Copy);

        let mut include = detail("a", &spec);
        include.set_duplicates_strategy(DuplicatesStrategy::Include);
        assert_eq!(handler.check(&include).unwrap(), DuplicateDecision::Copy);

        let mut fail = detail("a", &spec);
        fail.set_duplicates_strategy(DuplicatesStrategy::Fail);
        assert!(handler.check(&fail).is_err());
    }

    #[test]
    fn test_directories_are_never_duplicates() {
        let spec = Arc::new(CopySpec::new());
        let mut handler = DuplicateHandler::new();
        for _ in 0..2 {
            let dir = CopyDetail::new(
                Box::new(MemoryElement::dir("d")),
                spec.clone(),
                Platform::default(),
            );
            assert_eq!(handler.check(&dir).unwrap(), DuplicateDecision::Copy);
        }
    }

    #[test]
    fn test_strategy_parses_from_json() {
        let strategy: DuplicatesStrategy = serde_json::from_str("\"exclude\"").unwrap();
        assert_eq!(strategy, DuplicatesStrategy::Exclude);
    }
}
