//! Source tree walker
//!
//! Walks a directory depth-first, parents before children, and hands each
//! visited entry to a callback as a [`FileTreeElement`]. Include and exclude
//! glob patterns apply to files; directories are always visited so that
//! their contents can match.

use crate::copy::{RelativePath, SourceElement};
use crate::error::{CopySpecError, IoResultExt, Result};
use crate::fs::FileCopier;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// A file or directory found on disk
#[derive(Debug, Clone)]
pub struct FileTreeElement {
    path: PathBuf,
    relative_path: RelativePath,
    is_dir: bool,
    size: u64,
    modified: Option<SystemTime>,
    mode: Option<u32>,
    stop: Arc<AtomicBool>,
}

impl FileTreeElement {
    /// Read metadata for `path`, relative to `source_root`
    pub fn from_path(path: &Path, source_root: &Path, stop: Arc<AtomicBool>) -> Result<Self> {
        let metadata = std::fs::metadata(path).with_path(path)?;
        let is_dir = metadata.is_dir();

        let relative = path.strip_prefix(source_root).unwrap_or(path);
        let segments: Vec<String> = if relative.as_os_str().is_empty() {
            path.file_name()
                .map(|name| vec![name.to_string_lossy().into_owned()])
                .unwrap_or_default()
        } else {
            relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect()
        };

        #[cfg(unix)]
        let mode = {
            use std::os::unix::fs::PermissionsExt;
            Some(metadata.permissions().mode() & 0o777)
        };

        #[cfg(not(unix))]
        let mode = None;

        Ok(Self {
            path: path.to_path_buf(),
            relative_path: RelativePath::new(!is_dir, segments),
            is_dir,
            size: if is_dir { 0 } else { metadata.len() },
            modified: metadata.modified().ok(),
            mode,
            stop,
        })
    }

    /// Absolute path on disk
    pub fn absolute_path(&self) -> &Path {
        &self.path
    }
}

impl SourceElement for FileTreeElement {
    fn name(&self) -> &str {
        self.relative_path.last_name().unwrap_or("")
    }

    fn relative_path(&self) -> &RelativePath {
        &self.relative_path
    }

    fn is_directory(&self) -> bool {
        self.is_dir
    }

    fn last_modified(&self) -> Option<SystemTime> {
        self.modified
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn mode(&self) -> Option<u32> {
        self.mode
    }

    fn file(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn open(&self) -> Result<Box<dyn Read + Send>> {
        if self.is_dir {
            return Err(CopySpecError::unsupported(format!(
                "cannot open directory '{}'",
                self.path.display()
            )));
        }
        let file = File::open(&self.path).with_path(&self.path)?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn copy_to_file(&self, target: &Path) -> Result<bool> {
        if self.is_dir {
            std::fs::create_dir_all(target).with_path(target)?;
        } else {
            FileCopier::default().copy_file(&self.path, target)?;
        }
        Ok(true)
    }

    fn stop_visiting(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    fn display_name(&self) -> String {
        if self.is_dir {
            format!("directory '{}'", self.path.display())
        } else {
            format!("file '{}'", self.path.display())
        }
    }
}

/// Configuration for a walk
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    /// Follow symbolic links
    pub follow_symlinks: bool,
    /// Include hidden files
    pub include_hidden: bool,
    /// Include patterns
    pub include_patterns: Vec<String>,
    /// Exclude patterns
    pub exclude_patterns: Vec<String>,
}

/// Totals of one walk
#[derive(Debug, Clone, Default)]
pub struct ScanStats {
    /// Files handed to the callback
    pub files: usize,
    /// Directories handed to the callback
    pub directories: usize,
    /// Entries that could not be read
    pub errors: Vec<String>,
    /// Whether an element asked the walk to stop
    pub stopped: bool,
    /// Walk duration
    pub duration: Duration,
}

/// Directory walker
pub struct Scanner {
    config: ScanConfig,
    include_matcher: GlobSet,
    exclude_matcher: GlobSet,
}

impl Scanner {
    /// Create a new scanner with the given configuration
    pub fn new(config: ScanConfig) -> Result<Self> {
        let include_matcher = Self::build_globset(&config.include_patterns)?;
        let exclude_matcher = Self::build_globset(&config.exclude_patterns)?;

        Ok(Self {
            config,
            include_matcher,
            exclude_matcher,
        })
    }

    /// Build a GlobSet from patterns
    fn build_globset(patterns: &[String]) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| {
                CopySpecError::config(format!("Invalid glob pattern '{}': {}", pattern, e))
            })?;
            builder.add(glob);
        }
        builder
            .build()
            .map_err(|e| CopySpecError::config(format!("Failed to build glob set: {}", e)))
    }

    /// Walk `root` and call `visitor` for every matching element
    ///
    /// When `root` is a file it is visited on its own. The walk ends early
    /// once an element's `stop_visiting` was called or the visitor fails.
    pub fn visit<F>(&self, root: &Path, mut visitor: F) -> Result<ScanStats>
    where
        F: FnMut(FileTreeElement) -> Result<()>,
    {
        let start_time = Instant::now();

        if !root.exists() {
            return Err(CopySpecError::NotFound(root.to_path_buf()));
        }

        let stop = Arc::new(AtomicBool::new(false));
        let mut stats = ScanStats::default();

        if root.is_file() {
            let parent = root.parent().unwrap_or(root);
            let element = FileTreeElement::from_path(root, parent, stop.clone())?;
            stats.files += 1;
            visitor(element)?;
            stats.stopped = stop.load(Ordering::SeqCst);
            stats.duration = start_time.elapsed();
            return Ok(stats);
        }

        let walker = WalkDir::new(root)
            .follow_links(self.config.follow_symlinks)
            .min_depth(1)
            .sort_by_file_name();

        let include_hidden = self.config.include_hidden;
        let entries = walker
            .into_iter()
            .filter_entry(|entry| include_hidden || !Self::is_hidden(entry));

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Skipping unreadable entry: {}", err);
                    stats.errors.push(err.to_string());
                    continue;
                }
            };

            let element = match FileTreeElement::from_path(entry.path(), root, stop.clone()) {
                Ok(element) => element,
                Err(err) => {
                    warn!("{}", err);
                    stats.errors.push(err.to_string());
                    continue;
                }
            };

            if element.is_dir {
                stats.directories += 1;
            } else if self.matches(element.relative_path()) {
                stats.files += 1;
            } else {
                continue;
            }

            visitor(element)?;

            if stop.load(Ordering::SeqCst) {
                debug!("Walk of {} stopped after {}", root.display(), entry.path().display());
                stats.stopped = true;
                break;
            }
        }

        stats.duration = start_time.elapsed();
        Ok(stats)
    }

    fn matches(&self, path: &RelativePath) -> bool {
        let path_str = path.path_string();

        if !self.include_matcher.is_empty() && !self.include_matcher.is_match(&path_str) {
            return false;
        }

        !self.exclude_matcher.is_match(&path_str)
    }

    /// Check if an entry is hidden
    fn is_hidden(entry: &DirEntry) -> bool {
        entry
            .file_name()
            .to_str()
            .map(|s| s.starts_with('.'))
            .unwrap_or(false)
    }
}
