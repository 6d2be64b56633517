//! Main copy engine
//!
//! Walks every source tree, wraps each element in a [`CopyDetail`], runs the
//! duplicate merge step and copies the survivors with a rayon pool.

use crate::config::CopyConfig;
use crate::copy::{
    CopyDetail, CopySpec, CopySpecResolver, DuplicateDecision, DuplicateHandler, Platform,
};
use crate::error::{CopySpecError, Result};
use crate::filter::FilterChain;
use crate::fs::{CopyOptions, FileCopier, Scanner};
use rayon::prelude::*;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Copy operation result
#[derive(Debug, Default)]
pub struct CopyResult {
    /// Total files copied
    pub files_copied: u64,
    /// Total bytes written
    pub bytes_copied: u64,
    /// Directories created and stamped
    pub dirs_created: u64,
    /// Elements left out by the duplicate strategy
    pub skipped: u64,
    /// Failed operations
    pub failures: Vec<(String, String)>,
    /// Total duration
    pub duration: Duration,
    /// Average throughput in bytes/second
    pub throughput: f64,
    /// Nothing was written
    pub dry_run: bool,
}

impl CopyResult {
    /// Check if the copy was completely successful
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Print summary to console
    pub fn print_summary(&self) {
        if self.dry_run {
            println!("\n=== Dry Run Summary ===");
        } else {
            println!("\n=== Copy Summary ===");
        }
        println!("Files copied:    {}", self.files_copied);
        println!("Bytes copied:    {}", humansize::format_size(self.bytes_copied, humansize::BINARY));
        println!("Directories:     {}", self.dirs_created);
        println!("Skipped:         {}", self.skipped);
        println!("Duration:        {:.2?}", self.duration);
        println!("Throughput:      {}/s", humansize::format_size(self.throughput as u64, humansize::BINARY));

        if !self.failures.is_empty() {
            println!("\nFailures: {}", self.failures.len());
            for (path, error) in &self.failures {
                println!("  {} - {}", path, error);
            }
        }
    }
}

/// Main copy engine
pub struct CopyEngine {
    /// Configuration
    config: CopyConfig,
    /// Defaults shared by all details
    spec: Arc<CopySpec>,
    /// Filters applied to every file
    filters: FilterChain,
    /// Chmod primitive and default modes
    platform: Platform,
    /// Cancellation flag
    cancelled: Arc<AtomicBool>,
}

impl CopyEngine {
    /// Create a new copy engine
    pub fn new(config: CopyConfig) -> Result<Self> {
        let spec = Arc::new(config.copy_spec()?);
        let filters = config.filter_chain()?;
        let copier = FileCopier::new(CopyOptions {
            buffer_size: config.buffer_size,
        });
        let platform = Platform::with_modes(config.platform).with_copier(copier);

        Ok(Self {
            config,
            spec,
            filters,
            platform,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Replace the platform services
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Get cancellation flag for external control
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Cancel the operation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancelled
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Execute the copy operation
    pub fn execute(&self) -> Result<CopyResult> {
        let start_time = Instant::now();

        let (details, skipped) = self.collect_details()?;
        let (directories, files): (Vec<CopyDetail>, Vec<CopyDetail>) =
            details.into_iter().partition(CopyDetail::is_directory);
        let directories = self.retain_directories(directories, &files);

        info!(
            "Copying {} files and {} directories into {}",
            files.len(),
            directories.len(),
            self.config.destination.display()
        );

        let mut result = CopyResult {
            skipped,
            dry_run: self.config.dry_run,
            ..Default::default()
        };

        self.copy_files(files, &mut result)?;
        self.copy_directories(directories, &mut result)?;

        result.duration = start_time.elapsed();
        let seconds = result.duration.as_secs_f64();
        result.throughput = if seconds > 0.0 {
            result.bytes_copied as f64 / seconds
        } else {
            0.0
        };

        Ok(result)
    }

    /// Walk all sources and run the duplicate merge step
    fn collect_details(&self) -> Result<(Vec<CopyDetail>, u64)> {
        let scanner = Scanner::new(self.config.scan_config())?;
        let mut handler = DuplicateHandler::new();
        let mut details = Vec::new();
        let mut skipped = 0u64;

        for source in &self.config.sources {
            if self.is_cancelled() {
                return Err(CopySpecError::Cancelled);
            }

            let stats = scanner.visit(source, |element| {
                let mut detail =
                    CopyDetail::new(Box::new(element), self.spec.clone(), self.platform.clone());
                if !detail.is_directory() {
                    detail.filter_chain(&self.filters);
                }

                match handler.check(&detail)? {
                    DuplicateDecision::Copy => details.push(detail),
                    DuplicateDecision::Skip => {
                        detail.exclude();
                        skipped += 1;
                    }
                }

                if self.is_cancelled() {
                    if let Some(last) = details.last() {
                        last.stop_visiting();
                    }
                }
                Ok(())
            })?;

            debug!(
                "Visited {}: {} files, {} directories in {:.2?}",
                source.display(),
                stats.files,
                stats.directories,
                stats.duration
            );
            for error in stats.errors {
                warn!("Error while walking {}: {}", source.display(), error);
            }
            if stats.stopped && self.is_cancelled() {
                return Err(CopySpecError::Cancelled);
            }
        }

        Ok((details, skipped))
    }

    /// Drop directories that hold no file unless empty directories are wanted
    fn retain_directories(&self, directories: Vec<CopyDetail>, files: &[CopyDetail]) -> Vec<CopyDetail> {
        if self.spec.include_empty_dirs() {
            return directories;
        }

        let mut occupied = HashSet::new();
        for file in files {
            let segments = file.relative_path().segments();
            for end in 1..segments.len() {
                occupied.insert(segments[..end].join("/"));
            }
        }

        directories
            .into_iter()
            .filter(|dir| occupied.contains(&dir.path()))
            .collect()
    }

    fn target(&self, detail: &CopyDetail) -> PathBuf {
        self.config.destination.join(detail.relative_path().to_path_buf())
    }

    /// Copy files in parallel using rayon
    fn copy_files(&self, files: Vec<CopyDetail>, result: &mut CopyResult) -> Result<()> {
        let threads = if self.config.threads == 0 {
            num_cpus::get()
        } else {
            self.config.threads
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| CopySpecError::config(format!("Failed to build thread pool: {}", e)))?;

        let cancelled = &self.cancelled;
        let outcomes: Vec<(String, Result<u64>)> = pool.install(|| {
            group_by_destination(files)
                .into_par_iter()
                .flat_map_iter(|group| {
                    // one destination per group, copied in visit order so the last one wins
                    group.into_iter().filter_map(move |detail| {
                        if cancelled.load(Ordering::SeqCst) {
                            return None;
                        }
                        let outcome = self.copy_single_file(&detail);
                        Some((detail.path(), outcome))
                    })
                })
                .collect()
        });

        for (path, outcome) in outcomes {
            match outcome {
                Ok(bytes) => {
                    result.files_copied += 1;
                    result.bytes_copied += bytes;
                }
                Err(e) => {
                    if self.config.continue_on_error {
                        result.failures.push((path, e.to_string()));
                    } else {
                        return Err(e);
                    }
                }
            }
        }

        Ok(())
    }

    /// Copy a single file
    fn copy_single_file(&self, detail: &CopyDetail) -> Result<u64> {
        let target = self.target(detail);

        if self.config.dry_run {
            let size = detail.get_size()?;
            info!(
                "Would copy {} -> {} (mode {:03o}, {} bytes)",
                detail.source_path(),
                target.display(),
                detail.get_mode(),
                size
            );
            return Ok(size);
        }

        detail.copy_to_file(&target)?;
        let bytes = std::fs::metadata(&target)
            .map(|m| m.len())
            .map_err(|e| CopySpecError::io(&target, e))?;
        debug!("Copied {} -> {} ({} bytes)", detail.source_path(), target.display(), bytes);
        Ok(bytes)
    }

    /// Create and stamp directories, deepest first
    ///
    /// Files are already in place, so a directory mode without write
    /// permission cannot block them.
    fn copy_directories(&self, mut directories: Vec<CopyDetail>, result: &mut CopyResult) -> Result<()> {
        directories.sort_by_key(|dir| std::cmp::Reverse(dir.relative_path().segments().len()));

        for detail in directories {
            let target = self.target(&detail);
            if self.config.dry_run {
                info!("Would create {} (mode {:03o})", target.display(), detail.get_mode());
                result.dirs_created += 1;
                continue;
            }

            match detail.copy_to_file(&target) {
                Ok(_) => result.dirs_created += 1,
                Err(e) if self.config.continue_on_error => {
                    result.failures.push((detail.path(), e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }
}

/// Group details sharing a destination path, keeping visit order
fn group_by_destination(files: Vec<CopyDetail>) -> Vec<Vec<CopyDetail>> {
    let mut groups: Vec<Vec<CopyDetail>> = Vec::with_capacity(files.len());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(files.len());

    for detail in files {
        match index.entry(detail.path()) {
            Entry::Occupied(slot) => groups[*slot.get()].push(detail),
            Entry::Vacant(slot) => {
                slot.insert(groups.len());
                groups.push(vec![detail]);
            }
        }
    }

    groups
}

/// Copy `source` into `dest` with default settings
pub fn simple_copy(source: &Path, dest: &Path) -> Result<CopyResult> {
    let config = CopyConfig {
        sources: vec![source.to_path_buf()],
        destination: dest.to_path_buf(),
        ..Default::default()
    };

    CopyEngine::new(config)?.execute()
}
