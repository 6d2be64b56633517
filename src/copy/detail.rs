//! Per-element copy details
//!
//! A [`CopyDetail`] wraps one visited source element and decides what is
//! actually written: the destination path, the filtered content and the
//! permission bits stamped on the result.
//!
//! Mode resolution walks four tiers and the first present one wins:
//!
//! 1. a permission override installed on the detail,
//! 2. the directory or file mode of the copy specification,
//! 3. the mode reported by the source element,
//! 4. the platform default for the element kind.
//!
//! Reading an override through [`CopyDetail::get_mode`] finalizes it. From
//! then on neither the permission set nor the override slot can change.

use crate::copy::{CopySpecResolver, DuplicatesStrategy, RelativePath, SourceElement};
use crate::error::{CopySpecError, IoResultExt, Result};
use crate::filter::{ExpandDetails, FilterChain, FilterKind, FilterParams, FilteredReader};
use crate::fs::FileCopier;
use crate::permissions::{Chmod, PermissionSet, PlatformModes, PosixChmod};
use crate::properties::collect_properties;
use std::cell::{Cell, OnceCell};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

/// Platform services a detail depends on
#[derive(Clone)]
pub struct Platform {
    chmod: Arc<dyn Chmod>,
    modes: PlatformModes,
    copier: FileCopier,
}

impl Platform {
    /// Create from a chmod primitive and default modes
    pub fn new(chmod: Arc<dyn Chmod>, modes: PlatformModes) -> Self {
        Self {
            chmod,
            modes,
            copier: FileCopier::default(),
        }
    }

    /// Standard chmod with the given default modes
    pub fn with_modes(modes: PlatformModes) -> Self {
        Self::new(Arc::new(PosixChmod), modes)
    }

    /// Use `copier` for filtered content
    pub fn with_copier(mut self, copier: FileCopier) -> Self {
        self.copier = copier;
        self
    }

    /// Permission stamping primitive
    pub fn chmod(&self) -> &dyn Chmod {
        self.chmod.as_ref()
    }

    /// Default modes
    pub fn modes(&self) -> &PlatformModes {
        &self.modes
    }

    /// Stream copier for filtered content
    pub fn copier(&self) -> &FileCopier {
        &self.copier
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::with_modes(PlatformModes::default())
    }
}

impl fmt::Debug for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Platform")
            .field("modes", &self.modes)
            .field("buffer_size", &self.copier.options().buffer_size)
            .finish()
    }
}

/// One source element on its way to the destination
pub struct CopyDetail {
    source: Box<dyn SourceElement>,
    spec: Arc<dyn CopySpecResolver>,
    platform: Platform,
    filters: FilterChain,
    permissions: Option<PermissionSet>,
    override_frozen: Cell<bool>,
    relative_path: OnceCell<RelativePath>,
    duplicates_strategy: DuplicatesStrategy,
    default_duplicates_strategy: bool,
    excluded: bool,
}

impl CopyDetail {
    /// Wrap a source element, inheriting defaults from `spec`
    pub fn new(
        source: Box<dyn SourceElement>,
        spec: Arc<dyn CopySpecResolver>,
        platform: Platform,
    ) -> Self {
        Self {
            filters: FilterChain::new(spec.filtering_charset()),
            duplicates_strategy: spec.duplicates_strategy(),
            default_duplicates_strategy: spec.is_default_duplicates_strategy(),
            source,
            spec,
            platform,
            permissions: None,
            override_frozen: Cell::new(false),
            relative_path: OnceCell::new(),
            excluded: false,
        }
    }

    // --- paths ---

    /// Destination path relative to the copy root
    ///
    /// Computed from the specification prefix and the source path on first
    /// access and cached until replaced.
    pub fn relative_path(&self) -> &RelativePath {
        self.relative_path.get_or_init(|| {
            self.spec
                .dest_path()
                .append_path(self.source.relative_path())
        })
    }

    /// Replace the destination path
    pub fn set_relative_path(&mut self, path: RelativePath) {
        self.relative_path = OnceCell::from(path);
    }

    /// Rename the final destination segment
    pub fn set_name(&mut self, name: &str) {
        let renamed = self.relative_path().replace_last_name(name);
        self.set_relative_path(renamed);
    }

    /// Replace the destination path with a `/`-separated path
    pub fn set_path(&mut self, path: &str) {
        let parsed = RelativePath::parse(self.relative_path().is_file(), path);
        self.set_relative_path(parsed);
    }

    /// Destination name
    pub fn name(&self) -> &str {
        self.relative_path().last_name().unwrap_or("")
    }

    /// Destination path as a string
    pub fn path(&self) -> String {
        self.relative_path().path_string()
    }

    // --- source accessors ---

    /// Source name
    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Source path relative to the walk root
    pub fn source_path(&self) -> String {
        self.source.path()
    }

    /// Source relative path
    pub fn relative_source_path(&self) -> &RelativePath {
        self.source.relative_path()
    }

    /// Whether the source is a directory
    pub fn is_directory(&self) -> bool {
        self.source.is_directory()
    }

    /// Source modification time
    pub fn last_modified(&self) -> Option<SystemTime> {
        self.source.last_modified()
    }

    /// Description of the source for messages
    pub fn display_name(&self) -> String {
        self.source.display_name()
    }

    /// Whether empty directories are copied
    pub fn include_empty_dirs(&self) -> bool {
        self.spec.include_empty_dirs()
    }

    /// Ask the walker to stop once this element is done
    pub fn stop_visiting(&self) {
        self.source.stop_visiting();
    }

    // --- exclusion and duplicates ---

    /// Leave this element out of the copy
    pub fn exclude(&mut self) {
        self.excluded = true;
    }

    /// Whether the element was excluded
    pub fn is_excluded(&self) -> bool {
        self.excluded
    }

    /// Override the duplicate strategy inherited from the specification
    pub fn set_duplicates_strategy(&mut self, strategy: DuplicatesStrategy) {
        self.duplicates_strategy = strategy;
        self.default_duplicates_strategy = strategy == DuplicatesStrategy::Inherit;
    }

    /// Current duplicate strategy
    pub fn duplicates_strategy(&self) -> DuplicatesStrategy {
        self.duplicates_strategy
    }

    /// Whether the strategy is still the inherited default
    pub fn is_default_duplicates_strategy(&self) -> bool {
        self.default_duplicates_strategy
    }

    // --- permissions ---

    /// Resolved permission bits
    pub fn get_mode(&self) -> u32 {
        if let Some(permissions) = &self.permissions {
            self.override_frozen.set(true);
            return permissions.to_numeric();
        }

        let is_directory = self.is_directory();
        let spec_mode = if is_directory {
            self.spec.dir_mode()
        } else {
            self.spec.file_mode()
        };

        spec_mode
            .or_else(|| self.source.mode().map(|mode| mode & 0o777))
            .unwrap_or_else(|| self.platform.modes().default_mode(is_directory))
    }

    /// Installed permission override, if any
    pub fn get_permissions(&self) -> Option<&PermissionSet> {
        self.permissions.as_ref()
    }

    /// Install a permission override
    pub fn set_permissions(&mut self, permissions: PermissionSet) -> Result<&mut Self> {
        if self.override_frozen.get() {
            return Err(CopySpecError::PermissionFrozen(format!(
                "permissions of {} were already used and cannot be replaced",
                self.display_name()
            )));
        }
        debug!(
            "Permission override for {}: {:?}",
            self.display_name(),
            collect_properties(&permissions)
        );
        self.permissions = Some(permissions);
        Ok(self)
    }

    /// Install an override from a numeric mode
    pub fn set_mode(&mut self, mode: u32) -> Result<&mut Self> {
        let permissions = PermissionSet::from_numeric(mode)?;
        self.set_permissions(permissions)
    }

    /// Configure an override starting from the platform default for this kind
    pub fn permissions<F>(&mut self, configure: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut PermissionSet) -> Result<()>,
    {
        let mut permissions =
            PermissionSet::default_for(self.is_directory(), self.platform.modes())?;
        configure(&mut permissions)?;
        self.set_permissions(permissions)
    }

    // --- filters ---

    /// Filters registered on this detail
    pub fn filters(&self) -> &FilterChain {
        &self.filters
    }

    /// Add a line transform; returning `None` drops the line
    pub fn filter<F>(&mut self, transform: F) -> &mut Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.filters.add_transformer(transform);
        self
    }

    /// Add a transform over the whole byte stream
    pub fn filter_reader<F>(&mut self, transform: F) -> &mut Self
    where
        F: Fn(FilteredReader) -> FilteredReader + Send + Sync + 'static,
    {
        self.filters.add_reader(transform);
        self
    }

    /// Add a parameterized filter with default parameters
    pub fn filter_kind(&mut self, kind: FilterKind) -> Result<&mut Self> {
        self.filters.add_kind(kind)?;
        Ok(self)
    }

    /// Add a parameterized filter
    pub fn filter_with(&mut self, kind: FilterKind, params: &FilterParams) -> Result<&mut Self> {
        self.filters.add_filter(kind, params)?;
        Ok(self)
    }

    /// Append every stage of a prepared chain
    pub fn filter_chain(&mut self, chain: &FilterChain) -> &mut Self {
        self.filters.extend_from(chain);
        self
    }

    /// Add template expansion
    pub fn expand(&mut self, properties: BTreeMap<String, String>) -> &mut Self {
        self.expand_with(properties, |_| {})
    }

    /// Add template expansion with options
    pub fn expand_with<F>(&mut self, properties: BTreeMap<String, String>, configure: F) -> &mut Self
    where
        F: FnOnce(&mut ExpandDetails),
    {
        self.filters.expand_with(properties, configure);
        self
    }

    // --- content ---

    /// Size of the content that will be written
    ///
    /// With filters attached this runs a full filtered pass; memoize the result.
    pub fn get_size(&self) -> Result<u64> {
        if !self.filters.has_filters() {
            return Ok(self.source.size());
        }
        let mut reader = self.open()?;
        io::copy(&mut reader, &mut io::sink()).map_err(|e| CopySpecError::io(self.source_path(), e))
    }

    /// Open the content as it will be written
    pub fn open(&self) -> Result<Box<dyn Read + Send>> {
        let input = self.source.open()?;
        if self.filters.has_filters() {
            Ok(self.filters.transform(input))
        } else {
            Ok(input)
        }
    }

    /// Backing file of an unfiltered element
    pub fn get_file(&self) -> Result<&Path> {
        if self.filters.has_filters() {
            return Err(CopySpecError::unsupported(format!(
                "{} has content filters and no file holding its final content",
                self.display_name()
            )));
        }
        self.source.file().ok_or_else(|| {
            CopySpecError::unsupported(format!("{} is not backed by a file", self.display_name()))
        })
    }

    /// Write the content to `output`, returning the byte count
    pub fn copy_to_writer(&self, output: &mut dyn Write) -> Result<u64> {
        self.ensure_included()?;
        if !self.filters.has_filters() {
            return self.source.copy_to_writer(output);
        }
        let mut reader = self.open()?;
        self.platform.copier().copy_stream(
            &mut reader,
            Path::new(&self.source_path()),
            output,
            &self.relative_path().to_path_buf(),
        )
    }

    /// Copy to `target` and stamp it with [`get_mode`](Self::get_mode)
    pub fn copy_to_file(&self, target: &Path) -> Result<bool> {
        self.ensure_included()?;
        let copied = if !self.filters.has_filters() {
            self.source.copy_to_file(target)?
        } else if self.is_directory() {
            std::fs::create_dir_all(target).with_path(target)?;
            true
        } else {
            let mut reader = self.open()?;
            self.platform
                .copier()
                .copy_reader(&mut reader, Path::new(&self.source_path()), target)?;
            true
        };

        self.platform.chmod().chmod(target, self.get_mode())?;
        Ok(copied)
    }

    fn ensure_included(&self) -> Result<()> {
        if self.excluded {
            return Err(CopySpecError::unsupported(format!(
                "{} was excluded from the copy",
                self.display_name()
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for CopyDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CopyDetail")
            .field("source", &self.source.display_name())
            .field("relative_path", &self.relative_path.get())
            .field("filters", &self.filters.len())
            .field("permissions", &self.permissions)
            .field("duplicates_strategy", &self.duplicates_strategy)
            .field("excluded", &self.excluded)
            .finish()
    }
}
