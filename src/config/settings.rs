//! Configuration settings for copyspec
//!
//! Defines the CLI arguments, the JSON copy specification file and the
//! resolved runtime configuration.

use crate::copy::{CopySpec, DuplicatesStrategy};
use crate::error::{CopySpecError, IoResultExt, Result};
use crate::filter::{FilterChain, FilterKind, FilterParams, FilteringCharset};
use crate::fs::ScanConfig;
use crate::permissions::{PermissionSet, PlatformModes};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// copyspec - copy a file tree with filters, path remapping and Unix modes
#[derive(Parser, Debug, Clone)]
#[command(name = "copyspec")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Copy file trees with content filters and Unix permission control")]
#[command(long_about = r##"
copyspec copies one or more source trees into a destination directory.

For every element it can:
  - filter the content line by line (token replacement, templates, ...)
  - place it under a destination prefix
  - stamp Unix permissions given in octal ("644") or symbolic ("rw-r--r--") form
  - resolve duplicate destinations (include, exclude, warn, fail)

Examples:
  copyspec src/ build/                                   # Plain copy
  copyspec conf/ dist/ --into etc --file-mode 640        # Prefix and mode
  copyspec tpl/ out/ --expand version=1.2                # Template expansion
  copyspec a/ out/ --from b/ --duplicates warn           # Merge two trees
  copyspec src/ out/ --filter 'prefix-lines={"prefix":"# "}'
"##)]
pub struct CliArgs {
    /// Source directory or file
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Destination directory
    #[arg(value_name = "DESTINATION")]
    pub destination: PathBuf,

    /// Additional source trees merged into the same destination
    #[arg(long, value_name = "PATH")]
    pub from: Vec<PathBuf>,

    /// JSON copy specification file
    #[arg(long, value_name = "PATH", env = "COPYSPEC_SPEC")]
    pub spec: Option<PathBuf>,

    /// Destination prefix, '/'-separated
    #[arg(long, value_name = "PREFIX")]
    pub into: Option<String>,

    /// Mode for copied files ("644" or "rw-r--r--")
    #[arg(long, value_name = "MODE")]
    pub file_mode: Option<String>,

    /// Mode for copied directories ("755" or "rwxr-xr-x")
    #[arg(long, value_name = "MODE")]
    pub dir_mode: Option<String>,

    /// Strategy for duplicate destination paths
    #[arg(long, value_enum, value_name = "STRATEGY")]
    pub duplicates: Option<DuplicatesStrategy>,

    /// Copy empty directories
    #[arg(long)]
    pub include_empty_dirs: bool,

    /// Charset used by content filters
    #[arg(long, value_enum, value_name = "CHARSET")]
    pub charset: Option<FilteringCharset>,

    /// Content filter NAME or NAME=JSON-PARAMS (repeatable, applied in order)
    #[arg(long, value_name = "FILTER")]
    pub filter: Vec<FilterSpec>,

    /// Template property KEY=VALUE for $name / ${name} expansion (repeatable)
    #[arg(short = 'e', long, value_name = "KEY=VALUE")]
    pub expand: Vec<String>,

    /// Keep backslashes literal during template expansion
    #[arg(long)]
    pub escape_backslash: bool,

    /// File pattern to include (glob)
    #[arg(long, value_name = "PATTERN")]
    pub include: Vec<String>,

    /// File pattern to exclude (glob)
    #[arg(long, value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Include hidden files
    #[arg(long)]
    pub include_hidden: bool,

    /// Follow symbolic links
    #[arg(short = 'L', long)]
    pub follow_symlinks: bool,

    /// Number of parallel threads (0 = auto-detect)
    #[arg(short = 't', long, default_value = "0", value_name = "NUM")]
    pub threads: usize,

    /// Buffer size for filtered copies (e.g., 1M, 64K)
    #[arg(short = 'b', long, default_value = "64K", value_name = "SIZE")]
    pub buffer_size: String,

    /// Continue on errors (don't abort)
    #[arg(long)]
    pub continue_on_error: bool,

    /// Dry run (show what would be copied)
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

/// A filter kind with its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Registered filter name
    pub kind: FilterKind,
    /// Filter parameters
    #[serde(default)]
    pub params: FilterParams,
}

impl FromStr for FilterSpec {
    type Err = CopySpecError;

    /// Parse `name` or `name=<json object>`
    fn from_str(s: &str) -> Result<Self> {
        let (name, params) = match s.split_once('=') {
            Some((name, json)) => (name, serde_json::from_str(json.trim())?),
            None => (s, FilterParams::default()),
        };
        Ok(Self {
            kind: name.parse()?,
            params,
        })
    }
}

/// Platform default modes as written in a specification file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlatformConfig {
    /// Default file mode
    pub file_mode: Option<String>,
    /// Default directory mode
    pub dir_mode: Option<String>,
}

/// Copy specification file contents
///
/// ```json
/// {
///   "into": "etc/app",
///   "file_mode": "rw-r-----",
///   "duplicates": "warn",
///   "filters": [{ "kind": "replace-tokens", "params": { "tokens": { "v": "1.0" } } }],
///   "expand": { "name": "app" },
///   "platform": { "dir_mode": "750" }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CopySpecConfig {
    /// Destination prefix
    pub into: Option<String>,
    /// File mode
    pub file_mode: Option<String>,
    /// Directory mode
    pub dir_mode: Option<String>,
    /// Duplicate strategy
    pub duplicates: Option<DuplicatesStrategy>,
    /// Copy empty directories
    pub include_empty_dirs: Option<bool>,
    /// Filter charset
    pub filtering_charset: Option<FilteringCharset>,
    /// Filters, applied in order before CLI filters
    pub filters: Vec<FilterSpec>,
    /// Template properties
    pub expand: BTreeMap<String, String>,
    /// Keep backslashes literal during expansion
    pub escape_backslash: Option<bool>,
    /// Include patterns
    pub include: Vec<String>,
    /// Exclude patterns
    pub exclude: Vec<String>,
    /// Platform default modes
    pub platform: PlatformConfig,
}

impl CopySpecConfig {
    /// Load a specification file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_path(path)?;
        serde_json::from_str(&text).map_err(|e| {
            CopySpecError::config(format!("Invalid specification '{}': {}", path.display(), e))
        })
    }
}

/// Runtime configuration derived from CLI args and the specification file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyConfig {
    /// Source trees, in merge order
    pub sources: Vec<PathBuf>,
    /// Destination path
    pub destination: PathBuf,
    /// Destination prefix
    pub into: Option<String>,
    /// File mode
    pub file_mode: Option<u32>,
    /// Directory mode
    pub dir_mode: Option<u32>,
    /// Duplicate strategy
    pub duplicates: Option<DuplicatesStrategy>,
    /// Copy empty directories
    pub include_empty_dirs: bool,
    /// Filter charset
    pub charset: FilteringCharset,
    /// Filters in order
    pub filters: Vec<FilterSpec>,
    /// Template properties; expansion runs after the filters when non-empty
    pub expand: BTreeMap<String, String>,
    /// Keep backslashes literal during expansion
    pub escape_backslash: bool,
    /// Platform default modes
    pub platform: PlatformModes,
    /// Include patterns
    pub include_patterns: Vec<String>,
    /// Exclude patterns
    pub exclude_patterns: Vec<String>,
    /// Include hidden files
    pub include_hidden: bool,
    /// Follow symlinks
    pub follow_symlinks: bool,
    /// Thread count
    pub threads: usize,
    /// Buffer size in bytes
    pub buffer_size: usize,
    /// Continue on error
    pub continue_on_error: bool,
    /// Dry run mode
    pub dry_run: bool,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            destination: PathBuf::new(),
            into: None,
            file_mode: None,
            dir_mode: None,
            duplicates: None,
            include_empty_dirs: false,
            charset: FilteringCharset::default(),
            filters: Vec::new(),
            expand: BTreeMap::new(),
            escape_backslash: false,
            platform: PlatformModes::default(),
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            include_hidden: false,
            follow_symlinks: false,
            threads: 0, // Auto-detect
            buffer_size: 64 * 1024,
            continue_on_error: false,
            dry_run: false,
        }
    }
}

/// Parse human-readable size string to bytes
pub fn parse_size(size: &str) -> std::result::Result<u64, String> {
    let size = size.trim().to_uppercase();

    if size.is_empty() {
        return Err("Empty size string".to_string());
    }

    let (num_str, multiplier) = if size.ends_with("GB") || size.ends_with('G') {
        (size.trim_end_matches(|c| c == 'G' || c == 'B'), 1024u64 * 1024 * 1024)
    } else if size.ends_with("MB") || size.ends_with('M') {
        (size.trim_end_matches(|c| c == 'M' || c == 'B'), 1024u64 * 1024)
    } else if size.ends_with("KB") || size.ends_with('K') {
        (size.trim_end_matches(|c| c == 'K' || c == 'B'), 1024u64)
    } else if size.ends_with('B') {
        (size.trim_end_matches('B'), 1u64)
    } else {
        // Assume bytes if no suffix
        (size.as_str(), 1u64)
    };

    let num: f64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("Invalid number: {}", num_str))?;

    Ok((num * multiplier as f64) as u64)
}

/// Parse a mode in octal or symbolic notation
pub fn parse_mode(text: &str) -> Result<u32> {
    Ok(PermissionSet::parse_unix(text)?.to_numeric())
}

fn parse_property(pair: &str) -> Result<(String, String)> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(CopySpecError::config(format!(
            "Invalid property '{}', expected KEY=VALUE",
            pair
        ))),
    }
}

fn parse_optional_mode(text: Option<&str>) -> Result<Option<u32>> {
    text.map(parse_mode).transpose()
}

impl CopyConfig {
    /// Create config from CLI arguments, reading `--spec` when given
    pub fn from_cli(args: &CliArgs) -> Result<Self> {
        let file = match &args.spec {
            Some(path) => CopySpecConfig::load(path)?,
            None => CopySpecConfig::default(),
        };
        Self::from_parts(args, file)
    }

    /// Merge a specification file with CLI arguments; CLI values win
    pub fn from_parts(args: &CliArgs, file: CopySpecConfig) -> Result<Self> {
        let mut config = Self::default();

        config.sources = std::iter::once(args.source.clone())
            .chain(args.from.iter().cloned())
            .collect();
        config.destination = args.destination.clone();

        config.into = args.into.clone().or(file.into);
        config.file_mode =
            parse_optional_mode(args.file_mode.as_deref().or(file.file_mode.as_deref()))?;
        config.dir_mode =
            parse_optional_mode(args.dir_mode.as_deref().or(file.dir_mode.as_deref()))?;
        config.duplicates = args.duplicates.or(file.duplicates);
        config.include_empty_dirs =
            args.include_empty_dirs || file.include_empty_dirs.unwrap_or(false);
        config.charset = args
            .charset
            .or(file.filtering_charset)
            .unwrap_or_default();

        config.filters = file.filters;
        config.filters.extend(args.filter.iter().cloned());
        config.expand = file.expand;
        for pair in &args.expand {
            let (key, value) = parse_property(pair)?;
            config.expand.insert(key, value);
        }
        config.escape_backslash = args.escape_backslash || file.escape_backslash.unwrap_or(false);

        let defaults = PlatformModes::default();
        config.platform = PlatformModes {
            file_mode: parse_optional_mode(file.platform.file_mode.as_deref())?
                .unwrap_or(defaults.file_mode),
            dir_mode: parse_optional_mode(file.platform.dir_mode.as_deref())?
                .unwrap_or(defaults.dir_mode),
        };

        config.include_patterns = file.include;
        config.include_patterns.extend(args.include.iter().cloned());
        config.exclude_patterns = file.exclude;
        config.exclude_patterns.extend(args.exclude.iter().cloned());
        config.include_hidden = args.include_hidden;
        config.follow_symlinks = args.follow_symlinks;

        config.threads = args.threads;
        config.buffer_size = parse_size(&args.buffer_size)
            .map_err(|e| CopySpecError::config(format!("Invalid buffer size: {}", e)))?
            as usize;
        config.continue_on_error = args.continue_on_error;
        config.dry_run = args.dry_run;

        Ok(config)
    }

    /// Specification defaults shared by every copy detail
    pub fn copy_spec(&self) -> Result<CopySpec> {
        let mut spec = CopySpec::new()
            .with_include_empty_dirs(self.include_empty_dirs)
            .with_charset(self.charset);
        if let Some(prefix) = &self.into {
            spec = spec.with_prefix(prefix);
        }
        if let Some(strategy) = self.duplicates {
            spec = spec.with_duplicates(strategy);
        }
        if let Some(mode) = self.file_mode {
            spec = spec.with_file_mode(mode)?;
        }
        if let Some(mode) = self.dir_mode {
            spec = spec.with_dir_mode(mode)?;
        }
        Ok(spec)
    }

    /// Filter stages applied to every file
    pub fn filter_chain(&self) -> Result<FilterChain> {
        let mut chain = FilterChain::new(self.charset);
        for filter in &self.filters {
            chain.add_filter(filter.kind, &filter.params)?;
        }
        if !self.expand.is_empty() {
            chain.expand(self.expand.clone(), self.escape_backslash);
        }
        Ok(chain)
    }

    /// Walker configuration
    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            follow_symlinks: self.follow_symlinks,
            include_hidden: self.include_hidden,
            include_patterns: self.include_patterns.clone(),
            exclude_patterns: self.exclude_patterns.clone(),
        }
    }
}
