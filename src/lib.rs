//! # copyspec - File-copy pipeline with filters and Unix permissions
//!
//! copyspec copies the elements of a source tree to a destination and
//! decides, per element, what ends up on disk:
//!
//! - **Content filters**: line transforms, token replacement, template
//!   expansion and other streaming stages, applied lazily while reading
//! - **Path remapping**: destination prefixes, renames and moves
//! - **Unix permissions**: octal (`"644"`) and symbolic (`"rw-r--r--"`)
//!   modes with a layered precedence between overrides, specification
//!   defaults, source modes and platform defaults
//! - **Duplicate handling**: include, exclude, warn or fail when two
//!   elements land on the same path
//!
//! ## Quick Start
//!
//! ```no_run
//! use copyspec::core::simple_copy;
//! use std::path::Path;
//!
//! let result = simple_copy(Path::new("/source"), Path::new("/destination")).unwrap();
//! println!("Copied {} files ({} bytes)", result.files_copied, result.bytes_copied);
//! ```
//!
//! ## Per-element details
//!
//! ```no_run
//! use copyspec::copy::{CopyDetail, CopySpec, Platform};
//! use copyspec::fs::{ScanConfig, Scanner};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let spec = Arc::new(CopySpec::new().with_prefix("etc").with_file_mode(0o640)?);
//! let scanner = Scanner::new(ScanConfig::default())?;
//! scanner.visit(Path::new("conf"), |element| {
//!     let mut detail = CopyDetail::new(Box::new(element), spec.clone(), Platform::default());
//!     if !detail.is_directory() {
//!         detail.filter(|line| Some(line.replace("@env@", "prod")));
//!         detail.copy_to_file(&Path::new("out").join(detail.relative_path().to_path_buf()))?;
//!     }
//!     Ok(())
//! })?;
//! # Ok::<(), copyspec::CopySpecError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod copy;
pub mod core;
pub mod error;
pub mod filter;
pub mod fs;
pub mod permissions;
pub mod properties;

// Re-export commonly used types
pub use config::CopyConfig;
pub use copy::{CopyDetail, CopySpec, DuplicatesStrategy, RelativePath};
pub use core::{CopyEngine, CopyResult};
pub use error::{CopySpecError, Result};
pub use filter::{FilterChain, FilterKind, FilteringCharset};
pub use permissions::{PermissionSet, PermissionValue};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    //! Convenient re-exports for common usage
    //!
    //! ```no_run
    //! use copyspec::prelude::*;
    //! ```

    pub use crate::config::{CopyConfig, CopySpecConfig};
    pub use crate::copy::{
        CopyDetail, CopySpec, CopySpecResolver, DuplicateHandler, DuplicatesStrategy, Platform,
        RelativePath, SourceElement,
    };
    pub use crate::core::{simple_copy, CopyEngine, CopyResult};
    pub use crate::error::{CopySpecError, Result};
    pub use crate::filter::{FilterChain, FilterKind, FilterParams, FilteringCharset};
    pub use crate::fs::{FileTreeElement, ScanConfig, Scanner};
    pub use crate::permissions::{Chmod, PermissionSet, PermissionValue, PlatformModes};
}
