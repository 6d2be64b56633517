//! Read-only view of a source tree element

use crate::copy::RelativePath;
use crate::error::{CopySpecError, IoResultExt, Result};
use crate::fs::FileCopier;
use std::io::{Read, Write};
use std::path::Path;
use std::time::SystemTime;

/// An element visited by a tree walker
///
/// Implementations only describe and read the source; they never apply
/// filters or permissions. `CopyDetail` layers those on top.
pub trait SourceElement: Send {
    /// Final path segment
    fn name(&self) -> &str;

    /// Path relative to the walk root, `/`-separated
    fn path(&self) -> String {
        self.relative_path().path_string()
    }

    /// Path relative to the walk root
    fn relative_path(&self) -> &RelativePath;

    /// Whether the element is a directory
    fn is_directory(&self) -> bool;

    /// Modification time, if the source reports one
    fn last_modified(&self) -> Option<SystemTime>;

    /// Size in bytes as reported by the source
    fn size(&self) -> u64;

    /// Permission bits, if the source carries them
    fn mode(&self) -> Option<u32>;

    /// Backing file on disk, if any
    fn file(&self) -> Option<&Path>;

    /// Open the raw content
    fn open(&self) -> Result<Box<dyn Read + Send>>;

    /// Copy the raw content to `output`, returning the byte count
    fn copy_to_writer(&self, output: &mut dyn Write) -> Result<u64> {
        if self.is_directory() {
            return Err(CopySpecError::unsupported(format!(
                "cannot copy content of directory '{}'",
                self.display_name()
            )));
        }
        let mut input = self.open()?;
        std::io::copy(&mut input, output).map_err(|e| CopySpecError::io(self.path(), e))
    }

    /// Copy the raw content to `target`, creating parents as needed
    ///
    /// Returns `true` when something was written.
    fn copy_to_file(&self, target: &Path) -> Result<bool> {
        if self.is_directory() {
            std::fs::create_dir_all(target).with_path(target)?;
            return Ok(true);
        }
        let mut input = self.open()?;
        FileCopier::default().copy_reader(&mut input, Path::new(&self.path()), target)?;
        Ok(true)
    }

    /// Ask the walker to stop after this element
    fn stop_visiting(&self);

    /// Human readable description for messages
    fn display_name(&self) -> String {
        format!("file '{}'", self.path())
    }
}
