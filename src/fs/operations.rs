//! Raw file copy operations
//!
//! Buffered byte copies used by source elements and by filtered copies.
//! Nothing here knows about filters or permissions.

use crate::error::{CopySpecError, IoResultExt, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Default buffer size for copies
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Options for raw copies
#[derive(Debug, Clone)]
pub struct CopyOptions {
    /// Buffer size for reading and writing
    pub buffer_size: usize,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// Buffered file copier
#[derive(Debug, Clone, Default)]
pub struct FileCopier {
    options: CopyOptions,
}

impl FileCopier {
    /// Create a copier with the given options
    pub fn new(options: CopyOptions) -> Self {
        Self { options }
    }

    /// Options in use
    pub fn options(&self) -> &CopyOptions {
        &self.options
    }

    /// Copy a file byte for byte, creating parent directories of `dest`
    pub fn copy_file(&self, source: &Path, dest: &Path) -> Result<u64> {
        create_parent_dirs(dest)?;

        let src_file = File::open(source).with_path(source)?;
        let dst_file = File::create(dest).with_path(dest)?;

        let mut reader = BufReader::with_capacity(self.options.buffer_size, src_file);
        let mut writer = BufWriter::with_capacity(self.options.buffer_size, dst_file);

        let bytes_copied = self.copy_stream(&mut reader, source, &mut writer, dest)?;
        writer.flush().with_path(dest)?;

        Ok(bytes_copied)
    }

    /// Stream `reader` into a new file at `dest`, creating parent directories
    ///
    /// Read failures, including those raised by filter stages, are reported
    /// against `source`.
    pub fn copy_reader(&self, reader: &mut dyn Read, source: &Path, dest: &Path) -> Result<u64> {
        create_parent_dirs(dest)?;

        let dst_file = File::create(dest).with_path(dest)?;
        let mut writer = BufWriter::with_capacity(self.options.buffer_size, dst_file);

        let bytes_copied = self.copy_stream(reader, source, &mut writer, dest)?;
        writer.flush().with_path(dest)?;

        Ok(bytes_copied)
    }

    /// Copy between arbitrary streams
    ///
    /// Read errors name `source`, write errors name `dest`.
    pub fn copy_stream(
        &self,
        reader: &mut dyn Read,
        source: &Path,
        writer: &mut dyn Write,
        dest: &Path,
    ) -> Result<u64> {
        let mut buffer = vec![0u8; self.options.buffer_size.max(1)];
        let mut total = 0u64;
        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(CopySpecError::io(source, e)),
            };
            writer.write_all(&buffer[..n]).with_path(dest)?;
            total += n as u64;
        }
        Ok(total)
    }
}

/// Create the parent directories of `path`
pub fn create_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_path(parent)?;
        }
    }
    Ok(())
}
