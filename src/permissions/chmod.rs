//! Platform permission stamping

use crate::error::{IoResultExt, Result};
use std::path::Path;

/// Applies a numeric mode to a path on disk
pub trait Chmod: Send + Sync {
    /// Stamp `path` with `mode` (0..=0o777)
    fn chmod(&self, path: &Path, mode: u32) -> Result<()>;
}

/// `chmod` through the standard library
///
/// POSIX-faithful on Unix. Elsewhere only the owner write bit is mapped,
/// onto the read-only flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct PosixChmod;

impl Chmod for PosixChmod {
    #[cfg(unix)]
    fn chmod(&self, path: &Path, mode: u32) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).with_path(path)
    }

    #[cfg(not(unix))]
    fn chmod(&self, path: &Path, mode: u32) -> Result<()> {
        let metadata = std::fs::metadata(path).with_path(path)?;
        let mut permissions = metadata.permissions();
        permissions.set_readonly(mode & 0o200 == 0);
        std::fs::set_permissions(path, permissions).with_path(path)
    }
}

/// Current permission bits of a path, masked to `0o777`
#[cfg(unix)]
pub fn read_mode(path: &Path) -> Result<u32> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::metadata(path).with_path(path)?;
    Ok(metadata.permissions().mode() & 0o777)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    #[cfg(unix)]
    #[test]
    fn test_chmod_sets_exact_bits() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("file.txt");
        File::create(&path).unwrap();

        PosixChmod.chmod(&path, 0o640).unwrap();
        assert_eq!(read_mode(&path).unwrap(), 0o640);

        PosixChmod.chmod(&path, 0o755).unwrap();
        assert_eq!(read_mode(&path).unwrap(), 0o755);
    }

    #[test]
    fn test_chmod_missing_path() {
        let dir = TempDir::new().unwrap();
        let err = PosixChmod.chmod(&dir.path().join("missing"), 0o644).unwrap_err();
        assert!(err.path().is_some());
    }
}
