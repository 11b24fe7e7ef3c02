//! File-system queries needed by module resolution.
//!
//! Every query answers from the ambient file system and treats any I/O
//! failure (missing path, permissions, races) as a negative answer.

use std::fs;
use std::path::Path;

/// The host environment a module-resolution algorithm runs against.
pub trait ModuleResolutionHost {
    fn file_exists(&self, path: &Path) -> bool;

    fn directory_exists(&self, path: &Path) -> bool;

    /// Reads a text file such as `package.json`. `None` on any failure.
    fn read_file(&self, path: &Path) -> Option<String> {
        fs::read_to_string(path).ok()
    }
}

/// [`ModuleResolutionHost`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsResolutionHost;

impl ModuleResolutionHost for FsResolutionHost {
    fn file_exists(&self, path: &Path) -> bool {
        fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
    }

    fn directory_exists(&self, path: &Path) -> bool {
        fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
    }
}
