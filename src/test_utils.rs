//! Test utilities for building throwaway directory trees.
//!
//! This module is only compiled for tests and benchmarks.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temporary directory tree for tests.
///
/// Provides methods for creating files, directories, and links. The
/// tree is removed when dropped.
pub struct TestTree {
    dir: TempDir,
}

impl TestTree {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Get the path to the tree root.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create a file with the given bytes, creating parent directories
    /// as needed.
    pub fn add_file(&self, path: &str, content: &[u8]) -> PathBuf {
        let full_path = self.dir.path().join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(&full_path, content).expect("Failed to write file");
        full_path
    }

    /// Create a file of `len` zero bytes.
    pub fn add_file_with_len(&self, path: &str, len: usize) -> PathBuf {
        self.add_file(path, &vec![0u8; len])
    }

    /// Create a directory (and any missing parents).
    pub fn add_dir(&self, path: &str) -> PathBuf {
        let full_path = self.dir.path().join(path);
        fs::create_dir_all(&full_path).expect("Failed to create dir");
        full_path
    }

    /// Create a symlink at `link` pointing at `target`, both relative
    /// to the tree root.
    #[cfg(unix)]
    pub fn add_symlink(&self, target: &str, link: &str) -> PathBuf {
        let link_path = self.dir.path().join(link);
        std::os::unix::fs::symlink(self.dir.path().join(target), &link_path)
            .expect("Failed to create symlink");
        link_path
    }
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}
