//! Directory entry model shared by the reader, the walker, and every visitor.

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Serialize;

/// Histogram bucket for files without an extension.
pub const NO_EXTENSION: &str = "(no extension)";

/// What kind of object a directory entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    /// Anything that is neither a regular file nor a directory: sockets,
    /// fifos, broken links. Listed but never visited or descended into.
    Unknown,
}

/// One child of a listed directory.
///
/// Created fresh on every listing call, never cached across calls. `path`
/// is the parent path joined with `name` at construction time and is not
/// re-derived from the filesystem afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct DirEntry {
    /// Leaf name, extension included.
    pub name: String,
    pub kind: EntryKind,
    /// Size in bytes; 0 for directories by convention.
    pub size_bytes: u64,
    /// Modification date, day granularity.
    pub modified: Option<NaiveDate>,
    pub hidden: bool,
    pub path: PathBuf,
}

impl DirEntry {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Normalized extension of this entry's name.
    pub fn extension(&self) -> String {
        extension_of(&self.name)
    }
}

/// Extract the normalized extension from a file name: lowercased, with the
/// leading dot, or [`NO_EXTENSION`] when there is none.
///
/// Dotfiles like `.gitignore` count as having no extension.
pub fn extension_of(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            format!(".{}", ext.to_lowercase())
        }
        _ => NO_EXTENSION.to_string(),
    }
}

/// Normalize a caller-supplied extension for comparison: trimmed,
/// lowercased, leading dot ensured. `exe`, `.EXE`, and `.exe` all come
/// back as `.exe`.
pub fn normalize_extension(ext: &str) -> String {
    let trimmed = ext.trim();
    let stripped = trimmed.strip_prefix('.').unwrap_or(trimmed);
    format!(".{}", stripped.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("a.txt"), ".txt");
        assert_eq!(extension_of("b.TXT"), ".txt");
        assert_eq!(extension_of("archive.tar.gz"), ".gz");
        assert_eq!(extension_of("README"), NO_EXTENSION);
        assert_eq!(extension_of(".gitignore"), NO_EXTENSION);
        assert_eq!(extension_of("trailing."), NO_EXTENSION);
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension("TXT"), ".txt");
        assert_eq!(normalize_extension(".txt"), ".txt");
        assert_eq!(normalize_extension("txt"), ".txt");
        assert_eq!(normalize_extension("  .EXE  "), ".exe");
    }

    #[test]
    fn test_normalized_spellings_agree() {
        for spelling in ["TXT", ".txt", "txt", ".TXT"] {
            assert_eq!(normalize_extension(spelling), extension_of("file.txt"));
        }
    }
}
