//! One-directory snapshot listing.
//!
//! The reader never recurses; it turns a single directory into a sorted
//! `Vec<DirEntry>` or fails as a whole. Everything above it (walker,
//! aggregators, filters) builds on this contract.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use thiserror::Error;

use crate::attrs;
use crate::entry::{DirEntry, EntryKind};

/// Failure to list one directory. Listing is all-or-nothing: either the
/// full snapshot comes back or the directory is reported unreadable.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("directory not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("permission denied: {}", path.display())]
    PermissionDenied { path: PathBuf },
    #[error("cannot read {}: {}", path.display(), source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ReadError {
    fn from_io(path: &Path, err: io::Error) -> Self {
        let path = path.to_path_buf();
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source: err },
        }
    }
}

/// List the immediate children of `path`.
///
/// Entries come back directories first, then files, each group sorted
/// case-insensitively by name. The ordering is part of the contract, not
/// cosmetics: traversal output is deterministic because of it.
///
/// Children whose metadata cannot be read are skipped one by one; only a
/// failure to open the directory itself is an error.
pub fn list_dir(path: &Path) -> Result<Vec<DirEntry>, ReadError> {
    let read = std::fs::read_dir(path).map_err(|e| ReadError::from_io(path, e))?;

    let mut entries = Vec::new();
    for item in read {
        let Ok(item) = item else { continue };
        let name = item.file_name().to_string_lossy().into_owned();
        let full_path = path.join(&name);

        // The entry itself, without following links.
        let Ok(meta) = std::fs::symlink_metadata(&full_path) else {
            continue;
        };

        let (kind, size_bytes) = if meta.is_dir() {
            (EntryKind::Directory, 0)
        } else if meta.is_file() {
            (EntryKind::File, meta.len())
        } else if meta.file_type().is_symlink() {
            // A link keeps its target's kind for listing purposes; the
            // walker is what refuses to descend through it. Broken links
            // degrade to Unknown.
            match std::fs::metadata(&full_path) {
                Ok(target) if target.is_dir() => (EntryKind::Directory, 0),
                Ok(target) if target.is_file() => (EntryKind::File, target.len()),
                _ => (EntryKind::Unknown, 0),
            }
        } else {
            (EntryKind::Unknown, 0)
        };

        let modified = meta
            .modified()
            .ok()
            .map(|t| DateTime::<Local>::from(t).date_naive());

        entries.push(DirEntry {
            hidden: attrs::is_hidden(&full_path),
            name,
            kind,
            size_bytes,
            modified,
            path: full_path,
        });
    }

    entries.sort_by(|a, b| {
        b.is_dir()
            .cmp(&a.is_dir())
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.name.cmp(&b.name))
    });

    Ok(entries)
}
