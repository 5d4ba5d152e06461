//! Platform attribute lookup.
//!
//! A single query point for the hidden/system/readonly flags and for the
//! link test the walker relies on. Fails closed: any error reads as "no
//! special attributes" and "not a link".

use std::path::Path;

use serde::Serialize;

/// Attribute flags for one file. The flags are independent; a file can
/// carry all three at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FileAttributes {
    pub hidden: bool,
    pub system: bool,
    pub readonly: bool,
}

/// Look up the attribute flags for `path`.
pub fn query(path: &Path) -> FileAttributes {
    imp::query(path)
}

/// Whether `path` names a symbolic link, junction, or other reparse
/// point. Such entries are never followed during traversal.
pub fn is_reparse_point(path: &Path) -> bool {
    imp::is_reparse_point(path)
}

/// Hidden test alone, for listing snapshots. Cheaper than [`query`] on
/// platforms where hidden is a naming convention.
pub fn is_hidden(path: &Path) -> bool {
    imp::is_hidden(path)
}

#[cfg(windows)]
mod imp {
    use std::path::Path;

    use super::FileAttributes;

    const FILE_ATTRIBUTE_READONLY: u32 = 0x1;
    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
    const FILE_ATTRIBUTE_SYSTEM: u32 = 0x4;
    const FILE_ATTRIBUTE_REPARSE_POINT: u32 = 0x400;

    pub fn query(path: &Path) -> FileAttributes {
        use std::os::windows::fs::MetadataExt;

        match std::fs::symlink_metadata(path) {
            Ok(meta) => {
                let bits = meta.file_attributes();
                FileAttributes {
                    hidden: bits & FILE_ATTRIBUTE_HIDDEN != 0,
                    system: bits & FILE_ATTRIBUTE_SYSTEM != 0,
                    readonly: bits & FILE_ATTRIBUTE_READONLY != 0,
                }
            }
            Err(_) => FileAttributes::default(),
        }
    }

    pub fn is_reparse_point(path: &Path) -> bool {
        use std::os::windows::fs::MetadataExt;

        match std::fs::symlink_metadata(path) {
            Ok(meta) => {
                meta.file_type().is_symlink()
                    || meta.file_attributes() & FILE_ATTRIBUTE_REPARSE_POINT != 0
            }
            Err(_) => false,
        }
    }

    pub fn is_hidden(path: &Path) -> bool {
        query(path).hidden
    }
}

#[cfg(not(windows))]
mod imp {
    use std::path::Path;

    use super::FileAttributes;

    pub fn query(path: &Path) -> FileAttributes {
        let readonly = std::fs::symlink_metadata(path)
            .map(|m| m.permissions().readonly())
            .unwrap_or(false);
        FileAttributes {
            hidden: is_hidden(path),
            system: false,
            readonly,
        }
    }

    pub fn is_reparse_point(path: &Path) -> bool {
        std::fs::symlink_metadata(path)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false)
    }

    // Dot-prefix convention; no syscall needed.
    pub fn is_hidden(path: &Path) -> bool {
        path.file_name()
            .map(|n| n.to_string_lossy().starts_with('.'))
            .unwrap_or(false)
    }
}
