//! Rove - explore, analyze, and search directory trees

pub mod attrs;
pub mod entry;
pub mod reader;
pub mod report;
pub mod search;
pub mod stats;
pub mod walk;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use entry::{DirEntry, EntryKind, NO_EXTENSION, extension_of, normalize_extension};
pub use reader::{ReadError, list_dir};
pub use search::{ExtensionFinder, PatternFinder, SearchMatch, SizeFinder, find_system_files};
pub use stats::{
    AttributeStats, AttributeTally, ByteTotal, ExtensionHistogram, ExtensionStat, FileCount,
    Largest,
};
pub use walk::{CancelToken, Flow, ParallelVisitor, Visitor, WalkError, WalkStats, Walker, traverse};
