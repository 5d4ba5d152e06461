//! Depth-first traversal engine.
//!
//! One walk algorithm serves every aggregator and filter: list a
//! directory, push each entry to the visitor, recurse into real
//! subdirectories. Policy lives here rather than in visitors:
//!
//! - entries arrive in listing order (directories first, names
//!   case-insensitive);
//! - links and reparse points are never followed, so cycles cannot occur
//!   and linked subtrees are never double-counted;
//! - an unreadable subtree is absorbed and counted, not propagated. Only
//!   the root listing is allowed to fail.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use rayon::prelude::*;
use thiserror::Error;

use crate::attrs;
use crate::entry::EntryKind;
use crate::reader::{self, ReadError};

use super::cancel::CancelToken;
use super::visitor::{Flow, ParallelVisitor, Visitor};

/// Traversal failure. The only fatal condition is the root itself being
/// unreadable; everything below the root is absorbed into [`WalkStats`].
#[derive(Debug, Error)]
#[error("cannot walk {}: {}", path.display(), source)]
pub struct WalkError {
    pub path: PathBuf,
    #[source]
    pub source: ReadError,
}

/// Counters describing what a walk saw and what it skipped.
///
/// `links_skipped` and `subtrees_skipped` make the skip policies
/// observable: callers can footnote partial results without the engine
/// ever treating them as failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub files_seen: u64,
    pub dirs_seen: u64,
    pub links_skipped: u64,
    pub subtrees_skipped: u64,
    /// The walk ended before exhausting the tree, either through
    /// [`Flow::Stop`] or a tripped [`CancelToken`].
    pub stopped_early: bool,
}

#[derive(Default)]
struct WalkState {
    files_seen: AtomicU64,
    dirs_seen: AtomicU64,
    links_skipped: AtomicU64,
    subtrees_skipped: AtomicU64,
    stopped: AtomicBool,
}

impl WalkState {
    fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }

    fn snapshot(&self, cancel: &CancelToken) -> WalkStats {
        WalkStats {
            files_seen: self.files_seen.load(Ordering::Relaxed),
            dirs_seen: self.dirs_seen.load(Ordering::Relaxed),
            links_skipped: self.links_skipped.load(Ordering::Relaxed),
            subtrees_skipped: self.subtrees_skipped.load(Ordering::Relaxed),
            stopped_early: self.stopped.load(Ordering::Relaxed) || cancel.is_cancelled(),
        }
    }
}

/// Traversal engine with cooperative cancellation and an optional
/// fork-join parallel mode.
#[derive(Debug, Clone, Default)]
pub struct Walker {
    cancel: CancelToken,
    workers: usize,
}

impl Walker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `token` as the external stop signal for walks run by this
    /// walker.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Worker threads for [`Walker::walk_parallel`].
    /// 0 = rayon's default pool size.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Walk `root` depth-first, feeding every entry to `visitor`.
    ///
    /// Returns the walk counters on success; results accumulate inside
    /// the visitor. Fails only when `root` itself cannot be listed.
    pub fn walk<V: Visitor>(&self, root: &Path, visitor: &mut V) -> Result<WalkStats, WalkError> {
        let state = WalkState::default();
        self.walk_dir(root, visitor, &state, true)?;
        Ok(state.snapshot(&self.cancel))
    }

    /// Fork-join variant of [`Walker::walk`]: sibling subdirectories are
    /// walked concurrently, each into a forked accumulator, merged in
    /// listing order once all children complete.
    pub fn walk_parallel<V>(&self, root: &Path, visitor: &mut V) -> Result<WalkStats, WalkError>
    where
        V: ParallelVisitor,
    {
        let state = WalkState::default();
        match self.workers {
            0 => self.walk_dir_parallel(root, visitor, &state, true)?,
            n => match rayon::ThreadPoolBuilder::new().num_threads(n).build() {
                Ok(pool) => {
                    pool.install(|| self.walk_dir_parallel(root, visitor, &state, true))?
                }
                // Fall back to the global pool if the build fails.
                Err(_) => self.walk_dir_parallel(root, visitor, &state, true)?,
            },
        }
        Ok(state.snapshot(&self.cancel))
    }

    fn should_stop(&self, state: &WalkState) -> bool {
        state.stopped.load(Ordering::Relaxed) || self.cancel.is_cancelled()
    }

    fn walk_dir<V: Visitor>(
        &self,
        path: &Path,
        visitor: &mut V,
        state: &WalkState,
        is_root: bool,
    ) -> Result<(), WalkError> {
        let Some(entries) = self.list_or_absorb(path, state, is_root)? else {
            return Ok(());
        };

        for entry in &entries {
            if self.should_stop(state) {
                return Ok(());
            }
            match entry.kind {
                EntryKind::File => {
                    state.files_seen.fetch_add(1, Ordering::Relaxed);
                    if visitor.visit_file(entry) == Flow::Stop {
                        state.stop();
                        return Ok(());
                    }
                }
                EntryKind::Directory => {
                    state.dirs_seen.fetch_add(1, Ordering::Relaxed);
                    match visitor.enter_dir(entry) {
                        Flow::Stop => {
                            state.stop();
                            return Ok(());
                        }
                        Flow::SkipDir => continue,
                        Flow::Continue => {}
                    }
                    if attrs::is_reparse_point(&entry.path) {
                        state.links_skipped.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                    self.walk_dir(&entry.path, visitor, state, false)?;
                }
                EntryKind::Unknown => {}
            }
        }
        Ok(())
    }

    fn walk_dir_parallel<V>(
        &self,
        path: &Path,
        visitor: &mut V,
        state: &WalkState,
        is_root: bool,
    ) -> Result<(), WalkError>
    where
        V: ParallelVisitor,
    {
        let Some(entries) = self.list_or_absorb(path, state, is_root)? else {
            return Ok(());
        };

        let mut subdirs = Vec::new();
        for entry in &entries {
            if self.should_stop(state) {
                return Ok(());
            }
            match entry.kind {
                EntryKind::File => {
                    state.files_seen.fetch_add(1, Ordering::Relaxed);
                    if visitor.visit_file(entry) == Flow::Stop {
                        state.stop();
                        return Ok(());
                    }
                }
                EntryKind::Directory => {
                    state.dirs_seen.fetch_add(1, Ordering::Relaxed);
                    match visitor.enter_dir(entry) {
                        Flow::Stop => {
                            state.stop();
                            return Ok(());
                        }
                        Flow::SkipDir => continue,
                        Flow::Continue => {}
                    }
                    if attrs::is_reparse_point(&entry.path) {
                        state.links_skipped.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                    subdirs.push(entry.path.clone());
                }
                EntryKind::Unknown => {}
            }
        }

        // Fork-join: each subtree accumulates into its own fork, merged
        // single-threaded in listing order after all branches are done.
        let template: &V = visitor;
        let branches: Vec<V> = subdirs
            .into_par_iter()
            .map(|dir| {
                let mut forked = template.fork();
                // Non-root walks cannot fail.
                let _ = self.walk_dir_parallel(&dir, &mut forked, state, false);
                forked
            })
            .collect();
        for branch in branches {
            visitor.join(branch);
        }
        Ok(())
    }

    /// List a directory, translating failure per the walk policy:
    /// fatal at the root, absorbed (and counted) anywhere below it.
    fn list_or_absorb(
        &self,
        path: &Path,
        state: &WalkState,
        is_root: bool,
    ) -> Result<Option<Vec<crate::entry::DirEntry>>, WalkError> {
        match reader::list_dir(path) {
            Ok(entries) => Ok(Some(entries)),
            Err(source) if is_root => Err(WalkError {
                path: path.to_path_buf(),
                source,
            }),
            Err(_) => {
                state.subtrees_skipped.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }
}

/// Walk `root` with a default engine. Shorthand for one-off traversals.
pub fn traverse<V: Visitor>(root: &Path, visitor: &mut V) -> Result<WalkStats, WalkError> {
    Walker::new().walk(root, visitor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::DirEntry;
    use crate::test_utils::TestTree;

    /// Records visited file names in arrival order.
    #[derive(Default)]
    struct Recorder {
        files: Vec<String>,
        dirs: Vec<String>,
        stop_after: Option<usize>,
        skip_dirs: Vec<String>,
    }

    impl Visitor for Recorder {
        fn visit_file(&mut self, entry: &DirEntry) -> Flow {
            self.files.push(entry.name.clone());
            if self.stop_after.is_some_and(|n| self.files.len() >= n) {
                return Flow::Stop;
            }
            Flow::Continue
        }

        fn enter_dir(&mut self, entry: &DirEntry) -> Flow {
            self.dirs.push(entry.name.clone());
            if self.skip_dirs.contains(&entry.name) {
                return Flow::SkipDir;
            }
            Flow::Continue
        }
    }

    fn sample_tree() -> TestTree {
        let tree = TestTree::new();
        tree.add_file("b.txt", b"bb");
        tree.add_file("a.txt", b"a");
        tree.add_file("sub/c.txt", b"ccc");
        tree.add_file("sub/inner/d.txt", b"dddd");
        tree
    }

    #[test]
    fn test_visits_in_listing_order() {
        let tree = sample_tree();
        let mut rec = Recorder::default();
        let stats = traverse(tree.path(), &mut rec).unwrap();

        // Depth-first, directories before files at each level.
        assert_eq!(rec.files, vec!["d.txt", "c.txt", "a.txt", "b.txt"]);
        assert_eq!(rec.dirs, vec!["sub", "inner"]);
        assert_eq!(stats.files_seen, 4);
        assert_eq!(stats.dirs_seen, 2);
        assert_eq!(stats.subtrees_skipped, 0);
        assert!(!stats.stopped_early);
    }

    #[test]
    fn test_skip_dir_prunes_subtree() {
        let tree = sample_tree();
        let mut rec = Recorder {
            skip_dirs: vec!["sub".to_string()],
            ..Default::default()
        };
        let stats = traverse(tree.path(), &mut rec).unwrap();

        assert_eq!(rec.files, vec!["a.txt", "b.txt"]);
        assert_eq!(stats.files_seen, 2);
        assert!(!stats.stopped_early);
    }

    #[test]
    fn test_stop_ends_walk_as_success() {
        let tree = sample_tree();
        let mut rec = Recorder {
            stop_after: Some(1),
            ..Default::default()
        };
        let stats = traverse(tree.path(), &mut rec).unwrap();

        assert_eq!(rec.files.len(), 1);
        assert!(stats.stopped_early);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let tree = TestTree::new();
        let mut rec = Recorder::default();
        let err = traverse(&tree.path().join("missing"), &mut rec).unwrap_err();
        assert!(matches!(err.source, ReadError::NotFound { .. }));
    }

    #[test]
    fn test_root_as_file_is_fatal() {
        let tree = TestTree::new();
        let file = tree.add_file("plain.txt", b"x");
        let mut rec = Recorder::default();
        assert!(traverse(&file, &mut rec).is_err());
    }

    #[test]
    fn test_empty_root_is_success() {
        let tree = TestTree::new();
        let mut rec = Recorder::default();
        let stats = traverse(tree.path(), &mut rec).unwrap();
        assert_eq!(stats.files_seen, 0);
        assert_eq!(stats.dirs_seen, 0);
    }

    #[test]
    fn test_pretripped_cancel_yields_empty_success() {
        let tree = sample_tree();
        let token = CancelToken::new();
        token.cancel();
        let walker = Walker::new().with_cancel(token);
        let mut rec = Recorder::default();
        let stats = walker.walk(tree.path(), &mut rec).unwrap();

        assert!(rec.files.is_empty());
        assert!(stats.stopped_early);
    }

    #[cfg(unix)]
    #[test]
    fn test_directory_link_is_skipped_and_counted() {
        let tree = sample_tree();
        tree.add_symlink("sub", "alias");

        let mut rec = Recorder::default();
        let stats = traverse(tree.path(), &mut rec).unwrap();

        // Files under sub/ arrive once, not twice.
        assert_eq!(stats.files_seen, 4);
        assert_eq!(stats.links_skipped, 1);
    }
}
