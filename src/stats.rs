//! Aggregating visitors: file counts, byte totals, extension and
//! attribute histograms, largest files.
//!
//! Each aggregator owns its accumulator and implements [`Visitor`]; the
//! parallel merge is the aggregator's own `join`, so fork-join walks need
//! no shared state. Directory links are skipped by the engine before any
//! visitor runs, which is what keeps `ByteTotal` (and everything else)
//! from counting linked subtrees.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::attrs;
use crate::entry::DirEntry;
use crate::walk::{Flow, ParallelVisitor, Visitor};

/// Counts files. Directories are never counted.
#[derive(Debug, Default)]
pub struct FileCount {
    count: u64,
}

impl FileCount {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> u64 {
        self.count
    }
}

impl Visitor for FileCount {
    fn visit_file(&mut self, _entry: &DirEntry) -> Flow {
        self.count += 1;
        Flow::Continue
    }
}

impl ParallelVisitor for FileCount {
    fn fork(&self) -> Self {
        Self::default()
    }

    fn join(&mut self, other: Self) {
        self.count += other.count;
    }
}

/// Sums file sizes in bytes.
#[derive(Debug, Default)]
pub struct ByteTotal {
    bytes: u64,
}

impl ByteTotal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> u64 {
        self.bytes
    }
}

impl Visitor for ByteTotal {
    fn visit_file(&mut self, entry: &DirEntry) -> Flow {
        self.bytes += entry.size_bytes;
        Flow::Continue
    }
}

impl ParallelVisitor for ByteTotal {
    fn fork(&self) -> Self {
        Self::default()
    }

    fn join(&mut self, other: Self) {
        self.bytes += other.bytes;
    }
}

/// Per-extension accumulator: how many files and how many bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtensionStat {
    pub count: u64,
    pub total_bytes: u64,
}

/// Histogram keyed by normalized extension (`.txt`, `(no extension)`).
#[derive(Debug, Default)]
pub struct ExtensionHistogram {
    by_ext: HashMap<String, ExtensionStat>,
}

impl ExtensionHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, ext: &str) -> Option<ExtensionStat> {
        self.by_ext.get(ext).copied()
    }

    pub fn len(&self) -> usize {
        self.by_ext.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_ext.is_empty()
    }

    /// Rows sorted by count descending, then extension ascending.
    pub fn finalize(self) -> Vec<(String, ExtensionStat)> {
        let mut rows: Vec<_> = self.by_ext.into_iter().collect();
        rows.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(&b.0)));
        rows
    }
}

impl Visitor for ExtensionHistogram {
    fn visit_file(&mut self, entry: &DirEntry) -> Flow {
        let stat = self.by_ext.entry(entry.extension()).or_default();
        stat.count += 1;
        stat.total_bytes += entry.size_bytes;
        Flow::Continue
    }
}

impl ParallelVisitor for ExtensionHistogram {
    fn fork(&self) -> Self {
        Self::default()
    }

    fn join(&mut self, other: Self) {
        for (ext, stat) in other.by_ext {
            let own = self.by_ext.entry(ext).or_default();
            own.count += stat.count;
            own.total_bytes += stat.total_bytes;
        }
    }
}

/// Independent hidden/system/readonly counters over files.
///
/// A file can be all three at once, so the counters do not partition the
/// file count. A failed attribute lookup counts as none of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttributeStats {
    pub hidden: u64,
    pub system: u64,
    pub readonly: u64,
}

/// Tallies [`AttributeStats`] via the platform attribute lookup.
#[derive(Debug, Default)]
pub struct AttributeTally {
    stats: AttributeStats,
}

impl AttributeTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> AttributeStats {
        self.stats
    }
}

impl Visitor for AttributeTally {
    fn visit_file(&mut self, entry: &DirEntry) -> Flow {
        if entry.hidden {
            self.stats.hidden += 1;
        }
        let attrs = attrs::query(&entry.path);
        if attrs.system {
            self.stats.system += 1;
        }
        if attrs.readonly {
            self.stats.readonly += 1;
        }
        Flow::Continue
    }
}

impl ParallelVisitor for AttributeTally {
    fn fork(&self) -> Self {
        Self::default()
    }

    fn join(&mut self, other: Self) {
        self.stats.hidden += other.stats.hidden;
        self.stats.system += other.stats.system;
        self.stats.readonly += other.stats.readonly;
    }
}

/// Tracks the N largest files seen.
#[derive(Debug)]
pub struct Largest {
    limit: usize,
    entries: Vec<(PathBuf, u64)>,
}

impl Largest {
    pub const DEFAULT_LIMIT: usize = 5;

    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            entries: Vec::new(),
        }
    }

    /// Final ranking: size descending, path ascending on ties, at most
    /// `limit` rows. Every file not listed is no larger than the last
    /// listed one.
    pub fn finalize(mut self) -> Vec<(PathBuf, u64)> {
        Self::rank(&mut self.entries, self.limit);
        self.entries
    }

    fn rank(entries: &mut Vec<(PathBuf, u64)>, limit: usize) {
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries.truncate(limit);
    }
}

impl Default for Largest {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LIMIT)
    }
}

impl Visitor for Largest {
    fn visit_file(&mut self, entry: &DirEntry) -> Flow {
        self.entries.push((entry.path.clone(), entry.size_bytes));
        // Keep the buffer bounded without re-sorting on every file.
        if self.entries.len() >= self.limit.saturating_mul(2).max(16) {
            Self::rank(&mut self.entries, self.limit);
        }
        Flow::Continue
    }
}

impl ParallelVisitor for Largest {
    fn fork(&self) -> Self {
        Self::new(self.limit)
    }

    fn join(&mut self, other: Self) {
        self.entries.extend(other.entries);
        Self::rank(&mut self.entries, self.limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryKind;

    fn file(name: &str, size: u64) -> DirEntry {
        DirEntry {
            name: name.to_string(),
            kind: EntryKind::File,
            size_bytes: size,
            modified: None,
            hidden: name.starts_with('.'),
            path: PathBuf::from("root").join(name),
        }
    }

    #[test]
    fn test_count_and_bytes() {
        let mut count = FileCount::new();
        let mut bytes = ByteTotal::new();
        for e in [file("a.txt", 100), file("b.TXT", 50), file("c.bin", 10)] {
            count.visit_file(&e);
            bytes.visit_file(&e);
        }
        assert_eq!(count.total(), 3);
        assert_eq!(bytes.total(), 160);
    }

    #[test]
    fn test_histogram_normalizes_case() {
        let mut hist = ExtensionHistogram::new();
        for e in [
            file("a.txt", 100),
            file("b.TXT", 50),
            file("c.bin", 10),
            file("README", 7),
        ] {
            hist.visit_file(&e);
        }

        assert_eq!(
            hist.get(".txt"),
            Some(ExtensionStat {
                count: 2,
                total_bytes: 150
            })
        );
        assert_eq!(
            hist.get(".bin"),
            Some(ExtensionStat {
                count: 1,
                total_bytes: 10
            })
        );
        assert_eq!(
            hist.get(crate::entry::NO_EXTENSION),
            Some(ExtensionStat {
                count: 1,
                total_bytes: 7
            })
        );

        let rows = hist.finalize();
        assert_eq!(rows[0].0, ".txt");
    }

    #[test]
    fn test_largest_orders_and_truncates() {
        let mut largest = Largest::new(2);
        for e in [
            file("small.bin", 1),
            file("big.bin", 100),
            file("mid.bin", 50),
            file("tie.bin", 100),
        ] {
            largest.visit_file(&e);
        }

        let ranked = largest.finalize();
        assert_eq!(ranked.len(), 2);
        // Size descending, path ascending on the 100-byte tie.
        assert_eq!(ranked[0], (PathBuf::from("root/big.bin"), 100));
        assert_eq!(ranked[1], (PathBuf::from("root/tie.bin"), 100));
    }

    #[test]
    fn test_largest_bounded_buffer_keeps_top() {
        let mut largest = Largest::new(3);
        for i in 0..1000u64 {
            largest.visit_file(&file(&format!("f{:04}.bin", i), i));
        }
        let ranked = largest.finalize();
        assert_eq!(
            ranked.iter().map(|r| r.1).collect::<Vec<_>>(),
            vec![999, 998, 997]
        );
    }

    #[test]
    fn test_merge_matches_sequential() {
        let entries: Vec<DirEntry> = (0..20u64)
            .map(|i| file(&format!("f{}.dat", i), i * 3))
            .collect();

        let mut whole = ExtensionHistogram::new();
        for e in &entries {
            whole.visit_file(e);
        }

        let mut left = ExtensionHistogram::new();
        let mut right = left.fork();
        for e in &entries[..7] {
            left.visit_file(e);
        }
        for e in &entries[7..] {
            right.visit_file(e);
        }
        left.join(right);

        assert_eq!(left.get(".dat"), whole.get(".dat"));
    }

    #[test]
    fn test_largest_merge_matches_sequential() {
        let entries: Vec<DirEntry> = (0..50u64)
            .map(|i| file(&format!("f{:02}.dat", i), (i * 7) % 23))
            .collect();

        let mut whole = Largest::new(5);
        for e in &entries {
            whole.visit_file(e);
        }

        let mut left = Largest::new(5);
        let mut right = left.fork();
        for e in &entries[..20] {
            left.visit_file(e);
        }
        for e in &entries[20..] {
            right.visit_file(e);
        }
        left.join(right);

        assert_eq!(left.finalize(), whole.finalize());
    }

    #[test]
    fn test_attribute_counters_are_independent() {
        let mut tally = AttributeTally::new();
        // The paths do not exist, so the platform lookup fails closed
        // and only the listing-provided hidden flag contributes.
        tally.visit_file(&file(".hidden", 1));
        tally.visit_file(&file("plain.txt", 1));

        let stats = tally.stats();
        assert_eq!(stats.hidden, 1);
        assert_eq!(stats.system, 0);
        assert_eq!(stats.readonly, 0);
    }
}
