//! Search visitors: wildcard pattern, extension set, size threshold, and
//! the composed system-file search.
//!
//! Every finder collects [`SearchMatch`] values and leaves rendering to
//! the caller. Matches inside skipped subtrees (unreadable or reached
//! only through links) are excluded, the same policy the aggregators
//! follow.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern, PatternError};
use serde::Serialize;

use crate::entry::{DirEntry, normalize_extension};
use crate::walk::{Flow, ParallelVisitor, Visitor, WalkError, Walker};

/// Bytes per megabyte for threshold arithmetic.
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Extensions that mark a system file.
pub const SYSTEM_EXTENSIONS: [&str; 3] = [".exe", ".dll", ".sys"];

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub extension: String,
}

impl SearchMatch {
    fn from_entry(entry: &DirEntry) -> Self {
        Self {
            path: entry.path.clone(),
            size_bytes: entry.size_bytes,
            extension: entry.extension(),
        }
    }
}

/// Sort matches by size descending, path ascending on ties.
pub fn sort_by_size(matches: &mut [SearchMatch]) {
    matches.sort_by(|a, b| {
        b.size_bytes
            .cmp(&a.size_bytes)
            .then_with(|| a.path.cmp(&b.path))
    });
}

/// Finds files whose whole name matches a wildcard pattern.
///
/// `*` matches any run of characters and `?` exactly one. The match is
/// anchored: `*.txt` matches `a.txt` but not `a.txt.bak`. Comparison is
/// case-insensitive unless opted out.
#[derive(Debug)]
pub struct PatternFinder {
    pattern: Pattern,
    options: MatchOptions,
    limit: Option<usize>,
    matches: Vec<SearchMatch>,
}

impl PatternFinder {
    pub fn new(pattern: &str, case_sensitive: bool) -> Result<Self, PatternError> {
        Ok(Self {
            pattern: Pattern::new(pattern)?,
            options: MatchOptions {
                case_sensitive,
                require_literal_separator: false,
                require_literal_leading_dot: false,
            },
            limit: None,
            matches: Vec::new(),
        })
    }

    /// Stop the walk after `limit` matches.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn into_matches(self) -> Vec<SearchMatch> {
        self.matches
    }
}

impl Visitor for PatternFinder {
    fn visit_file(&mut self, entry: &DirEntry) -> Flow {
        if self.pattern.matches_with(&entry.name, self.options) {
            self.matches.push(SearchMatch::from_entry(entry));
            if self.limit.is_some_and(|n| self.matches.len() >= n) {
                return Flow::Stop;
            }
        }
        Flow::Continue
    }
}

impl ParallelVisitor for PatternFinder {
    fn fork(&self) -> Self {
        Self {
            pattern: self.pattern.clone(),
            options: self.options,
            limit: self.limit,
            matches: Vec::new(),
        }
    }

    fn join(&mut self, other: Self) {
        self.matches.extend(other.matches);
    }
}

/// Finds files whose normalized extension is in a fixed set.
#[derive(Debug, Clone)]
pub struct ExtensionFinder {
    extensions: Vec<String>,
    matches: Vec<SearchMatch>,
}

impl ExtensionFinder {
    /// Extensions are accepted in any spelling: `exe`, `.EXE`, and
    /// `.exe` all select the same files.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut extensions: Vec<String> = extensions
            .into_iter()
            .map(|e| normalize_extension(e.as_ref()))
            .collect();
        extensions.sort();
        extensions.dedup();
        Self {
            extensions,
            matches: Vec::new(),
        }
    }

    pub fn into_matches(self) -> Vec<SearchMatch> {
        self.matches
    }
}

impl Visitor for ExtensionFinder {
    fn visit_file(&mut self, entry: &DirEntry) -> Flow {
        if self.extensions.binary_search(&entry.extension()).is_ok() {
            self.matches.push(SearchMatch::from_entry(entry));
        }
        Flow::Continue
    }
}

impl ParallelVisitor for ExtensionFinder {
    fn fork(&self) -> Self {
        Self {
            extensions: self.extensions.clone(),
            matches: Vec::new(),
        }
    }

    fn join(&mut self, other: Self) {
        self.matches.extend(other.matches);
    }
}

/// Finds files at or above a size threshold given in megabytes.
#[derive(Debug, Default)]
pub struct SizeFinder {
    min_bytes: u64,
    matches: Vec<SearchMatch>,
}

impl SizeFinder {
    pub fn new(min_mb: f64) -> Self {
        Self {
            min_bytes: (min_mb * BYTES_PER_MB as f64) as u64,
            matches: Vec::new(),
        }
    }

    /// Matches sorted by size descending, path ascending on ties.
    pub fn into_matches(mut self) -> Vec<SearchMatch> {
        sort_by_size(&mut self.matches);
        self.matches
    }
}

impl Visitor for SizeFinder {
    fn visit_file(&mut self, entry: &DirEntry) -> Flow {
        if entry.size_bytes >= self.min_bytes {
            self.matches.push(SearchMatch::from_entry(entry));
        }
        Flow::Continue
    }
}

impl ParallelVisitor for SizeFinder {
    fn fork(&self) -> Self {
        Self {
            min_bytes: self.min_bytes,
            matches: Vec::new(),
        }
    }

    fn join(&mut self, other: Self) {
        self.matches.extend(other.matches);
    }
}

/// Well-known system roots searched when no explicit path is given.
#[cfg(windows)]
pub fn system_roots() -> Vec<PathBuf> {
    let windir = std::env::var_os("WINDIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(r"C:\Windows"));
    let mut roots = vec![windir.clone(), windir.join("System32")];
    let syswow64 = windir.join("SysWOW64");
    if syswow64.exists() {
        roots.push(syswow64);
    }
    roots.push(
        std::env::var_os("ProgramFiles")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(r"C:\Program Files")),
    );
    if let Some(x86) = std::env::var_os("ProgramFiles(x86)").map(PathBuf::from) {
        if x86.exists() {
            roots.push(x86);
        }
    }
    roots
}

/// Well-known system roots searched when no explicit path is given.
#[cfg(not(windows))]
pub fn system_roots() -> Vec<PathBuf> {
    ["/usr/bin", "/usr/sbin", "/usr/lib", "/usr/local/bin", "/usr/local/lib"]
        .into_iter()
        .map(PathBuf::from)
        .filter(|p| p.exists())
        .collect()
}

/// Search for system files (by [`SYSTEM_EXTENSIONS`]) under `path`, or
/// under [`system_roots`] when no path is given.
///
/// An explicit unreadable path is an error, same as any other root; a
/// missing or locked well-known root is just skipped, and results from
/// the remaining roots are merged in root order.
pub fn find_system_files(
    walker: &Walker,
    path: Option<&Path>,
) -> Result<Vec<SearchMatch>, WalkError> {
    match path {
        Some(root) => {
            let mut finder = ExtensionFinder::new(SYSTEM_EXTENSIONS);
            walker.walk(root, &mut finder)?;
            Ok(finder.into_matches())
        }
        None => {
            let mut all = Vec::new();
            for root in system_roots() {
                let mut finder = ExtensionFinder::new(SYSTEM_EXTENSIONS);
                if walker.walk(&root, &mut finder).is_ok() {
                    all.extend(finder.into_matches());
                }
            }
            Ok(all)
        }
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
            hidden: false,
            path: PathBuf::from("root").join(name),
        }
    }

    fn run_pattern(pattern: &str, case_sensitive: bool, names: &[&str]) -> Vec<String> {
        let mut finder = PatternFinder::new(pattern, case_sensitive).unwrap();
        for name in names {
            finder.visit_file(&file(name, 1));
        }
        finder
            .into_matches()
            .into_iter()
            .map(|m| m.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_pattern_is_anchored() {
        let names = ["a.txt", "a.txt.bak", "notes.txt", "txt"];
        assert_eq!(
            run_pattern("*.txt", false, &names),
            vec!["a.txt", "notes.txt"]
        );
    }

    #[test]
    fn test_pattern_case_insensitive_by_default() {
        let names = ["a.txt", "b.TXT", "c.bin"];
        assert_eq!(run_pattern("*.txt", false, &names), vec!["a.txt", "b.TXT"]);
        assert_eq!(run_pattern("*.txt", true, &names), vec!["a.txt"]);
    }

    #[test]
    fn test_pattern_question_mark() {
        let names = ["doc1.pdf", "doc12.pdf", "doca.pdf"];
        assert_eq!(
            run_pattern("doc?.pdf", false, &names),
            vec!["doc1.pdf", "doca.pdf"]
        );
    }

    #[test]
    fn test_pattern_limit_stops_walk() {
        let mut finder = PatternFinder::new("*.txt", false).unwrap().with_limit(2);
        assert_eq!(finder.visit_file(&file("a.txt", 1)), Flow::Continue);
        assert_eq!(finder.visit_file(&file("b.txt", 1)), Flow::Stop);
        assert_eq!(finder.into_matches().len(), 2);
    }

    #[test]
    fn test_extension_spellings_are_equivalent() {
        for spelling in ["exe", ".EXE", ".exe", " exe "] {
            let mut finder = ExtensionFinder::new([spelling]);
            finder.visit_file(&file("setup.exe", 1));
            finder.visit_file(&file("readme.txt", 1));
            let matches = finder.into_matches();
            assert_eq!(matches.len(), 1, "spelling {:?}", spelling);
            assert_eq!(matches[0].extension, ".exe");
        }
    }

    #[test]
    fn test_size_threshold_and_order() {
        let mut finder = SizeFinder::new(1.0);
        finder.visit_file(&file("small.iso", BYTES_PER_MB - 1));
        finder.visit_file(&file("exact.iso", BYTES_PER_MB));
        finder.visit_file(&file("big.iso", 3 * BYTES_PER_MB));
        finder.visit_file(&file("also-big.iso", 3 * BYTES_PER_MB));

        let matches = finder.into_matches();
        let names: Vec<&str> = matches
            .iter()
            .map(|m| m.path.file_name().unwrap().to_str().unwrap())
            .collect();
        // Size descending; the two 3 MB files tie-break on path.
        assert_eq!(names, vec!["also-big.iso", "big.iso", "exact.iso"]);
    }

    #[test]
    fn test_system_extensions_normalized() {
        let mut finder = ExtensionFinder::new(SYSTEM_EXTENSIONS);
        finder.visit_file(&file("driver.SYS", 1));
        finder.visit_file(&file("lib.dll", 1));
        finder.visit_file(&file("notes.txt", 1));
        assert_eq!(finder.into_matches().len(), 2);
    }
}
