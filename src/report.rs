//! Rendering of listings, summaries, and search results.
//!
//! Everything here formats plain data values produced elsewhere; no
//! traversal happens in this module.

use std::io::{self, Write};
use std::path::PathBuf;

use serde::Serialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::entry::DirEntry;
use crate::search::SearchMatch;
use crate::stats::AttributeStats;

/// Cap on rows printed for a single search before truncating.
const MAX_LISTED: usize = 20;

/// Everything the `stats` command collects, in one serializable value.
#[derive(Debug, Serialize)]
pub struct DirectorySummary {
    pub path: PathBuf,
    pub file_count: u64,
    pub total_bytes: u64,
    pub extensions: Vec<ExtensionRow>,
    pub attributes: AttributeStats,
    pub largest: Vec<LargestRow>,
    pub subtrees_skipped: u64,
    pub links_skipped: u64,
}

#[derive(Debug, Serialize)]
pub struct ExtensionRow {
    pub extension: String,
    pub count: u64,
    pub total_bytes: u64,
}

#[derive(Debug, Serialize)]
pub struct LargestRow {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Human-readable size: B, then KB/MB/GB with one decimal place.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn stdout(use_color: bool) -> StandardStream {
    let choice = if use_color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

fn bold() -> ColorSpec {
    let mut spec = ColorSpec::new();
    spec.set_bold(true);
    spec
}

fn cyan() -> ColorSpec {
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(Color::Cyan));
    spec
}

/// Print one directory listing as a table, hidden entries grouped after
/// the visible ones.
pub fn print_listing(entries: &[DirEntry], use_color: bool) -> io::Result<()> {
    let mut out = stdout(use_color);

    if entries.is_empty() {
        writeln!(out, "(empty directory)")?;
        return Ok(());
    }

    out.set_color(&bold())?;
    writeln!(
        out,
        "{:<40} {:<6} {:>12} {:<12}",
        "Name", "Type", "Size", "Modified"
    )?;
    out.reset()?;

    let (visible, hidden): (Vec<_>, Vec<_>) = entries.iter().partition(|e| !e.hidden);
    for entry in &visible {
        write_listing_row(&mut out, entry, use_color)?;
    }
    if !hidden.is_empty() {
        writeln!(out)?;
        out.set_color(&bold())?;
        writeln!(out, "Hidden:")?;
        out.reset()?;
        for entry in &hidden {
            write_listing_row(&mut out, entry, use_color)?;
        }
    }
    Ok(())
}

fn write_listing_row(out: &mut StandardStream, entry: &DirEntry, use_color: bool) -> io::Result<()> {
    let name = truncate(&entry.name, 40);
    let kind = match entry.kind {
        crate::entry::EntryKind::Directory => "dir",
        crate::entry::EntryKind::File => "file",
        crate::entry::EntryKind::Unknown => "?",
    };
    let size = if entry.is_dir() {
        "<DIR>".to_string()
    } else {
        format_size(entry.size_bytes)
    };
    let modified = entry
        .modified
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string());

    if use_color && entry.is_dir() {
        out.set_color(&cyan())?;
    }
    write!(out, "{:<40}", name)?;
    out.reset()?;
    writeln!(out, " {:<6} {:>12} {:<12}", kind, size, modified)
}

/// Print the five-section directory summary.
pub fn print_summary(summary: &DirectorySummary, use_color: bool) -> io::Result<()> {
    let mut out = stdout(use_color);

    out.set_color(&bold())?;
    writeln!(out, "Directory analysis: {}", summary.path.display())?;
    out.reset()?;
    writeln!(out, "───────────────────")?;

    writeln!(out, "Files:       {}", summary.file_count)?;
    writeln!(out, "Total size:  {}", format_size(summary.total_bytes))?;
    writeln!(out)?;

    if !summary.extensions.is_empty() {
        out.set_color(&bold())?;
        writeln!(out, "By extension:")?;
        out.reset()?;
        for row in summary.extensions.iter().take(10) {
            write!(out, "  ")?;
            out.set_color(&cyan())?;
            write!(out, "{:<16}", row.extension)?;
            out.reset()?;
            writeln!(
                out,
                "{:>8} files  {:>10}",
                row.count,
                format_size(row.total_bytes)
            )?;
        }
        if summary.extensions.len() > 10 {
            writeln!(out, "  ... and {} more", summary.extensions.len() - 10)?;
        }
        writeln!(out)?;
    }

    out.set_color(&bold())?;
    writeln!(out, "Attributes:")?;
    out.reset()?;
    writeln!(out, "  hidden:    {}", summary.attributes.hidden)?;
    writeln!(out, "  system:    {}", summary.attributes.system)?;
    writeln!(out, "  read-only: {}", summary.attributes.readonly)?;
    writeln!(out)?;

    if !summary.largest.is_empty() {
        out.set_color(&bold())?;
        writeln!(out, "Largest files:")?;
        out.reset()?;
        for (i, row) in summary.largest.iter().enumerate() {
            writeln!(
                out,
                "  {}. {}  {}",
                i + 1,
                row.path.display(),
                format_size(row.size_bytes)
            )?;
        }
    }

    if summary.subtrees_skipped > 0 || summary.links_skipped > 0 {
        writeln!(out)?;
        writeln!(
            out,
            "Note: skipped {} unreadable subdirectories and {} links",
            summary.subtrees_skipped, summary.links_skipped
        )?;
    }
    Ok(())
}

/// Print search matches as plain paths, truncated past [`MAX_LISTED`].
pub fn print_matches(matches: &[SearchMatch], use_color: bool) -> io::Result<()> {
    let mut out = stdout(use_color);

    out.set_color(&bold())?;
    writeln!(out, "{} files found", matches.len())?;
    out.reset()?;

    for m in matches.iter().take(MAX_LISTED) {
        writeln!(out, "  {}", m.path.display())?;
    }
    if matches.len() > MAX_LISTED {
        writeln!(out, "  ... and {} more", matches.len() - MAX_LISTED)?;
    }
    Ok(())
}

/// Print search matches with sizes, for size-ordered result sets.
pub fn print_size_matches(matches: &[SearchMatch], use_color: bool) -> io::Result<()> {
    let mut out = stdout(use_color);

    out.set_color(&bold())?;
    writeln!(out, "{} files found", matches.len())?;
    out.reset()?;

    for m in matches.iter().take(MAX_LISTED) {
        writeln!(
            out,
            "  {:>10}  {:<12} {}",
            format_size(m.size_bytes),
            m.extension,
            m.path.display()
        )?;
    }
    if matches.len() > MAX_LISTED {
        writeln!(out, "  ... and {} more", matches.len() - MAX_LISTED)?;
    }
    Ok(())
}

/// Print search matches grouped by parent directory, largest group
/// first; used for the multi-root system-file search.
pub fn print_grouped_matches(matches: &[SearchMatch], use_color: bool) -> io::Result<()> {
    let mut out = stdout(use_color);

    out.set_color(&bold())?;
    writeln!(out, "{} files found", matches.len())?;
    out.reset()?;

    let mut by_dir: Vec<(PathBuf, u64)> = Vec::new();
    for m in matches {
        let dir = m.path.parent().map(PathBuf::from).unwrap_or_default();
        match by_dir.iter_mut().find(|(d, _)| *d == dir) {
            Some((_, n)) => *n += 1,
            None => by_dir.push((dir, 1)),
        }
    }
    by_dir.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    for (dir, n) in by_dir.iter().take(MAX_LISTED) {
        writeln!(out, "  {:>6}  {}", n, dir.display())?;
    }
    if by_dir.len() > MAX_LISTED {
        writeln!(out, "  ... and {} more directories", by_dir.len() - MAX_LISTED)?;
    }
    Ok(())
}

/// Print any serializable value as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    println!("{}", json);
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        s.to_string()
    }
}
