//! CLI entry point for rove

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use rove::report::{self, DirectorySummary, ExtensionRow, LargestRow};
use rove::search::{self, ExtensionFinder, PatternFinder, SizeFinder};
use rove::stats::{AttributeTally, ByteTotal, ExtensionHistogram, FileCount, Largest};
use rove::walk::{CancelToken, ParallelVisitor, WalkError, WalkStats, Walker};

/// Color output mode
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum ColorMode {
    /// Auto-detect based on terminal and environment
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Determine whether to use color output based on mode and environment.
fn should_use_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => {
            // Respect NO_COLOR environment variable (https://no-color.org/)
            if std::env::var_os("NO_COLOR").is_some() {
                return false;
            }
            if std::env::var_os("FORCE_COLOR").is_some() {
                return true;
            }
            if std::env::var("TERM").map(|t| t == "dumb").unwrap_or(false) {
                return false;
            }
            std::io::stdout().is_terminal()
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "rove")]
#[command(about = "Explore, analyze, and search directory trees")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Control color output: auto, always, never
    #[arg(long = "color", value_name = "WHEN", default_value = "auto", global = true)]
    color: ColorMode,

    /// Output in JSON format
    #[arg(long = "json", global = true)]
    json: bool,

    /// Worker threads for traversal
    /// (1 = sequential, 0 = one per core, N = use N workers)
    #[arg(short = 'j', long = "jobs", default_value = "1", global = true)]
    jobs: usize,

    /// Give up after DURATION, keeping whatever was accumulated
    /// Duration format: 500ms, 30s, 5m
    #[arg(long = "timeout", value_name = "DURATION", global = true)]
    timeout: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the immediate contents of a directory
    List {
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Aggregate statistics for a directory tree
    Stats {
        #[arg(default_value = ".")]
        path: PathBuf,

        /// How many of the largest files to report
        #[arg(long = "top", default_value = "5")]
        top: usize,
    },
    /// Find files by wildcard pattern (* and ?)
    Find {
        pattern: String,

        #[arg(default_value = ".")]
        path: PathBuf,

        /// Match case-sensitively
        #[arg(short = 'c', long = "case-sensitive")]
        case_sensitive: bool,

        /// Stop after N matches
        #[arg(short = 'n', long = "limit")]
        limit: Option<usize>,
    },
    /// Find files by extension
    Ext {
        /// Extensions, comma-separated, with or without the leading dot
        extensions: String,

        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Find files at or above a size threshold
    Large {
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Minimum size in megabytes
        #[arg(long = "min-mb", default_value = "10")]
        min_mb: f64,
    },
    /// Find system files (.exe, .dll, .sys)
    System {
        /// Search this path instead of the well-known system locations
        path: Option<PathBuf>,
    },
}

fn main() {
    let args = Args::parse();

    let cancel = match &args.timeout {
        Some(s) => match humantime::parse_duration(s.trim()) {
            Ok(d) => CancelToken::with_timeout(d),
            Err(e) => {
                eprintln!("rove: invalid --timeout '{}': {}", s, e);
                process::exit(1);
            }
        },
        None => CancelToken::new(),
    };
    let walker = Walker::new().with_cancel(cancel).with_workers(args.jobs);

    if let Err(e) = run(&args, &walker) {
        eprintln!("rove: error writing output: {}", e);
        process::exit(1);
    }
}

fn run(args: &Args, walker: &Walker) -> io::Result<()> {
    let use_color = !args.json && should_use_color(args.color);

    match &args.command {
        Command::List { path } => {
            let entries = rove::list_dir(path).unwrap_or_else(|e| fail(e));
            if args.json {
                report::print_json(&entries)
            } else {
                report::print_listing(&entries, use_color)
            }
        }
        Command::Stats { path, top } => {
            let summary = collect_summary(walker, args.jobs, path, *top).unwrap_or_else(|e| fail(e));
            if args.json {
                report::print_json(&summary)
            } else {
                report::print_summary(&summary, use_color)
            }
        }
        Command::Find {
            pattern,
            path,
            case_sensitive,
            limit,
        } => {
            let mut finder = PatternFinder::new(pattern, *case_sensitive)
                .unwrap_or_else(|e| fail(format!("invalid pattern '{}': {}", pattern, e)));
            if let Some(n) = limit {
                finder = finder.with_limit(*n);
            }
            drive(walker, args.jobs, path, &mut finder).unwrap_or_else(|e| fail(e));
            let matches = finder.into_matches();
            if args.json {
                report::print_json(&matches)
            } else {
                report::print_matches(&matches, use_color)
            }
        }
        Command::Ext { extensions, path } => {
            let exts: Vec<&str> = extensions
                .split(',')
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .collect();
            if exts.is_empty() {
                fail("no extensions given");
            }
            let mut finder = ExtensionFinder::new(exts);
            drive(walker, args.jobs, path, &mut finder).unwrap_or_else(|e| fail(e));
            let matches = finder.into_matches();
            if args.json {
                report::print_json(&matches)
            } else {
                report::print_matches(&matches, use_color)
            }
        }
        Command::Large { path, min_mb } => {
            let mut finder = SizeFinder::new(*min_mb);
            drive(walker, args.jobs, path, &mut finder).unwrap_or_else(|e| fail(e));
            let matches = finder.into_matches();
            if args.json {
                report::print_json(&matches)
            } else {
                report::print_size_matches(&matches, use_color)
            }
        }
        Command::System { path } => {
            let matches =
                search::find_system_files(walker, path.as_deref()).unwrap_or_else(|e| fail(e));
            if args.json {
                report::print_json(&matches)
            } else {
                report::print_grouped_matches(&matches, use_color)
            }
        }
    }
}

/// Run one visitor over `root`, sequentially or fork-join depending on
/// the worker count.
fn drive<V: ParallelVisitor>(
    walker: &Walker,
    jobs: usize,
    root: &Path,
    visitor: &mut V,
) -> Result<WalkStats, WalkError> {
    if jobs == 1 {
        walker.walk(root, visitor)
    } else {
        walker.walk_parallel(root, visitor)
    }
}

/// Drive one aggregator per summary section, the way the interactive
/// original presented them. Each traversal is independent; the counters
/// from the last one describe the same tree as the rest.
fn collect_summary(
    walker: &Walker,
    jobs: usize,
    path: &Path,
    top: usize,
) -> Result<DirectorySummary, WalkError> {
    let mut count = FileCount::new();
    drive(walker, jobs, path, &mut count)?;

    let mut bytes = ByteTotal::new();
    drive(walker, jobs, path, &mut bytes)?;

    let mut histogram = ExtensionHistogram::new();
    drive(walker, jobs, path, &mut histogram)?;

    let mut tally = AttributeTally::new();
    drive(walker, jobs, path, &mut tally)?;

    let mut largest = Largest::new(top);
    let stats = drive(walker, jobs, path, &mut largest)?;

    Ok(DirectorySummary {
        path: path.to_path_buf(),
        file_count: count.total(),
        total_bytes: bytes.total(),
        extensions: histogram
            .finalize()
            .into_iter()
            .map(|(extension, stat)| ExtensionRow {
                extension,
                count: stat.count,
                total_bytes: stat.total_bytes,
            })
            .collect(),
        attributes: tally.stats(),
        largest: largest
            .finalize()
            .into_iter()
            .map(|(path, size_bytes)| LargestRow { path, size_bytes })
            .collect(),
        subtrees_skipped: stats.subtrees_skipped,
        links_skipped: stats.links_skipped,
    })
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("rove: {}", message);
    process::exit(1);
}
