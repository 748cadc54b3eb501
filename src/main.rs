//! projscan - A concurrent, gitignore-aware project scanner.
//!
//! Usage:
//!   projscan scan [PATH]                 List the files of a project
//!   projscan check-ignore PATH...        Explain ignore decisions
//!   projscan rules [PATH]                Show the compiled ignore rules
//!   projscan --help                      Show help

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use projscan_core::{ScanOutcome, ScanSource, ScannerConfig, relative_path};
use projscan_ignore::IgnoreEngine;
use projscan_scan::{LocalFs, ProjectScanner};

/// How long shutdown waits for worker threads.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(
    name = "projscan",
    version,
    about = "A concurrent, gitignore-aware project scanner",
    long_about = "projscan lists the files of a project the way git sees them.\n\n\
                  Scans run on a bounded worker pool under file, directory, depth \
                  and time ceilings, and results are cached until the project \
                  root changes."
)]
struct Cli {
    /// Scanner configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a project and list its files
    Scan {
        /// Project root
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Deepest directory level to descend into
        #[arg(long)]
        max_depth: Option<usize>,

        /// Maximum number of files to collect
        #[arg(long)]
        max_files: Option<usize>,

        /// Maximum number of directories to visit
        #[arg(long)]
        max_dirs: Option<usize>,

        /// Deadline for the whole scan in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Children handled by one unit of work
        #[arg(long)]
        batch_size: Option<usize>,

        /// Worker threads (0 = automatic)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Scan this many times on the same scanner
        #[arg(long, default_value = "1")]
        repeat: usize,
    },

    /// Show whether paths are ignored and which rule decided
    CheckIgnore {
        /// Project root
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Treat every path as a directory
        #[arg(short, long)]
        dir: bool,

        /// Paths to check, relative to the root
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// List the compiled ignore rules of a project
    Rules {
        /// Project root
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Scan {
            path,
            max_depth,
            max_files,
            max_dirs,
            timeout_ms,
            batch_size,
            threads,
            format,
            repeat,
        } => {
            let mut config = config;
            if let Some(max_depth) = max_depth {
                config.limits.max_depth = max_depth;
            }
            if let Some(max_files) = max_files {
                config.limits.max_files = max_files;
            }
            if let Some(max_dirs) = max_dirs {
                config.limits.max_directories = max_dirs;
            }
            if let Some(timeout_ms) = timeout_ms {
                config.limits.overall_timeout = Duration::from_millis(timeout_ms);
            }
            if let Some(batch_size) = batch_size {
                config.limits.batch_size = batch_size;
            }
            if let Some(threads) = threads {
                config.threads = threads;
            }
            run_scan(&path, config, format, repeat.max(1))?;
        }
        Command::CheckIgnore { root, dir, paths } => {
            run_check_ignore(&root, &config.ignore_file_name, dir, &paths)?;
        }
        Command::Rules { path } => {
            run_rules(&path, &config.ignore_file_name)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ScannerConfig> {
    let Some(path) = path else {
        return Ok(ScannerConfig::default());
    };

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: ScannerConfig = serde_json::from_str(&text)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    tracing::debug!(path = %path.display(), ?config, "Loaded configuration");
    Ok(config)
}

/// Scan a project and print its files.
fn run_scan(path: &Path, config: ScannerConfig, format: OutputFormat, repeat: usize) -> Result<()> {
    let source: Arc<dyn ScanSource> = Arc::new(LocalFs::new(path).context("Invalid path")?);
    let scanner = ProjectScanner::new(config).context("Failed to start scanner")?;

    eprintln!(
        "Scanning {} with {} workers...",
        source.root().display(),
        scanner.worker_count()
    );

    let mut last = None;
    for run in 1..=repeat {
        let outcome = scanner.scan(Arc::clone(&source));
        if repeat > 1 {
            eprintln!(
                " run {run}: {} in {:.2}ms{}",
                outcome.status,
                outcome.stats.elapsed.as_secs_f64() * 1000.0,
                if outcome.from_cache { " (cached)" } else { "" }
            );
        }
        last = Some(outcome);
    }

    scanner.shutdown(SHUTDOWN_GRACE);

    let Some(outcome) = last else {
        return Ok(());
    };

    match format {
        OutputFormat::Text => print_outcome(source.root(), &outcome),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
    }

    if !outcome.is_success() {
        bail!(
            "Scan {} ({})",
            outcome.status,
            outcome
                .cancel_reason
                .map(|r| r.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        );
    }

    Ok(())
}

fn print_outcome(root: &Path, outcome: &ScanOutcome) {
    for file in outcome.files.iter() {
        println!("{:>10}  {}", format_size(file.size), file.relative);
    }

    let total: u64 = outcome.files.iter().map(|f| f.size).sum();

    eprintln!();
    eprintln!("{}", "─".repeat(60));
    eprintln!(" {} - {}", root.display(), format_size(total));
    eprintln!(
        " {} files, {} directories visited",
        outcome.len(),
        outcome.stats.directories_visited
    );
    eprintln!(
        " {} in {:.2}s{}{}",
        outcome.status,
        outcome.stats.elapsed.as_secs_f64(),
        if outcome.from_cache { ", from cache" } else { "" },
        if outcome.truncated { ", truncated" } else { "" }
    );
    eprintln!("{}", "─".repeat(60));

    if !outcome.warnings.is_empty() {
        eprintln!();
        eprintln!("{} warning(s) during scan", outcome.warnings.len());
        for warning in &outcome.warnings {
            eprintln!("  {}: {}", warning.path.display(), warning.message);
        }
    }
}

/// Explain ignore decisions for a list of paths.
fn run_check_ignore(root: &Path, ignore_file_name: &str, dir: bool, paths: &[String]) -> Result<()> {
    let source = LocalFs::new(root).context("Invalid root")?;
    let engine = IgnoreEngine::load(&source, ignore_file_name);

    for raw in paths {
        let relative = to_relative(source.root(), raw);
        let is_dir = dir || source.root().join(&relative).is_dir();

        match engine.explain(&relative, is_dir) {
            Some(decision) if decision.is_ignored() => println!("ignored   {raw}  ({decision})"),
            Some(decision) => println!("included  {raw}  ({decision})"),
            None => println!("included  {raw}"),
        }
    }

    Ok(())
}

/// Resolve a user-supplied path against the project root.
fn to_relative(root: &Path, raw: &str) -> String {
    let path = Path::new(raw);
    if path.is_absolute() {
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if let Some(relative) = relative_path(root, &path) {
            return relative;
        }
    }
    raw.trim_start_matches("./").to_string()
}

/// Print the compiled rules per scope.
fn run_rules(path: &Path, ignore_file_name: &str) -> Result<()> {
    let source = LocalFs::new(path).context("Invalid path")?;
    let engine = IgnoreEngine::load(&source, ignore_file_name);

    println!("# {} ({} rules)", source.root().display(), engine.rule_count());

    let root = engine.root_rules();
    if !root.is_empty() {
        println!();
        println!("[root]");
        for rule in root.excludes().iter().chain(root.includes()) {
            println!("  {:<30} {}", rule.source(), rule.pattern().as_str());
        }
    }

    for (scope, rules) in engine.nested_rules() {
        println!();
        println!("[{scope}]");
        for rule in rules.excludes().iter().chain(rules.includes()) {
            println!("  {:<30} {}", rule.source(), rule.pattern().as_str());
        }
    }

    let mut fast: Vec<&str> = engine.fast_excluded_dirs().collect();
    if !fast.is_empty() {
        fast.sort_unstable();
        println!();
        println!("Fast-path directories: {}", fast.join(", "));
    }

    if !engine.warnings().is_empty() {
        eprintln!();
        for warning in engine.warnings() {
            eprintln!("warning: {}: {}", warning.path.display(), warning.message);
        }
    }

    Ok(())
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
