//! Markup Lint CLI
//!
//! Lints HTML files for closing-tag and line-break style, optionally fixing
//! them in place.

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use glob::{glob, Pattern};
use markup_lint::config::{ColorMode, Config, OutputFormat};
use markup_lint::engine::Engine;
use markup_lint::fixer::unified_diff;
use markup_lint::output::formatter_for;
use markup_lint::rules::builtin_metas;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "markup-lint",
    version,
    about = "HTML structure and layout linter",
    long_about = "Checks HTML for missing closing tags, self-closing style and block-level line breaks, with auto-fix."
)]
struct Cli {
    /// Files or glob patterns to lint (defaults to the configured include patterns)
    files: Vec<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<Format>,

    /// Apply fixes (reported only, unless --write is given)
    #[arg(long)]
    fix: bool,

    /// Write fixed files back to disk
    #[arg(long, requires = "fix")]
    write: bool,

    /// Print a unified diff of the fixes
    #[arg(long, requires = "fix")]
    diff: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// List built-in rules and exit
    #[arg(long)]
    list_rules: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    if cli.list_rules {
        list_rules();
        return Ok(0);
    }

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load_default().context("Failed to load config")?,
    };

    if let Some(jobs) = cli.jobs {
        config.engine.jobs = jobs;
    }
    if let Some(format) = cli.format {
        config.output.format = format.into();
    }
    if cli.no_color {
        config.output.color = ColorMode::Never;
    }
    match config.output.color {
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Auto => {}
    }

    let files = collect_files(cli, &config)?;
    let colored = config.output.color != ColorMode::Never;
    let formatter = formatter_for(config.output.format, colored);
    let engine = Engine::new(config)?;

    if !cli.fix {
        let result = engine.lint_files(&files);
        print!("{}", formatter.format(&result));
        return Ok(result.exit_code());
    }

    let (fixes, result) = engine.fix_files(&files, cli.write);
    let changed: Vec<_> = fixes.iter().filter(|f| f.outcome.changed()).collect();

    if cli.diff {
        for fix in &changed {
            print!("{}", unified_diff(&fix.path, &fix.original, &fix.outcome.output));
        }
    }

    let applied: usize = changed.iter().map(|f| f.outcome.fixes_applied).sum();
    let verb = if cli.write { "Fixed" } else { "Would fix" };
    eprintln!(
        "{} {} {} in {} {}",
        verb,
        applied,
        if applied == 1 { "problem" } else { "problems" },
        changed.len(),
        if changed.len() == 1 { "file" } else { "files" }
    );

    print!("{}", formatter.format(&result));
    Ok(result.exit_code())
}

fn list_rules() {
    for meta in builtin_metas() {
        println!(
            "{} {:<12} {}{}",
            format!("{:<24}", meta.id).cyan(),
            meta.category.to_string(),
            meta.description,
            if meta.fixable { " (fixable)" } else { "" }
        );
    }
}

/// Expand CLI arguments (or the configured include patterns) into files
fn collect_files(cli: &Cli, config: &Config) -> anyhow::Result<Vec<PathBuf>> {
    let patterns: Vec<String> = if cli.files.is_empty() {
        config.files.include.clone()
    } else {
        cli.files.clone()
    };

    let exclude: Vec<Pattern> = config
        .files
        .exclude
        .iter()
        .map(|p| Pattern::new(p).with_context(|| format!("Invalid exclude pattern '{}'", p)))
        .collect::<anyhow::Result<_>>()?;
    let is_excluded = |path: &Path| exclude.iter().any(|p| p.matches_path(path));

    let mut files = Vec::new();
    for pattern in &patterns {
        let path = Path::new(pattern);
        if path.is_file() {
            files.push(path.to_path_buf());
            continue;
        }

        let paths = glob(pattern).with_context(|| format!("Invalid pattern '{}'", pattern))?;
        for entry in paths.flatten() {
            if entry.is_file() && !is_excluded(&entry) {
                files.push(entry);
            }
        }
    }

    files.sort();
    files.dedup();

    if files.is_empty() {
        bail!("No files found to lint");
    }
    log::debug!("collected {} files", files.len());
    Ok(files)
}
