//! Core linter engine

use crate::ast::Document;
use crate::config::{Config, ConfigError};
use crate::diagnostic::{Diagnostic, Location, Severity};
use crate::disable::InlineDisables;
use crate::fixer::apply_fixes;
use crate::parser::parse;
use crate::rule::RuleContext;
use crate::rules::ActiveRule;
use crate::visit::walk;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Rule id used for files that could not be read
pub const FILE_READ_ERROR: &str = "file-read-error";

/// Result of linting operation
#[derive(Debug, Default)]
pub struct LintResult {
    /// All diagnostics
    pub diagnostics: Vec<Diagnostic>,

    /// Files processed
    pub files_processed: usize,

    /// Files with errors
    pub files_with_errors: usize,

    /// Files with warnings
    pub files_with_warnings: usize,

    /// Total errors
    pub error_count: usize,

    /// Total warnings
    pub warning_count: usize,

    /// Total info messages
    pub info_count: usize,

    /// Total diagnostics that carry a fix
    pub fixable_count: usize,

    /// Processing duration
    pub duration: Duration,
}

impl LintResult {
    /// Result for a single file
    fn for_file(diagnostics: Vec<Diagnostic>) -> Self {
        let mut result = LintResult {
            files_processed: 1,
            ..LintResult::default()
        };

        for diag in &diagnostics {
            match diag.severity {
                Severity::Error => result.error_count += 1,
                Severity::Warning => result.warning_count += 1,
                Severity::Info => result.info_count += 1,
            }
            if diag.has_fix() {
                result.fixable_count += 1;
            }
        }

        if result.error_count > 0 {
            result.files_with_errors = 1;
        }
        if result.warning_count > 0 {
            result.files_with_warnings = 1;
        }

        result.diagnostics = diagnostics;
        result
    }

    /// Check if there are any errors
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// Check if there are any warnings
    pub fn has_warnings(&self) -> bool {
        self.warning_count > 0
    }

    /// Check if result is clean (no errors or warnings)
    pub fn is_clean(&self) -> bool {
        self.error_count == 0 && self.warning_count == 0
    }

    /// Get exit code (0 = success, 1 = warnings, 2 = errors)
    pub fn exit_code(&self) -> i32 {
        if self.error_count > 0 {
            2
        } else if self.warning_count > 0 {
            1
        } else {
            0
        }
    }

    /// Merge another result into this one
    pub fn merge(&mut self, other: LintResult) {
        self.diagnostics.extend(other.diagnostics);
        self.files_processed += other.files_processed;
        self.files_with_errors += other.files_with_errors;
        self.files_with_warnings += other.files_with_warnings;
        self.error_count += other.error_count;
        self.warning_count += other.warning_count;
        self.info_count += other.info_count;
        self.fixable_count += other.fixable_count;
    }
}

/// Outcome of the fix-and-relint loop over one source
#[derive(Debug, Clone, Default)]
pub struct FixOutcome {
    /// Source after all passes
    pub output: String,
    /// Passes that applied at least one fix
    pub passes: usize,
    /// Total fixes applied over all passes
    pub fixes_applied: usize,
    /// Diagnostics still reported for `output`
    pub remaining: Vec<Diagnostic>,
}

impl FixOutcome {
    pub fn changed(&self) -> bool {
        self.fixes_applied > 0
    }
}

/// Fix outcome for a file on disk
#[derive(Debug, Clone)]
pub struct FileFix {
    pub path: PathBuf,
    pub original: String,
    pub outcome: FixOutcome,
}

/// The main linter engine
pub struct Engine {
    /// Configuration
    config: Config,

    /// Activated rules, in execution order
    rules: Vec<ActiveRule>,
}

impl Engine {
    /// Create an engine, activating every enabled rule
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let rules = config.build_rules()?;
        Ok(Self { config, rules })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn rules(&self) -> &[ActiveRule] {
        &self.rules
    }

    /// Parse a source with the configured parser options
    pub fn parse(&self, source: &str) -> Document {
        parse(source, &self.config.parser)
    }

    /// Run every rule over a parsed document
    pub fn lint_document(&self, document: &Document, path: &Path) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for active in &self.rules {
            let mut ctx = RuleContext::new(active.rule.meta(), active.severity, path, document);
            let mut checker = active.rule.checker();
            walk(document, checker.as_mut(), &mut ctx);
            diagnostics.extend(ctx.into_diagnostics());
        }

        let mut diagnostics = InlineDisables::from_document(document).filter(diagnostics);
        diagnostics.sort_by(|a, b| {
            a.span
                .start
                .cmp(&b.span.start)
                .then(a.span.end.cmp(&b.span.end))
                .then_with(|| a.rule_id.cmp(&b.rule_id))
        });
        diagnostics
    }

    /// Lint source text that belongs to `path`
    pub fn lint_source(&self, source: &str, path: &Path) -> LintResult {
        let start = Instant::now();
        let document = self.parse(source);
        let mut result = LintResult::for_file(self.lint_document(&document, path));
        result.duration = start.elapsed();
        result
    }

    /// Lint a single file
    pub fn lint_file(&self, path: &Path) -> LintResult {
        log::debug!("linting {}", path.display());

        match std::fs::read_to_string(path) {
            Ok(content) => self.lint_source(&content, path),
            Err(e) => LintResult::for_file(vec![read_error(path, &e)]),
        }
    }

    /// Lint multiple files
    pub fn lint_files(&self, files: &[PathBuf]) -> LintResult {
        let start = Instant::now();

        let results: Vec<LintResult> = self.map_files(files, |f| self.lint_file(f));

        let mut combined = LintResult::default();
        for result in results {
            combined.merge(result);
        }

        combined.duration = start.elapsed();
        combined
    }

    /// Lint, fix and re-lint until nothing changes or the pass limit is hit
    pub fn fix_source(&self, source: &str, path: &Path) -> FixOutcome {
        let max_passes = self.config.engine.max_fix_passes.max(1);
        let mut outcome = FixOutcome {
            output: source.to_string(),
            ..FixOutcome::default()
        };

        loop {
            let document = self.parse(&outcome.output);
            let diagnostics = self.lint_document(&document, path);

            if outcome.passes >= max_passes {
                log::debug!(
                    "{}: stopping after {} fix passes",
                    path.display(),
                    outcome.passes
                );
                outcome.remaining = diagnostics;
                return outcome;
            }

            let fixed = apply_fixes(&outcome.output, &diagnostics);
            if !fixed.changed() {
                outcome.remaining = diagnostics;
                return outcome;
            }

            outcome.passes += 1;
            outcome.fixes_applied += fixed.applied;
            log::debug!(
                "{}: pass {} applied {} fixes ({} deferred)",
                path.display(),
                outcome.passes,
                fixed.applied,
                fixed.skipped
            );
            outcome.output = fixed.output;
        }
    }

    /// Fix a file, writing the result back when `write` is set
    pub fn fix_file(&self, path: &Path, write: bool) -> std::io::Result<FileFix> {
        let original = std::fs::read_to_string(path)?;
        let outcome = self.fix_source(&original, path);

        if write && outcome.changed() {
            std::fs::write(path, &outcome.output)?;
            log::debug!("wrote {}", path.display());
        }

        Ok(FileFix {
            path: path.to_path_buf(),
            original,
            outcome,
        })
    }

    /// Fix multiple files. Unreadable files are reported as diagnostics.
    pub fn fix_files(&self, files: &[PathBuf], write: bool) -> (Vec<FileFix>, LintResult) {
        let start = Instant::now();

        let results: Vec<(Option<FileFix>, LintResult)> =
            self.map_files(files, |f| match self.fix_file(f, write) {
                Ok(fix) => {
                    let result = LintResult::for_file(fix.outcome.remaining.clone());
                    (Some(fix), result)
                }
                Err(e) => (None, LintResult::for_file(vec![read_error(f, &e)])),
            });

        let mut fixes = Vec::new();
        let mut combined = LintResult::default();
        for (fix, result) in results {
            fixes.extend(fix);
            combined.merge(result);
        }

        combined.duration = start.elapsed();
        (fixes, combined)
    }

    fn map_files<T, F>(&self, files: &[PathBuf], f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&Path) -> T + Sync + Send,
    {
        if !self.config.engine.parallel || files.len() < 2 {
            return files.iter().map(|p| f(p)).collect();
        }

        let mut builder = rayon::ThreadPoolBuilder::new();
        if self.config.engine.jobs > 0 {
            builder = builder.num_threads(self.config.engine.jobs);
        }
        match builder.build() {
            Ok(pool) => pool.install(|| files.par_iter().map(|p| f(p)).collect()),
            Err(e) => {
                log::warn!("failed to start thread pool, linting sequentially: {}", e);
                files.iter().map(|p| f(p)).collect()
            }
        }
    }
}

fn read_error(path: &Path, error: &std::io::Error) -> Diagnostic {
    Diagnostic::new(
        FILE_READ_ERROR,
        "READ",
        Severity::Error,
        &format!("Failed to read file: {}", error),
        Location::new(path.to_path_buf(), 0, 0),
    )
}
