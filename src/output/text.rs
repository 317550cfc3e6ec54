//! Human-readable text output formatter

use super::OutputFormatter;
use crate::diagnostic::{Diagnostic, Severity};
use crate::engine::LintResult;
use colored::*;
use std::collections::BTreeMap;

/// Text formatter with optional color support
pub struct TextFormatter {
    /// Enable colored output
    pub colored: bool,

    /// Show the offending source line with a caret underline
    pub show_source: bool,

    /// Show help text
    pub show_help: bool,

    /// Show statistics
    pub show_stats: bool,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            colored: true,
            show_source: true,
            show_help: false,
            show_stats: true,
        }
    }
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable colors
    pub fn without_color(mut self) -> Self {
        self.colored = false;
        self
    }

    pub fn with_help(mut self) -> Self {
        self.show_help = true;
        self
    }

    fn paint(&self, text: &str, style: fn(&str) -> ColoredString) -> String {
        if self.colored {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn severity_str(&self, severity: Severity) -> String {
        let s = severity.to_string();
        match severity {
            Severity::Error => self.paint(&s, |s| s.red().bold()),
            Severity::Warning => self.paint(&s, |s| s.yellow().bold()),
            Severity::Info => self.paint(&s, |s| s.blue()),
        }
    }

    fn count(
        &self,
        n: usize,
        singular: &str,
        plural: &str,
        style: fn(&str) -> ColoredString,
    ) -> Option<String> {
        let noun = if n == 1 { singular } else { plural };
        (n > 0).then(|| self.paint(&format!("{} {}", n, noun), style))
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, result: &LintResult) -> String {
        let mut output = String::new();

        let mut by_file: BTreeMap<_, Vec<_>> = BTreeMap::new();
        for diag in &result.diagnostics {
            by_file.entry(&diag.location.file).or_default().push(diag);
        }

        for (file, diagnostics) in &by_file {
            output.push_str(&self.paint(&file.display().to_string(), |s| s.underline()));
            output.push('\n');
            for diag in diagnostics {
                output.push_str(&self.format_diagnostic(diag));
            }
            output.push('\n');
        }

        if self.show_stats {
            output.push_str(&format!(
                "{} {} processed",
                result.files_processed,
                if result.files_processed == 1 { "file" } else { "files" }
            ));

            let counts: Vec<String> = [
                self.count(result.error_count, "error", "errors", |s| s.red()),
                self.count(result.warning_count, "warning", "warnings", |s| s.yellow()),
                self.count(result.info_count, "info", "infos", |s| s.blue()),
            ]
            .into_iter()
            .flatten()
            .collect();

            if !counts.is_empty() {
                output.push_str(&format!(": {}", counts.join(", ")));
            }
            output.push('\n');

            if result.fixable_count > 0 {
                output.push_str(&format!(
                    "{} fixable with --fix\n",
                    result.fixable_count
                ));
            }

            output.push_str(&format!(
                "Finished in {:.2}s\n",
                result.duration.as_secs_f64()
            ));
        }

        output
    }

    fn format_diagnostic(&self, diag: &Diagnostic) -> String {
        let mut output = String::new();
        let bar = self.paint("|", |s| s.blue());

        output.push_str(&format!(
            "{}:{}:{}: {}[{}]: {}\n",
            diag.location.file.display(),
            diag.location.line,
            diag.location.column,
            self.severity_str(diag.severity),
            self.paint(&diag.rule_id, |s| s.cyan()),
            diag.message
        ));

        if self.show_source {
            if let Some(source) = &diag.source_line {
                let line_num = format!("{:>4}", diag.location.line);
                output.push_str(&format!(
                    "{} {} {}\n",
                    self.paint(&line_num, |s| s.blue()),
                    bar,
                    source
                ));

                if diag.location.column > 0 {
                    let padding = " ".repeat(diag.location.column - 1);
                    let underline = "^".repeat(diag.location.length().max(1));
                    output.push_str(&format!(
                        "     {} {}{}\n",
                        bar,
                        padding,
                        self.paint(&underline, |s| s.red())
                    ));
                }
            }
        }

        if self.show_help {
            if let Some(help) = &diag.help {
                output.push_str(&format!(
                    "     {} help: {}\n",
                    self.paint("=", |s| s.blue()),
                    help
                ));
            }
        }

        if diag.has_fix() {
            output.push_str(&format!(
                "     {} {}\n",
                self.paint("=", |s| s.green()),
                self.paint("fixable", |s| s.green())
            ));
        }

        output
    }
}
