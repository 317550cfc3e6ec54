//! Diagnostic types for linting results

use crate::ast::{Located, SourceLocation, Span};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Severity level for diagnostics
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,
    /// Warning - potential issue
    #[default]
    Warning,
    /// Error - definite problem
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" | "hint" | "note" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" | "err" => Ok(Severity::Error),
            _ => Err(()),
        }
    }
}

/// Source code location
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// File path
    pub file: PathBuf,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub column: usize,
    /// End line number (1-based)
    pub end_line: usize,
    /// End column number (1-based, exclusive)
    pub end_column: usize,
}

impl Location {
    pub fn new(file: PathBuf, line: usize, column: usize) -> Self {
        Self {
            file,
            line,
            column,
            end_line: line,
            end_column: column,
        }
    }

    /// Convert a tree location (0-based columns) into a display location
    pub fn from_source(file: PathBuf, loc: SourceLocation) -> Self {
        Self {
            file,
            line: loc.start.line,
            column: loc.start.column + 1,
            end_line: loc.end.line,
            end_column: loc.end.column + 1,
        }
    }

    /// Width of the highlighted region when it fits on one line
    pub fn length(&self) -> usize {
        if self.line == self.end_line {
            self.end_column.saturating_sub(self.column)
        } else {
            0
        }
    }
}

/// A single text edit over a byte range of the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Edit {
    pub fn replace_range(span: Span, text: impl Into<String>) -> Self {
        Self {
            start: span.start,
            end: span.end,
            text: text.into(),
        }
    }

    pub fn insert_before(target: &impl Located, text: impl Into<String>) -> Self {
        let at = target.span().start;
        Self::replace_range(Span::new(at, at), text)
    }

    pub fn insert_after(target: &impl Located, text: impl Into<String>) -> Self {
        let at = target.span().end;
        Self::replace_range(Span::new(at, at), text)
    }

    pub fn remove_range(span: Span) -> Self {
        Self::replace_range(span, "")
    }

    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }
}

/// A set of non-overlapping edits that resolves one diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fix {
    /// Edits in source order
    pub edits: Vec<Edit>,
}

impl Fix {
    /// Build a fix; an empty edit list means "not fixable"
    pub fn new(mut edits: Vec<Edit>) -> Option<Self> {
        if edits.is_empty() {
            return None;
        }
        edits.sort_by_key(|e| (e.start, e.end));
        Some(Self { edits })
    }

    /// Whether any two edits of this fix touch the same bytes
    pub fn has_overlapping_edits(&self) -> bool {
        self.edits.windows(2).any(|pair| pair[1].start < pair[0].end)
    }

    /// Covered byte range, from the first edit start to the last edit end
    pub fn span(&self) -> Span {
        let start = self.edits.iter().map(|e| e.start).min().unwrap_or(0);
        let end = self.edits.iter().map(|e| e.end).max().unwrap_or(start);
        Span::new(start, end)
    }

    /// Collapse the edits into one replacement of [`Fix::span`]
    pub fn merged(&self, source: &str) -> Edit {
        let span = self.span();
        let mut text = String::new();
        let mut cursor = span.start;
        for edit in &self.edits {
            text.push_str(&source[cursor..edit.start]);
            text.push_str(&edit.text);
            cursor = edit.end;
        }
        text.push_str(&source[cursor..span.end]);
        Edit::replace_range(span, text)
    }
}

/// A lint diagnostic (warning, error, etc.)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Rule ID that triggered this diagnostic
    pub rule_id: String,
    /// Message identifier within the rule (e.g. `MISSING_SELF`)
    pub message_id: String,
    /// Severity level
    pub severity: Severity,
    /// Human-readable message
    pub message: String,
    /// Values substituted into the message template
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    /// Source location
    pub location: Location,
    /// Byte range of the anchor
    pub span: Span,
    /// The source line (for display)
    pub source_line: Option<String>,
    /// Help text (usually rule description)
    pub help: Option<String>,
    /// Suggested fix
    pub fix: Option<Fix>,
}

impl Diagnostic {
    /// Create a new diagnostic
    pub fn new(
        rule_id: &str,
        message_id: &str,
        severity: Severity,
        message: &str,
        location: Location,
    ) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            message_id: message_id.to_string(),
            severity,
            message: message.to_string(),
            data: BTreeMap::new(),
            location,
            span: Span::default(),
            source_line: None,
            help: None,
            fix: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn with_data(mut self, data: BTreeMap<String, String>) -> Self {
        self.data = data;
        self
    }

    /// Add source line for display
    pub fn with_source_line(mut self, line: &str) -> Self {
        self.source_line = Some(line.to_string());
        self
    }

    /// Add help text
    pub fn with_help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    pub fn with_fix(mut self, fix: Option<Fix>) -> Self {
        self.fix = fix;
        self
    }

    /// Check if this diagnostic has a fix
    pub fn has_fix(&self) -> bool {
        self.fix.is_some()
    }

    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Check if this is a warning
    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}
