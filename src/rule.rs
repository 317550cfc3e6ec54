//! Rule definition and per-document reporting

use crate::ast::{Document, Located, SourceLocation, Span};
use crate::diagnostic::{Diagnostic, Edit, Fix, Location, Severity};
use crate::visit::Visitor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Rule category for grouping related rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    /// Markup that is definitely wrong
    Correctness,
    /// Idiomatic and consistent style rules
    #[default]
    Style,
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleCategory::Correctness => write!(f, "correctness"),
            RuleCategory::Style => write!(f, "style"),
        }
    }
}

/// Static description of a rule
#[derive(Debug, Clone, Copy)]
pub struct RuleMeta {
    /// Unique rule identifier (e.g., "require-closing-tags")
    pub id: &'static str,
    pub description: &'static str,
    pub category: RuleCategory,
    /// Whether the rule can produce fixes at all
    pub fixable: bool,
    /// Message id -> template with `{{name}}` placeholders
    pub messages: &'static [(&'static str, &'static str)],
}

impl RuleMeta {
    pub fn message_template(&self, message_id: &str) -> Option<&'static str> {
        self.messages
            .iter()
            .find(|(id, _)| *id == message_id)
            .map(|(_, template)| *template)
    }
}

/// A configured lint rule.
///
/// Configured rules are immutable; every traversal asks for a fresh
/// [`Visitor`] that owns the per-document state.
pub trait Rule: Send + Sync {
    fn meta(&self) -> &RuleMeta;

    fn checker(&self) -> Box<dyn Visitor + '_>;
}

/// Where a diagnostic points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub span: Span,
    pub loc: SourceLocation,
}

impl Anchor {
    pub fn new(span: Span, loc: SourceLocation) -> Self {
        Self { span, loc }
    }
}

impl<T: Located> From<&T> for Anchor {
    fn from(target: &T) -> Self {
        Self::new(target.span(), target.loc())
    }
}

/// Substitute `{{name}}` placeholders
pub fn format_message(template: &str, data: &BTreeMap<String, String>) -> String {
    data.iter().fold(template.to_string(), |message, (key, value)| {
        message.replace(&format!("{{{{{}}}}}", key), value)
    })
}

/// Diagnostic sink for one rule over one document
pub struct RuleContext<'a> {
    meta: &'a RuleMeta,
    severity: Severity,
    file: &'a Path,
    document: &'a Document,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> RuleContext<'a> {
    pub fn new(
        meta: &'a RuleMeta,
        severity: Severity,
        file: &'a Path,
        document: &'a Document,
    ) -> Self {
        Self {
            meta,
            severity,
            file,
            document,
            diagnostics: Vec::new(),
        }
    }

    pub fn document(&self) -> &'a Document {
        self.document
    }

    /// Emit a diagnostic. An empty `edits` list reports without a fix.
    pub fn report(
        &mut self,
        anchor: impl Into<Anchor>,
        message_id: &str,
        data: &[(&str, &str)],
        edits: Vec<Edit>,
    ) {
        let anchor = anchor.into();
        let data: BTreeMap<String, String> = data
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let message = match self.meta.message_template(message_id) {
            Some(template) => format_message(template, &data),
            None => {
                log::warn!("{}: unknown message id {}", self.meta.id, message_id);
                message_id.to_string()
            }
        };

        let fix = Fix::new(edits).filter(|fix| {
            let overlapping = fix.has_overlapping_edits();
            if overlapping {
                log::warn!(
                    "{}: dropping fix for {} with overlapping edits",
                    self.meta.id,
                    message_id
                );
            }
            !overlapping
        });

        let location = Location::from_source(self.file.to_path_buf(), anchor.loc);
        let mut diagnostic = Diagnostic::new(
            self.meta.id,
            message_id,
            self.severity,
            &message,
            location,
        )
        .with_span(anchor.span)
        .with_data(data)
        .with_help(self.meta.description)
        .with_fix(fix);

        if let Some(line) = self.document.source_line(anchor.loc.start.line) {
            diagnostic = diagnostic.with_source_line(line);
        }

        self.diagnostics.push(diagnostic);
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse, ParserOptions};
    use std::path::PathBuf;

    const META: RuleMeta = RuleMeta {
        id: "test-rule",
        description: "A rule for tests",
        category: RuleCategory::Style,
        fixable: true,
        messages: &[("HELLO", "Hello {{tag}} and {{tag}}.")],
    };

    #[test]
    fn test_format_message() {
        let mut data = BTreeMap::new();
        data.insert("tag".to_string(), "<img>".to_string());
        assert_eq!(
            format_message("Missing closing tag for {{tag}}.", &data),
            "Missing closing tag for <img>."
        );
        assert_eq!(format_message("No data", &BTreeMap::new()), "No data");
    }

    #[test]
    fn test_report_builds_diagnostic() {
        let doc = parse("<p>\n<img></p>", &ParserOptions::default());
        let file = PathBuf::from("index.html");
        let img = doc
            .iter()
            .find(|n| n.as_tag().is_some_and(|t| t.name == "img"))
            .unwrap();

        let mut ctx = RuleContext::new(&META, Severity::Error, &file, &doc);
        ctx.report(img, "HELLO", &[("tag", "<img>")], vec![Edit::insert_after(img, "\n")]);
        let diags = ctx.into_diagnostics();

        assert_eq!(diags.len(), 1);
        let diag = &diags[0];
        assert_eq!(diag.message, "Hello <img> and <img>.");
        assert_eq!(diag.location.line, 2);
        assert_eq!(diag.location.column, 1);
        assert_eq!(diag.source_line.as_deref(), Some("<img></p>"));
        assert_eq!(diag.severity, Severity::Error);
        assert!(diag.has_fix());
    }

    #[test]
    fn test_report_drops_overlapping_fix() {
        let doc = parse("<p></p>", &ParserOptions::default());
        let file = PathBuf::from("index.html");
        let p = doc.node(doc.root().children()[0]);

        let mut ctx = RuleContext::new(&META, Severity::Warning, &file, &doc);
        ctx.report(
            p,
            "HELLO",
            &[],
            vec![
                Edit::replace_range(Span::new(0, 3), ""),
                Edit::replace_range(Span::new(2, 5), ""),
            ],
        );
        ctx.report(p, "UNKNOWN", &[], Vec::new());
        let diags = ctx.into_diagnostics();

        assert!(!diags[0].has_fix());
        assert_eq!(diags[1].message, "UNKNOWN");
    }
}
