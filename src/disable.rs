//! Inline disable comments
//!
//! ```html
//! <!-- markup-lint-disable element-newline -->
//! <!-- markup-lint-disable-next-line require-closing-tags -- legacy widget -->
//! ```
//!
//! The first form turns rules off for the whole document, the second for
//! diagnostics starting on the line after the comment. Several rule ids may
//! be given, separated by commas or spaces; `all` (or no id at all) matches
//! every rule. Anything after ` -- ` is a free-form reason.

use crate::ast::{Document, NodeKind};
use crate::diagnostic::Diagnostic;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

static DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^markup-lint-disable(-next-line)?(?:\s+(.*))?$").unwrap());

const ALL_RULES: &str = "all";

/// Disable directives collected from one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineDisables {
    file_rules: HashSet<String>,
    /// Rule ids disabled per 1-based line
    line_rules: HashMap<usize, HashSet<String>>,
}

impl InlineDisables {
    pub fn from_document(doc: &Document) -> Self {
        let mut disables = Self::default();

        for node in doc.iter() {
            let NodeKind::Comment(comment) = &node.kind else {
                continue;
            };
            let Some(caps) = DIRECTIVE.captures(comment.value.trim()) else {
                continue;
            };
            let rules = parse_rule_list(caps.get(2).map_or("", |m| m.as_str()));

            if caps.get(1).is_some() {
                let line = node.loc.end.line + 1;
                log::trace!("disabling {:?} on line {}", rules, line);
                disables.line_rules.entry(line).or_default().extend(rules);
            } else {
                log::trace!("disabling {:?} for the document", rules);
                disables.file_rules.extend(rules);
            }
        }

        disables
    }

    pub fn is_empty(&self) -> bool {
        self.file_rules.is_empty() && self.line_rules.is_empty()
    }

    pub fn is_disabled(&self, rule_id: &str, line: usize) -> bool {
        let matches =
            |rules: &HashSet<String>| rules.contains(rule_id) || rules.contains(ALL_RULES);
        matches(&self.file_rules) || self.line_rules.get(&line).is_some_and(matches)
    }

    /// Drop suppressed diagnostics
    pub fn filter(&self, diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
        if self.is_empty() {
            return diagnostics;
        }
        diagnostics
            .into_iter()
            .filter(|d| !self.is_disabled(&d.rule_id, d.location.line))
            .collect()
    }
}

fn parse_rule_list(text: &str) -> Vec<String> {
    let rules = text.split(" -- ").next().unwrap_or("");
    let ids: Vec<String> = rules
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();
    if ids.is_empty() {
        vec![ALL_RULES.to_string()]
    } else {
        ids
    }
}
