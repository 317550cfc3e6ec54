//! Built-in rules

pub mod element_newline;
pub mod require_closing_tags;

use crate::diagnostic::Severity;
use crate::rule::{Rule, RuleMeta};

/// Metadata of every built-in rule, in execution order
pub fn builtin_metas() -> [&'static RuleMeta; 2] {
    [&require_closing_tags::META, &element_newline::META]
}

/// A configured rule together with the severity it reports at
pub struct ActiveRule {
    pub rule: Box<dyn Rule>,
    pub severity: Severity,
}

impl ActiveRule {
    pub fn new(rule: Box<dyn Rule>, severity: Severity) -> Self {
        Self { rule, severity }
    }

    pub fn id(&self) -> &str {
        self.rule.meta().id
    }
}

impl std::fmt::Debug for ActiveRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveRule")
            .field("id", &self.id())
            .field("severity", &self.severity)
            .finish()
    }
}
