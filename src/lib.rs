//! Markup Lint - structural style checks for HTML and HTML templates
//!
//! Parses markup into an arena tree, walks it with per-rule visitors and
//! reports diagnostics that may carry machine-applicable fixes.
//!
//! # Architecture
//!
//! ```text
//! CLI/API -> Engine -> parser -> Document -> walk(Rule visitors) -> Diagnostics -> fixer
//! ```
//!
//! Two rules ship built in:
//!
//! - `require-closing-tags`: every element is closed, and void / foreign /
//!   custom elements follow the configured self-closing style
//! - `element-newline`: block-level siblings and their content go on
//!   separate lines
//!
//! # Example
//!
//! ```
//! use markup_lint::{Config, Engine};
//! use std::path::Path;
//!
//! let engine = Engine::new(Config::default()).unwrap();
//! let result = engine.lint_source("<foo>", Path::new("index.html"));
//! assert_eq!(result.diagnostics[0].message, "Missing closing tag for <foo>.");
//! ```

pub mod ast;
pub mod config;
pub mod diagnostic;
pub mod disable;
pub mod engine;
pub mod fixer;
pub mod output;
pub mod parser;
pub mod query;
pub mod rule;
pub mod rules;
pub mod visit;

// Re-export main types
pub use ast::{Document, Node, NodeId, NodeKind, Span};
pub use config::{Config, ConfigError};
pub use diagnostic::{Diagnostic, Edit, Fix, Location, Severity};
pub use engine::{Engine, FixOutcome, LintResult};
pub use fixer::{apply_fixes, unified_diff, FixOutput};
pub use output::{JsonFormatter, OutputFormatter, TextFormatter};
pub use parser::{parse, ParserOptions};
pub use rule::{Rule, RuleContext, RuleMeta};
pub use visit::{walk, Visitor};
