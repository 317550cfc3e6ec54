//! `require-closing-tags`: closing tags and self-closing syntax

use crate::ast::{Document, Node, NodeId, Span, Tag};
use crate::config::ConfigError;
use crate::diagnostic::Edit;
use crate::parser::{contains_ignore_ascii_case, FOREIGN_ROOTS, VOID_ELEMENTS};
use crate::query::is_text;
use crate::rule::{Rule, RuleCategory, RuleContext, RuleMeta};
use crate::visit::Visitor;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const MISSING: &str = "MISSING";
pub const MISSING_SELF: &str = "MISSING_SELF";
pub const UNEXPECTED: &str = "UNEXPECTED";

pub static META: RuleMeta = RuleMeta {
    id: "require-closing-tags",
    description: "Require closing tags, and enforce a consistent self-closing style",
    category: RuleCategory::Correctness,
    fixable: true,
    messages: &[
        (MISSING, "Missing closing tag for {{tag}}."),
        (MISSING_SELF, "Missing self closing tag for {{tag}}."),
        (UNEXPECTED, "Unexpected self closing tag for {{tag}}."),
    ],
};

/// Preferred way to end elements that may self-close
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelfClosing {
    Always,
    #[default]
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct RequireClosingTagsOptions {
    pub self_closing: SelfClosing,
    pub allow_self_closing_custom: bool,
    /// Regular expressions identifying custom element names
    pub custom_patterns: Vec<String>,
}

impl Default for RequireClosingTagsOptions {
    fn default() -> Self {
        Self {
            self_closing: SelfClosing::Never,
            allow_self_closing_custom: false,
            custom_patterns: vec!["-".to_string()],
        }
    }
}

pub struct RequireClosingTags {
    prefer_self_close: bool,
    allow_self_closing_custom: bool,
    custom_patterns: Vec<Regex>,
}

impl RequireClosingTags {
    pub fn new(options: &RequireClosingTagsOptions) -> Result<Self, ConfigError> {
        let custom_patterns = options
            .custom_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                    rule: META.id,
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            prefer_self_close: options.self_closing == SelfClosing::Always,
            allow_self_closing_custom: options.allow_self_closing_custom,
            custom_patterns,
        })
    }

    fn is_custom(&self, name: &str) -> bool {
        self.custom_patterns.iter().any(|re| re.is_match(name))
    }
}

impl Rule for RequireClosingTags {
    fn meta(&self) -> &RuleMeta {
        &META
    }

    fn checker(&self) -> Box<dyn Visitor + '_> {
        Box::new(Checker {
            rule: self,
            foreign: Vec::new(),
        })
    }
}

struct Checker<'r> {
    rule: &'r RequireClosingTags,
    /// Open `<svg>` / `<math>` elements, innermost last
    foreign: Vec<(NodeId, String)>,
}

impl Checker<'_> {
    fn check(&self, doc: &Document, node: &Node, tag: &Tag, ctx: &mut RuleContext) {
        let is_void = contains_ignore_ascii_case(&VOID_ELEMENTS, &tag.name);
        let is_custom = self.rule.is_custom(&tag.name);
        let can_self_close = is_void
            || !self.foreign.is_empty()
            || (is_custom && self.rule.allow_self_closing_custom && tag.children.is_empty());

        if tag.self_closing && is_custom && self.rule.allow_self_closing_custom {
            // accepted as authored, never forced either way
            self.check_self_close(doc, tag, true, false, ctx);
        } else if tag.self_closing || can_self_close {
            self.check_self_close(
                doc,
                tag,
                self.rule.prefer_self_close && can_self_close,
                can_self_close,
                ctx,
            );
        } else if tag.open_end.value != "/>" && tag.close.is_none() {
            ctx.report(node, MISSING, &[("tag", &label(tag))], Vec::new());
        }
    }

    fn check_self_close(
        &self,
        doc: &Document,
        tag: &Tag,
        should_self_close: bool,
        fixable: bool,
        ctx: &mut RuleContext,
    ) {
        let has_self_close = tag.open_end.value == "/>";
        let tag_label = label(tag);
        let open_end_span = Span::new(head_end(tag), tag.open_end.span.end);

        if should_self_close && !has_self_close {
            let mut edits = Vec::new();
            if fixable && has_only_blank_children(doc, tag) {
                edits.push(Edit::replace_range(open_end_span, " />"));
                if let Some(close) = &tag.close {
                    edits.push(Edit::remove_range(close.span));
                }
            }
            ctx.report(&tag.open_end, MISSING_SELF, &[("tag", &tag_label)], edits);
        }

        if !should_self_close && has_self_close {
            let mut edits = Vec::new();
            if fixable {
                edits.push(Edit::replace_range(open_end_span, ">"));
            }
            ctx.report(&tag.open_end, UNEXPECTED, &[("tag", &tag_label)], edits);
        }
    }
}

impl Visitor for Checker<'_> {
    fn enter_tag(&mut self, doc: &Document, node: &Node, tag: &Tag, ctx: &mut RuleContext) {
        self.check(doc, node, tag, ctx);
        if contains_ignore_ascii_case(&FOREIGN_ROOTS, &tag.name) {
            self.foreign.push((node.id, tag.name.clone()));
        }
    }

    fn exit_tag(&mut self, _doc: &Document, node: &Node, _tag: &Tag, _ctx: &mut RuleContext) {
        if self.foreign.last().is_some_and(|(id, _)| *id == node.id) {
            self.foreign.pop();
        }
    }
}

fn label(tag: &Tag) -> String {
    format!("<{}>", tag.name)
}

/// End of the tag name or of the last attribute
fn head_end(tag: &Tag) -> usize {
    tag.attributes
        .last()
        .map_or(tag.open_start.span.end, |attr| attr.span.end)
}

/// Collapsing `<x>...</x>` into `<x />` must not orphan real content
fn has_only_blank_children(doc: &Document, tag: &Tag) -> bool {
    tag.children.iter().all(|id| {
        let child = doc.node(*id);
        is_text(child) && child.content().is_some_and(|c| c.value.trim().is_empty())
    })
}
