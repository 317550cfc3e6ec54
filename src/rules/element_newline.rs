//! `element-newline`: block-level elements go on their own line

use crate::ast::{Document, Node, NodeId, NodeKind, Tag};
use crate::config::ConfigError;
use crate::diagnostic::Edit;
use crate::query::{get_loc_between, get_span_between, LINE_BREAK};
use crate::rule::{Anchor, Rule, RuleCategory, RuleContext, RuleMeta};
use crate::visit::Visitor;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const EXPECT_NEW_LINE_AFTER: &str = "EXPECT_NEW_LINE_AFTER";
pub const EXPECT_NEW_LINE_BEFORE: &str = "EXPECT_NEW_LINE_BEFORE";
pub const EXPECT_NEW_LINE_AFTER_OPEN: &str = "EXPECT_NEW_LINE_AFTER_OPEN";
pub const EXPECT_NEW_LINE_BEFORE_CLOSE: &str = "EXPECT_NEW_LINE_BEFORE_CLOSE";

pub static META: RuleMeta = RuleMeta {
    id: "element-newline",
    description: "Enforce a line break between block-level siblings and around their content",
    category: RuleCategory::Style,
    fixable: true,
    messages: &[
        (EXPECT_NEW_LINE_AFTER, "There should be a linebreak after {{tag}}."),
        (EXPECT_NEW_LINE_BEFORE, "There should be a linebreak before {{tag}}."),
        (EXPECT_NEW_LINE_AFTER_OPEN, "There should be a linebreak after {{tag}} open."),
        (EXPECT_NEW_LINE_BEFORE_CLOSE, "There should be a linebreak before {{tag}} close."),
    ],
};

/// Preset expanding to the inline-level HTML elements
pub const INLINE_PRESET: &str = "$inline";

pub const INLINE_ELEMENTS: [&str; 55] = [
    "a", "abbr", "acronym", "audio", "b", "bdi", "bdo", "big", "br", "button", "canvas", "cite",
    "code", "data", "datalist", "del", "dfn", "em", "embed", "i", "iframe", "img", "input", "ins",
    "kbd", "label", "map", "mark", "meter", "noscript", "object", "output", "picture", "progress",
    "q", "ruby", "s", "samp", "script", "select", "slot", "small", "span", "strong", "sub", "sup",
    "svg", "template", "textarea", "time", "u", "tt", "var", "video", "wbr",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ElementNewlineOptions {
    /// Tag names (or `$`-presets) that may share a line with their siblings
    pub inline: Vec<String>,
    /// Tags whose children are left alone
    pub skip: Vec<String>,
}

pub struct ElementNewline {
    inline: HashSet<String>,
    skip: HashSet<String>,
}

impl ElementNewline {
    pub fn new(options: &ElementNewlineOptions) -> Result<Self, ConfigError> {
        let mut inline = HashSet::new();
        for entry in &options.inline {
            if entry.starts_with('$') {
                match entry.as_str() {
                    INLINE_PRESET => {
                        inline.extend(INLINE_ELEMENTS.iter().map(|name| name.to_string()))
                    }
                    _ => {
                        return Err(ConfigError::UnknownPreset {
                            rule: META.id,
                            preset: entry.clone(),
                        })
                    }
                }
            } else {
                inline.insert(entry.to_ascii_lowercase());
            }
        }

        let skip = options
            .skip
            .iter()
            .map(|name| name.to_ascii_lowercase())
            .collect();

        Ok(Self { inline, skip })
    }

    fn wants_newline(&self, node: &Node) -> bool {
        match &node.kind {
            NodeKind::Comment(content) | NodeKind::Text(content) => {
                LINE_BREAK.is_match(content.value.trim())
            }
            NodeKind::Tag(tag) => !self.inline.contains(&tag.name.to_ascii_lowercase()),
            _ => true,
        }
    }

    fn is_skipped(&self, tag: &Tag) -> bool {
        self.skip.contains(&tag.name.to_ascii_lowercase())
    }
}

impl Rule for ElementNewline {
    fn meta(&self) -> &RuleMeta {
        &META
    }

    fn checker(&self) -> Box<dyn Visitor + '_> {
        Box::new(Checker { rule: self })
    }
}

struct Checker<'r> {
    rule: &'r ElementNewline,
}

/// Outcome of checking one sibling group
struct Group<'d> {
    child_with_newline: bool,
    first: Option<&'d Node>,
    last: Option<&'d Node>,
}

impl Checker<'_> {
    fn check_siblings<'d>(
        &self,
        doc: &'d Document,
        siblings: &[NodeId],
        ctx: &mut RuleContext,
    ) -> Group<'d> {
        let nodes: Vec<&Node> = siblings
            .iter()
            .map(|id| doc.node(*id))
            .filter(|node| !is_blank_text(node))
            .collect();

        let mut child_with_newline = false;
        let mut wants = Vec::with_capacity(nodes.len());
        for node in &nodes {
            let want = self.rule.wants_newline(node);
            if let Some(tag) = node.as_tag() {
                if !self.rule.is_skipped(tag) && self.check_children(doc, tag, want, ctx) {
                    child_with_newline = true;
                }
            }
            child_with_newline |= want;
            wants.push(want);
        }

        for (i, pair) in nodes.windows(2).enumerate() {
            let (prev, next) = (pair[0], pair[1]);
            // a break carried by surrounding text already separates the pair
            if prev.loc.end.line != next.loc.start.line
                || ends_with_newline(doc, prev)
                || starts_with_newline(next)
            {
                continue;
            }
            let anchor = Anchor::new(get_span_between(prev, next), get_loc_between(prev, next));
            if wants[i] {
                ctx.report(
                    anchor,
                    EXPECT_NEW_LINE_AFTER,
                    &[("tag", &label(prev))],
                    vec![Edit::insert_after(prev, "\n")],
                );
            } else if wants[i + 1] {
                ctx.report(
                    anchor,
                    EXPECT_NEW_LINE_BEFORE,
                    &[("tag", &label(next))],
                    vec![Edit::insert_before(next, "\n")],
                );
            }
        }

        Group {
            child_with_newline,
            first: nodes.first().copied(),
            last: nodes.last().copied(),
        }
    }

    /// Check a tag's children and the breaks around them
    fn check_children(
        &self,
        doc: &Document,
        tag: &Tag,
        wants: bool,
        ctx: &mut RuleContext,
    ) -> bool {
        let group = self.check_siblings(doc, &tag.children, ctx);
        if !(wants && group.child_with_newline) {
            return group.child_with_newline;
        }

        let tag_label = format!("<{}>", tag.name);
        if let Some(first) = group.first {
            if tag.open_end.loc.end.line == first.loc.start.line && !starts_with_newline(first) {
                let anchor = Anchor::new(
                    get_span_between(&tag.open_end, first),
                    get_loc_between(&tag.open_end, first),
                );
                ctx.report(
                    anchor,
                    EXPECT_NEW_LINE_AFTER_OPEN,
                    &[("tag", &tag_label)],
                    vec![Edit::insert_after(&tag.open_end, "\n")],
                );
            }
        }
        if let (Some(last), Some(close)) = (group.last, &tag.close) {
            if last.loc.end.line == close.loc.start.line && !ends_with_newline(doc, last) {
                let anchor = Anchor::new(
                    get_span_between(last, close),
                    get_loc_between(last, close),
                );
                ctx.report(
                    anchor,
                    EXPECT_NEW_LINE_BEFORE_CLOSE,
                    &[("tag", &tag_label)],
                    vec![Edit::insert_before(close, "\n")],
                );
            }
        }

        group.child_with_newline
    }
}

impl Visitor for Checker<'_> {
    fn enter_document(&mut self, doc: &Document, node: &Node, ctx: &mut RuleContext) {
        self.check_siblings(doc, node.children(), ctx);
    }
}

fn is_blank_text(node: &Node) -> bool {
    matches!(&node.kind, NodeKind::Text(text) if text.value.trim().is_empty())
}

fn starts_with_newline(node: &Node) -> bool {
    match &node.kind {
        NodeKind::Text(text) => {
            let leading = &text.value[..text.value.len() - text.value.trim_start().len()];
            LINE_BREAK.is_match(leading)
        }
        _ => false,
    }
}

/// An unclosed tag ends wherever its last child does
fn ends_with_newline(doc: &Document, node: &Node) -> bool {
    match &node.kind {
        NodeKind::Text(text) => {
            let trailing = &text.value[text.value.trim_end().len()..];
            LINE_BREAK.is_match(trailing)
        }
        NodeKind::Tag(tag) if tag.close.is_none() => tag
            .children
            .last()
            .is_some_and(|last| ends_with_newline(doc, doc.node(*last))),
        _ => false,
    }
}

fn label(node: &Node) -> String {
    match &node.kind {
        NodeKind::Tag(tag) => format!("<{}>", tag.name),
        NodeKind::ScriptTag(_) => "script".to_string(),
        NodeKind::StyleTag(_) => "style".to_string(),
        NodeKind::Text(_) => "text".to_string(),
        NodeKind::Comment(_) => "comment".to_string(),
        NodeKind::Doctype(_) => "doctype".to_string(),
        NodeKind::Document { .. } => "document".to_string(),
    }
}
