//! Depth-first traversal with enter/exit callbacks keyed by node type

use crate::ast::{Content, Document, Node, NodeId, NodeKind, RawTag, Tag};
use crate::rule::RuleContext;

/// Callbacks invoked while walking a document.
///
/// `enter_*` runs before a node's children are visited, `exit_*` after.
/// Implementors keep whatever per-document state they need in `self`.
#[allow(unused_variables)]
pub trait Visitor {
    fn enter_document(&mut self, doc: &Document, node: &Node, ctx: &mut RuleContext) {}
    fn exit_document(&mut self, doc: &Document, node: &Node, ctx: &mut RuleContext) {}

    fn enter_tag(&mut self, doc: &Document, node: &Node, tag: &Tag, ctx: &mut RuleContext) {}
    fn exit_tag(&mut self, doc: &Document, node: &Node, tag: &Tag, ctx: &mut RuleContext) {}

    fn enter_script(&mut self, doc: &Document, node: &Node, raw: &RawTag, ctx: &mut RuleContext) {}
    fn exit_script(&mut self, doc: &Document, node: &Node, raw: &RawTag, ctx: &mut RuleContext) {}

    fn enter_style(&mut self, doc: &Document, node: &Node, raw: &RawTag, ctx: &mut RuleContext) {}
    fn exit_style(&mut self, doc: &Document, node: &Node, raw: &RawTag, ctx: &mut RuleContext) {}

    fn enter_text(&mut self, doc: &Document, node: &Node, text: &Content, ctx: &mut RuleContext) {}
    fn enter_comment(
        &mut self,
        doc: &Document,
        node: &Node,
        comment: &Content,
        ctx: &mut RuleContext,
    ) {
    }
    fn enter_doctype(
        &mut self,
        doc: &Document,
        node: &Node,
        doctype: &Content,
        ctx: &mut RuleContext,
    ) {
    }
}

/// Walk the whole document from the root
pub fn walk(doc: &Document, visitor: &mut dyn Visitor, ctx: &mut RuleContext) {
    walk_node(doc, NodeId::ROOT, visitor, ctx);
}

fn walk_node(doc: &Document, id: NodeId, visitor: &mut dyn Visitor, ctx: &mut RuleContext) {
    let node = doc.node(id);
    match &node.kind {
        NodeKind::Document { children } => {
            visitor.enter_document(doc, node, ctx);
            for child in children {
                walk_node(doc, *child, visitor, ctx);
            }
            visitor.exit_document(doc, node, ctx);
        }
        NodeKind::Tag(tag) => {
            visitor.enter_tag(doc, node, tag, ctx);
            for child in &tag.children {
                walk_node(doc, *child, visitor, ctx);
            }
            visitor.exit_tag(doc, node, tag, ctx);
        }
        NodeKind::ScriptTag(raw) => {
            visitor.enter_script(doc, node, raw, ctx);
            visitor.exit_script(doc, node, raw, ctx);
        }
        NodeKind::StyleTag(raw) => {
            visitor.enter_style(doc, node, raw, ctx);
            visitor.exit_style(doc, node, raw, ctx);
        }
        NodeKind::Text(content) => visitor.enter_text(doc, node, content, ctx),
        NodeKind::Comment(content) => visitor.enter_comment(doc, node, content, ctx),
        NodeKind::Doctype(content) => visitor.enter_doctype(doc, node, content, ctx),
    }
}
