//! Stateless queries over the document tree
//!
//! Rules use these helpers to reason about ranges, lines and template
//! interpolation without mutating anything.

use crate::ast::{
    Attribute, AttributePart, Content, Document, Located, Node, NodeId, NodeType, Position,
    SourceLocation, Span, Tag, TemplateSpan, Typed,
};
use once_cell::sync::Lazy;
use regex::Regex;

/// Any single line terminator
pub static LINE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new("\r\n|[\r\n\u{2028}\u{2029}]").unwrap());

/// One line of a multi-line text or comment, derived on demand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineNode {
    pub value: String,
    pub span: Span,
    pub loc: SourceLocation,
    /// The line overlaps a template span
    pub skip_indent_check: bool,
}

impl Typed for LineNode {
    fn node_type(&self) -> NodeType {
        NodeType::Line
    }
}

impl Located for LineNode {
    fn span(&self) -> Span {
        self.span
    }

    fn loc(&self) -> SourceLocation {
        self.loc
    }
}

/// Things that carry template spans
pub trait HasTemplates {
    fn templates(&self) -> &[TemplateSpan];
}

impl HasTemplates for Node {
    fn templates(&self) -> &[TemplateSpan] {
        Node::templates(self)
    }
}

impl HasTemplates for Content {
    fn templates(&self) -> &[TemplateSpan] {
        &self.templates
    }
}

impl HasTemplates for AttributePart {
    fn templates(&self) -> &[TemplateSpan] {
        &self.templates
    }
}

/// Find an attribute by key, ignoring case
pub fn find_attr<'a>(tag: &'a Tag, key: &str) -> Option<&'a Attribute> {
    tag.attributes.iter().find(|attr| {
        attr.key
            .as_ref()
            .is_some_and(|k| k.value.eq_ignore_ascii_case(key))
    })
}

pub fn is_attributes_empty(tag: &Tag) -> bool {
    tag.attributes.is_empty()
}

pub fn is_node_tokens_on_same_line(node: &impl Located) -> bool {
    let loc = node.loc();
    loc.start.line == loc.end.line
}

/// Half-open overlap test; ranges that only touch do not overlap
pub fn is_ranges_overlap(a: Span, b: Span) -> bool {
    a.start < b.end && b.start < a.end
}

pub fn is_overlap_with_templates(templates: &[TemplateSpan], span: Span) -> bool {
    templates
        .iter()
        .filter(|t| t.is_template)
        .any(|t| is_ranges_overlap(t.span, span))
}

pub fn has_template(node: &impl HasTemplates) -> bool {
    node.templates().iter().any(|t| t.is_template)
}

/// Split text or comment content into one synthetic node per `\n`-separated line
pub fn split_to_line_nodes(content: &Content) -> Vec<LineNode> {
    let mut lines = Vec::new();
    let mut start = content.span.start;
    let mut line = content.loc.start.line;
    let mut column = content.loc.start.column;

    for value in content.value.split('\n') {
        let span = Span::new(start, start + value.len());
        let loc = SourceLocation::new(
            Position::new(line, column),
            Position::new(line, column + value.len()),
        );
        lines.push(LineNode {
            value: value.to_string(),
            span,
            loc,
            skip_indent_check: is_overlap_with_templates(&content.templates, span),
        });
        start = span.end + 1;
        line += 1;
        column = 0;
    }

    lines
}

/// Location from the end of `before` to the start of `after`
pub fn get_loc_between(before: &impl Located, after: &impl Located) -> SourceLocation {
    SourceLocation::new(before.loc().end, after.loc().start)
}

/// Span matching [`get_loc_between`]
pub fn get_span_between(before: &impl Located, after: &impl Located) -> Span {
    let start = before.span().end;
    Span::new(start, after.span().start.max(start))
}

/// Walk up from `id` and return the first ancestor matching `predicate`.
///
/// The walk stops at a `Document` node: embedded fragments are parsed into
/// their own documents, so crossing one means leaving the markup context.
pub fn find_parent<'a>(
    doc: &'a Document,
    id: NodeId,
    predicate: impl Fn(&Node) -> bool,
) -> Option<&'a Node> {
    let mut current = doc.parent(id)?;
    loop {
        if current.node_type() == NodeType::Document {
            return None;
        }
        if predicate(current) {
            return Some(current);
        }
        current = doc.parent(current.id)?;
    }
}

pub fn is_tag(node: &impl Typed) -> bool {
    node.node_type() == NodeType::Tag
}

pub fn is_script(node: &impl Typed) -> bool {
    node.node_type() == NodeType::ScriptTag
}

pub fn is_style(node: &impl Typed) -> bool {
    node.node_type() == NodeType::StyleTag
}

pub fn is_comment(node: &impl Typed) -> bool {
    node.node_type() == NodeType::Comment
}

pub fn is_text(node: &impl Typed) -> bool {
    node.node_type() == NodeType::Text
}

pub fn is_line(node: &impl Typed) -> bool {
    node.node_type() == NodeType::Line
}

/// Split source on CRLF, LF, CR, U+2028 and U+2029
pub fn code_to_lines(source: &str) -> Vec<&str> {
    LINE_BREAK.split(source).collect()
}

/// Flatten token template lists down to the interpolated spans
pub fn get_template_tokens<'a, I>(tokens: I) -> Vec<&'a TemplateSpan>
where
    I: IntoIterator<Item = &'a [TemplateSpan]>,
{
    tokens
        .into_iter()
        .flatten()
        .filter(|t| t.is_template)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;
    use crate::parser::{parse, ParserOptions};

    fn parse_default(source: &str) -> Document {
        parse(source, &ParserOptions::default())
    }

    fn first_content(doc: &Document) -> &Content {
        doc.iter().find_map(|n| n.content()).unwrap()
    }

    #[test]
    fn test_ranges_overlap_is_symmetric() {
        let spans = [
            Span::new(0, 0),
            Span::new(0, 3),
            Span::new(2, 5),
            Span::new(3, 6),
            Span::new(5, 5),
            Span::new(1, 10),
        ];
        for a in spans {
            for b in spans {
                assert_eq!(is_ranges_overlap(a, b), is_ranges_overlap(b, a), "{:?} {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_touching_ranges_do_not_overlap() {
        assert!(!is_ranges_overlap(Span::new(0, 3), Span::new(3, 6)));
        assert!(is_ranges_overlap(Span::new(0, 4), Span::new(3, 6)));
    }

    #[test]
    fn test_find_attr_ignores_case() {
        let doc = parse_default("<input TYPE=\"text\" Value=x>");
        let tag = doc.iter().find_map(|n| n.as_tag()).unwrap();
        let attr = find_attr(tag, "type").unwrap();
        assert_eq!(attr.value.as_ref().unwrap().value, "text");
        assert!(find_attr(tag, "name").is_none());
        assert!(!is_attributes_empty(tag));
    }

    #[test]
    fn test_is_attributes_empty() {
        let doc = parse_default("<p></p>");
        let tag = doc.iter().find_map(|n| n.as_tag()).unwrap();
        assert!(is_attributes_empty(tag));
    }

    #[test]
    fn test_split_to_line_nodes_partitions_value() {
        let doc = parse_default("<p>  first\nsecond\n\n  fourth</p>");
        let content = first_content(&doc);
        let lines = split_to_line_nodes(content);

        assert_eq!(lines.len(), content.value.matches('\n').count() + 1);
        let joined: Vec<&str> = lines.iter().map(|l| l.value.as_str()).collect();
        assert_eq!(joined.join("\n"), content.value);

        assert_eq!(lines[0].span.start, content.span.start);
        assert_eq!(lines.last().unwrap().span.end, content.span.end);
        for pair in lines.windows(2) {
            assert_eq!(pair[0].span.end + 1, pair[1].span.start);
        }
        for line in &lines {
            assert_eq!(doc.text(line.span), line.value);
        }
    }

    #[test]
    fn test_split_to_line_nodes_locations() {
        let doc = parse_default("<p>ab\ncd</p>");
        let lines = split_to_line_nodes(first_content(&doc));
        assert_eq!(lines[0].loc.start.column, 3);
        assert_eq!(lines[0].loc.start.line, 1);
        assert_eq!(lines[1].loc.start.column, 0);
        assert_eq!(lines[1].loc.start.line, 2);
        assert_eq!(lines[1].loc.end.column, 2);
        assert!(lines.iter().all(|l| is_line(l)));
    }

    #[test]
    fn test_split_to_line_nodes_marks_templates() {
        let doc = parse_default("<p>plain\n{{ value }}\nplain</p>");
        let content = first_content(&doc);
        assert!(has_template(content));
        let lines = split_to_line_nodes(content);
        let flags: Vec<bool> = lines.iter().map(|l| l.skip_indent_check).collect();
        assert_eq!(flags, vec![false, true, false]);
        // restartable
        assert_eq!(split_to_line_nodes(content), lines);
    }

    #[test]
    fn test_get_loc_between() {
        let doc = parse_default("<b>x</b> <i>y</i>");
        let ids = doc.root().children();
        let b = doc.node(ids[0]);
        let i = doc.node(ids[2]);
        let loc = get_loc_between(b, i);
        assert_eq!(loc.start, b.loc.end);
        assert_eq!(loc.end, i.loc.start);
        assert_eq!(get_span_between(b, i), Span::new(8, 9));
    }

    #[test]
    fn test_find_parent_stops_at_document() {
        let doc = parse_default("<svg><g><path/></g></svg>");
        let path = doc
            .iter()
            .find(|n| n.as_tag().is_some_and(|t| t.name == "path"))
            .unwrap();
        let svg = find_parent(&doc, path.id, |n| {
            n.as_tag().is_some_and(|t| t.name == "svg")
        });
        assert!(svg.is_some());
        let root = find_parent(&doc, path.id, |n| {
            matches!(n.kind, NodeKind::Document { .. })
        });
        assert!(root.is_none());
        let math = find_parent(&doc, path.id, |n| {
            n.as_tag().is_some_and(|t| t.name == "math")
        });
        assert!(math.is_none());
    }

    #[test]
    fn test_type_predicates() {
        let doc = parse_default("<p>t<!-- c --></p><script></script>");
        let nodes: Vec<&Node> = doc.iter().collect();
        assert!(is_tag(nodes[1]));
        assert!(is_text(nodes[2]));
        assert!(is_comment(nodes[3]));
        assert!(is_script(nodes[4]));
        assert!(!is_style(nodes[4]));
    }

    #[test]
    fn test_code_to_lines() {
        assert_eq!(
            code_to_lines("a\r\nb\nc\rd\u{2028}e\u{2029}f"),
            vec!["a", "b", "c", "d", "e", "f"]
        );
        assert_eq!(code_to_lines("single"), vec!["single"]);
    }

    #[test]
    fn test_get_template_tokens() {
        let doc = parse_default("<p title=\"{{ a }} b\">{{ c }} d {{ e }}</p>");
        let tag = doc.iter().find_map(|n| n.as_tag()).unwrap();
        let value = tag.attributes[0].value.as_ref().unwrap();
        let text = first_content(&doc);
        let templates =
            get_template_tokens([value.templates.as_slice(), text.templates.as_slice()]);
        assert_eq!(templates.len(), 3);
        assert!(templates.iter().all(|t| t.is_template));
    }

    #[test]
    fn test_is_node_tokens_on_same_line() {
        let doc = parse_default("<p>a</p>\n<div>\n</div>");
        let ids = doc.root().children();
        assert!(is_node_tokens_on_same_line(doc.node(ids[0])));
        assert!(!is_node_tokens_on_same_line(doc.node(ids[2])));
    }
}
