//! Tolerant HTML parser producing the [`Document`] arena
//!
//! The parser never fails: unterminated constructs run to the end of the
//! input, stray closing tags are dropped, and elements left open end without
//! a `close` token.

use crate::ast::{
    Attribute, AttributePart, Content, Document, LineIndex, Node, NodeId, NodeKind, RawTag, Span,
    Tag, TemplateSpan, Token,
};
use serde::{Deserialize, Serialize};

/// Elements that never have content or a closing tag
pub const VOID_ELEMENTS: [&str; 16] = [
    "area", "base", "br", "col", "command", "embed", "hr", "img", "input", "keygen", "link",
    "meta", "param", "source", "track", "wbr",
];

/// Roots of foreign (SVG / MathML) subtrees
pub const FOREIGN_ROOTS: [&str; 2] = ["svg", "math"];

/// Parser settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParserOptions {
    /// Open/close delimiter pairs marking template interpolation
    pub templates: Vec<(String, String)>,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            templates: vec![("{{".to_string(), "}}".to_string())],
        }
    }
}

/// Helper to test that a string is in a list, ignoring ascii case
pub fn contains_ignore_ascii_case(list: &[&str], name: &str) -> bool {
    list.iter().any(|term| term.eq_ignore_ascii_case(name))
}

/// Parse markup source into a document tree
pub fn parse(source: &str, options: &ParserOptions) -> Document {
    Parser::new(source, options).run()
}

struct Parser<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    options: &'a ParserOptions,
    index: LineIndex,
    nodes: Vec<Node>,
    /// Elements waiting for their closing tag, innermost last
    open: Vec<NodeId>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, options: &'a ParserOptions) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            options,
            index: LineIndex::new(source),
            nodes: Vec::new(),
            open: Vec::new(),
        }
    }

    fn run(mut self) -> Document {
        let span = Span::new(0, self.source.len());
        self.nodes.push(Node {
            id: NodeId::ROOT,
            parent: None,
            span,
            loc: self.index.location(span),
            kind: NodeKind::Document {
                children: Vec::new(),
            },
        });

        while !self.is_at_end() {
            if self.at(b"<!--") {
                self.comment();
            } else if self.at_ignore_case(b"<!doctype") {
                self.doctype();
            } else if self.at(b"</") && self.is_alpha_at(self.pos + 2) {
                self.close_tag();
            } else if self.at(b"<") && self.is_alpha_at(self.pos + 1) {
                self.open_tag();
            } else {
                self.text();
            }
        }

        while let Some(id) = self.open.pop() {
            self.finish_unclosed(id);
        }

        Document {
            source: self.source.to_string(),
            nodes: self.nodes,
        }
    }
}

/// Byte-level scanning over the source
impl Parser<'_> {
    fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn current(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn at(&self, needle: &[u8]) -> bool {
        self.bytes[self.pos..].starts_with(needle)
    }

    fn at_ignore_case(&self, needle: &[u8]) -> bool {
        self.bytes
            .get(self.pos..self.pos + needle.len())
            .is_some_and(|s| s.eq_ignore_ascii_case(needle))
    }

    fn is_alpha_at(&self, pos: usize) -> bool {
        self.bytes.get(pos).is_some_and(|b| b.is_ascii_alphabetic())
    }

    fn skip_whitespace(&mut self) {
        while self.current().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// Whether a markup construct (tag, comment, doctype) starts at `pos`
    fn starts_markup(&self, pos: usize) -> bool {
        let rest = &self.bytes[pos..];
        if !rest.starts_with(b"<") {
            return false;
        }
        rest.starts_with(b"<!--")
            || rest
                .get(..9)
                .is_some_and(|s| s.eq_ignore_ascii_case(b"<!doctype"))
            || (rest.starts_with(b"</") && self.is_alpha_at(pos + 2))
            || self.is_alpha_at(pos + 1)
    }

    /// Template delimiter pair opening at `pos`, if any
    fn template_at(&self, pos: usize) -> Option<&(String, String)> {
        self.options
            .templates
            .iter()
            .find(|(open, _)| !open.is_empty() && self.bytes[pos..].starts_with(open.as_bytes()))
    }

    /// End offset of the template opening at `pos`, bounded by `limit`
    fn template_end(&self, pos: usize, limit: usize) -> Option<usize> {
        let (open, close) = self.template_at(pos)?;
        let body = pos + open.len();
        Some(
            find(&self.bytes[..limit], close.as_bytes(), body)
                .map(|i| i + close.len())
                .unwrap_or(limit),
        )
    }

    /// Partition `[start, end)` into template / plain parts.
    /// Returns an empty list when the range has no template.
    fn templates_in(&self, start: usize, end: usize) -> Vec<TemplateSpan> {
        let mut parts = Vec::new();
        let mut cursor = start;
        let mut pos = start;

        while pos < end {
            match self.template_end(pos, end) {
                Some(template_end) => {
                    if cursor < pos {
                        parts.push(self.template_span(false, cursor, pos));
                    }
                    parts.push(self.template_span(true, pos, template_end));
                    cursor = template_end;
                    pos = template_end;
                }
                None => pos += 1,
            }
        }

        if !parts.is_empty() && cursor < end {
            parts.push(self.template_span(false, cursor, end));
        }
        parts
    }

    fn template_span(&self, is_template: bool, start: usize, end: usize) -> TemplateSpan {
        let span = Span::new(start, end);
        TemplateSpan {
            is_template,
            span,
            loc: self.index.location(span),
        }
    }

    fn token(&self, start: usize, end: usize) -> Token {
        let span = Span::new(start, end);
        Token {
            value: self.source[start..end].to_string(),
            span,
            loc: self.index.location(span),
        }
    }

    fn content(&self, start: usize, end: usize) -> Content {
        let span = Span::new(start, end);
        Content {
            value: self.source[start..end].to_string(),
            span,
            loc: self.index.location(span),
            templates: self.templates_in(start, end),
        }
    }

    fn attribute_part(&self, start: usize, end: usize) -> AttributePart {
        let span = Span::new(start, end);
        AttributePart {
            value: self.source[start..end].to_string(),
            span,
            loc: self.index.location(span),
            templates: self.templates_in(start, end),
        }
    }

    fn in_foreign_context(&self) -> bool {
        self.open.iter().any(|id| {
            self.nodes[id.index()]
                .as_tag()
                .is_some_and(|tag| contains_ignore_ascii_case(&FOREIGN_ROOTS, &tag.name))
        })
    }
}

/// Arena construction and the open-element stack
impl Parser<'_> {
    fn current_parent(&self) -> NodeId {
        self.open.last().copied().unwrap_or(NodeId::ROOT)
    }

    fn add_node(&mut self, span: Span, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        let parent = self.current_parent();
        self.nodes.push(Node {
            id,
            parent: Some(parent),
            span,
            loc: self.index.location(span),
            kind,
        });
        match &mut self.nodes[parent.index()].kind {
            NodeKind::Document { children } => children.push(id),
            NodeKind::Tag(tag) => tag.children.push(id),
            _ => unreachable!("only documents and tags hold children"),
        }
        id
    }

    fn set_end(&mut self, id: NodeId, end: usize) {
        let node = &mut self.nodes[id.index()];
        node.span = Span::new(node.span.start, end);
        node.loc = self.index.location(node.span);
    }

    /// An element that never saw its closing tag ends with its last child
    fn finish_unclosed(&mut self, id: NodeId) {
        let node = &self.nodes[id.index()];
        let mut end = node.span.end;
        if let Some(last) = node.children().last() {
            end = end.max(self.nodes[last.index()].span.end);
        }
        self.set_end(id, end);
    }

    fn text(&mut self) {
        let start = self.pos;
        while !self.is_at_end() {
            if let Some(end) = self.template_end(self.pos, self.bytes.len()) {
                self.pos = end;
            } else if self.pos > start && self.starts_markup(self.pos) {
                break;
            } else {
                self.pos += 1;
            }
        }
        let content = self.content(start, self.pos);
        self.add_node(content.span, NodeKind::Text(content));
    }

    fn comment(&mut self) {
        let start = self.pos;
        let body = start + 4;
        let (body_end, end) = match find(self.bytes, b"-->", body) {
            Some(i) => (i, i + 3),
            None => (self.bytes.len(), self.bytes.len()),
        };
        self.pos = end;
        let content = self.content(body, body_end);
        self.add_node(Span::new(start, end), NodeKind::Comment(content));
    }

    fn doctype(&mut self) {
        let start = self.pos;
        let (body_end, end) = match find(self.bytes, b">", start) {
            Some(i) => (i, i + 1),
            None => (self.bytes.len(), self.bytes.len()),
        };
        self.pos = end;
        let content = self.content(start + 2, body_end);
        self.add_node(Span::new(start, end), NodeKind::Doctype(content));
    }

    fn tag_name_end(&self, from: usize) -> usize {
        let mut pos = from;
        while let Some(&b) = self.bytes.get(pos) {
            if b.is_ascii_whitespace() || b == b'>' || b == b'/' {
                break;
            }
            pos += 1;
        }
        pos
    }

    fn open_tag(&mut self) {
        let start = self.pos;
        let name_end = self.tag_name_end(start + 1);
        let name = self.source[start + 1..name_end].to_string();
        let open_start = self.token(start, name_end);
        self.pos = name_end;

        let mut attributes = Vec::new();
        let mut self_closing = false;
        let open_end = loop {
            self.skip_whitespace();
            if self.is_at_end() {
                break self.token(self.pos, self.pos);
            }
            if self.at(b"/>") {
                self.pos += 2;
                self_closing = true;
                break self.token(self.pos - 2, self.pos);
            }
            if self.at(b">") {
                self.pos += 1;
                break self.token(self.pos - 1, self.pos);
            }
            if self.at(b"/") {
                self.pos += 1;
                continue;
            }
            attributes.push(self.attribute());
        };

        let lower = name.to_ascii_lowercase();
        let span = Span::new(start, open_end.span.end);

        if lower == "script" || lower == "style" {
            self.raw_tag(name, lower == "script", attributes, open_start, open_end, self_closing);
            return;
        }

        let is_void =
            !self.in_foreign_context() && contains_ignore_ascii_case(&VOID_ELEMENTS, &name);
        let close = if is_void && !self_closing {
            self.void_close(&name)
        } else {
            None
        };
        let end = close.as_ref().map_or(span.end, |c| c.span.end);

        let id = self.add_node(
            Span::new(start, end),
            NodeKind::Tag(Tag {
                name,
                attributes,
                children: Vec::new(),
                self_closing,
                open_start,
                open_end,
                close,
            }),
        );

        if !self_closing && !is_void {
            self.open.push(id);
        }
    }

    /// `<img></img>`: a closing tag written right after a void open tag
    fn void_close(&mut self, name: &str) -> Option<Token> {
        let start = self.pos;
        let name_start = start + 2;
        let name_end = name_start + name.len();
        let written = self.bytes.get(name_start..name_end)?;
        if !self.at(b"</") || !written.eq_ignore_ascii_case(name.as_bytes()) {
            return None;
        }
        let mut end = name_end;
        while self.bytes.get(end).is_some_and(|b| b.is_ascii_whitespace()) {
            end += 1;
        }
        if self.bytes.get(end) != Some(&b'>') {
            return None;
        }
        self.pos = end + 1;
        Some(self.token(start, self.pos))
    }

    fn attribute(&mut self) -> Attribute {
        let start = self.pos;

        let key = if self.current() == Some(b'=') {
            None
        } else {
            while !self.is_at_end() {
                if let Some(end) = self.template_end(self.pos, self.bytes.len()) {
                    self.pos = end;
                    continue;
                }
                let b = self.bytes[self.pos];
                if b.is_ascii_whitespace() || b == b'>' || b == b'=' || self.at(b"/>") {
                    break;
                }
                self.pos += 1;
            }
            Some(self.attribute_part(start, self.pos))
        };

        let before_value = self.pos;
        self.skip_whitespace();
        let value = if self.current() == Some(b'=') {
            self.pos += 1;
            self.skip_whitespace();
            Some(self.attribute_value())
        } else {
            self.pos = before_value;
            None
        };

        // quoted values end after the closing quote
        let end = if value.is_some() { self.pos } else { before_value };
        let span = Span::new(start, end);
        Attribute {
            key,
            value,
            span,
            loc: self.index.location(span),
        }
    }

    fn attribute_value(&mut self) -> AttributePart {
        match self.current() {
            Some(quote @ (b'"' | b'\'')) => {
                let value_start = self.pos + 1;
                self.pos = value_start;
                while !self.is_at_end() && self.bytes[self.pos] != quote {
                    match self.template_end(self.pos, self.bytes.len()) {
                        Some(end) => self.pos = end,
                        None => self.pos += 1,
                    }
                }
                let value_end = self.pos;
                let part = self.attribute_part(value_start, value_end);
                if !self.is_at_end() {
                    self.pos += 1;
                }
                part
            }
            _ => {
                let value_start = self.pos;
                while !self.is_at_end() {
                    if let Some(end) = self.template_end(self.pos, self.bytes.len()) {
                        self.pos = end;
                        continue;
                    }
                    let b = self.bytes[self.pos];
                    if b.is_ascii_whitespace() || b == b'>' {
                        break;
                    }
                    self.pos += 1;
                }
                self.attribute_part(value_start, self.pos)
            }
        }
    }

    fn raw_tag(
        &mut self,
        name: String,
        is_script: bool,
        attributes: Vec<Attribute>,
        open_start: Token,
        open_end: Token,
        self_closing: bool,
    ) {
        let start = open_start.span.start;
        let (value, close) = if self_closing {
            (None, None)
        } else {
            let content_start = self.pos;
            let needle = format!("</{}", name);
            match find_ignore_case(self.bytes, needle.as_bytes(), content_start) {
                Some(close_start) => {
                    let close_end = find(self.bytes, b">", close_start)
                        .map(|i| i + 1)
                        .unwrap_or(self.bytes.len());
                    self.pos = close_end;
                    (
                        Some(self.content(content_start, close_start)),
                        Some(self.token(close_start, close_end)),
                    )
                }
                None => {
                    self.pos = self.bytes.len();
                    (Some(self.content(content_start, self.pos)), None)
                }
            }
        };

        let end = close
            .as_ref()
            .map(|c| c.span.end)
            .or(value.as_ref().map(|v| v.span.end))
            .unwrap_or(open_end.span.end);
        let raw = RawTag {
            name,
            attributes,
            open_start,
            open_end,
            close,
            value,
        };
        let kind = if is_script {
            NodeKind::ScriptTag(raw)
        } else {
            NodeKind::StyleTag(raw)
        };
        self.add_node(Span::new(start, end), kind);
    }

    fn close_tag(&mut self) {
        let start = self.pos;
        let name_end = self.tag_name_end(start + 2);
        let name = &self.source[start + 2..name_end];
        let end = find(self.bytes, b">", name_end)
            .map(|i| i + 1)
            .unwrap_or(self.bytes.len());
        self.pos = end;

        let matching = self.open.iter().rposition(|id| {
            self.nodes[id.index()]
                .as_tag()
                .is_some_and(|tag| tag.name.eq_ignore_ascii_case(name))
        });

        let Some(depth) = matching else {
            log::trace!("ignoring stray closing tag </{}> at offset {}", name, start);
            return;
        };

        while self.open.len() > depth + 1 {
            if let Some(id) = self.open.pop() {
                self.finish_unclosed(id);
            }
        }
        if let Some(id) = self.open.pop() {
            let token = self.token(start, end);
            if let NodeKind::Tag(tag) = &mut self.nodes[id.index()].kind {
                tag.close = Some(token);
            }
            self.set_end(id, end);
        }
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

fn find_ignore_case(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
        .map(|i| i + from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{NodeType, Typed};

    fn parse_default(source: &str) -> Document {
        parse(source, &ParserOptions::default())
    }

    fn first_tag(doc: &Document) -> &Tag {
        doc.iter().find_map(|n| n.as_tag()).unwrap()
    }

    #[test]
    fn test_parse_nested_tags() {
        let doc = parse_default("<div><span>hi</span></div>");
        let root = doc.root();
        assert_eq!(root.children().len(), 1);

        let div = doc.node(root.children()[0]);
        let tag = div.as_tag().unwrap();
        assert_eq!(tag.name, "div");
        assert_eq!(tag.open_end.value, ">");
        assert_eq!(tag.close.as_ref().unwrap().value, "</div>");
        assert_eq!(div.span, Span::new(0, 26));

        let span = doc.node(tag.children[0]);
        assert_eq!(span.parent, Some(div.id));
        assert_eq!(span.as_tag().unwrap().name, "span");
        let text = doc.node(span.children()[0]);
        assert_eq!(text.content().unwrap().value, "hi");
    }

    #[test]
    fn test_parse_self_closing_and_void() {
        let doc = parse_default("<img src=\"a.png\" /><br><my-el/>");
        let tags: Vec<&Tag> = doc.iter().filter_map(|n| n.as_tag()).collect();
        assert_eq!(tags.len(), 3);
        assert!(tags[0].self_closing);
        assert_eq!(tags[0].open_end.value, "/>");
        assert_eq!(tags[0].attributes.len(), 1);
        assert!(!tags[1].self_closing);
        assert!(tags[1].close.is_none());
        assert!(tags[2].self_closing);
        // void and self-closing tags never swallow siblings
        assert_eq!(doc.root().children().len(), 3);
    }

    #[test]
    fn test_void_with_written_close() {
        let doc = parse_default("<img></img><p></p>");
        let img = first_tag(&doc);
        assert_eq!(img.close.as_ref().unwrap().value, "</img>");
        assert_eq!(doc.root().children().len(), 2);
    }

    #[test]
    fn test_unclosed_tag_has_no_close() {
        let doc = parse_default("<div><foo>text</div>");
        let div = doc.node(doc.root().children()[0]);
        let foo = doc.node(div.children()[0]);
        assert_eq!(foo.as_tag().unwrap().name, "foo");
        assert!(foo.as_tag().unwrap().close.is_none());
        assert_eq!(doc.text(foo.span), "<foo>text");
        assert!(div.as_tag().unwrap().close.is_some());
    }

    #[test]
    fn test_unclosed_at_eof() {
        let doc = parse_default("<foo>\n  bar");
        let foo = doc.node(doc.root().children()[0]);
        assert!(foo.as_tag().unwrap().close.is_none());
        assert_eq!(foo.span, Span::new(0, 11));
        assert_eq!(foo.loc.end.line, 2);
    }

    #[test]
    fn test_stray_close_is_ignored() {
        let doc = parse_default("a</b>c");
        let values: Vec<&str> = doc
            .iter()
            .filter_map(|n| n.content())
            .map(|c| c.value.as_str())
            .collect();
        assert_eq!(values, vec!["a", "c"]);
    }

    #[test]
    fn test_comment_and_doctype() {
        let doc = parse_default("<!DOCTYPE html>\n<!-- note -->");
        let types: Vec<NodeType> = doc.iter().map(|n| n.node_type()).collect();
        assert_eq!(
            types,
            vec![
                NodeType::Document,
                NodeType::Doctype,
                NodeType::Text,
                NodeType::Comment
            ]
        );
        let comment = doc.iter().find(|n| n.node_type() == NodeType::Comment).unwrap();
        assert_eq!(comment.content().unwrap().value, " note ");
        assert_eq!(doc.text(comment.span), "<!-- note -->");
    }

    #[test]
    fn test_script_content_is_opaque() {
        let doc = parse_default("<script>if (a < b) { x(\"</div>\") }</script><p></p>");
        let script = doc.node(doc.root().children()[0]);
        match &script.kind {
            NodeKind::ScriptTag(raw) => {
                assert_eq!(raw.value.as_ref().unwrap().value, "if (a < b) { x(\"</div>\") }");
                assert!(raw.close.is_some());
            }
            other => panic!("expected script, got {:?}", other),
        }
        assert_eq!(doc.root().children().len(), 2);
    }

    #[test]
    fn test_templates_in_text() {
        let doc = parse_default("<p>a {{ b < c }} d</p>");
        let text = doc.iter().find_map(|n| n.content()).unwrap();
        assert_eq!(text.value, "a {{ b < c }} d");
        let flags: Vec<bool> = text.templates.iter().map(|t| t.is_template).collect();
        assert_eq!(flags, vec![false, true, false]);
        assert_eq!(doc.text(text.templates[1].span), "{{ b < c }}");
    }

    #[test]
    fn test_templates_in_attribute_value() {
        let doc = parse_default("<a href=\"/x/{{ id }}\" data-on>t</a>");
        let tag = first_tag(&doc);
        assert_eq!(tag.attributes.len(), 2);
        let value = tag.attributes[0].value.as_ref().unwrap();
        assert_eq!(value.value, "/x/{{ id }}");
        assert!(value.templates.iter().any(|t| t.is_template));
        assert!(tag.attributes[1].value.is_none());
        assert_eq!(tag.attributes[1].key.as_ref().unwrap().value, "data-on");
    }

    #[test]
    fn test_no_templates_without_delimiters() {
        let doc = parse_default("<p>plain</p>");
        let text = doc.iter().find_map(|n| n.content()).unwrap();
        assert!(text.templates.is_empty());
    }

    #[test]
    fn test_void_names_inside_svg_take_children() {
        let doc = parse_default("<svg><image><title>x</title></image></svg>");
        let image = doc
            .iter()
            .filter_map(|n| n.as_tag().map(|t| (n, t)))
            .find(|(_, t)| t.name == "image")
            .unwrap();
        assert!(image.1.close.is_some());
        assert_eq!(image.0.children().len(), 1);
    }

    #[test]
    fn test_child_ranges_within_parent() {
        let doc = parse_default("<ul>\n  <li>a\n  <li>b\n</ul>\n<p>x");
        for node in doc.iter() {
            if let Some(parent) = node.parent {
                assert!(doc.node(parent).span.contains(node.span), "{:?}", node.kind);
            }
        }
    }
}
