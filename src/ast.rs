//! Markup document tree
//!
//! The tree is stored as an arena: every [`Node`] lives in [`Document::nodes`]
//! and is addressed by its [`NodeId`]. Parents own their children through the
//! `children` id lists; the `parent` field is a plain lookup index back up the
//! tree.

use serde::{Deserialize, Serialize};

/// Index of a node inside its [`Document`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The document root always sits at index 0
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// Half-open byte range `[start, end)` into the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start {} after end {}", start, end);
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Line (1-based) and column (0-based, in bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Start and end position of a node or token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct SourceLocation {
    pub start: Position,
    pub end: Position,
}

impl SourceLocation {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

/// Node type discriminant, shared by arena nodes and synthetic lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeType {
    Document,
    Tag,
    ScriptTag,
    StyleTag,
    Text,
    Comment,
    Doctype,
    Line,
}

/// Anything with a node type
pub trait Typed {
    fn node_type(&self) -> NodeType;
}

/// Anything with a source range and location
pub trait Located {
    fn span(&self) -> Span;
    fn loc(&self) -> SourceLocation;
}

/// A region of embedded-language interpolation (or the plain text between them)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateSpan {
    pub is_template: bool,
    pub span: Span,
    pub loc: SourceLocation,
}

/// A single markup token such as `<div`, `>`, `/>` or `</div>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub value: String,
    pub span: Span,
    pub loc: SourceLocation,
}

/// Raw textual content of a text, comment or doctype node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Content {
    pub value: String,
    pub span: Span,
    pub loc: SourceLocation,
    pub templates: Vec<TemplateSpan>,
}

/// Key or value half of an attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributePart {
    pub value: String,
    pub span: Span,
    pub loc: SourceLocation,
    pub templates: Vec<TemplateSpan>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    /// Absent only for malformed attributes (e.g. a lone `="x"`)
    pub key: Option<AttributePart>,
    pub value: Option<AttributePart>,
    pub span: Span,
    pub loc: SourceLocation,
}

/// An element with parsed markup children
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    /// Tag name as written (case preserved)
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<NodeId>,
    /// Set when the source wrote `/>`
    pub self_closing: bool,
    /// The `<name` token
    pub open_start: Token,
    /// The `>` or `/>` token
    pub open_end: Token,
    /// The closing tag, if one was written
    pub close: Option<Token>,
}

/// `script` / `style` elements whose content is opaque
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawTag {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub open_start: Token,
    pub open_end: Token,
    pub close: Option<Token>,
    pub value: Option<Content>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    Document { children: Vec<NodeId> },
    Tag(Tag),
    ScriptTag(RawTag),
    StyleTag(RawTag),
    Text(Content),
    Comment(Content),
    Doctype(Content),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub span: Span,
    pub loc: SourceLocation,
    pub kind: NodeKind,
}

impl Node {
    pub fn as_tag(&self) -> Option<&Tag> {
        match &self.kind {
            NodeKind::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    /// Text or comment content
    pub fn content(&self) -> Option<&Content> {
        match &self.kind {
            NodeKind::Text(content) | NodeKind::Comment(content) => Some(content),
            _ => None,
        }
    }

    /// Child ids, empty for leaf nodes
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Document { children } => children,
            NodeKind::Tag(tag) => &tag.children,
            _ => &[],
        }
    }

    /// Template spans carried by the node's own content
    pub fn templates(&self) -> &[TemplateSpan] {
        match &self.kind {
            NodeKind::Text(content) | NodeKind::Comment(content) | NodeKind::Doctype(content) => {
                &content.templates
            }
            _ => &[],
        }
    }
}

impl Typed for Node {
    fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::Document { .. } => NodeType::Document,
            NodeKind::Tag(_) => NodeType::Tag,
            NodeKind::ScriptTag(_) => NodeType::ScriptTag,
            NodeKind::StyleTag(_) => NodeType::StyleTag,
            NodeKind::Text(_) => NodeType::Text,
            NodeKind::Comment(_) => NodeType::Comment,
            NodeKind::Doctype(_) => NodeType::Doctype,
        }
    }
}

macro_rules! impl_located {
    ($($ty:ty),*) => {
        $(
            impl Located for $ty {
                fn span(&self) -> Span {
                    self.span
                }

                fn loc(&self) -> SourceLocation {
                    self.loc
                }
            }
        )*
    };
}

impl_located!(Node, Token, Content, AttributePart, Attribute, TemplateSpan);

impl<T: Located + ?Sized> Located for &T {
    fn span(&self) -> Span {
        (**self).span()
    }

    fn loc(&self) -> SourceLocation {
        (**self).loc()
    }
}

/// A parsed markup document
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub source: String,
    pub nodes: Vec<Node>,
}

impl Document {
    pub fn root(&self) -> &Node {
        &self.nodes[NodeId::ROOT.index()]
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn parent(&self, id: NodeId) -> Option<&Node> {
        self.node(id).parent.map(|p| self.node(p))
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &Node> + '_ {
        self.node(id).children().iter().map(move |c| self.node(*c))
    }

    /// Source text covered by a span
    pub fn text(&self, span: Span) -> &str {
        &self.source[span.start..span.end]
    }

    /// Source line at a 1-based line number, without its terminator
    pub fn source_line(&self, line: usize) -> Option<&str> {
        self.source
            .split('\n')
            .nth(line.checked_sub(1)?)
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
    }

    /// All nodes in document order (depth-first, parents before children)
    pub fn iter(&self) -> impl Iterator<Item = &Node> + '_ {
        let mut stack = vec![NodeId::ROOT];
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            let node = self.node(id);
            stack.extend(node.children().iter().rev().copied());
            Some(node)
        })
    }
}

/// Maps byte offsets to line/column positions
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { line_starts }
    }

    pub fn position(&self, offset: usize) -> Position {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        Position::new(line + 1, offset - self.line_starts[line])
    }

    pub fn location(&self, span: Span) -> SourceLocation {
        SourceLocation::new(self.position(span.start), self.position(span.end))
    }
}
