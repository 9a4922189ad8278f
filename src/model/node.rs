//! Node tree structures.

use serde::{Deserialize, Serialize};

/// The closed set of node kinds a document tree may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Document,
    BlockQuote,
    List,
    Item,
    Heading,
    CodeBlock,
    HtmlBlock,
    CustomBlock,
    ThematicBreak,
    Paragraph,
    Text,
    Linebreak,
    Softbreak,
    Code,
    HtmlInline,
    CustomInline,
    Strong,
    Emph,
    Link,
    Image,
    FootnoteReference,
    FootnoteDefinition,
}

impl NodeKind {
    /// Every kind, in declaration order.
    pub const ALL: [NodeKind; 22] = [
        NodeKind::Document,
        NodeKind::BlockQuote,
        NodeKind::List,
        NodeKind::Item,
        NodeKind::Heading,
        NodeKind::CodeBlock,
        NodeKind::HtmlBlock,
        NodeKind::CustomBlock,
        NodeKind::ThematicBreak,
        NodeKind::Paragraph,
        NodeKind::Text,
        NodeKind::Linebreak,
        NodeKind::Softbreak,
        NodeKind::Code,
        NodeKind::HtmlInline,
        NodeKind::CustomInline,
        NodeKind::Strong,
        NodeKind::Emph,
        NodeKind::Link,
        NodeKind::Image,
        NodeKind::FootnoteReference,
        NodeKind::FootnoteDefinition,
    ];

    /// Check if nodes of this kind must never have children.
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            NodeKind::Text
                | NodeKind::Code
                | NodeKind::HtmlInline
                | NodeKind::Linebreak
                | NodeKind::Softbreak
                | NodeKind::ThematicBreak
                | NodeKind::CodeBlock
                | NodeKind::HtmlBlock
                | NodeKind::FootnoteReference
        )
    }

    /// Check if nodes of this kind must carry a literal payload.
    pub fn requires_literal(&self) -> bool {
        matches!(
            self,
            NodeKind::Text
                | NodeKind::Code
                | NodeKind::HtmlInline
                | NodeKind::CodeBlock
                | NodeKind::HtmlBlock
        )
    }

    /// Human-readable name, matching the serialized tag.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::BlockQuote => "block_quote",
            NodeKind::List => "list",
            NodeKind::Item => "item",
            NodeKind::Heading => "heading",
            NodeKind::CodeBlock => "code_block",
            NodeKind::HtmlBlock => "html_block",
            NodeKind::CustomBlock => "custom_block",
            NodeKind::ThematicBreak => "thematic_break",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Text => "text",
            NodeKind::Linebreak => "linebreak",
            NodeKind::Softbreak => "softbreak",
            NodeKind::Code => "code",
            NodeKind::HtmlInline => "html_inline",
            NodeKind::CustomInline => "custom_inline",
            NodeKind::Strong => "strong",
            NodeKind::Emph => "emph",
            NodeKind::Link => "link",
            NodeKind::Image => "image",
            NodeKind::FootnoteReference => "footnote_reference",
            NodeKind::FootnoteDefinition => "footnote_definition",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// List type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    /// Unordered (bulleted) list
    #[default]
    Bullet,
    /// Ordered (numbered) list
    Ordered,
}

/// Delimiter written after ordered list numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListDelimiter {
    /// `1.`
    #[default]
    Period,
    /// `1)`
    Paren,
}

impl ListDelimiter {
    pub fn as_char(&self) -> char {
        match self {
            ListDelimiter::Period => '.',
            ListDelimiter::Paren => ')',
        }
    }
}

/// List metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListAttrs {
    /// Type of list
    #[serde(default)]
    pub list_type: ListType,

    /// First item number (ordered lists)
    #[serde(default = "default_start")]
    pub start: u64,

    /// Number delimiter (ordered lists)
    #[serde(default)]
    pub delimiter: ListDelimiter,

    /// Tight lists have no blank lines between items
    #[serde(default)]
    pub tight: bool,
}

fn default_start() -> u64 {
    1
}

impl Default for ListAttrs {
    fn default() -> Self {
        Self {
            list_type: ListType::Bullet,
            start: 1,
            delimiter: ListDelimiter::Period,
            tight: false,
        }
    }
}

impl ListAttrs {
    /// Create bullet list attributes.
    pub fn bullet(tight: bool) -> Self {
        Self {
            tight,
            ..Default::default()
        }
    }

    /// Create ordered list attributes starting at `start`.
    pub fn ordered(start: u64, tight: bool) -> Self {
        Self {
            list_type: ListType::Ordered,
            start,
            tight,
            ..Default::default()
        }
    }
}

/// Kind-specific metadata carried on a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAttrs {
    /// Link or image destination
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Link or image title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Heading level (1-6)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,

    /// List metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list: Option<ListAttrs>,

    /// Code block info string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,

    /// Footnote label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Closing literal of a custom node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_exit: Option<String>,
}

impl NodeAttrs {
    /// Check if no attribute is set.
    pub fn is_empty(&self) -> bool {
        *self == NodeAttrs::default()
    }
}

/// A node of a parsed document tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// What this node represents
    pub kind: NodeKind,

    /// Raw text payload (text, code, HTML and custom kinds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,

    /// Kind-specific metadata
    #[serde(default, skip_serializing_if = "NodeAttrs::is_empty")]
    pub attrs: NodeAttrs,

    /// Child nodes in document order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    /// Create an empty node of the given kind.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            literal: None,
            attrs: NodeAttrs::default(),
            children: Vec::new(),
        }
    }

    fn leaf(kind: NodeKind, literal: impl Into<String>) -> Self {
        Self {
            literal: Some(literal.into()),
            ..Self::new(kind)
        }
    }

    fn container(kind: NodeKind, children: Vec<Node>) -> Self {
        Self {
            children,
            ..Self::new(kind)
        }
    }

    pub fn document(children: Vec<Node>) -> Self {
        Self::container(NodeKind::Document, children)
    }

    pub fn paragraph(children: Vec<Node>) -> Self {
        Self::container(NodeKind::Paragraph, children)
    }

    pub fn block_quote(children: Vec<Node>) -> Self {
        Self::container(NodeKind::BlockQuote, children)
    }

    /// Create a heading; levels outside 1-6 are clamped.
    pub fn heading(level: u8, children: Vec<Node>) -> Self {
        let mut node = Self::container(NodeKind::Heading, children);
        node.attrs.level = Some(level.clamp(1, 6));
        node
    }

    pub fn list(attrs: ListAttrs, items: Vec<Node>) -> Self {
        let mut node = Self::container(NodeKind::List, items);
        node.attrs.list = Some(attrs);
        node
    }

    pub fn item(children: Vec<Node>) -> Self {
        Self::container(NodeKind::Item, children)
    }

    /// Create a code block. An empty `info` is stored as no info string.
    pub fn code_block(info: impl Into<String>, literal: impl Into<String>) -> Self {
        let info = info.into();
        let mut node = Self::leaf(NodeKind::CodeBlock, literal);
        node.attrs.info = (!info.is_empty()).then_some(info);
        node
    }

    pub fn html_block(literal: impl Into<String>) -> Self {
        Self::leaf(NodeKind::HtmlBlock, literal)
    }

    pub fn thematic_break() -> Self {
        Self::new(NodeKind::ThematicBreak)
    }

    pub fn text(literal: impl Into<String>) -> Self {
        Self::leaf(NodeKind::Text, literal)
    }

    pub fn code(literal: impl Into<String>) -> Self {
        Self::leaf(NodeKind::Code, literal)
    }

    pub fn html_inline(literal: impl Into<String>) -> Self {
        Self::leaf(NodeKind::HtmlInline, literal)
    }

    pub fn linebreak() -> Self {
        Self::new(NodeKind::Linebreak)
    }

    pub fn softbreak() -> Self {
        Self::new(NodeKind::Softbreak)
    }

    pub fn emph(children: Vec<Node>) -> Self {
        Self::container(NodeKind::Emph, children)
    }

    pub fn strong(children: Vec<Node>) -> Self {
        Self::container(NodeKind::Strong, children)
    }

    /// Create a link; an empty `title` is stored as no title.
    pub fn link(url: impl Into<String>, title: impl Into<String>, children: Vec<Node>) -> Self {
        let mut node = Self::container(NodeKind::Link, children);
        node.set_destination(url.into(), title.into());
        node
    }

    /// Create an image; the children form the alt text.
    pub fn image(url: impl Into<String>, title: impl Into<String>, children: Vec<Node>) -> Self {
        let mut node = Self::container(NodeKind::Image, children);
        node.set_destination(url.into(), title.into());
        node
    }

    fn set_destination(&mut self, url: String, title: String) {
        self.attrs.url = Some(url);
        self.attrs.title = (!title.is_empty()).then_some(title);
    }

    pub fn footnote_reference(label: impl Into<String>) -> Self {
        let mut node = Self::new(NodeKind::FootnoteReference);
        node.attrs.label = Some(label.into());
        node
    }

    pub fn footnote_definition(label: impl Into<String>, children: Vec<Node>) -> Self {
        let mut node = Self::container(NodeKind::FootnoteDefinition, children);
        node.attrs.label = Some(label.into());
        node
    }

    /// Create a custom block emitting `on_enter` before and `on_exit` after its children.
    pub fn custom_block(
        on_enter: impl Into<String>,
        on_exit: Option<String>,
        children: Vec<Node>,
    ) -> Self {
        let mut node = Self::container(NodeKind::CustomBlock, children);
        node.literal = Some(on_enter.into());
        node.attrs.on_exit = on_exit;
        node
    }

    /// Create a custom inline emitting `on_enter` before and `on_exit` after its children.
    pub fn custom_inline(
        on_enter: impl Into<String>,
        on_exit: Option<String>,
        children: Vec<Node>,
    ) -> Self {
        let mut node = Self::container(NodeKind::CustomInline, children);
        node.literal = Some(on_enter.into());
        node.attrs.on_exit = on_exit;
        node
    }

    /// Append a child node.
    pub fn push(&mut self, child: Node) {
        self.children.push(child);
    }

    /// Total number of nodes in this subtree, including this one.
    pub fn node_count(&self) -> usize {
        super::walk::walk(self)
            .filter(|event| event.is_enter())
            .count()
    }

    /// Concatenated text of all text-like descendants.
    ///
    /// Breaks become spaces; markup delimiters are omitted.
    pub fn plain_text(&self) -> String {
        let mut text = String::new();
        for event in super::walk::walk(self).filter(|e| e.is_enter()) {
            let node = event.node();
            match node.kind {
                NodeKind::Text | NodeKind::Code => {
                    text.push_str(node.literal.as_deref().unwrap_or_default());
                }
                NodeKind::Softbreak | NodeKind::Linebreak => text.push(' '),
                _ => {}
            }
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_classification() {
        assert!(NodeKind::Text.is_leaf());
        assert!(NodeKind::CodeBlock.is_leaf());
        assert!(!NodeKind::Paragraph.is_leaf());
        assert!(!NodeKind::CustomInline.is_leaf());

        assert!(NodeKind::Text.requires_literal());
        assert!(!NodeKind::Softbreak.requires_literal());
    }

    #[test]
    fn test_kind_names_match_serde_tags() {
        for kind in NodeKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.name()));
        }
    }

    #[test]
    fn test_heading_level_clamped() {
        assert_eq!(Node::heading(9, vec![]).attrs.level, Some(6));
        assert_eq!(Node::heading(0, vec![]).attrs.level, Some(1));
    }

    #[test]
    fn test_link_without_title() {
        let link = Node::link("https://example.com", "", vec![Node::text("site")]);
        assert_eq!(link.attrs.url.as_deref(), Some("https://example.com"));
        assert!(link.attrs.title.is_none());
    }

    #[test]
    fn test_plain_text() {
        let doc = Node::document(vec![Node::paragraph(vec![
            Node::text("Hello,"),
            Node::softbreak(),
            Node::emph(vec![Node::text("World")]),
            Node::code("!"),
        ])]);
        assert_eq!(doc.plain_text(), "Hello, World!");
        assert_eq!(doc.node_count(), 7);
    }

    #[test]
    fn test_node_serialization() {
        let node = Node::paragraph(vec![Node::text("Test")]);
        let json = serde_json::to_string(&node).unwrap();
        // Empty fields should not be serialized
        assert!(!json.contains("attrs"));
        assert!(!json.contains("\"literal\":null"));

        let parsed: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, node);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let result = serde_json::from_str::<Node>(r#"{"kind":"table"}"#);
        assert!(result.is_err());
    }
}
