//! Markdown source to node tree, via pulldown-cmark.
//!
//! The adapter folds pulldown-cmark's flat event stream into a [`Node`] tree.
//! Constructs the node model has no kind for (tables, math) are kept as
//! custom nodes carrying their original source text, so rendering them again
//! reproduces the input verbatim.

use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, LinkType, Options, Parser, Tag, TagEnd};
use tracing::debug;

use crate::model::{ListAttrs, ListDelimiter, ListType, Node, NodeKind};
use crate::render::OutputGrammar;

/// Parser extensions matching an output grammar.
pub fn parser_options(grammar: OutputGrammar) -> Options {
    match grammar {
        OutputGrammar::CommonMark => Options::ENABLE_FOOTNOTES,
        OutputGrammar::Gfm => {
            Options::ENABLE_FOOTNOTES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TABLES
                | Options::ENABLE_TASKLISTS
        }
    }
}

/// Parse Markdown `source` into a document tree.
pub fn parse(source: &str, grammar: OutputGrammar) -> Node {
    let parser = Parser::new_ext(source, parser_options(grammar));
    let mut builder = TreeBuilder::new(source);
    for (event, range) in parser.into_offset_iter() {
        builder.handle_event(event, range);
    }
    let root = builder.finish();
    debug!(nodes = root.node_count(), bytes = source.len(), "parsed markdown");
    root
}

struct TreeBuilder<'s> {
    source: &'s str,
    // Open nodes; the document is always at the bottom
    stack: Vec<Node>,
    // Nesting depth inside a construct kept as raw source
    skip_depth: usize,
}

impl<'s> TreeBuilder<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            stack: vec![Node::document(Vec::new())],
            skip_depth: 0,
        }
    }

    fn handle_event(&mut self, event: Event<'_>, range: Range<usize>) {
        if self.skip_depth > 0 {
            match event {
                Event::Start(_) => self.skip_depth += 1,
                Event::End(_) => self.skip_depth -= 1,
                _ => {}
            }
            return;
        }

        match event {
            Event::Start(tag) => self.start_tag(tag, range),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.add_child(Node::code(code.to_string())),
            Event::Html(html) => self.text(&html),
            Event::InlineHtml(html) => self.add_child(Node::html_inline(html.to_string())),
            Event::InlineMath(_) | Event::DisplayMath(_) => {
                let raw = self.raw(&range);
                self.add_child(Node::custom_inline(raw, None, Vec::new()));
            }
            Event::FootnoteReference(label) => {
                self.add_child(Node::footnote_reference(label.to_string()));
            }
            Event::SoftBreak => self.add_child(Node::softbreak()),
            Event::HardBreak => self.add_child(Node::linebreak()),
            Event::Rule => self.add_child(Node::thematic_break()),
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                self.add_child(Node::custom_inline(marker, None, Vec::new()));
            }
        }
    }

    fn start_tag(&mut self, tag: Tag<'_>, range: Range<usize>) {
        let node = match tag {
            Tag::Paragraph => Node::paragraph(Vec::new()),
            Tag::Heading { level, .. } => Node::heading(level as u8, Vec::new()),
            Tag::BlockQuote(_) => Node::block_quote(Vec::new()),
            Tag::CodeBlock(kind) => {
                let info = match kind {
                    CodeBlockKind::Fenced(info) => info.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                Node::code_block(info, "")
            }
            Tag::HtmlBlock => Node::html_block(""),
            Tag::List(start) => Node::list(self.list_attrs(start, &range), Vec::new()),
            Tag::Item => Node::item(Vec::new()),
            Tag::FootnoteDefinition(label) => {
                Node::footnote_definition(label.to_string(), Vec::new())
            }
            Tag::Emphasis => Node::emph(Vec::new()),
            Tag::Strong => Node::strong(Vec::new()),
            Tag::Strikethrough => {
                Node::custom_inline("~~", Some("~~".to_string()), Vec::new())
            }
            Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            } => {
                // `<user@host>` keeps the bare address as its destination
                let url = if link_type == LinkType::Email {
                    format!("mailto:{}", dest_url)
                } else {
                    dest_url.to_string()
                };
                Node::link(url, title.to_string(), Vec::new())
            }
            Tag::Image {
                dest_url, title, ..
            } => Node::image(dest_url.to_string(), title.to_string(), Vec::new()),
            Tag::Table(_) => {
                let raw = self.raw(&range);
                self.add_child(Node::custom_block(raw, None, Vec::new()));
                self.skip_depth = 1;
                return;
            }
            _ => {
                let raw = self.raw(&range);
                self.add_child(Node::custom_inline(raw, None, Vec::new()));
                self.skip_depth = 1;
                return;
            }
        };
        self.stack.push(node);
    }

    fn end_tag(&mut self, tag: TagEnd) {
        // The document stays open until finish()
        if self.stack.len() < 2 {
            return;
        }
        let Some(mut node) = self.stack.pop() else {
            return;
        };
        if matches!(tag, TagEnd::List(_)) {
            if let Some(list) = node.attrs.list.as_mut() {
                // Loose list items wrap their content in paragraphs
                list.tight = !node.children.iter().any(|item| {
                    item.children
                        .iter()
                        .any(|child| child.kind == NodeKind::Paragraph)
                });
            }
        }
        self.add_child(node);
    }

    fn text(&mut self, text: &str) {
        let Some(top) = self.stack.last_mut() else {
            return;
        };
        match top.kind {
            NodeKind::CodeBlock | NodeKind::HtmlBlock => {
                top.literal.get_or_insert_with(String::new).push_str(text);
            }
            _ => match top.children.last_mut() {
                // pulldown-cmark splits text around escapes and entities
                Some(prev) if prev.kind == NodeKind::Text => {
                    prev.literal.get_or_insert_with(String::new).push_str(text);
                }
                _ => top.push(Node::text(text)),
            },
        }
    }

    fn add_child(&mut self, node: Node) {
        if let Some(top) = self.stack.last_mut() {
            top.push(node);
        }
    }

    fn raw(&self, range: &Range<usize>) -> String {
        self.source
            .get(range.clone())
            .unwrap_or_default()
            .trim_end_matches(['\n', '\r'])
            .to_string()
    }

    fn list_attrs(&self, start: Option<u64>, range: &Range<usize>) -> ListAttrs {
        let Some(start) = start else {
            return ListAttrs::bullet(true);
        };
        let marker = self
            .source
            .get(range.clone())
            .unwrap_or_default()
            .trim_start()
            .trim_start_matches(|c: char| c.is_ascii_digit());
        ListAttrs {
            list_type: ListType::Ordered,
            start,
            delimiter: if marker.starts_with(')') {
                ListDelimiter::Paren
            } else {
                ListDelimiter::Period
            },
            tight: true,
        }
    }

    fn finish(mut self) -> Node {
        while self.stack.len() > 1 {
            if let Some(node) = self.stack.pop() {
                self.add_child(node);
            }
        }
        self.stack
            .pop()
            .unwrap_or_else(|| Node::document(Vec::new()))
    }
}
