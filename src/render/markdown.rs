//! Markdown renderer implementation.
//!
//! The renderer walks the tree once and reacts to each Enter/Exit event with a
//! fixed rule per node kind. All layout decisions (blank lines, wrapping,
//! line prefixes) are delegated to the [`OutputWriter`].

use tracing::debug;

use crate::error::Result;
use crate::model::{traverse, ListType, Node, NodeKind, Visitor};

use super::escape::{fence_length, inline_code_ticks, Escaping};
use super::options::{MarkerSet, RenderOptions};
use super::writer::OutputWriter;

/// Convert a node tree to Markdown text.
///
/// The options are checked before anything is written. A malformed tree
/// (children under a leaf kind, a missing literal, a nested document) is a
/// caller bug and panics.
pub fn to_markdown(root: &Node, options: &RenderOptions) -> Result<String> {
    options.validate()?;
    debug!(
        line_width = options.line_width,
        grammar = ?options.grammar,
        markers = ?options.markers,
        "rendering node tree"
    );

    let mut renderer = MarkdownRenderer::new(options);
    traverse(root, &mut renderer);

    let output = renderer.finish();
    debug!(bytes = output.len(), "render finished");
    Ok(output)
}

fn check_node(node: &Node, depth: usize) {
    if node.kind.is_leaf() && !node.children.is_empty() {
        panic!(
            "contract violation: {} node has {} children",
            node.kind,
            node.children.len()
        );
    }
    if node.kind.requires_literal() && node.literal.is_none() {
        panic!("contract violation: {} node has no literal", node.kind);
    }
    if node.kind == NodeKind::Document && depth > 1 {
        panic!("contract violation: document node nested at depth {}", depth);
    }
}

/// Numbering state of an open list.
#[derive(Debug, Clone)]
struct ListState {
    ordered: bool,
    delimiter: char,
    next: u64,
    tight: bool,
}

struct MarkdownRenderer {
    writer: OutputWriter,
    markers: MarkerSet,
    wraps: bool,
    lists: Vec<ListState>,
    // Open nodes that forbid line breaks in their content
    no_wrap: usize,
    depth: usize,
}

impl<'a> Visitor<'a> for MarkdownRenderer {
    fn enter(&mut self, node: &'a Node) {
        self.depth += 1;
        check_node(node, self.depth);
        self.on_enter(node);
    }

    fn exit(&mut self, node: &'a Node) {
        self.on_exit(node);
        self.depth -= 1;
    }
}

impl MarkdownRenderer {
    fn new(options: &RenderOptions) -> Self {
        Self {
            writer: OutputWriter::new(options),
            markers: options.markers,
            wraps: options.wraps(),
            lists: Vec::new(),
            no_wrap: 0,
            depth: 0,
        }
    }

    fn finish(self) -> String {
        self.writer.finish()
    }

    fn full(&self) -> bool {
        self.markers == MarkerSet::Full
    }

    /// Separation between sibling blocks.
    fn gap(&self) -> u8 {
        match self.lists.last() {
            Some(list) if list.tight && self.full() => 1,
            _ => 2,
        }
    }

    fn allow_wrap(&self) -> bool {
        self.no_wrap == 0
    }

    fn on_enter(&mut self, node: &Node) {
        match node.kind {
            NodeKind::Document => {}
            NodeKind::Paragraph => self.writer.request_break(self.gap()),
            NodeKind::Heading => self.enter_heading(node),
            NodeKind::BlockQuote => {
                self.writer.request_break(self.gap());
                if self.full() {
                    self.writer.push_prefix("> ");
                }
            }
            NodeKind::List => self.enter_list(node),
            NodeKind::Item => self.enter_item(),
            NodeKind::CodeBlock => self.code_block(node),
            NodeKind::HtmlBlock => self.opaque_block(literal_of(node)),
            NodeKind::ThematicBreak => {
                self.opaque_block(node.literal.as_deref().unwrap_or("***"));
            }
            NodeKind::CustomBlock => self.opaque_block(literal_of(node)),
            NodeKind::Text => {}
            NodeKind::Code => {}
            NodeKind::HtmlInline => {}
            NodeKind::Linebreak => {}
            NodeKind::Softbreak => {}
            NodeKind::Emph => self.writer.literal(self.emph_delimiter()),
            NodeKind::Strong => self.writer.literal("**"),
            NodeKind::Link => {
                self.writer.escape_trailing_bang();
                self.writer.literal("[");
            }
            NodeKind::Image => self.writer.literal("!["),
            NodeKind::FootnoteReference => {
                let label = node.attrs.label.as_deref().unwrap_or_default();
                self.writer.literal(&format!("[^{}]", label));
            }
            NodeKind::FootnoteDefinition => {
                let label = node.attrs.label.as_deref().unwrap_or_default();
                self.writer.request_break(self.gap());
                self.writer.open_marker(&format!("[^{}]: ", label));
                if self.full() {
                    self.writer.push_prefix("    ");
                }
            }
            NodeKind::CustomInline => self.writer.literal(literal_of(node)),
        }
    }

    fn on_exit(&mut self, node: &Node) {
        match node.kind {
            NodeKind::Document => {}
            NodeKind::Paragraph => self.writer.request_break(self.gap()),
            NodeKind::Heading => {
                if self.full() {
                    self.no_wrap -= 1;
                }
                self.writer.request_break(self.gap());
            }
            NodeKind::BlockQuote => {
                if self.full() {
                    self.writer.pop_prefix();
                }
                self.writer.request_break(self.gap());
            }
            NodeKind::List => {
                if self.full() {
                    self.lists.pop();
                }
                self.writer.request_break(self.gap());
            }
            NodeKind::Item => {
                self.writer.close_marker();
                if self.full() {
                    self.writer.pop_prefix();
                }
                self.writer.request_break(self.gap());
            }
            NodeKind::CodeBlock | NodeKind::HtmlBlock | NodeKind::ThematicBreak => {}
            NodeKind::CustomBlock => {
                if let Some(on_exit) = node.attrs.on_exit.as_deref() {
                    self.writer.literal(on_exit);
                    self.writer.request_break(self.gap());
                }
            }
            NodeKind::Text => {
                self.writer
                    .emit(literal_of(node), self.allow_wrap(), Escaping::Normal);
            }
            NodeKind::Code => self.inline_code(literal_of(node)),
            NodeKind::HtmlInline => self.writer.literal(literal_of(node)),
            NodeKind::Linebreak => self.linebreak(),
            NodeKind::Softbreak => {
                if self.wraps && self.allow_wrap() {
                    self.writer.emit(" ", true, Escaping::Literal);
                } else {
                    self.writer.literal(" ");
                }
            }
            NodeKind::Emph => self.writer.literal(self.emph_delimiter()),
            NodeKind::Strong => self.writer.literal("**"),
            NodeKind::Link | NodeKind::Image => self.close_destination(node),
            NodeKind::FootnoteReference => {}
            NodeKind::FootnoteDefinition => {
                self.writer.close_marker();
                if self.full() {
                    self.writer.pop_prefix();
                    self.writer.request_break(self.gap());
                }
            }
            NodeKind::CustomInline => {
                if let Some(on_exit) = node.attrs.on_exit.as_deref() {
                    self.writer.literal(on_exit);
                }
            }
        }
    }

    fn emph_delimiter(&self) -> &'static str {
        // `_` does not open emphasis inside a word, `*` does
        if self.full() {
            "*"
        } else {
            "_"
        }
    }

    fn enter_heading(&mut self, node: &Node) {
        self.writer.request_break(self.gap());
        if self.full() {
            let level = usize::from(node.attrs.level.unwrap_or(1).clamp(1, 6));
            self.writer.literal(&format!("{} ", "#".repeat(level)));
            self.no_wrap += 1;
        }
    }

    fn enter_list(&mut self, node: &Node) {
        self.writer.request_break(self.gap());
        if self.full() {
            let attrs = node.attrs.list.clone().unwrap_or_default();
            self.lists.push(ListState {
                ordered: attrs.list_type == ListType::Ordered,
                delimiter: attrs.delimiter.as_char(),
                next: attrs.start,
                tight: attrs.tight,
            });
        }
    }

    fn enter_item(&mut self) {
        self.writer.request_break(self.gap());
        if !self.full() {
            return;
        }

        let marker = match self.lists.last_mut() {
            Some(list) if list.ordered => {
                let marker = format!("{}{} ", list.next, list.delimiter);
                list.next = list.next.saturating_add(1);
                marker
            }
            _ => "- ".to_string(),
        };
        self.writer.open_marker(&marker);
        self.writer.push_prefix(&" ".repeat(marker.len()));
    }

    fn code_block(&mut self, node: &Node) {
        let content = literal_of(node);
        if !self.full() {
            self.opaque_block(content);
            return;
        }

        let info = node.attrs.info.as_deref().unwrap_or_default();
        // Backtick fences cannot carry an info string containing backticks
        let fence_char = if info.contains('`') { '~' } else { '`' };
        let fence = fence_char
            .to_string()
            .repeat(fence_length(content, fence_char));

        self.writer.request_break(self.gap());
        self.writer.literal(&format!("{}{}", fence, info));
        self.writer.hard_break();
        let body = content.strip_suffix('\n').unwrap_or(content);
        if !body.is_empty() {
            self.writer.literal(body);
            self.writer.hard_break();
        }
        self.writer.literal(&fence);
        self.writer.request_break(self.gap());
    }

    /// Block whose literal is written as-is between block separators.
    fn opaque_block(&mut self, content: &str) {
        self.writer.request_break(self.gap());
        self.writer
            .literal(content.strip_suffix('\n').unwrap_or(content));
        self.writer.request_break(self.gap());
    }

    fn inline_code(&mut self, content: &str) {
        if !self.full() {
            self.writer.literal(content);
            return;
        }

        let ticks = "`".repeat(inline_code_ticks(content));
        let padded = content.starts_with('`')
            || content.ends_with('`')
            || (content.starts_with(' ')
                && content.ends_with(' ')
                && !content.trim().is_empty());
        let pad = if padded { " " } else { "" };
        self.writer
            .literal(&format!("{}{}{}{}{}", ticks, pad, content, pad, ticks));
    }

    fn linebreak(&mut self) {
        if !self.full() {
            self.writer.hard_break();
        } else if self.allow_wrap() {
            self.writer.hard_break_with("\\");
        } else {
            // Headings are a single line
            self.writer.literal(" ");
        }
    }

    fn close_destination(&mut self, node: &Node) {
        self.writer.literal("](");
        let url = node.attrs.url.as_deref().unwrap_or_default();
        self.writer.emit(url, false, Escaping::Url);
        if url.is_empty() {
            // emit() skips empty text, but an empty destination still needs its brackets
            self.writer.literal("<>");
        }
        if let Some(title) = node.attrs.title.as_deref() {
            self.writer.literal(" \"");
            self.writer.emit(title, false, Escaping::Title);
            self.writer.literal("\"");
        }
        self.writer.literal(")");
    }
}

fn literal_of(node: &Node) -> &str {
    node.literal.as_deref().unwrap_or_default()
}
