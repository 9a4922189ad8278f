//! # mdtree
//!
//! Render document trees to Markdown text.
//!
//! A document is a tree of typed [`Node`]s (paragraphs, headings, lists,
//! emphasis, text, code, ...). The renderer walks the tree once and writes a
//! textual serialization, handling blank-line separation, word wrapping and
//! escaping of characters that would otherwise be read as markup.
//!
//! ## Quick Start
//!
//! ```
//! use mdtree::{render, Node, RenderOptions};
//!
//! let doc = Node::document(vec![
//!     Node::paragraph(vec![Node::text("a")]),
//!     Node::paragraph(vec![Node::emph(vec![Node::text("b*c")])]),
//! ]);
//!
//! let md = render(&doc, &RenderOptions::default())?;
//! assert_eq!(md, "a\n\n_b\\*c_");
//! # Ok::<(), mdtree::Error>(())
//! ```
//!
//! ## From Markdown Source
//!
//! ```
//! use mdtree::render::{MarkerSet, RenderOptions};
//!
//! let options = RenderOptions::new()
//!     .with_markers(MarkerSet::Full)
//!     .with_line_width(20);
//!
//! let md = mdtree::render_markdown("# Notes\n\nA paragraph that is long enough to wrap.", &options)?;
//! assert_eq!(md, "# Notes\n\nA paragraph that is\nlong enough to wrap.");
//! # Ok::<(), mdtree::Error>(())
//! ```
//!
//! ## Features
//!
//! - `store` (default): IPFS content-store client
//! - `async`: Time-bounded rendering on the Tokio blocking pool
//! - `ffi`: C-ABI bindings for foreign language integration

pub mod error;
pub mod model;
pub mod parse;
pub mod render;
pub mod store;

#[cfg(feature = "ffi")]
pub mod ffi;

// Re-exports
pub use error::{Error, Result};
pub use model::{ListAttrs, ListDelimiter, ListType, Node, NodeAttrs, NodeKind};
pub use render::{OutputGrammar, OutputWriter, RenderOptions, RenderSettings};

/// Render a node tree to Markdown.
///
/// The options are checked before traversal starts; an invalid configuration
/// produces an error and no output.
///
/// # Panics
///
/// Panics if the tree is malformed: children under a leaf kind, a text-like
/// node without its literal, or a document node below the root.
pub fn render(root: &Node, options: &RenderOptions) -> Result<String> {
    render::to_markdown(root, options)
}

/// Render a node tree using unvalidated settings.
///
/// # Example
///
/// ```
/// use mdtree::{render_with_settings, Node, RenderSettings};
///
/// let settings = RenderSettings {
///     line_width: -4,
///     ..Default::default()
/// };
/// let doc = Node::document(vec![]);
/// assert!(render_with_settings(&doc, &settings).is_err());
/// ```
pub fn render_with_settings(root: &Node, settings: &RenderSettings) -> Result<String> {
    let options = RenderOptions::try_from(settings)?;
    render(root, &options)
}

/// Parse Markdown source and render the resulting tree.
///
/// The source is parsed with the extensions of the selected output grammar.
pub fn render_markdown(source: &str, options: &RenderOptions) -> Result<String> {
    options.validate()?;
    let tree = parse::parse(source, options.grammar);
    render(&tree, options)
}

/// Parse Markdown source and render it using unvalidated settings.
pub fn render_markdown_with_settings(source: &str, settings: &RenderSettings) -> Result<String> {
    let options = RenderOptions::try_from(settings)?;
    render_markdown(source, &options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_markdown_minimal() {
        let md = render_markdown("Some *text* here.\n", &RenderOptions::default()).unwrap();
        assert_eq!(md, "Some _text_ here.");
    }

    #[test]
    fn test_settings_validated_before_parse() {
        let settings = RenderSettings {
            grammar: "rst".to_string(),
            ..Default::default()
        };
        let err = render_markdown_with_settings("x", &settings).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_render_with_settings() {
        let settings = RenderSettings {
            line_width: 3,
            ..Default::default()
        };
        let doc = Node::document(vec![Node::paragraph(vec![Node::text("ab cd")])]);
        assert_eq!(render_with_settings(&doc, &settings).unwrap(), "ab\ncd");
    }
}
