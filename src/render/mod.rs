//! Output rendering for node trees.
//!
//! This module turns a [`Node`](crate::model::Node) tree into Markdown text,
//! and dumps trees as JSON.
//!
//! # Example
//!
//! ```
//! use mdtree::model::Node;
//! use mdtree::render::*;
//!
//! let doc = Node::document(vec![Node::paragraph(vec![Node::text("hello")])]);
//!
//! // Render to Markdown
//! let md = to_markdown(&doc, &RenderOptions::default())?;
//! assert_eq!(md, "hello");
//!
//! // Dump the tree
//! let json = to_json(&doc, JsonFormat::Compact)?;
//! assert!(json.starts_with("{\"kind\":\"document\""));
//! # Ok::<(), mdtree::Error>(())
//! ```

mod escape;
mod json;
mod markdown;
mod options;
#[cfg(feature = "async")]
mod task;
mod writer;

pub use escape::{escape, fence_length, inline_code_ticks, Escaping, LinePosition};
pub use json::{from_json, to_json, JsonFormat};
pub use markdown::to_markdown;
pub use options::{
    ColumnMode, MarkerSet, OutputGrammar, RenderOptions, RenderSettings, MAX_LINE_WIDTH,
};
#[cfg(feature = "async")]
pub use task::render_with_timeout;
pub use writer::OutputWriter;
