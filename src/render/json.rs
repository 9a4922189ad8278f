//! JSON dump of a node tree.

use crate::error::Result;
use crate::model::Node;

/// JSON output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JsonFormat {
    /// Compact single-line JSON
    Compact,
    /// Pretty-printed with 2-space indentation
    #[default]
    Pretty,
}

/// Serialize a node tree to JSON.
pub fn to_json(root: &Node, format: JsonFormat) -> Result<String> {
    let json = match format {
        JsonFormat::Compact => serde_json::to_string(root)?,
        JsonFormat::Pretty => serde_json::to_string_pretty(root)?,
    };
    Ok(json)
}

/// Read a node tree back from JSON.
///
/// Unknown node kinds are rejected here, so every tree that reaches the
/// renderer is built from the closed kind set.
pub fn from_json(json: &str) -> Result<Node> {
    Ok(serde_json::from_str(json)?)
}
