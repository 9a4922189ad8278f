//! Rendering options configuration.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Widest line width accepted; anything larger is treated as a configuration mistake.
pub const MAX_LINE_WIDTH: usize = u16::MAX as usize;

/// Target grammar, selecting the escaping rules for emitted text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputGrammar {
    /// CommonMark core syntax
    #[default]
    CommonMark,
    /// CommonMark plus the strikethrough and table extensions
    Gfm,
}

impl FromStr for OutputGrammar {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "commonmark" | "cmark" => Ok(OutputGrammar::CommonMark),
            "gfm" => Ok(OutputGrammar::Gfm),
            other => Err(Error::InvalidConfig(format!(
                "unknown output grammar '{}' (expected commonmark or gfm)",
                other
            ))),
        }
    }
}

/// Which structural delimiters the renderer writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerSet {
    /// Inline delimiters and block separation only
    #[default]
    Minimal,
    /// Complete Markdown: heading hashes, list markers, quote prefixes, fences
    Full,
}

impl FromStr for MarkerSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" => Ok(MarkerSet::Minimal),
            "full" => Ok(MarkerSet::Full),
            other => Err(Error::InvalidConfig(format!(
                "unknown marker set '{}' (expected minimal or full)",
                other
            ))),
        }
    }
}

/// How the writer measures the current column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnMode {
    /// One column per character
    #[default]
    Chars,
    /// Terminal display width (wide CJK characters take two columns)
    DisplayWidth,
}

impl FromStr for ColumnMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chars" => Ok(ColumnMode::Chars),
            "display" | "display_width" => Ok(ColumnMode::DisplayWidth),
            other => Err(Error::InvalidConfig(format!(
                "unknown column mode '{}' (expected chars or display)",
                other
            ))),
        }
    }
}

/// Options for rendering a node tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Wrap width in columns (0 = no wrapping)
    pub line_width: usize,

    /// Escaping rules for emitted text
    pub grammar: OutputGrammar,

    /// Structural delimiters to write
    pub markers: MarkerSet,

    /// Column measurement for wrapping
    pub column_mode: ColumnMode,
}

impl RenderOptions {
    /// Create new render options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the wrap width (0 disables wrapping).
    pub fn with_line_width(mut self, width: usize) -> Self {
        self.line_width = width;
        self
    }

    /// Set the output grammar.
    pub fn with_grammar(mut self, grammar: OutputGrammar) -> Self {
        self.grammar = grammar;
        self
    }

    /// Set the marker set.
    pub fn with_markers(mut self, markers: MarkerSet) -> Self {
        self.markers = markers;
        self
    }

    /// Set the column measurement.
    pub fn with_column_mode(mut self, mode: ColumnMode) -> Self {
        self.column_mode = mode;
        self
    }

    /// Check the options before a render starts.
    pub fn validate(&self) -> Result<()> {
        if self.line_width > MAX_LINE_WIDTH {
            return Err(Error::InvalidConfig(format!(
                "line width {} exceeds the maximum of {}",
                self.line_width, MAX_LINE_WIDTH
            )));
        }
        Ok(())
    }

    /// Check if wrapping is enabled.
    pub fn wraps(&self) -> bool {
        self.line_width > 0
    }
}

/// Unvalidated render configuration, as read from a settings file or foreign caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub line_width: i64,
    pub grammar: String,
    pub markers: String,
    pub column_mode: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            line_width: 0,
            grammar: "commonmark".to_string(),
            markers: "minimal".to_string(),
            column_mode: "chars".to_string(),
        }
    }
}

impl RenderSettings {
    /// Load settings from a JSON document. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl TryFrom<&RenderSettings> for RenderOptions {
    type Error = Error;

    fn try_from(settings: &RenderSettings) -> Result<Self> {
        let line_width = usize::try_from(settings.line_width).map_err(|_| {
            Error::InvalidConfig(format!(
                "line width must not be negative (got {})",
                settings.line_width
            ))
        })?;

        let options = RenderOptions {
            line_width,
            grammar: settings.grammar.parse()?,
            markers: settings.markers.parse()?,
            column_mode: settings.column_mode.parse()?,
        };
        options.validate()?;
        Ok(options)
    }
}

impl TryFrom<RenderSettings> for RenderOptions {
    type Error = Error;

    fn try_from(settings: RenderSettings) -> Result<Self> {
        RenderOptions::try_from(&settings)
    }
}
