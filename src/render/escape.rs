//! Escaping policy for emitted text.
//!
//! Every fragment the renderer writes goes through [`escape`] with one of four
//! modes. Normal text is backslash-escaped so that parsing the output with the
//! same grammar yields the original characters again. A handful of characters
//! only matter at the start of a line (list bullets, setext underlines,
//! ordered list numbers), so the caller says whether the fragment begins a line.

use std::borrow::Cow;

use super::options::OutputGrammar;

/// How a fragment is transformed before it is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escaping {
    /// Written verbatim (delimiters, code, raw HTML)
    Literal,
    /// Document text
    Normal,
    /// Link or image destination
    Url,
    /// Link or image title (the caller writes the quotes)
    Title,
}

/// Where a fragment lands on its output line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinePosition {
    /// Nothing but indentation or a container prefix so far
    #[default]
    Start,
    /// Only digits so far, so `.` or `)` would form an ordered list marker
    AfterDigits,
    /// Past the first content character
    Inside,
}

impl LinePosition {
    /// Position after writing `c`.
    pub fn after(self, c: char) -> Self {
        match c {
            '\n' => LinePosition::Start,
            ' ' | '\t' => match self {
                LinePosition::AfterDigits => LinePosition::Inside,
                other => other,
            },
            '0'..='9' if self != LinePosition::Inside => LinePosition::AfterDigits,
            _ => LinePosition::Inside,
        }
    }

    /// Position after writing every character of `text`.
    pub fn after_str(self, text: &str) -> Self {
        text.chars().fold(self, LinePosition::after)
    }
}

/// Escape `text` for `mode` under `grammar`.
///
/// `position` is where the fragment starts on its output line. Only
/// [`Escaping::Normal`] looks at it.
pub fn escape(
    text: &str,
    mode: Escaping,
    grammar: OutputGrammar,
    position: LinePosition,
) -> Cow<'_, str> {
    match mode {
        Escaping::Literal => Cow::Borrowed(text),
        Escaping::Normal => Cow::Owned(escape_normal(text, grammar, position)),
        Escaping::Url => Cow::Owned(escape_url(text)),
        Escaping::Title => Cow::Owned(escape_title(text)),
    }
}

fn escape_normal(text: &str, grammar: OutputGrammar, mut position: LinePosition) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 8);

    for c in text.chars() {
        let needs_escape = match c {
            '\\' | '`' | '*' | '_' | '[' | ']' | '<' | '>' | '#' | '&' => true,
            '~' | '|' if grammar == OutputGrammar::Gfm => true,
            '-' | '+' | '=' | '~' => position == LinePosition::Start,
            '.' | ')' => position == LinePosition::AfterDigits,
            _ => false,
        };

        if needs_escape {
            result.push('\\');
        }
        result.push(c);
        position = position.after(c);
    }

    result
}

fn escape_url(url: &str) -> String {
    let bracketed = url.is_empty() || url.chars().any(char::is_whitespace);
    let mut result = String::with_capacity(url.len() + 2);

    if bracketed {
        result.push('<');
    }
    for c in url.chars() {
        match c {
            '<' | '>' | '\\' => {
                result.push('\\');
                result.push(c);
            }
            '(' | ')' if !bracketed => {
                result.push('\\');
                result.push(c);
            }
            // Line endings are not allowed inside a destination
            '\n' => result.push_str("%0A"),
            '\r' => result.push_str("%0D"),
            _ => result.push(c),
        }
    }
    if bracketed {
        result.push('>');
    }

    result
}

fn escape_title(title: &str) -> String {
    let mut result = String::with_capacity(title.len() + 2);
    for c in title.chars() {
        if c == '"' || c == '\\' {
            result.push('\\');
        }
        result.push(c);
    }
    result
}

/// Length of the longest run of `c` in `content`.
fn longest_run(content: &str, c: char) -> usize {
    let mut max_run = 0;
    let mut current_run = 0;

    for ch in content.chars() {
        if ch == c {
            current_run += 1;
            max_run = max_run.max(current_run);
        } else {
            current_run = 0;
        }
    }

    max_run
}

/// Smallest fence (at least three characters) that cannot close early inside `content`.
pub fn fence_length(content: &str, fence_char: char) -> usize {
    longest_run(content, fence_char).max(2) + 1
}

/// Smallest backtick string that can delimit `content` as inline code.
pub fn inline_code_ticks(content: &str) -> usize {
    longest_run(content, '`') + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    const MID: LinePosition = LinePosition::Inside;

    fn normal(text: &str) -> String {
        escape(text, Escaping::Normal, OutputGrammar::CommonMark, MID).into_owned()
    }

    fn normal_at_start(text: &str) -> String {
        escape(text, Escaping::Normal, OutputGrammar::CommonMark, LinePosition::Start).into_owned()
    }

    #[test]
    fn test_literal_passthrough() {
        let out = escape("*_[x]_*", Escaping::Literal, OutputGrammar::Gfm, LinePosition::Start);
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(out, "*_[x]_*");
    }

    #[test]
    fn test_always_escaped() {
        assert_eq!(normal("*bold*"), "\\*bold\\*");
        assert_eq!(normal("[link]"), "\\[link\\]");
        assert_eq!(normal("a_b"), "a\\_b");
        assert_eq!(normal("<div>"), "\\<div\\>");
        assert_eq!(normal("AT&T"), "AT\\&T");
        assert_eq!(normal("C:\\path"), "C:\\\\path");
        assert_eq!(normal("`tick`"), "\\`tick\\`");
        assert_eq!(normal("issue #5"), "issue \\#5");
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(normal("Hello, World!"), "Hello, World!");
        assert_eq!(normal("a-b+c=d 1. 2)"), "a-b+c=d 1. 2)");
    }

    #[test]
    fn test_line_start_markers() {
        assert_eq!(normal_at_start("- item"), "\\- item");
        assert_eq!(normal_at_start("+ item"), "\\+ item");
        assert_eq!(normal_at_start("==="), "\\===");
        assert_eq!(normal_at_start("~~~"), "\\~~~");
        assert_eq!(normal_at_start("1. first"), "1\\. first");
        assert_eq!(normal_at_start("42) answer"), "42\\) answer");
        assert_eq!(normal_at_start("  - indented"), "  \\- indented");
        assert_eq!(normal_at_start("3 . no"), "3 . no");
        assert_eq!(normal_at_start("v1.2"), "v1.2");
    }

    #[test]
    fn test_embedded_newline_resets_line_start() {
        assert_eq!(normal("x\n- y"), "x\n\\- y");
        assert_eq!(normal("x\n2. y"), "x\n2\\. y");
    }

    #[test]
    fn test_digits_split_across_fragments() {
        let position = LinePosition::Start.after_str("12");
        assert_eq!(position, LinePosition::AfterDigits);
        let out = escape(". twelve", Escaping::Normal, OutputGrammar::CommonMark, position);
        assert_eq!(out, "\\. twelve");
    }

    #[test]
    fn test_line_position_transitions() {
        assert_eq!(LinePosition::Start.after(' '), LinePosition::Start);
        assert_eq!(LinePosition::Start.after('x'), LinePosition::Inside);
        assert_eq!(LinePosition::AfterDigits.after(' '), LinePosition::Inside);
        assert_eq!(LinePosition::Inside.after('7'), LinePosition::Inside);
        assert_eq!(LinePosition::Inside.after('\n'), LinePosition::Start);
    }

    #[test]
    fn test_gfm_extras() {
        let gfm = escape("a|b~c", Escaping::Normal, OutputGrammar::Gfm, MID);
        assert_eq!(gfm, "a\\|b\\~c");
        assert_eq!(normal("a|b~c"), "a|b~c");
    }

    #[test]
    fn test_url_escaping() {
        let url = |s: &str| escape(s, Escaping::Url, OutputGrammar::CommonMark, MID).into_owned();
        assert_eq!(url("https://example.com"), "https://example.com");
        assert_eq!(url("https://e.com/a_(b)"), "https://e.com/a_\\(b\\)");
        assert_eq!(url("my file.md"), "<my file.md>");
        assert_eq!(url("a (b)"), "<a (b)>");
        assert_eq!(url(""), "<>");
        assert_eq!(url("x<y"), "x\\<y");
    }

    #[test]
    fn test_title_escaping() {
        let title = escape("say \"hi\" \\o/", Escaping::Title, OutputGrammar::CommonMark, MID);
        assert_eq!(title, "say \\\"hi\\\" \\\\o/");
    }

    #[test]
    fn test_fence_length() {
        assert_eq!(fence_length("let x = 1;", '`'), 3);
        assert_eq!(fence_length("```rust\ncode\n```", '`'), 4);
        assert_eq!(fence_length("`````", '`'), 6);
    }

    #[test]
    fn test_inline_code_ticks() {
        assert_eq!(inline_code_ticks("code"), 1);
        assert_eq!(inline_code_ticks("code with ` backtick"), 2);
        assert_eq!(inline_code_ticks("``double``"), 3);
    }
}
