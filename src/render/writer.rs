//! Output writer with column tracking, break coalescing and word wrap.
//!
//! The writer is the only place that touches the output buffer. Renderers ask
//! for block separation with [`OutputWriter::request_break`] and the writer
//! decides how many newlines are actually needed once the next content
//! arrives, so separators never pile up and never lead or trail the output.
//!
//! Wrapping is retroactive: spaces inside wrappable text are remembered as
//! break opportunities, and when the column passes the configured width the
//! latest opportunity on the line becomes a newline. Fragments written after
//! that point are escaped again for their new position at the start of a line.

use unicode_width::UnicodeWidthStr;

use super::escape::{escape, Escaping, LinePosition};
use super::options::{ColumnMode, OutputGrammar, RenderOptions};

/// Incremental text sink for one render call.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    buf: String,
    width: usize,
    grammar: OutputGrammar,
    column_mode: ColumnMode,

    column: usize,
    position: LinePosition,
    pending_break: u8,
    // Prefix length in force when the pending break was requested
    break_prefix: usize,
    trailing_newlines: usize,

    prefix: String,
    prefix_marks: Vec<usize>,
    prefix_pending: bool,

    absorb_break: bool,

    // Byte offset of the last break opportunity on the current line
    breakable: Option<usize>,
    // Raw fragments written after `breakable`, replayed when the line is wrapped
    since_break: Vec<(String, Escaping)>,
    // The last fragment was document text ending in `!`
    trailing_bang: bool,
}

impl OutputWriter {
    /// Create a writer for the given options.
    pub fn new(options: &RenderOptions) -> Self {
        Self {
            buf: String::new(),
            width: options.line_width,
            grammar: options.grammar,
            column_mode: options.column_mode,
            column: 0,
            position: LinePosition::Start,
            pending_break: 0,
            break_prefix: 0,
            trailing_newlines: 0,
            prefix: String::new(),
            prefix_marks: Vec::new(),
            prefix_pending: true,
            absorb_break: false,
            breakable: None,
            since_break: Vec::new(),
            trailing_bang: false,
        }
    }

    /// Current column on the output line.
    pub fn column(&self) -> usize {
        self.column
    }

    /// Write `text` escaped with `mode`.
    ///
    /// With `allow_wrap` and a non-zero width, spaces in the text are break
    /// opportunities. Newlines inside `text` are written as-is and reset the
    /// column.
    pub fn emit(&mut self, text: &str, allow_wrap: bool, mode: Escaping) {
        if text.is_empty() {
            return;
        }
        self.begin_content();

        let wrap = allow_wrap && self.width > 0;
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                self.newline();
            }
            if line.is_empty() {
                continue;
            }
            if wrap {
                self.emit_wrapping(line, mode);
            } else {
                self.push_fragment(line, mode);
            }
        }
    }

    /// Write `text` verbatim, without wrapping.
    pub fn literal(&mut self, text: &str) {
        self.emit(text, false, Escaping::Literal);
    }

    /// Ask for separation before the next content: 1 = newline, 2 = blank line.
    ///
    /// Requests coalesce to the highest level seen since the last content.
    /// Blank separator lines carry the shortest prefix in force across the
    /// coalesced requests, so a quote does not claim the line before it.
    pub fn request_break(&mut self, level: u8) {
        if self.absorb_break {
            self.absorb_break = false;
            return;
        }
        if self.pending_break == 0 {
            self.break_prefix = self.prefix.len();
        } else {
            self.break_prefix = self.break_prefix.min(self.prefix.len());
        }
        self.pending_break = self.pending_break.max(level.min(2));
    }

    /// End the current line immediately.
    pub fn hard_break(&mut self) {
        self.begin_content();
        self.newline();
    }

    /// Write a container marker such as a list bullet.
    ///
    /// The container's first child continues on the marker line: the next
    /// break request is dropped.
    pub fn open_marker(&mut self, marker: &str) {
        self.begin_content();
        self.push_fragment(marker, Escaping::Literal);
        self.position = LinePosition::Start;
        self.absorb_break = true;
    }

    /// Close the container opened by the last [`open_marker`](Self::open_marker).
    ///
    /// A container without content leaves the absorbed break unused; it must
    /// not swallow the separation before the next sibling.
    pub fn close_marker(&mut self) {
        self.absorb_break = false;
    }

    /// End the current line with a visible marker, such as the trailing
    /// backslash of a Markdown hard break.
    pub fn hard_break_with(&mut self, marker: &str) {
        self.begin_content();
        self.drop_trailing_spaces();
        self.push_fragment(marker, Escaping::Literal);
        self.newline();
    }

    /// Escape a `!` that ends the preceding text so that a following `[`
    /// cannot open an image.
    pub fn escape_trailing_bang(&mut self) {
        if !self.trailing_bang {
            return;
        }
        self.trailing_bang = false;
        self.buf.pop();
        self.buf.push_str("\\!");
        self.column += 1;

        if let Some((fragment, mode)) = self.since_break.pop() {
            let head = &fragment[..fragment.len() - 1];
            if !head.is_empty() {
                self.since_break.push((head.to_string(), mode));
            }
            self.since_break.push(("\\!".to_string(), Escaping::Literal));
            if self.width > 0 && self.column > self.width {
                self.wrap_line();
            }
        }
    }

    /// Repeat `prefix` at the start of every following line.
    pub fn push_prefix(&mut self, prefix: &str) {
        self.prefix_marks.push(self.prefix.len());
        self.prefix.push_str(prefix);
    }

    /// Drop the most recently pushed prefix.
    pub fn pop_prefix(&mut self) {
        if let Some(mark) = self.prefix_marks.pop() {
            self.prefix.truncate(mark);
        }
    }

    /// Take the output. Breaks still pending are discarded.
    pub fn finish(mut self) -> String {
        self.drop_trailing_spaces();
        self.buf
    }

    fn measure(&self, text: &str) -> usize {
        match self.column_mode {
            ColumnMode::Chars => text.chars().count(),
            ColumnMode::DisplayWidth => UnicodeWidthStr::width(text),
        }
    }

    /// Flush pending separation ahead of new content.
    fn begin_content(&mut self) {
        self.absorb_break = false;
        if self.pending_break == 0 {
            return;
        }
        let wanted = usize::from(self.pending_break);
        self.pending_break = 0;

        // Nothing to separate from at the very start
        if self.buf.is_empty() {
            return;
        }
        let blank_prefix = self.break_prefix.min(self.prefix.len());
        while self.trailing_newlines < wanted {
            self.end_line(blank_prefix);
        }
    }

    fn write_prefix(&mut self) {
        if self.prefix_pending {
            self.prefix_pending = false;
            self.buf.push_str(&self.prefix);
            self.column = self.measure(&self.prefix);
        }
    }

    fn newline(&mut self) {
        self.end_line(self.prefix.len());
    }

    /// Remove break-opportunity spaces that nothing followed on this line.
    fn drop_trailing_spaces(&mut self) {
        if !self.since_break.is_empty() {
            return;
        }
        if let Some(at) = self.breakable.take() {
            let dropped = self.measure(&self.buf[at..]);
            self.column -= dropped;
            self.buf.truncate(at);
        }
    }

    fn end_line(&mut self, blank_prefix: usize) {
        self.drop_trailing_spaces();
        if self.prefix_pending {
            // Blank line inside a container: keep the markers, drop trailing spaces
            self.buf.push_str(self.prefix[..blank_prefix].trim_end());
        }
        self.buf.push('\n');
        self.trailing_newlines += 1;
        self.column = 0;
        self.position = LinePosition::Start;
        self.prefix_pending = true;
        self.breakable = None;
        self.since_break.clear();
        self.trailing_bang = false;
    }

    fn emit_wrapping(&mut self, line: &str, mode: Escaping) {
        let mut rest = line;
        while !rest.is_empty() {
            let spaces = rest.len() - rest.trim_start_matches(' ').len();
            if spaces > 0 {
                self.push_break_opportunity(&rest[..spaces]);
                rest = &rest[spaces..];
                continue;
            }
            let word_end = rest.find(' ').unwrap_or(rest.len());
            self.push_fragment(&rest[..word_end], mode);
            rest = &rest[word_end..];
        }
    }

    fn push_break_opportunity(&mut self, spaces: &str) {
        // Leading spaces would only produce indentation
        if self.position == LinePosition::Start {
            return;
        }
        self.write_prefix();
        // Adjacent space runs share one break point
        if self.breakable.is_none() || !self.since_break.is_empty() {
            self.breakable = Some(self.buf.len());
            self.since_break.clear();
        }
        self.buf.push_str(spaces);
        self.column += spaces.len();
        self.position = self.position.after(' ');
        self.trailing_newlines = 0;
        self.trailing_bang = false;
    }

    fn push_fragment(&mut self, fragment: &str, mode: Escaping) {
        self.write_prefix();
        let escaped = escape(fragment, mode, self.grammar, self.position);
        self.buf.push_str(&escaped);
        self.column += self.measure(&escaped);
        self.position = self.position.after_str(fragment);
        self.trailing_newlines = 0;
        self.trailing_bang = mode == Escaping::Normal && fragment.ends_with('!');

        if self.breakable.is_some() {
            self.since_break.push((fragment.to_string(), mode));
            if self.width > 0 && self.column > self.width {
                self.wrap_line();
            }
        }
    }

    /// Turn the last break opportunity into a newline.
    fn wrap_line(&mut self) {
        let Some(at) = self.breakable.take() else {
            return;
        };
        let moved = std::mem::take(&mut self.since_break);
        self.buf.truncate(at);
        self.newline();
        for (fragment, mode) in moved {
            self.push_fragment(&fragment, mode);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn writer(width: usize) -> OutputWriter {
        OutputWriter::new(&RenderOptions::new().with_line_width(width))
    }

    #[test]
    fn test_plain_emit() {
        let mut w = writer(0);
        w.emit("Hello", true, Escaping::Normal);
        w.literal("**");
        w.emit(" *world*", false, Escaping::Normal);
        assert_eq!(w.column(), 17);
        assert_eq!(w.finish(), "Hello** \\*world\\*");
    }

    #[test]
    fn test_breaks_coalesce() {
        let mut w = writer(0);
        w.literal("a");
        w.request_break(1);
        w.request_break(2);
        w.request_break(1);
        w.literal("b");
        assert_eq!(w.finish(), "a\n\nb");
    }

    #[test]
    fn test_no_leading_or_trailing_breaks() {
        let mut w = writer(0);
        w.request_break(2);
        w.literal("only");
        w.request_break(2);
        assert_eq!(w.finish(), "only");
    }

    #[test]
    fn test_existing_newlines_count_toward_break() {
        let mut w = writer(0);
        w.literal("a");
        w.hard_break();
        w.request_break(2);
        w.literal("b");
        assert_eq!(w.finish(), "a\n\nb");

        let mut w = writer(0);
        w.literal("code\n");
        w.request_break(1);
        w.literal("next");
        assert_eq!(w.finish(), "code\nnext");
    }

    #[test]
    fn test_column_resets_on_newline() {
        let mut w = writer(0);
        w.literal("abc\nde");
        assert_eq!(w.column(), 2);
        w.hard_break();
        assert_eq!(w.column(), 0);
    }

    #[test]
    fn test_wrap_at_last_space() {
        let mut w = writer(10);
        w.emit("aaa bbb ccc ddd", true, Escaping::Normal);
        assert_eq!(w.finish(), "aaa bbb\nccc ddd");
    }

    #[test]
    fn test_long_word_stays_whole() {
        let mut w = writer(5);
        w.emit("abcdefghij kl", true, Escaping::Normal);
        assert_eq!(w.finish(), "abcdefghij\nkl");
    }

    #[test]
    fn test_unwrappable_fragment_uses_earlier_space() {
        let mut w = writer(8);
        w.emit("one two", true, Escaping::Normal);
        w.literal("**");
        assert_eq!(w.finish(), "one\ntwo**");
    }

    #[test]
    fn test_wrapped_text_reescaped_at_line_start() {
        let mut w = writer(5);
        w.emit("word - dash", true, Escaping::Normal);
        assert_eq!(w.finish(), "word\n\\-\ndash");

        let mut w = writer(4);
        w.emit("ab 12. x", true, Escaping::Normal);
        assert_eq!(w.finish(), "ab\n12\\.\nx");
    }

    #[test]
    fn test_no_wrap_without_allow() {
        let mut w = writer(4);
        w.emit("one two three", false, Escaping::Normal);
        assert_eq!(w.finish(), "one two three");
    }

    #[test]
    fn test_prefix_on_every_line() {
        let mut w = writer(0);
        w.push_prefix("> ");
        w.literal("a");
        w.request_break(2);
        w.literal("b\nc");
        w.pop_prefix();
        w.request_break(2);
        w.literal("out");
        assert_eq!(w.finish(), "> a\n>\n> b\n> c\n\nout");
    }

    #[test]
    fn test_separator_before_prefix_stays_outside() {
        let mut w = writer(0);
        w.literal("para");
        w.request_break(2);
        w.push_prefix("> ");
        w.literal("quoted");
        w.pop_prefix();
        w.request_break(2);
        w.literal("after");
        assert_eq!(w.finish(), "para\n\n> quoted\n\nafter");
    }

    #[test]
    fn test_wrap_inside_prefix() {
        let mut w = writer(8);
        w.push_prefix("> ");
        w.emit("aaa bbb cc", true, Escaping::Normal);
        assert_eq!(w.finish(), "> aaa\n> bbb cc");
    }

    #[test]
    fn test_marker_absorbs_first_break() {
        let mut w = writer(0);
        w.open_marker("- ");
        w.request_break(2);
        w.literal("first");
        w.request_break(1);
        w.open_marker("- ");
        w.request_break(2);
        w.literal("second");
        assert_eq!(w.finish(), "- first\n- second");
    }

    #[test]
    fn test_text_after_marker_is_at_line_start() {
        let mut w = writer(0);
        w.open_marker("- ");
        w.emit("- nested?", false, Escaping::Normal);
        assert_eq!(w.finish(), "- \\- nested?");
    }

    #[test]
    fn test_display_width_columns() {
        let opts = RenderOptions::new()
            .with_line_width(6)
            .with_column_mode(ColumnMode::DisplayWidth);
        let mut w = OutputWriter::new(&opts);
        w.emit("日本 語", true, Escaping::Normal);
        assert_eq!(w.finish(), "日本\n語");

        let mut w = writer(6);
        w.emit("日本 語", true, Escaping::Normal);
        assert_eq!(w.finish(), "日本 語");
    }

    #[test]
    fn test_empty_marker_keeps_separation() {
        let mut w = writer(0);
        w.open_marker("[^1]: ");
        w.close_marker();
        w.request_break(2);
        w.literal("after");
        assert_eq!(w.finish(), "[^1]: \n\nafter");
    }

    #[test]
    fn test_trailing_spaces_dropped_at_line_end() {
        let mut w = writer(5);
        w.emit("aaaa          ", true, Escaping::Normal);
        w.hard_break();
        w.emit("b", true, Escaping::Normal);
        assert_eq!(w.finish(), "aaaa\nb");

        let mut w = writer(10);
        w.emit("end   ", true, Escaping::Normal);
        w.request_break(2);
        w.literal("next");
        w.emit(" tail  ", true, Escaping::Normal);
        assert_eq!(w.finish(), "end\n\nnext tail");
    }

    #[test]
    fn test_hard_break_with_marker() {
        let mut w = writer(8);
        w.emit("aaaa    ", true, Escaping::Normal);
        w.hard_break_with("\\");
        w.literal("b");
        assert_eq!(w.finish(), "aaaa\\\nb");
    }

    #[test]
    fn test_escape_trailing_bang() {
        let mut w = writer(0);
        w.emit("Wow!", false, Escaping::Normal);
        w.escape_trailing_bang();
        w.literal("[");
        assert_eq!(w.finish(), "Wow\\![");

        let mut w = writer(0);
        w.emit("Hi!", false, Escaping::Normal);
        w.literal("*");
        w.escape_trailing_bang();
        assert_eq!(w.finish(), "Hi!*");
    }

    #[test]
    fn test_escaped_bang_survives_wrap() {
        let mut w = writer(8);
        w.emit("ab Wow!", true, Escaping::Normal);
        w.escape_trailing_bang();
        w.literal("[site]");
        assert_eq!(w.finish(), "ab\nWow\\![site]");
    }
}
