//! The output engine.
//!
//! `LuaWriter` performs physical byte emission with strict line tracking:
//! the current output line never exceeds the source line being visited,
//! except under an active fixed-line guard. It owns the indentation stack,
//! the comment interleaver, and the output lock used for dry-run traversals.

use cslua_common::comments::CommentKind;
use cslua_common::{NewLineKind, Position, limits};
use cslua_syntax::LiteralValue;

/// A source comment scheduled for interleaving, positioned by line/column.
#[derive(Clone, Debug)]
pub struct LuaComment {
    pub start: Position,
    pub end_line: u32,
    pub kind: CommentKind,
    pub text: String,
}

/// One entry of the indentation stack.
#[derive(Clone, Copy, Debug, Default)]
struct IndentFrame {
    level: u32,
    extra_spaces: u32,
    in_statement: bool,
    wants_indent_statement: bool,
    did_indent_statement: bool,
}

/// Byte-level writer with line tracking.
#[derive(Debug)]
pub struct LuaWriter {
    out: String,
    new_line: NewLineKind,
    line: u32,
    column: u32,
    at_line_start: bool,
    last_char: char,
    last_char_prev: char,
    indent: Vec<IndentFrame>,
    comments: Vec<LuaComment>,
    comment_cursor: usize,
    fixed_line_depth: u32,
    lock_depth: u32,
    comment_suppress_depth: u32,
    remove_comments: bool,
}

impl LuaWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_new_line(NewLineKind::LineFeed)
    }

    #[must_use]
    pub fn with_new_line(new_line: NewLineKind) -> Self {
        Self {
            out: String::new(),
            new_line,
            line: 0,
            column: 0,
            at_line_start: true,
            last_char: '\0',
            last_char_prev: '\0',
            indent: vec![IndentFrame::default()],
            comments: Vec::with_capacity(limits::COMMENT_LIST_CAPACITY),
            comment_cursor: 0,
            fixed_line_depth: 0,
            lock_depth: 0,
            comment_suppress_depth: 0,
            remove_comments: false,
        }
    }

    /// Install the unit's comment list (must be sorted by start position).
    pub fn set_comments(&mut self, comments: Vec<LuaComment>, remove: bool) {
        self.comments = comments;
        self.comment_cursor = 0;
        self.remove_comments = remove;
    }

    /// Consume the writer, returning the emitted text.
    #[must_use]
    pub fn finish(self) -> String {
        self.out
    }

    #[must_use]
    pub fn get_output(&self) -> &str {
        &self.out
    }

    #[must_use]
    pub const fn current_line(&self) -> u32 {
        self.line
    }

    #[must_use]
    pub const fn current_column(&self) -> u32 {
        self.column
    }

    #[must_use]
    pub const fn at_line_start(&self) -> bool {
        self.at_line_start
    }

    #[must_use]
    pub const fn last_char(&self) -> char {
        self.last_char
    }

    // =========================================================================
    // Output lock
    // =========================================================================

    /// Suppress all byte emission. Used for dry-run traversals whose only
    /// purpose is to gather control-flow facts.
    pub fn lock_output(&mut self) {
        self.lock_depth += 1;
    }

    pub fn unlock_output(&mut self) {
        debug_assert!(self.lock_depth > 0);
        self.lock_depth = self.lock_depth.saturating_sub(1);
    }

    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.lock_depth > 0
    }

    // =========================================================================
    // Fixed-line guard
    // =========================================================================

    /// Enter a region in which line advancement is refused. Returns the
    /// captured line; the caller asserts it is unchanged on exit.
    pub fn begin_fixed_line(&mut self) -> u32 {
        self.fixed_line_depth += 1;
        self.line
    }

    pub fn end_fixed_line(&mut self) {
        debug_assert!(self.fixed_line_depth > 0);
        self.fixed_line_depth = self.fixed_line_depth.saturating_sub(1);
    }

    #[must_use]
    pub const fn is_fixed_line(&self) -> bool {
        self.fixed_line_depth > 0
    }

    // =========================================================================
    // Indentation
    // =========================================================================

    pub fn increase_indent(&mut self) {
        let top = *self.top_frame();
        self.indent.push(IndentFrame {
            level: top.level + 1,
            extra_spaces: top.extra_spaces,
            ..IndentFrame::default()
        });
    }

    pub fn decrease_indent(&mut self) {
        if self.indent.len() > 1 {
            self.indent.pop();
        }
    }

    /// Align continuation output under an opening column.
    pub fn set_extra_spaces(&mut self, spaces: u32) {
        self.top_frame_mut().extra_spaces = spaces;
    }

    /// Mark the start of a statement: if it wraps lines, continuation lines
    /// are indented once.
    pub fn begin_statement(&mut self) {
        let frame = self.top_frame_mut();
        frame.in_statement = true;
        frame.wants_indent_statement = true;
        frame.did_indent_statement = false;
    }

    pub fn end_statement(&mut self) {
        let frame = self.top_frame_mut();
        if frame.did_indent_statement {
            frame.level = frame.level.saturating_sub(1);
        }
        frame.in_statement = false;
        frame.wants_indent_statement = false;
        frame.did_indent_statement = false;
    }

    fn top_frame(&self) -> &IndentFrame {
        self.indent.last().expect("indent stack is never empty")
    }

    fn top_frame_mut(&mut self) -> &mut IndentFrame {
        self.indent.last_mut().expect("indent stack is never empty")
    }

    // =========================================================================
    // Writing
    // =========================================================================

    fn flush_indent(&mut self) {
        let top = *self.top_frame();
        for _ in 0..top.level {
            self.out.push('\t');
            self.column += 1;
        }
        for _ in 0..top.extra_spaces {
            self.out.push(' ');
            self.column += 1;
        }
        self.at_line_start = false;
    }

    /// Emit text. Does nothing while output is locked.
    pub fn write(&mut self, text: &str) {
        if self.is_locked() || text.is_empty() {
            return;
        }
        if self.at_line_start {
            self.flush_indent();
        }
        self.out.push_str(text);
        self.column += text.chars().count() as u32;
        let mut chars = text.chars().rev();
        if let Some(last) = chars.next() {
            self.last_char_prev = chars.next().unwrap_or(self.last_char);
            self.last_char = last;
        }
    }

    /// Emit a single character.
    pub fn write_char(&mut self, ch: char) {
        if self.is_locked() {
            return;
        }
        if self.at_line_start {
            self.flush_indent();
        }
        self.out.push(ch);
        self.column += 1;
        self.last_char_prev = self.last_char;
        self.last_char = ch;
    }

    /// Emit a space unless the output already ends with one (or we are at
    /// the start of a line).
    pub fn write_space(&mut self) {
        if self.is_locked() || self.at_line_start {
            return;
        }
        if self.last_char != ' ' && self.last_char != '\t' {
            self.write_char(' ');
        }
    }

    /// Emit the platform newline and advance the line counter. Requests
    /// under an active fixed-line guard are silently dropped.
    pub fn newline(&mut self) {
        if self.is_locked() || self.is_fixed_line() {
            return;
        }
        self.out.push_str(self.new_line.as_str());
        self.line += 1;
        self.column = 0;
        self.at_line_start = true;
        self.last_char_prev = self.last_char;
        self.last_char = '\n';
        let frame = self.top_frame_mut();
        if frame.in_statement && frame.wants_indent_statement && !frame.did_indent_statement {
            frame.level += 1;
            frame.did_indent_statement = true;
        }
    }

    /// Emit pending comments and newlines until the current line reaches
    /// `line`. No-op when already at or past the target, locked, or fixed.
    pub fn newline_to_target(&mut self, line: u32) {
        if self.is_locked() || self.is_fixed_line() {
            return;
        }
        while self.line < line {
            self.emit_pending_comments(line);
            self.newline();
        }
        // Comments that start exactly on the target line and fit before it
        // are interleaved by the next call; nothing further to do here.
    }

    /// Emit a space if the target line has already been reached, otherwise
    /// advance to it.
    pub fn advance_or_space(&mut self, line: u32) {
        if self.line >= line {
            self.write_space();
        } else {
            self.newline_to_target(line);
        }
    }

    // =========================================================================
    // Comments
    // =========================================================================

    fn emit_pending_comments(&mut self, target: u32) {
        if self.remove_comments || self.comment_suppress_depth > 0 {
            // Cursor still advances so stripped comments are not replayed.
            while self.comment_cursor < self.comments.len()
                && self.comments[self.comment_cursor].start.line <= self.line
            {
                self.comment_cursor += 1;
            }
            return;
        }
        while self.comment_cursor < self.comments.len() {
            let starts_here = {
                let c = &self.comments[self.comment_cursor];
                c.start.line == self.line && c.end_line < target
            };
            if !starts_here {
                // Drop comments the output has already moved past.
                if self.comments[self.comment_cursor].start.line < self.line {
                    self.comment_cursor += 1;
                    continue;
                }
                break;
            }
            let comment = self.comments[self.comment_cursor].clone();
            self.comment_cursor += 1;
            self.write_comment(&comment);
        }
    }

    fn write_comment(&mut self, comment: &LuaComment) {
        let text = sanitize_comment_text(&comment.text);
        match comment.kind {
            CommentKind::SingleLine => {
                self.write("--");
                self.write(&text);
            }
            CommentKind::Doc => {
                self.write("---");
                self.write(&text);
            }
            CommentKind::MultiLine => {
                self.write("--[[");
                let mut first = true;
                for piece in text.split('\n') {
                    if !first {
                        self.newline();
                    }
                    first = false;
                    self.write(piece);
                }
                self.write("]]");
            }
        }
    }

    /// Explicitly request an interior comment between tokens. Requests for a
    /// comment at an already-advanced line are silently ignored.
    pub fn write_interior_comment(&mut self, comment: &LuaComment) {
        if self.remove_comments || comment.start.line < self.line {
            return;
        }
        let text = sanitize_comment_text(&comment.text);
        self.write("--[[");
        self.write(&text);
        self.write("]]");
    }

    // =========================================================================
    // Constants
    // =========================================================================

    /// Write a literal value, culture-invariantly.
    pub fn write_constant(&mut self, value: &LiteralValue) {
        self.comment_suppress_depth += 1;
        match value {
            LiteralValue::Null => self.write("nil"),
            LiteralValue::Bool(true) => self.write("true"),
            LiteralValue::Bool(false) => self.write("false"),
            LiteralValue::Int(v) => {
                let text = v.to_string();
                self.write(&text);
            }
            LiteralValue::Float(v) => {
                let text = format_float(*v);
                self.write(&text);
            }
            LiteralValue::Char(c) => {
                let text = (*c as u32).to_string();
                self.write(&text);
            }
            LiteralValue::Str(s) => {
                let text = escape_string(s);
                self.write(&text);
            }
        }
        self.comment_suppress_depth -= 1;
    }
}

impl Default for LuaWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Escape a string literal with the smaller-quote rule: double quotes when
/// the source contains single quotes, single quotes otherwise.
#[must_use]
pub fn escape_string(s: &str) -> String {
    let quote = if s.contains('\'') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Format a floating-point constant culture-invariantly.
#[must_use]
pub fn format_float(v: f64) -> String {
    if v.is_nan() {
        return "(0/0)".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 {
            "math.huge".to_string()
        } else {
            "-math.huge".to_string()
        };
    }
    if v.fract() == 0.0 && v.abs() < 1e15 {
        return format!("{}", v as i64);
    }
    format!("{v}")
}

/// Sanitize comment text before emission: embedded long-bracket terminators
/// are broken up, and source extensions are rewritten to the target's.
#[must_use]
pub fn sanitize_comment_text(text: &str) -> String {
    text.replace("]]", "] ]").replace(".cs", ".lua")
}

#[cfg(test)]
#[path = "tests/writer.rs"]
mod tests;
