//! Position and location utilities.
//!
//! The emitter's debug contract is stated in lines (every source line with a
//! statement produces the same output line), so AST nodes carry line/column
//! ranges directly. Byte offsets are converted through [`LineMap`].

use serde::{Deserialize, Serialize};

/// A position in a source file (0-indexed line and column).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// 0-indexed line number
    pub line: u32,
    /// 0-indexed column (byte offset from line start)
    pub column: u32,
}

impl Position {
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A range in a source file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    #[must_use]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// A whole range on a single line.
    #[must_use]
    pub const fn on_line(line: u32) -> Self {
        Self {
            start: Position::new(line, 0),
            end: Position::new(line, 0),
        }
    }

    /// Spanning a run of lines, columns unknown.
    #[must_use]
    pub const fn lines(start_line: u32, end_line: u32) -> Self {
        Self {
            start: Position::new(start_line, 0),
            end: Position::new(end_line, 0),
        }
    }

    #[must_use]
    pub const fn start_line(&self) -> u32 {
        self.start.line
    }

    #[must_use]
    pub const fn end_line(&self) -> u32 {
        self.end.line
    }

    #[must_use]
    pub const fn is_multi_line(&self) -> bool {
        self.start.line != self.end.line
    }
}

/// Line map for efficient offset -> position conversion.
/// Stores the starting offset of each line.
#[derive(Debug, Clone)]
pub struct LineMap {
    /// Starting offset of each line (`line_starts[0]` is always 0)
    line_starts: Vec<u32>,
}

impl LineMap {
    /// Build a line map from source text.
    #[must_use]
    pub fn build(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for pos in memchr::memchr_iter(b'\n', source.as_bytes()) {
            line_starts.push(u32::try_from(pos + 1).unwrap_or(u32::MAX));
        }
        Self { line_starts }
    }

    /// Number of lines in the mapped source.
    #[must_use]
    pub fn line_count(&self) -> u32 {
        self.line_starts.len() as u32
    }

    /// Convert a byte offset to a line/column position.
    #[must_use]
    pub fn position(&self, offset: u32) -> Position {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        Position {
            line: line as u32,
            column: offset - self.line_starts[line],
        }
    }

    /// Byte offset at which the given line starts.
    #[must_use]
    pub fn line_start(&self, line: u32) -> Option<u32> {
        self.line_starts.get(line as usize).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_map_positions() {
        let map = LineMap::build("line1\nline2\nline3");
        assert_eq!(map.line_count(), 3);
        assert_eq!(map.position(0), Position::new(0, 0));
        assert_eq!(map.position(5), Position::new(0, 5));
        assert_eq!(map.position(6), Position::new(1, 0));
        assert_eq!(map.position(12), Position::new(2, 0));
        assert_eq!(map.position(14), Position::new(2, 2));
    }

    #[test]
    fn test_line_map_empty_source() {
        let map = LineMap::build("");
        assert_eq!(map.line_count(), 1);
        assert_eq!(map.position(0), Position::new(0, 0));
    }

    #[test]
    fn test_line_starts() {
        let map = LineMap::build("a\nbc\n");
        assert_eq!(map.line_start(0), Some(0));
        assert_eq!(map.line_start(1), Some(2));
        assert_eq!(map.line_start(2), Some(5));
        assert_eq!(map.line_start(3), None);
    }
}
