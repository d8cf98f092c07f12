//! Source spans.
//!
//! ocelint tracks node positions by line, matching the granularity the
//! inspection hooks and the context model work at. Columns are kept
//! for report output and annotation slicing.

use serde::{Deserialize, Serialize};

/// A line-based span in source text.
///
/// Lines are 1-indexed; a node that occupies a single line has
/// `start_line == end_line`. Columns are 0-indexed byte offsets into
/// the start line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    /// First line of the construct (1-indexed).
    pub start_line: u32,
    /// Last line of the construct (1-indexed, inclusive).
    pub end_line: u32,
    /// Column of the first token (0-indexed).
    pub column: u32,
}

impl Span {
    /// Creates a new span.
    #[inline]
    pub const fn new(start_line: u32, end_line: u32, column: u32) -> Self {
        Self {
            start_line,
            end_line,
            column,
        }
    }

    /// Creates a single-line span.
    #[inline]
    pub const fn line(line: u32, column: u32) -> Self {
        Self::new(line, line, column)
    }

    /// Returns true if `other` lies entirely within this span.
    #[inline]
    pub const fn contains(&self, other: &Span) -> bool {
        self.start_line <= other.start_line && other.end_line <= self.end_line
    }

    /// Extends this span to cover `other` as well.
    #[inline]
    pub const fn merge(&self, other: &Span) -> Span {
        Span {
            start_line: if self.start_line < other.start_line {
                self.start_line
            } else {
                other.start_line
            },
            end_line: if self.end_line > other.end_line {
                self.end_line
            } else {
                other.end_line
            },
            column: if self.start_line <= other.start_line {
                self.column
            } else {
                other.column
            },
        }
    }
}
