//! Positions, ranges and the editor-side document the session reads from.
//!
//! The session never owns the editor's buffer. It reads text through the
//! [`DocumentView`] trait and learns about edits through
//! [`DocumentView::save_point_identity`]. [`TextDocument`] is a simple
//! in-memory implementation.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

/// A zero-based `(line, column)` location. Columns count bytes.
///
/// Positions order by line, then column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// The position one column to the right.
    pub fn next_column(self) -> Self {
        Self::new(self.line, self.column + 1)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl From<(usize, usize)> for Position {
    fn from((line, column): (usize, usize)) -> Self {
        Self::new(line, column)
    }
}

/// A span of the document, `stop` included.
///
/// A sentence range stops on its terminating `.` (or on the bullet itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub stop: Position,
}

impl Range {
    /// Build a range, swapping the bounds if they are out of order.
    pub fn new(start: Position, stop: Position) -> Self {
        if start <= stop {
            Self { start, stop }
        } else {
            Self {
                start: stop,
                stop: start,
            }
        }
    }

    /// Check whether `pos` lies within the range.
    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos <= self.stop
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.stop)
    }
}

/// Opaque identity of a loaded document.
///
/// A new identity means the buffer was swapped or reloaded and any
/// synchronization history is void.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(u64);

impl DocumentId {
    /// Allocate a process-unique identity.
    pub fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap an identity supplied by the host editor.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

/// What the document reports at a synchronization point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavePoint {
    /// Identity of the document.
    pub document: DocumentId,
    /// Earliest position edited since the previous save point, if any.
    pub edited_from: Option<Position>,
}

/// Read access to the editor buffer.
pub trait DocumentView {
    /// Number of lines in the document.
    fn line_count(&self) -> usize;

    /// Text of one line, without its line terminator.
    fn line(&self, index: usize) -> Option<&str>;

    /// Length of one line in bytes (0 past the end).
    fn line_length(&self, index: usize) -> usize {
        self.line(index).map_or(0, str::len)
    }

    /// Text from `start` to `stop` inclusive, each line terminated by `\n`.
    fn text_between(&self, start: Position, stop: Position) -> String {
        let mut acc = String::new();
        if stop.line < start.line {
            return acc;
        }
        for index in start.line..=stop.line {
            let Some(line) = self.line(index) else { break };
            let from = if index == start.line { start.column } else { 0 };
            let to = if index == stop.line {
                stop.column.saturating_add(1)
            } else {
                line.len()
            };
            acc.push_str(slice_columns(line, from, to));
            acc.push('\n');
        }
        acc
    }

    /// Identity plus the earliest edit since the last call.
    fn save_point_identity(&self) -> SavePoint;
}

/// Slice `line[from..to]`, clamped to the line and widened to char boundaries.
pub(crate) fn slice_columns(line: &str, from: usize, to: usize) -> &str {
    let mut to = to.min(line.len());
    while !line.is_char_boundary(to) {
        to += 1;
    }
    let mut from = from.min(to);
    while !line.is_char_boundary(from) {
        from -= 1;
    }
    &line[from..to]
}

/// An in-memory document, split into lines.
///
/// Edits through [`set_line`](Self::set_line), [`insert_line`](Self::insert_line)
/// and [`remove_line`](Self::remove_line) are remembered until the next
/// [`save_point_identity`](DocumentView::save_point_identity) call;
/// [`replace`](Self::replace) loads a new document with a new identity.
#[derive(Debug)]
pub struct TextDocument {
    id: DocumentId,
    lines: Vec<String>,
    edited_from: Mutex<Option<Position>>,
}

impl TextDocument {
    pub fn new(text: &str) -> Self {
        Self {
            id: DocumentId::fresh(),
            lines: split_lines(text),
            edited_from: Mutex::new(None),
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Replace the whole content. The document gets a new identity.
    pub fn replace(&mut self, text: &str) {
        self.id = DocumentId::fresh();
        self.lines = split_lines(text);
        *self.edits() = None;
    }

    pub fn set_line(&mut self, index: usize, text: impl Into<String>) {
        if index >= self.lines.len() {
            self.lines.resize(index + 1, String::new());
        }
        self.lines[index] = text.into();
        self.mark_edited(Position::new(index, 0));
    }

    pub fn insert_line(&mut self, index: usize, text: impl Into<String>) {
        let index = index.min(self.lines.len());
        self.lines.insert(index, text.into());
        self.mark_edited(Position::new(index, 0));
    }

    pub fn remove_line(&mut self, index: usize) {
        if index < self.lines.len() {
            self.lines.remove(index);
            self.mark_edited(Position::new(index, 0));
        }
    }

    fn mark_edited(&self, pos: Position) {
        let mut edits = self.edits();
        *edits = Some(edits.map_or(pos, |prev| prev.min(pos)));
    }

    fn edits(&self) -> MutexGuard<'_, Option<Position>> {
        self.edited_from
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DocumentView for TextDocument {
    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    fn save_point_identity(&self) -> SavePoint {
        SavePoint {
            document: self.id,
            edited_from: self.edits().take(),
        }
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}
