//! Stroke history: an ordered list of strokes plus an undo/redo cursor.
//!
//! Only `entries[0..=cursor]` is active (rendered and persisted). Entries past
//! the cursor are redoable until the next [`StrokeStore::begin_stroke`], which
//! truncates them. The cursor is `-1` for an empty canvas.
//!
//! The store owns no rendering or network state so it can be driven and
//! tested without a browser.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use frames::{Point, Stroke, Tool};

/// Linear stroke history with undo/redo.
#[derive(Debug, Clone)]
pub struct StrokeStore {
    entries: Vec<Stroke>,
    /// Index of the last active entry, or `-1` when nothing is active.
    cursor: isize,
    /// True between `begin_stroke` and `end_stroke` (or undo/clear).
    drawing: bool,
}

impl Default for StrokeStore {
    fn default() -> Self {
        Self { entries: Vec::new(), cursor: -1, drawing: false }
    }
}

impl StrokeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole history with a persisted snapshot. The cursor lands
    /// on the last stroke so everything loaded is active; there is no redo.
    pub fn load(&mut self, strokes: Vec<Stroke>) {
        self.entries = strokes;
        self.cursor = self.tail();
        self.drawing = false;
    }

    // --- Mutations ---

    /// Start a new stroke at `start`. Drops any redoable entries first.
    pub fn begin_stroke(&mut self, tool: Tool, color: impl Into<String>, line_width: f64, start: Point) {
        self.entries.truncate(self.active_len());
        self.entries.push(Stroke::new(tool, color, line_width, start));
        self.cursor = self.tail();
        self.drawing = true;
    }

    /// Append a point to the stroke being drawn. Returns `false` (and changes
    /// nothing) when no stroke is in progress.
    pub fn extend_stroke(&mut self, point: Point) -> bool {
        if !self.drawing {
            return false;
        }
        let Some(stroke) = self.current_mut() else {
            return false;
        };
        stroke.points.push(point);
        true
    }

    /// Freeze the current stroke. Later `extend_stroke` calls are rejected
    /// until the next `begin_stroke`.
    pub fn end_stroke(&mut self) {
        self.drawing = false;
    }

    /// Step the cursor back one stroke. No-op on an empty active prefix.
    pub fn undo(&mut self) {
        if self.cursor >= 0 {
            self.cursor -= 1;
            self.drawing = false;
        }
    }

    /// Step the cursor forward one stroke. No-op at the tail.
    pub fn redo(&mut self) {
        if self.cursor < self.tail() {
            self.cursor += 1;
        }
    }

    /// Drop every entry, including redoable ones.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = -1;
        self.drawing = false;
    }

    // --- Queries ---

    /// Strokes that are visible and persisted.
    #[must_use]
    pub fn active_prefix(&self) -> &[Stroke] {
        &self.entries[..self.active_len()]
    }

    /// All entries including redoable ones.
    #[must_use]
    pub fn entries(&self) -> &[Stroke] {
        &self.entries
    }

    #[must_use]
    pub fn cursor(&self) -> isize {
        self.cursor
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor >= 0
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor < self.tail()
    }

    /// The stroke at the cursor, if any.
    #[must_use]
    pub fn current(&self) -> Option<&Stroke> {
        self.cursor_index().and_then(|i| self.entries.get(i))
    }

    // --- Helpers ---

    fn current_mut(&mut self) -> Option<&mut Stroke> {
        self.cursor_index().and_then(|i| self.entries.get_mut(i))
    }

    fn cursor_index(&self) -> Option<usize> {
        (self.cursor >= 0).then(|| self.cursor.unsigned_abs())
    }

    /// Number of active entries (`cursor + 1`).
    fn active_len(&self) -> usize {
        usize::try_from(self.cursor + 1).unwrap_or(0)
    }

    /// Index of the last entry, `-1` when empty.
    fn tail(&self) -> isize {
        isize::try_from(self.entries.len()).map_or(isize::MAX, |len| len - 1)
    }
}
