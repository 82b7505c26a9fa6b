use ropey::Rope;
use std::cmp;
use unicode_width::UnicodeWidthStr;

use crate::scroll_sync::{Extents, ScrollSample};
use crate::selection::SelectionRange;
use crate::session::SelectionSource;

/// The source editing surface.
///
/// Positions are character offsets into the buffer. The selection runs from
/// `anchor` to `cursor`; without an anchor it is a caret.
#[derive(Clone)]
pub struct Editor {
    rope: Rope,
    cursor: usize,
    anchor: Option<usize>,
    // Column the cursor tries to keep while moving vertically
    preferred_col: Option<usize>,
    viewport_offset: usize,
    viewport_height: usize,
    tab_size: usize,
}

impl Editor {
    pub fn new() -> Self {
        Self {
            rope: Rope::new(),
            cursor: 0,
            anchor: None,
            preferred_col: None,
            viewport_offset: 0,
            viewport_height: 24, // Default, will be updated
            tab_size: 4,
        }
    }

    /// Replace the whole text, keeping the cursor where it was as far as
    /// the new text allows.
    pub fn set_content(&mut self, content: &str) {
        self.rope = Rope::from_str(content);
        self.cursor = self.cursor.min(self.rope.len_chars());
        self.anchor = None;
        self.preferred_col = None;
        self.set_viewport_offset(self.viewport_offset);
    }

    pub fn content(&self) -> String {
        self.rope.to_string()
    }

    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    pub fn set_tab_size(&mut self, tab_size: usize) {
        self.tab_size = tab_size.max(1);
    }

    /// Character offset where `line` begins.
    pub fn line_start(&self, line: usize) -> usize {
        self.rope.line_to_char(line.min(self.rope.len_lines()))
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Cursor line and display column, accounting for wide characters.
    pub fn cursor_line_col(&self) -> (usize, usize) {
        let line = self.rope.char_to_line(self.cursor);
        let line_start = self.rope.line_to_char(line);
        let prefix = self.rope.slice(line_start..self.cursor).to_string();
        (line, prefix.width())
    }

    // Selection

    pub fn selection(&self) -> SelectionRange {
        match self.anchor {
            Some(anchor) => SelectionRange::new(anchor, self.cursor),
            None => SelectionRange::caret(self.cursor),
        }
    }

    /// Select `range`, leaving the cursor at its end. Out of range offsets
    /// are clamped to the text.
    pub fn set_selection(&mut self, range: SelectionRange) {
        let len = self.rope.len_chars();
        let start = range.start.min(len);
        let end = range.end.min(len);
        self.anchor = (start != end).then_some(start);
        self.cursor = end;
        self.preferred_col = None;
        self.adjust_viewport();
    }

    pub fn clear_selection(&mut self) {
        self.anchor = None;
    }

    pub fn selected_text(&self) -> String {
        let selection = self.selection();
        self.rope.slice(selection.start..selection.end).to_string()
    }

    /// Remove the selected text. Returns whether anything was removed.
    fn delete_selection(&mut self) -> bool {
        let selection = self.selection();
        self.anchor = None;
        if selection.is_empty() {
            return false;
        }
        self.rope.remove(selection.start..selection.end);
        self.cursor = selection.start;
        true
    }

    // Editing

    pub fn insert_char(&mut self, c: char) {
        if self.rope.len_chars() > 1_000_000 {
            log::warn!("Document size approaching limit, insert may be slow");
        }

        self.delete_selection();
        self.rope.insert_char(self.cursor, c);
        self.cursor += 1;
        self.preferred_col = None;
        self.adjust_viewport();
    }

    pub fn insert_str(&mut self, text: &str) {
        self.delete_selection();
        self.rope.insert(self.cursor, text);
        self.cursor += text.chars().count();
        self.preferred_col = None;
        self.adjust_viewport();
    }

    pub fn insert_newline(&mut self) {
        self.insert_char('\n');
    }

    pub fn insert_tab(&mut self) {
        let spaces = " ".repeat(self.tab_size);
        self.insert_str(&spaces);
    }

    pub fn delete_char_backward(&mut self) {
        if self.delete_selection() {
            self.adjust_viewport();
            return;
        }
        if self.cursor > 0 {
            self.cursor -= 1;
            self.rope.remove(self.cursor..self.cursor + 1);
            self.preferred_col = None;
            self.adjust_viewport();
        }
    }

    pub fn delete_char_forward(&mut self) {
        if self.delete_selection() {
            self.adjust_viewport();
            return;
        }
        if self.cursor < self.rope.len_chars() {
            self.rope.remove(self.cursor..self.cursor + 1);
        }
    }

    // Movement. `extend` keeps the anchor so the selection grows.

    fn begin_move(&mut self, extend: bool) {
        if extend {
            if self.anchor.is_none() {
                self.anchor = Some(self.cursor);
            }
        } else {
            self.anchor = None;
        }
    }

    fn finish_move(&mut self) {
        if self.anchor == Some(self.cursor) {
            self.anchor = None;
        }
        self.adjust_viewport();
    }

    pub fn move_cursor_left(&mut self, extend: bool) {
        let collapse_to = (!extend).then(|| self.selection()).filter(|s| !s.is_empty());
        self.begin_move(extend);
        self.cursor = match collapse_to {
            Some(selection) => selection.start,
            None => self.cursor.saturating_sub(1),
        };
        self.preferred_col = None;
        self.finish_move();
    }

    pub fn move_cursor_right(&mut self, extend: bool) {
        let collapse_to = (!extend).then(|| self.selection()).filter(|s| !s.is_empty());
        self.begin_move(extend);
        self.cursor = match collapse_to {
            Some(selection) => selection.end,
            None => cmp::min(self.cursor + 1, self.rope.len_chars()),
        };
        self.preferred_col = None;
        self.finish_move();
    }

    pub fn move_cursor_up(&mut self, extend: bool) {
        self.move_lines(-1, extend);
    }

    pub fn move_cursor_down(&mut self, extend: bool) {
        self.move_lines(1, extend);
    }

    pub fn page_up(&mut self, extend: bool) {
        let lines = self.viewport_height.max(1) as isize;
        self.move_lines(-lines, extend);
    }

    pub fn page_down(&mut self, extend: bool) {
        let lines = self.viewport_height.max(1) as isize;
        self.move_lines(lines, extend);
    }

    fn move_lines(&mut self, delta: isize, extend: bool) {
        self.begin_move(extend);
        let line = self.rope.char_to_line(self.cursor);
        let col = self
            .preferred_col
            .unwrap_or(self.cursor - self.rope.line_to_char(line));

        let last_line = self.rope.len_lines().saturating_sub(1);
        let target = line.saturating_add_signed(delta).min(last_line);
        self.cursor = self.rope.line_to_char(target) + col.min(self.line_len(target));
        self.preferred_col = Some(col);
        self.finish_move();
    }

    pub fn move_to_line_start(&mut self, extend: bool) {
        self.begin_move(extend);
        let line = self.rope.char_to_line(self.cursor);
        self.cursor = self.rope.line_to_char(line);
        self.preferred_col = None;
        self.finish_move();
    }

    pub fn move_to_line_end(&mut self, extend: bool) {
        self.begin_move(extend);
        let line = self.rope.char_to_line(self.cursor);
        self.cursor = self.rope.line_to_char(line) + self.line_len(line);
        self.preferred_col = None;
        self.finish_move();
    }

    /// Characters on `line`, not counting its line break.
    fn line_len(&self, line: usize) -> usize {
        let Some(slice) = self.rope.get_line(line) else {
            return 0;
        };
        let mut len = slice.len_chars();
        if len > 0 && slice.char(len - 1) == '\n' {
            len -= 1;
            if len > 0 && slice.char(len - 1) == '\r' {
                len -= 1;
            }
        }
        len
    }

    // Viewport

    pub fn set_viewport_height(&mut self, height: usize) {
        self.viewport_height = height.max(1);
        self.adjust_viewport();
    }

    pub fn viewport_height(&self) -> usize {
        self.viewport_height
    }

    pub fn viewport_offset(&self) -> usize {
        self.viewport_offset
    }

    pub fn set_viewport_offset(&mut self, offset: usize) {
        let max_offset = self.rope.len_lines().saturating_sub(self.viewport_height);
        self.viewport_offset = offset.min(max_offset);
    }

    /// Scroll the viewport without moving the cursor.
    pub fn scroll_by(&mut self, delta: isize) {
        self.set_viewport_offset(self.viewport_offset.saturating_add_signed(delta));
    }

    /// Visible lines without their line breaks.
    pub fn viewport_lines(&self) -> Vec<String> {
        let end_line = cmp::min(
            self.viewport_offset + self.viewport_height,
            self.rope.len_lines(),
        );

        (self.viewport_offset..end_line)
            .filter_map(|i| self.rope.get_line(i))
            .map(|line| {
                let text = line.to_string();
                text.trim_end_matches(['\n', '\r']).to_string()
            })
            .collect()
    }

    /// Current scroll position in lines, for synchronizing the preview.
    pub fn scroll_sample(&self) -> ScrollSample {
        ScrollSample::new(
            self.viewport_offset as f64,
            self.rope.len_lines() as f64,
            self.viewport_height as f64,
        )
    }

    pub fn extents(&self) -> Extents {
        self.scroll_sample().extents()
    }

    fn adjust_viewport(&mut self) {
        let cursor_line = self.rope.char_to_line(self.cursor);
        if cursor_line < self.viewport_offset {
            self.viewport_offset = cursor_line;
        } else if cursor_line >= self.viewport_offset + self.viewport_height {
            self.viewport_offset = cursor_line + 1 - self.viewport_height;
        }
    }
}

impl SelectionSource for Editor {
    fn selection(&self) -> SelectionRange {
        Editor::selection(self)
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}
