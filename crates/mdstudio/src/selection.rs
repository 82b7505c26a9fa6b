//! Selection-aware formatting insertion.
//!
//! Offsets are character offsets (Unicode scalar values), matching the
//! editing surface's rope.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionRange {
    pub start: usize,
    pub end: usize,
}

impl SelectionRange {
    /// Selection between two positions, in either order.
    pub fn new(a: usize, b: usize) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn caret(position: usize) -> Self {
        Self {
            start: position,
            end: position,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("selection start {start} is after its end {end}")]
    Inverted { start: usize, end: usize },

    #[error("selection end {end} is past the end of a {len}-character buffer")]
    OutOfBounds { end: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    pub new_buffer: String,
    pub new_selection: SelectionRange,
}

/// Wrap the selected span of `buffer` in `prefix` and `suffix`.
///
/// The wrapped span stays selected; an empty selection becomes a caret
/// between the two markers.
pub fn insert_around(
    buffer: &str,
    selection: SelectionRange,
    prefix: &str,
    suffix: &str,
) -> Result<Insertion, SelectionError> {
    let SelectionRange { start, end } = selection;
    if start > end {
        return Err(SelectionError::Inverted { start, end });
    }

    let len = buffer.chars().count();
    let (Some(start_byte), Some(end_byte)) = (byte_offset(buffer, start), byte_offset(buffer, end))
    else {
        return Err(SelectionError::OutOfBounds { end, len });
    };

    let (before, rest) = buffer.split_at(start_byte);
    let (selected, after) = rest.split_at(end_byte - start_byte);

    let mut new_buffer =
        String::with_capacity(buffer.len() + prefix.len() + suffix.len());
    new_buffer.push_str(before);
    new_buffer.push_str(prefix);
    new_buffer.push_str(selected);
    new_buffer.push_str(suffix);
    new_buffer.push_str(after);

    let shift = prefix.chars().count();
    Ok(Insertion {
        new_buffer,
        new_selection: SelectionRange {
            start: start + shift,
            end: end + shift,
        },
    })
}

fn byte_offset(s: &str, char_idx: usize) -> Option<usize> {
    s.char_indices()
        .map(|(byte, _)| byte)
        .chain(std::iter::once(s.len()))
        .nth(char_idx)
}

/// The formatting commands offered by the toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatCommand {
    Bold,
    Italic,
    Strikethrough,
    Heading1,
    Heading2,
    InlineCode,
    CodeBlock,
    List,
    Quote,
}

impl FormatCommand {
    pub const ALL: [FormatCommand; 9] = [
        FormatCommand::Bold,
        FormatCommand::Italic,
        FormatCommand::Strikethrough,
        FormatCommand::Heading1,
        FormatCommand::Heading2,
        FormatCommand::InlineCode,
        FormatCommand::CodeBlock,
        FormatCommand::List,
        FormatCommand::Quote,
    ];

    /// `(prefix, suffix)` inserted around the selection.
    pub fn markers(self) -> (&'static str, &'static str) {
        match self {
            FormatCommand::Bold => ("**", "**"),
            FormatCommand::Italic => ("_", "_"),
            FormatCommand::Strikethrough => ("~~", "~~"),
            FormatCommand::Heading1 => ("# ", ""),
            FormatCommand::Heading2 => ("## ", ""),
            FormatCommand::InlineCode => ("`", "`"),
            FormatCommand::CodeBlock => ("```\n", "\n```"),
            FormatCommand::List => ("- ", ""),
            FormatCommand::Quote => ("> ", ""),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FormatCommand::Bold => "Bold",
            FormatCommand::Italic => "Italic",
            FormatCommand::Strikethrough => "Strikethrough",
            FormatCommand::Heading1 => "Heading 1",
            FormatCommand::Heading2 => "Heading 2",
            FormatCommand::InlineCode => "Inline Code",
            FormatCommand::CodeBlock => "Code Block",
            FormatCommand::List => "List",
            FormatCommand::Quote => "Quote",
        }
    }

    pub fn apply(self, buffer: &str, selection: SelectionRange) -> Result<Insertion, SelectionError> {
        let (prefix, suffix) = self.markers();
        insert_around(buffer, selection, prefix, suffix)
    }
}
