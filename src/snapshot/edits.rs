//! Incremental text edits in editor coordinates

use serde::{Deserialize, Serialize};

/// Zero-based line and UTF-16 column
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start_line: u32, start_character: u32, end_line: u32, end_character: u32) -> Self {
        Self {
            start: Position {
                line: start_line,
                character: start_character,
            },
            end: Position {
                line: end_line,
                character: end_character,
            },
        }
    }
}

/// A content change; no range means the whole document is replaced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub range: Option<Range>,
    pub text: String,
}

impl TextEdit {
    pub fn replace(range: Range, text: impl Into<String>) -> Self {
        Self {
            range: Some(range),
            text: text.into(),
        }
    }

    pub fn full(text: impl Into<String>) -> Self {
        Self {
            range: None,
            text: text.into(),
        }
    }
}

/// Byte offset of `position` in `text`, clamped to the line end and text end
pub fn offset_at(text: &str, position: Position) -> usize {
    let mut line_start = 0;
    for _ in 0..position.line {
        match text[line_start..].find('\n') {
            Some(idx) => line_start += idx + 1,
            None => return text.len(),
        }
    }

    let line_end = text[line_start..]
        .find('\n')
        .map_or(text.len(), |idx| line_start + idx);

    let mut units = 0u32;
    for (idx, ch) in text[line_start..line_end].char_indices() {
        if units >= position.character {
            return line_start + idx;
        }
        units += ch.len_utf16() as u32;
    }
    line_end
}

/// Apply edits in order; each edit sees the result of the previous one
pub fn apply_edits(text: &str, edits: &[TextEdit]) -> String {
    let mut current = text.to_string();
    for edit in edits {
        match edit.range {
            None => current = edit.text.clone(),
            Some(range) => {
                let start = offset_at(&current, range.start);
                let end = offset_at(&current, range.end).max(start);
                current.replace_range(start..end, &edit.text);
            }
        }
    }
    current
}
