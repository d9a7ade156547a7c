use unicode_segmentation::UnicodeSegmentation;

use crate::api::{Note, NoteId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    Title,
    Content,
}

/// Unsaved title/content pair. Lives independently of the selected note until
/// it is saved or discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    note_id: Option<NoteId>,
    title: TextBuffer,
    content: TextBuffer,
    focus: DraftField,
}

impl Draft {
    pub fn blank() -> Self {
        Self {
            note_id: None,
            title: TextBuffer::default(),
            content: TextBuffer::default(),
            focus: DraftField::Title,
        }
    }

    pub fn from_note(note: &Note) -> Self {
        Self {
            note_id: Some(note.id.clone()),
            title: TextBuffer::new(note.title.clone()),
            content: TextBuffer::new(note.content.clone()),
            focus: DraftField::Content,
        }
    }

    /// `None` for a note that has never been persisted.
    pub fn note_id(&self) -> Option<&NoteId> {
        self.note_id.as_ref()
    }

    pub fn title(&self) -> &str {
        self.title.text()
    }

    pub fn content(&self) -> &str {
        self.content.text()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = TextBuffer::new(title.into());
        self.title.dirty = true;
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = TextBuffer::new(content.into());
        self.content.dirty = true;
    }

    pub fn focus(&self) -> DraftField {
        self.focus
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            DraftField::Title => DraftField::Content,
            DraftField::Content => DraftField::Title,
        };
    }

    pub fn focus_field(&mut self, field: DraftField) {
        self.focus = field;
    }

    pub fn field(&self, field: DraftField) -> &TextBuffer {
        match field {
            DraftField::Title => &self.title,
            DraftField::Content => &self.content,
        }
    }

    pub fn active(&self) -> &TextBuffer {
        self.field(self.focus)
    }

    pub fn active_mut(&mut self) -> &mut TextBuffer {
        match self.focus {
            DraftField::Title => &mut self.title,
            DraftField::Content => &mut self.content,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.title.dirty || self.content.dirty
    }
}

/// Text with a byte cursor that always sits on a grapheme boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBuffer {
    text: String,
    cursor: usize,
    dirty: bool,
    preferred_column: Option<usize>,
}

impl TextBuffer {
    pub fn new(text: String) -> Self {
        let cursor = text.len();
        Self {
            text,
            cursor,
            dirty: false,
            preferred_column: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn insert_char(&mut self, ch: char) -> bool {
        self.text.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
        self.preferred_column = None;
        self.dirty = true;
        true
    }

    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let prev = prev_grapheme_boundary(&self.text, self.cursor);
        self.text.drain(prev..self.cursor);
        self.cursor = prev;
        self.preferred_column = None;
        self.dirty = true;
        true
    }

    pub fn delete(&mut self) -> bool {
        let next = next_grapheme_boundary(&self.text, self.cursor);
        if next == self.cursor {
            return false;
        }
        self.text.drain(self.cursor..next);
        self.preferred_column = None;
        self.dirty = true;
        true
    }

    pub fn move_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor = prev_grapheme_boundary(&self.text, self.cursor);
        self.preferred_column = None;
        true
    }

    pub fn move_right(&mut self) -> bool {
        let next = next_grapheme_boundary(&self.text, self.cursor);
        if next == self.cursor {
            return false;
        }
        self.cursor = next;
        self.preferred_column = None;
        true
    }

    pub fn move_home(&mut self) -> bool {
        let start = line_start(&self.text, self.cursor);
        if start == self.cursor {
            return false;
        }
        self.cursor = start;
        self.preferred_column = Some(0);
        true
    }

    pub fn move_end(&mut self) -> bool {
        let end = line_end(&self.text, self.cursor);
        if end == self.cursor {
            return false;
        }
        self.cursor = end;
        self.preferred_column = None;
        true
    }

    pub fn move_up(&mut self) -> bool {
        let start = line_start(&self.text, self.cursor);
        if start == 0 {
            return false;
        }
        let column = self
            .preferred_column
            .unwrap_or_else(|| column_at(&self.text, start, self.cursor));
        let prev_start = line_start(&self.text, start - 1);
        self.cursor = position_for_column(&self.text, prev_start, column);
        self.preferred_column = Some(column);
        true
    }

    pub fn move_down(&mut self) -> bool {
        let end = line_end(&self.text, self.cursor);
        if end == self.text.len() {
            return false;
        }
        let start = line_start(&self.text, self.cursor);
        let column = self
            .preferred_column
            .unwrap_or_else(|| column_at(&self.text, start, self.cursor));
        self.cursor = position_for_column(&self.text, end + 1, column);
        self.preferred_column = Some(column);
        true
    }

    /// Line index and grapheme column of the cursor, for placing the
    /// terminal caret.
    pub fn cursor_line_column(&self) -> (usize, usize) {
        let before = &self.text[..self.cursor];
        let line = before.matches('\n').count();
        let start = line_start(&self.text, self.cursor);
        (line, column_at(&self.text, start, self.cursor))
    }
}

fn prev_grapheme_boundary(text: &str, cursor: usize) -> usize {
    text[..cursor]
        .grapheme_indices(true)
        .next_back()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_grapheme_boundary(text: &str, cursor: usize) -> usize {
    text[cursor..]
        .graphemes(true)
        .next()
        .map(|g| cursor + g.len())
        .unwrap_or(cursor)
}

fn line_start(text: &str, cursor: usize) -> usize {
    text[..cursor].rfind('\n').map(|idx| idx + 1).unwrap_or(0)
}

fn line_end(text: &str, cursor: usize) -> usize {
    text[cursor..]
        .find('\n')
        .map(|idx| cursor + idx)
        .unwrap_or(text.len())
}

fn column_at(text: &str, line_start: usize, cursor: usize) -> usize {
    text[line_start..cursor].graphemes(true).count()
}

fn position_for_column(text: &str, line_start: usize, column: usize) -> usize {
    let end = line_end(text, line_start);
    text[line_start..end]
        .grapheme_indices(true)
        .nth(column)
        .map(|(idx, _)| line_start + idx)
        .unwrap_or(end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_from_note_starts_clean_on_content() {
        let note = Note {
            id: NoteId::Int(1),
            title: "A".into(),
            content: "x".into(),
        };
        let draft = Draft::from_note(&note);
        assert_eq!(draft.note_id(), Some(&NoteId::Int(1)));
        assert_eq!(draft.title(), "A");
        assert_eq!(draft.content(), "x");
        assert_eq!(draft.focus(), DraftField::Content);
        assert!(!draft.is_dirty());
    }

    #[test]
    fn editing_marks_the_draft_dirty() {
        let mut draft = Draft::blank();
        assert!(draft.note_id().is_none());
        draft.active_mut().insert_char('H');
        draft.active_mut().insert_char('i');
        assert_eq!(draft.title(), "Hi");
        assert!(draft.is_dirty());
        draft.toggle_focus();
        draft.active_mut().insert_char('!');
        assert_eq!(draft.content(), "!");
    }

    #[test]
    fn backspace_removes_whole_graphemes() {
        let mut buffer = TextBuffer::new("cafe\u{301}".into());
        assert!(buffer.backspace());
        assert_eq!(buffer.text(), "caf");
        assert!(buffer.move_left());
        assert!(buffer.delete());
        assert_eq!(buffer.text(), "ca");
    }

    #[test]
    fn vertical_moves_keep_the_preferred_column() {
        let mut buffer = TextBuffer::new("alpha\nb\ngamma".into());
        assert_eq!(buffer.cursor_line_column(), (2, 5));
        assert!(buffer.move_up());
        assert_eq!(buffer.cursor_line_column(), (1, 1));
        assert!(buffer.move_up());
        assert_eq!(buffer.cursor_line_column(), (0, 5));
        assert!(!buffer.move_up());
        assert!(buffer.move_down());
        assert!(buffer.move_down());
        assert_eq!(buffer.cursor_line_column(), (2, 5));
        assert!(!buffer.move_down());
    }

    #[test]
    fn home_and_end_stay_on_the_current_line() {
        let mut buffer = TextBuffer::new("one\ntwo".into());
        assert!(buffer.move_home());
        assert_eq!(buffer.cursor(), 4);
        assert!(!buffer.move_home());
        assert!(buffer.move_end());
        assert_eq!(buffer.cursor(), 7);
    }
}
