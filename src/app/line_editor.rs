use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::cmp::min;

/// Single-line text input with a char-based cursor and an optional length cap.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LineEditor {
    pub text: String,
    pub cursor_col: usize,
    max_chars: Option<usize>,
}

impl LineEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_chars(max_chars: usize) -> Self {
        Self {
            max_chars: Some(max_chars),
            ..Self::default()
        }
    }

    pub fn max_chars(&self) -> Option<usize> {
        self.max_chars
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor_col = 0;
    }

    pub fn insert_char(&mut self, ch: char) {
        let mut buffer = [0u8; 4];
        self.insert_str(ch.encode_utf8(&mut buffer));
    }

    /// Inserts at the cursor, flattening newlines and dropping whatever
    /// would exceed the cap.
    pub fn insert_str(&mut self, text: &str) {
        let normalized = normalize_single_line(text);
        if normalized.is_empty() {
            return;
        }

        let room = match self.max_chars {
            Some(max) => max.saturating_sub(self.char_count()),
            None => usize::MAX,
        };
        let inserted: String = normalized.chars().take(room).collect();
        if inserted.is_empty() {
            return;
        }

        self.clamp_cursor();
        let byte_index = char_to_byte_index(&self.text, self.cursor_col);
        self.text.insert_str(byte_index, &inserted);
        self.cursor_col += inserted.chars().count();
    }

    pub fn backspace(&mut self) {
        self.clamp_cursor();
        if self.cursor_col == 0 {
            return;
        }

        let byte_index = char_to_byte_index(&self.text, self.cursor_col - 1);
        self.text.remove(byte_index);
        self.cursor_col -= 1;
    }

    pub fn delete_forward(&mut self) {
        self.clamp_cursor();
        if self.cursor_col >= self.char_count() {
            return;
        }

        let byte_index = char_to_byte_index(&self.text, self.cursor_col);
        self.text.remove(byte_index);
    }

    pub fn move_left(&mut self) {
        self.clamp_cursor();
        self.cursor_col = self.cursor_col.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.clamp_cursor();
        self.cursor_col = (self.cursor_col + 1).min(self.char_count());
    }

    pub fn move_home(&mut self) {
        self.cursor_col = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor_col = self.char_count();
    }

    /// Applies an editing key. Returns false for keys the editor ignores.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        if key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
        {
            return match key.code {
                KeyCode::Char('a') => {
                    self.move_home();
                    true
                }
                KeyCode::Char('e') => {
                    self.move_end();
                    true
                }
                KeyCode::Char('u') => {
                    self.clear();
                    true
                }
                _ => false,
            };
        }

        match key.code {
            KeyCode::Char(ch) => self.insert_char(ch),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete_forward(),
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Home => self.move_home(),
            KeyCode::End => self.move_end(),
            _ => return false,
        }
        true
    }

    fn clamp_cursor(&mut self) {
        self.cursor_col = min(self.cursor_col, self.char_count());
    }
}

fn normalize_single_line(text: &str) -> String {
    let mut out = String::new();
    let mut last_was_space = false;

    for ch in text.chars() {
        let ch = match ch {
            '\n' | '\r' | '\t' => ' ',
            other => other,
        };

        if ch == ' ' {
            if last_was_space {
                continue;
            }
            last_was_space = true;
        } else {
            last_was_space = false;
        }
        out.push(ch);
    }

    out
}

fn char_to_byte_index(text: &str, char_index: usize) -> usize {
    match text.char_indices().nth(char_index) {
        Some((idx, _)) => idx,
        None => text.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn insert_and_backspace_behave_on_unicode() {
        let mut editor = LineEditor::new();
        editor.insert_str("ab");
        editor.insert_char('λ');
        assert_eq!(editor.text, "abλ");
        assert_eq!(editor.cursor_col, 3);
        editor.backspace();
        assert_eq!(editor.text, "ab");
        assert_eq!(editor.cursor_col, 2);
    }

    #[test]
    fn pasted_newlines_are_flattened() {
        let mut editor = LineEditor::new();
        editor.insert_str("slept\n\n7h");
        assert_eq!(editor.text, "slept 7h");
    }

    #[test]
    fn cap_truncates_inserts() {
        let mut editor = LineEditor::with_max_chars(5);
        editor.insert_str("abc");
        editor.insert_str("defgh");
        assert_eq!(editor.text, "abcde");
        editor.insert_char('x');
        assert_eq!(editor.text, "abcde");
        editor.backspace();
        editor.insert_char('ü');
        assert_eq!(editor.text, "abcdü");
    }

    #[test]
    fn handle_key_edits_in_place() {
        let mut editor = LineEditor::new();
        editor.insert_str("ac");
        assert!(editor.handle_key(&key(KeyCode::Left)));
        assert!(editor.handle_key(&key(KeyCode::Char('b'))));
        assert_eq!(editor.text, "abc");
        assert!(editor.handle_key(&key(KeyCode::Home)));
        assert!(editor.handle_key(&key(KeyCode::Delete)));
        assert_eq!(editor.text, "bc");
        assert!(!editor.handle_key(&key(KeyCode::Enter)));
        assert!(editor.handle_key(&KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL)));
        assert_eq!(editor.text, "");
        assert_eq!(editor.cursor_col, 0);
    }
}
