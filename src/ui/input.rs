use ratatui::prelude::*;

/// Single-line text field with a cursor counted in characters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    value: String,
    cursor: usize,
}

impl TextInput {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.chars().count();
        Self { value, cursor }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }

    fn byte_index(&self) -> usize {
        self.value
            .char_indices()
            .nth(self.cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    pub fn handle_char(&mut self, c: char) {
        let idx = self.byte_index();
        self.value.insert(idx, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let idx = self.byte_index();
            self.value.remove(idx);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let idx = self.byte_index();
            self.value.remove(idx);
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        if self.cursor < self.value.chars().count() {
            self.cursor += 1;
        }
    }

    pub fn move_cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    /// Text split around a `|` cursor mark when focused
    pub fn spans(&self, focused: bool) -> Vec<Span<'_>> {
        if !focused {
            return vec![Span::raw(self.value.as_str())];
        }
        let (before, after) = self.value.split_at(self.byte_index());
        vec![
            Span::raw(before),
            Span::styled("|", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::raw(after),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_with_umlauts() {
        let mut input = TextInput::new("Küche");
        input.backspace();
        assert_eq!(input.value(), "Küch");

        input.move_cursor_home();
        input.move_cursor_right();
        input.delete();
        assert_eq!(input.value(), "Kch");

        input.handle_char('ü');
        input.move_cursor_end();
        input.handle_char('e');
        assert_eq!(input.value(), "Küche");
    }

    #[test]
    fn test_cursor_bounds() {
        let mut input = TextInput::default();
        input.backspace();
        input.delete();
        input.move_cursor_left();
        input.move_cursor_right();
        assert_eq!(input.value(), "");

        input.handle_char('a');
        input.move_cursor_end();
        input.move_cursor_right();
        input.handle_char('b');
        assert_eq!(input.value(), "ab");
        assert!(!input.is_blank());
    }
}
