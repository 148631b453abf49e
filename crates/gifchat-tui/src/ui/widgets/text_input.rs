//! Single-line text input widget.

use crate::ui::theme::Styles;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use unicode_width::UnicodeWidthStr;

/// A single-line text input.
///
/// Long content scrolls so the cursor stays visible.
#[derive(Debug, Clone)]
pub struct TextInput<'a> {
    state: &'a TextInputState,
    focused: bool,
    placeholder: Option<&'a str>,
    prompt: &'a str,
}

impl<'a> TextInput<'a> {
    pub fn new(state: &'a TextInputState) -> Self {
        Self {
            state,
            focused: true,
            placeholder: None,
            prompt: "> ",
        }
    }

    /// Set focus state.
    #[must_use]
    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    /// Set placeholder text.
    #[must_use]
    pub fn placeholder(mut self, placeholder: &'a str) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    /// Set the prompt prefix.
    #[must_use]
    pub fn prompt(mut self, prompt: &'a str) -> Self {
        self.prompt = prompt;
        self
    }
}

impl Widget for TextInput<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 1 || area.width < 1 {
            return;
        }

        let prompt_style = if self.focused {
            Styles::active()
        } else {
            Styles::dim()
        };
        let mut spans = vec![Span::styled(self.prompt, prompt_style)];

        if self.state.is_empty() {
            if self.focused {
                spans.push(Span::styled("_", Styles::active()));
            }
            if let Some(placeholder) = self.placeholder {
                spans.push(Span::styled(placeholder, Styles::dim()));
            }
            Paragraph::new(Line::from(spans)).render(area, buf);
            return;
        }

        let (before, after) = self.state.split_at_cursor();
        // Keep the cursor in view by dropping leading characters
        let room = usize::from(area.width).saturating_sub(self.prompt.width() + 1);
        let mut visible_before = before;
        while visible_before.width() > room {
            let mut chars = visible_before.chars();
            chars.next();
            visible_before = chars.as_str();
        }

        spans.push(Span::styled(visible_before, Styles::default()));
        if self.focused {
            spans.push(Span::styled(
                if after.is_empty() { "_" } else { "|" },
                Styles::active(),
            ));
        }
        spans.push(Span::styled(after, Styles::default()));
        Paragraph::new(Line::from(spans)).render(area, buf);
    }
}

/// Content and cursor of a text input. The cursor counts characters, not bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInputState {
    content: String,
    cursor: usize,
}

impl TextInputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    fn byte_index(&self, cursor: usize) -> usize {
        self.content
            .char_indices()
            .nth(cursor)
            .map_or(self.content.len(), |(i, _)| i)
    }

    fn split_at_cursor(&self) -> (&str, &str) {
        self.content.split_at(self.byte_index(self.cursor))
    }

    /// Replace the content, leaving the cursor at the end.
    pub fn set(&mut self, content: &str) {
        self.content = content.to_string();
        self.cursor = self.char_count();
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
    }

    /// Insert a character at the cursor position.
    pub fn insert(&mut self, ch: char) {
        let at = self.byte_index(self.cursor);
        self.content.insert(at, ch);
        self.cursor += 1;
    }

    /// Delete the character before the cursor (backspace).
    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.content.remove(at);
        true
    }

    /// Delete the character at the cursor (delete).
    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.char_count() {
            return false;
        }
        let at = self.byte_index(self.cursor);
        self.content.remove(at);
        true
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.char_count() {
            self.cursor += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.char_count();
    }
}
