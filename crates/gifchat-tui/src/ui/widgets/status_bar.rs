//! Status bar widget.

use crate::ui::theme::{Palette, Styles};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::Widget,
};
use unicode_width::UnicodeWidthStr;

/// A key hint for the status bar.
#[derive(Debug, Clone)]
pub struct KeyHint {
    pub key: &'static str,
    pub label: &'static str,
}

impl KeyHint {
    pub const fn new(key: &'static str, label: &'static str) -> Self {
        Self { key, label }
    }
}

/// Status bar widget displayed at the bottom of the screen.
#[derive(Debug, Clone)]
pub struct StatusBar<'a> {
    mode: &'a str,
    hints: Vec<KeyHint>,
    right_text: Option<&'a str>,
}

impl<'a> StatusBar<'a> {
    /// Create a new status bar.
    pub fn new(mode: &'a str) -> Self {
        Self {
            mode,
            hints: Vec::new(),
            right_text: None,
        }
    }

    /// Add key hints.
    #[must_use]
    pub fn hints(mut self, hints: Vec<KeyHint>) -> Self {
        self.hints = hints;
        self
    }

    /// Set right-aligned text.
    #[must_use]
    pub fn right(mut self, text: &'a str) -> Self {
        self.right_text = Some(text);
        self
    }
}

impl Widget for StatusBar<'_> {
    #[allow(clippy::cast_possible_truncation)]
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 1 {
            return;
        }

        for x in area.x..area.x.saturating_add(area.width) {
            buf[(x, area.y)].set_char(' ').set_bg(Palette::STATUS_BG);
        }

        let mut spans = vec![
            Span::styled(
                format!(" {} ", self.mode),
                Styles::default().bg(Palette::ACCENT).fg(Palette::BG),
            ),
            Span::styled(" ", Styles::status_bar()),
        ];
        for hint in &self.hints {
            spans.push(Span::styled(format!(" {} ", hint.key), Styles::key_hint()));
            spans.push(Span::styled(
                format!(" {} ", hint.label),
                Styles::key_label(),
            ));
        }

        let left_line = Line::from(spans);
        let (left_end, _) = buf.set_line(area.x, area.y, &left_line, area.width);

        // Right text only if it fits past the hints
        if let Some(text) = self.right_text {
            let text_len = text.width() as u16;
            let right_edge = area.x + area.width;
            if text_len + 1 < area.width && right_edge - text_len - 1 > left_end {
                buf.set_string(right_edge - text_len - 1, area.y, text, Styles::status_bar());
            }
        }
    }
}
