//! Test utilities for gifchat-tui rendering tests.

use crate::app::App;
use crate::screens::Screen as ScreenTrait;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use gifchat_engine::Config;
use ratatui::{buffer::Buffer, layout::Rect};

/// Default terminal width for tests.
pub const TEST_WIDTH: u16 = 80;

/// Default terminal height for tests.
pub const TEST_HEIGHT: u16 = 24;

/// Create a local-mode app with the default configuration.
pub fn create_test_app() -> App {
    App::new(&Config::default())
}

/// Type `text` into the focused pane's input and press Enter.
pub fn type_line(app: &mut App, text: &str) {
    let now = app.now;
    for ch in text.chars() {
        app.handle_key(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::NONE), now);
    }
    app.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE), now);
}

/// Convert a buffer to a string, one line per row with trailing spaces trimmed.
pub fn buffer_to_string(buffer: &Buffer) -> String {
    let area = buffer.area;
    let mut result = String::new();

    for y in area.y..area.y + area.height {
        for x in area.x..area.x + area.width {
            if let Some(cell) = buffer.cell((x, y)) {
                result.push_str(cell.symbol());
            }
        }
        while result.ends_with(' ') {
            result.pop();
        }
        result.push('\n');
    }

    if result.ends_with('\n') {
        result.pop();
    }

    result
}

/// Render a screen to a buffer and return it as a string.
pub fn render_screen_to_string<S: ScreenTrait>(screen: &S, app: &App) -> String {
    let area = Rect::new(0, 0, TEST_WIDTH, TEST_HEIGHT);
    let mut buffer = Buffer::empty(area);
    screen.render(app, area, &mut buffer);
    buffer_to_string(&buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_to_string() {
        let area = Rect::new(0, 0, 10, 3);
        let mut buffer = Buffer::empty(area);
        buffer.set_string(0, 0, "Hello", ratatui::style::Style::default());
        buffer.set_string(0, 1, "World", ratatui::style::Style::default());

        assert_eq!(buffer_to_string(&buffer), "Hello\nWorld\n");
    }

    #[test]
    fn test_type_line_sends_message() {
        let mut app = create_test_app();
        type_line(&mut app, "hi");
        assert_eq!(app.session.store().len(), 1);
    }
}
