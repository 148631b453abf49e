//! Screen definitions for the gifchat TUI.

pub mod chat;

use crate::app::App;
use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};

/// Trait for screens that can be rendered.
pub trait Screen {
    /// Render the screen to the buffer.
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer);
}

/// Render the help overlay.
pub fn render_help_overlay(area: Rect, buf: &mut Buffer) {
    use crate::ui::centered_fixed;
    use crate::ui::theme::Styles;
    use ratatui::widgets::{Block, Borders, Clear, Paragraph};

    let help_text = r"
  Tab           Switch pane
  Ctrl+G        Open/close GIF suggestions
  Ctrl+T        Reply / search mode
  Ctrl+F        Type in search box
  Up/Down       Choose a GIF
  Enter         Send message or chosen GIF
  Esc           Close suggestions
  Ctrl+C        Quit

  [Press any key to close]
";

    let width = 50.min(area.width.saturating_sub(4));
    let height = 14.min(area.height.saturating_sub(4));
    let overlay_area = centered_fixed(width, height, area);

    Clear.render(overlay_area, buf);

    let block = Block::default()
        .title(" Help ")
        .title_style(Styles::title())
        .borders(Borders::ALL)
        .border_style(Styles::border_active())
        .style(Styles::default());

    Paragraph::new(help_text)
        .block(block)
        .style(Styles::default())
        .render(overlay_area, buf);
}
