//! Theme and styling definitions for the gifchat TUI.

use ratatui::style::{Color, Modifier, Style};

/// Color palette for the TUI.
pub struct Palette;

impl Palette {
    // Base colors
    pub const BG: Color = Color::Rgb(30, 30, 40);
    pub const FG: Color = Color::Rgb(220, 220, 230);
    pub const DIM: Color = Color::Rgb(140, 140, 160);

    // Accent colors
    pub const ACCENT: Color = Color::Rgb(130, 170, 255);
    pub const PEER: Color = Color::Rgb(200, 160, 240);

    // Status bar colors
    pub const STATUS_BG: Color = Color::Rgb(45, 45, 60);
    pub const STATUS_KEY_BG: Color = Color::Rgb(70, 90, 140);

    // Chat content
    pub const GIF: Color = Color::Rgb(130, 220, 130);
    pub const FAILURE: Color = Color::Rgb(240, 200, 100);

    // Border colors
    pub const BORDER: Color = Color::Rgb(80, 80, 100);
    pub const BORDER_ACTIVE: Color = Color::Rgb(130, 170, 255);
}

/// Common styles used throughout the TUI.
pub struct Styles;

impl Styles {
    /// Default text style.
    pub fn default() -> Style {
        Style::default().fg(Palette::FG).bg(Palette::BG)
    }

    /// Dimmed text for secondary information.
    pub fn dim() -> Style {
        Style::default().fg(Palette::DIM).bg(Palette::BG)
    }

    /// Highlighted/selected item.
    pub fn highlight() -> Style {
        Style::default()
            .fg(Palette::ACCENT)
            .bg(Palette::BG)
            .add_modifier(Modifier::BOLD)
    }

    /// Active/focused element.
    pub fn active() -> Style {
        Style::default().fg(Palette::ACCENT).bg(Palette::BG)
    }

    /// Sender name in a transcript, colored by whose pane is showing it.
    pub fn sender(own: bool) -> Style {
        let fg = if own { Palette::ACCENT } else { Palette::PEER };
        Style::default().fg(fg).add_modifier(Modifier::BOLD)
    }

    /// GIF links.
    pub fn gif() -> Style {
        Style::default().fg(Palette::GIF).bg(Palette::BG)
    }

    /// "X is typing..." line.
    pub fn typing() -> Style {
        Styles::dim().add_modifier(Modifier::ITALIC)
    }

    /// Why a suggestion fetch came back empty.
    pub fn failure() -> Style {
        Style::default().fg(Palette::FAILURE).bg(Palette::BG)
    }

    /// Title style.
    pub fn title() -> Style {
        Style::default()
            .fg(Palette::ACCENT)
            .add_modifier(Modifier::BOLD)
    }

    /// Key hint style (for status bar).
    pub fn key_hint() -> Style {
        Style::default()
            .fg(Palette::FG)
            .bg(Palette::STATUS_KEY_BG)
            .add_modifier(Modifier::BOLD)
    }

    /// Key hint label style.
    pub fn key_label() -> Style {
        Style::default().fg(Palette::FG).bg(Palette::STATUS_BG)
    }

    /// Status bar background style.
    pub fn status_bar() -> Style {
        Style::default().fg(Palette::FG).bg(Palette::STATUS_BG)
    }

    /// Border style for inactive elements.
    pub fn border() -> Style {
        Style::default().fg(Palette::BORDER)
    }

    /// Border style for active/focused elements.
    pub fn border_active() -> Style {
        Style::default().fg(Palette::BORDER_ACTIVE)
    }
}
