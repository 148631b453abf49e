//! Layout helpers for the gifchat TUI.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Create a centered rect with fixed dimensions.
pub fn centered_fixed(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

/// Create the main layout with status bar at bottom.
pub fn main_layout(area: Rect) -> (Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);
    (chunks[0], chunks[1])
}

/// Split the body into the two side-by-side conversation panes.
pub fn pane_columns(area: Rect) -> [Rect; 2] {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    [chunks[0], chunks[1]]
}

/// Regions inside one conversation pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneAreas {
    pub history: Rect,
    pub typing: Rect,
    pub panel: Option<Rect>,
    pub search: Option<Rect>,
    pub draft: Rect,
}

/// Stack history, typing line, optional GIF panel and search box, and the draft input.
pub fn pane_layout(area: Rect, panel_height: Option<u16>, search: bool) -> PaneAreas {
    let mut constraints = vec![Constraint::Min(1), Constraint::Length(1)];
    if let Some(height) = panel_height {
        constraints.push(Constraint::Length(height));
    }
    if search {
        constraints.push(Constraint::Length(1));
    }
    constraints.push(Constraint::Length(1));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    let draft = chunks[chunks.len() - 1];
    let mut middle = chunks[2..chunks.len() - 1].iter().copied();
    let panel = panel_height.and_then(|_| middle.next());
    let search = if search { middle.next() } else { None };
    PaneAreas {
        history: chunks[0],
        typing: chunks[1],
        panel,
        search,
        draft,
    }
}
