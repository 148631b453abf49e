//! The two-pane chat screen.

use super::Screen;
use crate::app::{App, InputField};
use crate::ui::{
    main_layout, pane_columns, pane_layout, KeyHint, StatusBar, Styles, TextInput,
};
use gifchat_engine::{Message, MessageKind, PaneController, PartyId, SuggestionMode};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Both conversation panes side by side, with the status bar below.
pub struct ChatScreen;

impl Screen for ChatScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        let (body, status_area) = main_layout(area);
        let columns = pane_columns(body);
        for party in PartyId::ALL {
            render_pane(app, party, columns[party.index()], buf);
        }

        let connection = app.connection_label();
        StatusBar::new("GIFCHAT")
            .hints(vec![
                KeyHint::new("Tab", "pane"),
                KeyHint::new("^G", "GIFs"),
                KeyHint::new("^T", "mode"),
                KeyHint::new("F1", "help"),
                KeyHint::new("^C", "quit"),
            ])
            .right(&connection)
            .render(status_area, buf);
    }
}

fn render_pane(app: &App, party: PartyId, area: Rect, buf: &mut Buffer) {
    let pane = app.session.pane(party);
    let focused = app.focus == party;

    let block = Block::default()
        .title(format!(" {} ", pane.username()))
        .title_style(if focused {
            Styles::title()
        } else {
            Styles::dim()
        })
        .borders(Borders::ALL)
        .border_style(if focused {
            Styles::border_active()
        } else {
            Styles::border()
        })
        .style(Styles::default());
    let inner = block.inner(area);
    block.render(area, buf);
    if inner.height < 3 || inner.width < 4 {
        return;
    }

    let panel = pane.panel();
    let panel_height = panel.is_open().then(|| panel_height(pane, inner.height));
    let searching = panel.mode() == Some(SuggestionMode::Search);
    let areas = pane_layout(inner, panel_height, searching);

    render_history(app, party, areas.history, buf);

    if pane.is_peer_typing(app.now) {
        let peer = app.session.config().party_name(party.peer());
        Paragraph::new(Line::styled(format!("{peer} is typing..."), Styles::typing()))
            .render(areas.typing, buf);
    }

    if let Some(panel_area) = areas.panel {
        render_panel(pane, app.selected(party), panel_area, buf);
    }

    if let Some(search_area) = areas.search {
        TextInput::new(app.search(party))
            .prompt("search> ")
            .placeholder("Search GIFs")
            .focused(focused && app.field == InputField::Search)
            .render(search_area, buf);
    }

    TextInput::new(app.draft(party))
        .placeholder("Type a message")
        .focused(focused && app.field == InputField::Draft)
        .render(areas.draft, buf);
}

/// Rows for the suggestion panel: borders, one row per candidate, one for diagnostics.
#[allow(clippy::cast_possible_truncation)]
fn panel_height(pane: &PaneController, available: u16) -> u16 {
    let rows = pane.policy().max_suggestions.min(usize::from(u16::MAX - 3)) as u16;
    (rows + 3).min(available / 2).max(3)
}

fn render_history(app: &App, party: PartyId, area: Rect, buf: &mut Buffer) {
    let width = usize::from(area.width).max(1);
    let mut lines: Vec<Line<'_>> = Vec::new();

    for message in app.session.history(party) {
        lines.extend(message_lines(app, party, message, width));
    }

    // Newest messages stay on screen
    let skip = lines.len().saturating_sub(usize::from(area.height));
    Paragraph::new(lines.split_off(skip))
        .style(Styles::default())
        .render(area, buf);
}

fn message_lines(app: &App, pane: PartyId, message: &Message, width: usize) -> Vec<Line<'static>> {
    let name = app.session.config().party_name(message.sender()).to_string();
    let name_style = Styles::sender(message.is_from(pane));
    let (body, body_style) = match message.kind() {
        MessageKind::Text => (message.content().to_string(), Styles::default()),
        MessageKind::Gif => (format!("[GIF] {}", message.content()), Styles::gif()),
    };

    let prefix = format!("{name}: ");
    let indent = " ".repeat(prefix.width().min(width / 2));
    let options = textwrap::Options::new(width)
        .initial_indent(&prefix)
        .subsequent_indent(&indent);

    textwrap::wrap(&body, options)
        .into_iter()
        .enumerate()
        .map(|(i, wrapped)| {
            let text = wrapped.into_owned();
            if i == 0 {
                let rest = text.get(prefix.len()..).unwrap_or_default().to_string();
                Line::from(vec![
                    Span::styled(prefix.clone(), name_style),
                    Span::styled(rest, body_style),
                ])
            } else {
                Line::styled(text, body_style)
            }
        })
        .collect()
}

fn render_panel(pane: &PaneController, selected: Option<usize>, area: Rect, buf: &mut Buffer) {
    let panel = pane.panel();
    let mut title = match panel.mode() {
        Some(SuggestionMode::Search) => " GIF search ".to_string(),
        _ => " GIF replies ".to_string(),
    };
    if panel.is_loading() {
        title.push_str("(loading) ");
    }

    let block = Block::default()
        .title(title)
        .title_style(Styles::title())
        .borders(Borders::ALL)
        .border_style(Styles::border_active())
        .style(Styles::default());
    let inner = block.inner(area);
    block.render(area, buf);

    let width = usize::from(inner.width);
    let candidates = pane.visible_candidates();
    let mut lines = Vec::new();

    if candidates.is_empty() {
        if panel.is_loading() {
            lines.push(Line::styled("Loading...", Styles::dim()));
        } else {
            lines.push(Line::styled("No GIFs found", Styles::dim()));
            if let Some(failure) = pane.last_failure() {
                lines.push(Line::styled(truncate_to_width(failure, width), Styles::failure()));
            }
        }
    }

    for (i, gif) in candidates.iter().enumerate() {
        let is_selected = selected == Some(i);
        let marker = if is_selected { "> " } else { "  " };
        let label = format!("{marker}{}. {}  {}", i + 1, gif.display_title(), gif.url);
        let style = if is_selected {
            Styles::highlight()
        } else {
            Styles::default()
        };
        lines.push(Line::styled(truncate_to_width(&label, width), style));
    }

    if let Some(info) = pane.debug_info() {
        if !info.search_query.is_empty() {
            lines.push(Line::styled(
                truncate_to_width(&format!("query: {}", info.search_query), width),
                Styles::dim(),
            ));
        }
    }

    Paragraph::new(lines).render(inner, buf);
}

/// Cut `text` to at most `width` display columns.
fn truncate_to_width(text: &str, width: usize) -> String {
    let mut used = 0;
    let mut out = String::new();
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        out.push(ch);
    }
    out
}
