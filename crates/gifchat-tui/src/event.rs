//! Event handling for the gifchat TUI.

use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;
use tokio::sync::mpsc;

/// Events that can occur in the TUI.
#[derive(Debug, Clone)]
pub enum Event {
    /// A key was pressed.
    Key(KeyEvent),
    /// A tick event for UI updates.
    Tick,
    /// Terminal was resized.
    Resize(u16, u16),
}

/// Event handler that runs in a background thread.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    _tx: mpsc::UnboundedSender<Event>,
}

impl EventHandler {
    /// Create a new event handler with the specified tick rate.
    pub fn new(tick_rate_ms: u64) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let tx_clone = tx.clone();

        // crossterm polling blocks, so it gets its own thread
        std::thread::spawn(move || {
            let tick_rate = Duration::from_millis(tick_rate_ms);
            loop {
                let event = if event::poll(tick_rate).unwrap_or(false) {
                    match event::read() {
                        Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                            Some(Event::Key(key))
                        }
                        Ok(CrosstermEvent::Resize(w, h)) => Some(Event::Resize(w, h)),
                        _ => None,
                    }
                } else {
                    Some(Event::Tick)
                };
                if let Some(e) = event {
                    if tx_clone.send(e).is_err() {
                        break;
                    }
                }
            }
        });

        Self { rx, _tx: tx }
    }

    /// Get the next event, waiting until one is available.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

/// What a key press means in the chat screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Help,
    /// Move focus to the other participant's pane.
    SwitchPane,
    /// Open or close the GIF panel.
    TogglePanel,
    /// Flip the open panel between reply and search.
    ToggleMode,
    /// Move typing between the draft and the search box.
    ToggleField,
    /// Close the panel.
    Back,
    /// Send, pick or search, depending on focus.
    Submit,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    Backspace,
    Delete,
    Input(char),
    None,
}

/// Convert a key event to an action.
pub fn key_to_action(key: KeyEvent) -> Action {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c' | 'q') => Action::Quit,
            KeyCode::Char('g') => Action::TogglePanel,
            KeyCode::Char('t') => Action::ToggleMode,
            KeyCode::Char('f') => Action::ToggleField,
            _ => Action::None,
        };
    }

    match key.code {
        KeyCode::F(1) => Action::Help,
        KeyCode::Tab | KeyCode::BackTab => Action::SwitchPane,
        KeyCode::Esc => Action::Back,
        KeyCode::Enter => Action::Submit,
        KeyCode::Up => Action::Up,
        KeyCode::Down => Action::Down,
        KeyCode::Left => Action::Left,
        KeyCode::Right => Action::Right,
        KeyCode::Home => Action::Home,
        KeyCode::End => Action::End,
        KeyCode::Backspace => Action::Backspace,
        KeyCode::Delete => Action::Delete,
        KeyCode::Char(ch) => Action::Input(ch),
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    #[test]
    fn test_control_keys() {
        assert_eq!(key_to_action(ctrl('c')), Action::Quit);
        assert_eq!(key_to_action(ctrl('g')), Action::TogglePanel);
        assert_eq!(key_to_action(ctrl('t')), Action::ToggleMode);
        assert_eq!(key_to_action(ctrl('f')), Action::ToggleField);
        assert_eq!(key_to_action(ctrl('z')), Action::None);
    }

    #[test]
    fn test_plain_characters_are_input() {
        assert_eq!(key_to_action(key(KeyCode::Char('q'))), Action::Input('q'));
        assert_eq!(
            key_to_action(KeyEvent::new(KeyCode::Char('Q'), KeyModifiers::SHIFT)),
            Action::Input('Q')
        );
        assert_eq!(key_to_action(key(KeyCode::Enter)), Action::Submit);
        assert_eq!(key_to_action(key(KeyCode::Tab)), Action::SwitchPane);
        assert_eq!(key_to_action(key(KeyCode::F(1))), Action::Help);
    }
}
