//! gifchat-tui: Terminal UI for the two-pane GIF chat
//!
//! This crate renders both conversation panes side by side and drives the
//! engine's [`ChatSession`](gifchat_engine::ChatSession):
//! - Keyboard input is mapped to pane intents
//! - Suggestion fetches run in the background and are applied as they finish
//! - Debounce and typing timers fire from the event loop

mod app;
mod event;
mod screens;
#[cfg(test)]
pub mod test_utils;
mod ui;

use screens::Screen as ScreenTrait;

pub use app::{App, InputField};
pub use event::{Action, Event, EventHandler};
pub use gifchat_engine;

use crossterm::{
    cursor::Show as ShowCursor,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use gifchat_engine::{
    Config, FetchCompletion, FetchDispatcher, LocalRelay, SharedTransport, SuggestionClient,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, stdout};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::info;

/// RAII guard for terminal state restoration.
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(stdout(), LeaveAlternateScreen, ShowCursor);
    }
}

/// How the two panes exchange messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delivery {
    /// Both panes share the in-process store.
    #[default]
    Local,
    /// Each pane connects to an in-process relay, as it would to a chat server.
    Relay,
}

/// Run the TUI application.
///
/// Sets up the terminal, runs the event loop, and restores the terminal on exit.
pub async fn run_tui(config: Config, delivery: Delivery) -> Result<(), Box<dyn std::error::Error>> {
    let client = SuggestionClient::new(&config.backend)?;
    let mut app = match delivery {
        Delivery::Local => App::new(&config),
        Delivery::Relay => {
            let relay = LocalRelay::new();
            let transports: [SharedTransport; 2] =
                [Arc::new(relay.connect()), Arc::new(relay.connect())];
            App::with_transports(&config, transports)?
        }
    };
    info!(backend = %client.base_url(), ?delivery, "Starting chat UI");

    enable_raw_mode()?;
    let _guard = TerminalGuard;

    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (dispatcher, mut completions) = FetchDispatcher::new(client);
    // 4 Hz tick keeps the relay and typing indicators moving while idle
    let mut events = EventHandler::new(250);

    let result = run_loop(&mut terminal, &mut app, &mut events, &dispatcher, &mut completions).await;

    app.session.shutdown();
    terminal.show_cursor()?;
    result
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &mut EventHandler,
    dispatcher: &FetchDispatcher,
    completions: &mut mpsc::UnboundedReceiver<FetchCompletion>,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|frame| {
            let area = frame.area();
            let buf = frame.buffer_mut();
            screens::chat::ChatScreen.render(app, area, buf);
            if app.show_help {
                screens::render_help_overlay(area, buf);
            }
        })?;

        let deadline = app.session.next_deadline();
        tokio::select! {
            event = events.next() => match event {
                Some(Event::Key(key)) => {
                    let requests = app.handle_key(key, Instant::now());
                    dispatcher.dispatch_all(requests);
                }
                Some(Event::Tick | Event::Resize(_, _)) => {}
                None => break,
            },
            Some(completion) = completions.recv() => {
                app.on_completion(completion);
            }
            () = sleep_until(deadline) => {}
        }

        dispatcher.dispatch_all(app.tick(Instant::now()));

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Sleep until `deadline`, or forever when there is none.
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
