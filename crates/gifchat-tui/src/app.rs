//! Application state for the gifchat TUI.

use crate::event::{key_to_action, Action};
use crate::ui::TextInputState;
use crossterm::event::KeyEvent;
use gifchat_engine::{
    ChatSession, Config, FetchCompletion, FetchRequest, PartyId, Resolution, SharedTransport,
    SuggestionMode, TransportError,
};
use tokio::time::Instant;

/// Which input of the focused pane receives typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputField {
    #[default]
    Draft,
    Search,
}

/// Terminal-side state for one pane.
#[derive(Debug, Default)]
struct PaneInputs {
    draft: TextInputState,
    search: TextInputState,
    /// Highlighted GIF candidate, if the user has moved into the list.
    selected: Option<usize>,
}

/// Main application state.
#[derive(Debug)]
pub struct App {
    /// The conversation engine.
    pub session: ChatSession,
    /// Pane receiving keyboard input.
    pub focus: PartyId,
    /// Input field receiving typing within the focused pane.
    pub field: InputField,
    inputs: [PaneInputs; 2],
    /// Clock reading used for timers and rendering.
    pub now: Instant,
    /// Whether to show the help overlay.
    pub show_help: bool,
    /// Whether the app should quit.
    pub should_quit: bool,
}

impl App {
    /// Create an app whose panes share an in-process store.
    pub fn new(config: &Config) -> Self {
        Self::from_session(ChatSession::new(config))
    }

    /// Create an app whose panes exchange messages through `transports`.
    pub fn with_transports(
        config: &Config,
        transports: [SharedTransport; 2],
    ) -> Result<Self, TransportError> {
        Ok(Self::from_session(ChatSession::with_transports(
            config, transports,
        )?))
    }

    fn from_session(session: ChatSession) -> Self {
        Self {
            session,
            focus: PartyId::First,
            field: InputField::Draft,
            inputs: Default::default(),
            now: Instant::now(),
            show_help: false,
            should_quit: false,
        }
    }

    pub fn draft(&self, party: PartyId) -> &TextInputState {
        &self.inputs[party.index()].draft
    }

    pub fn search(&self, party: PartyId) -> &TextInputState {
        &self.inputs[party.index()].search
    }

    pub fn selected(&self, party: PartyId) -> Option<usize> {
        self.inputs[party.index()].selected
    }

    /// Where the conversation is carried, for the status bar.
    pub fn connection_label(&self) -> String {
        if self.session.is_connected() {
            match self.session.dropped_events() {
                0 => "relay".to_string(),
                n => format!("relay ({n} dropped)"),
            }
        } else {
            self.session.config().backend.base_url.clone()
        }
    }

    /// Handle a key press. Returns any fetches to start.
    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Vec<FetchRequest> {
        self.now = now;
        if self.show_help {
            self.show_help = false;
            return Vec::new();
        }
        let requests = self.handle_action(key_to_action(key), now);
        self.sync_inputs();
        requests
    }

    /// Advance the clock: fire due timers and drain the transport.
    pub fn tick(&mut self, now: Instant) -> Vec<FetchRequest> {
        self.now = now;
        let requests = self.session.poll_timers(now);
        if self.session.pump_transport(now) > 0 {
            self.sync_inputs();
        }
        requests
    }

    /// Apply a finished fetch to its pane.
    pub fn on_completion(&mut self, completion: FetchCompletion) -> Resolution {
        let pane = completion.ticket.pane;
        let resolution = self.session.apply_fetch(completion);
        if resolution == Resolution::Current {
            self.inputs[pane.index()].selected = None;
        }
        resolution
    }

    fn handle_action(&mut self, action: Action, now: Instant) -> Vec<FetchRequest> {
        let party = self.focus;
        let request = match action {
            Action::Quit => {
                self.should_quit = true;
                None
            }
            Action::Help => {
                self.show_help = true;
                None
            }
            Action::SwitchPane => {
                self.focus = party.peer();
                self.field = InputField::Draft;
                None
            }
            Action::TogglePanel => {
                self.inputs[party.index()].selected = None;
                self.session.toggle_panel(party)
            }
            Action::ToggleMode => {
                let mode = match self.session.pane(party).panel().mode() {
                    Some(SuggestionMode::Reply) => SuggestionMode::Search,
                    Some(SuggestionMode::Search) => SuggestionMode::Reply,
                    None => return Vec::new(),
                };
                self.inputs[party.index()].selected = None;
                self.session.set_mode(party, mode)
            }
            Action::ToggleField => {
                if self.session.pane(party).panel().mode() == Some(SuggestionMode::Search) {
                    self.field = match self.field {
                        InputField::Draft => InputField::Search,
                        InputField::Search => InputField::Draft,
                    };
                }
                None
            }
            Action::Back => {
                self.session.close_panel(party);
                None
            }
            Action::Submit => self.submit(),
            Action::Up => {
                self.move_selection(false);
                None
            }
            Action::Down => {
                self.move_selection(true);
                None
            }
            Action::Left => {
                self.active_input().move_left();
                None
            }
            Action::Right => {
                self.active_input().move_right();
                None
            }
            Action::Home => {
                self.active_input().move_home();
                None
            }
            Action::End => {
                self.active_input().move_end();
                None
            }
            Action::Backspace => {
                if self.active_input().backspace() {
                    self.push_edit(now);
                }
                None
            }
            Action::Delete => {
                if self.active_input().delete() {
                    self.push_edit(now);
                }
                None
            }
            Action::Input(ch) => {
                self.active_input().insert(ch);
                self.push_edit(now);
                None
            }
            Action::None => None,
        };
        request.into_iter().collect()
    }

    fn active_input(&mut self) -> &mut TextInputState {
        let inputs = &mut self.inputs[self.focus.index()];
        match self.field {
            InputField::Draft => &mut inputs.draft,
            InputField::Search => &mut inputs.search,
        }
    }

    fn push_edit(&mut self, now: Instant) {
        let party = self.focus;
        let inputs = &self.inputs[party.index()];
        match self.field {
            InputField::Draft => {
                let text = inputs.draft.content().to_string();
                self.session.edit_draft(party, text, now);
            }
            InputField::Search => {
                let text = inputs.search.content().to_string();
                self.session.edit_search(party, text, now);
            }
        }
    }

    fn submit(&mut self) -> Option<FetchRequest> {
        let party = self.focus;
        if self.field == InputField::Search {
            return self.session.submit_search(party);
        }
        if let Some(index) = self.inputs[party.index()].selected.take() {
            if self.session.pick_candidate(party, index).is_some() {
                return None;
            }
        }
        self.session.send_text(party);
        None
    }

    fn move_selection(&mut self, down: bool) {
        let party = self.focus;
        let len = self.session.pane(party).visible_candidates().len();
        let selected = &mut self.inputs[party.index()].selected;
        if len == 0 {
            *selected = None;
            return;
        }
        *selected = match (*selected, down) {
            (None, true) => Some(0),
            (None, false) => Some(len - 1),
            (Some(i), true) => Some((i + 1).min(len - 1)),
            (Some(0), false) => None,
            (Some(i), false) => Some(i - 1),
        };
    }

    /// Pull engine-owned text back into the inputs after sends and mode changes.
    fn sync_inputs(&mut self) {
        for party in PartyId::ALL {
            let pane = self.session.pane(party);
            let inputs = &mut self.inputs[party.index()];
            if inputs.draft.content() != pane.draft() {
                inputs.draft.set(pane.draft());
            }
            if inputs.search.content() != pane.search_text() {
                inputs.search.set(pane.search_text());
            }
            let shown = pane.visible_candidates().len();
            if !pane.panel().is_open() || inputs.selected.is_some_and(|i| i >= shown) {
                inputs.selected = None;
            }
        }
        if self.session.pane(self.focus).panel().mode() != Some(SuggestionMode::Search) {
            self.field = InputField::Draft;
        }
    }
}
