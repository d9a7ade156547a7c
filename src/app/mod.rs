use std::io::Stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::ListState;
use ratatui::Terminal;

use crate::api::{HttpNotesApi, NoteId};
use crate::config::AppConfig;
use crate::ui;

mod actions;
mod draft;
mod list;
mod selection;
mod session;

pub use actions::{
    ActionDispatcher, ApiCall, ApiReply, Completion, Outbound, Purpose, RequestId, Ticket,
};
pub use draft::{Draft, DraftField, TextBuffer};
pub use list::{ListController, ListOutcome};
pub use selection::{FetchOutcome, SelectionController, SelectionPhase};
pub use session::{
    NotesSession, CREATE_FAILED, DELETE_FAILED, LOAD_NOTES_FAILED, LOAD_NOTE_FAILED,
    NEW_NOTE_TITLE, SAVE_FAILED,
};

enum Action {
    Quit,
    CursorDown,
    CursorUp,
    Open,
    Deselect,
    CreateNew,
    NewDraft,
    Edit,
    Delete,
    Refresh,
    StartSearch,
}

pub struct App {
    pub config: Arc<AppConfig>,
    session: NotesSession,
    dispatcher: ActionDispatcher,
    list_state: ListState,
    cursor: usize,
    followed_selection: Option<NoteId>,
    search_active: bool,
    status_message: Option<String>,
    should_quit: bool,
    tick_rate: Duration,
}

impl App {
    pub fn new(config: Arc<AppConfig>) -> Result<Self> {
        let api = HttpNotesApi::new(&config.api.base_url)
            .with_context(|| format!("connecting to {}", config.api.base_url))?;
        let dispatcher = ActionDispatcher::spawn(api).context("starting network runtime")?;
        let tick_rate = config.ui.tick_rate();
        let mut app = Self {
            config,
            session: NotesSession::new(),
            dispatcher,
            list_state: ListState::default(),
            cursor: 0,
            followed_selection: None,
            search_active: false,
            status_message: None,
            should_quit: false,
            tick_rate,
        };
        app.session.refresh();
        app.flush();
        Ok(app)
    }

    pub fn session(&self) -> &NotesSession {
        &self.session
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        loop {
            self.pump_completions();

            terminal
                .draw(|frame| {
                    if self.session.summaries().is_empty() {
                        self.list_state.select(None);
                    } else {
                        self.list_state.select(Some(self.cursor));
                    }
                    let view = ui::View {
                        session: &self.session,
                        base_url: &self.config.api.base_url,
                        search_active: self.search_active,
                        snippet_chars: self.config.ui.snippet_chars,
                        status_message: self.status_message.as_deref(),
                    };
                    ui::draw_app(frame, &view, &mut self.list_state);
                })
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            let timeout = self
                .tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(0));

            if event::poll(timeout).context("polling for terminal events")? {
                match event::read().context("reading terminal event")? {
                    Event::Key(key) => self.handle_key(key),
                    // resize needs no handling; the next draw adapts
                    _ => {}
                }
            }

            if last_tick.elapsed() >= self.tick_rate {
                last_tick = Instant::now();
            }
        }
        Ok(())
    }

    fn pump_completions(&mut self) {
        while let Some(completion) = self.dispatcher.try_recv() {
            self.session.apply(completion);
        }
        self.flush();
        self.sync_cursor();
    }

    fn flush(&mut self) {
        self.dispatcher.submit_all(self.session.take_outbound());
    }

    /// Moves the list cursor onto a newly selected note, and keeps it in range.
    fn sync_cursor(&mut self) {
        let selected = self.session.selected_id().cloned();
        if selected != self.followed_selection {
            if let Some(id) = &selected {
                if let Some(pos) = self.session.summaries().iter().position(|s| &s.id == id) {
                    self.cursor = pos;
                    self.followed_selection = selected;
                }
            } else {
                self.followed_selection = None;
            }
        }
        let len = self.session.summaries().len();
        if len == 0 {
            self.cursor = 0;
        } else if self.cursor >= len {
            self.cursor = len - 1;
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        self.status_message = None;

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        if self.session.pending_delete().is_some() {
            self.handle_delete_key(key);
        } else if self.session.is_editing() {
            self.handle_editor_key(key);
        } else if self.search_active {
            self.handle_search_key(key);
        } else if let Some(action) = map_key(key) {
            self.handle_action(action);
        }
        self.flush();
        self.sync_cursor();
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::CursorDown => {
                let len = self.session.summaries().len();
                if self.cursor + 1 < len {
                    self.cursor += 1;
                }
            }
            Action::CursorUp => self.cursor = self.cursor.saturating_sub(1),
            Action::Open => match self.session.summaries().get(self.cursor) {
                Some(summary) => {
                    let id = summary.id.clone();
                    self.followed_selection = Some(id.clone());
                    self.session.select(Some(id));
                }
                None => self.set_status_message("No note under the cursor"),
            },
            Action::Deselect => self.session.select(None),
            Action::CreateNew => self.session.create_new(),
            Action::NewDraft => {
                if self.session.selected_id().is_some() {
                    self.session.select(None);
                }
                if self.session.begin_edit() {
                    self.set_status_message("New note: Tab switches fields, Ctrl-s saves");
                }
            }
            Action::Edit => {
                if self.session.phase() == SelectionPhase::Viewing && self.session.begin_edit() {
                    self.set_status_message("Editing: Tab switches fields, Ctrl-s saves");
                } else {
                    self.set_status_message("Open a note before editing");
                }
            }
            Action::Delete => {
                let target = self.session.selected_id().cloned().or_else(|| {
                    self.session
                        .summaries()
                        .get(self.cursor)
                        .map(|summary| summary.id.clone())
                });
                match target {
                    Some(id) => self.session.request_delete(id),
                    None => self.set_status_message("No note selected"),
                }
            }
            Action::Refresh => self.session.refresh(),
            Action::StartSearch => self.search_active = true,
        }
    }

    fn handle_delete_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                self.session.resolve_delete(true);
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.session.resolve_delete(false);
                self.set_status_message("Delete canceled");
            }
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.search_active = false;
                if !self.session.query().is_empty() {
                    self.session.set_query("");
                }
            }
            KeyCode::Enter => self.search_active = false,
            KeyCode::Backspace => {
                let mut query = self.session.query().to_string();
                if query.pop().is_some() {
                    self.session.set_query(query);
                }
            }
            KeyCode::Char(ch) if !has_command_modifier(key) => {
                let query = format!("{}{ch}", self.session.query());
                self.session.set_query(query);
            }
            _ => {}
        }
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if key.code == KeyCode::Char('s') && !self.session.save() {
                self.set_status_message("Save already in progress");
            }
            return;
        }

        match key.code {
            KeyCode::Esc => {
                if self.session.cancel_edit() {
                    self.set_status_message("Edit canceled");
                }
                return;
            }
            KeyCode::Tab | KeyCode::BackTab => {
                if let Some(draft) = self.session.draft_mut() {
                    draft.toggle_focus();
                }
                return;
            }
            _ => {}
        }

        let Some(draft) = self.session.draft_mut() else {
            return;
        };
        if key.code == KeyCode::Enter && draft.focus() == DraftField::Title {
            draft.focus_field(DraftField::Content);
            return;
        }
        let buffer = draft.active_mut();
        match key.code {
            KeyCode::Enter => buffer.insert_char('\n'),
            KeyCode::Backspace => buffer.backspace(),
            KeyCode::Delete => buffer.delete(),
            KeyCode::Left => buffer.move_left(),
            KeyCode::Right => buffer.move_right(),
            KeyCode::Up => buffer.move_up(),
            KeyCode::Down => buffer.move_down(),
            KeyCode::Home => buffer.move_home(),
            KeyCode::End => buffer.move_end(),
            KeyCode::Char(ch) if !has_command_modifier(key) => buffer.insert_char(ch),
            _ => false,
        };
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }
}

fn has_command_modifier(key: KeyEvent) -> bool {
    key.modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER)
}

fn map_key(key: KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('r') => Some(Action::Refresh),
            _ => None,
        };
    }
    if has_command_modifier(key) {
        return None;
    }
    match key.code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char('j') | KeyCode::Down => Some(Action::CursorDown),
        KeyCode::Char('k') | KeyCode::Up => Some(Action::CursorUp),
        KeyCode::Enter => Some(Action::Open),
        KeyCode::Esc => Some(Action::Deselect),
        KeyCode::Char('a') => Some(Action::CreateNew),
        KeyCode::Char('n') => Some(Action::NewDraft),
        KeyCode::Char('e') => Some(Action::Edit),
        KeyCode::Char('d') => Some(Action::Delete),
        KeyCode::Char('/') => Some(Action::StartSearch),
        _ => None,
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("switching to alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("creating terminal backend")?;
    terminal.hide_cursor().context("hiding cursor")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor().ok();
    disable_raw_mode().context("disabling raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("restoring screen state")?;
    Ok(())
}
