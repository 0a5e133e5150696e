use std::env;
use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use chrono::Utc;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use replay_terminal::fetch;
use replay_terminal::filters::{CommitGesture, parse_date_input};
use replay_terminal::provider;
use replay_terminal::query::{DATE_WIRE_FORMAT, PlayerSlot, ReplayQuery};
use replay_terminal::state::{
    AppState, ProviderCommand, ReplaySet, SearchFocus, apply_delta,
};

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: mpsc::Sender<ProviderCommand>,
}

impl App {
    fn new(initial: ReplayQuery, cmd_tx: mpsc::Sender<ProviderCommand>) -> Self {
        Self {
            state: AppState::new(initial),
            should_quit: false,
            cmd_tx,
        }
    }

    fn dispatch(&mut self, cmd: Option<ProviderCommand>) {
        let Some(cmd) = cmd else {
            return;
        };
        if self.cmd_tx.send(cmd).is_err() {
            self.state.push_log("[WARN] Provider channel closed");
        }
    }

    fn maybe_load_more(&mut self) {
        if self.state.near_list_end() {
            let cmd = self.state.request_next_page();
            self.dispatch(cmd);
        }
    }

    fn set_focus(&mut self, focus: SearchFocus) {
        if matches!(focus, SearchFocus::P1Character | SearchFocus::P2Character) {
            let slot = if focus == SearchFocus::P1Character {
                PlayerSlot::P1
            } else {
                PlayerSlot::P2
            };
            self.state.picker_cursor = self
                .state
                .query
                .character(slot)
                .and_then(|id| self.state.icons.iter().position(|icon| icon.id == id))
                .map(|idx| idx + 1)
                .unwrap_or(0);
        }
        self.state.focus = focus;
    }

    fn next_focus(&mut self) {
        let next = match self.state.focus {
            SearchFocus::List => SearchFocus::P1Name,
            SearchFocus::P1Name => SearchFocus::P2Name,
            SearchFocus::P2Name => SearchFocus::DateRange,
            SearchFocus::DateRange => SearchFocus::P1Character,
            SearchFocus::P1Character => SearchFocus::P2Character,
            SearchFocus::P2Character => SearchFocus::List,
        };
        self.set_focus(next);
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.state.help_overlay {
            self.state.help_overlay = false;
            return;
        }
        match self.state.focus {
            SearchFocus::List => self.on_list_key(key),
            SearchFocus::P1Name => self.on_name_key(key, PlayerSlot::P1),
            SearchFocus::P2Name => self.on_name_key(key, PlayerSlot::P2),
            SearchFocus::DateRange => self.on_date_key(key),
            SearchFocus::P1Character => self.on_picker_key(key, PlayerSlot::P1),
            SearchFocus::P2Character => self.on_picker_key(key, PlayerSlot::P2),
        }
    }

    fn on_list_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => {
                self.move_selection(1);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.state.selected = self.state.selected.saturating_sub(1);
            }
            KeyCode::PageDown => self.move_selection(10),
            KeyCode::PageUp => {
                self.state.selected = self.state.selected.saturating_sub(10);
            }
            KeyCode::Char('g') => self.state.selected = 0,
            KeyCode::Char('G') => {
                self.state.selected = self.state.replays.len().saturating_sub(1);
                self.maybe_load_more();
            }
            KeyCode::Tab => self.next_focus(),
            KeyCode::Char('b') | KeyCode::Backspace | KeyCode::Left => {
                if !self.state.navigate_back() {
                    self.state.push_log("[INFO] No earlier search to go back to");
                }
            }
            KeyCode::Char('f') | KeyCode::Right => {
                if !self.state.navigate_forward() {
                    self.state.push_log("[INFO] No later search to go forward to");
                }
            }
            KeyCode::Char('r') => {
                let cmd = self.state.retry_last();
                self.dispatch(cmd);
            }
            KeyCode::Char('?') => self.state.help_overlay = true,
            _ => {}
        }
    }

    fn move_selection(&mut self, step: usize) {
        let last = self.state.replays.len().saturating_sub(1);
        self.state.selected = (self.state.selected + step).min(last);
        self.maybe_load_more();
    }

    fn on_name_key(&mut self, key: KeyEvent, slot: PlayerSlot) {
        match key.code {
            KeyCode::Char(c) => self.state.filters.buffer_mut(slot).push(c),
            KeyCode::Backspace => {
                let buffer = self.state.filters.buffer_mut(slot);
                buffer.pop();
                if buffer.is_empty() {
                    let cmd = self
                        .state
                        .commit_player_filter(slot, CommitGesture::BackspaceEmpty);
                    self.dispatch(cmd);
                }
            }
            KeyCode::Enter => {
                let cmd = self.state.commit_player_filter(slot, CommitGesture::Confirm);
                self.dispatch(cmd);
            }
            KeyCode::Tab => {
                let cmd = self.state.commit_player_filter(slot, CommitGesture::Blur);
                self.dispatch(cmd);
                self.next_focus();
            }
            KeyCode::Esc => {
                let cmd = self.state.commit_player_filter(slot, CommitGesture::Blur);
                self.dispatch(cmd);
                self.set_focus(SearchFocus::List);
            }
            _ => {}
        }
    }

    fn on_date_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(c) => self.state.filters.date_input.push(c),
            KeyCode::Backspace => {
                self.state.filters.date_input.pop();
            }
            KeyCode::Enter => {
                let raw = self.state.filters.date_input.clone();
                if raw.trim().is_empty() {
                    let cmd = self.state.cancel_date_range();
                    self.dispatch(cmd);
                } else if let Some(range) = parse_date_input(&raw) {
                    let cmd = self.state.apply_date_range(range);
                    self.dispatch(cmd);
                } else {
                    self.state
                        .push_log("[WARN] Invalid date range, expected DD/MM/YYYY - DD/MM/YYYY");
                }
            }
            KeyCode::Esc => {
                let cmd = self.state.cancel_date_range();
                self.dispatch(cmd);
                self.set_focus(SearchFocus::List);
            }
            KeyCode::Tab => self.next_focus(),
            _ => {}
        }
    }

    fn on_picker_key(&mut self, key: KeyEvent, slot: PlayerSlot) {
        let choices = self.state.icons.len() + 1;
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.state.picker_cursor = (self.state.picker_cursor + 1) % choices;
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.state.picker_cursor = (self.state.picker_cursor + choices - 1) % choices;
            }
            KeyCode::Enter => {
                let id = if self.state.picker_cursor == 0 {
                    None
                } else {
                    self.state
                        .icons
                        .get(self.state.picker_cursor - 1)
                        .map(|icon| icon.id)
                };
                let cmd = self.state.pick_character(slot, id);
                self.dispatch(cmd);
                self.set_focus(SearchFocus::List);
            }
            KeyCode::Esc => self.set_focus(SearchFocus::List),
            KeyCode::Tab => self.next_focus(),
            _ => {}
        }
    }
}

fn initial_query() -> ReplayQuery {
    let raw = env::args()
        .nth(1)
        .or_else(|| env::var("REPLAY_QUERY").ok())
        .unwrap_or_default();
    ReplayQuery::parse(&raw)
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    provider::spawn_provider(tx, cmd_rx);

    let mut app = App::new(initial_query(), cmd_tx);
    let first = app.state.request_next_page();
    app.dispatch(first);
    app.dispatch(Some(ProviderCommand::FetchCharacterIcons));

    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<replay_terminal::state::Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(frame.size());

    render_filter_panel(frame, chunks[0], &app.state);
    render_replay_list(frame, chunks[1], &app.state);

    let footer = Paragraph::new(format!(
        "{}\n{}",
        status_text(&app.state),
        key_hints(&app.state)
    ))
    .block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, chunks[2]);

    if matches!(
        app.state.focus,
        SearchFocus::P1Character | SearchFocus::P2Character
    ) {
        render_picker_overlay(frame, frame.size(), &app.state);
    }
    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn field_span<'a>(label: &'a str, value: String, focused: bool) -> Span<'a> {
    let text = format!(" {label}: [{value}] ");
    if focused {
        Span::styled(
            text,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::raw(text)
    }
}

fn render_filter_panel(frame: &mut Frame, area: Rect, state: &AppState) {
    let date_value = if state.filters.date_input.is_empty() {
        format!(
            "05/11/2017 - {}",
            Utc::now().date_naive().format(DATE_WIRE_FORMAT)
        )
    } else {
        state.filters.date_input.clone()
    };

    let character_label = |slot: PlayerSlot| -> String {
        state
            .query
            .character(slot)
            .map(|id| {
                state
                    .character_name(id)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("#{id}"))
            })
            .unwrap_or_else(|| "Any".to_string())
    };

    let line1 = Line::from(vec![
        field_span(
            "P1",
            state.filters.p1_input.clone(),
            state.focus == SearchFocus::P1Name,
        ),
        field_span(
            "P2",
            state.filters.p2_input.clone(),
            state.focus == SearchFocus::P2Name,
        ),
        field_span(
            "Recorded",
            date_value,
            state.focus == SearchFocus::DateRange,
        ),
    ]);
    let line2 = Line::from(vec![
        field_span(
            "P1 Character",
            character_label(PlayerSlot::P1),
            state.focus == SearchFocus::P1Character,
        ),
        field_span(
            "P2 Character",
            character_label(PlayerSlot::P2),
            state.focus == SearchFocus::P2Character,
        ),
    ]);

    let panel = Paragraph::new(vec![line1, line2]).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Replay Search"),
    );
    frame.render_widget(panel, area);
}

/// Pure row renderer: one replay set to one line of text. Kept free of any
/// state access so it can be swapped or tested in isolation.
fn replay_row(replay: &ReplaySet, character_name: impl Fn(u32) -> Option<String>) -> String {
    let p1_char = character_name(replay.p1_character_id)
        .unwrap_or_else(|| format!("#{}", replay.p1_character_id));
    let p2_char = character_name(replay.p2_character_id)
        .unwrap_or_else(|| format!("#{}", replay.p2_character_id));
    format!(
        "{} ({})  {} - {}  ({}) {}  | {} | {} game(s)",
        replay.p1,
        p1_char,
        replay.p1wins,
        replay.p2wins,
        p2_char,
        replay.p2,
        replay.recorded_at,
        replay.set.len().max(1)
    )
}

fn render_replay_list(frame: &mut Frame, area: Rect, state: &AppState) {
    if state.replays.is_empty() {
        let message = if state.loader.cursor.loading {
            "Loading replay sets..."
        } else {
            "No replay sets for this search"
        };
        let empty = Paragraph::new(message).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, area);
        return;
    }

    let visible = area.height as usize;
    let start = state
        .selected
        .saturating_sub(visible.saturating_sub(1))
        .min(state.replays.len().saturating_sub(1));

    let lines: Vec<Line> = state
        .replays
        .iter()
        .enumerate()
        .skip(start)
        .take(visible)
        .map(|(idx, replay)| {
            let text = replay_row(replay, |id| {
                state.character_name(id).map(str::to_string)
            });
            if idx == state.selected {
                Line::styled(text, Style::default().add_modifier(Modifier::REVERSED))
            } else {
                Line::raw(text)
            }
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), area);
}

fn status_text(state: &AppState) -> String {
    if state.loader.cursor.loading {
        return format!("Loading page {}...", state.loader.cursor.current_page);
    }
    if let Some(failure) = &state.last_failure {
        return format!("Load failed ({failure}) - press r to retry");
    }
    if let Some(replay) = state.replays.get(state.selected) {
        let ids: Vec<String> = replay.set.iter().map(u64::to_string).collect();
        return format!(
            "dl: {base}/download?replay_id={} | set: {base}/download-set?replay_ids={}",
            replay.replay_id,
            ids.join(","),
            base = fetch::api_base()
        );
    }
    state.logs.back().cloned().unwrap_or_default()
}

fn key_hints(state: &AppState) -> String {
    match state.focus {
        SearchFocus::List => {
            "j/k Move | Tab Filters | b/← Back | f/→ Forward | r Retry | ? Help | q Quit"
                .to_string()
        }
        SearchFocus::P1Name | SearchFocus::P2Name => {
            "Type name | Enter Apply | Esc Done | Tab Next field".to_string()
        }
        SearchFocus::DateRange => {
            "Type DD/MM/YYYY - DD/MM/YYYY | Enter Apply | Esc Clear | Tab Next field".to_string()
        }
        SearchFocus::P1Character | SearchFocus::P2Character => {
            "j/k Choose | Enter Apply | Esc Cancel | Tab Next field".to_string()
        }
    }
}

fn render_picker_overlay(frame: &mut Frame, area: Rect, state: &AppState) {
    let slot = if state.focus == SearchFocus::P1Character {
        PlayerSlot::P1
    } else {
        PlayerSlot::P2
    };
    let overlay = centered_rect(32, 60, area);
    frame.render_widget(Clear, overlay);

    let inner_height = overlay.height.saturating_sub(2) as usize;
    let cursor = state.picker_cursor;
    let start = cursor.saturating_sub(inner_height.saturating_sub(1));

    let mut lines = Vec::new();
    for (idx, label) in std::iter::once("Any".to_string())
        .chain(state.icons.iter().map(|icon| icon.name.clone()))
        .enumerate()
        .skip(start)
        .take(inner_height)
    {
        if idx == cursor {
            lines.push(Line::styled(
                format!("> {label}"),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ));
        } else {
            lines.push(Line::raw(format!("  {label}")));
        }
    }

    let title = format!("{} character", slot.label());
    let panel =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(panel, overlay);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let overlay = centered_rect(60, 50, area);
    frame.render_widget(Clear, overlay);
    let text = "Replay browser\n\n\
        j/k or arrows  move through loaded sets; nearing the end loads more\n\
        Tab            cycle search fields\n\
        Enter          commit the focused field\n\
        Backspace      (empty name field) drop that filter and reload\n\
        b / f          back / forward through search history (no refetch)\n\
        r              retry a failed load\n\
        q              quit\n\n\
        Any key closes this help.";
    let panel = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("Help"));
    frame.render_widget(panel, overlay);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);
    horizontal[1]
}
