use std::env;
use std::io;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph, Row, Table};

use globe_transfers::arcsets::{RenderableArc, ARC_EXIT, ARC_PLAYER, MAX_YEAR, MIN_YEAR};
use globe_transfers::demo_feed::DemoArcSource;
use globe_transfers::persist::Theme;
use globe_transfers::playback::PlayState;
use globe_transfers::state::{apply_delta, AppState, Delta, ProviderCommand, ViewMode};
use globe_transfers::transfer_fetch::HttpArcSource;
use globe_transfers::year_cache::ArcSource;
use globe_transfers::{provider, year_cache};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Browse,
    PlayerSearch,
}

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: mpsc::Sender<ProviderCommand>,
    focus: Focus,
    country_cursor: usize,
    search_cursor: usize,
    last_requested_year: Option<u16>,
    help_overlay: bool,
}

impl App {
    fn new(state: AppState, cmd_tx: mpsc::Sender<ProviderCommand>) -> Self {
        Self {
            state,
            should_quit: false,
            cmd_tx,
            focus: Focus::Browse,
            country_cursor: 0,
            search_cursor: 0,
            last_requested_year: None,
            help_overlay: false,
        }
    }

    /// Requests the dataset for the year on screen when it is not cached
    /// yet. The provider deduplicates repeated requests for the same year.
    fn ensure_year_loaded(&mut self) {
        if self.state.mode != ViewMode::YearBrowse {
            return;
        }
        let year = self.state.current_year();
        if self.state.cache.contains(year) {
            self.last_requested_year = None;
            return;
        }
        if self.last_requested_year == Some(year) {
            return;
        }
        if self.cmd_tx.send(ProviderCommand::LoadYear(year)).is_ok() {
            self.last_requested_year = Some(year);
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match self.focus {
            Focus::PlayerSearch => self.on_search_key(key),
            Focus::Browse => self.on_browse_key(key),
        }
    }

    fn on_browse_key(&mut self, key: KeyEvent) {
        let now = Instant::now();
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.help_overlay = !self.help_overlay,
            KeyCode::Char(' ') => self.state.toggle_play(now),
            KeyCode::Char('s') => self.state.toggle_speed(now),
            KeyCode::Left | KeyCode::Char('h') => {
                self.state.step_year(-1);
                self.ensure_year_loaded();
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.state.step_year(1);
                self.ensure_year_loaded();
            }
            KeyCode::Char('j') | KeyCode::Down => self.move_country_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_country_cursor(-1),
            KeyCode::Char('x') | KeyCode::Enter => {
                if let Some(code) = self.cursor_country() {
                    self.state.toggle_country(&code);
                    self.ensure_year_loaded();
                }
            }
            KeyCode::Char('a') => {
                self.state.select_all_countries();
                self.ensure_year_loaded();
            }
            KeyCode::Char('n') => {
                self.state.clear_countries();
                self.ensure_year_loaded();
            }
            KeyCode::Char('i') => {
                let transfers_in = !self.state.filter.show_transfers_in;
                let transfers_out = self.state.filter.show_transfers_out;
                self.state.set_directions(transfers_in, transfers_out);
            }
            KeyCode::Char('o') => {
                let transfers_in = self.state.filter.show_transfers_in;
                let transfers_out = !self.state.filter.show_transfers_out;
                self.state.set_directions(transfers_in, transfers_out);
            }
            KeyCode::Char('b') => {
                // "All transfers" coupling: both on unless both already on.
                let both = self.state.filter.show_transfers_in
                    && self.state.filter.show_transfers_out;
                self.state.set_directions(!both, !both);
            }
            KeyCode::Char('[') => {
                let source = self.cursor_country();
                let dest = self.state.filter.dest_country_code.clone();
                self.state.set_country_pair(source, dest);
                self.ensure_year_loaded();
            }
            KeyCode::Char(']') => {
                let source = self.state.filter.source_country_code.clone();
                let dest = self.cursor_country();
                self.state.set_country_pair(source, dest);
                self.ensure_year_loaded();
            }
            KeyCode::Char('r') => {
                self.state.reset_country_pair();
                self.ensure_year_loaded();
            }
            KeyCode::Char('/') => {
                self.focus = Focus::PlayerSearch;
                self.search_cursor = 0;
            }
            KeyCode::Char('t') => self.state.toggle_theme(),
            KeyCode::Esc | KeyCode::Char('e') => {
                if self.state.mode == ViewMode::PlayerCareer {
                    self.state.exit_career_mode();
                    self.ensure_year_loaded();
                }
            }
            _ => {}
        }
    }

    fn on_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.focus = Focus::Browse;
                self.state.search_results.clear();
            }
            KeyCode::Down => {
                if !self.state.search_results.is_empty() {
                    self.search_cursor =
                        (self.search_cursor + 1) % self.state.search_results.len();
                }
            }
            KeyCode::Up => {
                if !self.state.search_results.is_empty() {
                    self.search_cursor = self
                        .search_cursor
                        .checked_sub(1)
                        .unwrap_or(self.state.search_results.len() - 1);
                }
            }
            KeyCode::Enter => {
                if let Some(player) = self.state.search_results.get(self.search_cursor).cloned() {
                    let cmd = self.state.select_player(&player);
                    if self.cmd_tx.send(cmd).is_err() {
                        self.state.push_log("[WARN] Career request failed");
                    }
                    self.focus = Focus::Browse;
                } else {
                    // Free text without a picked suggestion never arms the
                    // filter.
                    self.state.require_player_selection();
                }
            }
            KeyCode::Backspace => {
                let mut term = self.state.player_search.clone();
                term.pop();
                self.state.update_player_search(term);
                self.search_cursor = 0;
            }
            KeyCode::Char(c) => {
                let mut term = self.state.player_search.clone();
                term.push(c);
                self.state.update_player_search(term);
                self.search_cursor = 0;
            }
            _ => {}
        }
    }

    fn cursor_country(&self) -> Option<String> {
        self.state.countries.sorted_codes().get(self.country_cursor).cloned()
    }

    fn move_country_cursor(&mut self, delta: i32) {
        let total = self.state.countries.sorted_codes().len();
        if total == 0 {
            self.country_cursor = 0;
            return;
        }
        if delta >= 0 {
            self.country_cursor = (self.country_cursor + 1) % total;
        } else if self.country_cursor == 0 {
            self.country_cursor = total - 1;
        } else {
            self.country_cursor -= 1;
        }
    }
}

fn build_source() -> Arc<dyn ArcSource> {
    let kind = env::var("DATA_SOURCE")
        .unwrap_or_else(|_| "http".to_string())
        .to_lowercase();
    if kind == "demo" {
        Arc::new(DemoArcSource)
    } else {
        Arc::new(HttpArcSource::from_env())
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let source = build_source();
    let cache = Arc::new(year_cache::YearDataCache::new(source.clone()));

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    provider::spawn_provider(tx, cmd_rx, cache.clone(), source);

    let mut app = App::new(AppState::new(cache, MIN_YEAR), cmd_tx);
    app.ensure_year_loaded();
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        app.state.tick(Instant::now());
        app.ensure_year_loaded();

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
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(5),
        ])
        .split(frame.size());

    render_header(frame, chunks[0], app);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(34), Constraint::Min(30)])
        .split(chunks[1]);
    render_filters(frame, columns[0], app);
    match app.state.mode {
        ViewMode::PlayerCareer => render_career(frame, columns[1], app),
        ViewMode::YearBrowse => render_arcs(frame, columns[1], app),
    }

    render_footer(frame, chunks[2], app);

    if app.focus == Focus::PlayerSearch {
        render_search_popup(frame, frame.size(), app);
    }
    if app.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(2)])
        .split(area);

    let playing = match app.state.playback.state() {
        PlayState::Playing => "playing",
        PlayState::Stopped => "paused",
    };
    let mode = match app.state.mode {
        ViewMode::YearBrowse => "year browse",
        ViewMode::PlayerCareer => "career",
    };
    let theme = match app.state.theme {
        Theme::Light => "light",
        Theme::Dark => "dark",
    };
    let line = format!(
        " transfer globe | {} | {} | speed {} | theme {} | ? help",
        mode,
        playing,
        app.state.playback.speed().label(),
        theme,
    );
    frame.render_widget(
        Paragraph::new(line).style(Style::default().add_modifier(Modifier::BOLD)),
        rows[0],
    );

    // The year scrubber is hidden while the career sequencer owns the view.
    if app.state.mode == ViewMode::YearBrowse {
        let year = app.state.current_year();
        let ratio = f64::from(year - MIN_YEAR) / f64::from(MAX_YEAR - MIN_YEAR);
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(Color::Cyan))
            .ratio(ratio)
            .label(format!("{year}"));
        frame.render_widget(gauge, rows[1]);
    }
}

fn render_filters(frame: &mut Frame, area: Rect, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(4)])
        .split(area);

    let codes = app.state.countries.sorted_codes();
    let mut lines: Vec<Line> = Vec::with_capacity(codes.len());
    let visible = rows[0].height.saturating_sub(2) as usize;
    let first = app.country_cursor.saturating_sub(visible.saturating_sub(1));
    for (idx, code) in codes.iter().enumerate().skip(first).take(visible.max(1)) {
        let selected = app.state.filter.selected_country_codes.contains(code);
        let mark = if selected { "[x]" } else { "[ ]" };
        let name = app.state.countries.name_of(code).unwrap_or(code);
        let mut style = Style::default();
        if idx == app.country_cursor {
            style = style.add_modifier(Modifier::REVERSED);
        }
        lines.push(Line::styled(format!("{mark} {code}  {name}"), style));
    }
    if lines.is_empty() {
        lines.push(Line::raw("loading country map..."));
    }
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().title("Countries").borders(Borders::ALL)),
        rows[0],
    );

    let dir = format!(
        "in {} out {}",
        checkbox(app.state.filter.show_transfers_in),
        checkbox(app.state.filter.show_transfers_out),
    );
    let pair = if app.state.filter.country_pair_active {
        format!(
            "pair {} -> {}",
            app.state.filter.source_country_code.as_deref().unwrap_or("*"),
            app.state.filter.dest_country_code.as_deref().unwrap_or("*"),
        )
    } else {
        "pair off".to_string()
    };
    frame.render_widget(
        Paragraph::new(vec![Line::raw(dir), Line::raw(pair)])
            .block(Block::default().title("Direction / Pair").borders(Borders::ALL)),
        rows[1],
    );
}

fn checkbox(on: bool) -> &'static str {
    if on {
        "[x]"
    } else {
        "[ ]"
    }
}

fn arc_color_label(arc: &RenderableArc) -> (&'static str, Color) {
    if arc.color.r == ARC_PLAYER.r && arc.color.g == ARC_PLAYER.g && arc.color.b == ARC_PLAYER.b {
        ("player", Color::Green)
    } else if arc.color.r == ARC_EXIT.r && arc.color.g == ARC_EXIT.g && arc.color.b == ARC_EXIT.b {
        ("outgoing", Color::Blue)
    } else {
        ("incoming", Color::LightRed)
    }
}

fn render_arcs(frame: &mut Frame, area: Rect, app: &App) {
    let header = Row::new(["From", "To", "Players", "Class"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = app
        .state
        .visible_arcs
        .iter()
        .map(|arc| {
            let (label, color) = arc_color_label(arc);
            Row::new([
                arc.from.clone(),
                arc.to.clone(),
                arc.count.to_string(),
                label.to_string(),
            ])
            .style(Style::default().fg(color))
        })
        .collect();
    let title = format!("Arcs ({})", app.state.visible_arcs.len());
    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Length(8),
            Constraint::Min(8),
        ],
    )
    .header(header)
    .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(table, area);
}

fn render_career(frame: &mut Frame, area: Rect, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(4)])
        .split(area);

    let mut lines = Vec::new();
    if let Some(career) = &app.state.career {
        if let Some(arc) = app.state.current_career_transfer() {
            let year = arc.year.map(|y| y.to_string()).unwrap_or_default();
            lines.push(Line::styled(
                format!("{} ({year})", career.player_name),
                Style::default().add_modifier(Modifier::BOLD),
            ));
            let from = arc
                .from_club
                .clone()
                .unwrap_or_else(|| app.state.countries.name_of(&arc.from).unwrap_or(&arc.from).to_string());
            let to = arc
                .to_club
                .clone()
                .unwrap_or_else(|| app.state.countries.name_of(&arc.to).unwrap_or(&arc.to).to_string());
            lines.push(Line::raw(format!("{from} -> {to}")));
        }
        let chain: Vec<&str> = career.flags.iter().map(|f| f.code.as_str()).collect();
        lines.push(Line::raw(chain.join(" -> ")));
        lines.push(Line::raw(format!(
            "transfer {}/{}",
            career.sequencer.index() + 1,
            career.arcs.len()
        )));
    } else {
        lines.push(Line::raw("building career path..."));
    }
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().title("Career").borders(Borders::ALL)),
        rows[0],
    );

    render_arcs(frame, rows[1], app);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let mut lines = Vec::new();
    if let Some(status) = &app.state.status {
        lines.push(Line::styled(
            status.clone(),
            Style::default().fg(Color::Yellow),
        ));
    }
    for msg in app.state.logs.iter().rev().take(3) {
        lines.push(Line::raw(msg.clone()));
    }
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().title("Log").borders(Borders::ALL)),
        area,
    );
}

fn render_search_popup(frame: &mut Frame, area: Rect, app: &App) {
    let width = area.width.min(44);
    let height = (app.state.search_results.len() as u16 + 4).min(16);
    let popup = Rect {
        x: area.width.saturating_sub(width) / 2,
        y: area.height.saturating_sub(height) / 2,
        width,
        height,
    };
    frame.render_widget(Clear, popup);

    let mut lines = vec![Line::raw(format!("> {}", app.state.player_search))];
    for (idx, player) in app.state.search_results.iter().enumerate() {
        let mut style = Style::default();
        if idx == app.search_cursor {
            style = style.add_modifier(Modifier::REVERSED);
        }
        let position = player.position.as_deref().unwrap_or("unknown position");
        lines.push(Line::styled(format!("{}  ({position})", player.name), style));
    }
    frame.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .title("Player search (enter to select, esc to close)")
                .borders(Borders::ALL),
        ),
        popup,
    );
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let width = area.width.min(58);
    let height = area.height.min(16);
    let popup = Rect {
        x: area.width.saturating_sub(width) / 2,
        y: area.height.saturating_sub(height) / 2,
        width,
        height,
    };
    frame.render_widget(Clear, popup);
    let text = vec![
        Line::raw("space  play / pause        s  toggle speed"),
        Line::raw("h/l    previous / next year"),
        Line::raw("j/k    move country cursor  x  toggle country"),
        Line::raw("a/n    select all / none    i,o,b  directions"),
        Line::raw("[ ]    pair source / dest   r  reset pair"),
        Line::raw("/      player search        e/esc  exit career"),
        Line::raw("t      theme                q  quit"),
    ];
    frame.render_widget(
        Paragraph::new(text).block(Block::default().title("Keys").borders(Borders::ALL)),
        popup,
    );
}
