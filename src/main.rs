use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::widgets::canvas::{
    Canvas, Circle, Context as CanvasContext, Line as CanvasLine, Points, Rectangle,
};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use rusqlite::Connection;
use tracing::{info, warn};

use agency_desk::config::{AppConfig, app_data_dir};
use agency_desk::export;
use agency_desk::geo_calibration::{MAP_HEIGHT, MAP_WIDTH, PixelPoint};
use agency_desk::logging::{self, Verbosity};
use agency_desk::matrix_rain::RainCell;
use agency_desk::persist;
use agency_desk::presets;
use agency_desk::rich_text::{self, Block as TextBlock, Span as TextSpan};
use agency_desk::state::{AppState, Screen};
use agency_desk::store;
use agency_desk::tactics::{
    ArrowStyle, BOARD_HEIGHT, BOARD_WIDTH, BoardItem, BoardPoint, ItemKind, StrokeColor,
    TacticsBoard, Tool,
};

/// Map click radius, in map pixels.
const MAP_PICK_RADIUS: f64 = 25.0;

const HELP_TEXT: &str = "\
# Agency Desk
## Screens
- **1** map, **2** tactics, **3** reveal
- **?** toggle help, **q** quit
## Map
- **j/k** select club, click a marker to select it
- **arrows** nudge the selected marker
- **space** toggle calibration point
- **c** calibrate from the flagged points
- **r** reset to preset position
- **e** export clubs to xlsx
## Tactics
- **t** cycle tool (move, draw, arrow, erase)
- **f** lay out the next formation
- **h** / **a** add home / away player, **b** ball, **o** cone
- **d** remove the item under the mouse
- **p** toggle pass/run arrows, **l** cycle pen colour
- **u** undo, **x** clear, **s** save board
";

struct App {
    state: AppState,
    conn: Connection,
    config: AppConfig,
    rng: StdRng,
    should_quit: bool,
    map_area: Rect,
    board_area: Rect,
    reveal_area: Rect,
    board_cursor: Option<BoardPoint>,
    notes_loaded_for: Option<i64>,
}

impl App {
    fn new(config: AppConfig) -> Result<Self> {
        let db_path = config
            .db_path
            .clone()
            .or_else(store::default_db_path)
            .context("unable to resolve sqlite path")?;
        let conn = store::open_db(&db_path)?;

        let mut rng = StdRng::from_entropy();
        let mut clubs = store::list_clubs(&conn)?;
        let seeded = clubs.is_empty();
        if seeded {
            for marker in presets::seed_markers() {
                store::upsert_club(&conn, &marker)?;
            }
            clubs = store::list_clubs(&conn)?;
        }

        let mut state = AppState::new(clubs, config.calibration_options(), &mut rng);
        state.push_log(format!("[INFO] Club store: {}", db_path.display()));
        if seeded {
            state.push_log("[INFO] Empty store seeded with preset clubs");
        }
        match store::load_board(&conn, &config.board_name) {
            Ok(Some(board)) => {
                state.board = TacticsBoard::from_snapshot(board);
            }
            Ok(None) => {}
            Err(err) => state.push_log(format!("[WARN] Board not loaded: {err:#}")),
        }
        persist::load_into_state(&mut state);

        Ok(Self {
            state,
            conn,
            config,
            rng,
            should_quit: false,
            map_area: Rect::default(),
            board_area: Rect::default(),
            reveal_area: Rect::default(),
            board_cursor: None,
            notes_loaded_for: None,
        })
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.state.help_overlay {
            if matches!(key.code, KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q')) {
                self.state.help_overlay = false;
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.state.help_overlay = true,
            KeyCode::Char('1') => self.state.set_screen(Screen::Map),
            KeyCode::Char('2') => self.state.set_screen(Screen::Tactics),
            KeyCode::Char('3') => self.state.set_screen(Screen::Reveal),
            _ => match self.state.screen {
                Screen::Map => self.on_map_key(key),
                Screen::Tactics => self.on_tactics_key(key),
                Screen::Reveal => self.on_map_selection_key(key),
            },
        }
    }

    fn on_map_selection_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') => self.state.select_next(),
            KeyCode::Char('k') => self.state.select_prev(),
            _ => {}
        }
    }

    fn on_map_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Char('k') => self.on_map_selection_key(key),
            KeyCode::Left => self.nudge(-1.0, 0.0),
            KeyCode::Right => self.nudge(1.0, 0.0),
            KeyCode::Up => self.nudge(0.0, -1.0),
            KeyCode::Down => self.nudge(0.0, 1.0),
            KeyCode::Char(' ') => {
                if let Some((id, flag)) = self.state.toggle_calibration_point() {
                    let res = store::set_calibration_point(&self.conn, id, flag);
                    self.report_store(res.map(|_| ()));
                }
            }
            KeyCode::Char('r') => {
                if let Some((id, pos)) = self.state.reset_selected_to_preset() {
                    let res = store::update_position(&self.conn, id, Some(pos));
                    self.report_store(res.map(|_| ()));
                }
            }
            KeyCode::Char('c') => self.calibrate(),
            KeyCode::Char('e') => self.export(),
            _ => {}
        }
    }

    fn on_tactics_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('t') => return self.state.cycle_tool(),
            KeyCode::Char('f') => return self.state.apply_next_formation(),
            KeyCode::Char('u') => return self.state.undo_board(),
            KeyCode::Char('x') => return self.state.clear_board(),
            KeyCode::Char('s') => return self.save_board(),
            KeyCode::Char('d') | KeyCode::Delete => return self.delete_item_under_cursor(),
            _ => {}
        }

        let centre = BoardPoint::new(BOARD_WIDTH / 2.0, BOARD_HEIGHT / 2.0);
        let board = &mut self.state.board;
        match key.code {
            KeyCode::Char('h') => {
                let number = next_number(board.items(), true);
                board.add_item(ItemKind::HomePlayer { number }, centre);
            }
            KeyCode::Char('a') => {
                let number = next_number(board.items(), false);
                board.add_item(ItemKind::AwayPlayer { number }, centre);
            }
            KeyCode::Char('b') => {
                board.add_item(ItemKind::Ball, centre);
            }
            KeyCode::Char('o') => {
                board.add_item(ItemKind::Cone, centre);
            }
            KeyCode::Char('p') => {
                board.arrow_style = match board.arrow_style {
                    ArrowStyle::Pass => ArrowStyle::Run,
                    ArrowStyle::Run => ArrowStyle::Pass,
                };
            }
            KeyCode::Char('l') => board.stroke_color = board.stroke_color.next(),
            KeyCode::Esc => board.cancel_gesture(),
            _ => {}
        }
    }

    fn on_mouse(&mut self, mouse: MouseEvent) {
        match self.state.screen {
            Screen::Map => self.on_map_mouse(mouse),
            Screen::Tactics => self.on_tactics_mouse(mouse),
            Screen::Reveal => {
                let area = self.reveal_area;
                if contains(area, mouse.column, mouse.row) {
                    self.state
                        .rain
                        .set_cursor(mouse.column - area.x, mouse.row - area.y);
                } else {
                    self.state.rain.clear_cursor();
                }
            }
        }
    }

    fn on_map_mouse(&mut self, mouse: MouseEvent) {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        let Some((x, y)) = cell_to_space(self.map_area, mouse.column, mouse.row, MAP_WIDTH, MAP_HEIGHT)
        else {
            return;
        };
        let nearest = self
            .state
            .clubs
            .iter()
            .filter_map(|c| {
                let pos = c.position?;
                Some((c.id, (pos.x - x).hypot(pos.y - y)))
            })
            .filter(|(_, d)| *d <= MAP_PICK_RADIUS)
            .min_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((id, _)) = nearest {
            self.state.select_club_id(id);
        }
    }

    fn on_tactics_mouse(&mut self, mouse: MouseEvent) {
        let Some((x, y)) = cell_to_space(
            self.board_area,
            mouse.column,
            mouse.row,
            BOARD_WIDTH,
            BOARD_HEIGHT,
        ) else {
            return;
        };
        let at = BoardPoint::new(x, y);
        self.board_cursor = Some(at);
        let board = &mut self.state.board;
        match (mouse.kind, board.tool) {
            (MouseEventKind::Down(MouseButton::Right), _) => {
                board.add_item(ItemKind::Cone, at);
            }
            (MouseEventKind::Down(MouseButton::Left), Tool::Move) => {
                board.begin_drag(at);
            }
            (MouseEventKind::Drag(MouseButton::Left), Tool::Move) => board.drag_to(at),
            (MouseEventKind::Up(MouseButton::Left), Tool::Move) => {
                board.end_drag();
            }
            (MouseEventKind::Down(MouseButton::Left), Tool::Draw) => board.begin_stroke(at),
            (MouseEventKind::Drag(MouseButton::Left), Tool::Draw) => board.extend_stroke(at),
            (MouseEventKind::Up(MouseButton::Left), Tool::Draw) => {
                board.end_stroke();
            }
            (MouseEventKind::Down(MouseButton::Left), Tool::Arrow) => board.begin_arrow(at),
            (MouseEventKind::Up(MouseButton::Left), Tool::Arrow) => {
                board.finish_arrow(at);
            }
            (
                MouseEventKind::Down(MouseButton::Left) | MouseEventKind::Drag(MouseButton::Left),
                Tool::Erase,
            ) => {
                let outcome = self.state.board.erase_at(at);
                if !outcome.is_empty() {
                    self.state.push_log(format!(
                        "[INFO] Erased {} path(s){}",
                        outcome.paths_removed,
                        if outcome.arrow_removed.is_some() { " and an arrow" } else { "" }
                    ));
                }
            }
            _ => {}
        }
    }

    fn delete_item_under_cursor(&mut self) {
        let removed = self
            .board_cursor
            .and_then(|at| self.state.board.remove_item_at(at));
        match removed {
            Some(id) => self.state.push_log(format!("[INFO] Removed item {id}")),
            None => self.state.push_log("[INFO] No item under the cursor"),
        }
    }

    fn nudge(&mut self, dx: f64, dy: f64) {
        if let Some((id, pos)) = self.state.nudge_selected(dx, dy) {
            let res = store::update_position(&self.conn, id, Some(pos));
            self.report_store(res.map(|_| ()));
        }
    }

    fn calibrate(&mut self) {
        let conn = &mut self.conn;
        self.state.run_calibration(&mut self.rng, |moves| {
            store::save_positions(conn, moves).map(|_| ())
        });
    }

    fn export(&mut self) {
        let dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let path = export::default_export_path(&dir);
        match export::export_clubs(&path, &self.state.clubs, self.state.last_calibration.as_ref()) {
            Ok(report) => self.state.push_log(format!(
                "[INFO] Exported {} clubs to {}",
                report.clubs,
                path.display()
            )),
            Err(err) => self.state.push_log(format!("[WARN] Export failed: {err:#}")),
        }
    }

    fn save_board(&mut self) {
        let name = self.config.board_name.clone();
        match store::save_board(&self.conn, &name, self.state.board.drawing()) {
            Ok(()) => self.state.push_log(format!("[INFO] Board '{name}' saved")),
            Err(err) => self.state.push_log(format!("[WARN] Board not saved: {err:#}")),
        }
    }

    fn report_store(&mut self, res: Result<()>) {
        if let Err(err) = res {
            warn!("store write failed: {err:#}");
            self.state.push_log(format!("[WARN] Not saved: {err:#}"));
        }
    }

    fn refresh_notes(&mut self) {
        let selected = self.state.selected_club_id();
        if selected == self.notes_loaded_for && self.state.notes.is_some() {
            return;
        }
        self.notes_loaded_for = selected;
        self.state.notes = match selected {
            Some(id) => store::get_notes(&self.conn, id).unwrap_or_else(|err| {
                warn!("notes not loaded: {err:#}");
                None
            }),
            None => None,
        };
        if self.state.notes.is_none() {
            self.state.notes = Some(String::new());
        }
    }

    fn on_tick(&mut self) {
        if self.state.screen == Screen::Reveal {
            self.state.rain.tick(&mut self.rng);
        }
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let config = AppConfig::from_env();
    let log_file = config
        .log_file
        .clone()
        .or_else(|| app_data_dir().map(|dir| dir.join("agency_desk.log")));
    if let Some(path) = log_file.as_deref() {
        let args = std::env::args().skip(1).collect::<Vec<_>>();
        logging::init_logging(Verbosity::from_args(&args), Some(path));
    }

    let mut app = App::new(config)?;
    info!(clubs = app.state.clubs.len(), "agency desk started");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = persist::save_from_state(&app.state) {
        warn!("session not saved: {err:#}");
    }
    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let tick_rate = Duration::from_millis(app.config.tick_millis);
    let mut last_tick = Instant::now();

    loop {
        app.refresh_notes();
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.on_key(key),
                Event::Mouse(mouse) => app.on_mouse(mouse),
                _ => {}
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(4),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    match app.state.screen {
        Screen::Map => render_map(frame, chunks[1], app),
        Screen::Tactics => render_tactics(frame, chunks[1], app),
        Screen::Reveal => render_reveal(frame, chunks[1], app),
    }

    let console = Paragraph::new(console_text(&app.state))
        .block(Block::default().title("Console").borders(Borders::TOP));
    frame.render_widget(console, chunks[2]);

    frame.render_widget(Paragraph::new(footer_text(&app.state)), chunks[3]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let detail = match state.screen {
        Screen::Map => {
            let flagged = state.clubs.iter().filter(|c| c.is_calibration_point).count();
            format!("{} clubs | {} calibration points", state.clubs.len(), flagged)
        }
        Screen::Tactics => format!(
            "Tool: {} | Arrow: {} | Undo: {}",
            state.board.tool.label(),
            arrow_style_label(state.board.arrow_style),
            state.board.history_len()
        ),
        Screen::Reveal => state
            .selected_club()
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "No club selected".to_string()),
    };
    format!(" AGENCY DESK | {} | {}", state.screen.label(), detail)
}

fn footer_text(state: &AppState) -> String {
    match state.screen {
        Screen::Map => {
            "1/2/3 Screens | j/k Select | ←↑↓→ Nudge | Space Anchor | c Calibrate | r Preset | e Export | ? Help | q Quit"
        }
        Screen::Tactics => {
            "t Tool | f Formation | h/a/b/o Add | p Arrow style | u Undo | x Clear | s Save | ? Help | q Quit"
        }
        Screen::Reveal => "Move the mouse to reveal | j/k Select | 1/2 Back | q Quit",
    }
    .to_string()
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No messages yet".to_string();
    }
    let skip = state.logs.len().saturating_sub(3);
    state
        .logs
        .iter()
        .skip(skip)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_map(frame: &mut Frame, area: Rect, app: &mut App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(40), Constraint::Length(34)])
        .split(area);

    let block = Block::default().title("Map").borders(Borders::ALL);
    app.map_area = block.inner(columns[0]);
    let state = &app.state;
    let selected_id = state.selected_club_id();
    let bounds = state.last_calibration.as_ref().map(|plan| plan.bounds);

    let canvas = Canvas::default()
        .block(block)
        .marker(Marker::Braille)
        .x_bounds([0.0, MAP_WIDTH])
        .y_bounds([0.0, MAP_HEIGHT])
        .paint(|ctx| {
            if let Some(b) = bounds {
                ctx.draw(&Rectangle {
                    x: b.min_x,
                    y: MAP_HEIGHT - b.max_y,
                    width: b.max_x - b.min_x,
                    height: b.max_y - b.min_y,
                    color: Color::DarkGray,
                });
            }
            let plain: Vec<(f64, f64)> = state
                .clubs
                .iter()
                .filter(|c| !c.is_calibration_point)
                .filter_map(|c| c.position)
                .map(map_to_canvas)
                .collect();
            ctx.draw(&Points {
                coords: &plain,
                color: Color::Green,
            });
            ctx.layer();
            for club in state.clubs.iter().filter(|c| c.is_calibration_point) {
                if let Some(pos) = club.position {
                    let (x, y) = map_to_canvas(pos);
                    ctx.draw(&Circle {
                        x,
                        y,
                        radius: 8.0,
                        color: Color::Yellow,
                    });
                }
            }
            if let Some(club) = state.clubs.iter().find(|c| Some(c.id) == selected_id) {
                if let Some(pos) = club.position {
                    let (x, y) = map_to_canvas(pos);
                    ctx.print(
                        x,
                        y,
                        Span::styled(
                            format!("◆ {}", club.name),
                            Style::default()
                                .fg(Color::Cyan)
                                .add_modifier(Modifier::BOLD),
                        ),
                    );
                }
            }
        });
    frame.render_widget(canvas, columns[0]);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(10)])
        .split(columns[1]);
    render_club_list(frame, side[0], state);
    render_notes(frame, side[1], state);
}

fn render_club_list(frame: &mut Frame, area: Rect, state: &AppState) {
    let visible = area.height.saturating_sub(2) as usize;
    let (start, end) = visible_range(state.selected, state.clubs.len(), visible);
    let lines: Vec<Line> = state.clubs[start..end]
        .iter()
        .enumerate()
        .map(|(offset, club)| {
            let idx = start + offset;
            let anchor = if club.is_calibration_point { "◎" } else { " " };
            let located = if club.coords.is_some() { "" } else { " ?" };
            let text = format!("{anchor} {}{located}", club.name);
            if idx == state.selected {
                Line::styled(
                    text,
                    Style::default().fg(Color::Black).bg(Color::Cyan),
                )
            } else {
                Line::raw(text)
            }
        })
        .collect();
    let list = Paragraph::new(lines).block(Block::default().title("Clubs").borders(Borders::ALL));
    frame.render_widget(list, area);
}

fn render_notes(frame: &mut Frame, area: Rect, state: &AppState) {
    let notes = state.notes.as_deref().unwrap_or_default();
    let lines = if notes.trim().is_empty() {
        vec![Line::styled("No notes", Style::default().fg(Color::DarkGray))]
    } else {
        rich_lines(&rich_text::parse(notes))
    };
    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().title("Notes").borders(Borders::ALL));
    frame.render_widget(widget, area);
}

fn render_tactics(frame: &mut Frame, area: Rect, app: &mut App) {
    let block = Block::default()
        .title(format!("Tactics [{}]", app.config.board_name))
        .borders(Borders::ALL);
    app.board_area = block.inner(area);
    let board = &app.state.board;

    let canvas = Canvas::default()
        .block(block)
        .marker(Marker::Braille)
        .x_bounds([0.0, BOARD_WIDTH])
        .y_bounds([0.0, BOARD_HEIGHT])
        .paint(|ctx| {
            draw_pitch(ctx);
            ctx.layer();
            for path in board.paths().iter().chain(board.pending_stroke()) {
                draw_polyline(ctx, &path.points, stroke_color(path.color));
            }
            for arrow in board.arrows() {
                draw_arrow(ctx, arrow.start, arrow.end, arrow.style);
            }
            ctx.layer();
            for item in board.items() {
                let (x, y) = board_to_canvas(item.pos);
                let (label, color) = match item.kind {
                    ItemKind::HomePlayer { number } => (number.to_string(), Color::LightBlue),
                    ItemKind::AwayPlayer { number } => (number.to_string(), Color::LightRed),
                    ItemKind::Ball => ("●".to_string(), Color::White),
                    ItemKind::Cone => ("▲".to_string(), Color::Yellow),
                };
                ctx.print(x, y, Span::styled(label, Style::default().fg(color)));
            }
        });
    frame.render_widget(canvas, area);
}

fn render_reveal(frame: &mut Frame, area: Rect, app: &mut App) {
    let block = Block::default().title("Reveal").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    app.reveal_area = inner;
    app.state.rain.resize(inner.width, inner.height, &mut app.rng);

    let rain = &app.state.rain;
    let lines: Vec<Line> = (0..inner.height)
        .map(|row| {
            let spans: Vec<Span> = (0..inner.width)
                .map(|col| match rain.cell(col, row) {
                    RainCell::Empty => Span::raw(" "),
                    RainCell::Rain { glyph, intensity } => Span::styled(
                        glyph.to_string(),
                        Style::default().fg(if intensity > 0.8 {
                            Color::White
                        } else if intensity > 0.4 {
                            Color::LightGreen
                        } else {
                            Color::Green
                        }),
                    ),
                    RainCell::Trail { intensity } => Span::styled(
                        if intensity > 0.5 { "•" } else { "·" },
                        Style::default().fg(Color::Cyan),
                    ),
                    RainCell::Reveal(ch) => Span::styled(
                        ch.to_string(),
                        Style::default()
                            .fg(Color::Yellow)
                            .add_modifier(Modifier::BOLD),
                    ),
                })
                .collect();
            Line::from(spans)
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_pitch(ctx: &mut CanvasContext<'_>) {
    let color = Color::DarkGray;
    ctx.draw(&Rectangle {
        x: 0.0,
        y: 0.0,
        width: BOARD_WIDTH,
        height: BOARD_HEIGHT,
        color,
    });
    ctx.draw(&CanvasLine {
        x1: BOARD_WIDTH / 2.0,
        y1: 0.0,
        x2: BOARD_WIDTH / 2.0,
        y2: BOARD_HEIGHT,
        color,
    });
    ctx.draw(&Circle {
        x: BOARD_WIDTH / 2.0,
        y: BOARD_HEIGHT / 2.0,
        radius: 91.5,
        color,
    });
    // Penalty areas: 16.5m deep, 40.3m wide.
    let box_h = 403.0;
    let box_y = (BOARD_HEIGHT - box_h) / 2.0;
    for x in [0.0, BOARD_WIDTH - 165.0] {
        ctx.draw(&Rectangle {
            x,
            y: box_y,
            width: 165.0,
            height: box_h,
            color,
        });
    }
}

fn draw_polyline(ctx: &mut CanvasContext<'_>, points: &[BoardPoint], color: Color) {
    for pair in points.windows(2) {
        let (x1, y1) = board_to_canvas(pair[0]);
        let (x2, y2) = board_to_canvas(pair[1]);
        ctx.draw(&CanvasLine {
            x1,
            y1,
            x2,
            y2,
            color,
        });
    }
}

fn draw_arrow(ctx: &mut CanvasContext<'_>, start: BoardPoint, end: BoardPoint, style: ArrowStyle) {
    let (x1, y1) = board_to_canvas(start);
    let (x2, y2) = board_to_canvas(end);
    let color = match style {
        ArrowStyle::Pass => Color::White,
        ArrowStyle::Run => Color::LightYellow,
    };
    let len = (x2 - x1).hypot(y2 - y1);
    if len <= f64::EPSILON {
        return;
    }
    let (ux, uy) = ((x2 - x1) / len, (y2 - y1) / len);

    match style {
        ArrowStyle::Pass => ctx.draw(&CanvasLine { x1, y1, x2, y2, color }),
        ArrowStyle::Run => {
            let dash = 14.0;
            let mut t = 0.0;
            while t < len {
                let t2 = (t + dash).min(len);
                ctx.draw(&CanvasLine {
                    x1: x1 + ux * t,
                    y1: y1 + uy * t,
                    x2: x1 + ux * t2,
                    y2: y1 + uy * t2,
                    color,
                });
                t += dash * 2.0;
            }
        }
    }

    let head = 18.0;
    for (sx, sy) in [(-uy, ux), (uy, -ux)] {
        ctx.draw(&CanvasLine {
            x1: x2,
            y1: y2,
            x2: x2 - ux * head + sx * head * 0.5,
            y2: y2 - uy * head + sy * head * 0.5,
            color,
        });
    }
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup_area);
    let help = Paragraph::new(rich_lines(&rich_text::parse(HELP_TEXT)))
        .wrap(Wrap { trim: false })
        .block(Block::default().title("Help").borders(Borders::ALL));
    frame.render_widget(help, popup_area);
}

fn rich_lines(blocks: &[TextBlock]) -> Vec<Line<'static>> {
    blocks
        .iter()
        .map(|block| match block {
            TextBlock::Heading { level, spans } => {
                let mut style = Style::default().add_modifier(Modifier::BOLD);
                if *level == 1 {
                    style = style.fg(Color::Cyan).add_modifier(Modifier::UNDERLINED);
                }
                Line::from(styled_spans(spans, style))
            }
            TextBlock::Bullet(spans) => prefixed("• ".to_string(), spans),
            TextBlock::Numbered { number, spans } => prefixed(format!("{number}. "), spans),
            TextBlock::Paragraph(spans) => Line::from(styled_spans(spans, Style::default())),
            TextBlock::Blank => Line::raw(""),
        })
        .collect()
}

fn prefixed(prefix: String, spans: &[TextSpan]) -> Line<'static> {
    let mut out = vec![Span::raw(prefix)];
    out.extend(styled_spans(spans, Style::default()));
    Line::from(out)
}

fn styled_spans(spans: &[TextSpan], base: Style) -> Vec<Span<'static>> {
    spans
        .iter()
        .map(|s| {
            let mut style = base;
            if s.bold {
                style = style.add_modifier(Modifier::BOLD);
            }
            if s.italic {
                style = style.add_modifier(Modifier::ITALIC);
            }
            Span::styled(s.text.clone(), style)
        })
        .collect()
}

fn next_number(items: &[BoardItem], home: bool) -> u8 {
    let taken = items
        .iter()
        .filter_map(|i| match (i.kind, home) {
            (ItemKind::HomePlayer { number }, true) | (ItemKind::AwayPlayer { number }, false) => {
                Some(number)
            }
            _ => None,
        })
        .max()
        .unwrap_or(0);
    taken.saturating_add(1)
}

fn arrow_style_label(style: ArrowStyle) -> &'static str {
    match style {
        ArrowStyle::Pass => "PASS",
        ArrowStyle::Run => "RUN",
    }
}

fn stroke_color(color: StrokeColor) -> Color {
    match color {
        StrokeColor::White => Color::White,
        StrokeColor::Yellow => Color::Yellow,
        StrokeColor::Red => Color::Red,
        StrokeColor::Blue => Color::Blue,
    }
}

fn map_to_canvas(p: PixelPoint) -> (f64, f64) {
    (p.x, MAP_HEIGHT - p.y)
}

fn board_to_canvas(p: BoardPoint) -> (f64, f64) {
    (p.x, BOARD_HEIGHT - p.y)
}

fn contains(area: Rect, col: u16, row: u16) -> bool {
    col >= area.x && col < area.x + area.width && row >= area.y && row < area.y + area.height
}

/// Maps a terminal cell to the centre of its footprint in a `width` x `height` space
/// whose y axis grows downward.
fn cell_to_space(area: Rect, col: u16, row: u16, width: f64, height: f64) -> Option<(f64, f64)> {
    if !contains(area, col, row) {
        return None;
    }
    let fx = (f64::from(col - area.x) + 0.5) / f64::from(area.width);
    let fy = (f64::from(row - area.y) + 0.5) / f64::from(area.height);
    Some((fx * width, fy * height))
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 || visible == 0 {
        return (0, 0);
    }
    let visible = visible.min(total);
    let start = selected.saturating_sub(visible / 2).min(total - visible);
    (start, start + visible)
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
