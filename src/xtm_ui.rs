// Terminal UI rendering and event handling
// Maps keys and mouse buttons to game events and draws the session state

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, MouseButton,
    MouseEventKind,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Span, Spans, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use std::error::Error;
use std::io;
use std::time::{Duration, Instant};
use tracing::debug;
use unicode_width::UnicodeWidthStr;

use crate::xtm_board::{CellView, Mark, Pos};
use crate::xtm_error::ActionError;
use crate::xtm_game::{Difficulty, Event, Game, Reply};
use crate::xtm_session::GameState;

const HINT_DURATION: Duration = Duration::from_millis(3000);
const FLASH_DURATION: Duration = Duration::from_millis(350);

// Background color for the minefield
const BOARD_BG: Color = Color::DarkGray;
const CURSOR_BG: Color = Color::LightBlue;
const HINT_BG: Color = Color::Green;
const MENU_KEY_FG: Color = Color::Yellow;

// Number colors for revealed cells 1..8
const NUM_COLORS: [Color; 8] = [
    Color::LightBlue,
    Color::LightGreen,
    Color::LightRed,
    Color::Blue,
    Color::Red,
    Color::Cyan,
    Color::Black,
    Color::Gray,
];

/// Board symbols, with ASCII fallbacks for limited terminals
struct Glyphs {
    unopened: &'static str,
    mine: &'static str,
    flag: &'static str,
}

impl Glyphs {
    fn new(ascii: bool) -> Self {
        Glyphs {
            unopened: if ascii { "." } else { "■" },
            mine: if ascii { "*" } else { "☼" },
            flag: if ascii { "F" } else { "⚑" },
        }
    }
}

// Runtime UI variables that are not part of the game itself
#[derive(Debug)]
struct UiState {
    cursor: Pos,
    hint: Option<(Pos, Duration)>,       // Highlight and time left; frozen while paused
    flash_cell: Option<(Pos, Duration)>,
    last_tick: Instant,
    board_rect: Option<Rect>,
    showing_help: bool,
    showing_result: bool,
}

impl UiState {
    fn new() -> Self {
        UiState {
            cursor: (0, 0),
            hint: None,
            flash_cell: None,
            last_tick: Instant::now(),
            board_rect: None,
            showing_help: false,
            showing_result: false,
        }
    }

    fn reset_after_new_game(&mut self, game: &Game) {
        let (w, h, _) = game.difficulty().params();
        self.cursor = (self.cursor.0.min(h - 1), self.cursor.1.min(w - 1));
        self.hint = None;
        self.flash_cell = None;
        self.showing_result = false;
    }

    /// Count highlights down by the time since the last frame
    fn advance(&mut self, now: Instant, paused: bool) {
        let dt = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;
        if !paused {
            self.hint = countdown(self.hint, dt);
        }
        self.flash_cell = countdown(self.flash_cell, dt);
    }

    fn step_cursor(&mut self, game: &Game, drow: isize, dcol: isize) {
        let (w, h, _) = game.difficulty().params();
        let row = (self.cursor.0 as isize + drow).clamp(0, h as isize - 1) as usize;
        let col = (self.cursor.1 as isize + dcol).clamp(0, w as isize - 1) as usize;
        self.cursor = (row, col);
    }
}

pub fn run(game: &mut Game) -> Result<(), Box<dyn Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnableMouseCapture, terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = event_loop(&mut terminal, game);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableMouseCapture, terminal::LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // Save current preferences before exiting
    game.save();
    res
}

fn event_loop<B: Backend>(terminal: &mut Terminal<B>, game: &mut Game) -> Result<(), Box<dyn Error>> {
    let mut ui = UiState::new();
    let glyphs = Glyphs::new(game.config().ascii_icons);
    let tick_rate = Duration::from_millis(200);

    loop {
        terminal.draw(|f| {
            let size = f.size();
            let (w, h, _) = game.difficulty().params();
            let min_twidth = 80u16.max((w * 2) as u16 + 5);
            let min_theight = (h as u16) + 8;
            // If terminal too small, render a centered warning and skip normal UI
            if size.width < min_twidth || size.height < min_theight {
                let warn_lines = vec![
                    Spans::from(Span::raw("Terminal size too small.")),
                    Spans::from(Span::raw(format!("Minimum required: {} x {}", min_twidth, min_theight))),
                ];
                let warn = Paragraph::new(Text::from(warn_lines))
                    .block(Block::default().borders(Borders::ALL).title("Resize Terminal"))
                    .alignment(Alignment::Center);
                f.render_widget(Clear, size);
                let area = center_rect(40u16.min(size.width.saturating_sub(2)), 5u16.min(size.height.saturating_sub(2)), size);
                f.render_widget(warn, area);
                ui.board_rect = None;
                return;
            }

            // layout: top menu row, center board, bottom status
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .margin(0)
                .constraints([Constraint::Length(3), Constraint::Min(6), Constraint::Length(3)].as_ref())
                .split(size);

            f.render_widget(menu_bar(game), chunks[0]);
            f.render_widget(status_bar(game, chunks[2].width), chunks[2]);

            let board_area = center_rect((w * 2) as u16 + 3, (h as u16) + 2, chunks[1]);
            ui.board_rect = Some(board_area);
            f.render_widget(board_view(game, &ui, &glyphs), board_area);

            if ui.showing_help {
                let area = center_rect(46, 12, size);
                f.render_widget(Clear, area);
                f.render_widget(help_view(), area);
            } else if ui.showing_result {
                let area = center_rect(40, 8, size);
                f.render_widget(Clear, area);
                f.render_widget(result_view(game), area);
            }
        })?;

        ui.advance(Instant::now(), game.session().state() == GameState::Paused);

        if !event::poll(tick_rate)? {
            continue;
        }
        match event::read()? {
            TermEvent::Key(KeyEvent { code, kind: KeyEventKind::Press, .. }) => {
                // any key closes a modal; R from the result modal also starts over
                if ui.showing_help || ui.showing_result {
                    ui.showing_help = false;
                    ui.showing_result = false;
                    if matches!(code, KeyCode::Char('r') | KeyCode::Char('R') | KeyCode::F(2)) {
                        dispatch(game, &mut ui, Event::Restart);
                    }
                    continue;
                }
                let ev = match code {
                    KeyCode::Esc => break,
                    KeyCode::F(1) => {
                        ui.showing_help = true;
                        None
                    }
                    KeyCode::F(2) | KeyCode::Char('r') | KeyCode::Char('R') => Some(Event::Restart),
                    KeyCode::Char('1') => Some(Event::SetDifficulty(Difficulty::Easy)),
                    KeyCode::Char('2') => Some(Event::SetDifficulty(Difficulty::Normal)),
                    KeyCode::Char('3') => Some(Event::SetDifficulty(Difficulty::Hard)),
                    KeyCode::Char('h') | KeyCode::Char('H') => Some(Event::RequestHint),
                    KeyCode::Char('p') | KeyCode::Char('P') => Some(Event::TogglePause),
                    KeyCode::Left => {
                        ui.step_cursor(game, 0, -1);
                        None
                    }
                    KeyCode::Right => {
                        ui.step_cursor(game, 0, 1);
                        None
                    }
                    KeyCode::Up => {
                        ui.step_cursor(game, -1, 0);
                        None
                    }
                    KeyCode::Down => {
                        ui.step_cursor(game, 1, 0);
                        None
                    }
                    KeyCode::Char(' ') => Some(Event::Reveal(ui.cursor)),
                    KeyCode::Char('f') | KeyCode::Char('F') => Some(Event::CycleMark(ui.cursor)),
                    KeyCode::Enter => Some(Event::Chord(ui.cursor)),
                    _ => None,
                };
                if let Some(ev) = ev {
                    dispatch(game, &mut ui, ev);
                }
            }
            TermEvent::Mouse(me) => {
                if ui.showing_help || ui.showing_result {
                    if matches!(me.kind, MouseEventKind::Down(_)) {
                        ui.showing_help = false;
                        ui.showing_result = false;
                    }
                    continue;
                }
                let (w, h, _) = game.difficulty().params();
                let Some(pos) = ui.board_rect.and_then(|r| cell_at(r, w, h, me.column, me.row)) else {
                    continue;
                };
                let ev = match me.kind {
                    MouseEventKind::Moved => {
                        ui.cursor = pos;
                        None
                    }
                    MouseEventKind::Down(MouseButton::Left) => Some(Event::Reveal(pos)),
                    MouseEventKind::Down(MouseButton::Right) => Some(Event::CycleMark(pos)),
                    MouseEventKind::Down(MouseButton::Middle) => Some(Event::Chord(pos)),
                    _ => None,
                };
                if let Some(ev) = ev {
                    ui.cursor = pos;
                    dispatch(game, &mut ui, ev);
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Forward one event to the game and update UI-only state from the reply
fn dispatch(game: &mut Game, ui: &mut UiState, ev: Event) {
    let now = Instant::now();
    match game.handle(ev, now) {
        Ok(Reply::Hint(pos)) => {
            ui.hint = Some((pos, HINT_DURATION));
            ui.cursor = pos;
        }
        Ok(Reply::NewGame(_)) => ui.reset_after_new_game(game),
        Ok(Reply::Revealed(result)) if result.outcome.is_finished() => ui.showing_result = true,
        Ok(_) => {}
        Err(ActionError::ChordMismatch) => {
            if let Event::Chord(pos) = ev {
                ui.flash_cell = Some((pos, FLASH_DURATION));
            }
        }
        Err(e) => debug!("Ignored {:?}: {}", ev, e),
    }
}

fn menu_bar(game: &Game) -> Paragraph<'static> {
    let session = game.session();
    let paused = session.state() == GameState::Paused;
    let items = [
        ("1", Difficulty::Easy.name(), game.difficulty() == Difficulty::Easy, true),
        ("2", Difficulty::Normal.name(), game.difficulty() == Difficulty::Normal, true),
        ("3", Difficulty::Hard.name(), game.difficulty() == Difficulty::Hard, true),
        ("H", "Hint", false, !session.hint_used()),
        ("P", if paused { "Resume" } else { "Pause" }, paused, true),
        ("R", "New", false, true),
        ("F1", "Help", false, true),
    ];
    let mut spans = vec![Span::raw(" ")];
    for (i, (key, label, active, enabled)) in items.into_iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("   "));
        }
        let (key_style, rest_style) = if !enabled {
            (Style::default().fg(Color::DarkGray), Style::default().fg(Color::DarkGray))
        } else if active {
            (
                Style::default().bg(CURSOR_BG).fg(Color::Black).add_modifier(Modifier::BOLD),
                Style::default().bg(CURSOR_BG).fg(Color::Black),
            )
        } else {
            (Style::default().fg(MENU_KEY_FG).add_modifier(Modifier::BOLD), Style::default())
        };
        spans.push(Span::styled(key, key_style));
        spans.push(Span::styled(format!(": {}", label), rest_style));
    }
    Paragraph::new(Spans::from(spans)).block(Block::default().borders(Borders::ALL)).alignment(Alignment::Left)
}

fn status_bar(game: &Game, width: u16) -> Paragraph<'static> {
    let session = game.session();
    let left_text = status_text(session.mines_remaining(), session.elapsed(Instant::now()), game.best_time());
    let (right_key, right_rest) = ("Esc", "Exit");
    let inner_w = width.saturating_sub(2) as usize;
    let left_w = left_text.as_str().width();
    // account for the ": " we add when rendering the right-hand key/rest
    let right_w = right_key.width() + 2 + right_rest.width();
    let mid_spaces = if inner_w > left_w + right_w + 1 { inner_w - left_w - right_w - 1 } else { 1 };
    let spans = vec![
        Span::raw(left_text),
        Span::raw(" ".repeat(mid_spaces)),
        Span::styled(right_key, Style::default().fg(MENU_KEY_FG).add_modifier(Modifier::BOLD)),
        Span::raw(format!(": {} ", right_rest)),
    ];
    Paragraph::new(Text::from(Spans::from(spans)))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Left)
}

fn board_view(game: &Game, ui: &UiState, glyphs: &Glyphs) -> Paragraph<'static> {
    let session = game.session();
    let board = session.board();
    let title = format!(" {} {}/{} ", game.difficulty().name(), board.flags(), board.mine_count());
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_alignment(Alignment::Center);

    // hide the field while paused so the clock can't be cheated
    if session.state() == GameState::Paused {
        let mut lines = vec![Spans::from(""); board.height() / 2];
        lines.push(Spans::from(Span::styled(
            "PAUSED",
            Style::default().fg(MENU_KEY_FG).add_modifier(Modifier::BOLD),
        )));
        lines.push(Spans::from("P: resume"));
        return Paragraph::new(Text::from(lines)).block(block).alignment(Alignment::Center);
    }

    let mut lines = vec![];
    for row in 0..board.height() {
        let mut spans = vec![];
        for col in 0..board.width() {
            let pos = (row, col);
            let mut style = Style::default().bg(BOARD_BG);
            let s = match board.view(pos) {
                Some(CellView::Hidden(Mark::Flag)) => {
                    style = style.fg(Color::Red);
                    glyphs.flag.to_string()
                }
                Some(CellView::Hidden(Mark::Question)) => {
                    style = style.fg(Color::Red);
                    "?".to_string()
                }
                Some(CellView::Hidden(Mark::None)) | None => {
                    style = style.fg(Color::Gray);
                    glyphs.unopened.to_string()
                }
                Some(CellView::Revealed(0)) => " ".to_string(),
                Some(CellView::Revealed(n)) => {
                    style = style.fg(NUM_COLORS[(n as usize).saturating_sub(1)]);
                    n.to_string()
                }
                Some(CellView::Mine) => {
                    style = style.fg(Color::Black);
                    glyphs.mine.to_string()
                }
            };
            if board.triggered_mine() == Some(pos) {
                style = style.bg(Color::Red);
            }
            if ui.hint.is_some_and(|(p, _)| p == pos) {
                style = style.bg(HINT_BG);
            }
            if ui.cursor == pos {
                style = style.bg(CURSOR_BG);
            }
            // chord refused: flash the cell
            if ui.flash_cell.is_some_and(|(p, _)| p == pos) {
                style = style.bg(Color::Red).fg(Color::White).add_modifier(Modifier::BOLD);
            }
            spans.push(Span::styled(format!(" {}", s), style));
        }
        // one-character padding column so the right edge uses the board background
        spans.push(Span::styled(" ", Style::default().bg(BOARD_BG)));
        lines.push(Spans::from(spans));
    }
    Paragraph::new(Text::from(lines)).block(block).alignment(Alignment::Left)
}

fn help_view() -> Paragraph<'static> {
    let lines = vec![
        Spans::from(""),
        Spans::from(" Controls:"),
        Spans::from("  Mouse | Arrows       - move cursor"),
        Spans::from("  L-Click | Space      - reveal"),
        Spans::from("  R-Click | F          - flag / ? / clear"),
        Spans::from("  M-Click | Enter      - chord (open neighbors)"),
        Spans::from("  1 2 3                - Easy / Normal / Hard"),
        Spans::from("  H                    - hint (once per game)"),
        Spans::from("  P                    - pause / resume"),
        Spans::from("  R | F2               - new game"),
    ];
    Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL).title("Help"))
}

fn result_view(game: &Game) -> Paragraph<'static> {
    let session = game.session();
    let secs = format_time(session.elapsed(Instant::now()));
    let (title, lines) = match session.state() {
        GameState::Won => {
            let time = if game.new_record() {
                format!("Time: {} (New Record!)", secs)
            } else {
                format!("Time: {}", secs)
            };
            ("You Win", vec!["Congratulations, board cleared!".to_string(), time])
        }
        _ => ("Game Over", vec!["Boom! You hit a mine.".to_string(), "Better luck next time.".to_string()]),
    };
    let mut text = vec![Spans::from("")];
    text.extend(lines.into_iter().map(Spans::from));
    text.push(Spans::from(""));
    text.push(Spans::from(Span::styled(
        "R: new game   any key: close",
        Style::default().fg(MENU_KEY_FG),
    )));
    Paragraph::new(Text::from(text))
        .block(Block::default().borders(Borders::ALL).title(title))
        .alignment(Alignment::Center)
}

fn status_text(mines_remaining: isize, elapsed: Duration, best: Option<Duration>) -> String {
    let best = best.map_or_else(|| "--:--".to_string(), format_time);
    format!(" Mines: {}   Time: {}   Best: {} ", mines_remaining, format_time(elapsed), best)
}

fn countdown(highlight: Option<(Pos, Duration)>, dt: Duration) -> Option<(Pos, Duration)> {
    highlight.and_then(|(pos, left)| left.checked_sub(dt).filter(|d| !d.is_zero()).map(|d| (pos, d)))
}

/// mm:ss
fn format_time(d: Duration) -> String {
    let s = d.as_secs();
    format!("{:02}:{:02}", s / 60, s % 60)
}

/// Board cell under a terminal coordinate; each cell is two columns wide inside the border
fn cell_at(rect: Rect, w: usize, h: usize, column: u16, row: u16) -> Option<Pos> {
    if column <= rect.x || row <= rect.y {
        return None;
    }
    let col = (column - rect.x - 1) as usize / 2;
    let row = (row - rect.y - 1) as usize;
    if row < h && col < w { Some((row, col)) } else { None }
}

fn center_rect(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_is_shown_as_minutes_and_seconds() {
        assert_eq!(format_time(Duration::from_millis(90_999)), "01:30");
        assert_eq!(format_time(Duration::ZERO), "00:00");
    }

    #[test]
    fn clock_and_best_time_share_a_format() {
        let text = status_text(-2, Duration::from_secs(75), Some(Duration::from_secs(62)));

        assert_eq!(text, " Mines: -2   Time: 01:15   Best: 01:02 ");
        assert!(status_text(10, Duration::ZERO, None).contains("Time: 00:00   Best: --:--"));
    }

    #[test]
    fn hint_highlight_waits_while_paused() {
        let t0 = Instant::now();
        let mut ui = UiState::new();
        ui.last_tick = t0;
        ui.hint = Some(((2, 3), HINT_DURATION));
        ui.flash_cell = Some(((1, 1), FLASH_DURATION));

        ui.advance(t0 + Duration::from_secs(10), true);
        assert_eq!(ui.hint, Some(((2, 3), HINT_DURATION)));
        assert_eq!(ui.flash_cell, None);

        ui.advance(t0 + Duration::from_secs(12), false);
        assert_eq!(ui.hint, Some(((2, 3), Duration::from_secs(1))));

        ui.advance(t0 + Duration::from_secs(13), false);
        assert_eq!(ui.hint, None);
    }

    #[test]
    fn mouse_maps_to_two_column_cells() {
        let rect = Rect::new(10, 5, 21, 11);

        assert_eq!(cell_at(rect, 9, 9, 11, 6), Some((0, 0)));
        assert_eq!(cell_at(rect, 9, 9, 12, 6), Some((0, 0)));
        assert_eq!(cell_at(rect, 9, 9, 13, 7), Some((1, 1)));
        assert_eq!(cell_at(rect, 9, 9, 10, 6), None);
        assert_eq!(cell_at(rect, 9, 9, 29, 6), None);
        assert_eq!(cell_at(rect, 9, 9, 11, 15), None);
    }
}
