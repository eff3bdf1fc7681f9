//! Layout and drawing: board, animations, sidebar, game over.

use crate::theme::Theme;
use flowertui::game::{
    AnimItem, AnimKind, Flower, GRID_SIZE, GameState, GridPos, Phase, lerp,
};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Terminal cells per board cell.
pub const CELL_WIDTH: u16 = 4;
pub const CELL_HEIGHT: u16 = 2;
const BOARD_WIDTH: u16 = GRID_SIZE as u16 * CELL_WIDTH;
const BOARD_HEIGHT: u16 = GRID_SIZE as u16 * CELL_HEIGHT;
const SIDEBAR_WIDTH: u16 = 24;

/// Glyph per flower type.
const GLYPHS: [&str; 7] = ["✿", "❀", "✾", "✤", "❁", "✽", "❃"];

/// A "+N" that floats up from where flowers bloomed.
#[derive(Debug, Clone)]
pub struct ScorePopup {
    pub pos: GridPos,
    pub amount: u32,
    pub age_ms: u32,
    /// Terminal rows risen so far.
    pub rise: u16,
    pub color: Color,
}

impl ScorePopup {
    const LIFETIME_MS: u32 = 1500;
    const RISE_EVERY_MS: u32 = 150;

    /// Age the popup; false once it should be dropped.
    pub fn tick(&mut self, delta_ms: u32) -> bool {
        let old_steps = self.age_ms / Self::RISE_EVERY_MS;
        self.age_ms += delta_ms;
        let new_steps = self.age_ms / Self::RISE_EVERY_MS;
        if new_steps > old_steps {
            self.rise = self.rise.saturating_add(1).min(CELL_HEIGHT * 2);
        }
        self.age_ms < Self::LIFETIME_MS
    }
}

/// Everything a frame needs besides the engine state.
pub struct View<'a> {
    pub state: &'a GameState,
    pub theme: &'a Theme,
    pub cursor: GridPos,
    /// Engine timestamp for this frame (ms since app start).
    pub ts: u64,
    pub popups: &'a [ScorePopup],
    pub new_record: bool,
    pub no_animation: bool,
}

/// Fade effect for the cells being eliminated, created lazily per elimination.
#[derive(Default)]
pub struct BloomFx {
    effect: Option<Effect>,
    last_process: Option<Instant>,
}

impl BloomFx {
    pub fn reset(&mut self) {
        self.effect = None;
        self.last_process = None;
    }
}

pub fn glyph(flower: Flower) -> &'static str {
    GLYPHS[flower.index() as usize % GLYPHS.len()]
}

/// Board + sidebar, centred in `area`.
fn game_rects(area: Rect) -> (Rect, Rect) {
    let total_w = BOARD_WIDTH + 2 + SIDEBAR_WIDTH;
    let total_h = BOARD_HEIGHT + 2;
    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_h),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(BOARD_WIDTH + 2),
            Constraint::Length(SIDEBAR_WIDTH),
        ])
        .split(vert[1]);
    (inner[0], inner[1])
}

/// Inner board rect (inside the border) for the given frame area.
pub fn board_rect(area: Rect) -> Rect {
    let (outer, _) = game_rects(area);
    Rect {
        x: outer.x + 1,
        y: outer.y + 1,
        width: BOARD_WIDTH.min(outer.width.saturating_sub(2)),
        height: BOARD_HEIGHT.min(outer.height.saturating_sub(2)),
    }
}

/// Board cell under terminal position (x, y), if any.
pub fn cell_at(board: Rect, x: u16, y: u16) -> Option<GridPos> {
    if !board.contains(Position { x, y }) {
        return None;
    }
    let col = usize::from((x - board.x) / CELL_WIDTH);
    let row = usize::from((y - board.y) / CELL_HEIGHT);
    GridPos::new(row, col).ok()
}

/// Terminal rect covered by a board cell.
fn cell_rect(board: Rect, pos: GridPos) -> Rect {
    Rect {
        x: board.x + pos.col() as u16 * CELL_WIDTH,
        y: board.y + pos.row() as u16 * CELL_HEIGHT,
        width: CELL_WIDTH,
        height: CELL_HEIGHT,
    }
    .intersection(board)
}

/// Glyph anchor inside a cell (top row, second column).
fn glyph_anchor(board: Rect, row: f64, col: f64) -> (u16, u16) {
    let x = board.x as f64 + col * CELL_WIDTH as f64 + 1.0;
    let y = board.y as f64 + row * CELL_HEIGHT as f64 + 0.5;
    (x.round() as u16, y.floor() as u16)
}

/// Draw the whole screen; game-over overlay on top when the board is full.
pub fn draw(frame: &mut Frame, view: &View, bloom: &mut BloomFx, now: Instant) {
    let area = frame.area();
    let (board_outer, sidebar) = game_rects(area);
    draw_board(frame, view, board_outer);
    draw_sidebar(frame, view, sidebar);
    if !view.no_animation {
        apply_bloom_effect(frame, view, board_rect(area), bloom, now);
    }
    if view.state.phase() == Phase::GameOver {
        draw_game_over(frame, view, board_outer);
    }
}

fn draw_board(frame: &mut Frame, view: &View, outer: Rect) {
    let theme = view.theme;
    let state = view.state;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" Flowertui ", Style::default().fg(theme.title)));
    let board = block.inner(outer).intersection(Rect {
        width: BOARD_WIDTH,
        height: BOARD_HEIGHT,
        ..block.inner(outer)
    });
    block.render(outer, frame.buffer_mut());

    let head = state.anim_queue().head();
    let spawning: HashSet<GridPos> = match head {
        Some(item) if item.kind() == AnimKind::Spawn && !view.no_animation => state
            .spawning_cells()
            .unwrap_or_default()
            .iter()
            .map(|c| c.pos)
            .collect(),
        _ => HashSet::new(),
    };
    let valid = state.valid_moves();
    let selected = state.selected();

    let buf = frame.buffer_mut();
    for pos in flowertui::game::Board::positions() {
        let rect = cell_rect(board, pos);
        let checker = (pos.row() + pos.col()) % 2 == 0;
        let mut bg = if checker { theme.bg } else { shade(theme.bg, 1.15) };
        if selected == Some(pos) {
            bg = theme.selected_bg;
        }
        for y in rect.top()..rect.bottom() {
            for x in rect.left()..rect.right() {
                buf[(x, y)].set_symbol(" ").set_style(Style::default().bg(bg));
            }
        }
        let (gx, gy) = glyph_anchor(board, pos.row() as f64, pos.col() as f64);
        match state.board().flower_at(pos) {
            Some(f) if !spawning.contains(&pos) => {
                let mut style = Style::default().fg(theme.flower_color(f.index())).bg(bg);
                if selected == Some(pos) {
                    style = style.bold();
                }
                buf.set_string(gx, gy, format!("{} ", glyph(f)), style);
            }
            Some(_) => {}
            None if valid.is_some_and(|v| v.contains(&pos)) => {
                buf.set_string(gx, gy, "·", Style::default().fg(theme.inactive_fg).bg(bg));
            }
            None => {}
        }
        if view.cursor == pos && state.phase() != Phase::GameOver {
            let style = Style::default().fg(theme.title).bg(bg).bold();
            buf.set_string(rect.left(), rect.top(), "[", style);
            buf.set_string(rect.right().saturating_sub(1), rect.top(), "]", style);
        }
    }

    if !view.no_animation {
        draw_animation(frame, view, board);
    }
    draw_popups(frame, view, board);
}

/// Head animation on top of the static board.
fn draw_animation(frame: &mut Frame, view: &View, board: Rect) {
    let state = view.state;
    let Some(head) = state.anim_queue().head() else {
        return;
    };
    let t = head.easing().apply(state.anim_queue().progress(view.ts));
    let theme = view.theme;
    let buf = frame.buffer_mut();
    match head {
        AnimItem::Move { flower, path, .. } => {
            let steps = path.len().saturating_sub(1);
            let along = t * steps as f64;
            let i = (along.floor() as usize).min(steps.saturating_sub(1));
            let frac = along - i as f64;
            let (Some(a), Some(b)) = (path.get(i), path.get((i + 1).min(steps))) else {
                return;
            };
            let row = lerp(a.row() as f64, b.row() as f64, frac);
            let col = lerp(a.col() as f64, b.col() as f64, frac);
            let (x, y) = glyph_anchor(board, row, col);
            if board.contains(Position { x, y }) {
                buf.set_string(
                    x,
                    y,
                    glyph(*flower),
                    Style::default().fg(theme.flower_color(flower.index())).bold(),
                );
            }
        }
        AnimItem::Spawn { cells } => {
            let symbol_for = |f: Flower| match t {
                t if t < 0.3 => "·",
                t if t < 0.6 => "•",
                _ => glyph(f),
            };
            for c in cells {
                let (x, y) = glyph_anchor(board, c.pos.row() as f64, c.pos.col() as f64);
                let mut style = Style::default().fg(theme.flower_color(c.flower.index()));
                // Overshoot of the elastic curve shows as a brief bold pop.
                if t > 1.0 {
                    style = style.bold();
                }
                buf.set_string(x, y, symbol_for(c.flower), style);
            }
        }
        AnimItem::Eliminate { cells } => {
            // Cleared from the board already; draw them so the fade has something to fade.
            let flash = t < 0.15;
            for c in cells {
                let (x, y) = glyph_anchor(board, c.pos.row() as f64, c.pos.col() as f64);
                let fg = if flash {
                    Color::White
                } else {
                    theme.flower_color(c.flower.index())
                };
                buf.set_string(x, y, glyph(c.flower), Style::default().fg(fg).bold());
            }
        }
    }
}

/// Buffer positions covered by the cells being eliminated.
fn bloom_positions(board: Rect, cells: &[GridPos]) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for &pos in cells {
        let rect = cell_rect(board, pos);
        for y in rect.top()..rect.bottom() {
            for x in rect.left()..rect.right() {
                set.insert((x, y));
            }
        }
    }
    set
}

/// Create or advance the elimination fade (TachyonFX) and render it over the board.
fn apply_bloom_effect(frame: &mut Frame, view: &View, board: Rect, bloom: &mut BloomFx, now: Instant) {
    let Some(cells) = view.state.eliminating_cells() else {
        bloom.reset();
        return;
    };
    let delta = bloom
        .last_process
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or_default();
    let delta_ms = delta.as_millis().min(u128::from(u32::MAX)) as u32;
    bloom.last_process = Some(now);

    if bloom.effect.is_none() {
        let positions: Vec<GridPos> = cells.iter().map(|c| c.pos).collect();
        let set = bloom_positions(board, &positions);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            set.contains(&(pos.x, pos.y))
        }));
        let bg = view.theme.bg;
        let ms = flowertui::game::anim::ELIMINATE_MS as u32;
        let effect = fx::fade_to(bg, bg, (ms, Interpolation::QuadOut))
            .with_filter(filter)
            .with_area(board);
        bloom.effect = Some(effect);
    }
    if let Some(effect) = bloom.effect.as_mut() {
        frame.render_effect(effect, board, TfxDuration::from_millis(delta_ms));
    }
}

fn draw_popups(frame: &mut Frame, view: &View, board: Rect) {
    for popup in view.popups {
        let (x, y) = glyph_anchor(board, popup.pos.row() as f64, popup.pos.col() as f64);
        let y = y.saturating_sub(popup.rise).max(board.y);
        let label = format!("+{}", popup.amount);
        let x = x.min(board.right().saturating_sub(label.len() as u16));
        let style = Style::default().fg(popup.color).bg(view.theme.bg).bold();
        frame.buffer_mut().set_string(x, y, label, style);
    }
}

fn status_line(state: &GameState) -> &'static str {
    match state.phase() {
        Phase::Idle => "Pick a flower",
        Phase::Selected => "Pick a free cell",
        Phase::Animating => "…",
        Phase::GameOver => "Board full",
    }
}

fn draw_sidebar(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let state = view.state;
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Score, best
            Constraint::Length(1),
            Constraint::Length(4), // Next
            Constraint::Length(1),
            Constraint::Length(3), // Status
            Constraint::Fill(1),   // Controls
        ])
        .split(area);

    let bordered = |title: &'static str| {
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(Span::styled(title, title_style))
    };

    let stats = vec![
        Line::from(vec![
            Span::styled("Score: ", title_style),
            Span::styled(state.score().to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Best:  ", title_style),
            Span::styled(state.high_score().to_string(), fg_style),
        ]),
    ];
    Paragraph::new(stats)
        .block(bordered(" Score "))
        .render(chunks[0], frame.buffer_mut());

    let next: Vec<Span> = state
        .next_flowers()
        .iter()
        .flat_map(|&f| {
            [
                Span::styled(glyph(f), Style::default().fg(theme.flower_color(f.index())).bold()),
                Span::raw("  "),
            ]
        })
        .collect();
    Paragraph::new(vec![Line::from(""), Line::from(next)])
        .alignment(Alignment::Center)
        .block(bordered(" Next "))
        .render(chunks[2], frame.buffer_mut());

    Paragraph::new(Line::from(Span::styled(status_line(state), fg_style)))
        .alignment(Alignment::Center)
        .block(bordered(" Status "))
        .render(chunks[4], frame.buffer_mut());

    let hint = Style::default().fg(theme.inactive_fg);
    let controls = vec![
        Line::from(Span::styled("arrows/hjkl  cursor", hint)),
        Line::from(Span::styled("enter/space  pick", hint)),
        Line::from(Span::styled("mouse        pick", hint)),
        Line::from(Span::styled("n            new game", hint)),
        Line::from(Span::styled("q/esc        quit", hint)),
    ];
    Paragraph::new(controls)
        .block(bordered(" Keys "))
        .render(chunks[5], frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, view: &View, board_outer: Rect) {
    let theme = view.theme;
    let popup_w = 28u16;
    let popup_h = if view.new_record { 9 } else { 8 };
    let popup = Rect {
        x: board_outer.x + board_outer.width.saturating_sub(popup_w) / 2,
        y: board_outer.y + board_outer.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(board_outer.width),
        height: popup_h.min(board_outer.height),
    };
    let fg = Style::default().fg(theme.main_fg);
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Game Over ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(format!(" Score: {} ", view.state.score()), fg)),
        Line::from(Span::styled(format!(" Best: {} ", view.state.high_score()), fg)),
    ];
    if view.new_record {
        lines.push(Line::from(Span::styled(
            " New record! ",
            Style::default().fg(Color::Yellow).bold(),
        )));
    }
    lines.push(Line::from(Span::styled(" N: New game   Q: Quit ", fg)));
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

/// Scale an RGB colour; other colours pass through.
fn shade(color: Color, factor: f32) -> Color {
    match color {
        Color::Rgb(r, g, b) => {
            let f = |c: u8| (c as f32 * factor).min(255.0) as u8;
            Color::Rgb(f(r), f(g), f(b))
        }
        other => other,
    }
}
