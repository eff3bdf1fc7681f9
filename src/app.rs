//! App: terminal init, main loop, key and mouse handling.

use crate::GameConfig;
use crate::highscores::{config_path, load_high_score, save_high_score};
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::ui::{self, BloomFx, ScorePopup, View};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use flowertui::game::{Game, GameEvent, GridPos, Phase};
use ratatui::DefaultTerminal;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub struct App {
    config: GameConfig,
    theme: Theme,
    game: Game,
    scores_path: PathBuf,
    /// Best score on disk; the game's own high score may run ahead of it until saved.
    saved_best: u32,
    cursor: GridPos,
    /// Engine timestamps are milliseconds since this instant.
    start: Instant,
    popups: Vec<ScorePopup>,
    bloom: BloomFx,
    /// The current game beat the best score it started with.
    new_record: bool,
    /// Board rect from the last draw, for mapping mouse clicks.
    last_board: ratatui::layout::Rect,
}

fn centre() -> GridPos {
    GridPos::new(4, 4).unwrap_or_default()
}

impl App {
    pub fn new(config: GameConfig, theme: Theme) -> Self {
        let scores_path = config_path(config.scores_path.as_deref());
        let best = load_high_score(&scores_path);
        info!(path = %scores_path.display(), best, "loaded high score");
        let game = match config.seed {
            Some(seed) => Game::seeded(best, seed),
            None => Game::new(best),
        };
        Self {
            config,
            theme,
            game,
            scores_path,
            saved_best: best,
            cursor: centre(),
            start: Instant::now(),
            popups: Vec::new(),
            bloom: BloomFx::default(),
            new_record: false,
            last_board: ratatui::layout::Rect::default(),
        }
    }

    /// Milliseconds since start, the engine's clock.
    fn now_ts(&self) -> u64 {
        self.start.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
    }

    fn new_game(&mut self) {
        self.persist_best();
        self.game.init_game();
        self.popups.clear();
        self.bloom.reset();
        self.new_record = false;
        self.cursor = centre();
    }

    fn persist_best(&mut self) {
        let best = self.game.state().high_score();
        if best <= self.saved_best {
            return;
        }
        match save_high_score(&self.scores_path, best) {
            Ok(()) => self.saved_best = best,
            Err(e) => warn!(error = %e, "could not save high score"),
        }
    }

    fn bell(&self) {
        if self.config.bell {
            let mut out = std::io::stdout();
            let _ = out.write_all(b"\x07").and_then(|()| out.flush());
        }
    }

    fn handle_events(&mut self, events: Vec<GameEvent>) {
        for ev in events {
            debug!(?ev, "game event");
            match ev {
                GameEvent::Select | GameEvent::MoveStart => {}
                GameEvent::EliminateStart { points, .. } => {
                    self.spawn_popup(points);
                    self.bell();
                }
                GameEvent::HighScore(score) => {
                    self.new_record = true;
                    debug!(score, "new high score");
                    self.persist_best();
                }
                GameEvent::GameOver => {
                    info!(score = self.game.state().score(), "game over");
                    self.persist_best();
                    self.bell();
                }
            }
        }
    }

    /// "+N" over the middle of the cells being cleared.
    fn spawn_popup(&mut self, points: u32) {
        let Some(cells) = self.game.state().eliminating_cells() else {
            return;
        };
        let Some(mid) = cells.get(cells.len() / 2) else {
            return;
        };
        self.popups.push(ScorePopup {
            pos: mid.pos,
            amount: points,
            age_ms: 0,
            rise: 0,
            color: self.theme.flower_color(mid.flower.index()),
        });
    }

    fn tap(&mut self, pos: GridPos) {
        let ts = self.now_ts();
        let events = self.game.handle_tap(pos, ts);
        self.handle_events(events);
    }

    fn move_cursor(&mut self, dr: isize, dc: isize) {
        if let Some(p) = self.cursor.offset(dr, dc) {
            self.cursor = p;
        }
    }

    /// Returns false when the app should exit.
    fn apply_action(&mut self, action: Action) -> bool {
        match action {
            Action::Quit => return false,
            Action::NewGame => self.new_game(),
            Action::CursorUp => self.move_cursor(-1, 0),
            Action::CursorDown => self.move_cursor(1, 0),
            Action::CursorLeft => self.move_cursor(0, -1),
            Action::CursorRight => self.move_cursor(0, 1),
            Action::Tap => self.tap(self.cursor),
            Action::None => {}
        }
        true
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        if let Some(pos) = ui::cell_at(self.last_board, mouse.column, mouse.row) {
            self.cursor = pos;
            self.tap(pos);
        }
    }

    /// Report finished animations to the engine. Without animations, drain at once.
    fn advance_animations(&mut self) {
        loop {
            let ts = self.now_ts();
            let queue = self.game.state().anim_queue();
            let done = !queue.is_empty() && (self.config.no_animation || queue.is_head_done(ts));
            if !done {
                break;
            }
            let events = self.game.on_anim_done(ts);
            self.handle_events(events);
        }
        if self.game.state().eliminating_cells().is_none() {
            self.bloom.reset();
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

        enable_raw_mode()?;
        let mouse = self.config.mouse;
        let result = with_restored_screen(std::io::stdout(), mouse, || {
            let mut stdout = std::io::stdout();
            enter_screen(&mut stdout, mouse)?;
            let mut terminal =
                ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;
            self.run_loop(&mut terminal)
        });
        let raw = disable_raw_mode();
        self.persist_best();

        result?;
        raw?;
        Ok(())
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.config.frame_rate);
        let mut last_frame = Instant::now();
        loop {
            let now = Instant::now();
            let delta_ms = now.duration_since(last_frame).as_millis().min(u128::from(u32::MAX)) as u32;
            last_frame = now;
            self.popups.retain_mut(|p| p.tick(delta_ms));

            self.advance_animations();

            let ts = self.now_ts();
            terminal.draw(|f| {
                self.last_board = ui::board_rect(f.area());
                let view = View {
                    state: self.game.state(),
                    theme: &self.theme,
                    cursor: self.cursor,
                    ts,
                    popups: &self.popups,
                    new_record: self.new_record,
                    no_animation: self.config.no_animation,
                };
                ui::draw(f, &view, &mut self.bloom, now);
            })?;

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    match event::read()? {
                        Event::Key(key) if key.kind == KeyEventKind::Press => {
                            let action = key_to_action(key);
                            if self.game.state().phase() == Phase::GameOver
                                && !matches!(action, Action::Quit | Action::NewGame)
                            {
                                continue;
                            }
                            if !self.apply_action(action) {
                                return Ok(());
                            }
                        }
                        Event::Mouse(mouse) if self.config.mouse => self.handle_mouse(mouse),
                        _ => {}
                    }
                }
            }
        }
    }
}

fn enter_screen<W: Write>(out: &mut W, mouse: bool) -> std::io::Result<()> {
    use crossterm::{event::EnableMouseCapture, execute, terminal::EnterAlternateScreen};

    execute!(out, EnterAlternateScreen)?;
    if mouse {
        execute!(out, EnableMouseCapture)?;
    }
    Ok(())
}

/// Run `body`, then leave the alternate screen and release the mouse whether it
/// succeeded or not. The body's error wins over a restore error.
fn with_restored_screen<W: Write, T>(
    mut out: W,
    mouse: bool,
    body: impl FnOnce() -> Result<T>,
) -> Result<T> {
    use crossterm::{event::DisableMouseCapture, execute, terminal::LeaveAlternateScreen};

    let result = body();
    if mouse {
        let _ = execute!(out, DisableMouseCapture);
    }
    let restored = execute!(out, LeaveAlternateScreen);
    let value = result?;
    restored?;
    Ok(value)
}
