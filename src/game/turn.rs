//! Turn resolution: tap handling and the animation-driven phase machine.
//!
//! A move resolves as: move → lines? → (eliminate | spawn → lines? → eliminate) → settle.
//! Each step waits for the renderer to finish the animation it queued, so the
//! continuation is kept in `Stage::Animating(Pending)` between `on_anim_done` calls.

use super::anim::{AnimCell, AnimItem};
use super::board::{Board, Cell, Flower, GridPos};
use super::lines::{find_lines, score_for};
use super::path::{reachable, shortest_path};
use super::spawn::{INITIAL_FLOWERS, PREVIEW_LEN, gen_preview, place_spawns, seed_board};
use super::state::{GameState, Pending, Phase, Stage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, instrument, warn};

/// Notifications for sound, persistence and UI, in the order they happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// A flower was selected.
    Select,
    /// A move animation was queued.
    MoveStart,
    /// Lines were cleared and scored.
    EliminateStart { cells: usize, points: u32 },
    /// High score rose to this value.
    HighScore(u32),
    /// The board filled up.
    GameOver,
}

/// The turn resolver. Owns the state; renderers read it through `state()`.
#[derive(Debug, Clone)]
pub struct Game<R = StdRng> {
    state: GameState,
    rng: R,
}

impl Game<StdRng> {
    /// New game seeded from the OS.
    pub fn new(high_score: u32) -> Self {
        Self::with_rng(high_score, StdRng::from_os_rng())
    }

    /// Reproducible game.
    pub fn seeded(high_score: u32, seed: u64) -> Self {
        Self::with_rng(high_score, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Game<R> {
    pub fn with_rng(high_score: u32, mut rng: R) -> Self {
        let preview = gen_preview(&mut rng);
        let mut game = Self {
            state: GameState::new(high_score, preview),
            rng,
        };
        game.init_game();
        game
    }

    /// Start from a prepared board (puzzles, replays, tests). Phase is Idle.
    pub fn from_board(
        board: Board,
        next_flowers: [Flower; PREVIEW_LEN],
        high_score: u32,
        rng: R,
    ) -> Self {
        let mut state = GameState::new(high_score, next_flowers);
        state.board = board;
        Self { state, rng }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Hard reset: clears the board, score, selection and any animation in flight.
    #[instrument(skip(self))]
    pub fn init_game(&mut self) {
        let s = &mut self.state;
        s.board.clear();
        s.score = 0;
        s.stage = Stage::Idle;
        s.anim.clear();
        s.eliminating = None;
        s.spawning = None;
        s.next_flowers = gen_preview(&mut self.rng);
        let placed = seed_board(&mut s.board, &mut self.rng, INITIAL_FLOWERS);
        info!(placed = placed.len(), high_score = s.high_score, "new game");
    }

    /// A tap on `pos` at time `ts`. Ignored while animating or after game over.
    #[instrument(skip(self), fields(phase = ?self.state.phase()))]
    pub fn handle_tap(&mut self, pos: GridPos, ts: u64) -> Vec<GameEvent> {
        let mut events = Vec::new();
        match self.state.phase() {
            Phase::Animating | Phase::GameOver => return events,
            Phase::Idle | Phase::Selected => {}
        }
        if self.state.board.is_empty(pos) {
            if let Stage::Selected { from, valid_moves } = &self.state.stage {
                if valid_moves.contains(&pos) {
                    let from = *from;
                    return self.initiate_move(from, pos, ts);
                }
            }
            return events;
        }
        if self.state.selected() == Some(pos) {
            debug!(%pos, "deselect");
            self.state.stage = Stage::Idle;
            return events;
        }
        let valid_moves = reachable(&self.state.board, pos);
        debug!(%pos, moves = valid_moves.len(), "select");
        self.state.stage = Stage::Selected {
            from: pos,
            valid_moves,
        };
        events.push(GameEvent::Select);
        events
    }

    /// Send the flower at `from` to `to` along the shortest open path.
    /// No-op unless a turn can start and such a path exists.
    #[instrument(skip(self))]
    pub fn initiate_move(&mut self, from: GridPos, to: GridPos, ts: u64) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if !matches!(self.state.phase(), Phase::Idle | Phase::Selected) {
            return events;
        }
        let Some(flower) = self.state.board.flower_at(from) else {
            return events;
        };
        let Some(item) = shortest_path(&self.state.board, from, to)
            .and_then(|path| AnimItem::movement(flower, path))
        else {
            debug!(%from, %to, "no path");
            return events;
        };
        debug!(%from, %to, duration = item.duration(), "move");
        self.state.board.set(from, Cell::Empty);
        self.state.stage = Stage::Animating(Pending::PostMove);
        self.state.anim.push(item, ts);
        events.push(GameEvent::MoveStart);
        events
    }

    /// The renderer finished the head animation at `ts`.
    #[instrument(skip(self), fields(queued = self.state.anim.len()))]
    pub fn on_anim_done(&mut self, ts: u64) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let Some(done) = self.state.anim.pop(ts) else {
            warn!("on_anim_done with nothing animating");
            return events;
        };
        match done {
            AnimItem::Move {
                flower,
                destination,
                ..
            } => self.state.board.set(destination, Cell::Flower(flower)),
            AnimItem::Eliminate { .. } => self.state.eliminating = None,
            AnimItem::Spawn { .. } => self.state.spawning = None,
        }
        if !self.state.anim.is_empty() {
            return events;
        }
        match self.state.pending() {
            Some(pending) => self.advance(pending, ts, &mut events),
            None => warn!(phase = ?self.state.phase(), "animation finished outside a turn"),
        }
        events
    }

    fn advance(&mut self, pending: Pending, ts: u64, events: &mut Vec<GameEvent>) {
        debug!(?pending, "advance");
        match pending {
            Pending::PostMove => {
                let lines = find_lines(&self.state.board);
                if !lines.is_empty() {
                    self.eliminate(lines, Pending::PostEliminateNoSpawn, ts, events);
                } else if self.state.board.is_full() {
                    self.finish_turn(events);
                } else {
                    self.spawn(ts);
                }
            }
            Pending::PostEliminateNoSpawn => self.state.stage = Stage::Idle,
            Pending::PostSpawn => {
                let lines = find_lines(&self.state.board);
                if lines.is_empty() {
                    self.finish_turn(events);
                } else {
                    self.eliminate(lines, Pending::PostEliminateAfterSpawn, ts, events);
                }
            }
            Pending::PostEliminateAfterSpawn => self.finish_turn(events),
        }
    }

    fn eliminate(
        &mut self,
        cells: Vec<AnimCell>,
        next: Pending,
        ts: u64,
        events: &mut Vec<GameEvent>,
    ) {
        let points = score_for(cells.len());
        self.state.score += points;
        debug!(cells = cells.len(), points, score = self.state.score, "eliminate");
        self.raise_high_score(events);
        for c in &cells {
            self.state.board.set(c.pos, Cell::Empty);
        }
        events.push(GameEvent::EliminateStart {
            cells: cells.len(),
            points,
        });
        self.state.eliminating = Some(cells.clone());
        self.state.stage = Stage::Animating(next);
        self.state.anim.push(AnimItem::Eliminate { cells }, ts);
    }

    fn spawn(&mut self, ts: u64) {
        let cells = place_spawns(&mut self.state, &mut self.rng);
        self.state.spawning = Some(cells.clone());
        self.state.stage = Stage::Animating(Pending::PostSpawn);
        self.state.anim.push(AnimItem::Spawn { cells }, ts);
    }

    fn finish_turn(&mut self, events: &mut Vec<GameEvent>) {
        self.raise_high_score(events);
        if self.state.board.is_full() {
            info!(score = self.state.score, "game over");
            self.state.stage = Stage::GameOver;
            events.push(GameEvent::GameOver);
        } else {
            self.state.stage = Stage::Idle;
        }
    }

    fn raise_high_score(&mut self, events: &mut Vec<GameEvent>) {
        if self.state.score > self.state.high_score {
            self.state.high_score = self.state.score;
            events.push(GameEvent::HighScore(self.state.high_score));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::anim::AnimKind;

    fn pos(r: usize, c: usize) -> GridPos {
        GridPos::new(r, c).unwrap()
    }

    fn flowers(kinds: [u8; 3]) -> [Flower; 3] {
        kinds.map(|k| Flower::new(k).unwrap())
    }

    fn game(board: &str) -> Game {
        Game::from_board(
            board.parse().unwrap(),
            flowers([0, 1, 2]),
            0,
            StdRng::seed_from_u64(1),
        )
    }

    /// Drain the queue by acknowledging every head, collecting events and head kinds.
    fn drain(game: &mut Game, mut ts: u64) -> (Vec<GameEvent>, Vec<AnimKind>) {
        let mut events = Vec::new();
        let mut kinds = Vec::new();
        while let Some(head) = game.state().anim_queue().head() {
            kinds.push(head.kind());
            ts += head.duration();
            events.extend(game.on_anim_done(ts));
        }
        (events, kinds)
    }

    const FOUR_AND_ONE: &str = "
        1111.....
        .........
        .........
        .........
        ........1
        .........
        .........
        .........
        .........";

    #[test]
    fn test_new_game_layout() {
        let g = Game::seeded(42, 9);
        let s = g.state();
        assert_eq!(s.empty_cells().len(), 78);
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.score(), 0);
        assert_eq!(s.high_score(), 42);
        assert!(s.anim_queue().is_empty());
    }

    #[test]
    fn test_select_and_deselect() {
        let mut g = game(FOUR_AND_ONE);
        assert_eq!(g.handle_tap(pos(0, 0), 0), vec![GameEvent::Select]);
        assert_eq!(g.state().phase(), Phase::Selected);
        assert_eq!(g.state().selected(), Some(pos(0, 0)));
        // (0,0) is boxed in by (0,1) only on one side; it can still go down.
        assert!(g.state().valid_moves().unwrap().contains(&pos(8, 8)));

        assert!(g.handle_tap(pos(0, 0), 5).is_empty());
        assert_eq!(g.state().phase(), Phase::Idle);
        assert_eq!(g.state().selected(), None);
        assert_eq!(g.state().valid_moves(), None);
    }

    #[test]
    fn test_reselect_other_flower() {
        let mut g = game(FOUR_AND_ONE);
        g.handle_tap(pos(0, 0), 0);
        assert_eq!(g.handle_tap(pos(4, 8), 1), vec![GameEvent::Select]);
        assert_eq!(g.state().selected(), Some(pos(4, 8)));
    }

    #[test]
    fn test_tap_empty_while_idle_is_noop() {
        let mut g = game(FOUR_AND_ONE);
        assert!(g.handle_tap(pos(5, 5), 0).is_empty());
        assert_eq!(g.state().phase(), Phase::Idle);
    }

    #[test]
    fn test_tap_unreachable_keeps_selection() {
        let mut g = game(
            "
            .1.......
            1........
            .........
            .........
            .........
            .........
            .........
            .........
            ........2",
        );
        g.handle_tap(pos(8, 8), 0);
        assert!(g.handle_tap(pos(0, 0), 1).is_empty());
        assert_eq!(g.state().phase(), Phase::Selected);
        assert_eq!(g.state().selected(), Some(pos(8, 8)));
    }

    #[test]
    fn test_move_in_flight() {
        let mut g = game(FOUR_AND_ONE);
        g.handle_tap(pos(4, 8), 0);
        let events = g.handle_tap(pos(0, 4), 100);
        assert_eq!(events, vec![GameEvent::MoveStart]);
        let s = g.state();
        assert_eq!(s.phase(), Phase::Animating);
        assert_eq!(s.pending(), Some(Pending::PostMove));
        assert_eq!(s.selected(), None);
        // The flower is at neither end while moving.
        assert!(s.board().is_empty(pos(4, 8)));
        assert!(s.board().is_empty(pos(0, 4)));
        assert_eq!(s.anim_start(), 100);
        match s.anim_queue().head() {
            Some(AnimItem::Move {
                path, destination, ..
            }) => {
                assert_eq!(path.first(), Some(&pos(4, 8)));
                assert_eq!(*destination, pos(0, 4));
            }
            other => panic!("expected move, got {other:?}"),
        }
        // Taps are ignored mid-animation.
        assert!(g.handle_tap(pos(0, 0), 150).is_empty());
        assert_eq!(g.state().phase(), Phase::Animating);
    }

    #[test]
    fn test_line_completing_move_skips_spawn() {
        let mut g = game(FOUR_AND_ONE);
        g.handle_tap(pos(4, 8), 0);
        g.handle_tap(pos(0, 4), 0);
        let (events, kinds) = drain(&mut g, 0);
        assert_eq!(kinds, vec![AnimKind::Move, AnimKind::Eliminate]);
        assert_eq!(
            events,
            vec![
                GameEvent::HighScore(10),
                GameEvent::EliminateStart {
                    cells: 5,
                    points: 10
                },
            ]
        );
        let s = g.state();
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.pending(), None);
        assert_eq!(s.score(), 10);
        assert_eq!(s.high_score(), 10);
        assert_eq!(s.empty_cells().len(), 81);
        assert_eq!(s.eliminating_cells(), None);
        // Preview untouched: nothing spawned.
        assert_eq!(*s.next_flowers(), flowers([0, 1, 2]));
    }

    #[test]
    fn test_eliminating_cells_visible_during_animation() {
        let mut g = game(FOUR_AND_ONE);
        g.handle_tap(pos(4, 8), 0);
        g.handle_tap(pos(0, 4), 0);
        g.on_anim_done(400);
        let s = g.state();
        assert_eq!(s.pending(), Some(Pending::PostEliminateNoSpawn));
        assert_eq!(s.anim_start(), 400);
        let cells = s.eliminating_cells().unwrap();
        assert_eq!(cells.len(), 5);
        // Already gone from the board.
        assert!(cells.iter().all(|c| s.board().is_empty(c.pos)));
    }

    #[test]
    fn test_quiet_move_spawns_preview() {
        let mut g = game(FOUR_AND_ONE);
        g.handle_tap(pos(4, 8), 0);
        g.handle_tap(pos(8, 8), 0);
        g.on_anim_done(300);
        let s = g.state();
        assert_eq!(s.pending(), Some(Pending::PostSpawn));
        let spawned = s.spawning_cells().unwrap().to_vec();
        assert_eq!(spawned.len(), 3);
        let kinds: Vec<_> = spawned.iter().map(|c| c.flower).collect();
        assert_eq!(kinds, flowers([0, 1, 2]).to_vec());
        // Placed on the board before the reveal finishes.
        assert!(spawned.iter().all(|c| s.board().flower_at(c.pos) == Some(c.flower)));
        assert_eq!(s.board().flower_at(pos(8, 8)).map(Flower::index), Some(1));

        let (_, kinds) = drain(&mut g, 300);
        let s = g.state();
        assert!(kinds.starts_with(&[AnimKind::Spawn]));
        assert!(matches!(s.phase(), Phase::Idle));
        assert_eq!(s.spawning_cells(), None);
    }

    #[test]
    fn test_spawn_completing_line_is_cleared() {
        // After the move exactly three cells are free, so the spawn fills (0,4) too.
        let mut g = Game::from_board(
            "
            1111.2345
            234560123
            456012345
            601234560
            123456012
            345601234
            560123456
            012345601
            2345601..
            "
            .parse()
            .unwrap(),
            flowers([1, 1, 1]),
            5,
            StdRng::seed_from_u64(4),
        );
        g.handle_tap(pos(8, 6), 0);
        g.handle_tap(pos(8, 8), 0);
        let (events, kinds) = drain(&mut g, 0);
        assert_eq!(kinds, vec![AnimKind::Move, AnimKind::Spawn, AnimKind::Eliminate]);
        assert!(events.contains(&GameEvent::EliminateStart {
            cells: 5,
            points: 10
        }));
        let s = g.state();
        assert_eq!(s.score(), 10);
        assert_eq!(s.high_score(), 10);
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.empty_cells().len(), 5);
    }

    #[test]
    fn test_game_over_fires_once() {
        // No two neighbours share a type, so nothing can line up.
        let mut board = Board::new();
        for p in Board::positions() {
            let kind = ((p.row() * 3 + p.col()) % 7) as u8;
            board.set(p, Cell::Flower(Flower::new(kind).unwrap()));
        }
        board.set(pos(4, 4), Cell::Empty);
        let mut g = Game::from_board(board, flowers([0, 1, 2]), 0, StdRng::seed_from_u64(8));

        g.handle_tap(pos(4, 3), 0);
        assert_eq!(g.handle_tap(pos(4, 4), 10), vec![GameEvent::MoveStart]);
        let (events, kinds) = drain(&mut g, 10);
        assert_eq!(kinds, vec![AnimKind::Move, AnimKind::Spawn]);
        assert_eq!(events.iter().filter(|e| **e == GameEvent::GameOver).count(), 1);
        let s = g.state();
        assert_eq!(s.phase(), Phase::GameOver);
        assert!(s.board().is_full());
        assert_eq!(s.board().flower_at(pos(4, 3)), Some(Flower::new(0).unwrap()));
        // Terminal: further taps do nothing.
        assert!(g.handle_tap(pos(0, 0), 2000).is_empty());
        assert!(g.on_anim_done(2000).is_empty());
    }

    #[test]
    fn test_on_anim_done_when_idle_is_noop() {
        let mut g = game(FOUR_AND_ONE);
        let before = g.state().board().clone();
        assert!(g.on_anim_done(10).is_empty());
        assert_eq!(g.state().board(), &before);
        assert_eq!(g.state().phase(), Phase::Idle);
    }

    #[test]
    fn test_init_game_mid_animation_resets() {
        let mut g = game(FOUR_AND_ONE);
        g.state.score = 30;
        g.handle_tap(pos(4, 8), 0);
        g.handle_tap(pos(0, 4), 0);
        g.init_game();
        let s = g.state();
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.pending(), None);
        assert!(s.anim_queue().is_empty());
        assert_eq!(s.score(), 0);
        assert_eq!(s.empty_cells().len(), 78);
    }

    #[test]
    fn test_initiate_move_without_path_is_noop() {
        let mut g = game(
            "
            .1.......
            1........
            .........
            .........
            .........
            .........
            .........
            .........
            ........2",
        );
        assert!(g.initiate_move(pos(8, 8), pos(0, 0), 0).is_empty());
        assert_eq!(g.state().phase(), Phase::Idle);
        assert_eq!(g.state().board().flower_at(pos(8, 8)).map(Flower::index), Some(2));
    }

    #[test]
    fn test_high_score_never_drops() {
        let mut g = game(
            "
            1111.....
            .........
            ..2...3..
            .........
            ........1
            .....4...
            .........
            .5.......
            .........",
        );
        let mut ts = 0;
        let mut prev = g.state().high_score();
        assert_eq!(prev, 0);

        // First turn clears a line, so the score passes the stored best.
        g.handle_tap(pos(4, 8), ts);
        g.handle_tap(pos(0, 4), ts);
        let (events, _) = drain(&mut g, ts);
        assert!(events.contains(&GameEvent::HighScore(10)));
        assert_eq!(g.state().high_score(), 10);
        assert!(g.state().high_score() > prev);
        prev = g.state().high_score();

        for _ in 0..40 {
            if g.state().phase() == Phase::GameOver {
                break;
            }
            let Some(from) = Board::positions().find(|&p| {
                g.state().board().flower_at(p).is_some()
                    && !reachable(g.state().board(), p).is_empty()
            }) else {
                break;
            };
            g.handle_tap(from, ts);
            let to = *g.state().valid_moves().unwrap().iter().min().unwrap();
            g.handle_tap(to, ts);
            let (_, _) = drain(&mut g, ts);
            ts += 5_000;
            let s = g.state();
            assert!(s.high_score() >= prev);
            assert_eq!(s.high_score(), prev.max(s.score()));
            prev = s.high_score();
        }
    }
}
