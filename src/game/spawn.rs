//! Spawner: preview generation and placement of new flowers.

use super::anim::AnimCell;
use super::board::{Board, Cell, Flower};
use super::state::GameState;
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

/// Flowers shown in the preview and placed per spawn.
pub const PREVIEW_LEN: usize = 3;

/// Flowers pre-placed on a fresh board.
pub const INITIAL_FLOWERS: usize = 3;

/// Next preview: independent uniform types.
pub fn gen_preview<R: Rng>(rng: &mut R) -> [Flower; PREVIEW_LEN] {
    std::array::from_fn(|_| rng.random())
}

/// Place the current preview on up to PREVIEW_LEN random empty cells, then roll a
/// new preview. The board changes now; only the reveal is animated.
pub fn place_spawns<R: Rng>(state: &mut GameState, rng: &mut R) -> Vec<AnimCell> {
    let mut slots = state.board.empty_cells();
    slots.shuffle(rng);
    slots.truncate(PREVIEW_LEN);
    let preview = state.next_flowers;
    let cells: Vec<AnimCell> = slots
        .into_iter()
        .enumerate()
        .map(|(i, pos)| AnimCell {
            pos,
            flower: preview[i % preview.len()],
        })
        .collect();
    for c in &cells {
        state.board.set(c.pos, Cell::Flower(c.flower));
    }
    state.next_flowers = gen_preview(rng);
    debug!(placed = cells.len(), "spawned");
    cells
}

/// Drop `count` uniformly random flowers on random empty cells.
pub fn seed_board<R: Rng>(board: &mut Board, rng: &mut R, count: usize) -> Vec<AnimCell> {
    let mut slots = board.empty_cells();
    slots.shuffle(rng);
    slots.truncate(count);
    slots
        .into_iter()
        .map(|pos| {
            let flower = rng.random();
            board.set(pos, Cell::Flower(flower));
            AnimCell { pos, flower }
        })
        .collect()
}
