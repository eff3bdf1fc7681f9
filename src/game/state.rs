//! Game state: board, score, selection, preview and animation bookkeeping.
//!
//! Fields are crate-private; renderers get a `&GameState` and read it through the
//! accessors below. Only `Game` mutates it.

use super::anim::{AnimCell, AnimQueue};
use super::board::{Board, Flower, GridPos};
use super::spawn::PREVIEW_LEN;
use std::collections::HashSet;

/// Externally visible turn phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Idle,
    Selected,
    Animating,
    GameOver,
}

/// Which resolution step follows once the animation queue drains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pending {
    PostMove,
    PostEliminateNoSpawn,
    PostSpawn,
    PostEliminateAfterSpawn,
}

/// Phase together with the data that only exists in that phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Stage {
    Idle,
    Selected {
        from: GridPos,
        valid_moves: HashSet<GridPos>,
    },
    Animating(Pending),
    GameOver,
}

#[derive(Debug, Clone)]
pub struct GameState {
    pub(crate) board: Board,
    pub(crate) score: u32,
    pub(crate) high_score: u32,
    pub(crate) stage: Stage,
    pub(crate) next_flowers: [Flower; PREVIEW_LEN],
    pub(crate) anim: AnimQueue,
    pub(crate) eliminating: Option<Vec<AnimCell>>,
    pub(crate) spawning: Option<Vec<AnimCell>>,
}

impl GameState {
    pub(crate) fn new(high_score: u32, next_flowers: [Flower; PREVIEW_LEN]) -> Self {
        Self {
            board: Board::new(),
            score: 0,
            high_score,
            stage: Stage::Idle,
            next_flowers,
            anim: AnimQueue::default(),
            eliminating: None,
            spawning: None,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn phase(&self) -> Phase {
        match self.stage {
            Stage::Idle => Phase::Idle,
            Stage::Selected { .. } => Phase::Selected,
            Stage::Animating(_) => Phase::Animating,
            Stage::GameOver => Phase::GameOver,
        }
    }

    /// Continuation marker; Some only while animating.
    pub fn pending(&self) -> Option<Pending> {
        match self.stage {
            Stage::Animating(p) => Some(p),
            _ => None,
        }
    }

    pub fn selected(&self) -> Option<GridPos> {
        match self.stage {
            Stage::Selected { from, .. } => Some(from),
            _ => None,
        }
    }

    pub fn valid_moves(&self) -> Option<&HashSet<GridPos>> {
        match &self.stage {
            Stage::Selected { valid_moves, .. } => Some(valid_moves),
            _ => None,
        }
    }

    /// Flowers that will spawn after the next move that clears nothing.
    pub fn next_flowers(&self) -> &[Flower; PREVIEW_LEN] {
        &self.next_flowers
    }

    pub fn anim_queue(&self) -> &AnimQueue {
        &self.anim
    }

    pub fn anim_start(&self) -> u64 {
        self.anim.anim_start()
    }

    pub fn eliminating_cells(&self) -> Option<&[AnimCell]> {
        self.eliminating.as_deref()
    }

    pub fn spawning_cells(&self) -> Option<&[AnimCell]> {
        self.spawning.as_deref()
    }

    pub fn empty_cells(&self) -> Vec<GridPos> {
        self.board.empty_cells()
    }
}
