//! Animation queue: visual effects the renderer plays one at a time.
//!
//! The engine never reads a clock. Each item carries a duration in milliseconds and the
//! queue remembers when its head started (`anim_start`), both in the caller's timestamp
//! units. The renderer reports completion through `Game::on_anim_done`.

use super::board::{Flower, GridPos};
use std::collections::VecDeque;
use std::f64::consts::PI;

/// Minimum duration of a move animation.
pub const MOVE_MIN_MS: u64 = 300;
/// Per-step duration of a move animation.
pub const MOVE_STEP_MS: u64 = 55;
pub const ELIMINATE_MS: u64 = 450;
pub const SPAWN_MS: u64 = 400;

/// A flower at a position, as cleared or spawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimCell {
    pub pos: GridPos,
    pub flower: Flower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimKind {
    Move,
    Eliminate,
    Spawn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnimItem {
    /// Flower travelling along `path` (start and destination included).
    Move {
        flower: Flower,
        path: Vec<GridPos>,
        destination: GridPos,
        duration: u64,
    },
    Eliminate {
        cells: Vec<AnimCell>,
    },
    Spawn {
        cells: Vec<AnimCell>,
    },
}

impl AnimItem {
    /// Move along `path`; duration is max(300, 55 * steps). None for an empty path.
    pub fn movement(flower: Flower, path: Vec<GridPos>) -> Option<Self> {
        let destination = *path.last()?;
        let steps = (path.len() - 1) as u64;
        Some(Self::Move {
            flower,
            path,
            destination,
            duration: MOVE_MIN_MS.max(MOVE_STEP_MS * steps),
        })
    }

    pub fn kind(&self) -> AnimKind {
        match self {
            Self::Move { .. } => AnimKind::Move,
            Self::Eliminate { .. } => AnimKind::Eliminate,
            Self::Spawn { .. } => AnimKind::Spawn,
        }
    }

    pub fn duration(&self) -> u64 {
        match self {
            Self::Move { duration, .. } => *duration,
            Self::Eliminate { .. } => ELIMINATE_MS,
            Self::Spawn { .. } => SPAWN_MS,
        }
    }

    /// Curve the renderer applies to this item's progress.
    pub fn easing(&self) -> Easing {
        match self {
            Self::Move { .. } => Easing::InOut,
            Self::Eliminate { .. } => Easing::Out,
            Self::Spawn { .. } => Easing::ElasticOut,
        }
    }
}

/// FIFO of pending effects. Only the head is active.
#[derive(Debug, Clone, Default)]
pub struct AnimQueue {
    items: VecDeque<AnimItem>,
    start: u64,
}

impl AnimQueue {
    /// Append an item; if it becomes the head, it starts at `ts`.
    pub fn push(&mut self, item: AnimItem, ts: u64) {
        self.items.push_back(item);
        if self.items.len() == 1 {
            self.start = ts;
        }
    }

    /// Remove the head. The next item (if any) starts at `ts`.
    pub fn pop(&mut self, ts: u64) -> Option<AnimItem> {
        let item = self.items.pop_front()?;
        if !self.items.is_empty() {
            self.start = ts;
        }
        Some(item)
    }

    pub fn head(&self) -> Option<&AnimItem> {
        self.items.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnimItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Timestamp at which the head began.
    pub fn anim_start(&self) -> u64 {
        self.start
    }

    /// Head progress in [0, 1] at `ts`; 0 when idle.
    pub fn progress(&self, ts: u64) -> f64 {
        let Some(head) = self.head() else {
            return 0.0;
        };
        let duration = head.duration().max(1);
        (ts.saturating_sub(self.start) as f64 / duration as f64).min(1.0)
    }

    /// True once the head's duration has fully elapsed at `ts`.
    pub fn is_head_done(&self, ts: u64) -> bool {
        self.head()
            .is_some_and(|h| ts.saturating_sub(self.start) >= h.duration())
    }
}

/// Easing curves over t in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Easing {
    Linear,
    /// Quadratic ease-in-out (moves).
    InOut,
    /// Quadratic ease-out (eliminations).
    Out,
    /// Elastic overshoot settling at 1 (spawns).
    ElasticOut,
}

impl Easing {
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::InOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Self::Out => 1.0 - (1.0 - t) * (1.0 - t),
            Self::ElasticOut => {
                if t <= 0.0 {
                    0.0
                } else if t >= 1.0 {
                    1.0
                } else {
                    2f64.powf(-10.0 * t) * ((t - 0.075) * 2.0 * PI / 0.3).sin() + 1.0
                }
            }
        }
    }
}

pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(r: usize, c: usize) -> GridPos {
        GridPos::new(r, c).unwrap()
    }

    fn flower() -> Flower {
        Flower::new(1).unwrap()
    }

    #[test]
    fn test_move_duration() {
        let short = AnimItem::movement(flower(), vec![pos(0, 0), pos(0, 1)]).unwrap();
        assert_eq!(short.duration(), MOVE_MIN_MS);
        assert_eq!(AnimItem::movement(flower(), vec![]), None);
        let long: Vec<_> = (0..9).map(|c| pos(0, c)).chain((1..9).map(|r| pos(r, 8))).collect();
        let item = AnimItem::movement(flower(), long).unwrap();
        assert_eq!(item.duration(), 55 * 16);
        assert!(matches!(item, AnimItem::Move { destination, .. } if destination == pos(8, 8)));
    }

    #[test]
    fn test_fixed_durations() {
        assert_eq!(AnimItem::Eliminate { cells: vec![] }.duration(), 450);
        assert_eq!(AnimItem::Spawn { cells: vec![] }.duration(), 400);
    }

    #[test]
    fn test_queue_start_times() {
        let mut q = AnimQueue::default();
        q.push(AnimItem::Spawn { cells: vec![] }, 100);
        q.push(AnimItem::Eliminate { cells: vec![] }, 150);
        // Second push does not restart the head.
        assert_eq!(q.anim_start(), 100);
        assert!(!q.is_head_done(499));
        assert!(q.is_head_done(500));
        assert_eq!(q.pop(520).map(|i| i.kind()), Some(AnimKind::Spawn));
        assert_eq!(q.anim_start(), 520);
        assert_eq!(q.progress(520 + 225), 0.5);
        assert_eq!(q.progress(10_000), 1.0);
    }

    #[test]
    fn test_progress_idle() {
        let q = AnimQueue::default();
        assert_eq!(q.progress(1234), 0.0);
        assert!(!q.is_head_done(1234));
    }

    #[test]
    fn test_easing_endpoints() {
        for e in [Easing::Linear, Easing::InOut, Easing::Out, Easing::ElasticOut] {
            assert!(e.apply(0.0).abs() < 1e-9, "{e:?} at 0");
            assert!((e.apply(1.0) - 1.0).abs() < 1e-9, "{e:?} at 1");
        }
        assert!((Easing::InOut.apply(0.5) - 0.5).abs() < 1e-9);
        assert!((Easing::Out.apply(0.5) - 0.75).abs() < 1e-9);
        // Elastic overshoots before settling.
        assert!((0..100).any(|i| Easing::ElasticOut.apply(f64::from(i) / 100.0) > 1.0));
    }

    #[test]
    fn test_lerp() {
        assert_eq!(lerp(2.0, 6.0, 0.25), 3.0);
    }
}
