//! Line detection: runs of LINE_MIN or more same-typed flowers in four directions.

use super::anim::AnimCell;
use super::board::{Board, GridPos};
use std::collections::BTreeSet;
use tracing::trace;

/// Shortest run that clears.
pub const LINE_MIN: usize = 5;

/// →, ↓, ↘, ↙ as (dr, dc).
const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// All cells belonging to at least one qualifying run, each reported once,
/// in row-major order.
pub fn find_lines(board: &Board) -> Vec<AnimCell> {
    let mut hits = BTreeSet::new();
    for start in Board::positions() {
        let Some(kind) = board.flower_at(start) else {
            continue;
        };
        for (dr, dc) in DIRECTIONS {
            // Only walk from the first cell of a run.
            let continues_back = start
                .offset(-dr, -dc)
                .is_some_and(|prev| board.flower_at(prev) == Some(kind));
            if continues_back {
                continue;
            }
            let mut run = vec![start];
            let mut cur = start;
            while let Some(next) = cur.offset(dr, dc) {
                if board.flower_at(next) != Some(kind) {
                    break;
                }
                run.push(next);
                cur = next;
            }
            if run.len() >= LINE_MIN {
                trace!(%start, len = run.len(), dr, dc, "run");
                hits.extend(run);
            }
        }
    }
    hits.into_iter()
        .filter_map(|pos: GridPos| board.flower_at(pos).map(|flower| AnimCell { pos, flower }))
        .collect()
}

/// Points for clearing `n` distinct cells in one pass.
pub fn score_for(n: usize) -> u32 {
    if n >= LINE_MIN {
        10 + 5 * (n - LINE_MIN) as u32
    } else {
        0
    }
}
