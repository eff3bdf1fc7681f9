//! Reachability and shortest paths over empty cells (4-neighbour BFS).

use super::board::{Board, GridPos};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::trace;

/// Up, down, left, right. Fixed order keeps BFS tie-breaking deterministic.
const NEIGHBOURS_4: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

fn neighbours(pos: GridPos) -> impl Iterator<Item = GridPos> {
    NEIGHBOURS_4
        .iter()
        .filter_map(move |&(dr, dc)| pos.offset(dr, dc))
}

/// Every empty cell reachable from `from` through chains of empty cells.
/// `from` itself is the BFS root whatever it holds, and is never in the result.
pub fn reachable(board: &Board, from: GridPos) -> HashSet<GridPos> {
    let mut visited = HashSet::from([from]);
    let mut queue = VecDeque::from([from]);
    let mut out = HashSet::new();
    while let Some(cur) = queue.pop_front() {
        for next in neighbours(cur) {
            if !visited.insert(next) {
                continue;
            }
            if board.is_empty(next) {
                out.insert(next);
                queue.push_back(next);
            }
        }
    }
    trace!(%from, count = out.len(), "reachable");
    out
}

/// Shortest route `from..=to` through empty cells, or None if `to` cannot be reached.
pub fn shortest_path(board: &Board, from: GridPos, to: GridPos) -> Option<Vec<GridPos>> {
    let mut parent: HashMap<GridPos, Option<GridPos>> = HashMap::from([(from, None)]);
    let mut queue = VecDeque::from([from]);
    while let Some(cur) = queue.pop_front() {
        if cur == to {
            let mut path = vec![to];
            let mut node = to;
            while let Some(Some(prev)) = parent.get(&node) {
                path.push(*prev);
                node = *prev;
            }
            path.reverse();
            trace!(%from, %to, steps = path.len() - 1, "path found");
            return Some(path);
        }
        for next in neighbours(cur) {
            if parent.contains_key(&next) || !board.is_empty(next) {
                continue;
            }
            parent.insert(next, Some(cur));
            queue.push_back(next);
        }
    }
    trace!(%from, %to, "no path");
    None
}
