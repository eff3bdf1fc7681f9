//! Game engine: board, pathfinding, line detection, spawning and turn resolution.
//!
//! Pure simulation. No rendering, no clock, no persistence: callers hand in
//! timestamps and read `GameState` to draw.

pub mod anim;
pub mod board;
pub mod lines;
pub mod path;
pub mod spawn;
pub mod state;
pub mod turn;

pub use anim::{AnimCell, AnimItem, AnimKind, AnimQueue, Easing, lerp};
pub use board::{Board, Cell, Flower, GRID_SIZE, GridError, GridPos, NUM_TYPES};
pub use lines::{LINE_MIN, find_lines, score_for};
pub use path::{reachable, shortest_path};
pub use spawn::{PREVIEW_LEN, gen_preview, place_spawns};
pub use state::{GameState, Pending, Phase};
pub use turn::{Game, GameEvent};
