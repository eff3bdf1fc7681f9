//! Flowertui: the Flower Lines puzzle engine.
//!
//! Move a flower along an open path; five or more of a kind in a row, column or
//! diagonal bloom away and score. Otherwise three new flowers sprout.

pub mod game;
