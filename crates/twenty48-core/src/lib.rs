//! Rule engine for a sliding-tile merge puzzle, plus the caller-side pieces
//! that sit around it: a game session with undo/level tracking and a
//! fail-soft key/value persistence layer.

pub mod engine;
pub mod session;
pub mod store;
