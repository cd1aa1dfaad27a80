pub mod ai;
pub mod board;
pub mod eval;
pub mod game;
pub mod rules;
