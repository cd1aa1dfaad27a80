pub mod config;
pub mod engine;
pub mod grid;
pub mod tile;
pub mod turn;
