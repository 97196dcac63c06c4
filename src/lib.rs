pub mod config;
pub mod game_log;
pub mod insights;
pub mod probability;
pub mod projection;
pub mod rng;
pub mod sampling;
