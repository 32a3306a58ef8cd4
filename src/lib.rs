pub mod api;
pub mod audit;
pub mod cli;
pub mod config;
pub mod control_plane;
pub mod controller;
pub mod drivers;
pub mod errors;
pub mod render;
pub mod sequencer;
pub mod stream;
pub mod utils;
pub mod workflow;
