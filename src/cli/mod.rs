pub mod commands;
pub mod context;
pub mod run;
pub mod sequence;
pub mod tasks;
pub mod serve;
pub mod validate;

pub use commands::{Cli, Commands};
