pub mod progress;

pub use progress::{ExecutionProgress, SequenceProgress};
