pub mod steps;
pub mod state;
pub mod runner;

pub use steps::{StepDefinition, PRE_MEETING_STEPS};
pub use state::{SequencerState, SequencerSummary, Stage, StepCard, StepStatus};
pub use runner::{SequencerEvent, SequencerTimings, StageSequencer};
