use crate::workflow::ConnectionStatus;

/// Messages sent from the active driver to renderers and transcripts.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionEvent {
    /// A new execution attempt took the driver slot
    ExecutionStarted {
        session_id: String,
        task_id: String,
        total_steps: usize,
        live: bool,
    },
    /// A step became the active one
    StepStarted {
        index: usize,
        step_id: String,
        label: String,
    },
    /// A step was marked completed
    StepCompleted {
        index: usize,
        step_id: String,
    },
    /// A line was prepended to the log buffer
    Log {
        line: String,
    },
    /// The live stream changed state
    ConnectionChanged {
        status: ConnectionStatus,
    },
    /// Every step is completed
    ExecutionCompleted {
        session_id: String,
        completed_steps: usize,
    },
    /// The execution was torn down before or after completion
    ExecutionStopped {
        session_id: String,
    },
}
