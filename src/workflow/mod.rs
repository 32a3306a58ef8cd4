pub mod model;
pub mod log_buffer;
pub mod layout;
pub mod state;
pub mod catalog;

pub use model::{WorkflowModel, WorkflowStep};
pub use log_buffer::{LogBuffer, DEFAULT_LOG_CAPACITY};
pub use layout::{layout, positions, AgentPosition};
pub use state::{ConnectionStatus, ExecutionState, ExecutionStatus, ExecutionView};
pub use catalog::TaskCatalog;
