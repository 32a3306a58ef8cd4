pub mod execution;

pub use crate::drivers::events;
pub use events::ExecutionEvent;
pub use execution::{ControllerSettings, CosmeticsFactory, ExecutionController, FinishedUpload, PendingUpload};
