pub mod events;
pub mod writer;
pub mod cosmetic;
pub mod messages;
pub mod simulated;
pub mod live;

pub use events::ExecutionEvent;
pub use writer::StateWriter;
pub use cosmetic::{DetailSource, EmissionGate};
pub use messages::LiveMessage;
pub use simulated::{SimulatedStepDriver, SimulationSettings};
pub use live::{LiveStepDriver, StepResolution};
