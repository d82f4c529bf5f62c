pub mod commands;
pub mod controller;
pub mod engine;
pub mod events;
pub mod state;

pub use controller::SessionController;
pub use engine::{RevealSignal, SessionEngine, SessionSnapshot, TickOutcome};
pub use events::{ConsoleSink, EngineEvent, EventSink, JsonLinesSink, NullSink, RecordingSink};
pub use state::{SessionRecord, SessionState};
