pub mod config;
pub mod flavor;
pub mod scheduler;

pub use config::{Field, PhaseWindow, PhaseWindows, RevealPolicy};
pub use scheduler::{render_field, FieldStatus, FieldView, RevealStyle, PLACEHOLDER};
