pub mod renderer;
pub mod surface;

pub use renderer::{RainConfig, RainRenderer};
pub use surface::{GridSurface, Surface};
