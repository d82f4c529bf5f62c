pub mod generator;
pub mod pools;

pub use generator::{generate_seed, sanitize_name, LeadSeed, SeedInput};
