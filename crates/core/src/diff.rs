mod cycle;
mod engine;

pub use cycle::break_add_cycles;
pub use engine::{DiffDriver, DiffEngine};
