mod scripted;
mod type_cases;

pub use scripted::ScriptedConn;
pub use type_cases::{TypeCase, run_type_cases};
