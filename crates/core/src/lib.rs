mod changes;
pub mod diff;
pub mod driver;
mod error;
mod exec;
pub mod inspect;
pub mod migrate;
mod orchestrator;
pub mod schema;
pub mod sqlcheck;

pub use changes::{
    AttrChange, Change, ColumnChange, ForeignKeyChange, IndexChange, TableChange,
};
pub use enumflags2::BitFlags;
pub use error::{Error, Result};
pub use exec::{ConnectionConfig, ExecQuerier, Row, Value, Version};
pub use orchestrator::{Orchestrator, Status};
